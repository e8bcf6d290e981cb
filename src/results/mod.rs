//! Result types shared by every engine
//!
//! Each engine maps its raw format onto these structures so callers can
//! read `data` and `images` without engine-specific branching.

mod types;

pub use types::*;

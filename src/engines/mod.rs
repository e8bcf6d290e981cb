//! Search engine module
//!
//! Defines the SearchEngine trait, the three engine drivers and a registry
//! for creating them by name.

mod registry;
mod traits;

// Engine implementations
pub mod bing;
pub mod duckduckgo;
pub mod serper;

pub use registry::EngineRegistry;
pub use traits::*;

//! Search query model and sub-fetch aggregation

pub mod aggregate;
mod models;

pub use models::*;

//! HTTP networking module
//!
//! Provides the document fetcher used by the HTTP-backed engines.

mod client;
mod user_agent;

pub use client::HttpClient;
pub use user_agent::{accept_json, generate_user_agent};

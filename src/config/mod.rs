//! Configuration module for spritetint
//!
//! Provides types and parsing for `tint.toml` configuration.

pub mod loader;
pub mod schema;

pub use loader::*;
pub use schema::*;

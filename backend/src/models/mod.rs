//! Domain models for the feed purchase service
//!
//! Re-exports the shared crate so backend modules have a single import path

pub use shared::*;

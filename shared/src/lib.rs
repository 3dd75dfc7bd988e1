//! Shared types and models for the aquaculture feed purchase service
//!
//! This crate contains the domain types and pure computations shared between
//! the backend and the browser client (via WASM). It performs no I/O.

pub mod models;
pub mod summary;
pub mod types;
pub mod validation;

pub use models::*;
pub use summary::*;
pub use types::*;
pub use validation::*;

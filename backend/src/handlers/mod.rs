//! HTTP request handlers

pub mod health;
pub mod purchase;

pub use health::health_check;
pub use purchase::*;

//! Domain models for the feed purchase service

mod history;
mod purchase;

pub use history::*;
pub use purchase::*;

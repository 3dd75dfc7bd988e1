//! Business logic services for the feed purchase service

pub mod history;
pub mod purchase;

pub use history::HistoryService;
pub use purchase::PurchaseService;

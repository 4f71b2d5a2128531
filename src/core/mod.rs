//! Core domain types and the contracts between the sync engine and its collaborators

pub mod asset;
pub mod config;
pub mod log;
pub mod price;
pub mod repository;

// Re-export main types for cleaner imports
pub use asset::{Asset, AssetId, HistoryId, NewAsset, PriceHistoryEntry, UserId, ValidationError};
pub use price::{PriceSource, sanitize_price};
pub use repository::{PriceRepository, StorageError, Store};

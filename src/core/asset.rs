//! Tracked assets and their price history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AssetId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct UserId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct HistoryId(pub u64);

impl Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A ticker symbol tracked on behalf of a user.
///
/// `last_price` is only ever written by a repository's `record_observation`,
/// together with the matching [`PriceHistoryEntry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub owner: UserId,
    pub symbol: String,
    pub min_price: f64,
    pub max_price: f64,
    pub last_price: Option<f64>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// One immutable price observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceHistoryEntry {
    pub id: HistoryId,
    pub asset_id: AssetId,
    pub price: f64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Symbol must not be empty")]
    EmptySymbol,
    #[error("Thresholds must be positive finite numbers (min: {min}, max: {max})")]
    NonPositiveThreshold { min: f64, max: f64 },
    #[error("Upper threshold {max} must be greater than lower threshold {min}")]
    InvertedThresholds { min: f64, max: f64 },
}

/// Request to start tracking a symbol.
#[derive(Debug, Clone)]
pub struct NewAsset {
    pub owner: UserId,
    pub symbol: String,
    pub min_price: f64,
    pub max_price: f64,
}

impl NewAsset {
    pub fn new(owner: UserId, symbol: &str, min_price: f64, max_price: f64) -> Self {
        Self {
            owner,
            symbol: normalize_symbol(symbol),
            min_price,
            max_price,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.symbol.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }
        let positive = |p: f64| p.is_finite() && p > 0.0;
        if !positive(self.min_price) || !positive(self.max_price) {
            return Err(ValidationError::NonPositiveThreshold {
                min: self.min_price,
                max: self.max_price,
            });
        }
        if self.max_price <= self.min_price {
            return Err(ValidationError::InvertedThresholds {
                min: self.min_price,
                max: self.max_price,
            });
        }
        Ok(())
    }

    /// Builds the stored record; the new asset is active and has no price yet.
    pub fn into_asset(self, id: AssetId, created_at: DateTime<Utc>) -> Asset {
        Asset {
            id,
            owner: self.owner,
            symbol: self.symbol,
            min_price: self.min_price,
            max_price: self.max_price,
            last_price: None,
            active: true,
            created_at,
        }
    }
}

pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

//! Data-provider seam. The engine never fetches market data itself; it
//! receives a complete raw chain (or an explicit fetch failure) from a
//! collaborator implementing [`DataProvider`].

use crate::error::ScanError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One raw per-contract record as delivered by a provider. Fields are
/// optional because provider payloads are routinely incomplete; the chain
/// normalizer decides what is malformed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawOptionRecord {
    /// "YYYY-MM-DD"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub strike: Option<f64>,

    /// "call" or "put"
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub option_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bid: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ask: Option<f64>,

    #[serde(rename = "implied_volatility", skip_serializing_if = "Option::is_none")]
    pub implied_volatility: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<u64>,

    #[serde(rename = "open_interest", skip_serializing_if = "Option::is_none")]
    pub open_interest: Option<u64>,
}

impl RawOptionRecord {
    /// Mid-point premium from bid/ask.
    pub fn premium(&self) -> f64 {
        (self.bid.unwrap_or(0.0) + self.ask.unwrap_or(0.0)) / 2.0
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawOptionChain {
    pub symbol: String,
    pub data: Vec<RawOptionRecord>,
}

pub trait DataProvider {
    fn fetch_option_chain(&self, symbol: &str) -> Result<RawOptionChain, ScanError>;
    fn fetch_spot_price(&self, symbol: &str) -> Result<f64, ScanError>;
}

/// On-disk chain snapshot consumed by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub symbol: String,
    #[serde(rename = "spot_price")]
    pub spot_price: f64,
    pub data: Vec<RawOptionRecord>,
}

/// Reads a previously captured chain snapshot from a JSON file. Live
/// fetching stays outside the engine.
pub struct FileProvider {
    path: PathBuf,
}

impl FileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<ChainSnapshot, ScanError> {
        let raw = std::fs::read_to_string(&self.path)?;
        let snapshot: ChainSnapshot = serde_json::from_str(&raw)?;
        Ok(snapshot)
    }
}

impl DataProvider for FileProvider {
    fn fetch_option_chain(&self, symbol: &str) -> Result<RawOptionChain, ScanError> {
        let snapshot = self.load()?;
        if snapshot.symbol != symbol {
            return Err(ScanError::Fetch(format!(
                "snapshot holds {}, requested {}",
                snapshot.symbol, symbol
            )));
        }
        Ok(RawOptionChain { symbol: snapshot.symbol, data: snapshot.data })
    }

    fn fetch_spot_price(&self, symbol: &str) -> Result<f64, ScanError> {
        let snapshot = self.load()?;
        if snapshot.symbol != symbol {
            return Err(ScanError::Fetch(format!(
                "snapshot holds {}, requested {}",
                snapshot.symbol, symbol
            )));
        }
        Ok(snapshot.spot_price)
    }
}

/// In-memory provider. Handy for tests and for callers that already hold a
/// chain payload.
pub struct StaticProvider {
    pub chain: RawOptionChain,
    pub spot_price: f64,
}

impl StaticProvider {
    pub fn new(chain: RawOptionChain, spot_price: f64) -> Self {
        Self { chain, spot_price }
    }
}

impl DataProvider for StaticProvider {
    fn fetch_option_chain(&self, _symbol: &str) -> Result<RawOptionChain, ScanError> {
        Ok(self.chain.clone())
    }

    fn fetch_spot_price(&self, _symbol: &str) -> Result<f64, ScanError> {
        Ok(self.spot_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_premium_midpoint() {
        let record = RawOptionRecord {
            bid: Some(1.00),
            ask: Some(1.20),
            ..Default::default()
        };
        assert!((record.premium() - 1.10).abs() < 1e-9);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let snapshot = ChainSnapshot {
            symbol: "SPY".to_string(),
            spot_price: 450.25,
            data: vec![RawOptionRecord {
                expiration: Some("2026-12-18".to_string()),
                strike: Some(450.0),
                option_type: Some("call".to_string()),
                bid: Some(5.00),
                ask: Some(5.20),
                implied_volatility: Some(0.22),
                delta: Some(0.52),
                volume: Some(120),
                open_interest: Some(900),
            }],
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: ChainSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.symbol, "SPY");
        assert_eq!(back.data.len(), 1);
        assert_eq!(back.data[0].strike, Some(450.0));
    }
}

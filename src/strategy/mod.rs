//! Strategy catalogue and criteria resolution.
//!
//! Each strategy is a tagged variant dispatching to a fixed shape (leg
//! topology), an ordered funnel stage list, and a scoring recipe. Leg order
//! within a candidate is fixed per shape so downstream code can address legs
//! by role:
//!
//! - `pmcc` / `pmcp`: `[long far-dated, short near-dated]`
//! - `synthetic_long`: `[long call, short put]`
//! - `jade_lizard`: `[short put, short call, long call]`
//! - `twisted_sister`: `[short call, short put, long put]`
//! - `iron_condor`: `[long put, short put, short call, long call]`
//! - `bwb_put` / `bwb_call`: `[long low wing, short body x2, long high wing]`

pub mod funnel;
pub mod generator;
pub mod scoring;

use crate::config;
use crate::error::ScanError;
use crate::models::FilterCriteria;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyId {
    Pmcc,
    Pmcp,
    SyntheticLong,
    JadeLizard,
    TwistedSister,
    IronCondor,
    BwbPut,
    BwbCall,
}

impl StrategyId {
    pub const ALL: &'static [StrategyId] = &[
        StrategyId::Pmcc,
        StrategyId::Pmcp,
        StrategyId::SyntheticLong,
        StrategyId::JadeLizard,
        StrategyId::TwistedSister,
        StrategyId::IronCondor,
        StrategyId::BwbPut,
        StrategyId::BwbCall,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyId::Pmcc => "pmcc",
            StrategyId::Pmcp => "pmcp",
            StrategyId::SyntheticLong => "synthetic_long",
            StrategyId::JadeLizard => "jade_lizard",
            StrategyId::TwistedSister => "twisted_sister",
            StrategyId::IronCondor => "iron_condor",
            StrategyId::BwbPut => "bwb_put",
            StrategyId::BwbCall => "bwb_call",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            StrategyId::Pmcc => "PMCC - Poor Man's Covered Call",
            StrategyId::Pmcp => "PMCP - Poor Man's Covered Put",
            StrategyId::SyntheticLong => "Synthetic Long",
            StrategyId::JadeLizard => "Jade Lizard",
            StrategyId::TwistedSister => "Twisted Sister",
            StrategyId::IronCondor => "Iron Condor",
            StrategyId::BwbPut => "Broken Wing Butterfly (Put)",
            StrategyId::BwbCall => "Broken Wing Butterfly (Call)",
        }
    }

    pub fn num_legs(&self) -> usize {
        match self {
            StrategyId::Pmcc | StrategyId::Pmcp | StrategyId::SyntheticLong => 2,
            StrategyId::JadeLizard
            | StrategyId::TwistedSister
            | StrategyId::BwbPut
            | StrategyId::BwbCall => 3,
            StrategyId::IronCondor => 4,
        }
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyId {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StrategyId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| ScanError::InvalidFilterCriteria(format!("unknown strategy '{}'", s)))
    }
}

/// Fully resolved numeric bounds for one scan: strategy defaults overlaid
/// with the caller's validated overrides.
#[derive(Debug, Clone)]
pub struct ResolvedCriteria {
    bounds: HashMap<String, f64>,
}

impl ResolvedCriteria {
    /// All names are guaranteed present: the map is seeded from the
    /// strategy's default table before overrides are applied.
    pub fn get(&self, name: &str) -> f64 {
        self.bounds.get(name).copied().unwrap_or(0.0)
    }

    pub fn get_i64(&self, name: &str) -> i64 {
        self.get(name) as i64
    }
}

fn check_bound_domain(name: &str, value: f64) -> Result<(), ScanError> {
    if !value.is_finite() {
        return Err(ScanError::InvalidFilterCriteria(format!(
            "bound '{}' is not a finite number",
            name
        )));
    }
    let in_unit = (0.0..=1.0).contains(&value);
    if name.contains("delta") && !in_unit {
        return Err(ScanError::InvalidFilterCriteria(format!(
            "delta bound '{}' must lie in [0, 1], got {}",
            name, value
        )));
    }
    if name.contains("prob") && !in_unit {
        return Err(ScanError::InvalidFilterCriteria(format!(
            "probability bound '{}' must lie in [0, 1], got {}",
            name, value
        )));
    }
    if (name.contains("dte") || name.contains("volume")) && value < 0.0 {
        return Err(ScanError::InvalidFilterCriteria(format!(
            "bound '{}' must be non-negative, got {}",
            name, value
        )));
    }
    if name.contains("width") && value <= 0.0 {
        return Err(ScanError::InvalidFilterCriteria(format!(
            "width bound '{}' must be positive, got {}",
            name, value
        )));
    }
    Ok(())
}

/// Merge the caller's bounds over the strategy defaults, rejecting unknown
/// names and out-of-domain values before any pricing work happens.
pub fn resolve_criteria(
    strategy: StrategyId,
    criteria: &FilterCriteria,
) -> Result<ResolvedCriteria, ScanError> {
    let defaults = config::defaults_for(strategy);
    let mut bounds: HashMap<String, f64> = defaults
        .bounds
        .iter()
        .map(|(name, value)| (name.to_string(), *value))
        .collect();

    for (name, value) in &criteria.bounds {
        if !bounds.contains_key(name) {
            return Err(ScanError::InvalidFilterCriteria(format!(
                "unknown parameter '{}' for strategy {}",
                name, strategy
            )));
        }
        check_bound_domain(name, *value)?;
        bounds.insert(name.clone(), *value);
    }

    for (lo_name, hi_name) in config::ordered_bound_pairs(strategy) {
        let lo = bounds[*lo_name];
        let hi = bounds[*hi_name];
        if lo > hi {
            return Err(ScanError::InvalidFilterCriteria(format!(
                "'{}' ({}) exceeds '{}' ({})",
                lo_name, lo, hi_name, hi
            )));
        }
    }

    Ok(ResolvedCriteria { bounds })
}

/// Normalized scoring weights for one scan. Supplied weights are divided by
/// their sum; a zero sum substitutes the strategy's documented defaults.
pub fn resolve_weights(
    strategy: StrategyId,
    criteria: &FilterCriteria,
) -> Result<HashMap<String, f64>, ScanError> {
    let defaults = config::defaults_for(strategy);
    let mut weights: HashMap<String, f64> = defaults
        .weights
        .iter()
        .map(|(name, value)| (name.to_string(), *value))
        .collect();

    for (name, value) in &criteria.weights {
        if !weights.contains_key(name) {
            return Err(ScanError::InvalidFilterCriteria(format!(
                "unknown scoring weight '{}' for strategy {}",
                name, strategy
            )));
        }
        if !value.is_finite() || *value < 0.0 || *value > 1.0 {
            return Err(ScanError::InvalidFilterCriteria(format!(
                "scoring weight '{}' must lie in [0, 1], got {}",
                name, value
            )));
        }
        weights.insert(name.clone(), *value);
    }

    let sum: f64 = weights.values().sum();
    if sum == 0.0 {
        // Documented default policy: an all-zero weight set falls back to
        // the strategy defaults rather than producing all-zero scores.
        weights = defaults
            .weights
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect();
    } else {
        for value in weights.values_mut() {
            *value /= sum;
        }
    }
    Ok(weights)
}

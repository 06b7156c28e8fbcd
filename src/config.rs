//! Process-wide configuration: per-strategy default filter bounds and
//! scoring weights (one read-only table, swappable for tests via the
//! criteria overrides), plus runtime environment lookups.

use crate::strategy::StrategyId;

// -----------------------------------------------
// PRICING DEFAULTS
// -----------------------------------------------
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.05;

/// Number of top-ranked candidates a scan returns.
pub const DEFAULT_TOP_N: usize = 10;

/// Sample count used when deriving breakevens from a payoff curve.
pub const DEFAULT_PAYOFF_POINTS: usize = 400;

// -----------------------------------------------
// STRATEGY DEFAULT TABLES
// -----------------------------------------------

/// Default named bounds and scoring weights for one strategy.
pub struct StrategyDefaults {
    pub bounds: &'static [(&'static str, f64)],
    pub weights: &'static [(&'static str, f64)],
}

static PMCC_DEFAULTS: StrategyDefaults = StrategyDefaults {
    bounds: &[
        ("min_long_delta", 0.60),
        ("max_long_delta", 0.95),
        ("min_short_delta", 0.15),
        ("max_short_delta", 0.50),
        ("min_long_dte", 150.0),
        ("min_short_dte", 10.0),
        ("max_short_dte", 60.0),
        ("min_credit", 0.25),
        ("min_volume", 0.0),
    ],
    weights: &[
        ("roi", 0.25),
        ("risk_reward", 0.20),
        ("premium", 0.15),
        ("long_delta", 0.20),
        ("short_delta", 0.20),
    ],
};

static SYNTHETIC_DEFAULTS: StrategyDefaults = StrategyDefaults {
    bounds: &[
        ("min_dte", 30.0),
        ("max_dte", 90.0),
        ("max_strike_distance", 0.05),
        ("atm_delta_min", 0.35),
        ("atm_delta_max", 0.65),
        ("min_volume", 10.0),
        ("min_delta", 0.90),
        ("max_cost", 2.00),
    ],
    weights: &[
        ("cost", 0.30),
        ("delta", 0.35),
        ("strike_proximity", 0.20),
        ("volume", 0.15),
    ],
};

static LIZARD_DEFAULTS: StrategyDefaults = StrategyDefaults {
    bounds: &[
        ("min_dte", 30.0),
        ("max_dte", 60.0),
        ("put_delta_min", 0.15),
        ("put_delta_max", 0.35),
        ("call_delta_min", 0.15),
        ("call_delta_max", 0.35),
        ("spread_width_min", 2.0),
        ("spread_width_max", 10.0),
        ("min_credit", 0.50),
        ("min_volume", 10.0),
        ("max_spread_cost_ratio", 0.80),
    ],
    weights: &[
        ("credit", 0.25),
        ("roc", 0.25),
        ("pop", 0.30),
        ("volume", 0.10),
        ("risk_bonus", 0.10),
    ],
};

static IRON_CONDOR_DEFAULTS: StrategyDefaults = StrategyDefaults {
    bounds: &[
        ("min_dte", 30.0),
        ("max_dte", 60.0),
        ("short_put_delta_min", 0.15),
        ("short_put_delta_max", 0.30),
        ("short_call_delta_min", 0.15),
        ("short_call_delta_max", 0.30),
        ("put_spread_width_min", 3.0),
        ("put_spread_width_max", 10.0),
        ("call_spread_width_min", 3.0),
        ("call_spread_width_max", 10.0),
        ("min_credit", 0.50),
        ("min_credit_to_risk_ratio", 0.25),
        ("max_risk_per_contract", 500.0),
        ("min_volume", 10.0),
        ("min_prob_profit", 0.45),
    ],
    weights: &[
        ("credit_to_risk", 0.30),
        ("pop", 0.30),
        ("credit_amount", 0.20),
        ("volume", 0.10),
        ("balanced", 0.10),
    ],
};

static BWB_DEFAULTS: StrategyDefaults = StrategyDefaults {
    bounds: &[
        ("min_dte", 30.0),
        ("max_dte", 60.0),
        ("short_delta_min", 0.25),
        ("short_delta_max", 0.40),
        ("lower_wing_width", 5.0),
        ("upper_wing_width", 8.0),
        ("max_debit", 2.0),
        ("min_volume", 10.0),
        ("min_prob_profit", 0.40),
    ],
    weights: &[
        ("roi", 0.20),
        ("pop", 0.35),
        ("risk_reward", 0.20),
        ("volume", 0.10),
        ("credit_bonus", 0.15),
    ],
};

/// Look up the read-only default table for a strategy. PMCP mirrors PMCC,
/// Twisted Sister mirrors Jade Lizard, and the two broken-wing butterflies
/// share one table; the generator applies the put/call mirroring.
pub fn defaults_for(strategy: StrategyId) -> &'static StrategyDefaults {
    match strategy {
        StrategyId::Pmcc | StrategyId::Pmcp => &PMCC_DEFAULTS,
        StrategyId::SyntheticLong => &SYNTHETIC_DEFAULTS,
        StrategyId::JadeLizard | StrategyId::TwistedSister => &LIZARD_DEFAULTS,
        StrategyId::IronCondor => &IRON_CONDOR_DEFAULTS,
        StrategyId::BwbPut | StrategyId::BwbCall => &BWB_DEFAULTS,
    }
}

/// Bound-name pairs that must satisfy min <= max when both are supplied.
pub fn ordered_bound_pairs(strategy: StrategyId) -> &'static [(&'static str, &'static str)] {
    match strategy {
        StrategyId::Pmcc | StrategyId::Pmcp => &[
            ("min_long_delta", "max_long_delta"),
            ("min_short_delta", "max_short_delta"),
            ("min_short_dte", "max_short_dte"),
        ],
        StrategyId::SyntheticLong => &[
            ("min_dte", "max_dte"),
            ("atm_delta_min", "atm_delta_max"),
        ],
        StrategyId::JadeLizard | StrategyId::TwistedSister => &[
            ("min_dte", "max_dte"),
            ("put_delta_min", "put_delta_max"),
            ("call_delta_min", "call_delta_max"),
            ("spread_width_min", "spread_width_max"),
        ],
        StrategyId::IronCondor => &[
            ("min_dte", "max_dte"),
            ("short_put_delta_min", "short_put_delta_max"),
            ("short_call_delta_min", "short_call_delta_max"),
            ("put_spread_width_min", "put_spread_width_max"),
            ("call_spread_width_min", "call_spread_width_max"),
        ],
        StrategyId::BwbPut | StrategyId::BwbCall => &[
            ("min_dte", "max_dte"),
            ("short_delta_min", "short_delta_max"),
        ],
    }
}

// -----------------------------------------------
// RUNTIME CONFIGURATION
// -----------------------------------------------

/// Execution mode for the CLI: "scan" or "report".
pub fn get_execution_mode() -> String {
    std::env::var("SCANNER_MODE").unwrap_or_else(|_| "scan".to_string())
}

pub fn get_symbol() -> String {
    std::env::var("SCANNER_SYMBOL").unwrap_or_else(|_| "SPY".to_string())
}

pub fn get_strategy() -> String {
    std::env::var("SCANNER_STRATEGY").unwrap_or_else(|_| "pmcc".to_string())
}

/// Path of the JSON chain snapshot the file provider reads.
pub fn get_chain_file() -> String {
    std::env::var("SCANNER_CHAIN_FILE").unwrap_or_else(|_| "chain.json".to_string())
}

/// Directory rotated scan logs are written to.
pub fn get_log_dir() -> String {
    std::env::var("SCANNER_LOG_DIR").unwrap_or_else(|_| "./logs".to_string())
}

pub fn get_risk_free_rate() -> f64 {
    std::env::var("SCANNER_RISK_FREE_RATE")
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(DEFAULT_RISK_FREE_RATE)
}

pub fn get_top_n() -> usize {
    std::env::var("SCANNER_TOP_N")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .map(|n| n.clamp(1, 100))
        .unwrap_or(DEFAULT_TOP_N)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_strategy_has_defaults() {
        for id in StrategyId::ALL {
            let defaults = defaults_for(*id);
            assert!(!defaults.bounds.is_empty());
            let weight_sum: f64 = defaults.weights.iter().map(|(_, w)| w).sum();
            assert!(
                (weight_sum - 1.0).abs() < 1e-9,
                "{:?} default weights sum to {}",
                id,
                weight_sum
            );
        }
    }

    #[test]
    fn test_ordered_pairs_reference_known_bounds() {
        for id in StrategyId::ALL {
            let defaults = defaults_for(*id);
            for (lo, hi) in ordered_bound_pairs(*id) {
                assert!(defaults.bounds.iter().any(|(n, _)| n == lo));
                assert!(defaults.bounds.iter().any(|(n, _)| n == hi));
            }
        }
    }
}

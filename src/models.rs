use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for long legs, -1 for short legs.
    pub fn sign(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

/// One contract from the normalized chain snapshot. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionContract {
    #[serde(rename = "type")]
    pub option_type: OptionType,
    pub strike: f64,
    pub expiry: NaiveDate,
    pub premium: f64,
    pub volume: u64,
    pub open_interest: u64,
    pub implied_volatility: f64,
    pub delta: f64,
    pub days_to_expiry: i64,
}

impl OptionContract {
    pub fn time_to_expiry_years(&self) -> f64 {
        self.days_to_expiry as f64 / 365.0
    }
}

/// One option position within a multi-leg candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub contract: OptionContract,
    pub side: Side,
    pub multiplier: u32,
}

impl Leg {
    pub fn new(contract: OptionContract, side: Side) -> Self {
        Self { contract, side, multiplier: 1 }
    }

    pub fn with_multiplier(contract: OptionContract, side: Side, multiplier: u32) -> Self {
        Self { contract, side, multiplier }
    }

    /// Signed premium contribution: long pays (positive debit), short collects.
    pub fn signed_premium(&self) -> f64 {
        self.side.sign() * self.contract.premium * self.multiplier as f64
    }
}

/// An ordered sequence of 2-4 legs forming one strategy instance.
///
/// Leg order is fixed per strategy shape (see `strategy::generator`) so that
/// funnel predicates and scoring can address legs by role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub legs: Vec<Leg>,
    /// Positive = debit paid, negative = credit received.
    pub net_debit_credit: f64,
}

impl Candidate {
    pub fn new(legs: Vec<Leg>) -> Self {
        let net_debit_credit = legs.iter().map(Leg::signed_premium).sum();
        Self { legs, net_debit_credit }
    }

    /// Credit received on entry, zero for net-debit positions.
    pub fn credit(&self) -> f64 {
        (-self.net_debit_credit).max(0.0)
    }

    pub fn min_volume(&self) -> u64 {
        self.legs.iter().map(|l| l.contract.volume).min().unwrap_or(0)
    }

    /// Nearest expiry among the legs.
    pub fn nearest_expiry_days(&self) -> i64 {
        self.legs
            .iter()
            .map(|l| l.contract.days_to_expiry)
            .min()
            .unwrap_or(0)
    }
}

/// Finite value or an unbounded wing ("unlimited" in reports).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoffBound {
    Finite(f64),
    Unlimited,
}

impl PayoffBound {
    pub fn finite(self) -> Option<f64> {
        match self {
            PayoffBound::Finite(v) => Some(v),
            PayoffBound::Unlimited => None,
        }
    }

    pub fn is_unlimited(self) -> bool {
        matches!(self, PayoffBound::Unlimited)
    }
}

impl std::fmt::Display for PayoffBound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayoffBound::Finite(v) => write!(f, "{:.2}", v),
            PayoffBound::Unlimited => f.write_str("unlimited"),
        }
    }
}

/// Risk metrics derived from the expiration payoff of one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub net_debit_credit: f64,
    pub max_profit: PayoffBound,
    pub max_loss: PayoffBound,
    pub breakevens: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roi_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_reward_ratio: Option<f64>,
    pub prob_profit_pct: f64,
}

/// A funnel survivor annotated with metrics and a composite score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub metrics: RiskMetrics,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PayoffPoint {
    pub underlying_price: f64,
    pub pnl: f64,
}

/// Dense expiration-payoff samples plus derived risk figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoffCurve {
    pub points: Vec<PayoffPoint>,
    pub breakevens: Vec<f64>,
    pub max_profit: PayoffBound,
    pub max_loss: PayoffBound,
}

/// One funnel stage record. Produced fresh on every scan, append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStep {
    pub step: usize,
    pub name: String,
    pub description: String,
    pub input_count: usize,
    pub passed_count: usize,
    pub filtered_count: usize,
    pub pass_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub total_input: usize,
    pub final_output: usize,
    pub overall_pass_rate: f64,
    pub total_steps: usize,
    pub scan_duration_ms: u64,
}

/// Funnel accounting for the most recent scan of one strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub symbol: String,
    pub stock_price: f64,
    pub strategy: String,
    pub timestamp: String,
    pub steps: Vec<PipelineStep>,
    pub summary: PipelineSummary,
}

/// Caller-supplied overrides for a strategy's named numeric bounds and
/// scoring weights. Anything not supplied falls back to the strategy default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    #[serde(default)]
    pub bounds: HashMap<String, f64>,
    #[serde(default)]
    pub weights: HashMap<String, f64>,
}

/// Money values carry 2 decimal places at output boundaries only.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod payoff;
pub mod pricing;
pub mod processor;
pub mod provider;
pub mod scanner;
pub mod strategy;

// Re-exports for convenience
pub use error::ScanError;
pub use models::{
    Candidate, FilterCriteria, Leg, OptionContract, OptionType, PayoffBound, PayoffCurve,
    PipelineReport, RiskMetrics, ScoredCandidate, Side,
};
pub use payoff::compute_payoff;
pub use provider::{DataProvider, FileProvider, StaticProvider};
pub use scanner::Scanner;
pub use strategy::StrategyId;

//! Scan orchestration: fetch, normalize, enumerate, filter, price, score.
//! One `Scanner` serves any number of scans; each scan works on its own
//! chain snapshot and only the per-strategy funnel reports are shared state.

use crate::config;
use crate::error::ScanError;
use crate::models::{FilterCriteria, PipelineReport, RiskMetrics, ScoredCandidate};
use crate::payoff;
use crate::processor::{self, NormalizedChain};
use crate::provider::DataProvider;
use crate::strategy::{self, StrategyId, funnel, generator, scoring};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{info, warn};

pub struct Scanner {
    provider: Box<dyn DataProvider + Send + Sync>,
    risk_free_rate: f64,
    top_n: usize,
    reports: Mutex<HashMap<StrategyId, PipelineReport>>,
}

impl Scanner {
    pub fn new(provider: Box<dyn DataProvider + Send + Sync>) -> Self {
        Self {
            provider,
            risk_free_rate: config::DEFAULT_RISK_FREE_RATE,
            top_n: config::DEFAULT_TOP_N,
            reports: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_risk_free_rate(mut self, rate: f64) -> Self {
        self.risk_free_rate = rate;
        self
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n.max(1);
        self
    }

    /// Run one full scan. Criteria are validated before any market data is
    /// touched; a funnel that filters everything out surfaces as
    /// [`ScanError::NoCandidatesFound`] after the pipeline report has been
    /// stored, so observability survives empty results.
    pub fn scan(
        &self,
        symbol: &str,
        strategy: StrategyId,
        criteria: &FilterCriteria,
    ) -> Result<Vec<ScoredCandidate>, ScanError> {
        let resolved = strategy::resolve_criteria(strategy, criteria)?;
        let weights = strategy::resolve_weights(strategy, criteria)?;

        let raw = self.provider.fetch_option_chain(symbol)?;
        let spot = self.provider.fetch_spot_price(symbol)?;
        let as_of = chrono::Utc::now().date_naive();
        let chain = processor::normalize_chain(&raw, spot, as_of, self.risk_free_rate);
        info!(
            symbol,
            strategy = %strategy,
            spot,
            contracts = chain.len(),
            dropped = chain.dropped_count,
            "starting scan"
        );

        let mut tracker = funnel::PipelineTracker::new(symbol, spot, strategy);
        let candidates = generator::generate(strategy, &chain, &resolved);
        tracker.add_step(
            "Candidates",
            "Structurally valid leg combinations",
            candidates.len(),
            candidates.len(),
        );

        let stages = funnel::stages_for(strategy, &resolved, spot, self.risk_free_rate, chain.avg_iv());
        let survivors = funnel::run(&stages, candidates, &mut tracker);

        let with_metrics = self.annotate(&chain, survivors.len(), survivors, &mut tracker);
        let scored = scoring::score_and_rank(strategy, with_metrics, &weights, spot, &resolved);

        let ranked_count = scored.len();
        let top: Vec<ScoredCandidate> = scored.into_iter().take(self.top_n).collect();
        tracker.add_step(
            "Final Selection",
            &format!("Top {} by score", self.top_n),
            ranked_count,
            top.len(),
        );

        let report = tracker.finalize(top.len());
        info!(
            symbol,
            strategy = %strategy,
            results = top.len(),
            duration_ms = report.summary.scan_duration_ms,
            "scan complete"
        );
        match self.reports.lock() {
            Ok(mut reports) => {
                reports.insert(strategy, report);
            }
            Err(_) => {
                warn!(
                    symbol,
                    strategy = %strategy,
                    "report store poisoned, dropping pipeline report"
                );
            }
        }

        if top.is_empty() {
            return Err(ScanError::NoCandidatesFound {
                symbol: symbol.to_string(),
                strategy: strategy.as_str().to_string(),
            });
        }
        Ok(top)
    }

    /// Funnel accounting for the most recent scan of one strategy.
    pub fn pipeline_report(&self, strategy: StrategyId) -> Option<PipelineReport> {
        self.reports
            .lock()
            .ok()
            .and_then(|reports| reports.get(&strategy).cloned())
    }

    /// Attach risk metrics to each survivor. Candidates whose pricing inputs
    /// degenerate are skipped and counted, never fatal.
    fn annotate(
        &self,
        chain: &NormalizedChain,
        input_count: usize,
        survivors: Vec<crate::models::Candidate>,
        tracker: &mut funnel::PipelineTracker,
    ) -> Vec<(crate::models::Candidate, RiskMetrics)> {
        let avg_iv = chain.avg_iv();
        let mut out = Vec::with_capacity(survivors.len());
        for candidate in survivors {
            match payoff::risk_metrics(&candidate, chain.spot_price, self.risk_free_rate, avg_iv) {
                Ok(metrics) => out.push((candidate, metrics)),
                Err(err) => {
                    warn!("skipping candidate with degenerate pricing: {}", err);
                }
            }
        }
        tracker.add_step(
            "Risk Metrics",
            "Payoff, breakevens and probability of profit",
            input_count,
            out.len(),
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{RawOptionChain, StaticProvider};

    #[test]
    fn test_empty_chain_reports_full_funnel() {
        let provider = StaticProvider::new(
            RawOptionChain { symbol: "SPY".to_string(), data: vec![] },
            100.0,
        );
        let scanner = Scanner::new(Box::new(provider));
        let err = scanner
            .scan("SPY", StrategyId::Pmcc, &FilterCriteria::default())
            .unwrap_err();
        assert!(matches!(err, ScanError::NoCandidatesFound { .. }));

        let report = scanner.pipeline_report(StrategyId::Pmcc).unwrap();
        assert!(report.steps.len() > 2);
        for step in &report.steps {
            assert_eq!(step.input_count, 0);
        }
        assert_eq!(report.summary.final_output, 0);
    }

    #[test]
    fn test_poisoned_report_store_keeps_scan_alive() {
        use crate::provider::RawOptionRecord;
        use chrono::{Days, Utc};

        let expiry = |days: u64| {
            (Utc::now().date_naive() + Days::new(days))
                .format("%Y-%m-%d")
                .to_string()
        };
        let record = |days: u64, strike: f64, premium: f64, delta: f64| RawOptionRecord {
            expiration: Some(expiry(days)),
            strike: Some(strike),
            option_type: Some("call".to_string()),
            bid: Some(premium - 0.05),
            ask: Some(premium + 0.05),
            implied_volatility: Some(0.25),
            delta: Some(delta),
            volume: Some(150),
            open_interest: Some(500),
        };
        let provider = StaticProvider::new(
            RawOptionChain {
                symbol: "SPY".to_string(),
                data: vec![
                    record(200, 90.0, 14.00, 0.80),
                    record(40, 105.0, 2.00, 0.30),
                ],
            },
            100.0,
        );
        let scanner = Scanner::new(Box::new(provider));

        let poisoned = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = scanner.reports.lock().unwrap();
            panic!("poison the store");
        }));
        assert!(poisoned.is_err());

        // The scan still produces ranked results, only the report is lost
        let results = scanner
            .scan("SPY", StrategyId::Pmcc, &FilterCriteria::default())
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(scanner.pipeline_report(StrategyId::Pmcc).is_none());
    }

    #[test]
    fn test_invalid_criteria_fail_before_fetch() {
        let provider = StaticProvider::new(
            RawOptionChain { symbol: "SPY".to_string(), data: vec![] },
            100.0,
        );
        let scanner = Scanner::new(Box::new(provider));
        let mut criteria = FilterCriteria::default();
        criteria.bounds.insert("min_long_delta".to_string(), 2.0);
        let err = scanner.scan("SPY", StrategyId::Pmcc, &criteria).unwrap_err();
        assert!(matches!(err, ScanError::InvalidFilterCriteria(_)));
        // No report stored: the scan never reached the funnel
        assert!(scanner.pipeline_report(StrategyId::Pmcc).is_none());
    }
}

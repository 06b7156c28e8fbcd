use chrono::{Days, Utc};
use options_scanner::models::FilterCriteria;
use options_scanner::provider::{RawOptionChain, RawOptionRecord, StaticProvider};
use options_scanner::{ScanError, Scanner, StrategyId};

fn expiry_in(days: u64) -> String {
    (Utc::now().date_naive() + Days::new(days)).format("%Y-%m-%d").to_string()
}

fn record(
    days_out: u64,
    strike: f64,
    opt_type: &str,
    premium: f64,
    delta: f64,
    volume: u64,
) -> RawOptionRecord {
    RawOptionRecord {
        expiration: Some(expiry_in(days_out)),
        strike: Some(strike),
        option_type: Some(opt_type.to_string()),
        bid: Some(premium - 0.05),
        ask: Some(premium + 0.05),
        implied_volatility: Some(0.25),
        delta: Some(delta),
        volume: Some(volume),
        open_interest: Some(500),
    }
}

fn scanner_for(records: Vec<RawOptionRecord>, spot: f64) -> Scanner {
    let provider = StaticProvider::new(
        RawOptionChain { symbol: "SPY".to_string(), data: records },
        spot,
    );
    Scanner::new(Box::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pmcc_end_to_end() {
        let scanner = scanner_for(
            vec![
                record(200, 90.0, "call", 14.00, 0.80, 200),
                record(40, 105.0, "call", 2.00, 0.30, 150),
            ],
            100.0,
        );
        let results = scanner
            .scan("SPY", StrategyId::Pmcc, &FilterCriteria::default())
            .unwrap();
        assert_eq!(results.len(), 1);

        let result = &results[0];
        assert_eq!(result.candidate.legs.len(), 2);
        assert!((result.candidate.net_debit_credit - 12.00).abs() < 1e-9);
        assert!(result.score > 0.0 && result.score <= 100.0);
        // Width 15 minus debit 12
        assert!((result.metrics.max_profit.finite().unwrap() - 3.00).abs() < 1e-9);
    }

    #[test]
    fn test_synthetic_long_breakeven_scenario() {
        // Long call + short put at K=100, net cost 0.20: single breakeven
        // at 100.20.
        let scanner = scanner_for(
            vec![
                record(45, 100.0, "call", 2.50, 0.52, 100),
                record(45, 100.0, "put", 2.30, -0.48, 100),
            ],
            100.0,
        );
        let results = scanner
            .scan("SPY", StrategyId::SyntheticLong, &FilterCriteria::default())
            .unwrap();
        assert_eq!(results.len(), 1);

        let metrics = &results[0].metrics;
        assert_eq!(metrics.breakevens, vec![100.20]);
        assert!(metrics.max_profit.is_unlimited());
        assert!(metrics.max_loss.is_unlimited());
    }

    #[test]
    fn test_pipeline_report_counts_chain() {
        let scanner = scanner_for(
            vec![
                record(200, 90.0, "call", 14.00, 0.80, 200),
                record(200, 95.0, "call", 10.50, 0.55, 180), // fails long delta
                record(40, 105.0, "call", 2.00, 0.30, 150),
                record(40, 110.0, "call", 0.10, 0.12, 90), // fails short delta and credit
            ],
            100.0,
        );
        scanner
            .scan("SPY", StrategyId::Pmcc, &FilterCriteria::default())
            .unwrap();

        let report = scanner.pipeline_report(StrategyId::Pmcc).unwrap();
        assert!(report.summary.total_input > 0);
        for step in &report.steps {
            assert_eq!(step.input_count, step.passed_count + step.filtered_count);
        }
        for pair in report.steps.windows(2) {
            assert_eq!(pair[1].input_count, pair[0].passed_count);
        }
        assert_eq!(
            report.steps.last().unwrap().passed_count,
            report.summary.final_output
        );
    }

    #[test]
    fn test_overly_strict_criteria_yield_no_candidates() {
        let scanner = scanner_for(
            vec![
                record(200, 90.0, "call", 14.00, 0.80, 200),
                record(40, 105.0, "call", 2.00, 0.30, 150),
            ],
            100.0,
        );
        let mut criteria = FilterCriteria::default();
        criteria.bounds.insert("min_credit".to_string(), 500.0);
        let err = scanner.scan("SPY", StrategyId::Pmcc, &criteria).unwrap_err();
        assert!(matches!(err, ScanError::NoCandidatesFound { .. }));

        // Funnel remains fully recorded past the emptying stage
        let report = scanner.pipeline_report(StrategyId::Pmcc).unwrap();
        let credit_step = report.steps.iter().find(|s| s.name == "Credit").unwrap();
        assert_eq!(credit_step.passed_count, 0);
        let after: Vec<_> = report
            .steps
            .iter()
            .skip_while(|s| s.name != "Credit")
            .skip(1)
            .collect();
        assert!(!after.is_empty());
        for step in after {
            assert_eq!(step.input_count, 0);
        }
    }

    #[test]
    fn test_results_sorted_descending_by_score() {
        // Two short candidates with different premiums produce two ranked
        // diagonal spreads.
        let scanner = scanner_for(
            vec![
                record(200, 90.0, "call", 14.00, 0.80, 200),
                record(40, 105.0, "call", 2.00, 0.30, 150),
                record(40, 110.0, "call", 0.90, 0.20, 120),
            ],
            100.0,
        );
        let results = scanner
            .scan("SPY", StrategyId::Pmcc, &FilterCriteria::default())
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].score >= results[1].score);
    }

    #[test]
    fn test_symbol_threaded_into_report() {
        let scanner = scanner_for(
            vec![
                record(45, 100.0, "call", 2.50, 0.52, 100),
                record(45, 100.0, "put", 2.30, -0.48, 100),
            ],
            100.0,
        );
        scanner
            .scan("SPY", StrategyId::SyntheticLong, &FilterCriteria::default())
            .unwrap();
        let report = scanner.pipeline_report(StrategyId::SyntheticLong).unwrap();
        assert_eq!(report.symbol, "SPY");
        assert_eq!(report.strategy, "synthetic_long");
        assert_eq!(report.stock_price, 100.0);
        // No report for a strategy that never ran
        assert!(scanner.pipeline_report(StrategyId::IronCondor).is_none());
    }
}

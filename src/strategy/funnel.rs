//! Constraint evaluator. Each strategy carries an ordered list of named
//! predicate stages; every scan runs the full list and records one
//! [`PipelineStep`] per stage, even when the candidate set is already empty,
//! so the funnel report is always complete.

use crate::models::{Candidate, PipelineReport, PipelineStep, PipelineSummary, round2};
use crate::payoff;
use crate::strategy::{ResolvedCriteria, StrategyId};
use rayon::prelude::*;
use std::time::Instant;

/// One named filter stage. The predicate is a pure function of a single
/// candidate; stages only partition, never reorder.
pub struct Stage {
    pub name: &'static str,
    pub description: String,
    predicate: Box<dyn Fn(&Candidate) -> bool + Send + Sync>,
}

impl Stage {
    fn new(
        name: &'static str,
        description: String,
        predicate: impl Fn(&Candidate) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self { name, description, predicate: Box::new(predicate) }
    }
}

/// Accumulates funnel accounting for one scan.
pub struct PipelineTracker {
    symbol: String,
    stock_price: f64,
    strategy: StrategyId,
    steps: Vec<PipelineStep>,
    start: Instant,
}

impl PipelineTracker {
    pub fn new(symbol: &str, stock_price: f64, strategy: StrategyId) -> Self {
        Self {
            symbol: symbol.to_string(),
            stock_price,
            strategy,
            steps: Vec::new(),
            start: Instant::now(),
        }
    }

    pub fn add_step(&mut self, name: &str, description: &str, input_count: usize, passed_count: usize) {
        let pass_rate = if input_count > 0 {
            (passed_count as f64 / input_count as f64 * 1000.0).round() / 10.0
        } else {
            0.0
        };
        self.steps.push(PipelineStep {
            step: self.steps.len() + 1,
            name: name.to_string(),
            description: description.to_string(),
            input_count,
            passed_count,
            filtered_count: input_count - passed_count,
            pass_rate,
        });
    }

    pub fn finalize(self, final_count: usize) -> PipelineReport {
        let total_input = self.steps.first().map(|s| s.input_count).unwrap_or(0);
        let overall_pass_rate = if total_input > 0 {
            round2(final_count as f64 / total_input as f64 * 100.0)
        } else {
            0.0
        };
        PipelineReport {
            symbol: self.symbol,
            stock_price: self.stock_price,
            strategy: self.strategy.as_str().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            summary: PipelineSummary {
                total_input,
                final_output: final_count,
                overall_pass_rate,
                total_steps: self.steps.len(),
                scan_duration_ms: self.start.elapsed().as_millis() as u64,
            },
            steps: self.steps,
        }
    }
}

/// Run every stage over the candidate stream, recording one step per stage.
/// Candidates are evaluated in parallel within a stage; the per-stage counts
/// are order-independent aggregates so this is safe.
pub fn run(stages: &[Stage], candidates: Vec<Candidate>, tracker: &mut PipelineTracker) -> Vec<Candidate> {
    let mut current = candidates;
    for stage in stages {
        let input = current.len();
        let (passed, _rejected): (Vec<Candidate>, Vec<Candidate>) =
            current.into_par_iter().partition(|c| (stage.predicate)(c));
        tracker.add_step(stage.name, &stage.description, input, passed.len());
        current = passed;
    }
    current
}

fn delta_in(value: f64, min: f64, max: f64) -> bool {
    let abs = value.abs();
    abs >= min && abs <= max
}

/// Probability-of-profit gate shared by the condor and butterfly funnels.
fn pop_at_least(
    min_prob: f64,
    spot: f64,
    risk_free_rate: f64,
    fallback_iv: f64,
) -> impl Fn(&Candidate) -> bool + Send + Sync {
    move |c: &Candidate| {
        payoff::prob_profit(&c.legs, spot, risk_free_rate, fallback_iv)
            .map(|p| p >= min_prob)
            .unwrap_or(false)
    }
}

/// The ordered stage list for one strategy. DTE and spread-width stages pass
/// every candidate by construction (the generator pre-restricts on them) but
/// still execute and report, keeping the funnel shape stable.
pub fn stages_for(
    strategy: StrategyId,
    criteria: &ResolvedCriteria,
    spot: f64,
    risk_free_rate: f64,
    avg_iv: f64,
) -> Vec<Stage> {
    match strategy {
        StrategyId::Pmcc | StrategyId::Pmcp => diagonal_stages(criteria),
        StrategyId::SyntheticLong => synthetic_stages(criteria, spot),
        StrategyId::JadeLizard | StrategyId::TwistedSister => lizard_stages(criteria, spot),
        StrategyId::IronCondor => condor_stages(criteria, spot, risk_free_rate, avg_iv),
        StrategyId::BwbPut | StrategyId::BwbCall => butterfly_stages(criteria, spot, risk_free_rate, avg_iv),
    }
}

/// Legs: `[long far-dated, short near-dated]`.
fn diagonal_stages(criteria: &ResolvedCriteria) -> Vec<Stage> {
    let (min_ld, max_ld) = (criteria.get("min_long_delta"), criteria.get("max_long_delta"));
    let (min_sd, max_sd) = (criteria.get("min_short_delta"), criteria.get("max_short_delta"));
    let min_long_dte = criteria.get_i64("min_long_dte");
    let (min_short_dte, max_short_dte) = (criteria.get_i64("min_short_dte"), criteria.get_i64("max_short_dte"));
    let min_credit = criteria.get("min_credit");
    let min_volume = criteria.get("min_volume") as u64;

    vec![
        Stage::new(
            "Long Delta",
            format!("Long leg delta {:.2}-{:.2}", min_ld, max_ld),
            move |c| delta_in(c.legs[0].contract.delta, min_ld, max_ld),
        ),
        Stage::new(
            "Short Delta",
            format!("Short leg delta {:.2}-{:.2}", min_sd, max_sd),
            move |c| delta_in(c.legs[1].contract.delta, min_sd, max_sd),
        ),
        Stage::new(
            "Long DTE",
            format!("Long leg expiry >= {} days out", min_long_dte),
            move |c| c.legs[0].contract.days_to_expiry >= min_long_dte,
        ),
        Stage::new(
            "Short DTE",
            format!("Short leg expiry {}-{} days out", min_short_dte, max_short_dte),
            move |c| {
                let dte = c.legs[1].contract.days_to_expiry;
                dte >= min_short_dte && dte <= max_short_dte
            },
        ),
        Stage::new(
            "Credit",
            format!("Short leg premium >= ${:.2}", min_credit),
            move |c| c.legs[1].contract.premium >= min_credit,
        ),
        Stage::new(
            "Volume",
            format!("All legs volume >= {}", min_volume),
            move |c| c.min_volume() >= min_volume,
        ),
        Stage::new(
            "Profitability",
            "Strike width exceeds net debit".to_string(),
            move |c| {
                let width = (c.legs[1].contract.strike - c.legs[0].contract.strike).abs();
                width > c.net_debit_credit
            },
        ),
    ]
}

/// Legs: `[long call, short put]`, same strike and expiry.
fn synthetic_stages(criteria: &ResolvedCriteria, spot: f64) -> Vec<Stage> {
    let (min_dte, max_dte) = (criteria.get_i64("min_dte"), criteria.get_i64("max_dte"));
    let max_distance = criteria.get("max_strike_distance");
    let (atm_min, atm_max) = (criteria.get("atm_delta_min"), criteria.get("atm_delta_max"));
    let min_volume = criteria.get("min_volume") as u64;
    let max_cost = criteria.get("max_cost");
    let min_delta = criteria.get("min_delta");

    vec![
        Stage::new(
            "DTE Window",
            format!("Days to expiry {}-{}", min_dte, max_dte),
            move |c| {
                let dte = c.nearest_expiry_days();
                dte >= min_dte && dte <= max_dte
            },
        ),
        Stage::new(
            "ATM Strike",
            format!("Strike within {:.0}% of stock price", max_distance * 100.0),
            move |c| (c.legs[0].contract.strike - spot).abs() / spot <= max_distance,
        ),
        Stage::new(
            "Volume",
            format!("Both legs volume >= {}", min_volume),
            move |c| c.min_volume() >= min_volume,
        ),
        Stage::new(
            "ATM Delta",
            format!("Call delta {:.2}-{:.2}", atm_min, atm_max),
            move |c| delta_in(c.legs[0].contract.delta, atm_min, atm_max),
        ),
        Stage::new(
            "Cost",
            format!("Net cost <= ${:.2}", max_cost),
            move |c| c.net_debit_credit <= max_cost,
        ),
        Stage::new(
            "Combined Delta",
            format!("Synthetic delta >= {:.2}", min_delta),
            move |c| c.legs[0].contract.delta + c.legs[1].contract.delta.abs() >= min_delta,
        ),
    ]
}

/// Legs: `[naked short, spread short, long wing]`. Jade Lizard carries the
/// naked leg on the put side, Twisted Sister on the call side; the delta
/// bounds are named per option type so both shapes share one stage list.
fn lizard_stages(criteria: &ResolvedCriteria, spot: f64) -> Vec<Stage> {
    let (min_dte, max_dte) = (criteria.get_i64("min_dte"), criteria.get_i64("max_dte"));
    let (put_min, put_max) = (criteria.get("put_delta_min"), criteria.get("put_delta_max"));
    let (call_min, call_max) = (criteria.get("call_delta_min"), criteria.get("call_delta_max"));
    let (width_min, width_max) = (criteria.get("spread_width_min"), criteria.get("spread_width_max"));
    let min_credit = criteria.get("min_credit");
    let min_volume = criteria.get("min_volume") as u64;
    let max_ratio = criteria.get("max_spread_cost_ratio");

    let delta_bounds = move |c: &Candidate, leg: usize| {
        use crate::models::OptionType;
        match c.legs[leg].contract.option_type {
            OptionType::Put => (put_min, put_max),
            OptionType::Call => (call_min, call_max),
        }
    };

    vec![
        Stage::new(
            "DTE Window",
            format!("Days to expiry {}-{}", min_dte, max_dte),
            move |c| {
                let dte = c.nearest_expiry_days();
                dte >= min_dte && dte <= max_dte
            },
        ),
        Stage::new(
            "Naked Delta",
            format!("Naked short delta within {:.2}-{:.2} / {:.2}-{:.2}", put_min, put_max, call_min, call_max),
            move |c| {
                let (min, max) = delta_bounds(c, 0);
                delta_in(c.legs[0].contract.delta, min, max)
            },
        ),
        Stage::new(
            "Spread Delta",
            "Spread short delta within its configured range".to_string(),
            move |c| {
                let (min, max) = delta_bounds(c, 1);
                delta_in(c.legs[1].contract.delta, min, max)
            },
        ),
        Stage::new(
            "Spread Width",
            format!("Spread width {:.0}-{:.0}% of stock price", width_min, width_max),
            move |c| {
                let width = (c.legs[2].contract.strike - c.legs[1].contract.strike).abs();
                width >= spot * width_min / 100.0 && width <= spot * width_max / 100.0
            },
        ),
        Stage::new(
            "Credit",
            format!("Net credit >= ${:.2}", min_credit),
            move |c| c.credit() >= min_credit,
        ),
        Stage::new(
            "Volume",
            format!("All legs volume >= {}", min_volume),
            move |c| c.min_volume() >= min_volume,
        ),
        Stage::new(
            "Spread Cost Ratio",
            format!("Wing cost <= {:.0}% of spread short premium", max_ratio * 100.0),
            move |c| {
                let short_premium = c.legs[1].contract.premium;
                short_premium > 0.0 && c.legs[2].contract.premium / short_premium <= max_ratio
            },
        ),
    ]
}

/// Legs: `[long put, short put, short call, long call]`.
fn condor_stages(
    criteria: &ResolvedCriteria,
    spot: f64,
    risk_free_rate: f64,
    avg_iv: f64,
) -> Vec<Stage> {
    let (min_dte, max_dte) = (criteria.get_i64("min_dte"), criteria.get_i64("max_dte"));
    let (sp_min, sp_max) = (criteria.get("short_put_delta_min"), criteria.get("short_put_delta_max"));
    let (sc_min, sc_max) = (criteria.get("short_call_delta_min"), criteria.get("short_call_delta_max"));
    let min_credit = criteria.get("min_credit");
    let min_ratio = criteria.get("min_credit_to_risk_ratio");
    let max_risk = criteria.get("max_risk_per_contract");
    let min_volume = criteria.get("min_volume") as u64;
    let min_prob = criteria.get("min_prob_profit");

    let max_wing_width = |c: &Candidate| {
        let put_width = c.legs[1].contract.strike - c.legs[0].contract.strike;
        let call_width = c.legs[3].contract.strike - c.legs[2].contract.strike;
        put_width.max(call_width)
    };

    vec![
        Stage::new(
            "DTE Window",
            format!("Days to expiry {}-{}", min_dte, max_dte),
            move |c| {
                let dte = c.nearest_expiry_days();
                dte >= min_dte && dte <= max_dte
            },
        ),
        Stage::new(
            "Short Put Delta",
            format!("Short put delta {:.2}-{:.2}", sp_min, sp_max),
            move |c| delta_in(c.legs[1].contract.delta, sp_min, sp_max),
        ),
        Stage::new(
            "Short Call Delta",
            format!("Short call delta {:.2}-{:.2}", sc_min, sc_max),
            move |c| delta_in(c.legs[2].contract.delta, sc_min, sc_max),
        ),
        Stage::new(
            "Credit",
            format!("Net credit >= ${:.2}", min_credit),
            move |c| c.credit() >= min_credit,
        ),
        Stage::new(
            "Credit/Risk",
            format!("Credit-to-risk ratio >= {:.2}", min_ratio),
            move |c| {
                let risk = max_wing_width(c) - c.credit();
                risk > 0.0 && c.credit() / risk >= min_ratio
            },
        ),
        Stage::new(
            "Max Risk",
            format!("Risk per contract <= ${:.0}", max_risk),
            move |c| (max_wing_width(c) - c.credit()) * 100.0 <= max_risk,
        ),
        Stage::new(
            "Volume",
            format!("All legs volume >= {}", min_volume),
            move |c| c.min_volume() >= min_volume,
        ),
        Stage::new(
            "Prob Profit",
            format!("Probability of profit >= {:.0}%", min_prob * 100.0),
            pop_at_least(min_prob, spot, risk_free_rate, avg_iv),
        ),
    ]
}

/// Legs: `[long low wing, short body x2, long high wing]`.
fn butterfly_stages(
    criteria: &ResolvedCriteria,
    spot: f64,
    risk_free_rate: f64,
    avg_iv: f64,
) -> Vec<Stage> {
    let (min_dte, max_dte) = (criteria.get_i64("min_dte"), criteria.get_i64("max_dte"));
    let (sd_min, sd_max) = (criteria.get("short_delta_min"), criteria.get("short_delta_max"));
    let max_debit = criteria.get("max_debit");
    let min_volume = criteria.get("min_volume") as u64;
    let min_prob = criteria.get("min_prob_profit");

    vec![
        Stage::new(
            "DTE Window",
            format!("Days to expiry {}-{}", min_dte, max_dte),
            move |c| {
                let dte = c.nearest_expiry_days();
                dte >= min_dte && dte <= max_dte
            },
        ),
        Stage::new(
            "Body Delta",
            format!("Short body delta {:.2}-{:.2}", sd_min, sd_max),
            move |c| delta_in(c.legs[1].contract.delta, sd_min, sd_max),
        ),
        Stage::new(
            "Cost",
            format!("Net debit <= ${:.2}", max_debit),
            move |c| c.net_debit_credit <= max_debit,
        ),
        Stage::new(
            "Volume",
            format!("All legs volume >= {}", min_volume),
            move |c| c.min_volume() >= min_volume,
        ),
        Stage::new(
            "Prob Profit",
            format!("Probability of profit >= {:.0}%", min_prob * 100.0),
            pop_at_least(min_prob, spot, risk_free_rate, avg_iv),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FilterCriteria, Leg, OptionContract, OptionType, Side};
    use crate::strategy::resolve_criteria;
    use chrono::NaiveDate;

    fn contract(option_type: OptionType, strike: f64, premium: f64, delta: f64, dte: i64) -> OptionContract {
        OptionContract {
            option_type,
            strike,
            expiry: NaiveDate::from_ymd_opt(2026, 1, 2).unwrap() + chrono::Days::new(dte as u64),
            premium,
            volume: 100,
            open_interest: 500,
            implied_volatility: 0.25,
            delta,
            days_to_expiry: dte,
        }
    }

    fn pmcc_candidate(long_delta: f64, short_premium: f64) -> Candidate {
        Candidate::new(vec![
            Leg::new(contract(OptionType::Call, 90.0, 14.00, long_delta, 200), Side::Long),
            Leg::new(contract(OptionType::Call, 105.0, short_premium, 0.30, 40), Side::Short),
        ])
    }

    fn pmcc_stages() -> Vec<Stage> {
        let criteria = resolve_criteria(StrategyId::Pmcc, &FilterCriteria::default()).unwrap();
        stages_for(StrategyId::Pmcc, &criteria, 100.0, 0.05, 0.25)
    }

    #[test]
    fn test_step_counts_chain() {
        let candidates = vec![
            pmcc_candidate(0.80, 1.20), // passes everything
            pmcc_candidate(0.40, 1.20), // fails long delta
            pmcc_candidate(0.80, 0.10), // fails min credit
        ];
        let mut tracker = PipelineTracker::new("SPY", 100.0, StrategyId::Pmcc);
        let survivors = run(&pmcc_stages(), candidates, &mut tracker);
        assert_eq!(survivors.len(), 1);

        let report = tracker.finalize(survivors.len());
        assert_eq!(report.summary.total_input, 3);
        assert_eq!(report.summary.final_output, 1);
        for step in &report.steps {
            assert_eq!(step.input_count, step.passed_count + step.filtered_count);
        }
        for pair in report.steps.windows(2) {
            assert_eq!(pair[1].input_count, pair[0].passed_count);
        }
    }

    #[test]
    fn test_stages_execute_on_empty_input() {
        let mut tracker = PipelineTracker::new("SPY", 100.0, StrategyId::Pmcc);
        let stages = pmcc_stages();
        let survivors = run(&stages, Vec::new(), &mut tracker);
        assert!(survivors.is_empty());

        let report = tracker.finalize(0);
        assert_eq!(report.steps.len(), stages.len());
        for step in &report.steps {
            assert_eq!(step.input_count, 0);
            assert_eq!(step.pass_rate, 0.0);
        }
    }

    #[test]
    fn test_pass_rate_rounded_to_tenth() {
        let mut tracker = PipelineTracker::new("SPY", 100.0, StrategyId::Pmcc);
        tracker.add_step("x", "y", 3, 1);
        assert_eq!(tracker.steps[0].pass_rate, 33.3);
    }

    #[test]
    fn test_generator_aligned_stages_pass_fully() {
        // A structurally valid PMCC candidate sails through the DTE stages.
        let candidates = vec![pmcc_candidate(0.80, 1.20)];
        let mut tracker = PipelineTracker::new("SPY", 100.0, StrategyId::Pmcc);
        run(&pmcc_stages(), candidates, &mut tracker);
        let report = tracker.finalize(1);
        let long_dte = report.steps.iter().find(|s| s.name == "Long DTE").unwrap();
        assert_eq!(long_dte.pass_rate, 100.0);
    }
}

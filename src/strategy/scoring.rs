//! Composite scoring. Each strategy normalizes its metric set into [0, 1]
//! and combines it with the resolved weights into a 0-100 score; candidates
//! are then ordered descending by score with documented tie-breaks.

use crate::models::{Candidate, PayoffBound, RiskMetrics, ScoredCandidate, round2};
use crate::payoff;
use crate::strategy::{ResolvedCriteria, StrategyId};
use std::collections::HashMap;

fn unit(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

fn weight(weights: &HashMap<String, f64>, name: &str) -> f64 {
    weights.get(name).copied().unwrap_or(0.0)
}

/// Normalized metric set for one candidate, keyed by the same names as the
/// strategy's scoring weights.
fn normalized_metrics(
    strategy: StrategyId,
    candidate: &Candidate,
    metrics: &RiskMetrics,
    spot: f64,
    criteria: &ResolvedCriteria,
) -> Vec<(&'static str, f64)> {
    let legs = &candidate.legs;
    match strategy {
        StrategyId::Pmcc | StrategyId::Pmcp => {
            vec![
                ("roi", unit(metrics.roi_pct.unwrap_or(0.0) / 100.0)),
                ("risk_reward", unit(metrics.risk_reward_ratio.unwrap_or(0.0) / 3.0)),
                ("premium", unit(legs[1].contract.premium / 5.0)),
                ("long_delta", unit(1.0 - (legs[0].contract.delta.abs() - 0.80).abs())),
                ("short_delta", unit(1.0 - (legs[1].contract.delta.abs() - 0.30).abs())),
            ]
        }
        StrategyId::SyntheticLong => {
            let max_cost = criteria.get("max_cost");
            let cost = if max_cost > 0.0 {
                unit((max_cost - candidate.net_debit_credit) / max_cost)
            } else {
                1.0
            };
            let strike = legs[0].contract.strike;
            vec![
                ("cost", cost),
                ("delta", unit(legs[0].contract.delta + legs[1].contract.delta.abs())),
                ("strike_proximity", unit(1.0 - (strike - spot).abs() / spot)),
                ("volume", unit(candidate.min_volume() as f64 / 500.0)),
            ]
        }
        StrategyId::JadeLizard | StrategyId::TwistedSister => {
            let credit = candidate.credit();
            let dte = candidate.nearest_expiry_days().max(1) as f64;
            let capital = (legs[0].contract.strike - credit).abs().max(0.01);
            let annualized_roc = credit / capital * 100.0 * 365.0 / dte;
            let avg_volume = legs.iter().map(|l| l.contract.volume).sum::<u64>() as f64 / 3.0;
            // The protected wing carries no risk when the credit covers the
            // spread width: upside for Jade Lizard, downside for its mirror.
            let protected_safe = match strategy {
                StrategyId::JadeLizard => payoff::upside_loss(legs) == PayoffBound::Finite(0.0),
                _ => payoff::payoff_at(legs, 0.0) >= 0.0,
            };
            vec![
                ("credit", unit(credit / 5.0)),
                ("roc", unit(annualized_roc / 50.0)),
                ("pop", unit(metrics.prob_profit_pct / 100.0)),
                ("volume", unit(avg_volume / 100.0)),
                ("risk_bonus", if protected_safe { 0.2 } else { 0.0 }),
            ]
        }
        StrategyId::IronCondor => {
            let credit = candidate.credit();
            let put_width = legs[1].contract.strike - legs[0].contract.strike;
            let call_width = legs[3].contract.strike - legs[2].contract.strike;
            let risk = put_width.max(call_width) - credit;
            let credit_to_risk = if risk > 0.0 { credit / risk } else { 1.0 };
            let width_diff_pct = (put_width - call_width).abs() / spot * 100.0;
            vec![
                ("credit_to_risk", unit(credit_to_risk)),
                ("pop", unit(metrics.prob_profit_pct / 100.0)),
                ("credit_amount", unit(credit / 10.0)),
                ("volume", unit(candidate.min_volume() as f64 / 100.0)),
                ("balanced", unit(1.0 - width_diff_pct / 10.0)),
            ]
        }
        StrategyId::BwbPut | StrategyId::BwbCall => {
            let dte = candidate.nearest_expiry_days().max(1) as f64;
            let annualized_roi = metrics.roi_pct.unwrap_or(0.0) * 365.0 / dte;
            let weighted_volume = (legs[0].contract.volume
                + legs[1].contract.volume * 2
                + legs[2].contract.volume) as f64
                / 4.0;
            vec![
                ("roi", unit(annualized_roi / 100.0)),
                ("pop", unit(metrics.prob_profit_pct / 100.0)),
                ("risk_reward", unit(metrics.risk_reward_ratio.unwrap_or(0.0) / 2.0)),
                ("volume", unit(weighted_volume / 100.0)),
                ("credit_bonus", if candidate.net_debit_credit < 0.0 { 0.15 } else { 0.0 }),
            ]
        }
    }
}

fn loss_magnitude(metrics: &RiskMetrics) -> f64 {
    match metrics.max_loss {
        PayoffBound::Finite(l) => l.abs(),
        PayoffBound::Unlimited => f64::INFINITY,
    }
}

/// Score and rank funnel survivors. Ties are broken by higher credit
/// received, then lower max-loss magnitude, then stable input order; the
/// final tie-break is arbitrary and exists only to make ranking
/// deterministic.
pub fn score_and_rank(
    strategy: StrategyId,
    survivors: Vec<(Candidate, RiskMetrics)>,
    weights: &HashMap<String, f64>,
    spot: f64,
    criteria: &ResolvedCriteria,
) -> Vec<ScoredCandidate> {
    let mut scored: Vec<ScoredCandidate> = survivors
        .into_iter()
        .map(|(candidate, metrics)| {
            let score: f64 = normalized_metrics(strategy, &candidate, &metrics, spot, criteria)
                .iter()
                .map(|(name, value)| weight(weights, name) * value * 100.0)
                .sum();
            ScoredCandidate { candidate, metrics, score: round2(score) }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                b.candidate
                    .credit()
                    .partial_cmp(&a.candidate.credit())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| {
                loss_magnitude(&a.metrics)
                    .partial_cmp(&loss_magnitude(&b.metrics))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    });
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FilterCriteria, Leg, OptionContract, OptionType, Side};
    use crate::strategy::{resolve_criteria, resolve_weights};
    use chrono::NaiveDate;

    fn contract(option_type: OptionType, strike: f64, premium: f64, delta: f64, volume: u64) -> OptionContract {
        OptionContract {
            option_type,
            strike,
            expiry: NaiveDate::from_ymd_opt(2026, 2, 20).unwrap(),
            premium,
            volume,
            open_interest: 500,
            implied_volatility: 0.25,
            delta,
            days_to_expiry: 45,
        }
    }

    fn pmcc_fixture(short_premium: f64) -> (Candidate, RiskMetrics) {
        let candidate = Candidate::new(vec![
            Leg::new(contract(OptionType::Call, 90.0, 14.00, 0.80, 200), Side::Long),
            Leg::new(contract(OptionType::Call, 105.0, short_premium, 0.30, 150), Side::Short),
        ]);
        let metrics = payoff::risk_metrics(&candidate, 100.0, 0.05, 0.25).unwrap();
        (candidate, metrics)
    }

    fn pmcc_inputs() -> (ResolvedCriteria, HashMap<String, f64>) {
        let criteria = resolve_criteria(StrategyId::Pmcc, &FilterCriteria::default()).unwrap();
        let weights = resolve_weights(StrategyId::Pmcc, &FilterCriteria::default()).unwrap();
        (criteria, weights)
    }

    #[test]
    fn test_pmcc_score_composition() {
        let (criteria, weights) = pmcc_inputs();
        let (candidate, metrics) = pmcc_fixture(2.00);
        // net debit 12.00, max profit 15 - 12 = 3.00, roi 25%, rr 0.25
        assert!((metrics.roi_pct.unwrap() - 25.0).abs() < 0.01);
        let scored =
            score_and_rank(StrategyId::Pmcc, vec![(candidate, metrics)], &weights, 100.0, &criteria);
        // roi 0.25*0.25 + rr (0.25/3)*0.20 + premium (2/5)*0.15
        //   + long_delta 1.0*0.20 + short_delta 1.0*0.20
        let expected =
            (0.25 * 0.25 + (0.25 / 3.0) * 0.20 + 0.40 * 0.15 + 0.20 + 0.20) * 100.0;
        assert!((scored[0].score - round2(expected)).abs() < 0.01);
    }

    #[test]
    fn test_ranking_descends_by_score() {
        let (criteria, weights) = pmcc_inputs();
        // Higher short premium means more credit collected and a better score.
        let poor = pmcc_fixture(0.50);
        let rich = pmcc_fixture(3.00);
        let scored = score_and_rank(
            StrategyId::Pmcc,
            vec![poor, rich],
            &weights,
            100.0,
            &criteria,
        );
        assert!(scored[0].score >= scored[1].score);
        assert_eq!(scored[0].candidate.legs[1].contract.premium, 3.00);
    }

    #[test]
    fn test_equal_scores_preserve_input_order() {
        let (criteria, weights) = pmcc_inputs();
        let first = pmcc_fixture(2.00);
        let second = pmcc_fixture(2.00);
        let marker = first.0.legs[0].contract.strike;
        let scored = score_and_rank(
            StrategyId::Pmcc,
            vec![first, second],
            &weights,
            100.0,
            &criteria,
        );
        assert_eq!(scored[0].score, scored[1].score);
        assert_eq!(scored[0].candidate.legs[0].contract.strike, marker);
    }

    #[test]
    fn test_jade_lizard_risk_bonus() {
        let criteria = resolve_criteria(StrategyId::JadeLizard, &FilterCriteria::default()).unwrap();

        // Credit 1.00 > width 0.50: bonus applies
        let safe = Candidate::new(vec![
            Leg::new(contract(OptionType::Put, 95.0, 0.45, -0.25, 80), Side::Short),
            Leg::new(contract(OptionType::Call, 105.0, 0.80, 0.25, 80), Side::Short),
            Leg::new(contract(OptionType::Call, 105.5, 0.25, 0.15, 80), Side::Long),
        ]);
        // Credit 0.60 < width 5.00: upside risk remains
        let risky = Candidate::new(vec![
            Leg::new(contract(OptionType::Put, 95.0, 0.45, -0.25, 80), Side::Short),
            Leg::new(contract(OptionType::Call, 105.0, 0.40, 0.25, 80), Side::Short),
            Leg::new(contract(OptionType::Call, 110.0, 0.25, 0.15, 80), Side::Long),
        ]);
        let safe_metrics = payoff::risk_metrics(&safe, 100.0, 0.05, 0.25).unwrap();
        let risky_metrics = payoff::risk_metrics(&risky, 100.0, 0.05, 0.25).unwrap();

        let safe_bonus = normalized_metrics(StrategyId::JadeLizard, &safe, &safe_metrics, 100.0, &criteria)
            .iter()
            .find(|(n, _)| *n == "risk_bonus")
            .unwrap()
            .1;
        let risky_bonus =
            normalized_metrics(StrategyId::JadeLizard, &risky, &risky_metrics, 100.0, &criteria)
                .iter()
                .find(|(n, _)| *n == "risk_bonus")
                .unwrap()
                .1;
        assert_eq!(safe_bonus, 0.2);
        assert_eq!(risky_bonus, 0.0);
    }

    #[test]
    fn test_condor_balanced_metric() {
        let criteria = resolve_criteria(StrategyId::IronCondor, &FilterCriteria::default()).unwrap();
        let candidate = Candidate::new(vec![
            Leg::new(contract(OptionType::Put, 90.0, 0.60, -0.10, 80), Side::Long),
            Leg::new(contract(OptionType::Put, 95.0, 1.20, -0.25, 80), Side::Short),
            Leg::new(contract(OptionType::Call, 105.0, 1.10, 0.25, 80), Side::Short),
            Leg::new(contract(OptionType::Call, 110.0, 0.50, 0.10, 80), Side::Long),
        ]);
        let metrics = payoff::risk_metrics(&candidate, 100.0, 0.05, 0.25).unwrap();
        let m = normalized_metrics(StrategyId::IronCondor, &candidate, &metrics, 100.0, &criteria);
        // Equal 5-wide wings: perfectly balanced
        assert_eq!(m.iter().find(|(n, _)| *n == "balanced").unwrap().1, 1.0);
        // credit_to_risk = 1.20 / 3.80
        let ctr = m.iter().find(|(n, _)| *n == "credit_to_risk").unwrap().1;
        assert!((ctr - 1.20 / 3.80).abs() < 1e-9);
    }
}

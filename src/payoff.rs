//! Expiration payoff and risk metrics. The payoff of a multi-leg position is
//! piecewise linear with breakpoints exactly at the distinct strikes, so max
//! profit, max loss and breakevens are derived analytically from the strike
//! vertices; dense sampling is only produced for visualization.

use crate::error::ScanError;
use crate::models::{
    Candidate, Leg, OptionType, PayoffBound, PayoffCurve, PayoffPoint, RiskMetrics, Side, round2,
};
use crate::pricing;

const ROI_EPSILON: f64 = 0.01;

/// P/L of the whole position at underlying price `s` at expiration.
pub fn payoff_at(legs: &[Leg], s: f64) -> f64 {
    legs.iter()
        .map(|leg| {
            let intrinsic = match leg.contract.option_type {
                OptionType::Call => (s - leg.contract.strike).max(0.0),
                OptionType::Put => (leg.contract.strike - s).max(0.0),
            };
            leg.side.sign() * leg.multiplier as f64 * (intrinsic - leg.contract.premium)
        })
        .sum()
}

/// Net directional exposure of the call legs, i.e. the payoff slope above the
/// highest strike. Positive means unbounded profit, negative unbounded loss.
fn upside_slope(legs: &[Leg]) -> f64 {
    legs.iter()
        .filter(|l| l.contract.option_type == OptionType::Call)
        .map(|l| l.side.sign() * l.multiplier as f64)
        .sum()
}

/// Net put exposure. Negative (net short puts) means the position keeps
/// losing as the underlying falls, treated as an unbounded downside wing.
fn put_exposure(legs: &[Leg]) -> f64 {
    legs.iter()
        .filter(|l| l.contract.option_type == OptionType::Put)
        .map(|l| l.side.sign() * l.multiplier as f64)
        .sum()
}

/// Vertices of the piecewise-linear payoff: zero, every distinct strike.
fn vertices(legs: &[Leg]) -> Vec<f64> {
    let mut v: Vec<f64> = legs.iter().map(|l| l.contract.strike).collect();
    v.push(0.0);
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    v.dedup();
    v
}

/// Analytic max profit / max loss, widened to "unlimited" when the position
/// carries an unbounded wing (net long or short calls above all strikes, net
/// short puts below all strikes).
pub fn profit_loss_bounds(legs: &[Leg]) -> (PayoffBound, PayoffBound) {
    let verts = vertices(legs);
    let mut max = f64::NEG_INFINITY;
    let mut min = f64::INFINITY;
    for v in &verts {
        let p = payoff_at(legs, *v);
        max = max.max(p);
        min = min.min(p);
    }

    let up = upside_slope(legs);
    let max_profit = if up > 0.0 { PayoffBound::Unlimited } else { PayoffBound::Finite(max) };
    let max_loss = if up < 0.0 || put_exposure(legs) < 0.0 {
        PayoffBound::Unlimited
    } else {
        PayoffBound::Finite(min)
    };
    (max_profit, max_loss)
}

/// Loss on the upside wing (at and above the highest strike), zero when the
/// position has no upside risk. A Jade Lizard whose credit exceeds its call
/// spread width reports `Finite(0.0)` here.
pub fn upside_loss(legs: &[Leg]) -> PayoffBound {
    let up = upside_slope(legs);
    if up < 0.0 {
        return PayoffBound::Unlimited;
    }
    let top = legs
        .iter()
        .map(|l| l.contract.strike)
        .fold(f64::NEG_INFINITY, f64::max);
    PayoffBound::Finite((-payoff_at(legs, top)).max(0.0))
}

/// Exact breakevens from the strike vertices, in ascending order. Each
/// segment between consecutive vertices is linear, so a sign change pins the
/// crossing exactly; the open tail above the top strike is handled from its
/// slope.
pub fn breakevens(legs: &[Leg]) -> Vec<f64> {
    let verts = vertices(legs);
    let mut out = Vec::new();

    for pair in verts.windows(2) {
        let (x0, x1) = (pair[0], pair[1]);
        let (y0, y1) = (payoff_at(legs, x0), payoff_at(legs, x1));
        if y0 == 0.0 {
            out.push(x0);
        }
        if y0 * y1 < 0.0 {
            out.push(x0 + (x1 - x0) * y0.abs() / (y0.abs() + y1.abs()));
        }
    }

    if let Some(&top) = verts.last() {
        let y_top = payoff_at(legs, top);
        if y_top == 0.0 && verts.len() == 1 {
            out.push(top);
        }
        let slope = upside_slope(legs);
        if slope != 0.0 && y_top != 0.0 && (y_top < 0.0) == (slope > 0.0) {
            out.push(top - y_top / slope);
        }
    }

    out.dedup_by(|a, b| (*a - *b).abs() < 1e-9);
    out
}

/// Dense expiration-payoff samples over `[price_min, price_max]`, with
/// breakevens located by linear interpolation between sign-changing sample
/// pairs. Bounds come from the analytic vertex scan so sampled values never
/// exceed them.
pub fn compute_payoff(
    legs: &[Leg],
    price_min: f64,
    price_max: f64,
    num_points: usize,
) -> Result<PayoffCurve, ScanError> {
    if legs.is_empty() {
        return Err(ScanError::MalformedContract("payoff of an empty leg set".to_string()));
    }
    if num_points < 2 || price_min < 0.0 || price_max <= price_min {
        return Err(ScanError::InvalidPricingInput(format!(
            "bad sampling window [{}, {}] x {}",
            price_min, price_max, num_points
        )));
    }

    let step = (price_max - price_min) / (num_points - 1) as f64;
    let points: Vec<PayoffPoint> = (0..num_points)
        .map(|i| {
            let s = price_min + step * i as f64;
            PayoffPoint { underlying_price: round2(s), pnl: round2(payoff_at(legs, s)) }
        })
        .collect();

    let mut sampled_breakevens = Vec::new();
    for pair in points.windows(2) {
        let (p0, p1) = (pair[0], pair[1]);
        if p0.pnl == 0.0 {
            sampled_breakevens.push(p0.underlying_price);
        } else if p0.pnl * p1.pnl < 0.0 {
            let x = p0.underlying_price
                + (p1.underlying_price - p0.underlying_price) * p0.pnl.abs()
                    / (p0.pnl.abs() + p1.pnl.abs());
            sampled_breakevens.push(round2(x));
        }
    }

    let (max_profit, max_loss) = profit_loss_bounds(legs);
    Ok(PayoffCurve { points, breakevens: sampled_breakevens, max_profit, max_loss })
}

/// Implied volatility of the short leg nearest the money, the position's most
/// economically significant leg. Falls back to the chain average when that
/// leg carries no usable IV.
fn position_iv(legs: &[Leg], spot: f64, fallback_iv: f64) -> f64 {
    let iv = legs
        .iter()
        .filter(|l| l.side == Side::Short)
        .min_by(|a, b| {
            (a.contract.strike - spot)
                .abs()
                .partial_cmp(&(b.contract.strike - spot).abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|l| l.contract.implied_volatility)
        .unwrap_or(fallback_iv);
    if iv > 0.0 { iv } else { fallback_iv }
}

/// Probability that the position expires profitable, summing the lognormal
/// terminal-price mass over every interval where the payoff is positive.
pub fn prob_profit(
    legs: &[Leg],
    spot: f64,
    risk_free_rate: f64,
    fallback_iv: f64,
) -> Result<f64, ScanError> {
    let t = legs
        .iter()
        .map(|l| l.contract.days_to_expiry)
        .min()
        .unwrap_or(0) as f64
        / 365.0;
    let iv = position_iv(legs, spot, fallback_iv);

    let bes = breakevens(legs);
    if bes.is_empty() {
        // Payoff never crosses zero; profitable everywhere or nowhere.
        return Ok(if payoff_at(legs, spot) > 0.0 { 1.0 } else { 0.0 });
    }

    // Walk the intervals delimited by the breakevens, probing the payoff sign
    // at each interval's interior.
    let mut edges = vec![0.0];
    edges.extend(&bes);
    edges.push(f64::INFINITY);

    let mut prob = 0.0;
    for pair in edges.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        let probe = if hi.is_infinite() { lo * 2.0 + 1.0 } else { (lo + hi) / 2.0 };
        if payoff_at(legs, probe) > 0.0 {
            prob += pricing::prob_in_range(spot, lo, hi, t, iv, risk_free_rate)?;
        }
    }
    Ok(prob.clamp(0.0, 1.0))
}

/// Full risk-metric set for a funnel survivor.
pub fn risk_metrics(
    candidate: &Candidate,
    spot: f64,
    risk_free_rate: f64,
    fallback_iv: f64,
) -> Result<RiskMetrics, ScanError> {
    let legs = &candidate.legs;
    let (max_profit, max_loss) = profit_loss_bounds(legs);
    let bes: Vec<f64> = breakevens(legs).into_iter().map(round2).collect();

    let net = candidate.net_debit_credit;
    let capital_at_risk = if net > 0.0 {
        Some(net.max(ROI_EPSILON))
    } else {
        // Net credit: ROI is measured against the defined max loss.
        max_loss.finite().map(|l| l.abs().max(ROI_EPSILON))
    };
    let roi_pct = match (max_profit.finite(), capital_at_risk) {
        (Some(profit), Some(capital)) => Some(round2(profit / capital * 100.0)),
        _ => None,
    };

    let risk_reward_ratio = match (max_profit.finite(), max_loss.finite()) {
        (Some(profit), Some(loss)) if loss.abs() > 0.0 => Some(round2(profit / loss.abs())),
        _ => None,
    };

    let prob = prob_profit(legs, spot, risk_free_rate, fallback_iv)?;

    Ok(RiskMetrics {
        net_debit_credit: round2(net),
        max_profit,
        max_loss,
        breakevens: bes,
        roi_pct,
        risk_reward_ratio,
        prob_profit_pct: round2(prob * 100.0),
    })
}

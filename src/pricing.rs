//! Closed-form European option pricing (Black-Scholes-Merton) and the
//! lognormal terminal-price probability used for probability-of-profit.

use crate::error::ScanError;
use crate::models::OptionType;
use statrs::distribution::{ContinuousCDF, Normal};

fn std_normal() -> Normal {
    Normal::new(0.0, 1.0).unwrap()
}

fn check_inputs(time_to_expiry_years: f64, volatility: f64) -> Result<(), ScanError> {
    if time_to_expiry_years <= 0.0 {
        return Err(ScanError::InvalidPricingInput(format!(
            "non-positive time to expiry: {}",
            time_to_expiry_years
        )));
    }
    if volatility <= 0.0 {
        return Err(ScanError::InvalidPricingInput(format!(
            "non-positive volatility: {}",
            volatility
        )));
    }
    Ok(())
}

fn d1(spot: f64, strike: f64, t: f64, sigma: f64, rate: f64) -> f64 {
    ((spot / strike).ln() + (rate + 0.5 * sigma * sigma) * t) / (sigma * t.sqrt())
}

/// Black-Scholes-Merton premium for a European call or put.
pub fn price(
    spot: f64,
    strike: f64,
    time_to_expiry_years: f64,
    volatility: f64,
    risk_free_rate: f64,
    option_type: OptionType,
) -> Result<f64, ScanError> {
    check_inputs(time_to_expiry_years, volatility)?;

    let normal = std_normal();
    let d1 = d1(spot, strike, time_to_expiry_years, volatility, risk_free_rate);
    let d2 = d1 - volatility * time_to_expiry_years.sqrt();
    let discounted_strike = strike * (-risk_free_rate * time_to_expiry_years).exp();

    let price = match option_type {
        OptionType::Call => spot * normal.cdf(d1) - discounted_strike * normal.cdf(d2),
        OptionType::Put => discounted_strike * normal.cdf(-d2) - spot * normal.cdf(-d1),
    };
    Ok(price)
}

/// Call delta = N(d1); put delta = N(d1) - 1. Clamped to [-1, 1] to absorb
/// numerical noise.
pub fn delta(
    spot: f64,
    strike: f64,
    time_to_expiry_years: f64,
    volatility: f64,
    risk_free_rate: f64,
    option_type: OptionType,
) -> Result<f64, ScanError> {
    check_inputs(time_to_expiry_years, volatility)?;

    let nd1 = std_normal().cdf(d1(
        spot,
        strike,
        time_to_expiry_years,
        volatility,
        risk_free_rate,
    ));
    let delta = match option_type {
        OptionType::Call => nd1,
        OptionType::Put => nd1 - 1.0,
    };
    Ok(delta.clamp(-1.0, 1.0))
}

/// P(low < S_T < high) under the risk-neutral lognormal terminal-price
/// distribution. `low <= 0` and `high = +inf` are treated as open bounds.
pub fn prob_in_range(
    spot: f64,
    low: f64,
    high: f64,
    time_to_expiry_years: f64,
    volatility: f64,
    risk_free_rate: f64,
) -> Result<f64, ScanError> {
    check_inputs(time_to_expiry_years, volatility)?;

    let normal = std_normal();
    let sigma_t = volatility * time_to_expiry_years.sqrt();
    let drift = (risk_free_rate - 0.5 * volatility * volatility) * time_to_expiry_years;

    let upper_term = if low <= 0.0 {
        1.0
    } else {
        normal.cdf(((spot / low).ln() + drift) / sigma_t)
    };
    let lower_term = if high.is_infinite() {
        0.0
    } else {
        normal.cdf(((spot / high).ln() + drift) / sigma_t)
    };

    Ok((upper_term - lower_term).clamp(0.0, 1.0))
}

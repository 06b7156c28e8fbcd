//! Chain normalization: raw provider records in, one canonical sorted chain
//! snapshot out. Malformed contracts are dropped and counted, never raised.

use crate::models::{OptionContract, OptionType};
use crate::pricing;
use crate::provider::RawOptionChain;
use chrono::NaiveDate;
use tracing::{debug, warn};

/// Canonical option chain keyed by (expiry, strike, type), sorted by expiry
/// then strike. One snapshot per scan; never shared across scans.
#[derive(Debug, Clone)]
pub struct NormalizedChain {
    pub symbol: String,
    pub spot_price: f64,
    pub as_of: NaiveDate,
    pub contracts: Vec<OptionContract>,
    /// Provider records rejected as malformed or unpriceable.
    pub dropped_count: usize,
}

impl NormalizedChain {
    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    /// Contracts whose DTE falls in `[min_dte, max_dte]`.
    pub fn contracts_in_dte(&self, min_dte: i64, max_dte: i64) -> Vec<&OptionContract> {
        self.contracts
            .iter()
            .filter(|c| c.days_to_expiry >= min_dte && c.days_to_expiry <= max_dte)
            .collect()
    }

    /// Mean implied volatility across the chain, fallback when an individual
    /// leg carries no usable IV.
    pub fn avg_iv(&self) -> f64 {
        let ivs: Vec<f64> = self
            .contracts
            .iter()
            .map(|c| c.implied_volatility)
            .filter(|iv| *iv > 0.0)
            .collect();
        if ivs.is_empty() {
            0.15
        } else {
            ivs.iter().sum::<f64>() / ivs.len() as f64
        }
    }
}

/// Days from `as_of` to `expiry`, calendar days. Contracts expiring today
/// report 0.
fn days_to_expiry(expiry: NaiveDate, as_of: NaiveDate) -> i64 {
    (expiry - as_of).num_days()
}

/// Build the canonical chain. Records missing strike/expiry/type or carrying
/// a non-positive premium are dropped and counted; deltas are backfilled via
/// the pricing engine when the provider omits them.
pub fn normalize_chain(
    raw: &RawOptionChain,
    spot_price: f64,
    as_of: NaiveDate,
    risk_free_rate: f64,
) -> NormalizedChain {
    let mut contracts = Vec::with_capacity(raw.data.len());
    let mut dropped = 0usize;

    for record in &raw.data {
        let strike = match record.strike {
            Some(s) if s > 0.0 => s,
            _ => {
                dropped += 1;
                continue;
            }
        };
        let expiry = match record
            .expiration
            .as_deref()
            .and_then(|e| NaiveDate::parse_from_str(e, "%Y-%m-%d").ok())
        {
            Some(e) => e,
            None => {
                dropped += 1;
                continue;
            }
        };
        let option_type = match record.option_type.as_deref() {
            Some(t) if t.eq_ignore_ascii_case("call") => OptionType::Call,
            Some(t) if t.eq_ignore_ascii_case("put") => OptionType::Put,
            _ => {
                dropped += 1;
                continue;
            }
        };
        let premium = record.premium();
        if premium <= 0.0 {
            dropped += 1;
            continue;
        }

        let dte = days_to_expiry(expiry, as_of);
        if dte < 0 {
            dropped += 1;
            continue;
        }
        let implied_volatility = record.implied_volatility.unwrap_or(0.0).max(0.0);

        let delta = match record.delta {
            Some(d) => d.clamp(-1.0, 1.0),
            None => {
                // Backfill from the closed form; unpriceable contracts are
                // treated as expired/illiquid and excluded.
                let t = dte as f64 / 365.0;
                match pricing::delta(spot_price, strike, t, implied_volatility, risk_free_rate, option_type)
                {
                    Ok(d) => d,
                    Err(err) => {
                        debug!(strike, %expiry, "delta backfill failed: {}", err);
                        dropped += 1;
                        continue;
                    }
                }
            }
        };

        contracts.push(OptionContract {
            option_type,
            strike,
            expiry,
            premium,
            volume: record.volume.unwrap_or(0),
            open_interest: record.open_interest.unwrap_or(0),
            implied_volatility,
            delta,
            days_to_expiry: dte,
        });
    }

    contracts.sort_by(|a, b| {
        a.expiry
            .cmp(&b.expiry)
            .then(a.strike.partial_cmp(&b.strike).unwrap_or(std::cmp::Ordering::Equal))
            .then((a.option_type as u8).cmp(&(b.option_type as u8)))
    });

    if dropped > 0 {
        warn!(symbol = %raw.symbol, dropped, kept = contracts.len(), "dropped malformed contracts");
    }

    NormalizedChain {
        symbol: raw.symbol.clone(),
        spot_price,
        as_of,
        contracts,
        dropped_count: dropped,
    }
}

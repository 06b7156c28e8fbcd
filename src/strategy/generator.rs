//! Candidate enumeration. For each strategy shape this module produces every
//! structurally valid leg combination from the normalized chain: correct leg
//! count and option types, ordered or matching strikes, matching expirations
//! where the shape requires them. Business filters (delta ranges, credit,
//! volume) belong to the funnel, not here.
//!
//! Enumeration is bounded by restricting each leg role to the strategy's DTE
//! window before cross-producting, so a chain with many expirations does not
//! blow up combinatorially. That pre-restriction is a structural
//! optimization and is not reported as a funnel stage.

use crate::models::{Candidate, Leg, OptionContract, OptionType, Side};
use crate::processor::NormalizedChain;
use crate::strategy::{ResolvedCriteria, StrategyId};
use tracing::debug;

pub fn generate(
    strategy: StrategyId,
    chain: &NormalizedChain,
    criteria: &ResolvedCriteria,
) -> Vec<Candidate> {
    let candidates = match strategy {
        StrategyId::Pmcc => generate_diagonal(chain, criteria, OptionType::Call),
        StrategyId::Pmcp => generate_diagonal(chain, criteria, OptionType::Put),
        StrategyId::SyntheticLong => generate_synthetic_long(chain, criteria),
        StrategyId::JadeLizard => generate_lizard(chain, criteria, OptionType::Call),
        StrategyId::TwistedSister => generate_lizard(chain, criteria, OptionType::Put),
        StrategyId::IronCondor => generate_iron_condor(chain, criteria),
        StrategyId::BwbPut => generate_broken_wing(chain, criteria, OptionType::Put),
        StrategyId::BwbCall => generate_broken_wing(chain, criteria, OptionType::Call),
    };
    debug!(
        strategy = %strategy,
        contracts = chain.len(),
        candidates = candidates.len(),
        "enumerated candidates"
    );
    candidates
}

fn of_type<'a>(contracts: &[&'a OptionContract], t: OptionType) -> Vec<&'a OptionContract> {
    contracts.iter().copied().filter(|c| c.option_type == t).collect()
}

/// PMCC/PMCP diagonal: `[long far-dated, short near-dated]`, same option
/// type. For calls the short strike sits above the long strike; for puts
/// below. The short leg always expires before the long leg.
fn generate_diagonal(
    chain: &NormalizedChain,
    criteria: &ResolvedCriteria,
    leg_type: OptionType,
) -> Vec<Candidate> {
    let min_long_dte = criteria.get_i64("min_long_dte");
    let min_short_dte = criteria.get_i64("min_short_dte");
    let max_short_dte = criteria.get_i64("max_short_dte");

    let longs = of_type(&chain.contracts_in_dte(min_long_dte, i64::MAX), leg_type);
    let shorts = of_type(&chain.contracts_in_dte(min_short_dte, max_short_dte), leg_type);

    let mut out = Vec::new();
    for long in &longs {
        for short in &shorts {
            if short.expiry >= long.expiry {
                continue;
            }
            let strikes_ordered = match leg_type {
                OptionType::Call => short.strike > long.strike,
                OptionType::Put => short.strike < long.strike,
            };
            if !strikes_ordered {
                continue;
            }
            out.push(Candidate::new(vec![
                Leg::new((*long).clone(), Side::Long),
                Leg::new((*short).clone(), Side::Short),
            ]));
        }
    }
    out
}

/// Synthetic long: `[long call, short put]` at the same strike and expiry.
fn generate_synthetic_long(chain: &NormalizedChain, criteria: &ResolvedCriteria) -> Vec<Candidate> {
    let in_window = chain.contracts_in_dte(criteria.get_i64("min_dte"), criteria.get_i64("max_dte"));
    let calls = of_type(&in_window, OptionType::Call);
    let puts = of_type(&in_window, OptionType::Put);

    let mut out = Vec::new();
    for call in &calls {
        for put in &puts {
            if put.expiry == call.expiry && put.strike == call.strike {
                out.push(Candidate::new(vec![
                    Leg::new((*call).clone(), Side::Long),
                    Leg::new((*put).clone(), Side::Short),
                ]));
            }
        }
    }
    out
}

/// Jade Lizard (`wing_type = Call`): `[short put, short call, long call]`,
/// all same expiry, short legs OTM, long call strike inside the configured
/// spread-width window above the short call. Twisted Sister
/// (`wing_type = Put`) mirrors the shape on the put side:
/// `[short call, short put, long put]`.
fn generate_lizard(
    chain: &NormalizedChain,
    criteria: &ResolvedCriteria,
    wing_type: OptionType,
) -> Vec<Candidate> {
    let spot = chain.spot_price;
    let in_window = chain.contracts_in_dte(criteria.get_i64("min_dte"), criteria.get_i64("max_dte"));
    let calls = of_type(&in_window, OptionType::Call);
    let puts = of_type(&in_window, OptionType::Put);

    let min_width = spot * criteria.get("spread_width_min") / 100.0;
    let max_width = spot * criteria.get("spread_width_max") / 100.0;

    let (naked, spread_short, wing_pool) = match wing_type {
        // Jade Lizard: naked short put, call spread above
        OptionType::Call => (&puts, &calls, &calls),
        // Twisted Sister: naked short call, put spread below
        OptionType::Put => (&calls, &puts, &puts),
    };

    let mut out = Vec::new();
    for naked_leg in naked {
        let naked_otm = match naked_leg.option_type {
            OptionType::Put => naked_leg.strike < spot,
            OptionType::Call => naked_leg.strike > spot,
        };
        if !naked_otm {
            continue;
        }
        for short in spread_short {
            if short.expiry != naked_leg.expiry {
                continue;
            }
            let short_otm = match wing_type {
                OptionType::Call => short.strike > spot,
                OptionType::Put => short.strike < spot,
            };
            if !short_otm {
                continue;
            }
            for wing in wing_pool {
                if wing.expiry != short.expiry {
                    continue;
                }
                let width = match wing_type {
                    OptionType::Call => wing.strike - short.strike,
                    OptionType::Put => short.strike - wing.strike,
                };
                if width < min_width || width > max_width {
                    continue;
                }
                out.push(Candidate::new(vec![
                    Leg::new((*naked_leg).clone(), Side::Short),
                    Leg::new((*short).clone(), Side::Short),
                    Leg::new((*wing).clone(), Side::Long),
                ]));
            }
        }
    }
    out
}

/// Iron condor: `[long put, short put, short call, long call]`, all same
/// expiry, both short legs OTM, each wing's width (as % of spot) inside its
/// configured window.
fn generate_iron_condor(chain: &NormalizedChain, criteria: &ResolvedCriteria) -> Vec<Candidate> {
    let spot = chain.spot_price;
    let in_window = chain.contracts_in_dte(criteria.get_i64("min_dte"), criteria.get_i64("max_dte"));
    let calls = of_type(&in_window, OptionType::Call);
    let puts = of_type(&in_window, OptionType::Put);

    let put_width_ok = |w_pct: f64| {
        w_pct >= criteria.get("put_spread_width_min") && w_pct <= criteria.get("put_spread_width_max")
    };
    let call_width_ok = |w_pct: f64| {
        w_pct >= criteria.get("call_spread_width_min")
            && w_pct <= criteria.get("call_spread_width_max")
    };

    // Enumerate verticals per side first, then pair by expiry.
    let mut put_spreads: Vec<(&OptionContract, &OptionContract)> = Vec::new();
    for short_put in &puts {
        if short_put.strike >= spot {
            continue;
        }
        for long_put in &puts {
            if long_put.expiry != short_put.expiry || long_put.strike >= short_put.strike {
                continue;
            }
            let width_pct = (short_put.strike - long_put.strike) / spot * 100.0;
            if put_width_ok(width_pct) {
                put_spreads.push((long_put, short_put));
            }
        }
    }

    let mut call_spreads: Vec<(&OptionContract, &OptionContract)> = Vec::new();
    for short_call in &calls {
        if short_call.strike <= spot {
            continue;
        }
        for long_call in &calls {
            if long_call.expiry != short_call.expiry || long_call.strike <= short_call.strike {
                continue;
            }
            let width_pct = (long_call.strike - short_call.strike) / spot * 100.0;
            if call_width_ok(width_pct) {
                call_spreads.push((short_call, long_call));
            }
        }
    }

    let mut out = Vec::new();
    for (long_put, short_put) in &put_spreads {
        for (short_call, long_call) in &call_spreads {
            if short_call.expiry != short_put.expiry {
                continue;
            }
            // The call side must sit strictly above the put side.
            if short_call.strike <= short_put.strike {
                continue;
            }
            out.push(Candidate::new(vec![
                Leg::new((*long_put).clone(), Side::Long),
                Leg::new((*short_put).clone(), Side::Short),
                Leg::new((*short_call).clone(), Side::Short),
                Leg::new((*long_call).clone(), Side::Long),
            ]));
        }
    }
    out
}

/// Broken-wing butterfly: `[long low wing, short body x2, long high wing]`,
/// single option type, same expiry. The body is OTM; each wing is the strike
/// nearest its target offset (configured as % of spot) on its side of the
/// body, so every body yields at most one butterfly.
fn generate_broken_wing(
    chain: &NormalizedChain,
    criteria: &ResolvedCriteria,
    leg_type: OptionType,
) -> Vec<Candidate> {
    let spot = chain.spot_price;
    let in_window = chain.contracts_in_dte(criteria.get_i64("min_dte"), criteria.get_i64("max_dte"));
    let pool = of_type(&in_window, leg_type);

    let lower_width = spot * criteria.get("lower_wing_width") / 100.0;
    let upper_width = spot * criteria.get("upper_wing_width") / 100.0;

    let mut out = Vec::new();
    for body in &pool {
        let body_otm = match leg_type {
            OptionType::Put => body.strike < spot,
            OptionType::Call => body.strike > spot,
        };
        if !body_otm {
            continue;
        }

        let nearest = |target: f64, below: bool| -> Option<&OptionContract> {
            pool.iter()
                .copied()
                .filter(|c| c.expiry == body.expiry)
                .filter(|c| if below { c.strike < body.strike } else { c.strike > body.strike })
                .min_by(|a, b| {
                    (a.strike - target)
                        .abs()
                        .partial_cmp(&(b.strike - target).abs())
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
        };

        let low = nearest(body.strike - lower_width, true);
        let high = nearest(body.strike + upper_width, false);
        if let (Some(low), Some(high)) = (low, high) {
            out.push(Candidate::new(vec![
                Leg::new(low.clone(), Side::Long),
                Leg::with_multiplier((*body).clone(), Side::Short, 2),
                Leg::new(high.clone(), Side::Long),
            ]));
        }
    }
    out
}

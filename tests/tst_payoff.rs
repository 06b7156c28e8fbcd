use chrono::NaiveDate;
use options_scanner::compute_payoff;
use options_scanner::models::{Leg, OptionContract, OptionType, Side};

fn leg(option_type: OptionType, side: Side, strike: f64, premium: f64) -> Leg {
    Leg::new(
        OptionContract {
            option_type,
            strike,
            expiry: NaiveDate::from_ymd_opt(2026, 2, 20).unwrap(),
            premium,
            volume: 100,
            open_interest: 500,
            implied_volatility: 0.25,
            delta: 0.30,
            days_to_expiry: 45,
        },
        side,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condor_curve_shape() {
        let legs = vec![
            leg(OptionType::Put, Side::Long, 90.0, 0.60),
            leg(OptionType::Put, Side::Short, 95.0, 1.20),
            leg(OptionType::Call, Side::Short, 105.0, 1.10),
            leg(OptionType::Call, Side::Long, 110.0, 0.50),
        ];
        let curve = compute_payoff(&legs, 70.0, 130.0, 400).unwrap();
        assert_eq!(curve.points.len(), 400);
        assert_eq!(curve.points.first().unwrap().underlying_price, 70.0);
        assert_eq!(curve.points.last().unwrap().underlying_price, 130.0);
        assert_eq!(curve.breakevens.len(), 2);
        assert!((curve.breakevens[0] - 93.80).abs() < 0.1);
        assert!((curve.breakevens[1] - 106.20).abs() < 0.1);
        assert!((curve.max_profit.finite().unwrap() - 1.20).abs() < 1e-9);
        assert!((curve.max_loss.finite().unwrap() + 3.80).abs() < 1e-9);
    }

    #[test]
    fn test_jade_lizard_flat_profitable_upside() {
        // Credit 1.00 against a 0.50 call spread width: every price above the
        // long call strike pays out the residual 0.50 credit.
        let legs = vec![
            leg(OptionType::Put, Side::Short, 95.0, 0.45),
            leg(OptionType::Call, Side::Short, 105.0, 0.80),
            leg(OptionType::Call, Side::Long, 105.5, 0.25),
        ];
        let curve = compute_payoff(&legs, 80.0, 140.0, 600).unwrap();
        for point in curve.points.iter().filter(|p| p.underlying_price >= 105.5) {
            assert!((point.pnl - 0.50).abs() < 1e-9);
        }
        // Naked short put keeps the downside unbounded
        assert!(curve.max_loss.is_unlimited());
        assert!((curve.max_profit.finite().unwrap() - 1.00).abs() < 1e-9);
    }

    #[test]
    fn test_single_long_call_curve() {
        let legs = vec![leg(OptionType::Call, Side::Long, 100.0, 2.00)];
        let curve = compute_payoff(&legs, 80.0, 120.0, 200).unwrap();
        assert!(curve.max_profit.is_unlimited());
        assert!((curve.max_loss.finite().unwrap() + 2.00).abs() < 1e-9);
        assert_eq!(curve.breakevens.len(), 1);
        assert!((curve.breakevens[0] - 102.00).abs() < 0.15);
    }
}

//! Unit tests for the options strategy pricer

use aegis::services::StrategyPricer;
use aegis::types::{LegAction, OptionType, OptionsLeg, OptionsStrategy, ProfitBound, StrategyKind};
use aegis::EngineError;
use chrono::NaiveDate;

fn pricer() -> StrategyPricer {
    StrategyPricer::new(0.05)
}

fn expiry() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 2, 16).unwrap()
}

fn asof() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 17).unwrap()
}

fn leg(
    option_type: OptionType,
    action: LegAction,
    strike: f64,
    quantity: f64,
    premium: f64,
) -> OptionsLeg {
    OptionsLeg::new(option_type, action, strike, expiry(), quantity, premium)
}

#[test]
fn test_long_straddle_pricing() {
    // Long 100-strike straddle on a 10-unit contract.
    let legs = vec![
        leg(OptionType::Call, LegAction::Buy, 100.0, 1.0, 8.5),
        leg(OptionType::Put, LegAction::Buy, 100.0, 1.0, 7.2),
    ];
    let pricing = pricer().price(&legs, 10.0, asof()).unwrap();

    assert!(pricing.max_profit.is_unbounded());
    assert!((pricing.max_loss.finite().unwrap() - 157.0).abs() < 1e-9);

    assert_eq!(pricing.breakevens.len(), 2);
    assert!((pricing.breakevens[0] - 84.3).abs() < 1e-9);
    assert!((pricing.breakevens[1] - 115.7).abs() < 1e-9);

    // Both legs are long, so the book bleeds premium daily.
    assert!(pricing.time_decay < 0.0);
}

#[test]
fn test_iron_condor_pricing() {
    let legs = vec![
        leg(OptionType::Put, LegAction::Sell, 42000.0, 1.0, 850.0),
        leg(OptionType::Put, LegAction::Buy, 40000.0, 1.0, 450.0),
        leg(OptionType::Call, LegAction::Sell, 48000.0, 1.0, 920.0),
        leg(OptionType::Call, LegAction::Buy, 50000.0, 1.0, 520.0),
    ];
    let pricing = pricer().price(&legs, 1.0, asof()).unwrap();

    assert_eq!(pricing.max_profit, ProfitBound::Finite(800.0));
    assert_eq!(pricing.max_loss, ProfitBound::Finite(1200.0));
    assert_eq!(pricing.breakevens, vec![42800.0, 47200.0]);

    // Net short premium collects decay.
    assert!(pricing.time_decay > 0.0);
}

#[test]
fn test_butterfly_extremes() {
    let legs = vec![
        leg(OptionType::Call, LegAction::Buy, 2400.0, 1.0, 180.0),
        leg(OptionType::Call, LegAction::Sell, 2500.0, 2.0, 120.0),
        leg(OptionType::Call, LegAction::Buy, 2600.0, 1.0, 80.0),
    ];
    let pricing = pricer().price(&legs, 1.0, asof()).unwrap();

    // Net debit 20; peak payoff 80 at the body strike.
    assert_eq!(pricing.max_profit, ProfitBound::Finite(80.0));
    assert_eq!(pricing.max_loss, ProfitBound::Finite(20.0));
    assert_eq!(pricing.breakevens.len(), 2);
}

#[test]
fn test_zero_legs_price_to_zero() {
    let pricing = pricer().price(&[], 1.0, asof()).unwrap();
    assert_eq!(pricing.max_profit, ProfitBound::Finite(0.0));
    assert_eq!(pricing.max_loss, ProfitBound::Finite(0.0));
    assert!(pricing.breakevens.is_empty());
    assert_eq!(pricing.time_decay, 0.0);
}

#[test]
fn test_mismatched_expiries_rejected() {
    let other_expiry = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
    let legs = vec![
        leg(OptionType::Call, LegAction::Sell, 2500.0, 1.0, 120.0),
        OptionsLeg::new(OptionType::Call, LegAction::Buy, 2500.0, other_expiry, 1.0, 180.0),
    ];
    let err = pricer().price(&legs, 1.0, asof()).unwrap_err();
    assert!(matches!(err, EngineError::InvalidStrategy(_)));
}

#[test]
fn test_calendar_structure_priced_per_leg() {
    let other_expiry = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
    let legs = vec![
        leg(OptionType::Call, LegAction::Sell, 2500.0, 1.0, 120.0),
        OptionsLeg::new(OptionType::Call, LegAction::Buy, 2500.0, other_expiry, 1.0, 180.0),
    ];
    let pricings = pricer().price_per_leg(&legs, 1.0, asof()).unwrap();
    assert_eq!(pricings.len(), 2);

    // Short leg alone has unbounded loss, long leg unbounded profit.
    assert!(pricings[0].max_loss.is_unbounded());
    assert!(pricings[1].max_profit.is_unbounded());
}

#[test]
fn test_unbounded_is_a_variant_not_a_float() {
    let legs = vec![leg(OptionType::Call, LegAction::Buy, 100.0, 1.0, 8.5)];
    let pricing = pricer().price(&legs, 1.0, asof()).unwrap();

    assert!(pricing.max_profit.is_unbounded());
    assert_eq!(pricing.max_profit.finite(), None);
    // Max loss of a long call stays bounded at the premium paid.
    assert_eq!(pricing.max_loss, ProfitBound::Finite(8.5));
}

#[test]
fn test_contract_size_scales_amounts_not_breakevens() {
    let legs = vec![
        leg(OptionType::Call, LegAction::Buy, 100.0, 1.0, 8.5),
        leg(OptionType::Put, LegAction::Buy, 100.0, 1.0, 7.2),
    ];
    let unit = pricer().price(&legs, 1.0, asof()).unwrap();
    let ten = pricer().price(&legs, 10.0, asof()).unwrap();

    assert!((unit.max_loss.finite().unwrap() - 15.7).abs() < 1e-9);
    assert!((ten.max_loss.finite().unwrap() - 157.0).abs() < 1e-9);
    assert_eq!(unit.breakevens, ten.breakevens);
}

#[test]
fn test_strategy_record_carries_no_derived_fields() {
    // Analytics come from the pricer, recomputed whenever legs change.
    let strategy = OptionsStrategy::new(
        "straddle-1",
        "SOL Long Straddle",
        StrategyKind::Straddle,
        vec![
            leg(OptionType::Call, LegAction::Buy, 100.0, 1.0, 8.5),
            leg(OptionType::Put, LegAction::Buy, 100.0, 1.0, 7.2),
        ],
    );
    let pricing = pricer().price_strategy(&strategy, 10.0, None, asof()).unwrap();

    assert!(pricing.max_profit.is_unbounded());
    assert!((pricing.max_loss.finite().unwrap() - 157.0).abs() < 1e-9);

    let mut widened = strategy;
    widened.legs[1].strike = 95.0;
    let repriced = pricer().price_strategy(&widened, 10.0, None, asof()).unwrap();
    assert_ne!(repriced.breakevens, pricing.breakevens);
}

#[test]
fn test_analyze_attaches_implied_vol_with_spot() {
    let p = pricer();
    // Premium generated from a known vol, then recovered through analyze.
    let premium = p
        .black_scholes_price(100.0, 100.0, 30.0 / 365.0, 0.72, OptionType::Call)
        .unwrap();
    let legs = vec![leg(OptionType::Call, LegAction::Buy, 100.0, 1.0, premium)];

    let pricing = p.analyze(&legs, 1.0, Some(100.0), asof()).unwrap();
    let iv = pricing.implied_volatility.unwrap();
    assert!((iv - 0.72).abs() < 1e-3);

    let without_spot = p.analyze(&legs, 1.0, None, asof()).unwrap();
    assert!(without_spot.implied_volatility.is_none());
}

//! Options Strategy Pricer
//!
//! Prices multi-leg options structures from their expiry payoff:
//! - max profit/loss from the piecewise-linear payoff sampled at every
//!   strike breakpoint plus the asymptotic tail slopes, with unbounded
//!   tails reported as [`ProfitBound::Unbounded`]
//! - breakevens from the payoff's zero crossings, anchored at the kink
//!   bounding each sign-change segment
//! - a linear premium-decay theta proxy per day
//! - Black-Scholes implied volatility per leg (Newton-Raphson with a
//!   bisection fallback)
//!
//! Dollar amounts scale by the contract size; breakevens stay in underlying
//! price units.

use crate::error::{EngineError, Result};
use crate::types::{OptionType, OptionsLeg, OptionsStrategy, ProfitBound, StrategyPricing};
use chrono::NaiveDate;
use std::f64::consts::{E, PI};
use tracing::debug;

const EPSILON: f64 = 1e-9;

/// Multi-leg options strategy pricer.
pub struct StrategyPricer {
    /// Annual risk-free rate as a decimal.
    risk_free_rate: f64,
}

impl StrategyPricer {
    /// Create a pricer with the given risk-free rate.
    pub fn new(risk_free_rate: f64) -> Self {
        Self { risk_free_rate }
    }

    /// Price a uniform-expiry structure.
    ///
    /// Zero legs price to all-zero analytics. Mixed expiries are rejected;
    /// calendar structures carry per-leg expiry semantics and go through
    /// [`StrategyPricer::price_per_leg`] instead.
    pub fn price(
        &self,
        legs: &[OptionsLeg],
        contract_size: f64,
        asof: NaiveDate,
    ) -> Result<StrategyPricing> {
        if legs.is_empty() {
            return Ok(StrategyPricing::empty());
        }

        let expiry = legs[0].expiry;
        if legs.iter().any(|l| l.expiry != expiry) {
            return Err(EngineError::InvalidStrategy(
                "legs have mismatched expiries; price calendar structures leg by leg".to_string(),
            ));
        }

        let mut strikes: Vec<f64> = legs.iter().map(|l| l.strike).collect();
        strikes.sort_by(|a, b| a.partial_cmp(b).unwrap());
        strikes.dedup_by(|a, b| (*a - *b).abs() < EPSILON);

        let net_payoff = |price: f64| legs.iter().map(|l| l.payoff(price)).sum::<f64>();
        let payoffs: Vec<f64> = strikes.iter().map(|&s| net_payoff(s)).collect();
        let slope_below: f64 = legs.iter().map(|l| l.slope_below()).sum();
        let slope_above: f64 = legs.iter().map(|l| l.slope_above()).sum();

        let peak = payoffs.iter().cloned().fold(f64::MIN, f64::max);
        let trough = payoffs.iter().cloned().fold(f64::MAX, f64::min);

        // A payoff that keeps rising into either tail has no finite extreme.
        let profit_unbounded = slope_above > EPSILON || slope_below < -EPSILON;
        let loss_unbounded = slope_above < -EPSILON || slope_below > EPSILON;

        let max_profit = if profit_unbounded {
            ProfitBound::Unbounded
        } else {
            ProfitBound::Finite(peak * contract_size)
        };
        let max_loss = if loss_unbounded {
            ProfitBound::Unbounded
        } else {
            ProfitBound::Finite((-trough).max(0.0) * contract_size)
        };

        let breakevens = Self::breakevens(&strikes, &payoffs, slope_below, slope_above);

        Ok(StrategyPricing {
            max_profit,
            max_loss,
            breakevens,
            implied_volatility: None,
            time_decay: self.time_decay(legs, contract_size, asof),
        })
    }

    /// Derived analytics for a configured strategy record.
    ///
    /// The strategy's derived fields are never stored; consumers call this
    /// whenever legs change. Calendar structures carry per-leg expiry
    /// semantics and go through [`StrategyPricer::price_per_leg`].
    pub fn price_strategy(
        &self,
        strategy: &OptionsStrategy,
        contract_size: f64,
        spot: Option<f64>,
        asof: NaiveDate,
    ) -> Result<StrategyPricing> {
        self.analyze(&strategy.legs, contract_size, spot, asof)
    }

    /// Price each leg on its own; the composition for calendar spreads.
    pub fn price_per_leg(
        &self,
        legs: &[OptionsLeg],
        contract_size: f64,
        asof: NaiveDate,
    ) -> Result<Vec<StrategyPricing>> {
        legs.iter()
            .map(|leg| self.price(std::slice::from_ref(leg), contract_size, asof))
            .collect()
    }

    /// Price a structure and, when a spot price is available, attach the
    /// premium-weighted implied volatility.
    pub fn analyze(
        &self,
        legs: &[OptionsLeg],
        contract_size: f64,
        spot: Option<f64>,
        asof: NaiveDate,
    ) -> Result<StrategyPricing> {
        let mut pricing = self.price(legs, contract_size, asof)?;
        if let Some(spot) = spot {
            pricing.implied_volatility = self.strategy_implied_vol(legs, spot, asof);
        }
        Ok(pricing)
    }

    /// Zero crossings of the piecewise-linear payoff.
    ///
    /// Each sign-change segment contributes one crossing measured from the
    /// kink with the smaller absolute payoff: `anchor + payoff / slope`.
    /// Tail segments anchor at the outermost strike against the tail slope.
    fn breakevens(
        strikes: &[f64],
        payoffs: &[f64],
        slope_below: f64,
        slope_above: f64,
    ) -> Vec<f64> {
        let mut crossings: Vec<f64> = Vec::new();

        for (i, &p) in payoffs.iter().enumerate() {
            if p.abs() < EPSILON {
                crossings.push(strikes[i]);
            }
        }

        // Interior segments between consecutive strikes.
        for i in 0..strikes.len().saturating_sub(1) {
            let (p1, p2) = (payoffs[i], payoffs[i + 1]);
            if p1 * p2 >= 0.0 {
                continue;
            }
            let slope = (p2 - p1) / (strikes[i + 1] - strikes[i]);
            let (anchor, payoff) = if p1.abs() <= p2.abs() {
                (strikes[i], p1)
            } else {
                (strikes[i + 1], p2)
            };
            crossings.push(anchor + payoff / slope);
        }

        // Tails: a crossing exists when the payoff at the outermost strike
        // and the tail's asymptotic direction straddle zero.
        let first = payoffs[0];
        if (slope_below < -EPSILON && first < -EPSILON)
            || (slope_below > EPSILON && first > EPSILON)
        {
            crossings.push(strikes[0] + first / slope_below);
        }
        let last = *payoffs.last().unwrap();
        if (slope_above > EPSILON && last < -EPSILON)
            || (slope_above < -EPSILON && last > EPSILON)
        {
            crossings.push(strikes[strikes.len() - 1] + last / slope_above);
        }

        crossings.sort_by(|a, b| a.partial_cmp(b).unwrap());
        crossings.dedup_by(|a, b| (*a - *b).abs() < 1e-6);
        crossings
    }

    /// Aggregate theta proxy in currency per day.
    ///
    /// Each leg's premium decays linearly to expiry; long legs bleed
    /// (negative), written legs collect (positive).
    pub fn time_decay(&self, legs: &[OptionsLeg], contract_size: f64, asof: NaiveDate) -> f64 {
        legs.iter()
            .map(|leg| {
                let days = (leg.expiry - asof).num_days().max(1) as f64;
                -leg.action.sign() * leg.premium * leg.quantity * contract_size / days
            })
            .sum()
    }

    // ========== Black-Scholes / Implied Volatility ==========

    fn d1(&self, spot: f64, strike: f64, time: f64, volatility: f64) -> f64 {
        let r = self.risk_free_rate;
        (f64::ln(spot / strike) + (r + volatility.powi(2) / 2.0) * time)
            / (volatility * time.sqrt())
    }

    fn norm_cdf(&self, x: f64) -> f64 {
        0.5 * (1.0 + erf(x / 2.0_f64.sqrt()))
    }

    fn norm_pdf(&self, x: f64) -> f64 {
        E.powf(-x.powi(2) / 2.0) / (2.0 * PI).sqrt()
    }

    /// Black-Scholes price of a European option.
    pub fn black_scholes_price(
        &self,
        spot: f64,
        strike: f64,
        time_years: f64,
        volatility: f64,
        option_type: OptionType,
    ) -> Result<f64> {
        if spot <= 0.0 || strike <= 0.0 || time_years <= 0.0 || volatility <= 0.0 {
            return Err(EngineError::InvalidStrategy(
                "spot, strike, time, and volatility must be positive".to_string(),
            ));
        }

        let d1 = self.d1(spot, strike, time_years, volatility);
        let d2 = d1 - volatility * time_years.sqrt();
        let discount = E.powf(-self.risk_free_rate * time_years);

        let price = match option_type {
            OptionType::Call => spot * self.norm_cdf(d1) - strike * discount * self.norm_cdf(d2),
            OptionType::Put => strike * discount * self.norm_cdf(-d2) - spot * self.norm_cdf(-d1),
        };

        Ok(price.max(0.0))
    }

    /// Implied volatility for one leg via Newton-Raphson, falling back to
    /// bisection when vega flattens out.
    pub fn implied_volatility(
        &self,
        market_price: f64,
        spot: f64,
        strike: f64,
        time_years: f64,
        option_type: OptionType,
    ) -> Result<f64> {
        if market_price <= 0.0 || spot <= 0.0 || strike <= 0.0 || time_years <= 0.0 {
            return Err(EngineError::InvalidStrategy(
                "implied volatility inputs must be positive".to_string(),
            ));
        }

        let max_iterations = 100;
        let tolerance = 1e-6;
        let mut vol = 0.2;

        for _ in 0..max_iterations {
            let price = self.black_scholes_price(spot, strike, time_years, vol, option_type)?;
            let diff = price - market_price;
            if diff.abs() < tolerance {
                return Ok(vol);
            }

            let d1 = self.d1(spot, strike, time_years, vol);
            let vega = spot * time_years.sqrt() * self.norm_pdf(d1);
            if vega.abs() < 1e-10 {
                break;
            }

            vol -= diff / vega;
            vol = vol.clamp(0.001, 5.0);
        }

        self.implied_volatility_bisection(market_price, spot, strike, time_years, option_type)
    }

    fn implied_volatility_bisection(
        &self,
        market_price: f64,
        spot: f64,
        strike: f64,
        time_years: f64,
        option_type: OptionType,
    ) -> Result<f64> {
        let max_iterations = 200;
        let tolerance = 1e-6;
        let mut low = 0.001;
        let mut high = 5.0;

        for _ in 0..max_iterations {
            let mid = (low + high) / 2.0;
            let price = self.black_scholes_price(spot, strike, time_years, mid, option_type)?;
            let diff = price - market_price;

            if diff.abs() < tolerance {
                return Ok(mid);
            }
            if diff > 0.0 {
                high = mid;
            } else {
                low = mid;
            }
        }

        Err(EngineError::InvalidStrategy(format!(
            "implied volatility did not converge after {max_iterations} iterations"
        )))
    }

    /// Premium-weighted implied volatility across solvable legs.
    fn strategy_implied_vol(&self, legs: &[OptionsLeg], spot: f64, asof: NaiveDate) -> Option<f64> {
        let mut weighted = 0.0;
        let mut weight = 0.0;
        for leg in legs {
            let days = (leg.expiry - asof).num_days();
            if days <= 0 || leg.premium <= 0.0 {
                continue;
            }
            let time_years = days as f64 / 365.0;
            match self.implied_volatility(leg.premium, spot, leg.strike, time_years, leg.option_type)
            {
                Ok(vol) => {
                    let w = leg.premium * leg.quantity;
                    weighted += vol * w;
                    weight += w;
                }
                Err(e) => debug!("implied vol unsolvable for strike {}: {e}", leg.strike),
            }
        }
        if weight > 0.0 {
            Some(weighted / weight)
        } else {
            None
        }
    }
}

fn erf(x: f64) -> f64 {
    // Horner form approximation
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * E.powf(-x * x);

    sign * y
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LegAction;

    fn pricer() -> StrategyPricer {
        StrategyPricer::new(0.05)
    }

    #[test]
    fn test_black_scholes_call_put_parity() {
        let p = pricer();
        let call = p
            .black_scholes_price(100.0, 100.0, 0.5, 0.4, OptionType::Call)
            .unwrap();
        let put = p
            .black_scholes_price(100.0, 100.0, 0.5, 0.4, OptionType::Put)
            .unwrap();
        let discount = E.powf(-0.05 * 0.5);
        // C - P = S - K * e^(-rT)
        assert!((call - put - (100.0 - 100.0 * discount)).abs() < 1e-6);
    }

    #[test]
    fn test_implied_vol_round_trip() {
        let p = pricer();
        let price = p
            .black_scholes_price(45000.0, 48000.0, 0.25, 0.65, OptionType::Call)
            .unwrap();
        let vol = p
            .implied_volatility(price, 45000.0, 48000.0, 0.25, OptionType::Call)
            .unwrap();
        assert!((vol - 0.65).abs() < 1e-3);
    }

    #[test]
    fn test_rejects_non_positive_inputs() {
        let p = pricer();
        assert!(p
            .black_scholes_price(0.0, 100.0, 1.0, 0.5, OptionType::Call)
            .is_err());
    }

    #[test]
    fn test_time_decay_sign_by_action() {
        let p = pricer();
        let expiry = NaiveDate::from_ymd_opt(2024, 2, 16).unwrap();
        let asof = NaiveDate::from_ymd_opt(2024, 1, 17).unwrap();
        let long = OptionsLeg::new(OptionType::Call, LegAction::Buy, 100.0, expiry, 1.0, 30.0);
        let short = OptionsLeg::new(OptionType::Put, LegAction::Sell, 100.0, expiry, 1.0, 30.0);

        assert!(p.time_decay(&[long], 1.0, asof) < 0.0);
        assert!(p.time_decay(&[short], 1.0, asof) > 0.0);
    }
}

//! Options Types
//!
//! Multi-leg options structures. Derived analytics (max profit/loss,
//! breakevens, implied volatility, time decay) are outputs of the strategy
//! pricer and are never set directly on the strategy.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Call or put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionType {
    Call,
    Put,
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionType::Call => write!(f, "call"),
            OptionType::Put => write!(f, "put"),
        }
    }
}

/// Whether the leg is bought or written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegAction {
    Buy,
    Sell,
}

impl LegAction {
    /// +1 for bought legs, -1 for written legs.
    pub fn sign(&self) -> f64 {
        match self {
            LegAction::Buy => 1.0,
            LegAction::Sell => -1.0,
        }
    }
}

/// One leg of a multi-leg options structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsLeg {
    #[serde(rename = "type")]
    pub option_type: OptionType,
    pub action: LegAction,
    pub strike: f64,
    pub expiry: NaiveDate,
    pub quantity: f64,
    /// Premium per unit of underlying, in price points.
    pub premium: f64,
}

impl OptionsLeg {
    pub fn new(
        option_type: OptionType,
        action: LegAction,
        strike: f64,
        expiry: NaiveDate,
        quantity: f64,
        premium: f64,
    ) -> Self {
        Self { option_type, action, strike, expiry, quantity, premium }
    }

    /// Intrinsic value per unit at an expiry price.
    pub fn intrinsic(&self, price: f64) -> f64 {
        match self.option_type {
            OptionType::Call => (price - self.strike).max(0.0),
            OptionType::Put => (self.strike - price).max(0.0),
        }
    }

    /// Net payoff per unit of underlying at expiry.
    pub fn payoff(&self, price: f64) -> f64 {
        self.action.sign() * (self.intrinsic(price) - self.premium) * self.quantity
    }

    /// Payoff slope as the underlying price falls without bound.
    pub fn slope_below(&self) -> f64 {
        match self.option_type {
            OptionType::Call => 0.0,
            OptionType::Put => -self.action.sign() * self.quantity,
        }
    }

    /// Payoff slope as the underlying price rises without bound.
    pub fn slope_above(&self) -> f64 {
        match self.option_type {
            OptionType::Call => self.action.sign() * self.quantity,
            OptionType::Put => 0.0,
        }
    }
}

/// Named multi-leg strategy shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    IronCondor,
    Butterfly,
    Straddle,
    Strangle,
    CalendarSpread,
}

/// A payoff extreme that may be unbounded.
///
/// Long option tails have no upper bound; an explicit variant keeps float
/// infinities out of downstream arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "bound", content = "value")]
pub enum ProfitBound {
    Finite(f64),
    Unbounded,
}

impl ProfitBound {
    pub fn is_unbounded(&self) -> bool {
        matches!(self, ProfitBound::Unbounded)
    }

    /// The finite value, if bounded.
    pub fn finite(&self) -> Option<f64> {
        match self {
            ProfitBound::Finite(v) => Some(*v),
            ProfitBound::Unbounded => None,
        }
    }
}

/// Derived analytics for a multi-leg strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyPricing {
    pub max_profit: ProfitBound,
    /// Worst-case loss, reported as a positive magnitude.
    pub max_loss: ProfitBound,
    /// Underlying prices where the net payoff crosses zero, ascending.
    pub breakevens: Vec<f64>,
    /// Premium-weighted implied volatility, when a spot price was supplied.
    pub implied_volatility: Option<f64>,
    /// Aggregate theta proxy in currency per day; negative for long books.
    pub time_decay: f64,
}

impl StrategyPricing {
    /// Pricing of an empty structure.
    pub fn empty() -> Self {
        Self {
            max_profit: ProfitBound::Finite(0.0),
            max_loss: ProfitBound::Finite(0.0),
            breakevens: Vec::new(),
            implied_volatility: None,
            time_decay: 0.0,
        }
    }
}

/// A configured multi-leg options structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsStrategy {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: StrategyKind,
    pub legs: Vec<OptionsLeg>,
}

impl OptionsStrategy {
    pub fn new(id: &str, name: &str, kind: StrategyKind, legs: Vec<OptionsLeg>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            legs,
        }
    }
}

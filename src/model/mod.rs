//! Option pricing model module
//!
//! Closed-form Black-Scholes pricing with Greeks to third order, and
//! implied volatility inversion against observed market prices

mod analytics;
mod black_scholes;
mod implied_vol;

pub use analytics::{full_metrics, OptionAnalytics};
pub use black_scholes::{call_price, normal_cdf, normal_pdf, put_price, BlackScholes};
pub use implied_vol::{
    ImpliedVolSolver, IvSolution, IvSolverConfig, SolveMethod, IV_MAX_ITERATIONS, IV_TOLERANCE,
    VOL_CEILING, VOL_FLOOR,
};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Call or put
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    /// Parse the single-letter code used in option symbols
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'C' => Some(OptionType::Call),
            'P' => Some(OptionType::Put),
            _ => None,
        }
    }

    /// Single-letter code used in option symbols
    pub fn code(&self) -> char {
        match self {
            OptionType::Call => 'C',
            OptionType::Put => 'P',
        }
    }

    pub fn is_call(&self) -> bool {
        *self == OptionType::Call
    }

    /// Undiscounted intrinsic value
    pub fn intrinsic(&self, spot: f64, strike: f64) -> f64 {
        match self {
            OptionType::Call => (spot - strike).max(0.0),
            OptionType::Put => (strike - spot).max(0.0),
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionType::Call => write!(f, "Call"),
            OptionType::Put => write!(f, "Put"),
        }
    }
}

/// Inputs to a Black-Scholes evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingInputs {
    /// Spot price of the underlying
    pub spot: f64,
    /// Strike price
    pub strike: f64,
    /// Time to expiry in years
    pub time: f64,
    /// Continuously-compounded risk-free rate
    pub rate: f64,
    /// Annualized volatility
    pub vol: f64,
}

impl PricingInputs {
    pub fn new(spot: f64, strike: f64, time: f64, rate: f64, vol: f64) -> Self {
        Self {
            spot,
            strike,
            time,
            rate,
            vol,
        }
    }

    /// Same contract at a different volatility
    pub fn with_vol(&self, vol: f64) -> Self {
        Self { vol, ..*self }
    }

    /// Discount factor e^(-rT)
    pub fn discount(&self) -> f64 {
        (-self.rate * self.time).exp()
    }

    /// d1 and d2, or None when the closed form does not apply
    /// (expired, zero vol, or non-positive prices)
    pub fn d1_d2(&self) -> Option<(f64, f64)> {
        if self.time <= 0.0 || self.vol <= 0.0 || self.spot <= 0.0 || self.strike <= 0.0 {
            return None;
        }
        let vol_sqrt_t = self.vol * self.time.sqrt();
        let d1 = ((self.spot / self.strike).ln()
            + (self.rate + 0.5 * self.vol * self.vol) * self.time)
            / vol_sqrt_t;
        Some((d1, d1 - vol_sqrt_t))
    }
}

/// First, second and third order sensitivities
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    /// dV/dS
    pub delta: f64,
    /// d2V/dS2
    pub gamma: f64,
    /// dV/dt per year
    pub theta: f64,
    /// dV/dsigma per unit vol
    pub vega: f64,
    /// dV/dr
    pub rho: f64,
    /// d2V/dS dsigma
    pub vanna: f64,
    /// d2V/dS dt per year
    pub charm: f64,
    /// d2V/dsigma2
    pub volga: f64,
    /// d3V/dS3
    pub speed: f64,
    /// d3V/dS2 dsigma
    pub zomma: f64,
    /// d3V/dS2 dT per year of expiry
    pub color: f64,
}

impl Greeks {
    /// Rescale to the conventional display units: gamma per 100 shares,
    /// theta and charm per calendar day, vega per vol point, vanna per vol point
    pub fn display_scaled(&self) -> Self {
        Self {
            delta: self.delta,
            gamma: self.gamma * 100.0,
            theta: self.theta / 365.0,
            vega: self.vega / 100.0,
            rho: self.rho / 100.0,
            vanna: self.vanna / 100.0,
            charm: self.charm / 365.0,
            volga: self.volga / 100.0,
            speed: self.speed,
            zomma: self.zomma,
            color: self.color / 365.0,
        }
    }
}

/// Trait for pricing model implementations
pub trait PricingModel: Send + Sync {
    /// Theoretical option value
    fn price(&self, inputs: &PricingInputs, option_type: OptionType) -> f64;
    /// Sensitivity of value to volatility
    fn vega(&self, inputs: &PricingInputs) -> f64;
    /// Full set of sensitivities from a single evaluation
    fn greeks(&self, inputs: &PricingInputs, option_type: OptionType) -> Greeks;
}

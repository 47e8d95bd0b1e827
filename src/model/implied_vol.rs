//! Implied volatility solver
//!
//! Safeguarded Newton-Raphson from a Corrado-Miller initial guess, with a
//! bisection fallback over the full volatility bracket. The solver never
//! fails: it always returns a volatility inside [floor, ceiling] and a flag
//! saying whether the market price was actually matched.

use super::{BlackScholes, OptionType, PricingInputs, PricingModel};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Lowest volatility the solver will return
pub const VOL_FLOOR: f64 = 0.001;
/// Highest volatility the solver will return
pub const VOL_CEILING: f64 = 5.0;
/// Price residual / step size tolerance
pub const IV_TOLERANCE: f64 = 1e-6;
/// Iteration budget for each of Newton-Raphson and bisection
pub const IV_MAX_ITERATIONS: usize = 100;

/// Vega below which the price surface is treated as flat
const MIN_VEGA: f64 = 1e-10;

/// Solver configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IvSolverConfig {
    pub vol_floor: f64,
    pub vol_ceiling: f64,
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for IvSolverConfig {
    fn default() -> Self {
        Self {
            vol_floor: VOL_FLOOR,
            vol_ceiling: VOL_CEILING,
            tolerance: IV_TOLERANCE,
            max_iterations: IV_MAX_ITERATIONS,
        }
    }
}

/// How a solution was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveMethod {
    /// Inputs unusable (non-positive price, spot, strike or time)
    InvalidInput,
    /// Market price at or below intrinsic value
    IntrinsicFloor,
    /// Newton-Raphson converged
    NewtonRaphson,
    /// Newton-Raphson gave up and bisection took over
    Bisection,
}

/// Result of an implied volatility solve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IvSolution {
    /// Implied volatility, always within the configured bounds
    pub vol: f64,
    /// True when the market price was matched strictly inside the bounds
    pub converged: bool,
    /// Total iterations spent
    pub iterations: usize,
    /// Method that produced the answer
    pub method: SolveMethod,
}

/// Inverts a pricing model against observed option prices
pub struct ImpliedVolSolver<M: PricingModel = BlackScholes> {
    model: M,
    config: IvSolverConfig,
}

impl ImpliedVolSolver<BlackScholes> {
    /// Create a Black-Scholes solver with default bounds and tolerance
    pub fn new() -> Self {
        Self::with_model(BlackScholes, IvSolverConfig::default())
    }
}

impl Default for ImpliedVolSolver<BlackScholes> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: PricingModel> ImpliedVolSolver<M> {
    /// Create a solver over an arbitrary pricing model
    pub fn with_model(model: M, config: IvSolverConfig) -> Self {
        Self { model, config }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn config(&self) -> &IvSolverConfig {
        &self.config
    }

    fn clamp(&self, vol: f64) -> f64 {
        if vol.is_nan() {
            return self.config.vol_floor;
        }
        vol.clamp(self.config.vol_floor, self.config.vol_ceiling)
    }

    fn strictly_inside(&self, vol: f64) -> bool {
        vol > self.config.vol_floor && vol < self.config.vol_ceiling
    }

    fn floor_solution(&self, method: SolveMethod) -> IvSolution {
        IvSolution {
            vol: self.config.vol_floor,
            converged: false,
            iterations: 0,
            method,
        }
    }

    /// Solve for the volatility that reproduces `market_price`
    pub fn solve(
        &self,
        market_price: f64,
        spot: f64,
        strike: f64,
        time: f64,
        rate: f64,
        option_type: OptionType,
    ) -> IvSolution {
        let valid = market_price.is_finite()
            && market_price > 0.0
            && spot > 0.0
            && strike > 0.0
            && time > 0.0
            && rate.is_finite();
        if !valid {
            return self.floor_solution(SolveMethod::InvalidInput);
        }

        if market_price <= option_type.intrinsic(spot, strike) + self.config.tolerance {
            return self.floor_solution(SolveMethod::IntrinsicFloor);
        }

        let base = PricingInputs::new(spot, strike, time, rate, self.config.vol_floor);
        let guess = self.initial_guess(market_price, &base);

        let (vol, converged, iterations) = self.newton_raphson(market_price, &base, option_type, guess);
        if converged {
            return IvSolution {
                vol,
                converged: self.strictly_inside(vol),
                iterations,
                method: SolveMethod::NewtonRaphson,
            };
        }

        tracing::debug!(
            market_price,
            spot,
            strike,
            time,
            last_vol = vol,
            "Newton-Raphson did not converge, falling back to bisection"
        );

        let (vol, converged, bisect_iterations) = self.bisection(market_price, &base, option_type);
        IvSolution {
            vol,
            converged: converged && self.strictly_inside(vol),
            iterations: iterations + bisect_iterations,
            method: SolveMethod::Bisection,
        }
    }

    /// Corrado-Miller closed-form approximation, clamped to
    /// [floor, half the ceiling]
    fn initial_guess(&self, market_price: f64, base: &PricingInputs) -> f64 {
        let sqrt_t = base.time.sqrt();
        let forward = base.spot / base.discount();
        let strike = base.strike;
        let log_moneyness = (forward / strike).ln();

        let brenner = (2.0 * PI).sqrt() / sqrt_t * (market_price - 0.5 * (forward - strike).abs())
            / (0.5 * (forward + strike));
        let corrected = (brenner * brenner + 2.0 * log_moneyness.abs() / base.time).sqrt();

        if corrected.is_finite() {
            corrected.clamp(self.config.vol_floor, 0.5 * self.config.vol_ceiling)
        } else {
            (0.5 * self.config.vol_ceiling).min(0.3).max(self.config.vol_floor)
        }
    }

    /// Returns (vol, converged, iterations)
    fn newton_raphson(
        &self,
        market_price: f64,
        base: &PricingInputs,
        option_type: OptionType,
        guess: f64,
    ) -> (f64, bool, usize) {
        let mut vol = guess;

        for iteration in 0..self.config.max_iterations {
            let inputs = base.with_vol(vol);
            let diff = self.model.price(&inputs, option_type) - market_price;
            if diff.abs() < self.config.tolerance {
                return (vol, true, iteration);
            }

            let vega = self.model.vega(&inputs);
            if vega < MIN_VEGA {
                // Flat region: the step would blow up, let bisection handle it
                return (vol, false, iteration);
            }

            let next = self.clamp(vol - diff / vega);
            if (next - vol).abs() < self.config.tolerance {
                // Pinned against a bound is not a match
                return (next, self.strictly_inside(next), iteration + 1);
            }
            vol = next;
        }

        (vol, false, self.config.max_iterations)
    }

    /// Returns (vol, converged, iterations). Price is monotone increasing
    /// in vol, so the bracket always shrinks onto the answer or a bound.
    fn bisection(
        &self,
        market_price: f64,
        base: &PricingInputs,
        option_type: OptionType,
    ) -> (f64, bool, usize) {
        let mut low = self.config.vol_floor;
        let mut high = self.config.vol_ceiling;

        if market_price < self.model.price(&base.with_vol(low), option_type) {
            return (low, false, 0);
        }
        if market_price > self.model.price(&base.with_vol(high), option_type) {
            return (high, false, 0);
        }

        let mut iterations = 0;
        while iterations < self.config.max_iterations && (high - low) > self.config.tolerance {
            let mid = 0.5 * (low + high);
            let diff = self.model.price(&base.with_vol(mid), option_type) - market_price;
            if diff.abs() < self.config.tolerance {
                return (mid, true, iterations + 1);
            }
            if diff < 0.0 {
                low = mid;
            } else {
                high = mid;
            }
            iterations += 1;
        }

        (self.clamp(0.5 * (low + high)), (high - low) <= self.config.tolerance, iterations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{call_price, put_price};

    #[test]
    fn test_round_trip_call() {
        let solver = ImpliedVolSolver::new();
        let price = call_price(100.0, 105.0, 0.5, 0.05, 0.32);
        let solution = solver.solve(price, 100.0, 105.0, 0.5, 0.05, OptionType::Call);
        assert!(solution.converged);
        assert!((solution.vol - 0.32).abs() < 1e-5);
        let repriced = call_price(100.0, 105.0, 0.5, 0.05, solution.vol);
        assert!((repriced - price).abs() < 1e-5);
    }

    #[test]
    fn test_round_trip_across_strikes_and_types() {
        let solver = ImpliedVolSolver::new();
        for strike in [480.0, 520.0, 560.0, 600.0, 640.0] {
            for (option_type, vol) in [(OptionType::Call, 0.22), (OptionType::Put, 0.41)] {
                let price = match option_type {
                    OptionType::Call => call_price(560.0, strike, 0.1, 0.043, vol),
                    OptionType::Put => put_price(560.0, strike, 0.1, 0.043, vol),
                };
                let solution = solver.solve(price, 560.0, strike, 0.1, 0.043, option_type);
                if solution.converged {
                    let repriced = match option_type {
                        OptionType::Call => call_price(560.0, strike, 0.1, 0.043, solution.vol),
                        OptionType::Put => put_price(560.0, strike, 0.1, 0.043, solution.vol),
                    };
                    assert!((repriced - price).abs() < 1e-5, "strike {}", strike);
                }
            }
        }
    }

    #[test]
    fn test_at_intrinsic_returns_floor() {
        let solver = ImpliedVolSolver::new();
        let solution = solver.solve(10.0, 110.0, 100.0, 0.25, 0.05, OptionType::Call);
        assert_eq!(solution.vol, VOL_FLOOR);
        assert!(!solution.converged);
        assert_eq!(solution.method, SolveMethod::IntrinsicFloor);
    }

    #[test]
    fn test_pathological_inputs_stay_in_bounds() {
        let solver = ImpliedVolSolver::new();
        let cases = [
            (0.0, 100.0, 100.0, 0.25),
            (-3.0, 100.0, 100.0, 0.25),
            (5.0, 0.0, 100.0, 0.25),
            (5.0, -100.0, 100.0, 0.25),
            (5.0, 100.0, 100.0, 0.0),
            (f64::NAN, 100.0, 100.0, 0.25),
            (f64::INFINITY, 100.0, 100.0, 0.25),
            (99.0, 100.0, 100.0, 0.25),
            (1e-9, 100.0, 300.0, 0.01),
        ];
        for (price, spot, strike, time) in cases {
            for option_type in [OptionType::Call, OptionType::Put] {
                let solution = solver.solve(price, spot, strike, time, 0.05, option_type);
                assert!(solution.vol >= VOL_FLOOR && solution.vol <= VOL_CEILING);
            }
        }
    }

    #[test]
    fn test_price_above_ceiling_value_not_converged() {
        let solver = ImpliedVolSolver::new();
        // A call can never be worth more than the spot
        let solution = solver.solve(99.0, 100.0, 100.0, 0.25, 0.05, OptionType::Call);
        assert_eq!(solution.vol, VOL_CEILING);
        assert!(!solution.converged);
    }

    #[test]
    fn test_bisection_fallback_when_newton_budget_is_tiny() {
        let config = IvSolverConfig {
            max_iterations: 1,
            ..Default::default()
        };
        let solver = ImpliedVolSolver::with_model(BlackScholes, config);
        let price = call_price(100.0, 130.0, 0.2, 0.01, 0.9);
        let solution = solver.solve(price, 100.0, 130.0, 0.2, 0.01, OptionType::Call);
        assert_eq!(solution.method, SolveMethod::Bisection);
        assert!(solution.vol >= VOL_FLOOR && solution.vol <= VOL_CEILING);
    }

    #[test]
    fn test_high_vol_recovered() {
        let solver = ImpliedVolSolver::new();
        let price = put_price(50.0, 55.0, 0.3, 0.02, 2.2);
        let solution = solver.solve(price, 50.0, 55.0, 0.3, 0.02, OptionType::Put);
        assert!(solution.converged);
        assert!((solution.vol - 2.2).abs() < 1e-4);
    }

    #[test]
    fn test_initial_guess_bounded() {
        let solver = ImpliedVolSolver::new();
        let base = PricingInputs::new(100.0, 100.0, 0.001, 0.05, VOL_FLOOR);
        let guess = solver.initial_guess(50.0, &base);
        assert!(guess <= 0.5 * VOL_CEILING && guess >= VOL_FLOOR);
    }
}

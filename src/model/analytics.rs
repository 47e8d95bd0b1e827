//! Full analytics for a single observed option price

use super::{
    BlackScholes, Greeks, ImpliedVolSolver, OptionType, PricingInputs, PricingModel, SolveMethod,
};
use serde::{Deserialize, Serialize};

/// Implied vol plus everything evaluated at it
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionAnalytics {
    pub implied_vol: f64,
    pub iv_converged: bool,
    /// Price at or below intrinsic; `implied_vol` is the floor
    pub at_intrinsic_floor: bool,
    /// Theoretical call value at the implied vol
    pub call_price: f64,
    /// Theoretical put value at the implied vol
    pub put_price: f64,
    /// Greeks for the requested side at the implied vol
    pub greeks: Greeks,
}

/// Solve implied vol from `market_price`, then evaluate both theoretical
/// values and the full Greek set at that vol
pub fn full_metrics(
    spot: f64,
    strike: f64,
    time: f64,
    rate: f64,
    market_price: f64,
    option_type: OptionType,
) -> OptionAnalytics {
    let solver = ImpliedVolSolver::new();
    let solution = solver.solve(market_price, spot, strike, time, rate, option_type);
    let inputs = PricingInputs::new(spot, strike, time, rate, solution.vol);
    let model = BlackScholes;

    OptionAnalytics {
        implied_vol: solution.vol,
        iv_converged: solution.converged,
        at_intrinsic_floor: solution.method == SolveMethod::IntrinsicFloor,
        call_price: model.price(&inputs, OptionType::Call),
        put_price: model.price(&inputs, OptionType::Put),
        greeks: model.greeks(&inputs, option_type),
    }
}

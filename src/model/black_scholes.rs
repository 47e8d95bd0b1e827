//! Black-Scholes closed forms
//!
//! European options on a non-dividend-paying underlying:
//! C = S*N(d1) - K*e^(-rT)*N(d2), P = K*e^(-rT)*N(-d2) - S*N(-d1)
//!
//! Every Greek in one evaluation is derived from a single (d1, d2) pair.

use super::{Greeks, OptionType, PricingInputs, PricingModel};
use statrs::function::erf::erfc;
use std::f64::consts::{PI, SQRT_2};

/// Black-Scholes pricing model
#[derive(Debug, Clone, Copy, Default)]
pub struct BlackScholes;

impl BlackScholes {
    /// Create a new Black-Scholes model
    pub fn new() -> Self {
        Self
    }
}

/// Standard normal CDF
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// Standard normal PDF
pub fn normal_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Call value for plain arguments
pub fn call_price(spot: f64, strike: f64, time: f64, rate: f64, vol: f64) -> f64 {
    BlackScholes.price(
        &PricingInputs::new(spot, strike, time, rate, vol),
        OptionType::Call,
    )
}

/// Put value for plain arguments
pub fn put_price(spot: f64, strike: f64, time: f64, rate: f64, vol: f64) -> f64 {
    BlackScholes.price(
        &PricingInputs::new(spot, strike, time, rate, vol),
        OptionType::Put,
    )
}

/// Value and Greeks when the closed form does not apply.
///
/// At or past expiry (or with non-positive prices) the option is worth its
/// intrinsic value. With zero vol and time remaining it is worth the
/// discounted-intrinsic limit and only the carry terms survive.
fn degenerate(inputs: &PricingInputs, option_type: OptionType) -> (f64, Greeks) {
    let PricingInputs {
        spot,
        strike,
        time,
        rate,
        ..
    } = *inputs;

    if time <= 0.0 || spot <= 0.0 || strike <= 0.0 {
        let delta = match option_type {
            OptionType::Call if spot > strike => 1.0,
            OptionType::Put if spot < strike => -1.0,
            _ => 0.0,
        };
        let greeks = Greeks {
            delta,
            ..Default::default()
        };
        return (option_type.intrinsic(spot, strike), greeks);
    }

    let pv_strike = strike * inputs.discount();
    let (value, delta, theta, rho) = match option_type {
        OptionType::Call if spot > pv_strike => {
            (spot - pv_strike, 1.0, -rate * pv_strike, time * pv_strike)
        }
        OptionType::Put if spot < pv_strike => {
            (pv_strike - spot, -1.0, rate * pv_strike, -time * pv_strike)
        }
        _ => (0.0, 0.0, 0.0, 0.0),
    };
    let greeks = Greeks {
        delta,
        theta,
        rho,
        ..Default::default()
    };
    (value, greeks)
}

impl PricingModel for BlackScholes {
    fn price(&self, inputs: &PricingInputs, option_type: OptionType) -> f64 {
        let Some((d1, d2)) = inputs.d1_d2() else {
            return degenerate(inputs, option_type).0;
        };
        let pv_strike = inputs.strike * inputs.discount();
        match option_type {
            OptionType::Call => inputs.spot * normal_cdf(d1) - pv_strike * normal_cdf(d2),
            OptionType::Put => pv_strike * normal_cdf(-d2) - inputs.spot * normal_cdf(-d1),
        }
    }

    fn vega(&self, inputs: &PricingInputs) -> f64 {
        match inputs.d1_d2() {
            Some((d1, _)) => inputs.spot * normal_pdf(d1) * inputs.time.sqrt(),
            None => 0.0,
        }
    }

    fn greeks(&self, inputs: &PricingInputs, option_type: OptionType) -> Greeks {
        let Some((d1, d2)) = inputs.d1_d2() else {
            return degenerate(inputs, option_type).1;
        };

        let PricingInputs {
            spot: s,
            strike: k,
            time: t,
            rate: r,
            vol: sigma,
        } = *inputs;

        let sqrt_t = t.sqrt();
        let vol_sqrt_t = sigma * sqrt_t;
        let phi = normal_pdf(d1);
        let pv_strike = k * inputs.discount();

        let gamma = phi / (s * vol_sqrt_t);
        let vega = s * phi * sqrt_t;
        let decay = -(s * phi * sigma) / (2.0 * sqrt_t);

        let (delta, theta, rho) = match option_type {
            OptionType::Call => (
                normal_cdf(d1),
                decay - r * pv_strike * normal_cdf(d2),
                t * pv_strike * normal_cdf(d2),
            ),
            OptionType::Put => (
                normal_cdf(d1) - 1.0,
                decay + r * pv_strike * normal_cdf(-d2),
                -t * pv_strike * normal_cdf(-d2),
            ),
        };

        // Without dividends the cross-Greeks below carry no call/put term
        let vanna = -phi * d2 / sigma;
        let charm = -phi * (2.0 * r * t - d2 * vol_sqrt_t) / (2.0 * t * vol_sqrt_t);
        let volga = vega * d1 * d2 / sigma;
        let speed = -gamma / s * (d1 / vol_sqrt_t + 1.0);
        let zomma = gamma * (d1 * d2 - 1.0) / sigma;
        let color = -phi / (2.0 * s * t * vol_sqrt_t)
            * (1.0 + d1 * (2.0 * r * t - d2 * vol_sqrt_t) / vol_sqrt_t);

        Greeks {
            delta,
            gamma,
            theta,
            vega,
            rho,
            vanna,
            charm,
            volga,
            speed,
            zomma,
            color,
        }
    }
}

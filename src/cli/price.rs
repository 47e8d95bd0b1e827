//! Price command implementation

use crate::contract::reference_tenor;
use crate::model::{full_metrics, BlackScholes, OptionType, PricingInputs, PricingModel};
use clap::{Args, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OptionKind {
    Call,
    Put,
}

impl From<OptionKind> for OptionType {
    fn from(kind: OptionKind) -> Self {
        match kind {
            OptionKind::Call => OptionType::Call,
            OptionKind::Put => OptionType::Put,
        }
    }
}

#[derive(Args, Debug)]
pub struct PriceArgs {
    /// Underlying price
    #[arg(long)]
    pub spot: f64,

    /// Strike price
    #[arg(long)]
    pub strike: f64,

    /// Calendar days to expiry
    #[arg(long)]
    pub days: f64,

    /// Option type
    #[arg(long = "type", value_enum, default_value = "call")]
    pub kind: OptionKind,

    /// Volatility to price at (0.20 = 20%)
    #[arg(long, conflicts_with = "market_price")]
    pub vol: Option<f64>,

    /// Market price to solve implied vol from
    #[arg(long)]
    pub market_price: Option<f64>,

    /// Risk-free rate; defaults to the configured rate
    #[arg(long)]
    pub rate: Option<f64>,
}

impl PriceArgs {
    pub fn execute(&self, configured_rate: f64) -> anyhow::Result<()> {
        let rate = self.rate.unwrap_or(configured_rate);
        let time = self.days / 365.0;
        let option_type = OptionType::from(self.kind);

        let (vol, fair, greeks) = match (self.market_price, self.vol) {
            (Some(price), _) => {
                let analytics = full_metrics(self.spot, self.strike, time, rate, price, option_type);
                if analytics.at_intrinsic_floor {
                    println!("Price at or below intrinsic: min vol");
                } else if !analytics.iv_converged {
                    println!("Implied vol did not converge");
                }
                let fair = match option_type {
                    OptionType::Call => analytics.call_price,
                    OptionType::Put => analytics.put_price,
                };
                (analytics.implied_vol, fair, analytics.greeks)
            }
            (None, Some(vol)) => {
                let model = BlackScholes::new();
                let inputs = PricingInputs::new(self.spot, self.strike, time, rate, vol);
                (vol, model.price(&inputs, option_type), model.greeks(&inputs, option_type))
            }
            (None, None) => anyhow::bail!("either --vol or --market-price is required"),
        };

        let scaled = greeks.display_scaled();
        println!(
            "{} S={:.2} K={:.2} T={:.4}y r={:.4} (ref tenor {})",
            option_type,
            self.spot,
            self.strike,
            time,
            rate,
            reference_tenor(time).series_id()
        );
        println!("  Vol:    {:.2}%", vol * 100.0);
        println!("  Price:  {:.4}", fair);
        println!("  Delta:  {:.4}", scaled.delta);
        println!("  Gamma:  {:.4}", scaled.gamma);
        println!("  Theta:  {:.4} /day", scaled.theta);
        println!("  Vega:   {:.4} /vol pt", scaled.vega);
        println!("  Rho:    {:.4}", scaled.rho);
        println!("  Vanna:  {:.4}", scaled.vanna);
        println!("  Charm:  {:.4}", scaled.charm);
        println!("  Volga:  {:.4}", scaled.volga);
        println!("  Speed:  {:.6}", scaled.speed);
        println!("  Zomma:  {:.4}", scaled.zomma);
        println!("  Color:  {:.4}", scaled.color);
        Ok(())
    }
}

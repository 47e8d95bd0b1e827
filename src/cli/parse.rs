//! Parse command implementation

use crate::contract::{reference_tenor, OptionSymbol};
use chrono::Utc;
use clap::Args;

#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Option symbol, e.g. QQQ250801C00560000
    pub symbol: String,
}

impl ParseArgs {
    pub fn execute(&self) -> anyhow::Result<()> {
        let symbol = OptionSymbol::parse(&self.symbol)?;
        let expiry = symbol.expiry_date()?;
        let years = symbol.time_to_expiry(Utc::now())?;

        println!("{}", symbol.readable());
        println!("  Underlying: {}", symbol.underlying);
        println!("  Expiry:     {}", expiry.format("%Y-%m-%d"));
        println!("  Type:       {}", symbol.option_type);
        println!("  Strike:     {:.3}", symbol.strike);
        if years > 0.0 {
            println!(
                "  Remaining:  {:.1} days ({:.4}y, rate tenor {})",
                years * 365.25,
                years,
                reference_tenor(years).series_id()
            );
        } else {
            println!("  Remaining:  expired");
        }
        Ok(())
    }
}

//! Option contract identity
//!
//! Parses OCC-style option symbols (`QQQ250801C00560000`) and converts
//! their expiry into years remaining.

mod expiry;
mod symbol;

pub use expiry::{reference_tenor, time_to_expiry, RateTenor, EXPIRY_HOUR_UTC};
pub use symbol::{underlying_of, OptionSymbol};

use thiserror::Error;

/// Symbol parsing errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymbolError {
    /// Symbol shorter than the smallest possible option symbol
    #[error("Symbol too short: {0}")]
    TooShort(String),
    /// No date/type/strike block anywhere in the symbol
    #[error("No expiry/type/strike block in symbol: {0}")]
    NoContractBlock(String),
    /// Date digits do not form a calendar date
    #[error("Invalid expiry date {expiry} in symbol {symbol}")]
    InvalidExpiry { symbol: String, expiry: String },
}

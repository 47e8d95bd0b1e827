//! Option symbol grammar: `<UNDERLYING><YYMMDD><C|P><strike x 1000, 8 digits>`

use super::{time_to_expiry, SymbolError};
use crate::model::OptionType;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const DATE_LEN: usize = 6;
const STRIKE_LEN: usize = 8;
/// Date + type + strike
const BLOCK_LEN: usize = DATE_LEN + 1 + STRIKE_LEN;
/// At least one underlying character ahead of the block
const MIN_SYMBOL_LEN: usize = BLOCK_LEN;

/// A parsed option symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSymbol {
    /// Symbol exactly as received
    pub raw: String,
    /// Underlying ticker (may itself contain digits)
    pub underlying: String,
    /// Expiry as `YYMMDD`
    pub expiry: String,
    pub option_type: OptionType,
    /// Strike in dollars
    pub strike: f64,
}

/// Offset of the first date/type/strike block, scanning from index 1
fn find_block(bytes: &[u8]) -> Option<usize> {
    if bytes.len() < BLOCK_LEN + 1 {
        return None;
    }
    (1..=bytes.len() - BLOCK_LEN).find(|&i| {
        let block = &bytes[i..i + BLOCK_LEN];
        block[..DATE_LEN].iter().all(u8::is_ascii_digit)
            && matches!(block[DATE_LEN], b'C' | b'P')
            && block[DATE_LEN + 1..].iter().all(u8::is_ascii_digit)
    })
}

impl OptionSymbol {
    /// Parse a symbol. The first position holding six digits, a `C`/`P`
    /// and eight digits wins, so underlyings with digits parse correctly.
    pub fn parse(symbol: &str) -> Result<Self, SymbolError> {
        if symbol.len() < MIN_SYMBOL_LEN {
            return Err(SymbolError::TooShort(symbol.to_string()));
        }

        let bytes = symbol.as_bytes();
        let start =
            find_block(bytes).ok_or_else(|| SymbolError::NoContractBlock(symbol.to_string()))?;

        // Block is pure ASCII so these slices sit on char boundaries
        let expiry = &symbol[start..start + DATE_LEN];
        let option_type = OptionType::from_code(bytes[start + DATE_LEN] as char)
            .ok_or_else(|| SymbolError::NoContractBlock(symbol.to_string()))?;
        let strike_digits = &symbol[start + DATE_LEN + 1..start + BLOCK_LEN];
        let strike_thousandths: u64 = strike_digits
            .parse()
            .map_err(|_| SymbolError::NoContractBlock(symbol.to_string()))?;

        Ok(Self {
            raw: symbol.to_string(),
            underlying: symbol[..start].to_string(),
            expiry: expiry.to_string(),
            option_type,
            strike: strike_thousandths as f64 / 1000.0,
        })
    }

    /// Expiry as a calendar date
    pub fn expiry_date(&self) -> Result<NaiveDate, SymbolError> {
        NaiveDate::parse_from_str(&self.expiry, "%y%m%d").map_err(|_| {
            SymbolError::InvalidExpiry {
                symbol: self.raw.clone(),
                expiry: self.expiry.clone(),
            }
        })
    }

    /// Years until expiry as of `now`, 0 once expired
    pub fn time_to_expiry(&self, now: DateTime<Utc>) -> Result<f64, SymbolError> {
        Ok(time_to_expiry(self.expiry_date()?, now))
    }

    pub fn is_call(&self) -> bool {
        self.option_type.is_call()
    }

    /// Human-readable form, e.g. `QQQ 08/01/25 $560.00 Call`
    pub fn readable(&self) -> String {
        let e = &self.expiry;
        format!(
            "{} {}/{}/{} ${:.2} {}",
            self.underlying,
            &e[2..4],
            &e[4..6],
            &e[0..2],
            self.strike,
            self.option_type
        )
    }
}

impl FromStr for OptionSymbol {
    type Err = SymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for OptionSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Underlying ticker of an option symbol, if it parses
pub fn underlying_of(symbol: &str) -> Option<&str> {
    if symbol.len() < MIN_SYMBOL_LEN {
        return None;
    }
    find_block(symbol.as_bytes()).map(|start| &symbol[..start])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_canonical_symbol() {
        let sym = OptionSymbol::parse("QQQ250801C00560000").unwrap();
        assert_eq!(sym.underlying, "QQQ");
        assert_eq!(sym.expiry, "250801");
        assert_eq!(sym.option_type, OptionType::Call);
        assert!((sym.strike - 560.0).abs() < 1e-12);
    }

    #[test]
    fn test_parse_put_fractional_strike() {
        let sym: OptionSymbol = "SPY251219P00412500".parse().unwrap();
        assert_eq!(sym.option_type, OptionType::Put);
        assert!((sym.strike - 412.5).abs() < 1e-12);
    }

    #[test]
    fn test_underlying_with_digits() {
        let sym = OptionSymbol::parse("BRK2250117C00450000").unwrap();
        assert_eq!(sym.underlying, "BRK2");
        assert_eq!(sym.expiry, "250117");
    }

    #[test]
    fn test_single_letter_underlying() {
        let sym = OptionSymbol::parse("F250620P00012000").unwrap();
        assert_eq!(sym.underlying, "F");
        assert!((sym.strike - 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_short_and_malformed() {
        assert!(matches!(
            OptionSymbol::parse("QQQ"),
            Err(SymbolError::TooShort(_))
        ));
        assert!(matches!(
            OptionSymbol::parse("QQQ250801X00560000"),
            Err(SymbolError::NoContractBlock(_))
        ));
        // Strike truncated to seven digits
        assert!(OptionSymbol::parse("QQQ250801C0056000").is_err());
        // Block may not start at index 0
        assert!(OptionSymbol::parse("250801C00560000").is_err());
    }

    #[test]
    fn test_readable() {
        let sym = OptionSymbol::parse("QQQ250801C00560000").unwrap();
        assert_eq!(sym.readable(), "QQQ 08/01/25 $560.00 Call");
        let put = OptionSymbol::parse("IWM250919P00215500").unwrap();
        assert_eq!(put.readable(), "IWM 09/19/25 $215.50 Put");
    }

    #[test]
    fn test_expiry_date() {
        let sym = OptionSymbol::parse("QQQ250801C00560000").unwrap();
        assert_eq!(
            sym.expiry_date().unwrap(),
            NaiveDate::from_ymd_opt(2025, 8, 1).unwrap()
        );
        let bad = OptionSymbol::parse("QQQ251341C00560000").unwrap();
        assert!(matches!(
            bad.expiry_date(),
            Err(SymbolError::InvalidExpiry { .. })
        ));
    }

    #[test]
    fn test_time_to_expiry_from_symbol() {
        let sym = OptionSymbol::parse("QQQ250801C00560000").unwrap();
        let now = Utc.with_ymd_and_hms(2025, 7, 2, 20, 0, 0).unwrap();
        let years = sym.time_to_expiry(now).unwrap();
        assert!((years - 30.0 / 365.25).abs() < 1e-9);
    }

    #[test]
    fn test_underlying_of() {
        assert_eq!(underlying_of("QQQ250801C00560000"), Some("QQQ"));
        assert_eq!(underlying_of("AAPL"), None);
    }
}

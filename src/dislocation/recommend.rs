//! Flag combinations to suggested structures

use super::DislocationFlags;
use crate::model::OptionType;
use crate::store::ContractRecord;
use crate::volatility::IvRvAnalysis;

/// Spread, in vol points, beyond which IV is extremely mispriced against RV
const EXTREME_IV_RV_SPREAD: f64 = 0.15;

/// Suggested trades for a flagged contract, most specific first. Empty
/// when no flag is set, and when only a negative charm is flagged.
pub fn recommend(
    record: &ContractRecord,
    flags: &DislocationFlags,
    vanna_volga_ratio: Option<f64>,
    iv_rv: Option<&IvRvAnalysis>,
) -> Vec<String> {
    if !flags.any() {
        return Vec::new();
    }

    let greeks = &record.analytics.greeks;
    let (vanna, volga, charm) = (greeks.vanna, greeks.volga, greeks.charm);
    let option_type = record.symbol.option_type;
    let spot_over_strike = if record.symbol.strike > 0.0 {
        record.underlying_price / record.symbol.strike
    } else {
        1.0
    };
    let itm = match option_type {
        OptionType::Call => spot_over_strike > 1.02,
        OptionType::Put => spot_over_strike < 0.98,
    };
    let atm = (0.98..=1.02).contains(&spot_over_strike);
    let days = record.days_to_expiry();

    let mut out: Vec<&str> = Vec::new();

    if flags.vanna && vanna.abs() > 2.0 {
        if option_type == OptionType::Put && vanna > 0.0 {
            out.push("SELL PUT SPREADS - Vol premium expensive");
        } else if option_type == OptionType::Call && itm && vanna < 0.0 {
            out.push("BUY CALL CALENDARS - Vol dislocated");
        } else if vanna.abs() > 5.0 {
            out.push("STRADDLE TRADE - Vol/spot correlation break");
        }
    }

    if flags.volga && volga > 40.0 {
        if days < 30.0 {
            out.push("SELL IRON CONDORS - Expensive convexity near expiry");
        } else if atm {
            out.push("SELL ATM STRADDLES - Rich vol premium");
        } else {
            out.push("SHORT VOL POSITION - Overpriced vol insurance");
        }
    } else if flags.volga && volga < 2.0 && days > 7.0 {
        out.push("BUY BUTTERFLIES - Cheap convexity opportunity");
    }

    if flags.charm && charm > 0.0 {
        out.push("AVOID DELTA HEDGING - Expensive gamma exposure");
        if days < 7.0 {
            out.push("WEEKLY EXPIRY PLAY - Unusual theta decay");
        }
    }

    if let Some(ratio) = vanna_volga_ratio {
        if ratio > 0.5 {
            out.push("VOL SURFACE ARBITRAGE - Smile dislocation");
            if itm {
                out.push(match option_type {
                    OptionType::Call => "SELL ITM CALLS vs BUY OTM CALLS",
                    OptionType::Put => "SELL ITM PUTS vs BUY OTM PUTS",
                });
            }
        } else if ratio < 0.05 {
            out.push("RATIO SPREAD - Directional vol play");
        }
    }

    if flags.vanna && flags.volga {
        if days < 30.0 {
            out.push("SELL FRONT MONTH - Calendar opportunity");
        } else {
            out.push("BUY CALENDARS - Sell front vol, buy back vol");
        }
    }

    if vanna.abs() > 10.0 || volga > 100.0 {
        out.push("HIGH RISK - Size positions carefully");
    }

    if flags.iv_rv {
        if let Some(analysis) = iv_rv {
            if analysis.spread > EXTREME_IV_RV_SPREAD {
                out.push("SELL VOL - IV extremely expensive vs RV");
            } else if analysis.spread < -EXTREME_IV_RV_SPREAD {
                out.push("BUY VOL - IV extremely cheap vs RV");
            }
        }
    }

    // One default line per flag when no structure applies
    if out.is_empty() {
        if flags.vanna {
            out.push("MONITOR - Watch for entry opportunity");
        }
        if flags.volga {
            out.push("VOL PLAY - Volatility mispricing detected");
        }
        if flags.iv_rv {
            out.push("IV-RV DISLOCATION - Volatility premium anomaly");
        }
    }

    out.into_iter().map(String::from).collect()
}

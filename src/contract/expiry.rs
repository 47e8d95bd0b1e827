//! Expiry date to year fraction

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Equity options stop trading at 16:00 US/Eastern; approximated as 20:00 UTC
pub const EXPIRY_HOUR_UTC: u32 = 20;

const SECONDS_PER_YEAR: f64 = 365.25 * 24.0 * 3600.0;

/// Years from `now` until the close on `expiry`, 0 once expired
pub fn time_to_expiry(expiry: NaiveDate, now: DateTime<Utc>) -> f64 {
    let Some(close) = expiry.and_hms_opt(EXPIRY_HOUR_UTC, 0, 0) else {
        return 0.0;
    };
    let close = Utc.from_utc_datetime(&close);
    let seconds = (close - now).num_milliseconds() as f64 / 1000.0;
    (seconds / SECONDS_PER_YEAR).max(0.0)
}

/// Treasury / policy rate series appropriate for a given horizon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateTenor {
    /// 3-month T-bill
    ThreeMonthBill,
    /// Effective federal funds rate
    FedFunds,
    /// 10-year Treasury note
    TenYearNote,
}

impl RateTenor {
    /// FRED series identifier
    pub fn series_id(&self) -> &'static str {
        match self {
            RateTenor::ThreeMonthBill => "DGS3MO",
            RateTenor::FedFunds => "FEDFUNDS",
            RateTenor::TenYearNote => "DGS10",
        }
    }
}

/// Reference rate series to discount an option expiring in `years`
pub fn reference_tenor(years: f64) -> RateTenor {
    if years <= 0.25 {
        RateTenor::ThreeMonthBill
    } else if years <= 2.0 {
        RateTenor::FedFunds
    } else {
        RateTenor::TenYearNote
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_year_out() {
        let expiry = NaiveDate::from_ymd_opt(2026, 1, 16).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 1, 16, 20, 0, 0).unwrap();
        let years = time_to_expiry(expiry, now);
        assert!((years - 365.0 / 365.25).abs() < 1e-9);
    }

    #[test]
    fn test_expiry_day_before_close() {
        let expiry = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 8, 1, 14, 0, 0).unwrap();
        let years = time_to_expiry(expiry, now);
        assert!((years - 6.0 / (365.25 * 24.0)).abs() < 1e-12);
    }

    #[test]
    fn test_expired_is_zero() {
        let expiry = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 8, 1, 20, 30, 0).unwrap();
        assert_eq!(time_to_expiry(expiry, now), 0.0);
    }

    #[test]
    fn test_reference_tenor() {
        assert_eq!(reference_tenor(0.1), RateTenor::ThreeMonthBill);
        assert_eq!(reference_tenor(0.25), RateTenor::ThreeMonthBill);
        assert_eq!(reference_tenor(1.5), RateTenor::FedFunds);
        assert_eq!(reference_tenor(5.0), RateTenor::TenYearNote);
        assert_eq!(RateTenor::TenYearNote.series_id(), "DGS10");
    }
}

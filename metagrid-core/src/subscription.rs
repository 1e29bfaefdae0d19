//! Subscription recurrence.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MetagridError, Result};

/// How often a subscribed search is re-run for notifications.
///
/// Serialized as the short codes stored in the database (`D`, `W`, `BW`, `M`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "D")]
    Daily,
    #[default]
    #[serde(rename = "W")]
    Weekly,
    #[serde(rename = "BW")]
    BiWeekly,
    #[serde(rename = "M")]
    Monthly,
}

impl Period {
    pub const ALL: [Period; 4] = [
        Period::Daily,
        Period::Weekly,
        Period::BiWeekly,
        Period::Monthly,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Period::Daily => "D",
            Period::Weekly => "W",
            Period::BiWeekly => "BW",
            Period::Monthly => "M",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Period::Daily => "Daily",
            Period::Weekly => "Weekly",
            Period::BiWeekly => "Bi-weekly",
            Period::Monthly => "Monthly",
        }
    }

    /// The first notification time one period after `from`.
    ///
    /// Monthly recurrences keep the day of month, clamped to the last day of
    /// shorter months (Jan 31 -> Feb 28/29).
    pub fn next_after(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Period::Daily => from + Duration::days(1),
            Period::Weekly => from + Duration::weeks(1),
            Period::BiWeekly => from + Duration::weeks(2),
            Period::Monthly => from
                .checked_add_months(Months::new(1))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Period {
    type Err = MetagridError;

    fn from_str(s: &str) -> Result<Self> {
        Period::ALL
            .into_iter()
            .find(|p| p.code() == s)
            .ok_or_else(|| MetagridError::InvalidPeriod(s.to_string()))
    }
}

impl TryFrom<String> for Period {
    type Error = MetagridError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_period_codes_round_trip_through_from_str() {
        for period in Period::ALL {
            assert_eq!(period.code().parse::<Period>().unwrap(), period);
        }
        assert_eq!(
            "Y".parse::<Period>(),
            Err(MetagridError::InvalidPeriod("Y".into()))
        );
    }

    #[test]
    fn test_period_serde_uses_codes() {
        assert_eq!(serde_json::to_string(&Period::BiWeekly).unwrap(), "\"BW\"");
        assert_eq!(
            serde_json::from_str::<Period>("\"M\"").unwrap(),
            Period::Monthly
        );
        assert!(serde_json::from_str::<Period>("\"Weekly\"").is_err());
        assert_eq!(Period::default(), Period::Weekly);
        assert_eq!(Period::BiWeekly.to_string(), "Bi-weekly");
    }

    #[test]
    fn test_next_after_fixed_intervals() {
        let start = at(2020, 8, 24);
        assert_eq!(Period::Daily.next_after(start), at(2020, 8, 25));
        assert_eq!(Period::Weekly.next_after(start), at(2020, 8, 31));
        assert_eq!(Period::BiWeekly.next_after(start), at(2020, 9, 7));
    }

    #[test]
    fn test_next_after_monthly_clamps_day() {
        assert_eq!(Period::Monthly.next_after(at(2020, 1, 31)), at(2020, 2, 29));
        assert_eq!(Period::Monthly.next_after(at(2021, 1, 31)), at(2021, 2, 28));
        assert_eq!(Period::Monthly.next_after(at(2020, 12, 15)), at(2021, 1, 15));
    }
}

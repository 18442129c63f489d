//! Temporal bucketing: canonical bucket keys and bucket enumeration over a
//! date range.
//!
//! Week buckets follow ISO-8601: weeks start on Monday and belong to the ISO
//! week-year, so `2024-12-30` is keyed `2025-W01` and `2021-01-01` is keyed
//! `2020-W53`. Keys of every granularity sort lexicographically in
//! chronological order.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Week,
    #[default]
    Month,
    Year,
}

impl Granularity {
    pub const ALL: [Granularity; 4] = [
        Granularity::Day,
        Granularity::Week,
        Granularity::Month,
        Granularity::Year,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
            Granularity::Year => "year",
        }
    }

    /// Human label used in report headings.
    pub fn label(&self) -> &'static str {
        match self {
            Granularity::Day => "daily",
            Granularity::Week => "weekly",
            Granularity::Month => "monthly",
            Granularity::Year => "yearly",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = AnalyticsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Granularity::Day),
            "week" => Ok(Granularity::Week),
            "month" => Ok(Granularity::Month),
            "year" => Ok(Granularity::Year),
            _ => Err(AnalyticsError::UnknownGranularity(value.to_string())),
        }
    }
}

/// Opaque bucket identifier: `YYYY-MM-DD`, `YYYY-W##`, `YYYY-MM` or `YYYY`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BucketKey(String);

impl BucketKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn bucket_key(date: NaiveDate, granularity: Granularity) -> BucketKey {
    let key = match granularity {
        Granularity::Day => date.format("%Y-%m-%d").to_string(),
        Granularity::Week => {
            let week = date.iso_week();
            format!("{:04}-W{:02}", week.year(), week.week())
        }
        Granularity::Month => date.format("%Y-%m").to_string(),
        Granularity::Year => format!("{:04}", date.year()),
    };
    BucketKey(key)
}

/// First day of the bucket containing `date`.
pub fn bucket_start(date: NaiveDate, granularity: Granularity) -> NaiveDate {
    match granularity {
        Granularity::Day => date,
        Granularity::Week => date
            .checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_monday())))
            .unwrap_or(date),
        Granularity::Month => NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date),
        Granularity::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
    }
}

/// Advances a bucket start by one unit. `None` once the calendar runs out.
fn next_bucket_start(start: NaiveDate, granularity: Granularity) -> Option<NaiveDate> {
    match granularity {
        Granularity::Day => start.checked_add_days(Days::new(1)),
        Granularity::Week => start.checked_add_days(Days::new(7)),
        Granularity::Month => start.checked_add_months(Months::new(1)),
        Granularity::Year => start.checked_add_months(Months::new(12)),
    }
}

/// Every bucket key whose span intersects `[start, end]`, oldest first.
///
/// An inverted range (`end < start`) yields the single bucket containing
/// `start`; callers that want to reject such ranges validate them up front
/// with [`crate::filter::DateRange`].
pub fn enumerate_buckets(start: NaiveDate, end: NaiveDate, granularity: Granularity) -> Vec<BucketKey> {
    let mut keys = Vec::new();
    let mut cursor = bucket_start(start, granularity);

    loop {
        keys.push(bucket_key(cursor, granularity));
        match next_bucket_start(cursor, granularity) {
            Some(next) if next > cursor && next <= end => cursor = next,
            _ => break,
        }
    }

    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn strings(keys: &[BucketKey]) -> Vec<&str> {
        keys.iter().map(BucketKey::as_str).collect()
    }

    #[test]
    fn keys_follow_granularity_formats() {
        let day = date(2024, 3, 7);
        assert_eq!(bucket_key(day, Granularity::Day).as_str(), "2024-03-07");
        assert_eq!(bucket_key(day, Granularity::Week).as_str(), "2024-W10");
        assert_eq!(bucket_key(day, Granularity::Month).as_str(), "2024-03");
        assert_eq!(bucket_key(day, Granularity::Year).as_str(), "2024");
    }

    #[test]
    fn week_keys_use_iso_week_year_at_boundaries() {
        assert_eq!(bucket_key(date(2021, 1, 1), Granularity::Week).as_str(), "2020-W53");
        assert_eq!(bucket_key(date(2020, 12, 31), Granularity::Week).as_str(), "2020-W53");
        assert_eq!(bucket_key(date(2021, 1, 4), Granularity::Week).as_str(), "2021-W01");
        assert_eq!(bucket_key(date(2024, 12, 30), Granularity::Week).as_str(), "2025-W01");
    }

    #[test]
    fn bucket_start_normalizes_to_first_day() {
        let day = date(2024, 2, 29);
        assert_eq!(bucket_start(day, Granularity::Day), day);
        assert_eq!(bucket_start(day, Granularity::Week), date(2024, 2, 26));
        assert_eq!(bucket_start(day, Granularity::Month), date(2024, 2, 1));
        assert_eq!(bucket_start(day, Granularity::Year), date(2024, 1, 1));
    }

    #[test]
    fn single_day_range_yields_one_bucket_for_every_granularity() {
        let day = date(2024, 5, 17);
        for granularity in Granularity::ALL {
            let keys = enumerate_buckets(day, day, granularity);
            assert_eq!(keys.len(), 1, "{granularity}");
            assert_eq!(keys[0], bucket_key(day, granularity));
        }
    }

    #[test]
    fn day_range_covers_leap_day() {
        let keys = enumerate_buckets(date(2024, 2, 27), date(2024, 3, 1), Granularity::Day);
        assert_eq!(
            strings(&keys),
            vec!["2024-02-27", "2024-02-28", "2024-02-29", "2024-03-01"]
        );
    }

    #[test]
    fn month_range_includes_partial_months_at_both_ends() {
        let keys = enumerate_buckets(date(2024, 1, 31), date(2024, 3, 1), Granularity::Month);
        assert_eq!(strings(&keys), vec!["2024-01", "2024-02", "2024-03"]);
    }

    #[test]
    fn week_range_crosses_iso_year() {
        let keys = enumerate_buckets(date(2024, 12, 25), date(2025, 1, 8), Granularity::Week);
        assert_eq!(strings(&keys), vec!["2024-W52", "2025-W01", "2025-W02"]);
    }

    #[test]
    fn year_range_counts_calendar_years() {
        let keys = enumerate_buckets(date(2022, 11, 1), date(2024, 2, 1), Granularity::Year);
        assert_eq!(strings(&keys), vec!["2022", "2023", "2024"]);
    }

    #[test]
    fn inverted_range_returns_bucket_of_start() {
        let keys = enumerate_buckets(date(2024, 6, 10), date(2024, 1, 1), Granularity::Day);
        assert_eq!(strings(&keys), vec!["2024-06-10"]);
    }

    #[test]
    fn enumeration_is_sorted_and_unique() {
        let start = date(2019, 12, 20);
        let end = date(2021, 1, 15);
        for granularity in Granularity::ALL {
            let keys = enumerate_buckets(start, end, granularity);
            assert!(!keys.is_empty());
            assert!(
                keys.windows(2).all(|pair| pair[0] < pair[1]),
                "{granularity} keys not strictly increasing"
            );
        }
    }

    #[test]
    fn granularity_parses_known_names_only() {
        assert_eq!("Week".parse::<Granularity>(), Ok(Granularity::Week));
        assert!(matches!(
            "quarter".parse::<Granularity>(),
            Err(AnalyticsError::UnknownGranularity(_))
        ));
    }
}

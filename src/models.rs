use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum ActivityType {
    Own,
    Support,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Own => "own",
            ActivityType::Support => "support",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = AnalyticsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "own" => Ok(ActivityType::Own),
            "support" => Ok(ActivityType::Support),
            _ => Err(AnalyticsError::UnknownActivityType(value.to_string())),
        }
    }
}

impl TryFrom<String> for ActivityType {
    type Error = AnalyticsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum CostType {
    Actual,
    Budget,
}

impl CostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CostType::Actual => "actual",
            CostType::Budget => "budget",
        }
    }
}

impl fmt::Display for CostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CostType {
    type Err = AnalyticsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "actual" => Ok(CostType::Actual),
            "budget" => Ok(CostType::Budget),
            _ => Err(AnalyticsError::UnknownCostType(value.to_string())),
        }
    }
}

impl TryFrom<String> for CostType {
    type Error = AnalyticsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Hours logged by one person against a lab (and optionally a project) on a
/// single day. Support activities name the lab that received the help.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityRecord {
    pub id: i64,
    pub personnel_id: i64,
    pub personnel_name: String,
    pub lab_id: i64,
    pub lab_name: String,
    pub project_id: Option<i64>,
    pub activity_date: NaiveDate,
    pub hours: f64,
    pub activity_type: ActivityType,
    pub supported_lab_id: Option<i64>,
    pub supported_lab_name: Option<String>,
    pub description: Option<String>,
}

impl ActivityRecord {
    /// Target lab of a support activity, if it names a non-empty one.
    pub fn support_target(&self) -> Option<&str> {
        if self.activity_type != ActivityType::Support {
            return None;
        }
        self.supported_lab_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Logged hours must be finite and strictly positive.
pub fn valid_hours(hours: f64) -> bool {
    hours.is_finite() && hours > 0.0
}

/// Cost amounts must be finite and non-negative.
pub fn valid_amount(amount: f64) -> bool {
    amount.is_finite() && amount >= 0.0
}

#[derive(Debug, Clone, Serialize)]
pub struct CostRecord {
    pub id: i64,
    pub lab_id: i64,
    pub lab_name: String,
    pub project_id: Option<i64>,
    pub cost_date: NaiveDate,
    pub amount: f64,
    pub cost_type: CostType,
    pub category: Option<String>,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_type_parses_case_insensitively() {
        assert_eq!("SUPPORT".parse::<ActivityType>(), Ok(ActivityType::Support));
        assert_eq!(" own ".parse::<ActivityType>(), Ok(ActivityType::Own));
        assert!(matches!(
            "helping".parse::<ActivityType>(),
            Err(AnalyticsError::UnknownActivityType(_))
        ));
    }

    #[test]
    fn cost_type_round_trips_wire_names() {
        for cost_type in [CostType::Actual, CostType::Budget] {
            assert_eq!(cost_type.as_str().parse::<CostType>(), Ok(cost_type));
        }
        assert_eq!(serde_json::to_string(&CostType::Budget).unwrap(), "\"budget\"");
        let parsed: CostType = serde_json::from_str("\"Actual\"").unwrap();
        assert_eq!(parsed, CostType::Actual);
    }

    #[test]
    fn support_target_requires_support_type_and_name() {
        let mut record = ActivityRecord {
            id: 1,
            personnel_id: 7,
            personnel_name: "Kim".to_string(),
            lab_id: 1,
            lab_name: "AFL".to_string(),
            project_id: None,
            activity_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            hours: 2.0,
            activity_type: ActivityType::Own,
            supported_lab_id: Some(5),
            supported_lab_name: Some("CSL".to_string()),
            description: None,
        };
        assert_eq!(record.support_target(), None);

        record.activity_type = ActivityType::Support;
        assert_eq!(record.support_target(), Some("CSL"));

        record.supported_lab_name = Some("   ".to_string());
        assert_eq!(record.support_target(), None);
    }

    #[test]
    fn hours_must_be_finite_and_positive() {
        assert!(valid_hours(0.5));
        assert!(!valid_hours(0.0));
        assert!(!valid_hours(-1.0));
        assert!(!valid_hours(f64::INFINITY));
        let parsed: f64 = "NaN".parse().unwrap();
        assert!(!valid_hours(parsed));
    }

    #[test]
    fn amounts_must_be_finite_and_non_negative() {
        assert!(valid_amount(0.0));
        assert!(valid_amount(1_250_000.5));
        assert!(!valid_amount(-0.01));
        assert!(!valid_amount(f64::NAN));
        assert!(!valid_amount(f64::NEG_INFINITY));
    }
}

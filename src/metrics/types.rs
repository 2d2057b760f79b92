/// Metric type definitions
///
/// Deployment records are the raw input; reports are per-day DORA series
/// (deployment frequency, lead time, change failure rate, time to restore)
/// over a resolved date range.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Date format used on the wire and in storage
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One deployment of a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub id: i64,
    pub project_id: i64,
    pub deployed_on: NaiveDate,
    /// Hours from first commit to production
    pub lead_time_hours: f64,
    /// Whether the deployment caused a failure in production
    pub failed: bool,
    /// Hours needed to restore service after a failed deployment
    pub restore_hours: Option<f64>,
}

/// Request body for deployment ingestion
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeploymentRequest {
    pub project_id: i64,
    pub deployed_on: NaiveDate,
    pub lead_time_hours: f64,
    #[serde(default)]
    pub failed: bool,
    pub restore_hours: Option<f64>,
}

/// Dashboard panel / report series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricKind {
    DeploymentFrequency,
    LeadTime,
    ChangeFailureRate,
    TimeToRestore,
}

impl MetricKind {
    pub const ALL: [MetricKind; 4] = [
        MetricKind::DeploymentFrequency,
        MetricKind::LeadTime,
        MetricKind::ChangeFailureRate,
        MetricKind::TimeToRestore,
    ];
}

/// Inclusive date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Requested reporting window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    Last7Days,
    Last30Days,
    Last90Days,
    ThisYear,
    Custom { start: NaiveDate, end: NaiveDate },
}

/// Why a time range could not be understood
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    #[error("Unknown time range '{0}': expected last7days, last30days, last90days, thisYear or custom")]
    UnknownPreset(String),
    #[error("Custom time ranges need both startDate and endDate")]
    MissingCustomDates,
    #[error("Time range '{0}' cannot be combined with startDate/endDate")]
    Conflicting(String),
    #[error("Invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("startDate {start} is after endDate {end}")]
    Inverted { start: NaiveDate, end: NaiveDate },
}

impl TimeRange {
    /// Preset by wire name
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "last7days" => Some(Self::Last7Days),
            "last30days" => Some(Self::Last30Days),
            "last90days" => Some(Self::Last90Days),
            "thisYear" => Some(Self::ThisYear),
            _ => None,
        }
    }

    /// Wire name of the range
    pub fn name(&self) -> &'static str {
        match self {
            Self::Last7Days => "last7days",
            Self::Last30Days => "last30days",
            Self::Last90Days => "last90days",
            Self::ThisYear => "thisYear",
            Self::Custom { .. } => "custom",
        }
    }

    /// Interpret the `timeRange`, `startDate` and `endDate` query parameters
    ///
    /// Dates imply a custom range; without any parameter the fallback applies.
    pub fn from_query(
        time_range: Option<&str>,
        start_date: Option<&str>,
        end_date: Option<&str>,
        fallback: TimeRange,
    ) -> Result<Self, RangeError> {
        let time_range = time_range.map(str::trim).filter(|value| !value.is_empty());

        if start_date.is_some() || end_date.is_some() {
            if let Some(name) = time_range {
                if name != "custom" {
                    return Err(RangeError::Conflicting(name.to_string()));
                }
            }
            let (Some(start), Some(end)) = (start_date, end_date) else {
                return Err(RangeError::MissingCustomDates);
            };
            let start = parse_date(start)?;
            let end = parse_date(end)?;
            if start > end {
                return Err(RangeError::Inverted { start, end });
            }
            return Ok(Self::Custom { start, end });
        }

        match time_range {
            None => Ok(fallback),
            Some("custom") => Err(RangeError::MissingCustomDates),
            Some(name) => Self::preset(name).ok_or_else(|| RangeError::UnknownPreset(name.to_string())),
        }
    }

    /// Concrete inclusive dates, presets ending on `today`
    pub fn resolve(&self, today: NaiveDate) -> DateRange {
        let days_back = |days: i64| DateRange {
            start: today - Duration::days(days - 1),
            end: today,
        };
        match *self {
            Self::Last7Days => days_back(7),
            Self::Last30Days => days_back(30),
            Self::Last90Days => days_back(90),
            Self::ThisYear => DateRange {
                start: today.with_ordinal(1).unwrap_or(today),
                end: today,
            },
            Self::Custom { start, end } => DateRange { start, end },
        }
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::Last30Days
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, RangeError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| RangeError::InvalidDate(value.to_string()))
}

/// Deployments on one day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountPoint {
    pub date: NaiveDate,
    pub count: u32,
}

/// Average duration on one day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoursPoint {
    pub date: NaiveDate,
    pub hours: f64,
}

/// Share of failed deployments on one day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PercentagePoint {
    pub date: NaiveDate,
    pub percentage: f64,
}

/// Totals over the whole range
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSummary {
    pub total_deployments: u64,
    pub average_lead_time_hours: Option<f64>,
    pub change_failure_percentage: Option<f64>,
    pub average_time_to_restore_hours: Option<f64>,
}

/// Customer-scoped DORA report
///
/// Series that were not requested (dashboard panels) are omitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    pub customer_id: String,
    pub range: DateRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
    pub summary: MetricsSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_frequency: Option<Vec<CountPoint>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_time: Option<Vec<HoursPoint>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_failure_rate: Option<Vec<PercentagePoint>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_to_restore: Option<Vec<HoursPoint>>,
}

impl MetricsReport {
    /// Drop every series not listed in `panels`
    pub fn retain_panels(&mut self, panels: &[MetricKind]) {
        if !panels.contains(&MetricKind::DeploymentFrequency) {
            self.deployment_frequency = None;
        }
        if !panels.contains(&MetricKind::LeadTime) {
            self.lead_time = None;
        }
        if !panels.contains(&MetricKind::ChangeFailureRate) {
            self.change_failure_rate = None;
        }
        if !panels.contains(&MetricKind::TimeToRestore) {
            self.time_to_restore = None;
        }
    }
}

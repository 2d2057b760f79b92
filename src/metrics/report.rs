/// DORA metric aggregation
///
/// Folds deployment records into sparse per-day series. Days without
/// deployments are absent; time to restore only lists days with restored failures.

use crate::metrics::types::{
    CountPoint, DateRange, Deployment, HoursPoint, MetricsReport, MetricsSummary, PercentagePoint,
};
use chrono::NaiveDate;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
struct DayTotals {
    deployments: u32,
    failures: u32,
    lead_time_hours: f64,
    restore_hours: f64,
    restores: u32,
}

/// Build a report from deployments; records outside `range` are ignored
pub fn build_report(
    customer_id: &str,
    range: DateRange,
    project_id: Option<i64>,
    deployments: &[Deployment],
) -> MetricsReport {
    let mut days: BTreeMap<NaiveDate, DayTotals> = BTreeMap::new();
    for deployment in deployments.iter().filter(|d| range.contains(d.deployed_on)) {
        let day = days.entry(deployment.deployed_on).or_default();
        day.deployments += 1;
        day.lead_time_hours += deployment.lead_time_hours;
        if deployment.failed {
            day.failures += 1;
            if let Some(hours) = deployment.restore_hours {
                day.restore_hours += hours;
                day.restores += 1;
            }
        }
    }

    let mut frequency = Vec::with_capacity(days.len());
    let mut lead_time = Vec::with_capacity(days.len());
    let mut failure_rate = Vec::with_capacity(days.len());
    let mut time_to_restore = Vec::new();
    let mut total = DayTotals::default();

    for (date, day) in &days {
        frequency.push(CountPoint { date: *date, count: day.deployments });
        lead_time.push(HoursPoint {
            date: *date,
            hours: round2(day.lead_time_hours / f64::from(day.deployments)),
        });
        failure_rate.push(PercentagePoint {
            date: *date,
            percentage: round2(percentage(day.failures, day.deployments)),
        });
        if day.restores > 0 {
            time_to_restore.push(HoursPoint {
                date: *date,
                hours: round2(day.restore_hours / f64::from(day.restores)),
            });
        }

        total.deployments += day.deployments;
        total.failures += day.failures;
        total.lead_time_hours += day.lead_time_hours;
        total.restore_hours += day.restore_hours;
        total.restores += day.restores;
    }

    let summary = MetricsSummary {
        total_deployments: u64::from(total.deployments),
        average_lead_time_hours: (total.deployments > 0)
            .then(|| round2(total.lead_time_hours / f64::from(total.deployments))),
        change_failure_percentage: (total.deployments > 0)
            .then(|| round2(percentage(total.failures, total.deployments))),
        average_time_to_restore_hours: (total.restores > 0)
            .then(|| round2(total.restore_hours / f64::from(total.restores))),
    };

    MetricsReport {
        customer_id: customer_id.to_string(),
        range,
        project_id,
        summary,
        deployment_frequency: Some(frequency),
        lead_time: Some(lead_time),
        change_failure_rate: Some(failure_rate),
        time_to_restore: Some(time_to_restore),
    }
}

fn percentage(part: u32, whole: u32) -> f64 {
    f64::from(part) * 100.0 / f64::from(whole)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

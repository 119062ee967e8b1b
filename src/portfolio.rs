use std::collections::BTreeMap;

use crate::diff;
use crate::kpi::rounded_ratio;
use crate::models::{AdvisorKpi, Claim, ComparedClaim, ComparisonStatus, HistoryPoint, MonthlyPoint};
use crate::sla;

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardStats {
    pub new: usize,
    pub closed: usize,
    pub stagnant: usize,
    pub in_progress: usize,
    pub avg_inactivity: u32,
    pub closed_percent: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgingBucket {
    pub label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ManagementMetrics {
    pub active: usize,
    pub change_percent: i64,
    pub new: usize,
    pub closed: usize,
    pub throughput: f64,
    pub stagnant_percent: u32,
    pub top_closer: Option<String>,
    pub has_previous: bool,
}

pub fn open_portfolio<'a>(
    compared: &'a [ComparedClaim],
    advisor: Option<&str>,
) -> Vec<&'a ComparedClaim> {
    compared
        .iter()
        .filter(|entry| entry.is_open())
        .filter(|entry| advisor.map_or(true, |name| entry.claim.advisor == name))
        .collect()
}

fn count_status(entries: &[&ComparedClaim], status: ComparisonStatus) -> usize {
    entries.iter().filter(|entry| entry.comparison == status).count()
}

/// `open` is the (possibly filtered) open portfolio; closures are always
/// counted over the full comparison.
pub fn dashboard(open: &[&ComparedClaim], full: &[ComparedClaim]) -> DashboardStats {
    let closed = full
        .iter()
        .filter(|entry| entry.comparison == ComparisonStatus::Closed)
        .count();
    let total_inactivity: u64 = open
        .iter()
        .map(|entry| u64::from(entry.claim.inactivity_days))
        .sum();

    DashboardStats {
        new: count_status(open, ComparisonStatus::New),
        closed,
        stagnant: count_status(open, ComparisonStatus::Stagnant),
        in_progress: count_status(open, ComparisonStatus::InProgressChanged),
        avg_inactivity: rounded_ratio(total_inactivity as f64, open.len()),
        closed_percent: rounded_ratio(closed as f64 * 100.0, full.len().max(1)),
    }
}

pub fn aging_buckets(open: &[&ComparedClaim]) -> Vec<AgingBucket> {
    let bucket = |label: &'static str, range: std::ops::RangeInclusive<u32>| AgingBucket {
        label,
        count: open
            .iter()
            .filter(|entry| range.contains(&entry.claim.inactivity_days))
            .count(),
    };

    vec![
        bucket("0-7 days", 0..=7),
        bucket("8-14 days", 8..=14),
        bucket("15-30 days", 15..=30),
        bucket("30+ days", 31..=u32::MAX),
    ]
}

pub fn management(
    open: &[&ComparedClaim],
    full: &[ComparedClaim],
    previous_size: usize,
    kpis: &[AdvisorKpi],
) -> ManagementMetrics {
    let active = open.len();
    let count_full = |status: ComparisonStatus| {
        full.iter()
            .filter(|entry| entry.comparison == status)
            .count()
    };
    let new = count_full(ComparisonStatus::New);
    let closed = count_full(ComparisonStatus::Closed);
    let stagnant = count_full(ComparisonStatus::Stagnant);

    let change_percent = if previous_size > 0 {
        let change = (active as f64 - previous_size as f64) / previous_size as f64 * 100.0;
        (change + 0.5).floor() as i64
    } else {
        0
    };
    let throughput = if new > 0 {
        closed as f64 / new as f64
    } else {
        closed as f64
    };

    ManagementMetrics {
        active,
        change_percent,
        new,
        closed,
        throughput,
        stagnant_percent: rounded_ratio(stagnant as f64 * 100.0, active),
        top_closer: kpis.first().map(|kpi| kpi.name.clone()),
        has_previous: previous_size > 0,
    }
}

/// One point per calendar month, taken from the latest import in that month.
pub fn monthly_trend(history: &[Claim]) -> Vec<MonthlyPoint> {
    let mut latest_per_month = BTreeMap::new();
    for date in diff::import_dates(history).into_iter().rev() {
        latest_per_month.insert(date.format("%Y-%m").to_string(), date);
    }

    latest_per_month
        .into_iter()
        .map(|(month, snapshot)| {
            let claims: Vec<&Claim> = history
                .iter()
                .filter(|claim| claim.import_date == snapshot)
                .collect();
            let volume = claims.len();
            let overdue = claims
                .iter()
                .filter(|claim| sla::is_overdue(claim.inactivity_days))
                .count();
            let total_inactivity: u64 = claims
                .iter()
                .map(|claim| u64::from(claim.inactivity_days))
                .sum();
            let efficiency = if volume > 0 {
                let share = 100.0 - overdue as f64 / volume as f64 * 100.0;
                (share + 0.5).floor() as u32
            } else {
                0
            };

            MonthlyPoint {
                month,
                snapshot,
                volume,
                avg_inactivity: rounded_ratio(total_inactivity as f64, volume),
                efficiency,
            }
        })
        .collect()
}

pub fn history_trend(history: &[Claim]) -> Vec<HistoryPoint> {
    diff::import_dates(history)
        .into_iter()
        .rev()
        .map(|date| HistoryPoint {
            date,
            count: history.iter().filter(|claim| claim.import_date == date).count(),
        })
        .collect()
}

use crate::models::{AdvisorKpi, ComparedClaim, ComparisonStatus};
use crate::sla;

/// Per-advisor scorecard for one comparison window, best closers first.
/// Advisors with equal closed counts keep the order in which they were
/// first seen.
pub fn aggregate(compared: &[ComparedClaim]) -> Vec<AdvisorKpi> {
    let mut advisors: Vec<&str> = Vec::new();
    for entry in compared {
        if !advisors.contains(&entry.claim.advisor.as_str()) {
            advisors.push(entry.claim.advisor.as_str());
        }
    }

    let mut kpis: Vec<AdvisorKpi> = advisors
        .into_iter()
        .map(|name| advisor_kpi(name, compared))
        .collect();

    kpis.sort_by(|a, b| b.closed_count.cmp(&a.closed_count));
    kpis
}

fn advisor_kpi(name: &str, compared: &[ComparedClaim]) -> AdvisorKpi {
    let mine: Vec<&ComparedClaim> = compared
        .iter()
        .filter(|entry| entry.claim.advisor == name)
        .collect();
    let open: Vec<&ComparedClaim> = mine.iter().copied().filter(|entry| entry.is_open()).collect();

    let closed_count = mine.len() - open.len();
    let new_count = open
        .iter()
        .filter(|entry| entry.comparison == ComparisonStatus::New)
        .count();
    let stagnant_count = open
        .iter()
        .filter(|entry| sla::is_overdue(entry.claim.inactivity_days))
        .count();
    let total_age: u64 = open.iter().map(|entry| u64::from(entry.claim.age)).sum();

    AdvisorKpi {
        name: name.to_string(),
        open_count: open.len(),
        closed_count,
        new_count,
        stagnant_count,
        avg_age: rounded_ratio(total_age as f64, open.len()),
        overdue_percent: rounded_ratio(stagnant_count as f64 * 100.0, open.len()),
    }
}

pub(crate) fn rounded_ratio(numerator: f64, count: usize) -> u32 {
    if count == 0 {
        return 0;
    }
    (numerator / count as f64 + 0.5).floor() as u32
}

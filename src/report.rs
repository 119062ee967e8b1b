use std::fmt::Write;

use crate::diff::{self, Window};
use crate::kpi;
use crate::models::Claim;
use crate::portfolio;
use crate::recommend;

const TASK_LIMIT: usize = 10;

pub fn build_report(history: &[Claim], window: Window, advisor: Option<&str>) -> String {
    let compared = diff::compare(history, window);
    let open = portfolio::open_portfolio(&compared, advisor);
    let kpis = kpi::aggregate(&compared);
    let previous_size = window
        .previous
        .map(|date| diff::snapshot(history, date).len())
        .unwrap_or(0);

    let stats = portfolio::dashboard(&open, &compared);
    let metrics = portfolio::management(&open, &compared, previous_size, &kpis);
    let aging = portfolio::aging_buckets(&open);
    let tasks = recommend::task_list(&open);
    let months = portfolio::monthly_trend(history);
    let trend = portfolio::history_trend(history);

    let mut output = String::new();
    let scope = advisor.unwrap_or("all advisors");
    let baseline = window
        .previous
        .map(|date| date.to_string())
        .unwrap_or_else(|| "no earlier snapshot".to_string());

    let _ = writeln!(output, "# Claims Portfolio Report");
    let _ = writeln!(
        output,
        "Generated for {} (snapshot {} compared with {})",
        scope, window.current, baseline
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Portfolio Movement");
    let _ = writeln!(output, "- New: {}", stats.new);
    let _ = writeln!(
        output,
        "- Closed: {} ({}% of compared claims)",
        stats.closed, stats.closed_percent
    );
    let _ = writeln!(output, "- In progress (changed): {}", stats.in_progress);
    let _ = writeln!(output, "- Unchanged since last snapshot: {}", stats.stagnant);
    let _ = writeln!(output, "- Average inactivity: {} days", stats.avg_inactivity);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Management Summary");
    if metrics.has_previous {
        let _ = writeln!(
            output,
            "- Active claims: {} ({:+}% vs previous snapshot)",
            metrics.active, metrics.change_percent
        );
    } else {
        let _ = writeln!(output, "- Active claims: {}", metrics.active);
    }
    let _ = writeln!(
        output,
        "- Throughput (closed per new): {:.2} ({} closed, {} new)",
        metrics.throughput, metrics.closed, metrics.new
    );
    let _ = writeln!(output, "- Unchanged share of active: {}%", metrics.stagnant_percent);
    let _ = writeln!(
        output,
        "- Top closer: {}",
        metrics.top_closer.as_deref().unwrap_or("no data")
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Inactivity Aging");
    for bucket in aging.iter() {
        let _ = writeln!(output, "- {}: {}", bucket.label, bucket.count);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Advisor Scorecard");
    if kpis.is_empty() {
        let _ = writeln!(output, "No claims in this window.");
    } else {
        let _ = writeln!(output, "| Advisor | Open | New | Overdue | Closed | Avg age | On time |");
        let _ = writeln!(output, "|---|---|---|---|---|---|---|");
        for kpi in kpis.iter() {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} | {} | {} | {}% |",
                kpi.name,
                kpi.open_count,
                kpi.new_count,
                kpi.stagnant_count,
                kpi.closed_count,
                kpi.avg_age,
                100u32.saturating_sub(kpi.overdue_percent)
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Priority Tasks");
    let pending: Vec<_> = tasks.iter().filter(|task| task.is_pending()).collect();
    if pending.is_empty() {
        let _ = writeln!(output, "No open tasks.");
    } else {
        for task in pending.iter().take(TASK_LIMIT) {
            let claim = &task.entry.claim;
            let _ = writeln!(
                output,
                "- {} ({}, {} days idle) [{}] {}: {}",
                claim.claim_number,
                claim.advisor,
                claim.inactivity_days,
                task.recommendation.priority.as_str(),
                task.recommendation.label,
                task.recommendation.explanation
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Month over Month");
    if months.is_empty() {
        let _ = writeln!(output, "No snapshots recorded.");
    } else {
        for month in months.iter() {
            let _ = writeln!(
                output,
                "- {} (snapshot {}): {} claims, avg inactivity {} days, efficiency {}%",
                month.month, month.snapshot, month.volume, month.avg_inactivity, month.efficiency
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Snapshot History");
    for point in trend.iter() {
        let _ = writeln!(output, "- {}: {} claims", point.date, point.count);
    }

    output
}

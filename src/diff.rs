use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use log::warn;

use crate::models::{Claim, ComparedClaim, ComparisonStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub current: NaiveDate,
    pub previous: Option<NaiveDate>,
}

pub fn import_dates(history: &[Claim]) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = history
        .iter()
        .map(|claim| claim.import_date)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    dates.sort_by(|a, b| b.cmp(a));
    dates
}

/// Resolves the comparison window, defaulting to the two latest imports.
/// A requested date that was never imported falls back to the default.
/// Returns `None` when the history is empty.
pub fn resolve_window(
    history: &[Claim],
    current: Option<NaiveDate>,
    previous: Option<NaiveDate>,
) -> Option<Window> {
    let dates = import_dates(history);
    let latest = dates.first().copied()?;

    let current = match current {
        Some(date) if dates.contains(&date) => date,
        Some(date) => {
            warn!("no snapshot imported on {date}, using latest {latest}");
            latest
        }
        None => latest,
    };
    let default_previous = dates.iter().copied().find(|date| *date < current);
    let previous = match previous {
        Some(date) if dates.contains(&date) => Some(date),
        Some(date) => {
            warn!("no snapshot imported on {date}, comparing with the one before {current}");
            default_previous
        }
        None => default_previous,
    };

    Some(Window { current, previous })
}

pub fn snapshot(history: &[Claim], date: NaiveDate) -> Vec<Claim> {
    history
        .iter()
        .filter(|claim| claim.import_date == date)
        .cloned()
        .collect()
}

/// Compares two snapshots claim by claim. Every claim number present in
/// either input appears exactly once in the output, previous snapshot
/// order first, then claims seen only in the current one.
pub fn diff(current: &[Claim], previous: &[Claim]) -> Vec<ComparedClaim> {
    let current_by_number: HashMap<&str, &Claim> = current
        .iter()
        .map(|claim| (claim.claim_number.as_str(), claim))
        .collect();
    let previous_by_number: HashMap<&str, &Claim> = previous
        .iter()
        .map(|claim| (claim.claim_number.as_str(), claim))
        .collect();

    let mut seen = HashSet::new();
    let numbers: Vec<&str> = previous
        .iter()
        .chain(current.iter())
        .map(|claim| claim.claim_number.as_str())
        .filter(|number| seen.insert(*number))
        .collect();

    numbers
        .into_iter()
        .filter_map(|number| {
            match (current_by_number.get(number), previous_by_number.get(number)) {
                (Some(curr), None) => Some(compared(curr, ComparisonStatus::New)),
                (None, Some(prev)) => Some(compared(prev, ComparisonStatus::Closed)),
                (Some(curr), Some(prev)) => {
                    let changed = curr.last_action_date != prev.last_action_date
                        || curr.status != prev.status;
                    let status = if changed {
                        ComparisonStatus::InProgressChanged
                    } else {
                        ComparisonStatus::Stagnant
                    };
                    Some(compared(curr, status))
                }
                (None, None) => None,
            }
        })
        .collect()
}

pub fn compare(history: &[Claim], window: Window) -> Vec<ComparedClaim> {
    let current = snapshot(history, window.current);
    let previous = window
        .previous
        .map(|date| snapshot(history, date))
        .unwrap_or_default();
    diff(&current, &previous)
}

fn compared(claim: &Claim, comparison: ComparisonStatus) -> ComparedClaim {
    ComparedClaim {
        claim: claim.clone(),
        comparison,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, day).unwrap()
    }

    fn claim(import_date: NaiveDate, number: &str, status: &str, last_action_day: u32) -> Claim {
        let last_action = date(last_action_day).and_hms_opt(12, 0, 0).unwrap();
        Claim {
            id: Claim::snapshot_id(import_date, number),
            claim_number: number.to_string(),
            open_date: last_action - Duration::days(10),
            last_action_date: last_action,
            import_date,
            status: status.to_string(),
            advisor: "Piotr Zieliński".to_string(),
            age: 10,
            inactivity_days: 2,
            priority: 20,
            last_comment: None,
            recommendation_status: None,
        }
    }

    fn status_of(result: &[ComparedClaim], number: &str) -> ComparisonStatus {
        result
            .iter()
            .find(|c| c.claim.claim_number == number)
            .map(|c| c.comparison)
            .unwrap()
    }

    #[test]
    fn classifies_each_transition() {
        let prev = vec![
            claim(date(1), "A200", "Naprawa", 1),
            claim(date(1), "A300", "Naprawa", 1),
            claim(date(1), "A400", "Naprawa", 1),
            claim(date(1), "A500", "Naprawa", 1),
        ];
        let curr = vec![
            claim(date(8), "A100", "Nowe", 8),
            claim(date(8), "A300", "Naprawa", 1),
            claim(date(8), "A400", "Kosztorys", 1),
            claim(date(8), "A500", "Naprawa", 6),
        ];

        let result = diff(&curr, &prev);
        assert_eq!(result.len(), 5);
        assert_eq!(status_of(&result, "A100"), ComparisonStatus::New);
        assert_eq!(status_of(&result, "A200"), ComparisonStatus::Closed);
        assert_eq!(status_of(&result, "A300"), ComparisonStatus::Stagnant);
        assert_eq!(status_of(&result, "A400"), ComparisonStatus::InProgressChanged);
        assert_eq!(status_of(&result, "A500"), ComparisonStatus::InProgressChanged);
    }

    #[test]
    fn closed_claims_keep_last_known_record() {
        let prev = vec![claim(date(1), "A200", "Naprawa", 1)];
        let result = diff(&[], &prev);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].claim.import_date, date(1));
        assert!(!result[0].is_open());
    }

    #[test]
    fn present_in_both_emits_current_record() {
        let prev = vec![claim(date(1), "A300", "Naprawa", 1)];
        let curr = vec![claim(date(8), "A300", "Naprawa", 1)];
        let result = diff(&curr, &prev);
        assert_eq!(result[0].claim.id, Claim::snapshot_id(date(8), "A300"));
    }

    #[test]
    fn every_claim_number_appears_once() {
        let prev = vec![
            claim(date(1), "B1", "x", 1),
            claim(date(1), "B2", "x", 1),
        ];
        let curr = vec![
            claim(date(8), "B2", "x", 1),
            claim(date(8), "B3", "x", 1),
        ];
        let numbers: Vec<String> = diff(&curr, &prev)
            .into_iter()
            .map(|c| c.claim.claim_number)
            .collect();
        assert_eq!(numbers, vec!["B1", "B2", "B3"]);
    }

    #[test]
    fn empty_inputs_yield_nothing() {
        assert!(diff(&[], &[]).is_empty());
    }

    #[test]
    fn window_defaults_to_latest_two_imports() {
        let history = vec![
            claim(date(1), "A1", "x", 1),
            claim(date(8), "A1", "x", 1),
            claim(date(15), "A1", "x", 1),
        ];
        assert_eq!(import_dates(&history), vec![date(15), date(8), date(1)]);

        let window = resolve_window(&history, None, None).unwrap();
        assert_eq!(window.current, date(15));
        assert_eq!(window.previous, Some(date(8)));

        let pinned = resolve_window(&history, Some(date(8)), None).unwrap();
        assert_eq!(pinned.previous, Some(date(1)));

        assert!(resolve_window(&[], None, None).is_none());
    }

    #[test]
    fn unknown_dates_fall_back_to_imported_ones() {
        let history = vec![claim(date(1), "A1", "x", 1), claim(date(8), "A1", "x", 1)];

        let window = resolve_window(&history, Some(date(9)), None).unwrap();
        assert_eq!(window.current, date(8));
        assert_eq!(window.previous, Some(date(1)));

        let window = resolve_window(&history, Some(date(8)), Some(date(3))).unwrap();
        assert_eq!(window.previous, Some(date(1)));

        let single = vec![claim(date(1), "A1", "x", 1)];
        let window = resolve_window(&single, Some(date(2)), None).unwrap();
        assert_eq!(
            window,
            Window {
                current: date(1),
                previous: None,
            }
        );
        let result = compare(&single, window);
        assert_eq!(status_of(&result, "A1"), ComparisonStatus::New);
    }

    #[test]
    fn single_snapshot_is_all_new() {
        let history = vec![claim(date(1), "A1", "x", 1), claim(date(1), "A2", "x", 1)];
        let window = resolve_window(&history, None, None).unwrap();
        assert_eq!(window.previous, None);
        let result = compare(&history, window);
        assert!(result.iter().all(|c| c.comparison == ComparisonStatus::New));
    }
}

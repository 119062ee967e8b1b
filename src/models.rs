use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    pub id: String,
    pub claim_number: String,
    pub open_date: NaiveDateTime,
    pub last_action_date: NaiveDateTime,
    pub import_date: NaiveDate,
    pub status: String,
    pub advisor: String,
    pub age: u32,
    pub inactivity_days: u32,
    pub priority: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation_status: Option<RecommendationStatus>,
}

impl Claim {
    pub fn snapshot_id(import_date: NaiveDate, claim_number: &str) -> String {
        format!("{import_date}-{claim_number}")
    }

    pub fn recommendation_status(&self) -> RecommendationStatus {
        self.recommendation_status.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonStatus {
    New,
    Closed,
    InProgressChanged,
    Stagnant,
}

impl ComparisonStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonStatus::New => "NEW",
            ComparisonStatus::Closed => "CLOSED",
            ComparisonStatus::InProgressChanged => "IN_PROGRESS_CHANGED",
            ComparisonStatus::Stagnant => "STAGNANT",
        }
    }
}

impl fmt::Display for ComparisonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecommendationStatus {
    #[default]
    Todo,
    Done,
    Skipped,
}

impl RecommendationStatus {
    pub fn cycle(self) -> Self {
        match self {
            RecommendationStatus::Todo => RecommendationStatus::Done,
            RecommendationStatus::Done => RecommendationStatus::Skipped,
            RecommendationStatus::Skipped => RecommendationStatus::Todo,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationStatus::Todo => "TODO",
            RecommendationStatus::Done => "DONE",
            RecommendationStatus::Skipped => "SKIPPED",
        }
    }
}

/// A claim placed in a comparison window. The status is never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparedClaim {
    pub claim: Claim,
    pub comparison: ComparisonStatus,
}

impl ComparedClaim {
    pub fn is_open(&self) -> bool {
        self.comparison != ComparisonStatus::Closed
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdvisorKpi {
    pub name: String,
    pub open_count: usize,
    pub closed_count: usize,
    pub new_count: usize,
    pub stagnant_count: usize,
    pub avg_age: u32,
    pub overdue_percent: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryPoint {
    pub date: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyPoint {
    pub month: String,
    pub snapshot: NaiveDate,
    pub volume: usize,
    pub avg_inactivity: u32,
    pub efficiency: u32,
}

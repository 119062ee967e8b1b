pub const WARNING_DAYS: u32 = 3;
pub const CRITICAL_DAYS: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlaLevel {
    Low,
    Medium,
    High,
}

impl SlaLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlaLevel::Low => "LOW",
            SlaLevel::Medium => "MEDIUM",
            SlaLevel::High => "HIGH",
        }
    }
}

pub fn classify(inactivity_days: u32) -> SlaLevel {
    match inactivity_days {
        d if d > CRITICAL_DAYS => SlaLevel::High,
        d if d >= WARNING_DAYS => SlaLevel::Medium,
        _ => SlaLevel::Low,
    }
}

/// Inactivity-based stagnation, independent of the snapshot comparison.
pub fn is_overdue(inactivity_days: u32) -> bool {
    inactivity_days > CRITICAL_DAYS
}

use crate::blocking::{self, BlockingReason};
use crate::models::{Claim, ComparedClaim, RecommendationStatus};
use crate::sla::{self, SlaLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionType {
    CallClient,
    CallWorkshop,
    SendReminder,
    Escalate,
    InternalChase,
    AssignTask,
    Wait,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::CallClient => "CALL_CLIENT",
            ActionType::CallWorkshop => "CALL_WORKSHOP",
            ActionType::SendReminder => "SEND_REMINDER",
            ActionType::Escalate => "ESCALATE",
            ActionType::InternalChase => "INTERNAL_CHASE",
            ActionType::AssignTask => "ASSIGN_TASK",
            ActionType::Wait => "WAIT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActionPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl ActionPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionPriority::Low => "LOW",
            ActionPriority::Medium => "MEDIUM",
            ActionPriority::High => "HIGH",
            ActionPriority::Critical => "CRITICAL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recommendation {
    pub action: ActionType,
    pub label: &'static str,
    pub explanation: &'static str,
    pub priority: ActionPriority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Facts {
    sla: SlaLevel,
    reason: BlockingReason,
}

impl Facts {
    fn of(claim: &Claim) -> Self {
        Self {
            sla: sla::classify(claim.inactivity_days),
            reason: blocking::infer(&claim.status, claim.last_comment.as_deref()),
        }
    }
}

/// `None` in a condition means "any".
struct Rule {
    sla: Option<SlaLevel>,
    reason: Option<BlockingReason>,
    recommendation: Recommendation,
}

impl Rule {
    fn matches(&self, facts: &Facts) -> bool {
        self.sla.map_or(true, |level| level == facts.sla)
            && self.reason.map_or(true, |reason| reason == facts.reason)
    }
}

const KEEP_MONITORING: Recommendation = Recommendation {
    action: ActionType::Wait,
    label: "Keep monitoring",
    explanation: "Claim is moving within SLA. No action required today.",
    priority: ActionPriority::Low,
};

const RULES: &[Rule] = &[
    // Critical workshop stall
    Rule {
        sla: Some(SlaLevel::High),
        reason: Some(BlockingReason::Workshop),
        recommendation: Recommendation {
            action: ActionType::Escalate,
            label: "Escalate to service manager",
            explanation: "Claim has been sitting at the workshop for more than 7 days. \
                          Needs intervention at decision-making level.",
            priority: ActionPriority::Critical,
        },
    },
    // Client documents overdue
    Rule {
        sla: Some(SlaLevel::High),
        reason: Some(BlockingReason::Client),
        recommendation: Recommendation {
            action: ActionType::CallClient,
            label: "Call the client (final)",
            explanation: "Client has not delivered documents for over a week. \
                          Inform them the repair may be put on hold.",
            priority: ActionPriority::Critical,
        },
    },
    Rule {
        sla: Some(SlaLevel::High),
        reason: Some(BlockingReason::Decision),
        recommendation: Recommendation {
            action: ActionType::InternalChase,
            label: "Chase adjuster / expert",
            explanation: "Valuation or estimate has been waiting for internal approval too long.",
            priority: ActionPriority::High,
        },
    },
    Rule {
        sla: None,
        reason: Some(BlockingReason::New),
        recommendation: Recommendation {
            action: ActionType::AssignTask,
            label: "Start the process",
            explanation: "New claim in the system. Make the first call and confirm \
                          the vehicle was accepted for repair.",
            priority: ActionPriority::Medium,
        },
    },
    Rule {
        sla: Some(SlaLevel::Medium),
        reason: Some(BlockingReason::Workshop),
        recommendation: Recommendation {
            action: ActionType::CallWorkshop,
            label: "Contact the workshop",
            explanation: "Repair in progress with no update for 3 days. \
                          Confirm the expected completion date.",
            priority: ActionPriority::Medium,
        },
    },
    Rule {
        sla: Some(SlaLevel::Medium),
        reason: Some(BlockingReason::Client),
        recommendation: Recommendation {
            action: ActionType::SendReminder,
            label: "Send SMS / e-mail",
            explanation: "Reminder about missing authorisations or statements.",
            priority: ActionPriority::Low,
        },
    },
    Rule {
        sla: None,
        reason: None,
        recommendation: KEEP_MONITORING,
    },
];

pub fn recommend(claim: &Claim) -> Recommendation {
    let facts = Facts::of(claim);
    RULES
        .iter()
        .find(|rule| rule.matches(&facts))
        .map(|rule| rule.recommendation)
        .unwrap_or(KEEP_MONITORING)
}

/// Operational urgency on a 0-100 scale, used to order task lists.
pub fn operational_priority(claim: &Claim) -> u8 {
    let mut score = f64::from(claim.inactivity_days.saturating_mul(5)).min(60.0);
    score += (f64::from(claim.age) / 10.0).min(20.0);
    match blocking::infer(&claim.status, claim.last_comment.as_deref()) {
        BlockingReason::Decision => score += 20.0,
        BlockingReason::New => score += 15.0,
        _ => {}
    }
    score.min(100.0).round() as u8
}

#[derive(Debug, Clone)]
pub struct Task<'a> {
    pub entry: &'a ComparedClaim,
    pub recommendation: Recommendation,
    pub score: u8,
}

impl Task<'_> {
    pub fn is_pending(&self) -> bool {
        self.entry.claim.recommendation_status() == RecommendationStatus::Todo
    }
}

/// Most urgent first: recommendation priority, then operational score.
pub fn task_list<'a>(open: &[&'a ComparedClaim]) -> Vec<Task<'a>> {
    let mut tasks: Vec<Task<'a>> = open
        .iter()
        .copied()
        .map(|entry| Task {
            entry,
            recommendation: recommend(&entry.claim),
            score: operational_priority(&entry.claim),
        })
        .collect();
    tasks.sort_by(|a, b| {
        b.recommendation
            .priority
            .cmp(&a.recommendation.priority)
            .then(b.score.cmp(&a.score))
    });
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn claim(inactivity_days: u32, status: &str, comment: Option<&str>) -> Claim {
        let import_date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let stamp = import_date.and_hms_opt(9, 0, 0).unwrap();
        Claim {
            id: Claim::snapshot_id(import_date, "SZK-1"),
            claim_number: "SZK-1".to_string(),
            open_date: stamp,
            last_action_date: stamp,
            import_date,
            status: status.to_string(),
            advisor: "Anna Nowak".to_string(),
            age: 20,
            inactivity_days,
            priority: 0,
            last_comment: comment.map(str::to_string),
            recommendation_status: None,
        }
    }

    #[test]
    fn stalled_workshop_escalates() {
        let rec = recommend(&claim(10, "w warsztacie", None));
        assert_eq!(rec.action, ActionType::Escalate);
        assert_eq!(rec.priority, ActionPriority::Critical);
    }

    #[test]
    fn new_claim_is_assigned_regardless_of_sla() {
        let fresh = recommend(&claim(1, "nowe zgłoszenie", None));
        assert_eq!(fresh.action, ActionType::AssignTask);
        assert_eq!(fresh.priority, ActionPriority::Medium);

        let stale = recommend(&claim(30, "nowe zgłoszenie", None));
        assert_eq!(stale.action, ActionType::AssignTask);
    }

    #[test]
    fn high_sla_rules_cover_client_and_decision() {
        let client = recommend(&claim(9, "Oczekiwanie", Some("brak dokumentów od klienta")));
        assert_eq!(client.action, ActionType::CallClient);
        assert_eq!(client.priority, ActionPriority::Critical);

        let decision = recommend(&claim(8, "Kosztorys do akceptacji", None));
        assert_eq!(decision.action, ActionType::InternalChase);
        assert_eq!(decision.priority, ActionPriority::High);
    }

    #[test]
    fn medium_sla_rules() {
        let workshop = recommend(&claim(5, "Naprawa", None));
        assert_eq!(workshop.action, ActionType::CallWorkshop);
        assert_eq!(workshop.priority, ActionPriority::Medium);

        let client = recommend(&claim(3, "Czeka na upoważnienie klienta", None));
        assert_eq!(client.action, ActionType::SendReminder);
        assert_eq!(client.priority, ActionPriority::Low);
    }

    #[test]
    fn everything_else_waits() {
        assert_eq!(recommend(&claim(1, "Naprawa", None)), KEEP_MONITORING);
        assert_eq!(recommend(&claim(12, "Kosztorys", None)).priority, ActionPriority::High);
        assert_eq!(recommend(&claim(5, "Kosztorys", None)), KEEP_MONITORING);
        assert_eq!(recommend(&claim(40, "", None)), KEEP_MONITORING);
    }

    #[test]
    fn recommendation_is_repeatable() {
        let c = claim(10, "w warsztacie", Some("czekamy na części"));
        assert_eq!(recommend(&c), recommend(&c));
    }

    #[test]
    fn operational_priority_weights() {
        // 4 days idle, 20 days old, no special reason: 20 + 2
        assert_eq!(operational_priority(&claim(4, "Naprawa", None)), 22);
        // capped components plus decision bonus: 60 + 2 + 20
        assert_eq!(operational_priority(&claim(30, "Weryfikacja", None)), 82);
        // new claim bonus
        assert_eq!(operational_priority(&claim(0, "Nowe", None)), 17);
    }

    #[test]
    fn tasks_are_ordered_by_urgency() {
        use crate::models::ComparisonStatus;

        let wrap = |claim: Claim| ComparedClaim {
            claim,
            comparison: ComparisonStatus::Stagnant,
        };
        let mut done = claim(10, "w warsztacie", None);
        done.recommendation_status = Some(RecommendationStatus::Done);
        let entries = vec![
            wrap(claim(1, "Naprawa", None)),
            wrap(claim(4, "Naprawa", None)),
            wrap(done),
            wrap(claim(2, "Nowe", None)),
        ];
        let open: Vec<&ComparedClaim> = entries.iter().collect();

        let tasks = task_list(&open);
        let actions: Vec<ActionType> = tasks.iter().map(|t| t.recommendation.action).collect();
        assert_eq!(
            actions,
            vec![
                ActionType::Escalate,
                ActionType::AssignTask,
                ActionType::CallWorkshop,
                ActionType::Wait,
            ]
        );
        assert!(!tasks[0].is_pending());
        assert!(tasks[1].is_pending());
    }

    #[test]
    fn operational_priority_is_capped() {
        let mut c = claim(100, "Decyzja", None);
        c.age = 900;
        assert_eq!(operational_priority(&c), 100);
    }
}

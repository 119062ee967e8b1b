#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockingReason {
    Client,
    Workshop,
    Decision,
    External,
    /// Reserved: no keyword table maps here yet.
    #[allow(dead_code)]
    Internal,
    New,
    Unknown,
}

impl BlockingReason {
    pub fn label(&self) -> &'static str {
        match self {
            BlockingReason::Client => "Waiting for client",
            BlockingReason::Workshop => "Waiting for workshop",
            BlockingReason::Decision => "Review / decision",
            BlockingReason::External => "External partner",
            BlockingReason::Internal => "Internal resources",
            BlockingReason::New => "New order",
            BlockingReason::Unknown => "No precise reason",
        }
    }
}

/// Keyword stems checked in order; the first table with a hit wins.
const KEYWORD_TABLE: &[(BlockingReason, &[&str])] = &[
    (BlockingReason::New, &["nowe"]),
    (
        BlockingReason::Workshop,
        &[
            "warszta",
            "serwis",
            "blacharni",
            "napraw",
            "częśc",
            "czesci",
            "technolog",
        ],
    ),
    (
        BlockingReason::Client,
        &[
            "klient",
            "poszkodowan",
            "użytkownik",
            "uzytkownik",
            "dokument",
            "upoważnien",
        ],
    ),
    (
        BlockingReason::Decision,
        &[
            "decyzj",
            "akceptacj",
            "zatwierdz",
            "weryfikacj",
            "kosztorys",
            "wycen",
        ],
    ),
    (
        BlockingReason::External,
        &[
            "pzu",
            "warta",
            "ergo",
            "hestia",
            "link4",
            "ubezpieczyciel",
            "tuwr",
        ],
    ),
];

pub fn infer(status: &str, last_comment: Option<&str>) -> BlockingReason {
    let text = format!("{} {}", status, last_comment.unwrap_or_default()).to_lowercase();

    KEYWORD_TABLE
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| text.contains(keyword)))
        .map(|(reason, _)| *reason)
        .unwrap_or(BlockingReason::Unknown)
}

use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use log::{debug, info};
use regex::Regex;

use crate::error::ImportError;
use crate::models::Claim;

/// Exports carry a short title block above the header row.
const HEADER_FALLBACK_ROW: usize = 4;
const HEADER_MARKERS: &[&str] = &["id zgłoszenia", "claim number"];

const CLAIM_NUMBER_KEYS: &[&str] = &["id zgłoszenia", "numer", "claim number"];
const STATUS_KEYS: &[&str] = &["status"];
const OPEN_DATE_KEYS: &[&str] = &["data zgłoszenia", "otwarcia", "opened"];
const ADVISOR_KEYS: &[&str] = &["realizuje", "doradca", "advisor"];
const LAST_ACTION_KEYS: &[&str] = &["data modyfikacji", "akcji", "czynności", "last action"];
const COMMENT_KEYS: &[&str] = &["opis pracownika", "notatka", "komentarz", "comment"];

const COMMENT_LIMIT: usize = 400;
const MISSING_STATUS: &str = "No data";
const UNASSIGNED: &str = "Unassigned";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y"];

#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    pub import_date: NaiveDate,
    pub now: NaiveDateTime,
    pub delimiter: u8,
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    claim_number: usize,
    status: Option<usize>,
    open_date: Option<usize>,
    advisor: Option<usize>,
    last_action: Option<usize>,
    comment: Option<usize>,
}

pub fn read_claims(path: &Path, options: &ImportOptions) -> Result<Vec<Claim>, ImportError> {
    let file = std::fs::File::open(path).map_err(|source| ImportError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let claims = parse_claims(file, options)?;
    info!("read {} claims from {}", claims.len(), path.display());
    Ok(claims)
}

pub fn parse_claims<R: Read>(
    reader: R,
    options: &ImportOptions,
) -> Result<Vec<Claim>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(options.delimiter)
        .from_reader(reader);
    let rows = reader.records().collect::<Result<Vec<StringRecord>, _>>()?;

    let header_idx = find_header_row(&rows)?;
    let columns = map_columns(&rows[header_idx])?;
    debug!("header at row {header_idx}, columns {columns:?}");

    let mut skipped = 0usize;
    let claims: Vec<Claim> = rows[header_idx + 1..]
        .iter()
        .filter_map(|row| {
            let claim = build_claim(row, &columns, options);
            if claim.is_none() {
                skipped += 1;
            }
            claim
        })
        .collect();

    if skipped > 0 {
        debug!("skipped {skipped} rows without a claim number");
    }
    Ok(claims)
}

fn find_header_row(rows: &[StringRecord]) -> Result<usize, ImportError> {
    let marked = rows.iter().position(|row| {
        row.iter().any(|cell| {
            let cell = cell.to_lowercase();
            HEADER_MARKERS.iter().any(|marker| cell.contains(marker))
        })
    });

    match marked {
        Some(idx) => Ok(idx),
        None if rows.len() > HEADER_FALLBACK_ROW => Ok(HEADER_FALLBACK_ROW),
        None => Err(ImportError::MissingHeader {
            line: HEADER_FALLBACK_ROW + 1,
        }),
    }
}

fn find_column(header: &StringRecord, keys: &[&str]) -> Option<usize> {
    header.iter().position(|cell| {
        let cell = cell.trim().to_lowercase();
        !cell.is_empty() && keys.iter().any(|key| cell.contains(key))
    })
}

fn map_columns(header: &StringRecord) -> Result<Columns, ImportError> {
    Ok(Columns {
        claim_number: find_column(header, CLAIM_NUMBER_KEYS).ok_or(ImportError::MissingColumn {
            column: "claim number",
        })?,
        status: find_column(header, STATUS_KEYS),
        open_date: find_column(header, OPEN_DATE_KEYS),
        advisor: find_column(header, ADVISOR_KEYS),
        last_action: find_column(header, LAST_ACTION_KEYS),
        comment: find_column(header, COMMENT_KEYS),
    })
}

fn cell(row: &StringRecord, idx: Option<usize>) -> Option<&str> {
    idx.and_then(|idx| row.get(idx))
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn build_claim(row: &StringRecord, columns: &Columns, options: &ImportOptions) -> Option<Claim> {
    let claim_number = cell(row, Some(columns.claim_number))?.to_string();

    let open_date = cell(row, columns.open_date)
        .and_then(parse_timestamp)
        .unwrap_or(options.now);
    let last_action_date = cell(row, columns.last_action)
        .and_then(parse_timestamp)
        .unwrap_or(open_date);
    let age = days_between(open_date, options.now);
    let inactivity_days = days_between(last_action_date, options.now);

    Some(Claim {
        id: Claim::snapshot_id(options.import_date, &claim_number),
        claim_number,
        open_date,
        last_action_date,
        import_date: options.import_date,
        status: cell(row, columns.status).unwrap_or(MISSING_STATUS).to_string(),
        advisor: cell(row, columns.advisor).unwrap_or(UNASSIGNED).to_string(),
        age,
        inactivity_days,
        priority: import_priority(inactivity_days, age),
        last_comment: cell(row, columns.comment).and_then(extract_last_comment),
        recommendation_status: None,
    })
}

fn days_between(from: NaiveDateTime, now: NaiveDateTime) -> u32 {
    u32::try_from((now - from).num_days().max(0)).unwrap_or(u32::MAX)
}

pub fn import_priority(inactivity_days: u32, age: u32) -> u8 {
    let score = f64::from(inactivity_days) * 10.0 + f64::from(age) / 10.0;
    score.min(100.0).round() as u8
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

fn entry_stamp() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{2}\.\d{2}\.\d{4}\s\d{2}:\d{2}").unwrap())
}

/// Keeps only the newest entry of a timestamped comment log, capped at
/// 400 characters.
pub fn extract_last_comment(text: &str) -> Option<String> {
    let parts: Vec<&str> = entry_stamp().split(text).collect();
    let entry = match parts.last() {
        Some(last) if parts.len() > 1 => drop_first_separator(last),
        _ => text.to_string(),
    };
    let entry = entry.trim();

    if entry.is_empty() {
        return None;
    }
    if entry.chars().count() > COMMENT_LIMIT {
        let head: String = entry.chars().take(COMMENT_LIMIT - 3).collect();
        return Some(format!("{head}..."));
    }
    Some(entry.to_string())
}

fn drop_first_separator(entry: &str) -> String {
    match entry.find(|c: char| c == ':' || c == '-') {
        Some(idx) => format!("{}{}", &entry[..idx], &entry[idx + 1..]),
        None => entry.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> ImportOptions {
        ImportOptions {
            import_date: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            now: NaiveDate::from_ymd_opt(2026, 3, 10)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            delimiter: b';',
        }
    }

    const EXPORT: &str = "\
Raport szkód;;;;;
Wygenerowano 10.03.2026;;;;;
;;;;;
ID Zgłoszenia;Status;Data zgłoszenia;Realizuje;Data modyfikacji;Opis pracownika
SZK/001;W warsztacie;2026-02-08;Anna Nowak;2026-02-28 09:15;01.03.2026 10:00 - klient dzwonił 05.03.2026 11:30: czekamy na części
SZK/002;Nowe zgłoszenie;2026-03-09;;;
;Zamknięta;2026-01-01;Jan Kowalski;2026-01-05;
";

    #[test]
    fn parses_export_with_title_block() {
        let claims = parse_claims(EXPORT.as_bytes(), &options()).unwrap();
        assert_eq!(claims.len(), 2);

        let first = &claims[0];
        assert_eq!(first.id, "2026-03-10-SZK/001");
        assert_eq!(first.status, "W warsztacie");
        assert_eq!(first.advisor, "Anna Nowak");
        assert_eq!(first.age, 30);
        assert_eq!(first.inactivity_days, 10);
        assert_eq!(first.priority, 100);
        assert_eq!(first.last_comment.as_deref(), Some("czekamy na części"));

        let second = &claims[1];
        assert_eq!(second.advisor, UNASSIGNED);
        assert_eq!(second.last_action_date, second.open_date);
        assert_eq!(second.inactivity_days, 1);
        assert_eq!(second.last_comment, None);
    }

    #[test]
    fn falls_back_to_fifth_row_for_header() {
        let csv = "a\nb\nc\nd\nNumer,Status\nX1,Naprawa\n";
        let opts = ImportOptions { delimiter: b',', ..options() };
        let claims = parse_claims(csv.as_bytes(), &opts).unwrap();
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].claim_number, "X1");
        assert_eq!(claims[0].open_date, opts.now);
    }

    #[test]
    fn english_header_on_first_row() {
        let csv = "Claim number,Status,Advisor\nC-9,Awaiting client,Sam Lee\n";
        let opts = ImportOptions { delimiter: b',', ..options() };
        let claims = parse_claims(csv.as_bytes(), &opts).unwrap();
        assert_eq!(claims[0].advisor, "Sam Lee");
    }

    #[test]
    fn short_file_without_header_is_rejected() {
        let err = parse_claims("a;b\n1;2\n".as_bytes(), &options()).unwrap_err();
        assert!(matches!(err, ImportError::MissingHeader { .. }));
    }

    #[test]
    fn header_without_claim_number_is_rejected() {
        let csv = "x;y\nx;y\nx;y\nx;y\nStatus;Doradca\nA;B\n";
        let err = parse_claims(csv.as_bytes(), &options()).unwrap_err();
        assert!(matches!(err, ImportError::MissingColumn { column: "claim number" }));
    }

    #[test]
    fn timestamps_in_supported_formats() {
        let expected = NaiveDate::from_ymd_opt(2026, 2, 3)
            .unwrap()
            .and_hms_opt(14, 5, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2026-02-03 14:05"), Some(expected));
        assert_eq!(parse_timestamp("03.02.2026 14:05"), Some(expected));
        assert_eq!(parse_timestamp("2026-02-03T14:05:00"), Some(expected));
        assert_eq!(
            parse_timestamp("03.02.2026"),
            NaiveDate::from_ymd_opt(2026, 2, 3).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn comment_keeps_newest_entry() {
        assert_eq!(
            extract_last_comment("02.03.2026 08:00 - wysłano kosztorys").as_deref(),
            Some("wysłano kosztorys")
        );
        assert_eq!(extract_last_comment("bez daty").as_deref(), Some("bez daty"));
        assert_eq!(extract_last_comment("02.03.2026 08:00 -  "), None);
    }

    #[test]
    fn long_comment_is_truncated() {
        let long = "x".repeat(450);
        let comment = extract_last_comment(&long).unwrap();
        assert_eq!(comment.chars().count(), 400);
        assert!(comment.ends_with("..."));

        let exact = "ż".repeat(400);
        assert_eq!(extract_last_comment(&exact).unwrap(), exact);
    }

    #[test]
    fn import_priority_is_capped() {
        assert_eq!(import_priority(2, 35), 24);
        assert_eq!(import_priority(12, 0), 100);
    }
}

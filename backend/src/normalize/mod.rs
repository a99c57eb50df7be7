//! Schema normalizers: [`RawTable`] to typed records.
//!
//! Two independent normalizers exist, one per record type. Each has a fixed
//! expected schema and fails fast with [`SchemaError::MissingColumn`] when a
//! required column is absent. Value-level problems never fail: unparseable
//! dates become `None`.

use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

use crate::error::{SchemaError, SchemaResult};
use crate::table::{AgentEvalRecord, MemberRecord, RawTable};

/// Raw header -> canonical header synonym table for agent-evaluation files.
const AGENT_HEADER_SYNONYMS: [(&str, &str); 3] = [
    ("Name Of Agents", "Agent Name"),
    ("Name Of Subscribers", "Subscriber Name"),
    ("Subscriber Status", "Status"),
];

const MEMBER_REQUIRED: [&str; 6] = [
    "Member Status",
    "Gender",
    "Clinic Name",
    "DoB",
    "Created Date",
    "Activation Date",
];

const AGENT_REQUIRED: [&str; 3] = ["Agent Name", "Subscriber Name", "Status"];

// =============================================================================
// String canonicalization
// =============================================================================

/// Trim and capitalize: first letter uppercase, everything else lowercase.
pub fn capitalize(value: &str) -> String {
    let trimmed = value.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    }
}

/// Trim and title-case: uppercase the first letter of every word.
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut at_word_start = true;
    for c in value.trim().chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

/// Canonicalize an uploaded header: trim, title-case, underscores to spaces.
pub fn canonicalize_header(header: &str) -> String {
    title_case(header).replace('_', " ")
}

// =============================================================================
// Date parsing
// =============================================================================

/// Date-only formats tried in order, month-first before day-first.
const DATE_FORMATS: [&str; 6] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%d-%m-%Y",
];

/// Leniently parse a date string. Unparseable input is `None`, never an
/// error. A trailing time component ("2024-01-02 13:45:00" or ISO "T") is
/// accepted and dropped.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    let date_part = trimmed
        .split(|c: char| c == ' ' || c == 'T')
        .next()
        .unwrap_or(trimmed);

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(date_part, format) {
            return Some(date);
        }
    }
    None
}

// =============================================================================
// Member normalizer
// =============================================================================

fn require_columns(table: &RawTable, required: &[&str]) -> SchemaResult<()> {
    for name in required {
        if table.column_index(name).is_none() {
            return Err(SchemaError::MissingColumn(name.to_string()));
        }
    }
    Ok(())
}

/// Normalize a raw member upload.
///
/// Requires the columns `Member Status`, `Gender`, `Clinic Name`, `DoB`,
/// `Created Date` and `Activation Date`. `age` is `today`'s year minus the
/// birth year, a plain year difference rather than a calendar-exact age;
/// downstream reports depend on that rounding.
pub fn clean_members(table: &RawTable, today: NaiveDate) -> SchemaResult<Vec<MemberRecord>> {
    require_columns(table, &MEMBER_REQUIRED)?;

    let mut records = Vec::with_capacity(table.len());
    for i in 0..table.len() {
        let cell = |name: &str| table.cell(i, name).unwrap_or("");

        let dob = parse_date(cell("DoB"));
        records.push(MemberRecord {
            member_status: capitalize(cell("Member Status")),
            gender: capitalize(cell("Gender")),
            clinic_name: title_case(cell("Clinic Name")),
            dob,
            created_date: parse_date(cell("Created Date")),
            activation_date: parse_date(cell("Activation Date")),
            age: dob.map(|d| today.year() - d.year()),
        });
    }

    Ok(records)
}

// =============================================================================
// Agent-evaluation normalizer
// =============================================================================

/// Canonicalize headers and apply the fixed synonym table.
fn canonical_agent_headers(table: &RawTable) -> Vec<String> {
    table
        .headers
        .iter()
        .map(|h| {
            let canonical = canonicalize_header(h);
            AGENT_HEADER_SYNONYMS
                .iter()
                .find(|(raw, _)| *raw == canonical)
                .map(|(_, renamed)| renamed.to_string())
                .unwrap_or(canonical)
        })
        .collect()
}

/// Whether an agent upload carries a `Date` column after header
/// canonicalization and synonym renaming.
pub fn agent_has_date_column(table: &RawTable) -> bool {
    canonical_agent_headers(table).iter().any(|h| h == "Date")
}

/// Normalize a raw agent-evaluation upload.
///
/// Headers are canonicalized and renamed through the synonym table before
/// the schema check; `Agent Name`, `Subscriber Name` and `Status` are then
/// required, `Date` is optional.
///
/// When the upload has no `Date` column at all, every row is stamped with
/// `now`, the single processing date. Downstream year/month filters then
/// see the whole upload under the current period.
pub fn clean_agent_evals(table: &RawTable, now: NaiveDate) -> SchemaResult<Vec<AgentEvalRecord>> {
    let table = table.clone().with_headers(canonical_agent_headers(table));
    require_columns(&table, &AGENT_REQUIRED)?;

    let has_date_column = table.column_index("Date").is_some();
    let known = ["Agent Name", "Subscriber Name", "Status", "Date"];

    let mut records = Vec::with_capacity(table.len());
    for i in 0..table.len() {
        let cell = |name: &str| table.cell(i, name).unwrap_or("");

        let mut extra = BTreeMap::new();
        for header in &table.headers {
            if !known.contains(&header.as_str()) {
                extra.insert(header.clone(), cell(header).to_string());
            }
        }

        let mut record = AgentEvalRecord {
            agent_name: title_case(cell("Agent Name")),
            subscriber_name: cell("Subscriber Name").trim().to_string(),
            status: capitalize(cell("Status")),
            date: None,
            year: None,
            month: None,
            month_name: None,
            extra,
        };

        let date = if has_date_column {
            parse_date(cell("Date"))
        } else {
            Some(now)
        };
        record.set_date(date);

        records.push(record);
    }

    Ok(records)
}

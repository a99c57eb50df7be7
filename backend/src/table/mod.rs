//! Domain models for the DataDash pipeline.
//!
//! This module contains the core data structures used throughout the pipeline:
//!
//! - [`RawTable`] - untyped ingestion output (headers + string cells)
//! - [`MemberRecord`] - a normalized member/subscriber row
//! - [`AgentEvalRecord`] - a normalized agent-evaluation row
//! - [`MONTH_NAMES`] - the fixed 12-entry calendar lookup

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// Raw Table
// =============================================================================

/// An uploaded table before normalization: ordered rows of trimmed strings.
///
/// Produced once per upload by [`crate::ingest`]; every later stage builds
/// new values instead of mutating it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTable {
    /// Column headers in file order.
    pub headers: Vec<String>,
    /// Data rows. Short rows read as empty cells; extra cells were dropped.
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by exact header name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell value at (row, column name). Empty string if the row is short.
    pub fn cell(&self, row: usize, name: &str) -> Option<&str> {
        let col = self.column_index(name)?;
        let row = self.rows.get(row)?;
        Some(row.get(col).map(String::as_str).unwrap_or(""))
    }

    /// Replace the header list, keeping row data untouched.
    ///
    /// Used by the normalizers for header canonicalization and synonym
    /// renames. The new list must have the same length.
    pub fn with_headers(mut self, headers: Vec<String>) -> Self {
        debug_assert_eq!(headers.len(), self.headers.len());
        self.headers = headers;
        self
    }
}

// =============================================================================
// Calendar Lookup
// =============================================================================

/// Fixed month-name table, indexed by `month - 1`.
pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Name for a 1-based month number.
pub fn month_name(month: u32) -> Option<&'static str> {
    if (1..=12).contains(&month) {
        Some(MONTH_NAMES[(month - 1) as usize])
    } else {
        None
    }
}

/// 1-based month number for a month name.
pub fn month_number(name: &str) -> Option<u32> {
    MONTH_NAMES
        .iter()
        .position(|m| m.eq_ignore_ascii_case(name.trim()))
        .map(|i| i as u32 + 1)
}

// =============================================================================
// Member Record
// =============================================================================

/// A normalized member/subscriber row.
///
/// Categorical fields hold canonical forms (trimmed, consistent case).
/// Date fields are `None` when the source value was unparseable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRecord {
    /// Member status ("Active", "Inactive", ...), capitalized.
    pub member_status: String,
    /// Gender, capitalized.
    pub gender: String,
    /// Clinic branch name, title-cased.
    pub clinic_name: String,
    /// Date of birth.
    pub dob: Option<NaiveDate>,
    /// Record creation date.
    pub created_date: Option<NaiveDate>,
    /// Membership activation date.
    pub activation_date: Option<NaiveDate>,
    /// Current year minus birth year. Deliberately not a calendar-exact
    /// age: a member whose birthday hasn't occurred yet this year is one
    /// too high.
    pub age: Option<i32>,
}

// =============================================================================
// Agent Evaluation Record
// =============================================================================

/// A normalized agent-evaluation row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentEvalRecord {
    /// Agent name, title-cased.
    pub agent_name: String,
    /// Subscriber name as uploaded (trimmed).
    pub subscriber_name: String,
    /// Subscriber status, capitalized.
    pub status: String,
    /// Evaluation date. When the upload has no Date column at all, every
    /// row carries the same processing timestamp (see the normalizer).
    pub date: Option<NaiveDate>,
    /// Year of `date`.
    pub year: Option<i32>,
    /// Month of `date`, 1-12.
    pub month: Option<u32>,
    /// Month name from the calendar lookup.
    pub month_name: Option<String>,
    /// Remaining uploaded columns, kept for drill-down display and export.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl AgentEvalRecord {
    /// Set the date and its derived year/month/month-name columns together.
    pub fn set_date(&mut self, date: Option<NaiveDate>) {
        use chrono::Datelike;
        self.date = date;
        self.year = date.map(|d| d.year());
        self.month = date.map(|d| d.month());
        self.month_name = self.month.and_then(month_name).map(String::from);
    }
}

// =============================================================================
// Tests
// =============================================================================

//! Filter engine: criteria types and predicate application.
//!
//! Criteria are independent per dimension. A categorical criterion with an
//! empty selected set imposes no constraint. Date filtering runs in exactly
//! one of two modes per invocation: an inclusive range, or a discrete
//! (year, optional month) selection.
//!
//! Selection option lists are derived from the *unfiltered* input, so
//! dropdowns reflect the whole uploaded universe rather than the
//! progressively filtered one.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::table::{AgentEvalRecord, MemberRecord};

// =============================================================================
// Criteria
// =============================================================================

/// Which member date column the date filter applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DateField {
    #[default]
    CreatedDate,
    ActivationDate,
    Dob,
}

impl DateField {
    fn get(&self, record: &MemberRecord) -> Option<NaiveDate> {
        match self {
            DateField::CreatedDate => record.created_date,
            DateField::ActivationDate => record.activation_date,
            DateField::Dob => record.dob,
        }
    }
}

/// One of the two mutually exclusive date-filter modes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum DateFilter {
    /// Keep rows with `start <= date <= end`, inclusive both ends.
    Range { start: NaiveDate, end: NaiveDate },
    /// Keep rows of one year; additionally of one month when `month` is
    /// set (`None` stands for the "All Months" choice).
    Discrete { year: i32, month: Option<u32> },
}

fn default_age_range() -> (i32, i32) {
    (0, 100)
}

/// Filter criteria for the member table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MemberCriteria {
    /// Selected branches. Empty = no constraint.
    pub branches: Vec<String>,
    /// Selected genders. Empty = no constraint.
    pub genders: Vec<String>,
    /// Selected member statuses. Empty = no constraint.
    pub statuses: Vec<String>,
    /// Inclusive age interval, dual-handle slider semantics (0-100).
    pub age_range: (i32, i32),
    /// Active date-filter mode, if any.
    pub date: Option<DateFilter>,
    /// Date column the date filter reads.
    pub date_field: DateField,
}

impl Default for MemberCriteria {
    fn default() -> Self {
        Self {
            branches: Vec::new(),
            genders: Vec::new(),
            statuses: Vec::new(),
            age_range: default_age_range(),
            date: None,
            date_field: DateField::default(),
        }
    }
}

/// Filter criteria for the agent-evaluation table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentCriteria {
    /// Selected year. `None` lets the caller fall back to the latest
    /// available year.
    pub year: Option<i32>,
    /// Selected month, `None` for "All Months".
    pub month: Option<u32>,
    /// Selected subscriber statuses. Empty = no constraint.
    pub statuses: Vec<String>,
}

// =============================================================================
// Predicates
// =============================================================================

/// Empty set = pass-through, otherwise membership.
fn in_set(selected: &[String], value: &str) -> bool {
    selected.is_empty() || selected.iter().any(|s| s == value)
}

fn date_passes(filter: &DateFilter, date: Option<NaiveDate>) -> bool {
    match filter {
        DateFilter::Range { start, end } => match date {
            // Rows with no date are excluded from date-bounded comparisons.
            Some(d) => *start <= d && d <= *end,
            None => false,
        },
        DateFilter::Discrete { year, month } => match date {
            Some(d) => d.year() == *year && month.map(|m| d.month() == m).unwrap_or(true),
            None => false,
        },
    }
}

/// Apply member criteria, producing the filtered subset.
pub fn filter_members(records: &[MemberRecord], criteria: &MemberCriteria) -> Vec<MemberRecord> {
    let (min_age, max_age) = criteria.age_range;
    records
        .iter()
        .filter(|r| in_set(&criteria.branches, &r.clinic_name))
        .filter(|r| in_set(&criteria.genders, &r.gender))
        .filter(|r| in_set(&criteria.statuses, &r.member_status))
        // A row with no age always fails the interval test.
        .filter(|r| r.age.map(|a| min_age <= a && a <= max_age).unwrap_or(false))
        .filter(|r| match &criteria.date {
            Some(f) => date_passes(f, criteria.date_field.get(r)),
            None => true,
        })
        .cloned()
        .collect()
}

/// Apply agent criteria, producing the filtered subset.
pub fn filter_agent_evals(
    records: &[AgentEvalRecord],
    criteria: &AgentCriteria,
) -> Vec<AgentEvalRecord> {
    records
        .iter()
        .filter(|r| match criteria.year {
            Some(year) => r.year == Some(year),
            None => true,
        })
        .filter(|r| match criteria.month {
            Some(month) => r.month == Some(month),
            None => true,
        })
        .filter(|r| in_set(&criteria.statuses, &r.status))
        .cloned()
        .collect()
}

// =============================================================================
// Option lists
// =============================================================================

fn sorted_distinct<I: IntoIterator<Item = String>>(values: I) -> Vec<String> {
    let mut out: Vec<String> = values.into_iter().filter(|v| !v.is_empty()).collect();
    out.sort();
    out.dedup();
    out
}

/// Selection options for the member page, from the unfiltered table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberFilterOptions {
    pub branches: Vec<String>,
    pub genders: Vec<String>,
    pub statuses: Vec<String>,
    pub years: Vec<i32>,
}

impl MemberFilterOptions {
    pub fn from_records(records: &[MemberRecord], date_field: DateField) -> Self {
        let mut years: Vec<i32> = records
            .iter()
            .filter_map(|r| date_field.get(r).map(|d| d.year()))
            .collect();
        years.sort_unstable();
        years.dedup();

        Self {
            branches: sorted_distinct(records.iter().map(|r| r.clinic_name.clone())),
            genders: sorted_distinct(records.iter().map(|r| r.gender.clone())),
            statuses: sorted_distinct(records.iter().map(|r| r.member_status.clone())),
            years,
        }
    }

    /// Latest year with any valid date; `None` when no row has one. Callers
    /// surface "no data" instead of erroring.
    pub fn default_year(&self) -> Option<i32> {
        self.years.last().copied()
    }
}

/// Selection options for the agent page, from the unfiltered table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentFilterOptions {
    pub years: Vec<i32>,
    pub statuses: Vec<String>,
}

impl AgentFilterOptions {
    pub fn from_records(records: &[AgentEvalRecord]) -> Self {
        let mut years: Vec<i32> = records.iter().filter_map(|r| r.year).collect();
        years.sort_unstable();
        years.dedup();

        Self {
            years,
            statuses: sorted_distinct(records.iter().map(|r| r.status.clone())),
        }
    }

    pub fn default_year(&self) -> Option<i32> {
        self.years.last().copied()
    }
}

/// Distinct months (1-12, sorted) present in the given year of the member
/// table's chosen date column.
pub fn member_months_in_year(
    records: &[MemberRecord],
    date_field: DateField,
    year: i32,
) -> Vec<u32> {
    let mut months: Vec<u32> = records
        .iter()
        .filter_map(|r| date_field.get(r))
        .filter(|d| d.year() == year)
        .map(|d| d.month())
        .collect();
    months.sort_unstable();
    months.dedup();
    months
}

/// Distinct months (1-12, sorted) present in the given year of the agent
/// table.
pub fn agent_months_in_year(records: &[AgentEvalRecord], year: i32) -> Vec<u32> {
    let mut months: Vec<u32> = records
        .iter()
        .filter(|r| r.year == Some(year))
        .filter_map(|r| r.month)
        .collect();
    months.sort_unstable();
    months.dedup();
    months
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(branch: &str, gender: &str, status: &str, age: i32, created: &str) -> MemberRecord {
        MemberRecord {
            member_status: status.into(),
            gender: gender.into(),
            clinic_name: branch.into(),
            dob: None,
            created_date: crate::normalize::parse_date(created),
            activation_date: None,
            age: Some(age),
        }
    }

    fn members() -> Vec<MemberRecord> {
        vec![
            member("North", "Female", "Active", 30, "2023-01-15"),
            member("North", "Male", "Inactive", 45, "2023-06-20"),
            member("South", "Female", "Active", 12, "2024-02-10"),
            member("East", "Male", "Active", 70, "2024-11-05"),
        ]
    }

    // Identity law: empty selections and the full age interval keep every
    // row that has an age.
    #[test]
    fn test_empty_criteria_identity() {
        let all = members();
        let filtered = filter_members(&all, &MemberCriteria::default());
        assert_eq!(filtered, all);
    }

    #[test]
    fn test_missing_age_always_excluded() {
        let mut record = member("North", "Female", "Active", 0, "2023-01-15");
        record.age = None;
        let filtered = filter_members(&[record], &MemberCriteria::default());
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_categorical_membership() {
        let criteria = MemberCriteria {
            branches: vec!["North".into()],
            ..Default::default()
        };
        let filtered = filter_members(&members(), &criteria);
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|r| r.clinic_name == "North"));
    }

    // Completeness: every in-bounds row is kept, every out-of-bounds row
    // dropped.
    #[test]
    fn test_age_interval_inclusive() {
        let criteria = MemberCriteria {
            age_range: (12, 45),
            ..Default::default()
        };
        let filtered = filter_members(&members(), &criteria);
        assert_eq!(filtered.len(), 3);
        assert!(filtered.iter().all(|r| {
            let a = r.age.unwrap();
            (12..=45).contains(&a)
        }));
    }

    #[test]
    fn test_date_range_inclusive_ends() {
        let criteria = MemberCriteria {
            date: Some(DateFilter::Range {
                start: NaiveDate::from_ymd_opt(2023, 1, 15).unwrap(),
                end: NaiveDate::from_ymd_opt(2024, 2, 10).unwrap(),
            }),
            ..Default::default()
        };
        let filtered = filter_members(&members(), &criteria);
        // Both boundary rows are kept.
        assert_eq!(filtered.len(), 3);
    }

    // Range [Jan 1, Dec 31] of a year selects the same rows as discrete
    // year with "All Months".
    #[test]
    fn test_range_and_discrete_modes_agree() {
        let range = MemberCriteria {
            date: Some(DateFilter::Range {
                start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            }),
            ..Default::default()
        };
        let discrete = MemberCriteria {
            date: Some(DateFilter::Discrete {
                year: 2024,
                month: None,
            }),
            ..Default::default()
        };
        assert_eq!(
            filter_members(&members(), &range),
            filter_members(&members(), &discrete)
        );
    }

    #[test]
    fn test_discrete_month_restriction() {
        let criteria = MemberCriteria {
            date: Some(DateFilter::Discrete {
                year: 2024,
                month: Some(2),
            }),
            ..Default::default()
        };
        let filtered = filter_members(&members(), &criteria);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].clinic_name, "South");
    }

    #[test]
    fn test_options_from_unfiltered_universe() {
        let options = MemberFilterOptions::from_records(&members(), DateField::CreatedDate);
        assert_eq!(options.branches, vec!["East", "North", "South"]);
        assert_eq!(options.genders, vec!["Female", "Male"]);
        assert_eq!(options.statuses, vec!["Active", "Inactive"]);
        assert_eq!(options.years, vec![2023, 2024]);
        assert_eq!(options.default_year(), Some(2024));
    }

    #[test]
    fn test_default_year_empty_is_none() {
        let options = MemberFilterOptions::from_records(&[], DateField::CreatedDate);
        assert_eq!(options.default_year(), None);
    }

    #[test]
    fn test_member_months_in_year() {
        let months = member_months_in_year(&members(), DateField::CreatedDate, 2023);
        assert_eq!(months, vec![1, 6]);
        assert!(member_months_in_year(&members(), DateField::CreatedDate, 1999).is_empty());
    }

    fn eval(agent: &str, subscriber: &str, status: &str, date: &str) -> AgentEvalRecord {
        let mut record = AgentEvalRecord {
            agent_name: agent.into(),
            subscriber_name: subscriber.into(),
            status: status.into(),
            date: None,
            year: None,
            month: None,
            month_name: None,
            extra: Default::default(),
        };
        record.set_date(crate::normalize::parse_date(date));
        record
    }

    fn evals() -> Vec<AgentEvalRecord> {
        vec![
            eval("Jane", "A", "Active", "2024-03-01"),
            eval("Jane", "B", "Inactive", "2024-05-12"),
            eval("Bob", "C", "Active", "2023-08-20"),
        ]
    }

    #[test]
    fn test_agent_year_and_month_filter() {
        let criteria = AgentCriteria {
            year: Some(2024),
            month: Some(5),
            statuses: vec![],
        };
        let filtered = filter_agent_evals(&evals(), &criteria);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].subscriber_name, "B");
    }

    #[test]
    fn test_agent_status_filter_empty_passthrough() {
        let criteria = AgentCriteria {
            year: Some(2024),
            month: None,
            statuses: vec![],
        };
        assert_eq!(filter_agent_evals(&evals(), &criteria).len(), 2);

        let criteria = AgentCriteria {
            year: Some(2024),
            month: None,
            statuses: vec!["Active".into()],
        };
        assert_eq!(filter_agent_evals(&evals(), &criteria).len(), 1);
    }

    #[test]
    fn test_agent_options_and_months() {
        let options = AgentFilterOptions::from_records(&evals());
        assert_eq!(options.years, vec![2023, 2024]);
        assert_eq!(options.statuses, vec!["Active", "Inactive"]);
        assert_eq!(options.default_year(), Some(2024));
        assert_eq!(agent_months_in_year(&evals(), 2024), vec![3, 5]);
    }

    #[test]
    fn test_rows_without_dates_excluded_from_date_modes() {
        let mut record = member("North", "Female", "Active", 30, "not-a-date");
        record.created_date = None;
        let criteria = MemberCriteria {
            date: Some(DateFilter::Discrete {
                year: 2024,
                month: None,
            }),
            ..Default::default()
        };
        assert!(filter_members(&[record], &criteria).is_empty());
    }
}

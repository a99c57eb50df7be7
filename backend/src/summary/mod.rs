//! Aggregation & summary builders.
//!
//! Groups filtered records into the count tables, pivots and per-entity
//! summary rows the insight endpoints serve. All builders accept empty
//! input and produce empty or zero-filled output - an empty filter result
//! is not an error.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::table::{AgentEvalRecord, MemberRecord};

// =============================================================================
// Count-by
// =============================================================================

/// One (category, count) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    pub label: String,
    pub count: u64,
}

/// Group by one categorical value, sorted by category.
pub fn count_by<'a, I>(values: I) -> Vec<CategoryCount>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(label, count)| CategoryCount {
            label: label.to_string(),
            count,
        })
        .collect()
}

/// Top N categories by count, descending; ties break by label.
pub fn top_n(mut counts: Vec<CategoryCount>, n: usize) -> Vec<CategoryCount> {
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    counts.truncate(n);
    counts
}

// =============================================================================
// Two-level breakdown (pivot)
// =============================================================================

/// A two-level group-by pivoted wide: one row per primary key, one column
/// per distinct secondary value, missing combinations zero-filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotTable {
    /// Distinct secondary values, sorted.
    pub columns: Vec<String>,
    /// One row per primary key, sorted by key.
    pub rows: Vec<PivotRow>,
}

/// One pivot row. `counts` is parallel to the table's `columns`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotRow {
    pub key: String,
    pub counts: Vec<u64>,
}

impl PivotRow {
    /// Sum across the category columns. Equals this key's count in the
    /// flat (non-pivoted) group-by.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

/// Build a pivot from (primary, secondary) pairs.
pub fn pivot_counts<I>(pairs: I) -> PivotTable
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut counts: BTreeMap<String, BTreeMap<String, u64>> = BTreeMap::new();
    let mut columns: BTreeSet<String> = BTreeSet::new();

    for (key, category) in pairs {
        columns.insert(category.clone());
        *counts.entry(key).or_default().entry(category).or_default() += 1;
    }

    let columns: Vec<String> = columns.into_iter().collect();
    let rows = counts
        .into_iter()
        .map(|(key, by_category)| PivotRow {
            counts: columns
                .iter()
                .map(|c| by_category.get(c).copied().unwrap_or(0))
                .collect(),
            key,
        })
        .collect();

    PivotTable { columns, rows }
}

/// Gender breakdown per branch for the member table.
pub fn gender_by_branch(records: &[MemberRecord]) -> PivotTable {
    pivot_counts(
        records
            .iter()
            .map(|r| (r.clinic_name.clone(), r.gender.clone())),
    )
}

// =============================================================================
// Member summaries
// =============================================================================

/// Headline KPIs for the filtered member set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total: u64,
    pub active: u64,
    /// Active / total x 100, one decimal. 0 when total is 0.
    pub retention_rate: f64,
}

fn retention(active: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (active as f64 / total as f64 * 1000.0).round() / 10.0
    }
}

/// Total / active / retention across the whole filtered set.
pub fn overview(records: &[MemberRecord]) -> Overview {
    let total = records.len() as u64;
    let active = records.iter().filter(|r| r.member_status == "Active").count() as u64;
    Overview {
        total,
        active,
        retention_rate: retention(active, total),
    }
}

/// Subscriber counts per branch.
pub fn branch_counts(records: &[MemberRecord]) -> Vec<CategoryCount> {
    count_by(records.iter().map(|r| r.clinic_name.as_str()))
}

/// Gender distribution across the filtered set.
pub fn gender_counts(records: &[MemberRecord]) -> Vec<CategoryCount> {
    count_by(records.iter().map(|r| r.gender.as_str()))
}

/// Members under 18, counted per branch.
pub fn children_by_branch(records: &[MemberRecord]) -> Vec<CategoryCount> {
    count_by(
        records
            .iter()
            .filter(|r| r.age.map(|a| a < 18).unwrap_or(false))
            .map(|r| r.clinic_name.as_str()),
    )
}

/// Per-branch totals, active counts and retention rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchPerformance {
    pub branch: String,
    pub total: u64,
    pub active: u64,
    pub retention_rate: f64,
}

/// Branch performance comparison, sorted by branch.
pub fn branch_performance(records: &[MemberRecord]) -> Vec<BranchPerformance> {
    let mut by_branch: BTreeMap<&str, (u64, u64)> = BTreeMap::new();
    for r in records {
        let entry = by_branch.entry(&r.clinic_name).or_default();
        entry.0 += 1;
        if r.member_status == "Active" {
            entry.1 += 1;
        }
    }
    by_branch
        .into_iter()
        .map(|(branch, (total, active))| BranchPerformance {
            branch: branch.to_string(),
            total,
            active,
            retention_rate: retention(active, total),
        })
        .collect()
}

// =============================================================================
// Agent summaries
// =============================================================================

/// One summary row per agent: distinct subscriber count plus a zero-filled
/// status breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSummaryRow {
    pub agent_name: String,
    /// Count of distinct subscriber names for this agent.
    pub total_subscribers: u64,
    /// Counts per status, parallel to [`AgentSummary::statuses`].
    pub status_counts: Vec<u64>,
}

/// The agent performance summary table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSummary {
    /// Distinct statuses, sorted - the pivot columns.
    pub statuses: Vec<String>,
    /// One row per agent, sorted by agent name.
    pub rows: Vec<AgentSummaryRow>,
}

/// Build the per-agent summary: distinct-subscriber count merged with the
/// status pivot, absent statuses filled with zero.
pub fn agent_summary(records: &[AgentEvalRecord]) -> AgentSummary {
    let mut subscribers: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    let mut status_breakdown: BTreeMap<&str, BTreeMap<&str, u64>> = BTreeMap::new();
    let mut statuses: BTreeSet<&str> = BTreeSet::new();

    for r in records {
        subscribers
            .entry(&r.agent_name)
            .or_default()
            .insert(&r.subscriber_name);
        statuses.insert(&r.status);
        *status_breakdown
            .entry(&r.agent_name)
            .or_default()
            .entry(&r.status)
            .or_default() += 1;
    }

    let statuses: Vec<String> = statuses.into_iter().map(String::from).collect();
    let rows = subscribers
        .into_iter()
        .map(|(agent, names)| {
            let breakdown = status_breakdown.get(agent);
            AgentSummaryRow {
                agent_name: agent.to_string(),
                total_subscribers: names.len() as u64,
                status_counts: statuses
                    .iter()
                    .map(|s| {
                        breakdown
                            .and_then(|b| b.get(s.as_str()).copied())
                            .unwrap_or(0)
                    })
                    .collect(),
            }
        })
        .collect();

    AgentSummary { statuses, rows }
}

/// Top N agents by distinct subscriber count.
pub fn top_agents(summary: &AgentSummary, n: usize) -> Vec<CategoryCount> {
    top_n(
        summary
            .rows
            .iter()
            .map(|r| CategoryCount {
                label: r.agent_name.clone(),
                count: r.total_subscribers,
            })
            .collect(),
        n,
    )
}

/// Overall subscriber status distribution.
pub fn status_distribution(records: &[AgentEvalRecord]) -> Vec<CategoryCount> {
    count_by(records.iter().map(|r| r.status.as_str()))
}

/// Drill-down for a single agent: their rows plus a status distribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDrilldown {
    pub agent_name: String,
    pub records: Vec<AgentEvalRecord>,
    pub status_counts: Vec<CategoryCount>,
}

/// Select one agent's records from the filtered set.
pub fn agent_drilldown(records: &[AgentEvalRecord], agent: &str) -> AgentDrilldown {
    let records: Vec<AgentEvalRecord> = records
        .iter()
        .filter(|r| r.agent_name == agent)
        .cloned()
        .collect();
    let status_counts = status_distribution(&records);
    AgentDrilldown {
        agent_name: agent.to_string(),
        records,
        status_counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(branch: &str, gender: &str, status: &str, age: i32) -> MemberRecord {
        MemberRecord {
            member_status: status.into(),
            gender: gender.into(),
            clinic_name: branch.into(),
            dob: None,
            created_date: None,
            activation_date: None,
            age: Some(age),
        }
    }

    fn eval(agent: &str, subscriber: &str, status: &str) -> AgentEvalRecord {
        AgentEvalRecord {
            agent_name: agent.into(),
            subscriber_name: subscriber.into(),
            status: status.into(),
            date: None,
            year: None,
            month: None,
            month_name: None,
            extra: Default::default(),
        }
    }

    #[test]
    fn test_count_by_sorted_by_label() {
        let counts = count_by(["b", "a", "b", "c", "b"]);
        assert_eq!(
            counts,
            vec![
                CategoryCount { label: "a".into(), count: 1 },
                CategoryCount { label: "b".into(), count: 3 },
                CategoryCount { label: "c".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_top_n_descending() {
        let counts = count_by(["a", "b", "b", "c", "c", "c"]);
        let top = top_n(counts, 2);
        assert_eq!(top[0].label, "c");
        assert_eq!(top[1].label, "b");
    }

    #[test]
    fn test_count_by_empty() {
        assert!(count_by(std::iter::empty::<&str>()).is_empty());
    }

    // Pivot property: each row's column sum equals the flat group-by count
    // for that key.
    #[test]
    fn test_pivot_row_sums_match_flat_groupby() {
        let members = vec![
            member("A", "Female", "Active", 30),
            member("A", "Male", "Active", 40),
            member("A", "Female", "Inactive", 50),
            member("B", "Male", "Active", 60),
        ];
        let pivot = gender_by_branch(&members);
        let flat = branch_counts(&members);

        assert_eq!(pivot.columns, vec!["Female", "Male"]);
        for row in &pivot.rows {
            let flat_count = flat.iter().find(|c| c.label == row.key).unwrap().count;
            assert_eq!(row.total(), flat_count);
        }
        // Zero-fill: branch B has no Female rows.
        let b = pivot.rows.iter().find(|r| r.key == "B").unwrap();
        assert_eq!(b.counts, vec![0, 1]);
    }

    #[test]
    fn test_branch_performance_scenario() {
        let members = vec![
            member("A", "Female", "Active", 30),
            member("A", "Male", "Inactive", 40),
            member("B", "Female", "Active", 50),
        ];
        let perf = branch_performance(&members);
        assert_eq!(perf.len(), 2);

        let a = &perf[0];
        assert_eq!((a.branch.as_str(), a.total, a.active), ("A", 2, 1));
        assert_eq!(a.retention_rate, 50.0);

        let b = &perf[1];
        assert_eq!((b.branch.as_str(), b.total, b.active), ("B", 1, 1));
        assert_eq!(b.retention_rate, 100.0);
    }

    #[test]
    fn test_retention_bounds_and_zero_total() {
        let empty = overview(&[]);
        assert_eq!(empty.total, 0);
        assert_eq!(empty.retention_rate, 0.0);

        let one_third = overview(&[
            member("A", "F", "Active", 1),
            member("A", "F", "Inactive", 1),
            member("A", "F", "Inactive", 1),
        ]);
        assert_eq!(one_third.retention_rate, 33.3);
        assert!((0.0..=100.0).contains(&one_third.retention_rate));
    }

    #[test]
    fn test_children_by_branch() {
        let mut no_age = member("C", "F", "Active", 0);
        no_age.age = None;
        let members = vec![
            member("A", "F", "Active", 10),
            member("A", "F", "Active", 17),
            member("A", "F", "Active", 18),
            member("B", "M", "Active", 5),
            no_age,
        ];
        let children = children_by_branch(&members);
        assert_eq!(
            children,
            vec![
                CategoryCount { label: "A".into(), count: 2 },
                CategoryCount { label: "B".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_agent_summary_distinct_subscribers_and_zero_fill() {
        let evals = vec![
            eval("Jane", "Sub1", "Active"),
            eval("Jane", "Sub1", "Pending"),
            eval("Jane", "Sub2", "Active"),
            eval("Bob", "Sub3", "Inactive"),
        ];
        let summary = agent_summary(&evals);
        assert_eq!(summary.statuses, vec!["Active", "Inactive", "Pending"]);

        let bob = &summary.rows[0];
        assert_eq!(bob.agent_name, "Bob");
        assert_eq!(bob.total_subscribers, 1);
        // Absent statuses are zero, not missing.
        assert_eq!(bob.status_counts, vec![0, 1, 0]);

        let jane = &summary.rows[1];
        // Sub1 appears twice but counts once.
        assert_eq!(jane.total_subscribers, 2);
        assert_eq!(jane.status_counts, vec![2, 0, 1]);
    }

    #[test]
    fn test_agent_summary_empty_input() {
        let summary = agent_summary(&[]);
        assert!(summary.rows.is_empty());
        assert!(summary.statuses.is_empty());
    }

    #[test]
    fn test_top_agents() {
        let evals = vec![
            eval("Jane", "S1", "Active"),
            eval("Jane", "S2", "Active"),
            eval("Bob", "S3", "Active"),
        ];
        let summary = agent_summary(&evals);
        let top = top_agents(&summary, 1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].label, "Jane");
        assert_eq!(top[0].count, 2);
    }

    #[test]
    fn test_agent_drilldown() {
        let evals = vec![
            eval("Jane", "S1", "Active"),
            eval("Jane", "S2", "Inactive"),
            eval("Bob", "S3", "Active"),
        ];
        let drill = agent_drilldown(&evals, "Jane");
        assert_eq!(drill.records.len(), 2);
        assert_eq!(drill.status_counts.len(), 2);

        let missing = agent_drilldown(&evals, "Nobody");
        assert!(missing.records.is_empty());
        assert!(missing.status_counts.is_empty());
    }
}

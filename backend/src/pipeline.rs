//! High-level pipeline API shared by the CLI and the HTTP server.
//!
//! Combines the stages - ingestion, normalization, filtering, aggregation,
//! export - into the per-page operations a dashboard interaction triggers.
//! Each user interaction recomputes the visible pipeline from the stored
//! records forward; every function here is a bounded, synchronous transform
//! over in-memory tables.

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::api::logs::{log_info, log_success, log_warning};
use crate::error::PipelineResult;
use crate::export;
use crate::filter::{
    agent_months_in_year, filter_agent_evals, filter_members, member_months_in_year,
    AgentCriteria, AgentFilterOptions, DateFilter, MemberCriteria, MemberFilterOptions,
};
use crate::ingest::{read_table, FileFormat};
use crate::summary::{
    agent_drilldown, agent_summary, branch_counts, branch_performance, children_by_branch,
    gender_by_branch, gender_counts, overview, status_distribution, top_agents, AgentDrilldown,
    AgentSummary, BranchPerformance, CategoryCount, Overview, PivotTable,
};
use crate::table::{AgentEvalRecord, MemberRecord};

/// How many agents the "top agents" chart shows.
const TOP_AGENTS: usize = 5;

// =============================================================================
// Uploads
// =============================================================================

/// Parse metadata surfaced after an upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadInfo {
    pub format: String,
    pub encoding: Option<String>,
    pub delimiter: Option<String>,
    pub headers: Vec<String>,
    pub row_count: usize,
}

fn upload_info(parsed: &crate::ingest::IngestedFile) -> UploadInfo {
    UploadInfo {
        format: match parsed.format {
            FileFormat::Csv => "csv".to_string(),
            FileFormat::Xlsx => "xlsx".to_string(),
        },
        encoding: parsed.encoding.clone(),
        delimiter: parsed.delimiter.map(|d| d.to_string()),
        headers: parsed.table.headers.clone(),
        row_count: parsed.table.len(),
    }
}

/// Ingest and normalize a member upload.
pub fn load_member_table(
    bytes: &[u8],
    filename: &str,
) -> PipelineResult<(Vec<MemberRecord>, UploadInfo)> {
    log_info(format!("Reading member file: {}", filename));
    let parsed = read_table(bytes, filename)?;
    let info = upload_info(&parsed);
    if let Some(ref encoding) = info.encoding {
        log_info(format!("Detected encoding: {}", encoding));
    }
    log_success(format!(
        "Read {} rows, {} columns",
        info.row_count,
        info.headers.len()
    ));

    let today = Local::now().date_naive();
    let records = crate::normalize::clean_members(&parsed.table, today)?;
    log_success(format!("Cleaned {} member records", records.len()));
    Ok((records, info))
}

/// Ingest and normalize an agent-evaluation upload.
pub fn load_agent_table(
    bytes: &[u8],
    filename: &str,
) -> PipelineResult<(Vec<AgentEvalRecord>, UploadInfo)> {
    log_info(format!("Reading agent evaluation file: {}", filename));
    let parsed = read_table(bytes, filename)?;
    let info = upload_info(&parsed);
    log_success(format!(
        "Read {} rows, {} columns",
        info.row_count,
        info.headers.len()
    ));

    let now = Local::now().date_naive();
    let records = crate::normalize::clean_agent_evals(&parsed.table, now)?;
    if !crate::normalize::agent_has_date_column(&parsed.table) {
        log_warning("No Date column found; rows stamped with the processing date");
    }
    log_success(format!("Cleaned {} evaluation records", records.len()));
    Ok((records, info))
}

// =============================================================================
// Member insights
// =============================================================================

/// Everything the member page renders for one filter state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberInsights {
    /// True when no date filter could be resolved because the table has no
    /// valid dates in the chosen column.
    pub no_data: bool,
    /// Criteria after default-year resolution, for display.
    pub effective_criteria: MemberCriteria,
    pub filtered_count: usize,
    pub overview: Overview,
    pub branch_counts: Vec<CategoryCount>,
    pub gender_counts: Vec<CategoryCount>,
    pub gender_by_branch: PivotTable,
    pub children_by_branch: Vec<CategoryCount>,
    pub branch_performance: Vec<BranchPerformance>,
    /// Selection options, always from the unfiltered table.
    pub options: MemberFilterOptions,
    /// Months present in the discrete-selected year.
    pub months: Vec<u32>,
}

/// Resolve the date mode: when none was supplied, discrete mode with the
/// latest available year is the default. Returns `None` when the table has
/// no valid dates at all.
fn resolve_member_criteria(
    criteria: &MemberCriteria,
    options: &MemberFilterOptions,
) -> Option<MemberCriteria> {
    let mut resolved = criteria.clone();
    if resolved.date.is_none() {
        let year = options.default_year()?;
        resolved.date = Some(DateFilter::Discrete { year, month: None });
    }
    Some(resolved)
}

/// Recompute the member page from the stored records and one filter state.
pub fn member_insights(records: &[MemberRecord], criteria: &MemberCriteria) -> MemberInsights {
    let options = MemberFilterOptions::from_records(records, criteria.date_field);

    let (filtered, effective, no_data) = match resolve_member_criteria(criteria, &options) {
        Some(effective) => {
            let filtered = filter_members(records, &effective);
            (filtered, effective, false)
        }
        None => (Vec::new(), criteria.clone(), true),
    };

    let months = match effective.date {
        Some(DateFilter::Discrete { year, .. }) => {
            member_months_in_year(records, effective.date_field, year)
        }
        _ => Vec::new(),
    };

    log_info(format!(
        "Showing {} of {} member records after filters",
        filtered.len(),
        records.len()
    ));

    MemberInsights {
        no_data,
        filtered_count: filtered.len(),
        overview: overview(&filtered),
        branch_counts: branch_counts(&filtered),
        gender_counts: gender_counts(&filtered),
        gender_by_branch: gender_by_branch(&filtered),
        children_by_branch: children_by_branch(&filtered),
        branch_performance: branch_performance(&filtered),
        effective_criteria: effective,
        options,
        months,
    }
}

// =============================================================================
// Agent insights
// =============================================================================

/// Everything the agent page renders for one filter state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentInsights {
    /// True when no year could be resolved (no valid dates at all).
    pub no_data: bool,
    pub selected_year: Option<i32>,
    pub selected_month: Option<u32>,
    pub filtered_count: usize,
    pub summary: AgentSummary,
    pub top_agents: Vec<CategoryCount>,
    pub status_distribution: Vec<CategoryCount>,
    /// Drill-down choices, from the filtered set.
    pub agents: Vec<String>,
    /// Selection options, always from the unfiltered table.
    pub options: AgentFilterOptions,
    /// Months present in the selected year.
    pub months: Vec<u32>,
}

/// Apply agent criteria with default-year resolution. Returns the filtered
/// records and the year actually used (`None` = no data).
pub fn agent_filtered(
    records: &[AgentEvalRecord],
    criteria: &AgentCriteria,
) -> (Vec<AgentEvalRecord>, Option<i32>) {
    let options = AgentFilterOptions::from_records(records);
    let year = criteria.year.or_else(|| options.default_year());
    match year {
        Some(year) => {
            let resolved = AgentCriteria {
                year: Some(year),
                ..criteria.clone()
            };
            (filter_agent_evals(records, &resolved), Some(year))
        }
        None => (Vec::new(), None),
    }
}

/// Recompute the agent page from the stored records and one filter state.
pub fn agent_insights(records: &[AgentEvalRecord], criteria: &AgentCriteria) -> AgentInsights {
    let options = AgentFilterOptions::from_records(records);
    let (filtered, selected_year) = agent_filtered(records, criteria);
    let no_data = selected_year.is_none();

    let months = selected_year
        .map(|y| agent_months_in_year(records, y))
        .unwrap_or_default();

    let summary = agent_summary(&filtered);
    let top = top_agents(&summary, TOP_AGENTS);

    let mut agents: Vec<String> = filtered.iter().map(|r| r.agent_name.clone()).collect();
    agents.sort();
    agents.dedup();

    log_info(format!(
        "Showing {} of {} evaluation records after filters",
        filtered.len(),
        records.len()
    ));

    AgentInsights {
        no_data,
        selected_year,
        selected_month: criteria.month,
        filtered_count: filtered.len(),
        status_distribution: status_distribution(&filtered),
        top_agents: top,
        summary,
        agents,
        options,
        months,
    }
}

/// Drill into one agent's records within the current filter state.
pub fn agent_drilldown_view(
    records: &[AgentEvalRecord],
    criteria: &AgentCriteria,
    agent: &str,
) -> AgentDrilldown {
    let (filtered, _) = agent_filtered(records, criteria);
    agent_drilldown(&filtered, agent)
}

// =============================================================================
// Exports
// =============================================================================

/// Agent performance summary as an XLSX download buffer.
pub fn agent_summary_export(
    records: &[AgentEvalRecord],
    criteria: &AgentCriteria,
) -> PipelineResult<Vec<u8>> {
    let (filtered, _) = agent_filtered(records, criteria);
    let summary = agent_summary(&filtered);
    log_info(format!("Exporting summary for {} agents", summary.rows.len()));
    Ok(export::agent_summary_xlsx(&summary)?)
}

/// One agent's records as an XLSX download buffer.
pub fn agent_details_export(
    records: &[AgentEvalRecord],
    criteria: &AgentCriteria,
    agent: &str,
) -> PipelineResult<Vec<u8>> {
    let drill = agent_drilldown_view(records, criteria, agent);
    log_info(format!(
        "Exporting {} records for {}",
        drill.records.len(),
        agent
    ));
    Ok(export::agent_details_xlsx(&drill.records)?)
}

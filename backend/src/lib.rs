//! # DataDash - membership and agent-performance analytics
//!
//! DataDash ingests membership and agent-evaluation tables (CSV or XLSX),
//! normalizes them into typed records, and serves filtered aggregates -
//! counts, pivots, retention rates, agent summaries - plus XLSX downloads.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV/XLSX   │────▶│  Normalize  │────▶│   Filter    │────▶│  Aggregate  │
//! │  (auto-enc) │     │  (typed)    │     │  (criteria) │     │  (JSON/XLSX)│
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use datadash::{load_member_table, member_insights, MemberCriteria};
//!
//! let bytes = std::fs::read("members.csv").unwrap();
//! let (records, _info) = load_member_table(&bytes, "members.csv").unwrap();
//! let insights = member_insights(&records, &MemberCriteria::default());
//! println!("{} members match", insights.filtered_count);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`table`] - Raw tables and typed records
//! - [`ingest`] - CSV/XLSX reading with auto-detection
//! - [`normalize`] - Header and value cleaning
//! - [`filter`] - Criteria, predicates and option lists
//! - [`summary`] - Counts, pivots and agent summaries
//! - [`export`] - XLSX workbook writing
//! - [`pipeline`] - Per-page operations shared by CLI and server
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod table;

// Ingestion
pub mod ingest;

// Cleaning
pub mod normalize;

// Analytics
pub mod filter;
pub mod summary;

// Exports
pub mod export;

// Pipeline
pub mod pipeline;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ExportError, IngestError, PipelineError, SchemaError, ServerError,
};

// =============================================================================
// Re-exports - Records and tables
// =============================================================================

pub use table::{AgentEvalRecord, MemberRecord, RawTable};

// =============================================================================
// Re-exports - Ingestion
// =============================================================================

pub use ingest::{detect_format, read_table, FileFormat, IngestedFile};

// =============================================================================
// Re-exports - Filtering
// =============================================================================

pub use filter::{
    AgentCriteria, AgentFilterOptions, DateField, DateFilter, MemberCriteria,
    MemberFilterOptions,
};

// =============================================================================
// Re-exports - Pipeline operations
// =============================================================================

pub use pipeline::{
    agent_details_export, agent_drilldown_view, agent_insights, agent_summary_export,
    load_agent_table, load_member_table, member_insights, AgentInsights, MemberInsights,
    UploadInfo,
};

//! REST API types for dashboard clients.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::filter::AgentCriteria;
use crate::pipeline::UploadInfo;

/// Response sent after a table upload was ingested and normalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Unique job identifier
    pub job_id: String,

    /// Which stored table this upload replaced: "member" or "agent"
    pub table: String,

    /// Parse metadata (format, encoding, delimiter, headers, row count)
    pub info: UploadInfo,

    /// Number of normalized records now stored
    pub record_count: usize,
}

impl UploadResponse {
    pub fn new(table: &str, info: UploadInfo, record_count: usize) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            table: table.to_string(),
            info,
            record_count,
        }
    }
}

/// Drill-down and details-export request: one agent within a filter state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrilldownRequest {
    /// Agent to drill into
    pub agent: String,

    /// Current filter state
    #[serde(default)]
    pub criteria: AgentCriteria,
}

/// Create an error response body
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
    })
}

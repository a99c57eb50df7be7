//! Error types for the DataDash pipeline.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`IngestError`] - file reading / parsing errors
//! - [`SchemaError`] - normalization errors (missing required columns)
//! - [`ExportError`] - XLSX export errors
//! - [`PipelineError`] - top-level orchestration errors
//! - [`ServerError`] - HTTP server errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Ingestion Errors
// =============================================================================

/// Errors while reading an uploaded file into a raw table.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// File extension is not .csv/.xlsx/.xls.
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Failed to decode bytes with the detected encoding.
    #[error("Failed to decode content: {0}")]
    EncodingError(String),

    /// Invalid spreadsheet content.
    #[error("Invalid spreadsheet: {0}")]
    SpreadsheetError(String),

    /// Empty file.
    #[error("Uploaded file is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No column headers found")]
    NoHeaders,
}

// =============================================================================
// Schema Errors
// =============================================================================

/// Errors while normalizing a raw table into typed records.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A required column is absent. Fatal for the page's pipeline.
    #[error("Required column missing: {0}")]
    MissingColumn(String),
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while building an XLSX download buffer.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The workbook writer failed.
    #[error("Workbook error: {0}")]
    Workbook(String),
}

impl From<rust_xlsxwriter::XlsxError> for ExportError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        ExportError::Workbook(e.to_string())
    }
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the main error type returned by the [`crate::pipeline`] entry
/// points. It wraps all lower-level errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Ingestion error.
    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    /// Normalization error.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Export error.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// No table has been uploaded for this page yet.
    #[error("No {0} table uploaded")]
    NoTable(&'static str),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Result type for normalization operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // IngestError -> PipelineError
        let ingest_err = IngestError::EmptyFile;
        let pipeline_err: PipelineError = ingest_err.into();
        assert!(pipeline_err.to_string().contains("empty"));

        // SchemaError -> PipelineError
        let schema_err = SchemaError::MissingColumn("Gender".into());
        let pipeline_err: PipelineError = schema_err.into();
        assert!(pipeline_err.to_string().contains("Gender"));
    }

    #[test]
    fn test_unsupported_format_message() {
        let err = IngestError::UnsupportedFormat("report.pdf".into());
        assert!(err.to_string().contains("report.pdf"));
    }

    #[test]
    fn test_no_table_message() {
        let err = ServerError::NoTable("member");
        assert!(err.to_string().contains("member"));
    }
}

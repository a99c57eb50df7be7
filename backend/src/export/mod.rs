//! XLSX export: summary and drill-down tables as downloadable buffers.
//!
//! Workbooks are built in memory and returned as byte buffers for HTTP
//! downloads, advertised with the legacy spreadsheet MIME type existing
//! clients already handle.

use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::collections::BTreeSet;

use crate::error::ExportResult;
use crate::summary::AgentSummary;
use crate::table::AgentEvalRecord;

/// Legacy spreadsheet MIME type used for downloads.
pub const XLSX_MIME: &str = "application/vnd.ms-excel";

/// Download name for the agent performance summary.
pub const AGENT_SUMMARY_FILENAME: &str = "agent_summary.xlsx";

/// Download name for one agent's subscriber details.
pub fn agent_details_filename(agent: &str) -> String {
    format!("{}_details.xlsx", agent)
}

fn write_header(sheet: &mut Worksheet, headers: &[&str]) -> ExportResult<()> {
    let bold = Format::new().set_bold();
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }
    Ok(())
}

/// Render the agent summary table as an XLSX buffer.
///
/// Columns: `Agent Name`, `Total Subscribers`, then one column per status
/// in the summary's order.
pub fn agent_summary_xlsx(summary: &AgentSummary) -> ExportResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    let mut headers = vec!["Agent Name", "Total Subscribers"];
    headers.extend(summary.statuses.iter().map(String::as_str));
    write_header(sheet, &headers)?;

    for (i, row) in summary.rows.iter().enumerate() {
        let r = (i + 1) as u32;
        sheet.write_string(r, 0, &row.agent_name)?;
        sheet.write_number(r, 1, row.total_subscribers as f64)?;
        for (j, count) in row.status_counts.iter().enumerate() {
            sheet.write_number(r, (j + 2) as u16, *count as f64)?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// Render one agent's evaluation records as an XLSX buffer.
///
/// Fixed columns first, then any extra uploaded columns (union across the
/// records, sorted by name).
pub fn agent_details_xlsx(records: &[AgentEvalRecord]) -> ExportResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    let extra_columns: Vec<String> = records
        .iter()
        .flat_map(|r| r.extra.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut headers = vec![
        "Agent Name",
        "Subscriber Name",
        "Status",
        "Date",
        "Year",
        "Month",
        "Month Name",
    ];
    headers.extend(extra_columns.iter().map(String::as_str));
    write_header(sheet, &headers)?;

    for (i, record) in records.iter().enumerate() {
        let r = (i + 1) as u32;
        sheet.write_string(r, 0, &record.agent_name)?;
        sheet.write_string(r, 1, &record.subscriber_name)?;
        sheet.write_string(r, 2, &record.status)?;
        match record.date {
            Some(d) => sheet.write_string(r, 3, d.format("%Y-%m-%d").to_string())?,
            None => sheet.write_string(r, 3, "")?,
        };
        match record.year {
            Some(y) => sheet.write_number(r, 4, y as f64)?,
            None => sheet.write_string(r, 4, "")?,
        };
        match record.month {
            Some(m) => sheet.write_number(r, 5, m as f64)?,
            None => sheet.write_string(r, 5, "")?,
        };
        sheet.write_string(r, 6, record.month_name.as_deref().unwrap_or(""))?;
        for (j, column) in extra_columns.iter().enumerate() {
            let value = record.extra.get(column).map(String::as_str).unwrap_or("");
            sheet.write_string(r, (j + 7) as u16, value)?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::parse_xlsx;
    use crate::summary::AgentSummaryRow;

    #[test]
    fn test_details_filename() {
        assert_eq!(agent_details_filename("Jane Doe"), "Jane Doe_details.xlsx");
    }

    #[test]
    fn test_summary_export_readable_back() {
        let summary = AgentSummary {
            statuses: vec!["Active".into(), "Inactive".into()],
            rows: vec![AgentSummaryRow {
                agent_name: "Jane".into(),
                total_subscribers: 3,
                status_counts: vec![2, 1],
            }],
        };
        let bytes = agent_summary_xlsx(&summary).unwrap();
        assert!(!bytes.is_empty());

        let table = parse_xlsx(&bytes).unwrap();
        assert_eq!(
            table.headers,
            vec!["Agent Name", "Total Subscribers", "Active", "Inactive"]
        );
        assert_eq!(table.cell(0, "Agent Name"), Some("Jane"));
        assert_eq!(table.cell(0, "Total Subscribers"), Some("3"));
        assert_eq!(table.cell(0, "Inactive"), Some("1"));
    }

    #[test]
    fn test_details_export_includes_extras() {
        let mut record = AgentEvalRecord {
            agent_name: "Jane".into(),
            subscriber_name: "S1".into(),
            status: "Active".into(),
            date: None,
            year: None,
            month: None,
            month_name: None,
            extra: Default::default(),
        };
        record
            .extra
            .insert("Region".to_string(), "West".to_string());
        record.set_date(chrono::NaiveDate::from_ymd_opt(2024, 7, 15));

        let bytes = agent_details_xlsx(&[record]).unwrap();
        let table = parse_xlsx(&bytes).unwrap();
        assert!(table.headers.contains(&"Region".to_string()));
        assert_eq!(table.cell(0, "Region"), Some("West"));
        assert_eq!(table.cell(0, "Date"), Some("2024-07-15"));
        assert_eq!(table.cell(0, "Month Name"), Some("July"));
    }

    #[test]
    fn test_empty_exports_are_valid_workbooks() {
        let summary = AgentSummary {
            statuses: vec![],
            rows: vec![],
        };
        let bytes = agent_summary_xlsx(&summary).unwrap();
        let table = parse_xlsx(&bytes).unwrap();
        assert!(table.is_empty());

        let bytes = agent_details_xlsx(&[]).unwrap();
        let table = parse_xlsx(&bytes).unwrap();
        assert!(table.is_empty());
    }
}

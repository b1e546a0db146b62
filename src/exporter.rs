// Export pipeline
//
// Fetch, extract, flatten, render, with the transport hidden behind
// ReportSource. The session workaround (mobile-browser impersonation,
// hand-copied cookie) is the fragile part of this tool, so it stays on
// the far side of that trait: swapping how payloads are obtained never
// touches the export logic.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use crate::csv;
use crate::error::ExportError;
use crate::http_client::VendorClient;
use crate::records::{self, Record, RecordPath};

/// Where report payloads come from
#[async_trait]
pub trait ReportSource {
    async fn fetch_report(&self, report_id: &str) -> Result<Value, ExportError>;
}

#[async_trait]
impl ReportSource for VendorClient {
    async fn fetch_report(&self, report_id: &str) -> Result<Value, ExportError> {
        VendorClient::fetch_report(self, report_id).await
    }
}

/// Turns report payloads into one CSV document
pub struct Exporter<S> {
    source: S,

    /// Where the record objects live inside each payload
    records_path: RecordPath,

    /// Explicit column projection; empty means discover columns from the
    /// records in first-seen order
    fields: Vec<String>,
}

impl<S: ReportSource> Exporter<S> {
    pub fn new(source: S, records_path: RecordPath, fields: Vec<String>) -> Self {
        Self {
            source,
            records_path,
            fields,
        }
    }

    /// Fetch every report and render the combined CSV.
    ///
    /// Every record in every response becomes exactly one row, with no
    /// drops and no deduplication, ordered by report argument order and
    /// then payload order within a report.
    pub async fn export(&self, report_ids: &[String]) -> Result<String, ExportError> {
        let mut records: Vec<Record> = Vec::new();

        for report_id in report_ids {
            let payload = self.source.fetch_report(report_id).await?;
            let mut batch =
                self.records_path
                    .extract(&payload)
                    .map_err(|e| ExportError::Parse {
                        report_id: report_id.clone(),
                        reason: e.to_string(),
                    })?;
            tracing::info!(report_id = %report_id, records = batch.len(), "report fetched");
            records.append(&mut batch);
        }

        let columns = if self.fields.is_empty() {
            records::discover_columns(&records)
        } else {
            self.fields.clone()
        };

        let rows: Vec<Vec<String>> = records
            .iter()
            .map(|record| records::flatten_record(record, &columns))
            .collect();

        tracing::info!(
            rows = rows.len(),
            columns = columns.len(),
            "records flattened"
        );

        Ok(csv::render(&columns, &rows))
    }
}

/// Write the rendered CSV to `out`, or to stdout when no path is given.
///
/// The document arrives fully rendered, so the file case is a single
/// `fs::write`: the file either appears with the complete CSV or is not
/// created at all. Missing parent directories are created.
pub fn write_output(out: Option<&Path>, document: &str) -> Result<(), ExportError> {
    match out {
        None => std::io::stdout()
            .lock()
            .write_all(document.as_bytes())
            .map_err(|e| ExportError::Filesystem {
                path: PathBuf::from("<stdout>"),
                source: e,
            }),
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    fs::create_dir_all(parent).map_err(|e| ExportError::Filesystem {
                        path: path.to_path_buf(),
                        source: e,
                    })?;
                }
            }
            fs::write(path, document).map_err(|e| ExportError::Filesystem {
                path: path.to_path_buf(),
                source: e,
            })
        }
    }
}

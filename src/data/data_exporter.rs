use crate::data::data_provider::ExportSink;
use crate::data::model::{Column, Row};
use crate::data::snapshot::TableSnapshot;
use crate::error::ExportError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::info;

/// One flat record per row, keyed by column name
pub type ExportRecord = Map<String, Value>;

/// A table denormalized for an export sink
#[derive(Debug, Clone, PartialEq)]
pub struct ExportPayload {
    /// Column names in display order
    pub column_names: Vec<String>,
    pub records: Vec<ExportRecord>,
}

impl ExportPayload {
    pub fn from_snapshot(snapshot: &TableSnapshot) -> Self {
        Self::new(snapshot.rows().iter().map(|row| row.as_ref()), snapshot.columns())
    }

    pub fn new<'a>(rows: impl IntoIterator<Item = &'a Row>, columns: &[Column]) -> Self {
        Self {
            column_names: columns.iter().map(|c| c.name.clone()).collect(),
            records: denormalize(rows, columns),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Re-key each row's values from column id to column name.
///
/// Rows keep fetch order. Cells missing from a row are left out of its record.
/// If two columns share a name the later column wins.
pub fn denormalize<'a>(
    rows: impl IntoIterator<Item = &'a Row>,
    columns: &[Column],
) -> Vec<ExportRecord> {
    rows.into_iter()
        .map(|row| {
            let mut record = Map::new();
            for column in columns {
                if let Some(value) = row.value(&column.id) {
                    record.insert(column.name.clone(), value.to_json());
                }
            }
            record
        })
        .collect()
}

/// Writes the export to a local CSV file
pub struct CsvFileSink {
    path: PathBuf,
}

impl CsvFileSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn field_text(value: Option<&Value>) -> String {
        match value {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

#[async_trait]
impl ExportSink for CsvFileSink {
    fn name(&self) -> &str {
        "csv"
    }

    async fn push(&self, payload: &ExportPayload) -> Result<(), ExportError> {
        let mut wtr = csv::Writer::from_path(&self.path)?;
        wtr.write_record(&payload.column_names)?;

        for record in &payload.records {
            let fields: Vec<String> = payload
                .column_names
                .iter()
                .map(|name| Self::field_text(record.get(name)))
                .collect();
            wtr.write_record(&fields)?;
        }

        wtr.flush()?;
        info!(target: "export", "Wrote {} rows to {}", payload.len(), self.path.display());
        Ok(())
    }
}

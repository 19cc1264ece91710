//! The table currently shown: metadata, ordered columns and rows
//!
//! Rows sit behind `Arc` so an edit can swap a single row while every other
//! row stays pointer-equal to the previous snapshot.

use crate::data::model::{CellValue, Column, Row, Table};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct TableSnapshot {
    document_id: String,
    metadata: Arc<Table>,
    columns: Arc<[Column]>,
    rows: Vec<Arc<Row>>,
}

impl TableSnapshot {
    /// `columns` must already be in display order
    pub fn new(
        document_id: impl Into<String>,
        metadata: Table,
        columns: Vec<Column>,
        rows: Vec<Row>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            metadata: Arc::new(metadata),
            columns: columns.into(),
            rows: rows.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn table_id(&self) -> &str {
        &self.metadata.id
    }

    pub fn metadata(&self) -> &Table {
        &self.metadata
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Rows in fetch order
    pub fn rows(&self) -> &[Arc<Row>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column(&self, column_id: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == column_id)
    }

    pub fn row(&self, row_id: &str) -> Option<&Arc<Row>> {
        self.rows.iter().find(|r| r.id == row_id)
    }

    pub fn cell(&self, row_id: &str, column_id: &str) -> Option<&CellValue> {
        self.row(row_id).and_then(|row| row.value(column_id))
    }

    /// Rows ordered by `index`. Duplicate indices keep fetch order.
    pub fn sorted_rows(&self) -> Vec<&Row> {
        let mut rows: Vec<&Row> = self.rows.iter().map(Arc::as_ref).collect();
        rows.sort_by_key(|row| row.index);
        rows
    }

    /// Same snapshot with the row at `position` swapped out
    pub(crate) fn with_row_replaced(&self, position: usize, row: Row) -> Self {
        let mut rows = self.rows.clone();
        rows[position] = Arc::new(row);
        Self {
            document_id: self.document_id.clone(),
            metadata: Arc::clone(&self.metadata),
            columns: Arc::clone(&self.columns),
            rows,
        }
    }

    pub(crate) fn row_position(&self, row_id: &str) -> Option<usize> {
        self.rows.iter().position(|r| r.id == row_id)
    }

    /// Whether both snapshots share the same column list allocation
    pub fn shares_columns_with(&self, other: &TableSnapshot) -> bool {
        Arc::ptr_eq(&self.columns, &other.columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(rows: Vec<Row>) -> TableSnapshot {
        let table = Table {
            id: "grid-1".into(),
            name: "Data".into(),
            parent: None,
        };
        TableSnapshot::new("doc-1", table, vec![], rows)
    }

    #[test]
    fn test_sorted_rows_by_index() {
        let snap = snapshot(vec![Row::new("r3", 3), Row::new("r1", 1), Row::new("r2", 2)]);
        let ids: Vec<&str> = snap.sorted_rows().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "r2", "r3"]);
        // fetch order untouched
        assert_eq!(snap.rows()[0].id, "r3");
    }

    #[test]
    fn test_sorted_rows_stable_for_duplicate_indices() {
        let snap = snapshot(vec![
            Row::new("b", 1),
            Row::new("x", 0),
            Row::new("a", 1),
            Row::new("c", 1),
        ]);
        let ids: Vec<&str> = snap.sorted_rows().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "b", "a", "c"]);
    }

    #[test]
    fn test_cell_lookup_is_sparse() {
        let snap = snapshot(vec![Row::new("r1", 0).with_value("c1", "v")]);
        assert_eq!(snap.cell("r1", "c1"), Some(&CellValue::from("v")));
        assert_eq!(snap.cell("r1", "c2"), None);
        assert_eq!(snap.cell("nope", "c1"), None);
    }
}

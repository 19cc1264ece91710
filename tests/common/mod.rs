//! In-memory store used by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use grid_sync::data::data_exporter::ExportPayload;
use grid_sync::data::data_provider::{Account, DataProvider, ExportSink};
use grid_sync::data::model::{Column, Document, Page, PageRef, Row, Table};
use grid_sync::error::{ExportError, ProviderError};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    Documents,
    Pages,
    Tables,
    Metadata,
    Columns,
    Rows,
    Update,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCall {
    pub table_id: String,
    pub row_id: String,
    pub column_id: String,
    pub value: String,
}

#[derive(Default)]
struct FakeData {
    documents: Vec<Document>,
    pages: HashMap<String, Vec<Page>>,
    /// document id -> tables, parent included (metadata view)
    tables: HashMap<String, Vec<Table>>,
    columns: HashMap<String, Vec<Column>>,
    rows: HashMap<String, Vec<Row>>,
    /// (call, key) pairs that fail; key is a document, table or "row/column" id
    failures: HashSet<(Call, String)>,
    gates: HashMap<(Call, String), Arc<Notify>>,
    updates: Vec<UpdateCall>,
}

#[derive(Clone, Default)]
pub struct FakeProvider {
    data: Arc<Mutex<FakeData>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_document(&self, id: &str, name: &str) -> &Self {
        self.data.lock().unwrap().documents.push(Document {
            id: id.into(),
            name: name.into(),
            browser_url: None,
        });
        self
    }

    pub fn add_page(&self, document_id: &str, id: &str, parent: Option<&str>) -> &Self {
        self.data
            .lock()
            .unwrap()
            .pages
            .entry(document_id.into())
            .or_default()
            .push(Page {
                id: id.into(),
                name: format!("Page {id}"),
                parent: parent.map(PageRef::page),
            });
        self
    }

    /// Add a table with columns `c1..cN` named `Col 1..N` and no rows
    pub fn add_table(&self, document_id: &str, id: &str, page: Option<&str>, columns: usize) -> &Self {
        let mut data = self.data.lock().unwrap();
        data.tables.entry(document_id.into()).or_default().push(Table {
            id: id.into(),
            name: format!("Table {id}"),
            parent: page.map(PageRef::page),
        });
        data.columns.insert(
            id.into(),
            (1..=columns)
                .map(|i| Column {
                    id: format!("c{i}"),
                    name: format!("Col {i}"),
                })
                .collect(),
        );
        data.rows.entry(id.into()).or_default();
        self
    }

    pub fn set_columns(&self, table_id: &str, columns: Vec<Column>) -> &Self {
        self.data.lock().unwrap().columns.insert(table_id.into(), columns);
        self
    }

    pub fn set_rows(&self, table_id: &str, rows: Vec<Row>) -> &Self {
        self.data.lock().unwrap().rows.insert(table_id.into(), rows);
        self
    }

    pub fn fail(&self, call: Call, key: &str) -> &Self {
        self.data.lock().unwrap().failures.insert((call, key.into()));
        self
    }

    pub fn heal(&self, call: Call, key: &str) -> &Self {
        self.data.lock().unwrap().failures.remove(&(call, key.into()));
        self
    }

    /// Hold `call` for `key` until the returned handle is notified
    pub fn gate(&self, call: Call, key: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.data
            .lock()
            .unwrap()
            .gates
            .insert((call, key.into()), Arc::clone(&notify));
        notify
    }

    pub fn updates(&self) -> Vec<UpdateCall> {
        self.data.lock().unwrap().updates.clone()
    }

    async fn enter(&self, call: Call, key: &str) -> Result<(), ProviderError> {
        let gate = self
            .data
            .lock()
            .unwrap()
            .gates
            .remove(&(call, key.to_string()));
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.data.lock().unwrap().failures.contains(&(call, key.to_string())) {
            return Err(ProviderError::Http {
                status: 500,
                message: format!("{call:?} {key} unavailable"),
            });
        }
        Ok(())
    }

    fn not_found(what: &str, id: &str) -> ProviderError {
        ProviderError::Http {
            status: 404,
            message: format!("{what} {id} not found"),
        }
    }
}

#[async_trait]
impl DataProvider for FakeProvider {
    async fn whoami(&self) -> Result<Account, ProviderError> {
        Ok(Account {
            name: "Test User".into(),
            login_id: Some("test@example.com".into()),
        })
    }

    async fn list_documents(&self) -> Result<Vec<Document>, ProviderError> {
        self.enter(Call::Documents, "").await?;
        Ok(self.data.lock().unwrap().documents.clone())
    }

    async fn get_pages(&self, document_id: &str) -> Result<Vec<Page>, ProviderError> {
        self.enter(Call::Pages, document_id).await?;
        Ok(self
            .data
            .lock()
            .unwrap()
            .pages
            .get(document_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_tables(&self, document_id: &str) -> Result<Vec<Table>, ProviderError> {
        self.enter(Call::Tables, document_id).await?;
        let tables = self
            .data
            .lock()
            .unwrap()
            .tables
            .get(document_id)
            .cloned()
            .unwrap_or_default();
        // the list endpoint does not carry parents
        Ok(tables
            .into_iter()
            .map(|t| Table { parent: None, ..t })
            .collect())
    }

    async fn get_table_metadata(
        &self,
        document_id: &str,
        table_id: &str,
    ) -> Result<Table, ProviderError> {
        self.enter(Call::Metadata, table_id).await?;
        self.data
            .lock()
            .unwrap()
            .tables
            .get(document_id)
            .and_then(|tables| tables.iter().find(|t| t.id == table_id).cloned())
            .ok_or_else(|| Self::not_found("table", table_id))
    }

    async fn get_columns(
        &self,
        _document_id: &str,
        table_id: &str,
    ) -> Result<Vec<Column>, ProviderError> {
        self.enter(Call::Columns, table_id).await?;
        self.data
            .lock()
            .unwrap()
            .columns
            .get(table_id)
            .cloned()
            .ok_or_else(|| Self::not_found("table", table_id))
    }

    async fn get_rows(&self, _document_id: &str, table_id: &str) -> Result<Vec<Row>, ProviderError> {
        self.enter(Call::Rows, table_id).await?;
        self.data
            .lock()
            .unwrap()
            .rows
            .get(table_id)
            .cloned()
            .ok_or_else(|| Self::not_found("table", table_id))
    }

    async fn get_row(
        &self,
        document_id: &str,
        table_id: &str,
        row_id: &str,
    ) -> Result<Row, ProviderError> {
        self.get_rows(document_id, table_id)
            .await?
            .into_iter()
            .find(|r| r.id == row_id)
            .ok_or_else(|| Self::not_found("row", row_id))
    }

    async fn update_cell(
        &self,
        _document_id: &str,
        table_id: &str,
        row_id: &str,
        column_id: &str,
        value: &str,
    ) -> Result<(), ProviderError> {
        self.enter(Call::Update, &format!("{row_id}/{column_id}")).await?;
        self.data.lock().unwrap().updates.push(UpdateCall {
            table_id: table_id.into(),
            row_id: row_id.into(),
            column_id: column_id.into(),
            value: value.into(),
        });
        Ok(())
    }
}

/// Export sink that keeps what it receives
#[derive(Default)]
pub struct RecordingSink {
    pub received: Mutex<Vec<ExportPayload>>,
}

#[async_trait]
impl ExportSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn push(&self, payload: &ExportPayload) -> Result<(), ExportError> {
        self.received.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

/// Document "doc" with page "home" holding "grid-a" and "grid-b", subpage
/// "sub" holding "grid-c", and an orphan "grid-x"
pub fn sample_store() -> FakeProvider {
    let fake = FakeProvider::new();
    fake.add_document("doc", "Playground")
        .add_document("empty-doc", "Nothing here")
        .add_page("doc", "home", None)
        .add_page("doc", "sub", Some("home"))
        .add_page("empty-doc", "blank", None)
        .add_table("doc", "grid-a", Some("home"), 2)
        .add_table("doc", "grid-b", Some("home"), 3)
        .add_table("doc", "grid-c", Some("sub"), 1)
        .add_table("doc", "grid-x", Some("deleted-page"), 1)
        .set_rows(
            "grid-a",
            vec![
                Row::new("r2", 1).with_value("c1", "Bob").with_value("c2", 41),
                Row::new("r1", 0).with_value("c1", "Alice").with_value("c2", 30),
            ],
        )
        .set_rows("grid-b", vec![Row::new("b1", 0).with_value("c3", "only")]);
    fake
}

//! Optimistic cell edits
//!
//! An edit lands in the snapshot synchronously, then a background task writes
//! it to the store. Write outcomes are never fed back into the snapshot.

use crate::data::data_provider::DataProvider;
use crate::data::model::CellValue;
use crate::data::snapshot::TableSnapshot;
use crate::error::{EditError, PersistError};
use chrono::{DateTime, Local};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Maximum number of failure notices kept for display
const MAX_NOTICES: usize = 50;

/// What happens to the local value when its background write fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PersistFailurePolicy {
    /// Local edits are trusted over transient failures; a refresh resyncs
    #[default]
    KeepOptimistic,
}

pub const KEEP_OPTIMISTIC_ON_PERSIST_FAILURE: PersistFailurePolicy =
    PersistFailurePolicy::KeepOptimistic;

/// Apply one cell edit to a snapshot.
///
/// Only the target row is rebuilt, every other row and the column list are
/// shared with `snapshot`.
pub fn apply_edit(
    snapshot: &TableSnapshot,
    row_id: &str,
    column_id: &str,
    value: CellValue,
) -> Result<TableSnapshot, EditError> {
    let position = snapshot
        .row_position(row_id)
        .ok_or_else(|| EditError::UnknownRow(row_id.to_string()))?;
    if snapshot.column(column_id).is_none() {
        return Err(EditError::UnknownColumn(column_id.to_string()));
    }

    let current = &snapshot.rows()[position];
    if let Some(existing) = current.value(column_id) {
        if !existing.is_editable() {
            return Err(EditError::NotEditable {
                row_id: row_id.to_string(),
                column_id: column_id.to_string(),
            });
        }
    }

    let mut row = current.as_ref().clone();
    row.values.insert(column_id.to_string(), value);
    Ok(snapshot.with_row_replaced(position, row))
}

/// A cell write that has been applied locally and must be persisted
#[derive(Debug, Clone, PartialEq)]
pub struct CellEdit {
    pub document_id: String,
    pub table_id: String,
    pub row_id: String,
    pub column_id: String,
    pub value: CellValue,
}

impl CellEdit {
    fn key(&self) -> CellKey {
        (self.row_id.clone(), self.column_id.clone())
    }
}

type CellKey = (String, String);

/// Non-blocking indicator for a failed background write
#[derive(Debug, Clone, PartialEq)]
pub struct PersistNotice {
    pub row_id: String,
    pub column_id: String,
    pub message: String,
    pub at: DateTime<Local>,
}

#[derive(Debug, Default)]
struct TrackerInner {
    in_flight: HashMap<CellKey, usize>,
    notices: VecDeque<PersistNotice>,
    completed: u64,
    failed: u64,
}

/// Point-in-time view of the tracker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistCounts {
    pub in_flight: usize,
    pub completed: u64,
    pub failed: u64,
}

impl PersistCounts {
    /// Writes that completed without error
    pub fn saved(&self) -> u64 {
        self.completed.saturating_sub(self.failed)
    }
}

/// Counts in-flight writes per cell and keeps recent failures
#[derive(Debug, Clone, Default)]
pub struct PersistTracker {
    inner: Arc<Mutex<TrackerInner>>,
}

impl PersistTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TrackerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self, key: CellKey) {
        *self.lock().in_flight.entry(key).or_insert(0) += 1;
    }

    fn finish(&self, key: CellKey, result: &Result<(), PersistError>) {
        let mut inner = self.lock();
        if let Some(count) = inner.in_flight.get_mut(&key) {
            *count -= 1;
            if *count == 0 {
                inner.in_flight.remove(&key);
            }
        }
        inner.completed += 1;

        if let Err(e) = result {
            inner.failed += 1;
            if inner.notices.len() >= MAX_NOTICES {
                inner.notices.pop_front();
            }
            inner.notices.push_back(PersistNotice {
                row_id: e.row_id.clone(),
                column_id: e.column_id.clone(),
                message: e.to_string(),
                at: Local::now(),
            });
        }
    }

    /// Writes still pending for one cell
    pub fn in_flight_for(&self, row_id: &str, column_id: &str) -> usize {
        self.lock()
            .in_flight
            .get(&(row_id.to_string(), column_id.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// All counters read under one lock
    pub fn counts(&self) -> PersistCounts {
        let inner = self.lock();
        PersistCounts {
            in_flight: inner.in_flight.values().sum(),
            completed: inner.completed,
            failed: inner.failed,
        }
    }

    /// Drain failure notices, oldest first
    pub fn take_notices(&self) -> Vec<PersistNotice> {
        self.lock().notices.drain(..).collect()
    }
}

/// Persists optimistic edits in the background, one independent write per edit
#[derive(Clone)]
pub struct EditEngine {
    provider: Arc<dyn DataProvider>,
    tracker: PersistTracker,
    policy: PersistFailurePolicy,
}

impl EditEngine {
    pub fn new(provider: Arc<dyn DataProvider>) -> Self {
        Self {
            provider,
            tracker: PersistTracker::new(),
            policy: KEEP_OPTIMISTIC_ON_PERSIST_FAILURE,
        }
    }

    pub fn tracker(&self) -> &PersistTracker {
        &self.tracker
    }

    /// Fire the write and return immediately. Must be called inside a tokio runtime.
    ///
    /// Earlier writes for the same cell are not cancelled.
    pub fn spawn_persist(&self, edit: CellEdit) -> JoinHandle<Result<(), PersistError>> {
        let engine = self.clone();
        self.tracker.begin(edit.key());
        tokio::spawn(async move { engine.run(edit).await })
    }

    async fn run(&self, edit: CellEdit) -> Result<(), PersistError> {
        let text = edit.value.to_transport_text();
        debug!(
            target: "edit",
            "Persisting {}/{} in table {}",
            edit.row_id,
            edit.column_id,
            edit.table_id
        );

        let result = self
            .provider
            .update_cell(
                &edit.document_id,
                &edit.table_id,
                &edit.row_id,
                &edit.column_id,
                &text,
            )
            .await
            .map_err(|source| PersistError {
                row_id: edit.row_id.clone(),
                column_id: edit.column_id.clone(),
                source,
            });

        if let Err(e) = &result {
            match self.policy {
                PersistFailurePolicy::KeepOptimistic => {
                    warn!(target: "edit", "{} (local value kept)", e);
                }
            }
        }

        self.tracker.finish(edit.key(), &result);
        result
    }
}

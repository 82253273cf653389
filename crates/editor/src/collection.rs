//! Ordered Collection Editor.
//!
//! Holds the admin's view of one collection and drives every write through
//! the [`ContentStore`]. After each successful or failed write the list is
//! reloaded from the backend; the editor never patches its local copy.
//!
//! State lives behind a `std::sync::Mutex` that is only held between
//! `.await` points, so methods take `&self` and may be re-entered while a
//! call is in flight.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::join_all;
use serde_json::Value;
use wasura_core::error::CoreError;
use wasura_core::ordering::{self, MoveDirection};
use wasura_core::record::{Collection, Fields, Record, SORT_ORDER_FIELD};
use wasura_core::session::AdminContext;
use wasura_core::types::RecordId;
use wasura_gateway::ContentStore;

use crate::notice::{Notice, NoticeBus};

/// Lifecycle of the loaded list.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorState {
    Empty,
    Loading,
    Loaded(Vec<Record>),
    LoadError(String),
}

/// Result of a move request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderOutcome {
    /// Positions were swapped and the list reloaded.
    Moved,
    /// The record already sits at the edge; nothing was sent.
    AtBoundary,
}

/// A delete awaiting the admin's confirmation.
///
/// Obtained from [`CollectionEditor::request_delete`] and consumed by
/// [`confirm_delete`](CollectionEditor::confirm_delete) or
/// [`cancel_delete`](CollectionEditor::cancel_delete).
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a pending delete does nothing until confirmed"]
pub struct PendingDelete {
    collection: Collection,
    id: RecordId,
    label: String,
}

impl PendingDelete {
    pub fn id(&self) -> &RecordId {
        &self.id
    }

    /// Confirmation prompt for the admin.
    pub fn prompt(&self) -> String {
        if self.label.is_empty() {
            "Delete this item?".to_string()
        } else {
            format!("Delete \"{}\"?", self.label)
        }
    }
}

struct Inner {
    state: EditorState,
    /// Ticket of the most recently issued load.
    issued: u64,
}

pub struct CollectionEditor {
    collection: Collection,
    store: Arc<dyn ContentStore>,
    notices: Arc<NoticeBus>,
    context: AdminContext,
    inner: Mutex<Inner>,
}

impl CollectionEditor {
    pub fn new(
        collection: Collection,
        store: Arc<dyn ContentStore>,
        notices: Arc<NoticeBus>,
        context: AdminContext,
    ) -> Self {
        Self {
            collection,
            store,
            notices,
            context,
            inner: Mutex::new(Inner {
                state: EditorState::Empty,
                issued: 0,
            }),
        }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn context(&self) -> &AdminContext {
        &self.context
    }

    pub fn state(&self) -> EditorState {
        self.lock().state.clone()
    }

    /// Loaded records in display order; empty unless loaded.
    pub fn records(&self) -> Vec<Record> {
        match &self.lock().state {
            EditorState::Loaded(records) => records.clone(),
            _ => Vec::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Fetch the collection and replace the view.
    ///
    /// Only the most recently issued load may apply its result; an older
    /// response arriving late is discarded and reported as `Ok`. A loaded
    /// list stays visible while a reload is in flight.
    pub async fn load(&self) -> Result<(), CoreError> {
        let ticket = {
            let mut inner = self.lock();
            inner.issued += 1;
            if !matches!(inner.state, EditorState::Loaded(_)) {
                inner.state = EditorState::Loading;
            }
            inner.issued
        };

        let result = self.store.list(self.collection, None).await;

        let mut inner = self.lock();
        if inner.issued != ticket {
            tracing::debug!(
                collection = self.collection.table(),
                ticket,
                latest = inner.issued,
                "Discarding superseded load"
            );
            return Ok(());
        }

        match result {
            Ok(page) => {
                let mut records = page.records;
                if self.collection.is_manually_ordered() {
                    ordering::sort_for_display(&mut records);
                }
                tracing::debug!(
                    collection = self.collection.table(),
                    count = records.len(),
                    "Collection loaded"
                );
                inner.state = EditorState::Loaded(records);
                Ok(())
            }
            Err(err) => {
                inner.state = EditorState::LoadError(err.to_string());
                drop(inner);
                Err(self.notices.fail("Failed to load", err))
            }
        }
    }

    /// Drop the view and invalidate any load still in flight.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.issued += 1;
        inner.state = EditorState::Empty;
    }

    async fn reload_after_write(&self) {
        if let Err(e) = self.load().await {
            tracing::warn!(collection = self.collection.table(), error = %e, "Reload after write failed");
        }
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Create a record. Manually ordered collections append it after the
    /// current last position.
    pub async fn create(&self, mut fields: Fields) -> Result<Record, CoreError> {
        self.collection
            .validate_required(&fields)
            .map_err(|e| self.notices.fail("Cannot save", e))?;

        if self.collection.is_manually_ordered() {
            if !matches!(self.state(), EditorState::Loaded(_)) {
                self.load().await?;
            }
            let next = ordering::next_sort_order(&self.records());
            fields.insert(SORT_ORDER_FIELD.to_string(), Value::from(next));
        }

        let created = self.store.create(self.collection, fields).await;
        self.finish_write(created, "Saved", "Failed to save").await
    }

    /// Patch one record.
    pub async fn update(&self, id: &RecordId, fields: Fields) -> Result<Record, CoreError> {
        let updated = self.store.update(self.collection, id, fields).await;
        self.finish_write(updated, "Saved", "Failed to save").await
    }

    /// Patch several records concurrently. Every update is attempted; the
    /// first failure is returned after the reload.
    pub async fn update_many(
        &self,
        changes: Vec<(RecordId, Fields)>,
    ) -> Result<Vec<Record>, CoreError> {
        let count = changes.len();
        let results = join_all(
            changes
                .into_iter()
                .map(|(id, fields)| async move { self.store.update(self.collection, &id, fields).await }),
        )
        .await;

        self.reload_after_write().await;

        let mut saved = Vec::with_capacity(count);
        for result in results {
            saved.push(result.map_err(|e| self.notices.fail("Failed to save", e))?);
        }
        self.notices.publish(Notice::success(format!("Saved {count} item(s)")));
        Ok(saved)
    }

    async fn finish_write(
        &self,
        result: Result<Record, CoreError>,
        success: &str,
        failure: &str,
    ) -> Result<Record, CoreError> {
        self.reload_after_write().await;
        let record = result.map_err(|e| self.notices.fail(failure, e))?;
        self.notices.publish(Notice::success(success));
        Ok(record)
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    /// Start a delete. Nothing is sent until the returned value is confirmed.
    pub fn request_delete(&self, id: &RecordId) -> Result<PendingDelete, CoreError> {
        let records = self.records();
        let record = records
            .iter()
            .find(|r| &r.id == id)
            .ok_or_else(|| {
                self.notices.fail(
                    "Cannot delete",
                    CoreError::NotFound {
                        entity: self.collection.table(),
                        id: id.clone(),
                    },
                )
            })?;

        let label = ["title", "question"]
            .iter()
            .map(|key| record.text(key))
            .find(|v| !v.is_empty())
            .unwrap_or("")
            .to_string();

        Ok(PendingDelete {
            collection: self.collection,
            id: id.clone(),
            label,
        })
    }

    pub async fn confirm_delete(&self, pending: PendingDelete) -> Result<(), CoreError> {
        if pending.collection != self.collection {
            return Err(self.notices.fail(
                "Cannot delete",
                CoreError::Validation(format!(
                    "Pending delete belongs to {}, not {}",
                    pending.collection.table(),
                    self.collection.table()
                )),
            ));
        }

        let result = self.store.delete(self.collection, &pending.id).await;
        self.reload_after_write().await;
        result.map_err(|e| self.notices.fail("Failed to delete", e))?;
        self.notices.publish(Notice::success("Deleted"));
        Ok(())
    }

    pub fn cancel_delete(&self, pending: PendingDelete) {
        tracing::debug!(collection = self.collection.table(), id = %pending.id, "Delete cancelled");
    }

    // -----------------------------------------------------------------------
    // Reorder
    // -----------------------------------------------------------------------

    /// Whether the move button for `id` should be enabled.
    pub fn can_move(&self, id: &RecordId, direction: MoveDirection) -> bool {
        self.collection.is_manually_ordered()
            && ordering::can_move(&self.records(), id, direction)
    }

    /// Swap `id` with its neighbour in `direction`.
    ///
    /// Both updates are sent concurrently. If exactly one fails the
    /// positions may be inconsistent and `InvariantViolation` is returned;
    /// if both fail the first error is returned. The list is reloaded in
    /// every case once any update was sent.
    pub async fn reorder(
        &self,
        id: &RecordId,
        direction: MoveDirection,
    ) -> Result<ReorderOutcome, CoreError> {
        if !self.collection.is_manually_ordered() {
            return Err(self.notices.fail(
                "Cannot reorder",
                CoreError::Validation(format!(
                    "{} is not manually ordered",
                    self.collection.table()
                )),
            ));
        }

        let plan = ordering::plan_swap(&self.records(), id, direction)
            .map_err(|e| self.notices.fail("Cannot reorder", e))?;
        let Some(plan) = plan else {
            return Ok(ReorderOutcome::AtBoundary);
        };

        if plan.is_tie() {
            tracing::warn!(
                collection = self.collection.table(),
                moved = %plan.moved.id,
                displaced = %plan.displaced.id,
                sort_order = plan.moved.sort_order,
                "Swapping records that share a sort_order"
            );
        }

        let (moved, displaced) = futures::join!(
            self.store
                .update(self.collection, &plan.moved.id, order_patch(plan.moved.sort_order)),
            self.store.update(
                self.collection,
                &plan.displaced.id,
                order_patch(plan.displaced.sort_order)
            ),
        );

        self.reload_after_write().await;

        let outcome = match (moved, displaced) {
            (Ok(_), Ok(_)) => Ok(ReorderOutcome::Moved),
            (Err(first), Err(_)) => Err(first),
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(CoreError::InvariantViolation(format!(
                "Swap of {} and {} was only partly applied: {e}",
                plan.moved.id, plan.displaced.id
            ))),
        };

        match outcome {
            Ok(o) => {
                tracing::info!(collection = self.collection.table(), id = %id, direction = direction.name(), "Record moved");
                self.notices.publish(Notice::success("Order updated"));
                Ok(o)
            }
            Err(e) => Err(self.notices.fail("Failed to reorder", e)),
        }
    }
}

fn order_patch(sort_order: i64) -> Fields {
    let mut fields = Fields::new();
    fields.insert(SORT_ORDER_FIELD.to_string(), Value::from(sort_order));
    fields
}

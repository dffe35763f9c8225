//! Audit recorder: the append-only transition history
//!
//! One entry per committed write, nothing ever mutated or removed.
//! The history is complete enough to replay: folding the entries
//! reproduces the document's current state, which the scenario tests
//! assert as a standing property.

use docflow_types::{AuditEntry, DocumentId, StateName};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory append-only audit trail, per document
#[derive(Debug, Default)]
pub struct AuditRecorder {
    entries: RwLock<HashMap<DocumentId, Vec<AuditEntry>>>,
}

impl AuditRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one entry to a document's history
    pub async fn append(&self, id: &DocumentId, entry: AuditEntry) {
        tracing::debug!(
            document_id = %id,
            action = %entry.action,
            from = %entry.from_state,
            to = %entry.to_state,
            "Audit entry appended"
        );
        self.entries
            .write()
            .await
            .entry(id.clone())
            .or_default()
            .push(entry);
    }

    /// Full history for a document, in append order
    pub async fn history(&self, id: &DocumentId) -> Vec<AuditEntry> {
        self.entries
            .read()
            .await
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    /// Total time spent in each state a document has left
    ///
    /// Computed from consecutive entry timestamps; the interval still
    /// open in the current state is not counted.
    pub async fn time_in_state(&self, id: &DocumentId) -> HashMap<StateName, chrono::Duration> {
        let history = self.history(id).await;
        let mut totals: HashMap<StateName, chrono::Duration> = HashMap::new();

        for pair in history.windows(2) {
            let elapsed = pair[1].timestamp - pair[0].timestamp;
            let state = pair[0].to_state.clone();
            let total = totals.entry(state).or_insert_with(chrono::Duration::zero);
            *total = *total + elapsed;
        }

        totals
    }

    /// Fold a history down to the state it ends in
    ///
    /// Replaying the audit trail of a live document must yield its
    /// `current_state`.
    pub fn replay(history: &[AuditEntry]) -> Option<StateName> {
        history.last().map(|entry| entry.to_state.clone())
    }
}

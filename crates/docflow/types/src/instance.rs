//! Document instances: one document moving through a workflow
//!
//! A DocumentInstance binds to the definition version active at its
//! submission and keeps that binding for its whole life. Concurrent
//! writers (a manual approval racing an escalation tick) are resolved
//! by optimistic concurrency on `version_counter`: the store only
//! accepts a write whose expected counter matches, losers retry.

use crate::{DocumentSnapshot, DocumentType, RoleId, RuleId, StateName};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ── Identifier ───────────────────────────────────────────────────────

/// Unique identifier for a document instance
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn short(&self) -> &str {
        &self.0[..8.min(self.0.len())]
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Document Instance ────────────────────────────────────────────────

/// Runtime state of one document inside an approval workflow
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentInstance {
    /// Unique instance identifier
    pub id: DocumentId,
    /// The governed document type
    pub document_type: DocumentType,
    /// The definition version this instance is bound to
    pub workflow_version: u32,
    /// Current workflow state
    pub current_state: StateName,
    /// Snapshot of the document's fields, read by guards and templates
    pub snapshot: DocumentSnapshot,
    /// When the current state was entered; escalation timers run from
    /// this timestamp, not from scheduler ticks
    pub state_entered_at: DateTime<Utc>,
    /// Optimistic concurrency counter, bumped on every committed write
    pub version_counter: u64,
    /// Approver the document currently waits on, if reassigned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_approver: Option<RoleId>,
    /// Escalation rules that already fired for the current state entry
    #[serde(default, skip_serializing_if = "HashSet::is_empty")]
    pub has_escalated: HashSet<RuleId>,
    /// When the instance was created
    pub created_at: DateTime<Utc>,
    /// When the instance was last written
    pub updated_at: DateTime<Utc>,
}

impl DocumentInstance {
    /// Create an instance in the workflow's initial state
    pub fn new(
        document_type: DocumentType,
        workflow_version: u32,
        initial_state: StateName,
        snapshot: DocumentSnapshot,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: DocumentId::generate(),
            document_type,
            workflow_version,
            current_state: initial_state,
            snapshot,
            state_entered_at: now,
            version_counter: 0,
            pending_approver: None,
            has_escalated: HashSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Move into a new state: resets the SLA clock, clears escalation
    /// markers and any reassignment left over from the vacated state,
    /// and bumps the concurrency counter.
    pub fn enter_state(&mut self, state: StateName, now: DateTime<Utc>) {
        self.current_state = state;
        self.state_entered_at = now;
        self.has_escalated.clear();
        self.pending_approver = None;
        self.version_counter += 1;
        self.updated_at = now;
    }

    /// Record an escalation reassignment without leaving the state
    pub fn reassign(&mut self, rule_id: RuleId, approver: RoleId, now: DateTime<Utc>) {
        self.pending_approver = Some(approver);
        self.has_escalated.insert(rule_id);
        self.version_counter += 1;
        self.updated_at = now;
    }

    /// Mark an escalation rule as fired for the current state entry
    pub fn mark_escalated(&mut self, rule_id: RuleId, now: DateTime<Utc>) {
        self.has_escalated.insert(rule_id);
        self.version_counter += 1;
        self.updated_at = now;
    }

    /// Whether an escalation rule already fired since entering the state
    pub fn escalation_fired(&self, rule_id: &RuleId) -> bool {
        self.has_escalated.contains(rule_id)
    }

    /// Hours the document has sat in its current state
    pub fn hours_in_state(&self, now: DateTime<Utc>) -> f64 {
        let seconds = now.signed_duration_since(self.state_entered_at).num_seconds();
        seconds as f64 / 3600.0
    }
}

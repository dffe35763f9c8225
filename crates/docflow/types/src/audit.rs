//! Audit entries: the immutable transition history
//!
//! Every committed transition appends exactly one entry. Entries are
//! never mutated or deleted; replaying them from the initial state
//! reproduces the document's current state.

use crate::{ActionName, StateName};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who performed an action: a user or a system principal
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub String);

/// The principal the escalation scheduler acts as
pub const SYSTEM_ESCALATION: &str = "system:escalation";

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The escalation scheduler principal
    pub fn escalation() -> Self {
        Self(SYSTEM_ESCALATION.to_string())
    }

    /// Whether this is a system principal rather than a user
    pub fn is_system(&self) -> bool {
        self.0.starts_with("system:")
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One immutable record of a committed transition
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditEntry {
    /// When the transition committed
    pub timestamp: DateTime<Utc>,
    /// Who invoked the action. Under delegation this is the actual
    /// actor, not the role they were standing in for.
    pub actor: ActorId,
    /// The invoked action
    pub action: ActionName,
    /// State before the transition
    pub from_state: StateName,
    /// State after the transition
    pub to_state: StateName,
    /// Optional free-text note (approver comment)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl AuditEntry {
    pub fn new(
        timestamp: DateTime<Utc>,
        actor: ActorId,
        action: ActionName,
        from_state: StateName,
        to_state: StateName,
    ) -> Self {
        Self {
            timestamp,
            actor,
            action,
            from_state,
            to_state,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

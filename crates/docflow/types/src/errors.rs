//! Error taxonomy for the approval engine
//!
//! Split by audience: `WorkflowError` covers definition management and
//! storage, surfaced synchronously to administrators; `TransitionError`
//! is the typed result controllers must handle when moving documents;
//! `ValidationIssue` enumerates everything wrong with a definition.

use crate::{ActionName, ActorId, DocumentId, DocumentType, RoleId, RuleId, StateName};

/// Errors from definition management, lookup, and storage
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("no workflow definition for document type '{0}'")]
    DefinitionNotFound(DocumentType),

    #[error("no version {version} of workflow for '{document_type}'")]
    VersionNotFound {
        document_type: DocumentType,
        version: u32,
    },

    #[error("document instance not found: {0}")]
    InstanceNotFound(DocumentId),

    #[error("state not found: {0}")]
    StateNotFound(StateName),

    #[error("duplicate state: {0}")]
    DuplicateState(StateName),

    #[error("definition failed validation with {} issue(s)", .0.len())]
    ValidationFailed(Vec<ValidationIssue>),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Result type alias for workflow operations
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Typed failures of a transition request
///
/// These are expected outcomes the calling controller displays to the
/// user, never internal faults.
#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    /// The actor's effective roles do not allow this action. Checked
    /// before guard evaluation so unauthorized actors learn nothing
    /// about condition logic.
    #[error("actor '{actor}' is not authorized for action '{action}'")]
    Unauthorized { actor: ActorId, action: ActionName },

    /// No candidate's guard matched the document snapshot
    #[error("no matching transition for action '{action}' from state '{state}'")]
    NoMatchingTransition { state: StateName, action: ActionName },

    /// Lost a compare-and-swap race; the caller should re-read and retry
    #[error("concurrent update on document {0}, retry")]
    Conflict(DocumentId),

    #[error("document instance not found: {0}")]
    InstanceNotFound(DocumentId),

    #[error("no version {version} of workflow for '{document_type}'")]
    DefinitionNotFound {
        document_type: DocumentType,
        version: u32,
    },

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<WorkflowError> for TransitionError {
    fn from(error: WorkflowError) -> Self {
        match error {
            WorkflowError::InstanceNotFound(id) => Self::InstanceNotFound(id),
            WorkflowError::VersionNotFound {
                document_type,
                version,
            } => Self::DefinitionNotFound {
                document_type,
                version,
            },
            other => Self::Storage(other.to_string()),
        }
    }
}

/// One problem found while validating a workflow definition
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationIssue {
    #[error("definition has no states")]
    NoStates,

    #[error("duplicate state name '{0}'")]
    DuplicateState(StateName),

    #[error("expected exactly one initial state (a state with no incoming transitions)")]
    NoUniqueInitialState,

    #[error("state '{0}' is unreachable from the initial state")]
    UnreachableState(StateName),

    #[error("no terminal state declared")]
    NoTerminalState,

    #[error("state '{0}' has no path to a terminal state")]
    NoPathToTerminal(StateName),

    #[error("transition '{action}' references unknown state '{state}'")]
    DanglingTransition { action: ActionName, state: StateName },

    #[error("transition '{action}' leaves terminal state '{state}'")]
    TransitionFromTerminal { action: ActionName, state: StateName },

    #[error("transition '{action}' on state '{state}' has no candidates")]
    EmptyTransition { action: ActionName, state: StateName },

    #[error("escalation rule '{rule_id}' references unknown state '{state}'")]
    EscalationUnknownState { rule_id: RuleId, state: StateName },

    #[error("duplicate escalation rule id '{0}'")]
    DuplicateRuleId(RuleId),

    #[error("delegation rule from role '{0}' to itself")]
    DelegationSelfLoop(RoleId),

    #[error("invalid guard expression '{guard}': {message}")]
    InvalidGuard { guard: String, message: String },
}

//! The approval engine facade
//!
//! Wires the registry, executor, scheduler, audit recorder, and
//! notification dispatcher around caller-supplied store, directory,
//! transport, and clock. Controllers talk to this type; the pieces
//! stay independently testable underneath.

use crate::audit::AuditRecorder;
use crate::clock::Clock;
use crate::directory::RoleDirectory;
use crate::executor::TransitionExecutor;
use crate::notify::{DispatchConfig, NotificationDispatcher, NotificationTransport};
use crate::registry::DefinitionRegistry;
use crate::scheduler::{EscalationScheduler, SchedulerConfig};
use crate::store::DocumentStore;
use chrono::{DateTime, Utc};
use docflow_types::{
    ActionName, ActorId, AuditEntry, DocumentId, DocumentInstance, DocumentSnapshot, DocumentType,
    StateName, TransitionError, ValidationIssue, WorkflowDefinition, WorkflowError, WorkflowResult,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Engine-wide tuning
#[derive(Clone, Debug, Default)]
pub struct EngineConfig {
    pub dispatch: DispatchConfig,
    pub scheduler: SchedulerConfig,
}

/// Facade over the whole approval runtime
pub struct ApprovalEngine {
    registry: Arc<RwLock<DefinitionRegistry>>,
    store: Arc<dyn DocumentStore>,
    audit: Arc<AuditRecorder>,
    dispatcher: Arc<NotificationDispatcher>,
    executor: Arc<TransitionExecutor>,
    scheduler: Arc<EscalationScheduler>,
}

impl ApprovalEngine {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        directory: Arc<dyn RoleDirectory>,
        transport: Arc<dyn NotificationTransport>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        let registry = Arc::new(RwLock::new(DefinitionRegistry::new()));
        let audit = Arc::new(AuditRecorder::new());
        let dispatcher = Arc::new(NotificationDispatcher::new(
            transport,
            directory.clone(),
            config.dispatch,
        ));
        let executor = Arc::new(TransitionExecutor::new(
            registry.clone(),
            store.clone(),
            directory.clone(),
            audit.clone(),
            dispatcher.clone(),
            clock.clone(),
        ));
        let scheduler = Arc::new(EscalationScheduler::new(
            registry.clone(),
            store.clone(),
            directory,
            executor.clone(),
            audit.clone(),
            dispatcher.clone(),
            clock,
            config.scheduler,
        ));

        Self {
            registry,
            store,
            audit,
            dispatcher,
            executor,
            scheduler,
        }
    }

    // ── Definitions ──────────────────────────────────────────────────

    /// Validate without publishing
    pub fn validate(definition: &WorkflowDefinition) -> Vec<ValidationIssue> {
        DefinitionRegistry::validate(definition)
    }

    /// Validate and publish a definition; returns the assigned version
    pub async fn publish(&self, definition: WorkflowDefinition) -> WorkflowResult<u32> {
        self.registry.write().await.publish(definition)
    }

    // ── Documents ────────────────────────────────────────────────────

    /// Submit a document into its workflow
    pub async fn submit(
        &self,
        document_type: &DocumentType,
        snapshot: DocumentSnapshot,
        actor: &ActorId,
    ) -> WorkflowResult<DocumentId> {
        self.executor.submit(document_type, snapshot, actor).await
    }

    /// Apply an action on behalf of an actor
    pub async fn transition(
        &self,
        id: &DocumentId,
        action: &ActionName,
        actor: &ActorId,
    ) -> Result<StateName, TransitionError> {
        self.executor
            .request_transition(id, action, actor, None)
            .await
    }

    /// Apply an action with an approver comment for the audit trail
    pub async fn transition_with_note(
        &self,
        id: &DocumentId,
        action: &ActionName,
        actor: &ActorId,
        note: impl Into<String>,
    ) -> Result<StateName, TransitionError> {
        self.executor
            .request_transition(id, action, actor, Some(note.into()))
            .await
    }

    /// Actions the actor could invoke on the document right now
    pub async fn available_actions(
        &self,
        id: &DocumentId,
        actor: &ActorId,
    ) -> Result<Vec<ActionName>, TransitionError> {
        self.executor.available_actions(id, actor).await
    }

    /// Load a document instance
    pub async fn document(&self, id: &DocumentId) -> WorkflowResult<DocumentInstance> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| WorkflowError::InstanceNotFound(id.clone()))
    }

    // ── Audit ────────────────────────────────────────────────────────

    /// Full audit history for a document
    pub async fn history(&self, id: &DocumentId) -> Vec<AuditEntry> {
        self.audit.history(id).await
    }

    /// Aggregate time spent per state, from the audit trail
    pub async fn time_in_state(&self, id: &DocumentId) -> HashMap<StateName, chrono::Duration> {
        self.audit.time_in_state(id).await
    }

    // ── Retention ────────────────────────────────────────────────────

    /// Remove terminal instances last written before `older_than`
    ///
    /// Audit history is retained; only the live instance record goes.
    pub async fn archive_terminal(
        &self,
        older_than: DateTime<Utc>,
    ) -> WorkflowResult<Vec<DocumentId>> {
        let mut archived = Vec::new();

        for id in self.store.list_ids().await? {
            let Some(instance) = self.store.get(&id).await? else {
                continue;
            };
            let compiled = self
                .registry
                .read()
                .await
                .get(&instance.document_type, instance.workflow_version)?;
            if compiled.definition.is_terminal(&instance.current_state)
                && instance.updated_at < older_than
            {
                self.store.remove(&id).await?;
                tracing::info!(document_id = %id, "Archived terminal document");
                archived.push(id);
            }
        }

        Ok(archived)
    }

    // ── Component access ─────────────────────────────────────────────

    /// The escalation scheduler, for manual ticks or spawning its loop
    pub fn scheduler(&self) -> Arc<EscalationScheduler> {
        self.scheduler.clone()
    }

    /// The notification dispatcher, mainly for inspection in tests
    pub fn dispatcher(&self) -> Arc<NotificationDispatcher> {
        self.dispatcher.clone()
    }
}

//! Transition executor: moves documents through their workflow
//!
//! `request_transition` runs the five-step protocol: load, authorize,
//! route, commit, record. Authorization happens **before** any guard
//! is evaluated, so an unauthorized actor learns nothing about the
//! routing conditions. Candidates are tried in declaration order and
//! the first whose guard is absent or true wins; the write commits
//! with a compare-and-swap and losers get `Conflict` to retry.

use crate::audit::AuditRecorder;
use crate::clock::Clock;
use crate::delegation::DelegationResolver;
use crate::directory::RoleDirectory;
use crate::notify::NotificationDispatcher;
use crate::registry::{CompiledDefinition, DefinitionRegistry};
use crate::store::DocumentStore;
use docflow_guard::evaluate;
use docflow_types::{
    ActionName, ActorId, AuditEntry, DocumentId, DocumentInstance, DocumentSnapshot, DocumentType,
    NotificationEvent, RecipientSpec, RoleId, StateName, Transition, TransitionError, WorkflowError,
    WorkflowResult,
};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

/// Executes submissions and transition requests
pub struct TransitionExecutor {
    registry: Arc<RwLock<DefinitionRegistry>>,
    store: Arc<dyn DocumentStore>,
    directory: Arc<dyn RoleDirectory>,
    audit: Arc<AuditRecorder>,
    dispatcher: Arc<NotificationDispatcher>,
    clock: Arc<dyn Clock>,
}

impl TransitionExecutor {
    pub fn new(
        registry: Arc<RwLock<DefinitionRegistry>>,
        store: Arc<dyn DocumentStore>,
        directory: Arc<dyn RoleDirectory>,
        audit: Arc<AuditRecorder>,
        dispatcher: Arc<NotificationDispatcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            store,
            directory,
            audit,
            dispatcher,
            clock,
        }
    }

    /// Create an instance in the active definition's initial state
    ///
    /// The instance binds to the active version for its whole life;
    /// definitions published later never affect it.
    pub async fn submit(
        &self,
        document_type: &DocumentType,
        snapshot: DocumentSnapshot,
        actor: &ActorId,
    ) -> WorkflowResult<DocumentId> {
        let compiled = self.registry.read().await.active(document_type)?;
        let initial = compiled
            .definition
            .initial_state()
            .ok_or_else(|| {
                WorkflowError::Storage(format!(
                    "published definition '{}' has no initial state",
                    document_type
                ))
            })?
            .clone();

        let now = self.clock.now();
        let instance = DocumentInstance::new(
            document_type.clone(),
            compiled.definition.version,
            initial.name.clone(),
            snapshot,
            now,
        );
        let id = instance.id.clone();

        self.store.insert(instance.clone()).await?;
        self.audit
            .append(
                &id,
                AuditEntry::new(
                    now,
                    actor.clone(),
                    ActionName::new("submit"),
                    initial.name.clone(),
                    initial.name.clone(),
                ),
            )
            .await;
        self.dispatcher
            .enqueue(
                NotificationEvent::submitted(id.clone(), &initial.allowed_editor_roles),
                &instance.snapshot,
            )
            .await;

        tracing::info!(
            document_id = %id,
            document_type = %document_type,
            version = compiled.definition.version,
            state = %initial.name,
            "Document submitted"
        );
        Ok(id)
    }

    /// Apply an action to a document on behalf of an actor
    pub async fn request_transition(
        &self,
        id: &DocumentId,
        action: &ActionName,
        actor: &ActorId,
        note: Option<String>,
    ) -> Result<StateName, TransitionError> {
        // 1. Load the instance and its bound definition version
        let instance = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| TransitionError::InstanceNotFound(id.clone()))?;
        let compiled = self
            .registry
            .read()
            .await
            .get(&instance.document_type, instance.workflow_version)?;

        // 2. Candidate transitions for (current state, action). Terminal
        //    states have no outgoing transitions, so this also rejects
        //    actions on finished documents.
        let transitions = compiled
            .definition
            .transitions_for(&instance.current_state, action);
        if transitions.is_empty() {
            return Err(TransitionError::NoMatchingTransition {
                state: instance.current_state.clone(),
                action: action.clone(),
            });
        }

        // 3. Authorization, before any guard runs
        let effective = self.effective_roles_of(actor, &compiled).await?;
        let authorized: Vec<&Transition> = transitions
            .into_iter()
            .filter(|t| t.allowed_roles.iter().any(|r| effective.contains(r)))
            .collect();
        if authorized.is_empty() {
            return Err(TransitionError::Unauthorized {
                actor: actor.clone(),
                action: action.clone(),
            });
        }

        // 4. Ordered guard evaluation, first match wins
        let Some(target) = select_target(&authorized, &compiled, &instance.snapshot) else {
            return Err(TransitionError::NoMatchingTransition {
                state: instance.current_state.clone(),
                action: action.clone(),
            });
        };

        // 5. Commit via compare-and-swap
        let now = self.clock.now();
        let expected = instance.version_counter;
        let mut updated = instance.clone();
        updated.enter_state(target.clone(), now);

        if !self.store.compare_and_swap(expected, updated.clone()).await? {
            return Err(TransitionError::Conflict(id.clone()));
        }

        // Side effects run after the commit and never reverse it
        let mut entry = AuditEntry::new(
            now,
            actor.clone(),
            action.clone(),
            instance.current_state.clone(),
            target.clone(),
        );
        if let Some(note) = note {
            entry = entry.with_note(note);
        }
        self.audit.append(id, entry).await;

        if let Some(state) = compiled.definition.get_state(&target) {
            let mut event = NotificationEvent::state_entered(
                id.clone(),
                target.clone(),
                &state.allowed_editor_roles,
            );
            if state.is_terminal {
                // Terminal states have no editors; tell the requester instead
                event = event
                    .with_recipient(RecipientSpec::DocumentField("requested_by".into()));
            }
            self.dispatcher.enqueue(event, &updated.snapshot).await;
        }

        tracing::info!(
            document_id = %id,
            action = %action,
            actor = %actor,
            from = %instance.current_state,
            to = %target,
            "Transition committed"
        );
        Ok(target)
    }

    /// Actions the actor could invoke right now
    ///
    /// Runs the read-only half of the protocol: authorization and
    /// guard routing, no write. Deduplicated, declaration order.
    pub async fn available_actions(
        &self,
        id: &DocumentId,
        actor: &ActorId,
    ) -> Result<Vec<ActionName>, TransitionError> {
        let instance = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| TransitionError::InstanceNotFound(id.clone()))?;
        let compiled = self
            .registry
            .read()
            .await
            .get(&instance.document_type, instance.workflow_version)?;

        let effective = self.effective_roles_of(actor, &compiled).await?;

        let mut actions = Vec::new();
        for transition in compiled
            .definition
            .transitions_from(&instance.current_state)
        {
            if !transition
                .allowed_roles
                .iter()
                .any(|r| effective.contains(r))
            {
                continue;
            }
            if select_target(&[transition], &compiled, &instance.snapshot).is_none() {
                continue;
            }
            if !actions.contains(&transition.action_name) {
                actions.push(transition.action_name.clone());
            }
        }

        Ok(actions)
    }

    /// The actor's roles expanded through active delegations
    ///
    /// A system principal's id participates as a pseudo-role so
    /// transitions can name it directly (e.g. `system:escalation`).
    /// User ids never do: a user whose id happens to match a role name
    /// gains nothing without directory membership.
    async fn effective_roles_of(
        &self,
        actor: &ActorId,
        compiled: &CompiledDefinition,
    ) -> Result<HashSet<RoleId>, TransitionError> {
        let mut held = self.directory.roles_of(actor).await?;
        if actor.is_system() {
            held.push(RoleId::new(actor.0.clone()));
        }
        let flags = self.directory.flags().await?;
        Ok(DelegationResolver::effective_roles(&held, compiled, &flags))
    }
}

/// First candidate whose guard is absent or true, over the given
/// transitions in order. Fail-closed on any guard trouble.
fn select_target(
    transitions: &[&Transition],
    compiled: &CompiledDefinition,
    snapshot: &DocumentSnapshot,
) -> Option<StateName> {
    for transition in transitions {
        for candidate in &transition.candidates {
            let selected = match &candidate.guard {
                None => true,
                Some(source) => match compiled.guard(source) {
                    Some(expr) => evaluate(expr, snapshot),
                    None => {
                        warn!(guard = %source, "Guard missing from compiled definition");
                        false
                    }
                },
            };
            if selected {
                return Some(candidate.target.clone());
            }
        }
    }
    None
}

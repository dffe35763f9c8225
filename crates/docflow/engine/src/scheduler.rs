//! Escalation scheduler: enforces state SLAs
//!
//! `tick(now)` sweeps every non-terminal instance and fires the
//! escalation rules whose deadline has passed. Deadlines are measured
//! from `state_entered_at`, not from tick counts, so a slow or
//! restarted scheduler fires late rather than never. Each rule fires
//! at most once per state entry, tracked on the instance itself, and
//! one misbehaving document never blocks the rest of the sweep.

use crate::audit::AuditRecorder;
use crate::clock::Clock;
use crate::delegation::DelegationResolver;
use crate::directory::RoleDirectory;
use crate::executor::TransitionExecutor;
use crate::notify::NotificationDispatcher;
use crate::registry::DefinitionRegistry;
use crate::store::DocumentStore;
use chrono::{DateTime, Utc};
use docflow_guard::evaluate;
use docflow_types::{
    ActionName, ActorId, AuditEntry, DocumentId, EscalationEffect, NotificationEvent,
    TransitionError, WorkflowResult,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::interval;

/// Scheduler tuning
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// How often the background loop sweeps
    pub tick_interval: std::time::Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: std::time::Duration::from_secs(60),
        }
    }
}

/// Sweeps instances and applies overdue escalation rules
pub struct EscalationScheduler {
    registry: Arc<RwLock<DefinitionRegistry>>,
    store: Arc<dyn DocumentStore>,
    directory: Arc<dyn RoleDirectory>,
    executor: Arc<TransitionExecutor>,
    audit: Arc<AuditRecorder>,
    dispatcher: Arc<NotificationDispatcher>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
    running: RwLock<bool>,
}

impl EscalationScheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<RwLock<DefinitionRegistry>>,
        store: Arc<dyn DocumentStore>,
        directory: Arc<dyn RoleDirectory>,
        executor: Arc<TransitionExecutor>,
        audit: Arc<AuditRecorder>,
        dispatcher: Arc<NotificationDispatcher>,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            registry,
            store,
            directory,
            executor,
            audit,
            dispatcher,
            clock,
            config,
            running: RwLock::new(false),
        }
    }

    /// One sweep over all instances; returns how many rules fired
    pub async fn tick(&self) -> WorkflowResult<u32> {
        let now = self.clock.now();
        let ids = self.store.list_ids().await?;
        let mut fired = 0;

        for id in ids {
            match self.check_document(&id, now).await {
                Ok(count) => fired += count,
                Err(error) => {
                    // Transient per-document failure; the rest of the
                    // batch proceeds and this document is retried on
                    // the next tick
                    tracing::error!(
                        document_id = %id,
                        error = %error,
                        "Escalation check failed"
                    );
                }
            }
        }

        Ok(fired)
    }

    async fn check_document(&self, id: &DocumentId, now: DateTime<Utc>) -> WorkflowResult<u32> {
        let Some(instance) = self.store.get(id).await? else {
            return Ok(0);
        };
        let compiled = self
            .registry
            .read()
            .await
            .get(&instance.document_type, instance.workflow_version)?;
        if compiled.definition.is_terminal(&instance.current_state) {
            return Ok(0);
        }

        let flags = self.directory.flags().await?;
        let mut current = instance;
        let mut fired = 0;

        let rules: Vec<_> = compiled
            .definition
            .escalation_rules_for(&current.current_state)
            .into_iter()
            .cloned()
            .collect();

        for rule in rules {
            if current.escalation_fired(&rule.rule_id) {
                continue;
            }
            if current.hours_in_state(now) < rule.after_hours as f64 {
                continue;
            }
            if let Some(source) = &rule.guard {
                let holds = match compiled.guard(source) {
                    Some(expr) => evaluate(expr, &current.snapshot),
                    None => false,
                };
                if !holds {
                    continue;
                }
            }

            match &rule.effect {
                EscalationEffect::Reassign { role } => {
                    let approver = DelegationResolver::resolve_assignment(role, &compiled, &flags);
                    let expected = current.version_counter;
                    let mut updated = current.clone();
                    updated.reassign(rule.rule_id.clone(), approver.clone(), now);

                    if !self
                        .store
                        .compare_and_swap(expected, updated.clone())
                        .await?
                    {
                        // A manual transition won the race; whatever
                        // state the document is in now, this sweep is
                        // done with it
                        tracing::warn!(
                            document_id = %id,
                            rule_id = %rule.rule_id,
                            "Escalation lost write race, deferring to next tick"
                        );
                        break;
                    }

                    self.audit
                        .append(
                            id,
                            AuditEntry::new(
                                now,
                                ActorId::escalation(),
                                ActionName::new(format!("escalate:{}", rule.rule_id)),
                                current.current_state.clone(),
                                current.current_state.clone(),
                            )
                            .with_note(format!(
                                "SLA exceeded after {} hours, reassigned to '{}'",
                                rule.after_hours, approver
                            )),
                        )
                        .await;
                    self.dispatcher
                        .enqueue(
                            NotificationEvent::escalated(
                                id.clone(),
                                rule.rule_id.clone(),
                                approver.clone(),
                            ),
                            &updated.snapshot,
                        )
                        .await;

                    tracing::info!(
                        document_id = %id,
                        rule_id = %rule.rule_id,
                        approver = %approver,
                        "Escalation reassigned pending approver"
                    );
                    current = updated;
                    fired += 1;
                }

                EscalationEffect::AutoTransition { action } => {
                    match self
                        .executor
                        .request_transition(
                            id,
                            action,
                            &ActorId::escalation(),
                            Some(format!(
                                "Automatic transition: SLA exceeded after {} hours",
                                rule.after_hours
                            )),
                        )
                        .await
                    {
                        Ok(target) => {
                            tracing::info!(
                                document_id = %id,
                                rule_id = %rule.rule_id,
                                to = %target,
                                "Escalation auto-transitioned document"
                            );
                            fired += 1;
                            // The document left the watched state;
                            // remaining rules no longer apply
                            break;
                        }
                        Err(TransitionError::Conflict(_)) => {
                            // Someone else moved it first; retry next tick
                            break;
                        }
                        Err(error) => {
                            // A misconfigured rule would otherwise fire
                            // every tick; mark it spent for this state
                            // entry and move on
                            tracing::error!(
                                document_id = %id,
                                rule_id = %rule.rule_id,
                                error = %error,
                                "Escalation auto-transition failed, marking rule spent"
                            );
                            let expected = current.version_counter;
                            let mut updated = current.clone();
                            updated.mark_escalated(rule.rule_id.clone(), now);
                            if self
                                .store
                                .compare_and_swap(expected, updated.clone())
                                .await?
                            {
                                current = updated;
                            } else {
                                break;
                            }
                        }
                    }
                }
            }
        }

        Ok(fired)
    }

    /// Background loop on a tokio interval, until [`stop`](Self::stop)
    pub async fn run(self: Arc<Self>) {
        {
            let mut running = self.running.write().await;
            *running = true;
        }
        tracing::info!("Escalation scheduler started");

        let mut ticker = interval(self.config.tick_interval);
        loop {
            ticker.tick().await;

            if !*self.running.read().await {
                break;
            }

            match self.tick().await {
                Ok(fired) if fired > 0 => {
                    tracing::debug!(fired = fired, "Escalation sweep fired rules");
                }
                Ok(_) => {}
                Err(error) => {
                    tracing::error!(error = %error, "Escalation sweep failed");
                }
            }
        }

        tracing::info!("Escalation scheduler stopped");
    }

    /// Signal the background loop to exit after its current sweep
    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
    }
}

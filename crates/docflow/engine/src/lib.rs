//! Approval workflow runtime
//!
//! The engine drives documents through declarative multi-level
//! approval workflows: guarded routing on document fields, SLA
//! escalation, delegation while approvers are away, an append-only
//! audit trail, and best-effort notifications.
//!
//! # Architecture
//!
//! [`ApprovalEngine`] composes specialized components:
//!
//! - [`DefinitionRegistry`]: validates, versions, and serves
//!   definitions, guards compiled to ASTs at publish time
//! - [`TransitionExecutor`]: authorization before guard evaluation,
//!   first-match routing, compare-and-swap commits
//! - [`DelegationResolver`]: expands roles through active delegation
//!   chains, hop-capped and cycle-safe
//! - [`EscalationScheduler`]: timestamp-based SLA sweeps, idempotent
//!   per rule per state entry
//! - [`AuditRecorder`]: append-only history; replaying it reproduces
//!   the current state
//! - [`NotificationDispatcher`]: bounded queue, worker pool, retry
//!   with backoff, dead-letter
//!
//! Persistence, the organization, delivery, and time are all injected
//! through traits ([`DocumentStore`], [`RoleDirectory`],
//! [`NotificationTransport`], [`Clock`]); in-memory implementations
//! back the tests and single-process deployments.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use docflow_engine::{
//!     ApprovalEngine, EngineConfig, InMemoryDocumentStore, InMemoryRoleDirectory,
//!     MemoryTransport, SystemClock,
//! };
//! use docflow_types::{
//!     ActionName, ActorId, DocumentSnapshot, DocumentType, State, Transition,
//!     WorkflowDefinition,
//! };
//!
//! # async fn demo() {
//! let directory = Arc::new(InMemoryRoleDirectory::new());
//! directory.assign("sara", "Supervisor").await;
//!
//! let engine = ApprovalEngine::new(
//!     Arc::new(InMemoryDocumentStore::new()),
//!     directory,
//!     Arc::new(MemoryTransport::new()),
//!     Arc::new(SystemClock),
//!     EngineConfig::default(),
//! );
//!
//! let mut def = WorkflowDefinition::new("Purchase Order");
//! def.add_state(State::new("Pending Approval").with_editor_role("Supervisor")).unwrap();
//! def.add_state(State::terminal("Approved")).unwrap();
//! def.add_transition(
//!     Transition::new("Pending Approval", "approve")
//!         .allow_role("Supervisor")
//!         .to("Approved"),
//! ).unwrap();
//! engine.publish(def).await.unwrap();
//!
//! let id = engine
//!     .submit(
//!         &DocumentType::new("Purchase Order"),
//!         DocumentSnapshot::new().with_field("grand_total", 3000.0),
//!         &ActorId::new("lina"),
//!     )
//!     .await
//!     .unwrap();
//! engine
//!     .transition(&id, &ActionName::new("approve"), &ActorId::new("sara"))
//!     .await
//!     .unwrap();
//! # }
//! ```

#![deny(unsafe_code)]

pub mod audit;
pub mod clock;
pub mod delegation;
pub mod directory;
pub mod engine;
pub mod executor;
pub mod notify;
pub mod registry;
pub mod scheduler;
pub mod store;

pub use audit::AuditRecorder;
pub use clock::{Clock, ManualClock, SystemClock};
pub use delegation::DelegationResolver;
pub use directory::{InMemoryRoleDirectory, RoleDirectory};
pub use engine::{ApprovalEngine, EngineConfig};
pub use executor::TransitionExecutor;
pub use notify::{
    DeliveryError, DispatchConfig, MemoryTransport, NotificationDispatcher, NotificationTransport,
};
pub use registry::{CompiledDefinition, DefinitionRegistry};
pub use scheduler::{EscalationScheduler, SchedulerConfig};
pub use store::{DocumentStore, InMemoryDocumentStore};

//! Docflow Domain Types
//!
//! Docflow models multi-level approval workflows as declaratively
//! configured state machines over document instances.
//!
//! # Key Concepts
//!
//! - **WorkflowDefinition**: A versioned, immutable blueprint: states,
//!   guarded transitions, escalation rules, delegation rules.
//! - **DocumentInstance**: One document moving through a definition.
//!   It binds to the definition version active at submission and keeps
//!   that binding for its whole life.
//! - **Transition**: An action on a source state with an ordered list of
//!   `(guard, target)` candidates; the first candidate whose guard holds
//!   (or is absent) wins.
//! - **EscalationRule**: SLA timer on a state. When it fires it either
//!   reassigns the pending approver or drives an automatic transition.
//! - **AuditEntry**: Immutable, append-only record of every transition.
//!
//! # Design Principles
//!
//! 1. Definitions are data, never code. Guards are restricted
//!    expressions validated at publish time.
//! 2. Authorization is checked before guards, so unauthorized actors
//!    learn nothing about condition logic.
//! 3. Every committed transition leaves an audit entry; replaying the
//!    entries reproduces the current state.

#![deny(unsafe_code)]

mod audit;
mod definition;
mod errors;
mod instance;
mod notification;
mod snapshot;

pub use audit::*;
pub use definition::*;
pub use errors::*;
pub use instance::*;
pub use notification::*;
pub use snapshot::*;

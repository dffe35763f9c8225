//! Role directory: who holds which role, and org-level flags
//!
//! The directory is the engine's only view of the organization. Role
//! membership answers authorization and notification fan-out; the
//! flag snapshot feeds delegation triggers (e.g. `supervisor_absent`).

use async_trait::async_trait;
use docflow_types::{ActorId, DocumentSnapshot, FieldValue, RoleId, WorkflowResult};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Organization lookup used for authorization and delegation
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    /// Roles held by an actor
    async fn roles_of(&self, actor: &ActorId) -> WorkflowResult<Vec<RoleId>>;

    /// Actors holding a role
    async fn members_of(&self, role: &RoleId) -> WorkflowResult<Vec<ActorId>>;

    /// Current org-level flags, evaluated by delegation triggers
    async fn flags(&self) -> WorkflowResult<DocumentSnapshot>;
}

/// In-memory directory backing tests and single-process deployments
#[derive(Debug, Default)]
pub struct InMemoryRoleDirectory {
    assignments: RwLock<HashMap<ActorId, Vec<RoleId>>>,
    flags: RwLock<DocumentSnapshot>,
}

impl InMemoryRoleDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant a role to an actor
    pub async fn assign(&self, actor: impl Into<String>, role: impl Into<String>) {
        let mut assignments = self.assignments.write().await;
        let roles = assignments.entry(ActorId::new(actor)).or_default();
        let role = RoleId::new(role);
        if !roles.contains(&role) {
            roles.push(role);
        }
    }

    /// Revoke a role from an actor
    pub async fn revoke(&self, actor: &ActorId, role: &RoleId) {
        let mut assignments = self.assignments.write().await;
        if let Some(roles) = assignments.get_mut(actor) {
            roles.retain(|r| r != role);
        }
    }

    /// Set an org-level flag
    pub async fn set_flag(&self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.flags.write().await.set(name, value);
    }
}

#[async_trait]
impl RoleDirectory for InMemoryRoleDirectory {
    async fn roles_of(&self, actor: &ActorId) -> WorkflowResult<Vec<RoleId>> {
        Ok(self
            .assignments
            .read()
            .await
            .get(actor)
            .cloned()
            .unwrap_or_default())
    }

    async fn members_of(&self, role: &RoleId) -> WorkflowResult<Vec<ActorId>> {
        Ok(self
            .assignments
            .read()
            .await
            .iter()
            .filter(|(_, roles)| roles.contains(role))
            .map(|(actor, _)| actor.clone())
            .collect())
    }

    async fn flags(&self) -> WorkflowResult<DocumentSnapshot> {
        Ok(self.flags.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_assign_and_lookup() {
        let directory = InMemoryRoleDirectory::new();
        directory.assign("sara", "Supervisor").await;
        directory.assign("sara", "Buyer").await;
        directory.assign("omar", "Supervisor").await;

        let roles = directory.roles_of(&ActorId::new("sara")).await.unwrap();
        assert_eq!(roles.len(), 2);

        let mut members = directory
            .members_of(&RoleId::new("Supervisor"))
            .await
            .unwrap();
        members.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(members, vec![ActorId::new("omar"), ActorId::new("sara")]);
    }

    #[tokio::test]
    async fn test_assign_is_idempotent() {
        let directory = InMemoryRoleDirectory::new();
        directory.assign("sara", "Supervisor").await;
        directory.assign("sara", "Supervisor").await;

        let roles = directory.roles_of(&ActorId::new("sara")).await.unwrap();
        assert_eq!(roles.len(), 1);
    }

    #[tokio::test]
    async fn test_revoke() {
        let directory = InMemoryRoleDirectory::new();
        directory.assign("sara", "Supervisor").await;
        directory
            .revoke(&ActorId::new("sara"), &RoleId::new("Supervisor"))
            .await;

        assert!(directory
            .roles_of(&ActorId::new("sara"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_flags() {
        let directory = InMemoryRoleDirectory::new();
        directory.set_flag("supervisor_absent", true).await;

        let flags = directory.flags().await.unwrap();
        assert_eq!(flags.get("supervisor_absent"), Some(&FieldValue::Bool(true)));
    }

    #[tokio::test]
    async fn test_unknown_actor_has_no_roles() {
        let directory = InMemoryRoleDirectory::new();
        assert!(directory
            .roles_of(&ActorId::new("ghost"))
            .await
            .unwrap()
            .is_empty());
    }
}

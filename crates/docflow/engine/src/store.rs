//! Document store: persistence seam for instances
//!
//! Writers race: a manual approval and an escalation tick can both
//! load the same instance. The store resolves that with a
//! compare-and-swap on `version_counter`; the loser gets `false` back
//! and retries against fresh state.

use async_trait::async_trait;
use docflow_types::{DocumentId, DocumentInstance, WorkflowError, WorkflowResult};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Persistence for document instances
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Load an instance by id
    async fn get(&self, id: &DocumentId) -> WorkflowResult<Option<DocumentInstance>>;

    /// Insert a new instance
    async fn insert(&self, instance: DocumentInstance) -> WorkflowResult<()>;

    /// Write an updated instance only if the stored `version_counter`
    /// still equals `expected_counter`. Returns `false` when another
    /// writer committed first.
    async fn compare_and_swap(
        &self,
        expected_counter: u64,
        instance: DocumentInstance,
    ) -> WorkflowResult<bool>;

    /// Remove an instance, returning it if present
    async fn remove(&self, id: &DocumentId) -> WorkflowResult<Option<DocumentInstance>>;

    /// All instance ids currently stored
    async fn list_ids(&self) -> WorkflowResult<Vec<DocumentId>>;
}

/// In-memory store backing tests and single-process deployments
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    instances: RwLock<HashMap<DocumentId, DocumentInstance>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored instances
    pub async fn count(&self) -> usize {
        self.instances.read().await.len()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, id: &DocumentId) -> WorkflowResult<Option<DocumentInstance>> {
        Ok(self.instances.read().await.get(id).cloned())
    }

    async fn insert(&self, instance: DocumentInstance) -> WorkflowResult<()> {
        self.instances
            .write()
            .await
            .insert(instance.id.clone(), instance);
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        expected_counter: u64,
        instance: DocumentInstance,
    ) -> WorkflowResult<bool> {
        let mut instances = self.instances.write().await;
        let current = instances
            .get(&instance.id)
            .ok_or_else(|| WorkflowError::InstanceNotFound(instance.id.clone()))?;

        if current.version_counter != expected_counter {
            return Ok(false);
        }

        instances.insert(instance.id.clone(), instance);
        Ok(true)
    }

    async fn remove(&self, id: &DocumentId) -> WorkflowResult<Option<DocumentInstance>> {
        Ok(self.instances.write().await.remove(id))
    }

    async fn list_ids(&self) -> WorkflowResult<Vec<DocumentId>> {
        Ok(self.instances.read().await.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use docflow_types::{DocumentSnapshot, DocumentType, StateName};

    fn make_instance() -> DocumentInstance {
        DocumentInstance::new(
            DocumentType::new("Purchase Order"),
            1,
            StateName::new("Pending Supervisor Approval"),
            DocumentSnapshot::new().with_field("grand_total", 3000.0),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = InMemoryDocumentStore::new();
        let instance = make_instance();
        let id = instance.id.clone();

        store.insert(instance).await.unwrap();
        assert!(store.get(&id).await.unwrap().is_some());
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn test_cas_commits_on_matching_counter() {
        let store = InMemoryDocumentStore::new();
        let mut instance = make_instance();
        let id = instance.id.clone();
        store.insert(instance.clone()).await.unwrap();

        instance.enter_state(StateName::new("Approved"), Utc::now());
        let committed = store.compare_and_swap(0, instance).await.unwrap();
        assert!(committed);

        let stored = store.get(&id).await.unwrap().unwrap();
        assert_eq!(stored.current_state, StateName::new("Approved"));
        assert_eq!(stored.version_counter, 1);
    }

    #[tokio::test]
    async fn test_cas_rejects_stale_counter() {
        let store = InMemoryDocumentStore::new();
        let instance = make_instance();
        let id = instance.id.clone();
        store.insert(instance.clone()).await.unwrap();

        // Writer A commits first
        let mut a = instance.clone();
        a.enter_state(StateName::new("Approved"), Utc::now());
        assert!(store.compare_and_swap(0, a).await.unwrap());

        // Writer B loaded the same counter and loses
        let mut b = instance;
        b.enter_state(StateName::new("Rejected"), Utc::now());
        assert!(!store.compare_and_swap(0, b).await.unwrap());

        let stored = store.get(&id).await.unwrap().unwrap();
        assert_eq!(stored.current_state, StateName::new("Approved"));
    }

    #[tokio::test]
    async fn test_cas_on_missing_instance() {
        let store = InMemoryDocumentStore::new();
        let result = store.compare_and_swap(0, make_instance()).await;
        assert!(matches!(result, Err(WorkflowError::InstanceNotFound(_))));
    }

    #[tokio::test]
    async fn test_remove() {
        let store = InMemoryDocumentStore::new();
        let instance = make_instance();
        let id = instance.id.clone();
        store.insert(instance).await.unwrap();

        assert!(store.remove(&id).await.unwrap().is_some());
        assert!(store.get(&id).await.unwrap().is_none());
        assert!(store.remove(&id).await.unwrap().is_none());
    }
}

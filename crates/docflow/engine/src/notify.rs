//! Notification dispatcher: best-effort delivery, off the commit path
//!
//! The executor enqueues a rendered message and moves on; a committed
//! transition is never blocked or reversed by notification trouble.
//! A small worker pool drains a bounded queue, retries each message
//! with exponential backoff, and parks permanent failures in a
//! dead-letter list.

use crate::directory::RoleDirectory;
use async_trait::async_trait;
use docflow_types::{
    DocumentSnapshot, NotificationEvent, RecipientSpec, RenderedNotification,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, RwLock};

/// Failure reported by a transport
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Hands rendered messages to the outside world
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn deliver(&self, message: RenderedNotification) -> Result<(), DeliveryError>;
}

/// Transport that records deliveries, for tests
#[derive(Debug, Default)]
pub struct MemoryTransport {
    delivered: RwLock<Vec<RenderedNotification>>,
    failures_remaining: std::sync::atomic::AtomicUsize,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` delivery attempts fail
    pub fn fail_next(&self, n: usize) {
        self.failures_remaining
            .store(n, std::sync::atomic::Ordering::SeqCst);
    }

    pub async fn delivered(&self) -> Vec<RenderedNotification> {
        self.delivered.read().await.clone()
    }
}

#[async_trait]
impl NotificationTransport for MemoryTransport {
    async fn deliver(&self, message: RenderedNotification) -> Result<(), DeliveryError> {
        let remaining = self
            .failures_remaining
            .load(std::sync::atomic::Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining
                .fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
            return Err(DeliveryError::Transport("injected failure".into()));
        }
        self.delivered.write().await.push(message);
        Ok(())
    }
}

/// Tuning for the dispatcher
#[derive(Clone, Debug)]
pub struct DispatchConfig {
    /// Bounded queue capacity; enqueue drops (with an error log) when full
    pub queue_capacity: usize,
    /// Number of delivery workers
    pub workers: usize,
    /// Delivery attempts per message before dead-lettering
    pub max_attempts: u32,
    /// Base backoff, doubled per failed attempt
    pub retry_base: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            workers: 2,
            max_attempts: 3,
            retry_base: Duration::from_millis(100),
        }
    }
}

/// Renders events and runs the delivery worker pool
pub struct NotificationDispatcher {
    directory: Arc<dyn RoleDirectory>,
    queue: mpsc::Sender<RenderedNotification>,
    enqueued: Arc<RwLock<VecDeque<RenderedNotification>>>,
    log_capacity: usize,
    dead_letters: Arc<RwLock<Vec<RenderedNotification>>>,
}

impl NotificationDispatcher {
    /// Create the dispatcher and spawn its workers
    pub fn new(
        transport: Arc<dyn NotificationTransport>,
        directory: Arc<dyn RoleDirectory>,
        config: DispatchConfig,
    ) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let rx = Arc::new(Mutex::new(rx));
        let dead_letters: Arc<RwLock<Vec<RenderedNotification>>> = Arc::default();

        for _ in 0..config.workers.max(1) {
            let rx = rx.clone();
            let transport = transport.clone();
            let dead_letters = dead_letters.clone();
            let config = config.clone();
            tokio::spawn(async move {
                loop {
                    let message = { rx.lock().await.recv().await };
                    let Some(message) = message else { break };
                    deliver_with_retry(&*transport, &dead_letters, &config, message).await;
                }
            });
        }

        Self {
            directory,
            queue: tx,
            enqueued: Arc::default(),
            log_capacity: config.queue_capacity,
            dead_letters,
        }
    }

    /// Render an event and queue it for delivery
    ///
    /// Recipients resolve through the role directory or straight from
    /// a snapshot field. A full queue drops the message with an error
    /// log; the caller's transition has already committed and stays
    /// committed.
    pub async fn enqueue(&self, event: NotificationEvent, snapshot: &DocumentSnapshot) {
        let (subject, body) = event.render(snapshot);

        let mut recipients = Vec::new();
        for spec in &event.recipients {
            match spec {
                RecipientSpec::Role(role) => match self.directory.members_of(role).await {
                    Ok(members) => recipients.extend(members.into_iter().map(|a| a.0)),
                    Err(error) => {
                        tracing::error!(role = %role, error = %error, "Recipient lookup failed");
                    }
                },
                RecipientSpec::DocumentField(field) => {
                    if let Some(value) = snapshot.get(field) {
                        recipients.push(value.display_string());
                    } else {
                        tracing::warn!(field = %field, "Recipient field missing from snapshot");
                    }
                }
            }
        }

        let message = RenderedNotification {
            document_id: event.document_id.clone(),
            trigger: event.trigger.clone(),
            recipients,
            subject,
            body,
            locale: event.locale.clone(),
            attach_document: event.attach_document,
        };

        {
            let mut log = self.enqueued.write().await;
            log.push_back(message.clone());
            while log.len() > self.log_capacity {
                log.pop_front();
            }
        }

        if let Err(error) = self.queue.try_send(message) {
            tracing::error!(
                document_id = %event.document_id,
                error = %error,
                "Notification queue full, message dropped"
            );
        }
    }

    /// Recently accepted messages, oldest first, capped at the queue capacity
    pub async fn enqueued(&self) -> Vec<RenderedNotification> {
        self.enqueued.read().await.iter().cloned().collect()
    }

    /// Messages that exhausted their delivery attempts
    pub async fn dead_letters(&self) -> Vec<RenderedNotification> {
        self.dead_letters.read().await.clone()
    }
}

async fn deliver_with_retry(
    transport: &dyn NotificationTransport,
    dead_letters: &RwLock<Vec<RenderedNotification>>,
    config: &DispatchConfig,
    message: RenderedNotification,
) {
    let mut backoff = config.retry_base;

    for attempt in 1..=config.max_attempts.max(1) {
        match transport.deliver(message.clone()).await {
            Ok(()) => return,
            Err(error) => {
                tracing::warn!(
                    document_id = %message.document_id,
                    attempt = attempt,
                    error = %error,
                    "Notification delivery failed"
                );
                if attempt < config.max_attempts {
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }
        }
    }

    tracing::error!(
        document_id = %message.document_id,
        "Notification dead-lettered after {} attempts",
        config.max_attempts
    );
    dead_letters.write().await.push(message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryRoleDirectory;
    use docflow_types::{DocumentId, NotificationTrigger, RoleId, StateName};

    fn test_config() -> DispatchConfig {
        DispatchConfig {
            queue_capacity: 16,
            workers: 1,
            max_attempts: 3,
            retry_base: Duration::from_millis(1),
        }
    }

    async fn wait_for<F, Fut>(mut check: F)
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        for _ in 0..200 {
            if check().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("Condition not reached in time");
    }

    #[tokio::test]
    async fn test_enqueue_resolves_role_recipients() {
        let transport = Arc::new(MemoryTransport::new());
        let directory = Arc::new(InMemoryRoleDirectory::new());
        directory.assign("sara", "Supervisor").await;
        directory.assign("omar", "Supervisor").await;

        let dispatcher = NotificationDispatcher::new(
            transport.clone(),
            directory.clone(),
            test_config(),
        );

        let event = NotificationEvent::state_entered(
            DocumentId::new("doc-1"),
            StateName::new("Pending Supervisor Approval"),
            &[RoleId::new("Supervisor")],
        );
        let snapshot = DocumentSnapshot::new().with_field("document_name", "PO-001");
        dispatcher.enqueue(event, &snapshot).await;

        let enqueued = dispatcher.enqueued().await;
        assert_eq!(enqueued.len(), 1);
        assert_eq!(enqueued[0].recipients.len(), 2);
        assert!(enqueued[0].subject.contains("PO-001"));

        let transport = transport.clone();
        wait_for(|| {
            let transport = transport.clone();
            async move { transport.delivered().await.len() == 1 }
        })
        .await;
    }

    #[tokio::test]
    async fn test_field_recipient_resolves_from_snapshot() {
        let transport = Arc::new(MemoryTransport::new());
        let directory = Arc::new(InMemoryRoleDirectory::new());
        let dispatcher =
            NotificationDispatcher::new(transport, directory, test_config());

        let event = NotificationEvent::new(
            DocumentId::new("doc-1"),
            NotificationTrigger::Submitted,
            "subject",
            "body",
        )
        .with_recipient(RecipientSpec::DocumentField("requested_by".into()));
        let snapshot = DocumentSnapshot::new().with_field("requested_by", "lina");

        dispatcher.enqueue(event, &snapshot).await;

        let enqueued = dispatcher.enqueued().await;
        assert_eq!(enqueued[0].recipients, vec!["lina".to_string()]);
    }

    #[tokio::test]
    async fn test_enqueued_log_is_bounded() {
        let transport = Arc::new(MemoryTransport::new());
        let directory = Arc::new(InMemoryRoleDirectory::new());
        let mut config = test_config();
        config.queue_capacity = 4;
        let dispatcher = NotificationDispatcher::new(transport, directory, config);

        for i in 0..6 {
            let event = NotificationEvent::new(
                DocumentId::new(format!("doc-{i}")),
                NotificationTrigger::Submitted,
                "subject",
                "body",
            );
            dispatcher.enqueue(event, &DocumentSnapshot::new()).await;
        }

        // Oldest entries roll off once the log reaches capacity
        let enqueued = dispatcher.enqueued().await;
        assert_eq!(enqueued.len(), 4);
        assert_eq!(enqueued[0].document_id, DocumentId::new("doc-2"));
        assert_eq!(enqueued[3].document_id, DocumentId::new("doc-5"));
    }

    #[tokio::test]
    async fn test_retry_then_success() {
        let transport = Arc::new(MemoryTransport::new());
        transport.fail_next(2);
        let directory = Arc::new(InMemoryRoleDirectory::new());
        let dispatcher = NotificationDispatcher::new(
            transport.clone(),
            directory,
            test_config(),
        );

        let event = NotificationEvent::new(
            DocumentId::new("doc-1"),
            NotificationTrigger::Submitted,
            "subject",
            "body",
        );
        dispatcher.enqueue(event, &DocumentSnapshot::new()).await;

        // Two failures then success on the third attempt
        let delivered = transport.clone();
        wait_for(|| {
            let delivered = delivered.clone();
            async move { delivered.delivered().await.len() == 1 }
        })
        .await;
        assert!(dispatcher.dead_letters().await.is_empty());
    }

    #[tokio::test]
    async fn test_dead_letter_after_exhausted_attempts() {
        let transport = Arc::new(MemoryTransport::new());
        transport.fail_next(10);
        let directory = Arc::new(InMemoryRoleDirectory::new());
        let dispatcher = NotificationDispatcher::new(
            transport.clone(),
            directory,
            test_config(),
        );

        let event = NotificationEvent::new(
            DocumentId::new("doc-1"),
            NotificationTrigger::Submitted,
            "subject",
            "body",
        );
        dispatcher.enqueue(event, &DocumentSnapshot::new()).await;

        let letters = dispatcher.dead_letters.clone();
        wait_for(|| {
            let letters = letters.clone();
            async move { letters.read().await.len() == 1 }
        })
        .await;
        assert!(transport.delivered().await.is_empty());
    }
}

//! Notification events and rendered messages
//!
//! The engine emits best-effort notification events on submission,
//! state entry, and escalation. Recipients resolve from a role (via
//! the role directory) or from a document field; subject/body templates
//! carry `{field}` placeholders filled from the snapshot. Delivery is
//! someone else's job: the dispatcher hands rendered messages to an
//! opaque transport.

use crate::{DocumentId, DocumentSnapshot, RoleId, RuleId, StateName};
use serde::{Deserialize, Serialize};

/// What caused a notification
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationTrigger {
    /// Document submitted into the workflow
    Submitted,
    /// Document entered a state
    StateEntered { state: StateName },
    /// An escalation rule reassigned the pending approver
    Escalated { rule_id: RuleId },
}

/// How to resolve recipients for a notification
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecipientSpec {
    /// All members of a role, per the role directory
    Role(RoleId),
    /// A document field holding an identity (e.g. `requested_by`)
    DocumentField(String),
}

/// A notification event queued by the engine
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NotificationEvent {
    /// The document concerned
    pub document_id: DocumentId,
    /// What happened
    pub trigger: NotificationTrigger,
    /// Who to tell
    pub recipients: Vec<RecipientSpec>,
    /// Subject template with `{field}` placeholders
    pub subject_template: String,
    /// Body template with `{field}` placeholders
    pub body_template: String,
    /// Opaque locale tag passed through to the transport
    pub locale: String,
    /// Whether the transport should attach the document
    pub attach_document: bool,
}

impl NotificationEvent {
    pub fn new(
        document_id: DocumentId,
        trigger: NotificationTrigger,
        subject_template: impl Into<String>,
        body_template: impl Into<String>,
    ) -> Self {
        Self {
            document_id,
            trigger,
            recipients: Vec::new(),
            subject_template: subject_template.into(),
            body_template: body_template.into(),
            locale: "en".to_string(),
            attach_document: false,
        }
    }

    /// Standard state-entry event addressed to the state's editor roles
    pub fn state_entered(document_id: DocumentId, state: StateName, roles: &[RoleId]) -> Self {
        let mut event = Self::new(
            document_id,
            NotificationTrigger::StateEntered {
                state: state.clone(),
            },
            format!("Action required: {{document_name}} is now {}", state),
            format!(
                "Document {{document_name}} entered state \"{}\" and awaits your review.",
                state
            ),
        );
        event.recipients = roles.iter().cloned().map(RecipientSpec::Role).collect();
        event
    }

    /// Standard submission event addressed to the initial state's roles
    pub fn submitted(document_id: DocumentId, roles: &[RoleId]) -> Self {
        let mut event = Self::new(
            document_id,
            NotificationTrigger::Submitted,
            "New document submitted: {document_name}",
            "Document {document_name} was submitted and awaits approval.",
        );
        event.recipients = roles.iter().cloned().map(RecipientSpec::Role).collect();
        event
    }

    /// Standard escalation event addressed to the new approver role
    pub fn escalated(document_id: DocumentId, rule_id: RuleId, approver: RoleId) -> Self {
        let mut event = Self::new(
            document_id,
            NotificationTrigger::Escalated { rule_id },
            "Escalated: {document_name} needs attention",
            "Document {document_name} exceeded its SLA and was escalated to you.",
        );
        event.recipients = vec![RecipientSpec::Role(approver)];
        event
    }

    pub fn with_recipient(mut self, recipient: RecipientSpec) -> Self {
        self.recipients.push(recipient);
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn with_attachment(mut self) -> Self {
        self.attach_document = true;
        self
    }

    /// Fill `{field}` placeholders from the snapshot. Unknown
    /// placeholders are left intact so a broken template is visible
    /// in the delivered message rather than silently blanked.
    pub fn render(&self, snapshot: &DocumentSnapshot) -> (String, String) {
        (
            render_template(&self.subject_template, snapshot),
            render_template(&self.body_template, snapshot),
        )
    }
}

/// A fully rendered message, ready for the transport
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenderedNotification {
    pub document_id: DocumentId,
    pub trigger: NotificationTrigger,
    /// Resolved identities (directory members or field values)
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
    pub locale: String,
    pub attach_document: bool,
}

fn render_template(template: &str, snapshot: &DocumentSnapshot) -> String {
    let mut out = template.to_string();
    for (name, value) in snapshot.iter() {
        let placeholder = format!("{{{}}}", name);
        if out.contains(&placeholder) {
            out = out.replace(&placeholder, &value.display_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_fills_placeholders() {
        let event = NotificationEvent::new(
            DocumentId::new("doc-1"),
            NotificationTrigger::Submitted,
            "New: {document_name}",
            "Total {grand_total} from {supplier}",
        );
        let snapshot = DocumentSnapshot::new()
            .with_field("document_name", "PO-001")
            .with_field("grand_total", 3000.0)
            .with_field("supplier", "Acme");

        let (subject, body) = event.render(&snapshot);
        assert_eq!(subject, "New: PO-001");
        assert_eq!(body, "Total 3000 from Acme");
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        let event = NotificationEvent::new(
            DocumentId::new("doc-1"),
            NotificationTrigger::Submitted,
            "New: {missing_field}",
            "body",
        );
        let (subject, _) = event.render(&DocumentSnapshot::new());
        assert_eq!(subject, "New: {missing_field}");
    }

    #[test]
    fn test_state_entered_recipients() {
        let event = NotificationEvent::state_entered(
            DocumentId::new("doc-1"),
            StateName::new("Pending Director Approval"),
            &[RoleId::new("Director")],
        );
        assert_eq!(event.recipients.len(), 1);
        assert!(matches!(
            &event.recipients[0],
            RecipientSpec::Role(r) if r.0 == "Director"
        ));
        assert!(matches!(
            &event.trigger,
            NotificationTrigger::StateEntered { state } if state.0 == "Pending Director Approval"
        ));
    }

    #[test]
    fn test_escalated_event() {
        let event = NotificationEvent::escalated(
            DocumentId::new("doc-1"),
            RuleId::new("esc-1"),
            RoleId::new("Department Head"),
        )
        .with_locale("ar")
        .with_attachment();

        assert_eq!(event.locale, "ar");
        assert!(event.attach_document);
        assert!(matches!(
            &event.trigger,
            NotificationTrigger::Escalated { rule_id } if rule_id.0 == "esc-1"
        ));
    }

    #[test]
    fn test_document_field_recipient() {
        let event = NotificationEvent::new(
            DocumentId::new("doc-1"),
            NotificationTrigger::Submitted,
            "s",
            "b",
        )
        .with_recipient(RecipientSpec::DocumentField("requested_by".into()));

        assert!(matches!(
            &event.recipients[0],
            RecipientSpec::DocumentField(f) if f == "requested_by"
        ));
    }
}

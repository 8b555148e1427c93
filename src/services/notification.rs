//! Notification service implementation
//!
//! The engine decides when to notify a participant; delivery mechanics are an
//! external collaborator behind the `NotificationGateway` trait. This module
//! handles message templating and hands rendered messages to the gateway.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::models::participant::Participant;
use crate::utils::errors::{EvregError, Result};

/// Template types the engine triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    ActivationRequest,
    ActivationConfirmed,
    Summary,
    PaymentReceived,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = match self {
            NotificationKind::ActivationRequest => "activation_request",
            NotificationKind::ActivationConfirmed => "activation_confirmed",
            NotificationKind::Summary => "summary",
            NotificationKind::PaymentReceived => "payment_received",
        };
        write!(f, "{key}")
    }
}

/// Message template structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageTemplate {
    pub subject: String,
    pub body: String,
}

/// A rendered message ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub participant_id: i64,
    pub contact_id: Option<i64>,
    pub kind: NotificationKind,
    pub subject: String,
    pub body: String,
}

/// Delivery seam; the real implementation enqueues mail outside the engine
pub trait NotificationGateway: Send + Sync {
    fn deliver(&self, message: &OutboundMessage) -> Result<()>;
}

/// Default gateway that only records deliveries in the log
#[derive(Debug, Default)]
pub struct TracingGateway;

impl NotificationGateway for TracingGateway {
    fn deliver(&self, message: &OutboundMessage) -> Result<()> {
        info!(
            participant_id = message.participant_id,
            kind = %message.kind,
            subject = %message.subject,
            "Notification delivered"
        );
        Ok(())
    }
}

/// Notification service for template rendering and dispatch
#[derive(Clone)]
pub struct NotificationService {
    gateway: Arc<dyn NotificationGateway>,
    templates: HashMap<NotificationKind, MessageTemplate>,
}

impl NotificationService {
    /// Create a new NotificationService instance
    pub fn new(gateway: Arc<dyn NotificationGateway>) -> Self {
        Self {
            gateway,
            templates: Self::load_default_templates(),
        }
    }

    /// Render a template and hand the message to the gateway
    pub fn notify(
        &self,
        participant: &Participant,
        kind: NotificationKind,
        parameters: &HashMap<String, String>,
    ) -> Result<()> {
        let message = self.render(participant, kind, parameters)?;
        debug!(
            participant_id = participant.id,
            kind = %kind,
            "Dispatching notification"
        );
        self.gateway.deliver(&message)
    }

    /// Render a message from a template and parameters
    pub fn render(
        &self,
        participant: &Participant,
        kind: NotificationKind,
        parameters: &HashMap<String, String>,
    ) -> Result<OutboundMessage> {
        let template = self
            .templates
            .get(&kind)
            .ok_or_else(|| EvregError::InvalidInput(format!("Template not found: {kind}")))?;

        let mut subject = template.subject.clone();
        let mut body = template.body.clone();
        for (key, value) in parameters {
            let placeholder = format!("{{{key}}}");
            subject = subject.replace(&placeholder, value);
            body = body.replace(&placeholder, value);
        }

        Ok(OutboundMessage {
            participant_id: participant.id,
            contact_id: participant.contact_id,
            kind,
            subject,
            body,
        })
    }

    /// Add or replace a message template
    pub fn add_template(&mut self, kind: NotificationKind, template: MessageTemplate) {
        self.templates.insert(kind, template);
    }

    /// Load default message templates
    fn load_default_templates() -> HashMap<NotificationKind, MessageTemplate> {
        let mut templates = HashMap::new();

        templates.insert(
            NotificationKind::ActivationRequest,
            MessageTemplate {
                subject: "Confirm your registration for {event_name}".to_string(),
                body: "Hello,\n\nplease confirm your registration for {event_name} \
                       using this code: {token}\n\nThe code expires on {expires_at}."
                    .to_string(),
            },
        );

        templates.insert(
            NotificationKind::ActivationConfirmed,
            MessageTemplate {
                subject: "Registration confirmed".to_string(),
                body: "Your registration for {event_name} is confirmed.\n\n\
                       Total price: {price_total}\nDeposit due: {deposit_total}"
                    .to_string(),
            },
        );

        templates.insert(
            NotificationKind::Summary,
            MessageTemplate {
                subject: "Your registration summary".to_string(),
                body: "Registration summary for {event_name}:\n\
                       Total price: {price_total}\nPaid so far: {paid}\nRemaining: {remaining}"
                    .to_string(),
            },
        );

        templates.insert(
            NotificationKind::PaymentReceived,
            MessageTemplate {
                subject: "Payment received".to_string(),
                body: "We received your payment of {amount} {currency}.\n\
                       Remaining price: {remaining}"
                    .to_string(),
            },
        );

        templates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::lifecycle::{ActivationState, EntityState};
    use chrono::Utc;
    use std::sync::Mutex;

    pub(crate) struct RecordingGateway {
        pub delivered: Mutex<Vec<OutboundMessage>>,
    }

    impl RecordingGateway {
        pub fn new() -> Self {
            Self {
                delivered: Mutex::new(Vec::new()),
            }
        }
    }

    impl NotificationGateway for RecordingGateway {
        fn deliver(&self, message: &OutboundMessage) -> Result<()> {
            self.delivered.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    fn participant() -> Participant {
        Participant {
            id: 42,
            offer_id: 1,
            event_id: 1,
            contact_id: Some(9),
            activation_state: ActivationState::Unconfirmed,
            notes: None,
            price_total: 1000,
            deposit_total: 200,
            paid: 0,
            variable_symbol: "1234567890".to_string(),
            state: EntityState::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_render_substitutes_parameters() {
        let service = NotificationService::new(Arc::new(TracingGateway));
        let mut parameters = HashMap::new();
        parameters.insert("event_name".to_string(), "Spring Conference".to_string());
        parameters.insert("token".to_string(), "abc123".to_string());
        parameters.insert("expires_at".to_string(), "2026-09-01".to_string());

        let message = service
            .render(&participant(), NotificationKind::ActivationRequest, &parameters)
            .unwrap();

        assert!(message.subject.contains("Spring Conference"));
        assert!(message.body.contains("abc123"));
        assert_eq!(message.participant_id, 42);
        assert_eq!(message.contact_id, Some(9));
    }

    #[test]
    fn test_notify_reaches_gateway() {
        let gateway = Arc::new(RecordingGateway::new());
        let service = NotificationService::new(gateway.clone());

        service
            .notify(
                &participant(),
                NotificationKind::Summary,
                &HashMap::new(),
            )
            .unwrap();

        let delivered = gateway.delivered.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].kind, NotificationKind::Summary);
    }
}

//! Email capability: deliver a formatted message to a recipient list.

use crate::models::EmailSettings;
use crate::providers::http::{HttpCapability, HttpRequest};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Reason reported by a successful delivery
pub const SENT: &str = "Sent";

/// Outbound email
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub from_addr: String,
    pub to_addrs: Vec<String>,
    pub subject: String,
    pub content: String,
}

/// Delivery verdict with a human-readable reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailReceipt {
    pub ok: bool,
    pub reason: String,
}

impl EmailReceipt {
    pub fn sent() -> Self {
        Self {
            ok: true,
            reason: SENT.to_string(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: reason.into(),
        }
    }
}

/// Sends email; failures are reported in the receipt, never raised.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> EmailReceipt;
}

/// Email sender that hands messages to an HTTP mail relay.
pub struct RelayEmailSender {
    http: Arc<dyn HttpCapability>,
    settings: EmailSettings,
}

impl RelayEmailSender {
    pub fn new(http: Arc<dyn HttpCapability>, settings: EmailSettings) -> Self {
        Self { http, settings }
    }

    fn failure_reason(status_code: i32, body: &serde_json::Map<String, Value>) -> String {
        ["error", "message", "reason"]
            .iter()
            .find_map(|key| body.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}", status_code))
    }
}

#[async_trait]
impl EmailSender for RelayEmailSender {
    async fn send(&self, message: &EmailMessage) -> EmailReceipt {
        if self.settings.relay_url.is_empty() {
            return EmailReceipt::failed("The email relay_url option is unset");
        }

        let mut request = HttpRequest::post(&self.settings.relay_url).json(json!({
            "from": message.from_addr,
            "to": message.to_addrs,
            "subject": message.subject,
            "text": message.content,
        }));
        if !self.settings.username.is_empty() {
            request = request.basic_auth(&self.settings.username, &self.settings.password);
        }

        let reply = self.http.send(request).await;
        if reply.is_success_status() {
            tracing::debug!(receivers = message.to_addrs.len(), "Email accepted by relay");
            EmailReceipt::sent()
        } else if reply.is_transport_failure() {
            EmailReceipt::failed("Relay unreachable")
        } else {
            EmailReceipt::failed(Self::failure_reason(reply.status_code, &reply.body))
        }
    }
}

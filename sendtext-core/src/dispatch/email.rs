use super::Dispatcher;
use crate::models::DispatchResult;
use crate::providers::EmailMessage;
use serde_json::{json, Value};

const EMAIL_TIP: &str = "Check the relay_url, username and password options in the [email] section.";
const MASK: &str = "******";

impl Dispatcher {
    pub(super) async fn send_email(
        &self,
        receivers: &[String],
        subject: &str,
        text: &str,
    ) -> DispatchResult {
        let message = EmailMessage {
            from_addr: self.config.email.from_addr.clone(),
            to_addrs: receivers.to_vec(),
            subject: subject.to_string(),
            content: text.to_string(),
        };
        let receipt = self.email.send(&message).await;

        if receipt.ok {
            DispatchResult::ok(json!({
                "reason": receipt.reason,
                "sender": message.from_addr,
                "receivers": message.to_addrs,
                "subject": message.subject,
                "text": message.content,
            }))
        } else {
            tracing::error!(reason = %receipt.reason, "Fail to send text via email");
            DispatchResult::error(json!({ "reason": receipt.reason }))
                .with_debug(self.email_parameters(&message))
                .with_tip(EMAIL_TIP)
        }
    }

    /// Full outbound parameter set for diagnosis; the password is masked.
    fn email_parameters(&self, message: &EmailMessage) -> Value {
        let settings = &self.config.email;
        let password = if settings.password.is_empty() { "" } else { MASK };
        json!({
            "relay_url": settings.relay_url,
            "email_username": settings.username,
            "email_password": password,
            "from_addr": message.from_addr,
            "to_addrs": message.to_addrs,
            "subject": message.subject,
            "content": message.content,
        })
    }
}

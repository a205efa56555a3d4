//! Target and text resolution from layered request inputs.
//!
//! Every lookup has a terminal fallback, so resolution never fails.

use crate::models::{ChannelKind, Configuration, NotificationRequest, RequestInputs, ResolvedTarget};
use regex::Regex;
use std::sync::OnceLock;

/// Text sent when a request carries neither text nor a body
pub const PLACEHOLDER_TEXT: &str = "test";

fn address_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"[^\s"',;\[\]]+@[^\s"',;\[\]]+"#).expect("address pattern is valid")
    })
}

/// Pull every address out of a string that may mix quotes, commas,
/// semicolons, brackets and whitespace as separators.
pub fn extract_addresses(raw: &str) -> Vec<&str> {
    address_pattern()
        .find_iter(raw)
        .map(|m| m.as_str())
        .collect()
}

/// Resolve a request for `kind` against the configured defaults.
pub fn resolve(
    kind: ChannelKind,
    inputs: &RequestInputs,
    config: &Configuration,
) -> NotificationRequest {
    let target = match kind {
        ChannelKind::Email => ResolvedTarget::Email {
            receivers: resolve_receivers(inputs, &config.email.to_addrs),
            subject: resolve_subject(inputs, &config.email.subject),
        },
        ChannelKind::Slack => {
            ResolvedTarget::SlackChannel(resolve_slack_channel(inputs, &config.slack.channel))
        }
        ChannelKind::Telegram => ResolvedTarget::TelegramChat,
    };
    let text = resolve_text(inputs);
    tracing::debug!(channel = %kind, ?target, text = %text, "Resolved request");
    NotificationRequest { kind, target, text }
}

/// Query `receivers` first, then body `receivers`, else the defaults.
pub fn resolve_receivers(inputs: &RequestInputs, defaults: &[String]) -> Vec<String> {
    let raw = inputs
        .query_value("receivers")
        .map(str::to_string)
        .or_else(|| inputs.body_value("receivers"))
        .unwrap_or_default();
    let receivers: Vec<String> = extract_addresses(&raw)
        .into_iter()
        .map(str::to_string)
        .collect();
    if receivers.is_empty() {
        defaults.to_vec()
    } else {
        receivers
    }
}

pub fn resolve_subject(inputs: &RequestInputs, default: &str) -> String {
    layered(inputs, "subject").unwrap_or_else(|| default.to_string())
}

pub fn resolve_slack_channel(inputs: &RequestInputs, default: &str) -> String {
    layered(inputs, "channel").unwrap_or_else(|| default.to_string())
}

/// Path text, then query `text`, then the whole body as JSON, then the placeholder.
pub fn resolve_text(inputs: &RequestInputs) -> String {
    if let Some(text) = inputs.path_text().or_else(|| inputs.query_value("text")) {
        return text.to_string();
    }
    match inputs.body.as_ref().filter(|body| !body.is_empty()) {
        Some(body) => serde_json::to_string(body).unwrap_or_else(|_| PLACEHOLDER_TEXT.to_string()),
        None => PLACEHOLDER_TEXT.to_string(),
    }
}

fn layered(inputs: &RequestInputs, key: &str) -> Option<String> {
    inputs
        .path_subject_channel()
        .or_else(|| inputs.query_value(key))
        .map(str::to_string)
        .or_else(|| inputs.body_value(key))
}

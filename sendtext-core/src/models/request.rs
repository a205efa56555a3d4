//! Inbound notification request models

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Delivery channel selected by a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Email,
    Slack,
    Telegram,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Email => "email",
            ChannelKind::Slack => "slack",
            ChannelKind::Telegram => "telegram",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Unknown channel kind: {0} (expected email, slack, telegram or tg)")]
pub struct UnknownChannelKind(pub String);

impl FromStr for ChannelKind {
    type Err = UnknownChannelKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(ChannelKind::Email),
            "slack" => Ok(ChannelKind::Slack),
            "telegram" | "tg" => Ok(ChannelKind::Telegram),
            _ => Err(UnknownChannelKind(s.to_string())),
        }
    }
}

/// Raw, layered inputs of one request before resolution.
///
/// Path parameters take precedence over the query string, which takes
/// precedence over the body.
#[derive(Debug, Clone, Default)]
pub struct RequestInputs {
    /// `/{opt}/{subject_channel}/{text}`: email subject or Slack channel
    pub subject_channel: Option<String>,
    /// `/{opt}/{text}` or `/{opt}/{subject_channel}/{text}`
    pub text: Option<String>,
    pub query: HashMap<String, String>,
    /// Form fields or a JSON object; `None` when no body was sent
    pub body: Option<Map<String, Value>>,
}

impl RequestInputs {
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_subject_channel(mut self, value: impl Into<String>) -> Self {
        self.subject_channel = Some(value.into());
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Map<String, Value>) -> Self {
        self.body = Some(body);
        self
    }

    /// Non-empty query value
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Non-empty body value rendered as text
    pub fn body_value(&self, key: &str) -> Option<String> {
        match self.body.as_ref()?.get(key)? {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Non-empty path parameter for subject/channel
    pub fn path_subject_channel(&self) -> Option<&str> {
        self.subject_channel.as_deref().filter(|s| !s.is_empty())
    }

    /// Non-empty path parameter for text
    pub fn path_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|s| !s.is_empty())
    }
}

/// Fully resolved addressing for the active channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedTarget {
    Email {
        receivers: Vec<String>,
        subject: String,
    },
    SlackChannel(String),
    /// Telegram addresses the cached chat, not a request value
    TelegramChat,
}

/// A request after resolution; always carries a usable target and text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub kind: ChannelKind,
    pub target: ResolvedTarget,
    pub text: String,
}

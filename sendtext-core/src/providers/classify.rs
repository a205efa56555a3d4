//! Provider response classification.
//!
//! Each provider has a closed set of known response shapes; anything that does
//! not deserialize into one of them is a [`ProviderOutcome::GenericError`].
//! Transport failures classify as [`ProviderOutcome::AuthFailure`] so that
//! cached authorization is invalidated rather than trusted.

use crate::providers::http::TRANSPORT_FAILURE;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderOutcome {
    Success,
    AuthFailure,
    ResourceNotFound,
    GenericError,
}

impl fmt::Display for ProviderOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProviderOutcome::Success => "success",
            ProviderOutcome::AuthFailure => "auth_failure",
            ProviderOutcome::ResourceNotFound => "resource_not_found",
            ProviderOutcome::GenericError => "generic_error",
        })
    }
}

/// `{"ok": bool, "error": "..."}`
#[derive(Debug, Deserialize)]
struct SlackEnvelope {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// `{"ok": bool, "error_code": n, "description": "..."}`
#[derive(Debug, Deserialize)]
struct TelegramEnvelope {
    ok: bool,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    description: Option<String>,
}

const SLACK_AUTH_ERRORS: &[&str] = &[
    "invalid_auth",
    "not_authed",
    "account_inactive",
    "token_revoked",
    "token_expired",
];
const SLACK_NOT_FOUND_ERRORS: &[&str] = &["channel_not_found"];

const TELEGRAM_AUTH_CODES: &[i64] = &[401, 404];
const TELEGRAM_AUTH_DESCRIPTIONS: &[&str] = &["Unauthorized", "Not Found"];
const TELEGRAM_CHAT_NOT_FOUND: &str = "chat not found";

fn envelope<T: for<'de> Deserialize<'de>>(body: &Map<String, Value>) -> Option<T> {
    serde_json::from_value(Value::Object(body.clone())).ok()
}

/// Classify a `chat.postMessage` response.
pub fn classify_slack(status_code: i32, body: &Map<String, Value>) -> ProviderOutcome {
    if status_code == TRANSPORT_FAILURE || status_code == 401 {
        return ProviderOutcome::AuthFailure;
    }
    let Some(envelope) = envelope::<SlackEnvelope>(body) else {
        return ProviderOutcome::GenericError;
    };
    match envelope.error.as_deref() {
        Some(error) if SLACK_AUTH_ERRORS.contains(&error) => ProviderOutcome::AuthFailure,
        Some(error) if SLACK_NOT_FOUND_ERRORS.contains(&error) => {
            ProviderOutcome::ResourceNotFound
        }
        _ if status_code == 200 && envelope.ok => ProviderOutcome::Success,
        _ => ProviderOutcome::GenericError,
    }
}

/// Classify a Telegram Bot API response (`getMe`, `getUpdates`, `sendMessage`).
pub fn classify_telegram(status_code: i32, body: &Map<String, Value>) -> ProviderOutcome {
    if status_code == TRANSPORT_FAILURE {
        return ProviderOutcome::AuthFailure;
    }
    let Some(envelope) = envelope::<TelegramEnvelope>(body) else {
        return if TELEGRAM_AUTH_CODES.contains(&i64::from(status_code)) {
            ProviderOutcome::AuthFailure
        } else {
            ProviderOutcome::GenericError
        };
    };
    let description = envelope.description.as_deref().unwrap_or_default();
    if envelope
        .error_code
        .is_some_and(|code| TELEGRAM_AUTH_CODES.contains(&code))
        || TELEGRAM_AUTH_DESCRIPTIONS.contains(&description)
    {
        ProviderOutcome::AuthFailure
    } else if description.contains(TELEGRAM_CHAT_NOT_FOUND) {
        ProviderOutcome::ResourceNotFound
    } else if status_code == 200 && envelope.ok {
        ProviderOutcome::Success
    } else {
        ProviderOutcome::GenericError
    }
}

//! Uniform dispatch result returned to callers

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome status as seen by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchStatus {
    Ok,
    Error,
}

/// Provider-independent response body.
///
/// `debug` and `tip` only ever accompany an `Error` status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchResult {
    pub status: DispatchStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<i32>,
    pub result: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tip: Option<String>,
    pub when: String,
}

impl DispatchResult {
    pub fn ok(result: Value) -> Self {
        Self {
            status: DispatchStatus::Ok,
            url: None,
            status_code: None,
            result,
            debug: None,
            tip: None,
            when: now_string(),
        }
    }

    pub fn error(result: Value) -> Self {
        Self {
            status: DispatchStatus::Error,
            ..Self::ok(result)
        }
    }

    pub fn with_call(mut self, url: impl Into<String>, status_code: i32) -> Self {
        self.url = Some(url.into());
        self.status_code = Some(status_code);
        self
    }

    /// Attach diagnostics; ignored on success.
    pub fn with_debug(mut self, debug: Value) -> Self {
        if self.is_error() {
            self.debug = Some(debug);
        }
        self
    }

    /// Attach a help hint; ignored on success.
    pub fn with_tip(mut self, tip: impl Into<String>) -> Self {
        if self.is_error() {
            self.tip = Some(tip.into());
        }
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == DispatchStatus::Ok
    }

    pub fn is_error(&self) -> bool {
        self.status == DispatchStatus::Error
    }
}

/// Local wall-clock time used for `when`
pub fn now_string() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

//! Dispatch failure taxonomy.
//!
//! Every variant is rendered into a [`DispatchResult`] at the dispatcher
//! boundary; none of them escapes to the caller as an `Err`.

use crate::models::DispatchResult;
use crate::providers::HttpReply;
use serde_json::{Map, Value};
use thiserror::Error;

/// A provider call as it will be echoed back to the caller
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderCall {
    pub url: String,
    pub status_code: i32,
    pub body: Map<String, Value>,
}

impl ProviderCall {
    pub fn new(url: impl Into<String>, reply: HttpReply) -> Self {
        Self {
            url: url.into(),
            status_code: reply.status_code,
            body: reply.body,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    /// A required credential is not configured; no call was attempted.
    #[error("The {0} option is unset")]
    ConfigurationMissing(&'static str),

    #[error("provider unreachable")]
    TransportFailure(ProviderCall),

    #[error("provider rejected the credential (status {})", .0.status_code)]
    AuthFailure(ProviderCall),

    /// The target could not be discovered; the message guides the operator.
    #[error("{0}")]
    ResourceNotFound(String),

    /// A previously discovered chat was rejected by the provider.
    #[error("cached chat is no longer valid (status {})", .0.status_code)]
    ChatStale(ProviderCall),

    #[error("provider error (status {})", .0.status_code)]
    GenericProviderError(ProviderCall),
}

impl DispatchError {
    /// Name used in structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::ConfigurationMissing(_) => "configuration_missing",
            DispatchError::TransportFailure(_) => "transport_failure",
            DispatchError::AuthFailure(_) => "auth_failure",
            DispatchError::ResourceNotFound(_) => "resource_not_found",
            DispatchError::ChatStale(_) => "chat_stale",
            DispatchError::GenericProviderError(_) => "generic_provider_error",
        }
    }

    pub fn into_result(self) -> DispatchResult {
        match self {
            DispatchError::ConfigurationMissing(_) | DispatchError::ResourceNotFound(_) => {
                DispatchResult::error(Value::String(self.to_string()))
            }
            DispatchError::TransportFailure(call)
            | DispatchError::AuthFailure(call)
            | DispatchError::ChatStale(call)
            | DispatchError::GenericProviderError(call) => {
                DispatchResult::error(Value::Object(call.body)).with_call(call.url, call.status_code)
            }
        }
    }
}

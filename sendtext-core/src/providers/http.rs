//! Outbound HTTP capability used for every provider call.
//!
//! Implementations never fail: transport errors and timeouts are reported as
//! [`TRANSPORT_FAILURE`] with an empty body.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use std::time::Duration;

/// Status code reported when no HTTP response was received
pub const TRANSPORT_FAILURE: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HttpBody {
    Empty,
    Form(Vec<(String, String)>),
    Json(Value),
}

/// A single outbound call
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub body: HttpBody,
    pub basic_auth: Option<(String, String)>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            body: HttpBody::Empty,
            basic_auth: None,
        }
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            ..Self::get(url)
        }
    }

    pub fn form<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.body = HttpBody::Form(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = HttpBody::Json(body);
        self
    }

    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some((username.into(), password.into()));
        self
    }

    /// Value of a form field, if the body is a form. Test aid for mock capabilities.
    pub fn form_value(&self, key: &str) -> Option<&str> {
        match &self.body {
            HttpBody::Form(fields) => fields
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }
}

/// Status code plus JSON object body (empty when the body was not an object)
#[derive(Debug, Clone, PartialEq)]
pub struct HttpReply {
    pub status_code: i32,
    pub body: Map<String, Value>,
}

impl HttpReply {
    pub fn new(status_code: i32, body: Value) -> Self {
        let body = match body {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self { status_code, body }
    }

    pub fn transport_failure() -> Self {
        Self {
            status_code: TRANSPORT_FAILURE,
            body: Map::new(),
        }
    }

    pub fn is_transport_failure(&self) -> bool {
        self.status_code == TRANSPORT_FAILURE
    }

    pub fn is_success_status(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Capability for issuing provider calls.
#[async_trait]
pub trait HttpCapability: Send + Sync {
    async fn send(&self, request: HttpRequest) -> HttpReply;
}

/// reqwest-backed capability with a client-wide timeout.
#[derive(Clone)]
pub struct ReqwestHttp {
    client: Client,
}

impl ReqwestHttp {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sendtext/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpCapability for ReqwestHttp {
    async fn send(&self, request: HttpRequest) -> HttpReply {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };
        builder = match &request.body {
            HttpBody::Empty => builder,
            HttpBody::Form(fields) => builder.form(fields),
            HttpBody::Json(body) => builder.json(body),
        };
        if let Some((username, password)) = &request.basic_auth {
            builder = builder.basic_auth(username, Some(password));
        }

        // Urls may embed bot tokens, so errors are logged without them.
        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => {
                let timeout = err.is_timeout();
                tracing::warn!(
                    error = %err.without_url(),
                    timeout,
                    "Provider call failed before a response"
                );
                return HttpReply::transport_failure();
            }
        };

        let status_code = i32::from(response.status().as_u16());
        match response.json::<Value>().await {
            Ok(body) => HttpReply::new(status_code, body),
            Err(err) if err.is_timeout() => {
                tracing::warn!("Provider response body timed out");
                HttpReply::transport_failure()
            }
            Err(err) => {
                tracing::debug!(status_code, error = %err.without_url(), "Provider body is not JSON");
                HttpReply::new(status_code, Value::Null)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reply_keeps_only_objects() {
        assert!(HttpReply::new(200, json!([1, 2])).body.is_empty());
        assert_eq!(HttpReply::new(200, json!({"ok": true})).body["ok"], true);
    }

    #[test]
    fn test_transport_failure_sentinel() {
        let reply = HttpReply::transport_failure();
        assert!(reply.is_transport_failure());
        assert!(!reply.is_success_status());
        assert!(reply.body.is_empty());
    }

    #[test]
    fn test_request_builders() {
        let request = HttpRequest::post("https://example.com")
            .form([("token", "t"), ("text", "hello")])
            .basic_auth("u", "p");
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.form_value("text"), Some("hello"));
        assert_eq!(request.form_value("missing"), None);
        assert_eq!(request.basic_auth, Some(("u".into(), "p".into())));
        assert_eq!(HttpRequest::get("x").form_value("text"), None);
    }
}

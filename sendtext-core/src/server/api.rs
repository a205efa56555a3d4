//! HTTP API routes for sending text

use crate::dispatch::Dispatcher;
use crate::models::{ChannelKind, RequestInputs};
use bytes::Bytes;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::Filter;

/// Health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub storage: String,
    pub alert_channels: Vec<ChannelKind>,
}

/// Error body for requests that never reach a dispatcher
#[derive(Debug, Clone, Serialize)]
struct ApiErrorResponse {
    status: &'static str,
    result: String,
    when: String,
}

/// Largest accepted request body
pub const MAX_BODY_BYTES: u64 = 256 * 1024;

/// Path parameters: channel kind, optional subject/channel, optional text
type SendTextPath = (String, Option<String>, Option<String>);

/// Create HTTP API routes
pub fn create_api_routes(
    dispatcher: Arc<Dispatcher>,
    storage_engine: &'static str,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let dispatcher_filter = warp::any().map(move || Arc::clone(&dispatcher));

    // /sendtext/{opt}
    let opt_only = warp::path!("sendtext" / String)
        .map(|opt: String| -> SendTextPath { (opt, None, None) });
    // /sendtext/{opt}/{text}
    let opt_text = warp::path!("sendtext" / String / String)
        .map(|opt: String, text: String| -> SendTextPath { (opt, None, Some(text)) });
    // /sendtext/{opt}/{subject_channel}/{text}
    let opt_subject_text = warp::path!("sendtext" / String / String / String).map(
        |opt: String, subject_channel: String, text: String| -> SendTextPath {
            (opt, Some(subject_channel), Some(text))
        },
    );

    // GET carries no body; POST bodies must declare a bounded length
    let body = warp::get()
        .map(Bytes::new)
        .or(warp::post()
            .and(warp::body::content_length_limit(MAX_BODY_BYTES))
            .and(warp::body::bytes()))
        .unify();

    let send_text = opt_only
        .or(opt_text)
        .unify()
        .or(opt_subject_text)
        .unify()
        .and(warp::query::<HashMap<String, String>>())
        .and(warp::header::optional::<String>("content-type"))
        .and(body)
        .and(dispatcher_filter.clone())
        .and_then(handle_send_text);

    // GET /api/v1/health - Health check endpoint
    let get_health = warp::path!("api" / "v1" / "health")
        .and(warp::get())
        .and(dispatcher_filter)
        .map(move |dispatcher: Arc<Dispatcher>| {
            warp::reply::json(&HealthResponse {
                status: "healthy".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                storage: storage_engine.to_string(),
                alert_channels: dispatcher.alert_channels(),
            })
        });

    send_text.or(get_health)
}

/// Handle GET|POST /sendtext/...
async fn handle_send_text(
    path: SendTextPath,
    query: HashMap<String, String>,
    content_type: Option<String>,
    body: Bytes,
    dispatcher: Arc<Dispatcher>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let (opt, subject_channel, text) = path;
    let kind = match opt.parse::<ChannelKind>() {
        Ok(kind) => kind,
        Err(err) => {
            let response = ApiErrorResponse {
                status: "error",
                result: err.to_string(),
                when: crate::models::now_string(),
            };
            return Ok(warp::reply::with_status(
                warp::reply::json(&response),
                StatusCode::NOT_FOUND,
            ));
        }
    };

    let inputs = RequestInputs {
        subject_channel: subject_channel.map(decode_segment),
        text: text.map(decode_segment),
        query,
        body: parse_body(content_type.as_deref(), &body),
    };
    let result = dispatcher.dispatch(kind, &inputs).await;
    Ok(warp::reply::with_status(
        warp::reply::json(&result),
        StatusCode::OK,
    ))
}

/// Percent-decode a path segment, keeping it as-is when it is not valid UTF-8
fn decode_segment(segment: String) -> String {
    match urlencoding::decode(&segment) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => segment,
    }
}

/// JSON object or form fields; anything else counts as no body.
pub fn parse_body(content_type: Option<&str>, body: &[u8]) -> Option<Map<String, Value>> {
    if body.is_empty() {
        return None;
    }
    let content_type = content_type.unwrap_or_default().to_ascii_lowercase();
    if content_type.starts_with("application/json") {
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(map)) => Some(map),
            Ok(_) => {
                tracing::debug!("JSON body is not an object, ignoring");
                None
            }
            Err(err) => {
                tracing::debug!(error = %err, "Invalid JSON body, ignoring");
                None
            }
        }
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let form: Map<String, Value> = url::form_urlencoded::parse(body)
            .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
            .collect();
        (!form.is_empty()).then_some(form)
    } else {
        None
    }
}

//! Integration test: Telegram discovery, caching, sticky authorization and the
//! bounded "chat not found" self-heal.

use async_trait::async_trait;
use sendtext_core::dispatch::{AuthState, Dispatcher, SessionIdentityCache};
use sendtext_core::models::{ChannelKind, Configuration, DispatchStatus, RequestInputs};
use sendtext_core::providers::{
    EmailMessage, EmailReceipt, EmailSender, HttpCapability, HttpReply, HttpRequest,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const TOKEN: &str = "123:abc";

/// Mock capability replying per Telegram method; the last scripted reply repeats.
#[derive(Default)]
struct TelegramApi {
    replies: Mutex<HashMap<&'static str, Vec<HttpReply>>>,
    calls: Mutex<Vec<HttpRequest>>,
}

impl TelegramApi {
    fn script(self, method: &'static str, replies: Vec<HttpReply>) -> Self {
        self.replies.lock().unwrap().insert(method, replies);
        self
    }

    fn count(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.url.contains(&format!("/{}", method)))
            .count()
    }

    fn sent_texts(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|request| request.form_value("text").map(str::to_string))
            .collect()
    }
}

#[async_trait]
impl HttpCapability for TelegramApi {
    async fn send(&self, request: HttpRequest) -> HttpReply {
        let method = ["getMe", "getUpdates", "sendMessage"]
            .into_iter()
            .find(|method| request.url.contains(&format!("/{}", method)))
            .expect("unexpected Telegram method");
        self.calls.lock().unwrap().push(request);
        let mut replies = self.replies.lock().unwrap();
        let queue = replies.get_mut(method).expect("method not scripted");
        if queue.len() > 1 {
            queue.remove(0)
        } else {
            queue[0].clone()
        }
    }
}

struct NoEmail;

#[async_trait]
impl EmailSender for NoEmail {
    async fn send(&self, _message: &EmailMessage) -> EmailReceipt {
        panic!("email must not be used by the Telegram flow");
    }
}

fn reply(status: i32, body: Value) -> HttpReply {
    HttpReply::new(status, body)
}

fn get_me(username: Option<&str>) -> HttpReply {
    let mut user = json!({"id": 7, "is_bot": true, "first_name": "Alerts"});
    if let Some(username) = username {
        user["username"] = json!(username);
    }
    reply(200, json!({"ok": true, "result": user}))
}

fn updates_with_chat(id: i64) -> HttpReply {
    reply(
        200,
        json!({"ok": true, "result": [
            {"update_id": 1, "message": {"message_id": 1, "text": "/start",
                "chat": {"id": id, "first_name": "Ada", "last_name": "Lovelace", "type": "private"}}}
        ]}),
    )
}

fn sent(text: &str) -> HttpReply {
    reply(200, json!({"ok": true, "result": {"message_id": 9, "text": text}}))
}

fn chat_not_found() -> HttpReply {
    reply(
        400,
        json!({"ok": false, "error_code": 400, "description": "Bad Request: chat not found"}),
    )
}

fn config(token: &str) -> Configuration {
    let mut config = Configuration::default();
    config.telegram.token = token.to_string();
    config
}

fn dispatcher(api: &Arc<TelegramApi>, token: &str) -> Dispatcher {
    Dispatcher::new(config(token), api.clone(), Arc::new(NoEmail))
}

#[tokio::test]
async fn test_first_call_discovers_and_sends() {
    let api = Arc::new(
        TelegramApi::default()
            .script("getMe", vec![get_me(Some("alert_bot"))])
            .script("getUpdates", vec![updates_with_chat(42)])
            .script("sendMessage", vec![sent("test")]),
    );
    let dispatcher = dispatcher(&api, TOKEN);

    let result = dispatcher
        .dispatch(ChannelKind::Telegram, &RequestInputs::default())
        .await;

    assert_eq!(result.status, DispatchStatus::Ok);
    assert_eq!(result.status_code, Some(200));
    assert!(result
        .url
        .as_deref()
        .unwrap()
        .contains("https://api.telegram.org/bot123:abc/sendMessage?chat_id=42"));
    assert_eq!(result.result["result"]["text"], "test");
    assert!(result.debug.is_none());
    assert!(result.tip.is_none());
    assert_eq!(api.sent_texts(), vec!["test"]);

    let snapshot = dispatcher.identity_cache().snapshot().await;
    assert_eq!(snapshot.auth, AuthState::Authorized);
    assert_eq!(snapshot.bot_identity.as_deref(), Some("alert_bot"));
    let chat = snapshot.chat.unwrap();
    assert_eq!(chat.id, "42");
    assert_eq!(chat.display_name, "Ada Lovelace");
}

#[tokio::test]
async fn test_cached_chat_sends_once_per_call() {
    let api = Arc::new(
        TelegramApi::default()
            .script("getMe", vec![get_me(Some("alert_bot"))])
            .script("getUpdates", vec![updates_with_chat(42)])
            .script("sendMessage", vec![sent("hello")]),
    );
    let dispatcher = dispatcher(&api, TOKEN);
    let inputs = RequestInputs::default().with_text("hello");

    for _ in 0..2 {
        let result = dispatcher.dispatch(ChannelKind::Telegram, &inputs).await;
        assert!(result.is_ok());
    }

    assert_eq!(api.count("getMe"), 1);
    assert_eq!(api.count("getUpdates"), 1);
    assert_eq!(api.count("sendMessage"), 2);
}

#[tokio::test]
async fn test_chat_not_found_heals_once() {
    let api = Arc::new(
        TelegramApi::default()
            .script("getMe", vec![get_me(Some("alert_bot"))])
            .script("getUpdates", vec![updates_with_chat(42), updates_with_chat(43)])
            .script("sendMessage", vec![chat_not_found(), sent("test")]),
    );
    let dispatcher = dispatcher(&api, TOKEN);
    let cache = dispatcher.identity_cache();
    cache.bind_credential(TOKEN).await;
    cache.set_bot_identity(Some("alert_bot".into())).await;
    cache.set_authorized(true).await;
    cache.set_chat_and_name("fake_chat_id".into(), " ".into()).await;

    let result = dispatcher
        .dispatch(ChannelKind::Telegram, &RequestInputs::default())
        .await;

    assert!(result.is_ok());
    assert_eq!(api.count("getMe"), 0);
    assert_eq!(api.count("getUpdates"), 1);
    assert_eq!(api.count("sendMessage"), 2);
    assert_eq!(cache.get_chat_id().await.as_deref(), Some("42"));
}

#[tokio::test]
async fn test_persistent_chat_not_found_stops_after_two_sends() {
    let api = Arc::new(
        TelegramApi::default()
            .script("getMe", vec![get_me(Some("alert_bot"))])
            .script("getUpdates", vec![updates_with_chat(42)])
            .script("sendMessage", vec![chat_not_found()]),
    );
    let dispatcher = dispatcher(&api, TOKEN);

    let result = dispatcher
        .dispatch(ChannelKind::Telegram, &RequestInputs::default())
        .await;

    assert_eq!(result.status, DispatchStatus::Error);
    assert_eq!(result.status_code, Some(400));
    assert_eq!(result.result["description"], "Bad Request: chat not found");
    assert_eq!(api.count("sendMessage"), 2);
    assert_eq!(api.count("getMe"), 1);
    assert_eq!(api.count("getUpdates"), 2);
    assert_eq!(result.debug, Some(json!({"token": TOKEN, "text": "test"})));
    assert!(result.tip.as_deref().unwrap().contains("core.telegram.org"));
    assert!(dispatcher.identity_cache().get_chat_id().await.is_none());
}

#[tokio::test]
async fn test_auth_failure_is_sticky() {
    let unauthorized = reply(
        401,
        json!({"ok": false, "error_code": 401, "description": "Unauthorized"}),
    );
    let api = Arc::new(TelegramApi::default().script("getMe", vec![unauthorized]));
    let dispatcher = dispatcher(&api, TOKEN);

    let first = dispatcher
        .dispatch(ChannelKind::Telegram, &RequestInputs::default())
        .await;
    assert!(first.is_error());
    assert_eq!(first.status_code, Some(401));
    assert_eq!(
        first.result,
        json!({"ok": false, "error_code": 401, "description": "Unauthorized"})
    );
    assert!(first.url.as_deref().unwrap().ends_with("/getMe"));
    assert_eq!(first.debug, Some(json!({"token": TOKEN, "text": "test"})));

    let second = dispatcher
        .dispatch(ChannelKind::Telegram, &RequestInputs::default())
        .await;
    assert!(second.is_error());
    assert_eq!(second.status_code, Some(401));
    assert_eq!(api.count("getMe"), 1);
    assert_eq!(
        dispatcher.identity_cache().get_authorized().await,
        AuthState::Rejected
    );
}

#[tokio::test]
async fn test_new_token_clears_rejection() {
    let api = Arc::new(
        TelegramApi::default()
            .script(
                "getMe",
                vec![
                    reply(404, json!({"ok": false, "error_code": 404, "description": "Not Found"})),
                    get_me(Some("alert_bot")),
                ],
            )
            .script("getUpdates", vec![updates_with_chat(42)])
            .script("sendMessage", vec![sent("test")]),
    );
    let cache = Arc::new(SessionIdentityCache::new());

    let rejected = dispatcher(&api, "faketoken").with_identity_cache(Arc::clone(&cache));
    let result = rejected
        .dispatch(ChannelKind::Telegram, &RequestInputs::default())
        .await;
    assert_eq!(result.status_code, Some(404));

    let fixed = dispatcher(&api, TOKEN).with_identity_cache(Arc::clone(&cache));
    let result = fixed
        .dispatch(ChannelKind::Telegram, &RequestInputs::default())
        .await;
    assert!(result.is_ok());
    assert_eq!(api.count("getMe"), 2);
}

#[tokio::test]
async fn test_transport_failure_invalidates_authorization() {
    let api = Arc::new(TelegramApi::default().script("getMe", vec![HttpReply::transport_failure()]));
    let dispatcher = dispatcher(&api, TOKEN);

    let result = dispatcher
        .dispatch(ChannelKind::Telegram, &RequestInputs::default())
        .await;

    assert!(result.is_error());
    assert_eq!(result.status_code, Some(-1));
    assert_eq!(
        dispatcher.identity_cache().get_authorized().await,
        AuthState::Rejected
    );
}

#[tokio::test]
async fn test_no_conversation_requires_operator_contact() {
    let api = Arc::new(
        TelegramApi::default()
            .script("getMe", vec![get_me(None)])
            .script("getUpdates", vec![reply(200, json!({"ok": true, "result": []}))]),
    );
    let dispatcher = dispatcher(&api, TOKEN);

    let result = dispatcher
        .dispatch(ChannelKind::Telegram, &RequestInputs::default())
        .await;

    assert!(result.is_error());
    let message = result.result.as_str().unwrap();
    assert!(message.contains("initiate or update conversations"));
    assert!(message.contains("`telegram.me/<bot_username>`"));
    assert_eq!(result.debug, Some(json!({"token": TOKEN, "text": "test"})));
    assert!(result.tip.is_some());
    assert_eq!(api.count("sendMessage"), 0);
    assert!(dispatcher.identity_cache().get_chat_id().await.is_none());
}

#[tokio::test]
async fn test_no_conversation_names_known_bot() {
    let api = Arc::new(
        TelegramApi::default()
            .script("getMe", vec![get_me(Some("alert_bot"))])
            .script("getUpdates", vec![reply(200, json!({"ok": true, "result": []}))]),
    );
    let result = dispatcher(&api, TOKEN)
        .dispatch(ChannelKind::Telegram, &RequestInputs::default())
        .await;
    assert!(result.result.as_str().unwrap().contains("telegram.me/alert_bot"));
}

#[tokio::test]
async fn test_unset_token_makes_no_call() {
    let api = Arc::new(TelegramApi::default());
    let result = dispatcher(&api, "")
        .dispatch(ChannelKind::Telegram, &RequestInputs::default())
        .await;

    assert!(result.is_error());
    assert_eq!(result.result, json!("The TELEGRAM_TOKEN option is unset"));
    assert!(result.debug.is_none());
    assert!(result.tip.is_some());
    assert!(!result.when.is_empty());
    assert!(api.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_generic_send_error_is_not_retried() {
    let too_long = reply(
        400,
        json!({"ok": false, "error_code": 400, "description": "Bad Request: message is too long"}),
    );
    let api = Arc::new(
        TelegramApi::default()
            .script("getMe", vec![get_me(Some("alert_bot"))])
            .script("getUpdates", vec![updates_with_chat(42)])
            .script("sendMessage", vec![too_long]),
    );
    let dispatcher = dispatcher(&api, TOKEN);

    let result = dispatcher
        .dispatch(ChannelKind::Telegram, &RequestInputs::default())
        .await;

    assert!(result.is_error());
    assert_eq!(result.result["description"], "Bad Request: message is too long");
    assert_eq!(api.count("sendMessage"), 1);
    assert_eq!(
        dispatcher.identity_cache().get_chat_id().await.as_deref(),
        Some("42")
    );
}

#[tokio::test]
async fn test_body_becomes_text() {
    let api = Arc::new(
        TelegramApi::default()
            .script("getMe", vec![get_me(Some("alert_bot"))])
            .script("getUpdates", vec![updates_with_chat(42)])
            .script("sendMessage", vec![sent("ignored")]),
    );
    let body = json!({"b": 2, "arg": "tg post json", "Chinese": "中文"});
    let inputs = RequestInputs::default().with_body(body.as_object().cloned().unwrap());

    let result = dispatcher(&api, TOKEN)
        .dispatch(ChannelKind::Telegram, &inputs)
        .await;

    assert!(result.is_ok());
    let texts = api.sent_texts();
    assert_eq!(serde_json::from_str::<Value>(&texts[0]).unwrap(), body);
}

#[tokio::test]
async fn test_send_transport_failure_is_not_sticky() {
    let api = Arc::new(
        TelegramApi::default()
            .script("getMe", vec![get_me(Some("alert_bot"))])
            .script("getUpdates", vec![updates_with_chat(42)])
            .script(
                "sendMessage",
                vec![HttpReply::transport_failure(), sent("test")],
            ),
    );
    let dispatcher = dispatcher(&api, TOKEN);

    let first = dispatcher
        .dispatch(ChannelKind::Telegram, &RequestInputs::default())
        .await;
    assert!(first.is_error());
    assert_eq!(first.status_code, Some(-1));
    assert_eq!(first.result, json!({}));
    assert_eq!(first.debug, Some(json!({"token": TOKEN, "text": "test"})));

    let cache = dispatcher.identity_cache();
    assert_eq!(cache.get_authorized().await, AuthState::Authorized);
    assert!(cache.rejection().await.is_none());
    assert_eq!(cache.get_chat_id().await.as_deref(), Some("42"));

    let second = dispatcher
        .dispatch(ChannelKind::Telegram, &RequestInputs::default())
        .await;
    assert!(second.is_ok());
    assert_eq!(second.status_code, Some(200));
    assert_eq!(api.count("sendMessage"), 2);
    assert_eq!(api.count("getMe"), 1);
    assert_eq!(api.count("getUpdates"), 1);
}

#[tokio::test]
async fn test_send_unauthorized_reply_is_reported_not_cached() {
    let unauthorized = reply(
        401,
        json!({"ok": false, "error_code": 401, "description": "Unauthorized"}),
    );
    let api = Arc::new(
        TelegramApi::default()
            .script("getMe", vec![get_me(Some("alert_bot"))])
            .script("getUpdates", vec![updates_with_chat(42)])
            .script("sendMessage", vec![unauthorized, sent("test")]),
    );
    let dispatcher = dispatcher(&api, TOKEN);

    let first = dispatcher
        .dispatch(ChannelKind::Telegram, &RequestInputs::default())
        .await;
    assert!(first.is_error());
    assert_eq!(first.status_code, Some(401));
    assert_eq!(first.result["description"], "Unauthorized");
    assert!(first
        .url
        .as_deref()
        .unwrap()
        .contains("/sendMessage?chat_id=42"));
    assert_eq!(api.count("sendMessage"), 1);

    let cache = dispatcher.identity_cache();
    assert_eq!(cache.get_authorized().await, AuthState::Authorized);
    assert!(cache.rejection().await.is_none());

    let second = dispatcher
        .dispatch(ChannelKind::Telegram, &RequestInputs::default())
        .await;
    assert!(second.is_ok());
    assert_eq!(api.count("sendMessage"), 2);
    assert_eq!(api.count("getMe"), 1);
}

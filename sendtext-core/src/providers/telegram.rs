//! Telegram Bot API endpoints and response shapes.

use serde::Deserialize;
use serde_json::{Map, Value};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org/bot";

/// Help link attached to every Telegram error
pub const TELEGRAM_HELP: &str = "https://core.telegram.org/bots#6-botfather";

/// `getMe`: identity of the bot owning the token
pub fn get_me_url(token: &str) -> String {
    format!("{}{}/getMe", TELEGRAM_API_BASE, token)
}

/// `getUpdates`: recent conversations with the bot
pub fn get_updates_url(token: &str) -> String {
    format!("{}{}/getUpdates", TELEGRAM_API_BASE, token)
}

/// `sendMessage` addressed to a chat
pub fn send_message_url(token: &str, chat_id: &str) -> String {
    format!(
        "{}{}/sendMessage?chat_id={}",
        TELEGRAM_API_BASE,
        token,
        urlencoding::encode(chat_id)
    )
}

#[derive(Debug, Deserialize)]
struct GetMeResponse {
    result: BotUser,
}

#[derive(Debug, Deserialize)]
struct BotUser {
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GetUpdatesResponse {
    #[serde(default)]
    result: Vec<TelegramUpdate>,
}

#[derive(Debug, Deserialize)]
struct TelegramUpdate {
    #[serde(default)]
    message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
struct TelegramMessage {
    chat: TelegramChat,
}

#[derive(Debug, Deserialize)]
struct TelegramChat {
    id: Value,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
}

/// Chat discovered from the most recent conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredChat {
    pub id: String,
    pub display_name: String,
}

/// Bot username from a `getMe` body
pub fn parse_bot_username(body: &Map<String, Value>) -> Option<String> {
    serde_json::from_value::<GetMeResponse>(Value::Object(body.clone()))
        .ok()
        .and_then(|response| response.result.username)
        .filter(|username| !username.is_empty())
}

/// Latest chat found in a `getUpdates` body, if any update carries a message
pub fn parse_latest_chat(body: &Map<String, Value>) -> Option<DiscoveredChat> {
    let response = serde_json::from_value::<GetUpdatesResponse>(Value::Object(body.clone())).ok()?;
    response
        .result
        .into_iter()
        .rev()
        .find_map(|update| update.message)
        .and_then(|message| {
            let id = match message.chat.id {
                Value::Number(n) => n.to_string(),
                Value::String(s) if !s.is_empty() => s,
                _ => return None,
            };
            let display_name = format!(
                "{} {}",
                message.chat.first_name.unwrap_or_default(),
                message.chat.last_name.unwrap_or_default()
            );
            Some(DiscoveredChat { id, display_name })
        })
}

/// Guidance returned when the bot has no conversation to reply into
pub fn initiate_conversation_hint(bot_username: Option<&str>) -> String {
    let link = match bot_username {
        Some(username) => format!("telegram.me/{}", username),
        None => "`telegram.me/<bot_username>`".to_string(),
    };
    format!(
        "You should initiate or update conversations with {} first, see {} for help.",
        link, TELEGRAM_HELP
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_urls() {
        assert_eq!(get_me_url("123:abc"), "https://api.telegram.org/bot123:abc/getMe");
        assert_eq!(
            send_message_url("123:abc", "-100"),
            "https://api.telegram.org/bot123:abc/sendMessage?chat_id=-100"
        );
    }

    #[test]
    fn test_parse_bot_username() {
        let me = body(json!({"ok": true, "result": {"id": 1, "is_bot": true, "username": "alert_bot"}}));
        assert_eq!(parse_bot_username(&me).as_deref(), Some("alert_bot"));
        assert_eq!(parse_bot_username(&body(json!({"ok": true, "result": {"id": 1}}))), None);
        assert_eq!(parse_bot_username(&Map::new()), None);
    }

    #[test]
    fn test_parse_latest_chat_uses_last_message() {
        let updates = body(json!({"ok": true, "result": [
            {"update_id": 1, "message": {"chat": {"id": 11, "first_name": "Old", "last_name": "Chat"}}},
            {"update_id": 2, "message": {"chat": {"id": 22, "first_name": "Ada", "last_name": "Lovelace"}}},
            {"update_id": 3, "edited_message": {"chat": {"id": 33}}}
        ]}));
        assert_eq!(
            parse_latest_chat(&updates),
            Some(DiscoveredChat {
                id: "22".into(),
                display_name: "Ada Lovelace".into()
            })
        );
    }

    #[test]
    fn test_parse_latest_chat_missing_names() {
        let updates = body(json!({"ok": true, "result": [
            {"update_id": 1, "message": {"chat": {"id": 5, "first_name": "Ada"}}}
        ]}));
        let chat = parse_latest_chat(&updates).unwrap();
        assert_eq!(chat.display_name, "Ada ");
    }

    #[test]
    fn test_parse_latest_chat_empty() {
        assert_eq!(parse_latest_chat(&body(json!({"ok": true, "result": []}))), None);
    }

    #[test]
    fn test_initiate_hint() {
        assert!(initiate_conversation_hint(Some("alert_bot")).contains("telegram.me/alert_bot"));
        assert!(initiate_conversation_hint(None).contains("`telegram.me/<bot_username>`"));
    }
}

//! Slack Web API endpoint used for text delivery.

const SLACK_API_BASE: &str = "https://slack.com/api";

/// Help link attached to every Slack error
pub const SLACK_HELP: &str = "https://api.slack.com/methods/chat.postMessage";

/// `chat.postMessage` addressed to a channel name or id
pub fn post_message_url(channel: &str) -> String {
    format!(
        "{}/chat.postMessage?channel={}",
        SLACK_API_BASE,
        urlencoding::encode(channel)
    )
}

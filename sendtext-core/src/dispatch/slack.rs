use super::{DispatchError, Dispatcher, ProviderCall};
use crate::models::DispatchResult;
use crate::providers::slack::{post_message_url, SLACK_HELP};
use crate::providers::{classify_slack, HttpRequest, ProviderOutcome};
use serde_json::{json, Value};

impl Dispatcher {
    pub(super) async fn send_slack(&self, channel: &str, text: &str) -> DispatchResult {
        let token = self.config.slack.token.as_str();
        let result = if token.is_empty() {
            DispatchError::ConfigurationMissing("SLACK_TOKEN").into_result()
        } else {
            self.post_slack_message(token, channel, text).await
        };

        if result.is_ok() {
            return result;
        }
        let result = if token.is_empty() {
            result
        } else {
            result.with_debug(json!({ "token": token, "channel": channel, "text": text }))
        };
        tracing::error!(
            channel,
            status_code = ?result.status_code,
            result = %result.result,
            "Fail to send text via Slack"
        );
        result.with_tip(format!("See {} for help.", SLACK_HELP))
    }

    async fn post_slack_message(&self, token: &str, channel: &str, text: &str) -> DispatchResult {
        let url = post_message_url(channel);
        let reply = self
            .http
            .send(HttpRequest::post(&url).form([("token", token), ("text", text)]))
            .await;
        let outcome = classify_slack(reply.status_code, &reply.body);
        tracing::debug!(%outcome, status_code = reply.status_code, "Slack replied");

        let call = ProviderCall::new(url, reply);
        match outcome {
            ProviderOutcome::Success => {
                tracing::debug!(channel, "Sent via Slack");
                DispatchResult::ok(Value::Object(call.body)).with_call(call.url, call.status_code)
            }
            ProviderOutcome::AuthFailure if call.status_code == crate::providers::TRANSPORT_FAILURE => {
                DispatchError::TransportFailure(call).into_result()
            }
            ProviderOutcome::AuthFailure => DispatchError::AuthFailure(call).into_result(),
            ProviderOutcome::ResourceNotFound | ProviderOutcome::GenericError => {
                DispatchError::GenericProviderError(call).into_result()
            }
        }
    }
}

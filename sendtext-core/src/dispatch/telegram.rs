use super::{AuthState, DispatchError, Dispatcher, ProviderCall};
use crate::models::DispatchResult;
use crate::providers::telegram::{
    get_me_url, get_updates_url, initiate_conversation_hint, parse_bot_username,
    parse_latest_chat, send_message_url, TELEGRAM_HELP,
};
use crate::providers::{classify_telegram, HttpRequest, ProviderOutcome, TRANSPORT_FAILURE};
use serde_json::{json, Value};

/// Upper bound on discovery+send rounds; the second round only runs after a
/// "chat not found" reply invalidated the cached chat.
pub const MAX_TELEGRAM_ATTEMPTS: usize = 2;

impl Dispatcher {
    pub(super) async fn send_telegram(&self, text: &str) -> DispatchResult {
        let token = self.config.telegram.token.as_str();
        if token.is_empty() {
            return self.telegram_failure(DispatchError::ConfigurationMissing("TELEGRAM_TOKEN"), token, text);
        }
        if self.identity.bind_credential(token).await {
            tracing::info!("Telegram token changed, cached identity discarded");
        }

        let mut attempt = 1;
        loop {
            match self.telegram_round(token, text).await {
                Ok(result) => return result,
                Err(DispatchError::ChatStale(_)) if attempt < MAX_TELEGRAM_ATTEMPTS => {
                    tracing::warn!(attempt, "Resetting telegram chat id");
                    attempt += 1;
                }
                Err(DispatchError::ChatStale(call)) => {
                    return self.telegram_failure(DispatchError::GenericProviderError(call), token, text);
                }
                Err(err) => return self.telegram_failure(err, token, text),
            }
        }
    }

    /// One discovery+send round: bot identity, chat id, then sendMessage.
    async fn telegram_round(&self, token: &str, text: &str) -> Result<DispatchResult, DispatchError> {
        if self.identity.get_authorized().await == AuthState::Rejected {
            if let Some(call) = self.identity.rejection().await {
                tracing::debug!("Telegram token previously rejected, skipping provider calls");
                return Err(DispatchError::AuthFailure(call));
            }
        }

        if self.identity.get_bot_identity().await.is_none() {
            self.discover_bot_identity(token).await?;
        }
        if self.identity.get_chat_id().await.is_none() {
            self.discover_chat(token).await?;
        }
        let Some(chat) = self.identity.get_chat().await else {
            let bot = self.identity.get_bot_identity().await;
            return Err(DispatchError::ResourceNotFound(initiate_conversation_hint(bot.as_deref())));
        };

        let url = send_message_url(token, &chat.id);
        let reply = self
            .http
            .send(HttpRequest::post(&url).form([("text", text)]))
            .await;
        let outcome = classify_telegram(reply.status_code, &reply.body);
        tracing::debug!(%outcome, status_code = reply.status_code, "Telegram sendMessage replied");
        let call = ProviderCall::new(url, reply);

        match outcome {
            ProviderOutcome::Success => {
                tracing::debug!(chat = %chat.display_name, "Sent via Telegram");
                Ok(DispatchResult::ok(Value::Object(call.body)).with_call(call.url, call.status_code))
            }
            ProviderOutcome::ResourceNotFound => {
                self.identity.invalidate_chat().await;
                Err(DispatchError::ChatStale(call))
            }
            // Only the discovery endpoints decide authorization.
            ProviderOutcome::AuthFailure if call.status_code == TRANSPORT_FAILURE => {
                tracing::warn!("Telegram sendMessage did not answer");
                Err(DispatchError::TransportFailure(call))
            }
            ProviderOutcome::AuthFailure | ProviderOutcome::GenericError => {
                Err(DispatchError::GenericProviderError(call))
            }
        }
    }

    async fn discover_bot_identity(&self, token: &str) -> Result<(), DispatchError> {
        let url = get_me_url(token);
        let reply = self.http.send(HttpRequest::get(&url)).await;
        let call = self.check_telegram_auth(ProviderCall::new(url, reply)).await?;

        let username = parse_bot_username(&call.body);
        tracing::info!(bot = ?username, "Telegram bot identity resolved");
        self.identity.set_bot_identity(username).await;
        Ok(())
    }

    async fn discover_chat(&self, token: &str) -> Result<(), DispatchError> {
        let url = get_updates_url(token);
        let reply = self.http.send(HttpRequest::get(&url)).await;
        let call = self.check_telegram_auth(ProviderCall::new(url, reply)).await?;

        match parse_latest_chat(&call.body) {
            Some(chat) => {
                tracing::info!(chat_id = %chat.id, chat = %chat.display_name, "Telegram chat resolved");
                self.identity.set_chat_and_name(chat.id, chat.display_name).await;
                Ok(())
            }
            None => {
                let bot = self.identity.get_bot_identity().await;
                Err(DispatchError::ResourceNotFound(initiate_conversation_hint(bot.as_deref())))
            }
        }
    }

    /// Shared authorization check for the discovery endpoints.
    async fn check_telegram_auth(&self, call: ProviderCall) -> Result<ProviderCall, DispatchError> {
        match classify_telegram(call.status_code, &call.body) {
            ProviderOutcome::AuthFailure => Err(self.reject(call).await),
            ProviderOutcome::Success => {
                self.identity.set_authorized(true).await;
                Ok(call)
            }
            ProviderOutcome::ResourceNotFound | ProviderOutcome::GenericError => {
                Err(DispatchError::GenericProviderError(call))
            }
        }
    }

    async fn reject(&self, call: ProviderCall) -> DispatchError {
        tracing::warn!(status_code = call.status_code, "Telegram authorization failed");
        self.identity.record_rejection(call.clone()).await;
        if call.status_code == TRANSPORT_FAILURE {
            DispatchError::TransportFailure(call)
        } else {
            DispatchError::AuthFailure(call)
        }
    }

    fn telegram_failure(&self, err: DispatchError, token: &str, text: &str) -> DispatchResult {
        let kind = err.kind();
        let mut result = err.into_result();
        if !token.is_empty() {
            result = result.with_debug(json!({ "token": token, "text": text }));
        }
        tracing::error!(
            error_kind = kind,
            status_code = ?result.status_code,
            result = %result.result,
            "Fail to send text via Telegram"
        );
        result.with_tip(format!("See {} for help.", TELEGRAM_HELP))
    }
}

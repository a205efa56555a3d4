//! Notification dispatcher
//!
//! Orchestrates resolution, the provider call, classification, identity cache
//! updates and the Telegram self-heal retry, one flow per channel kind. Every
//! flow ends in a [`DispatchResult`].

mod email;
pub mod error;
pub mod identity;
mod slack;
mod telegram;

pub use error::{DispatchError, ProviderCall};
pub use identity::{AuthState, ChatIdentity, IdentitySnapshot, SessionIdentityCache};
pub use telegram::MAX_TELEGRAM_ATTEMPTS;

use crate::channel::resolver;
use crate::models::{
    ChannelKind, Configuration, DispatchResult, NotificationRequest, RequestInputs, ResolvedTarget,
};
use crate::providers::{EmailSender, HttpCapability, RelayEmailSender, ReqwestHttp};
use crate::services::logging::log_dispatch;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

/// Dispatches notifications for one service instance.
pub struct Dispatcher {
    config: Arc<Configuration>,
    http: Arc<dyn HttpCapability>,
    email: Arc<dyn EmailSender>,
    identity: Arc<SessionIdentityCache>,
}

impl Dispatcher {
    pub fn new(
        config: Configuration,
        http: Arc<dyn HttpCapability>,
        email: Arc<dyn EmailSender>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            http,
            email,
            identity: Arc::new(SessionIdentityCache::new()),
        }
    }

    /// Production wiring: reqwest capability and the relay email sender.
    pub fn from_config(config: Configuration) -> Result<Self, reqwest::Error> {
        let http: Arc<dyn HttpCapability> =
            Arc::new(ReqwestHttp::new(Duration::from_secs(config.http_timeout_secs))?);
        let email: Arc<dyn EmailSender> =
            Arc::new(RelayEmailSender::new(Arc::clone(&http), config.email.clone()));
        Ok(Self::new(config, http, email))
    }

    /// Share an identity cache with another dispatcher. Used by tests to seed
    /// or inspect cached Telegram facts; production dispatchers own their cache.
    pub fn with_identity_cache(mut self, identity: Arc<SessionIdentityCache>) -> Self {
        self.identity = identity;
        self
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn identity_cache(&self) -> Arc<SessionIdentityCache> {
        Arc::clone(&self.identity)
    }

    /// Resolve layered inputs for `kind` and deliver.
    pub async fn dispatch(&self, kind: ChannelKind, inputs: &RequestInputs) -> DispatchResult {
        let request = resolver::resolve(kind, inputs, &self.config);
        self.send(&request).await
    }

    /// Deliver an already resolved request.
    pub async fn send(&self, request: &NotificationRequest) -> DispatchResult {
        let span = tracing::info_span!(
            "dispatch",
            request_id = %uuid::Uuid::new_v4(),
            channel = %request.kind,
        );
        async {
            let result = match &request.target {
                ResolvedTarget::Email { receivers, subject } => {
                    self.send_email(receivers, subject, &request.text).await
                }
                ResolvedTarget::SlackChannel(channel) => {
                    self.send_slack(channel, &request.text).await
                }
                ResolvedTarget::TelegramChat => self.send_telegram(&request.text).await,
            };
            log_dispatch(request.kind, &result);
            result
        }
        .instrument(span)
        .await
    }

    /// Channels whose auto-alert flag is on, in delivery order
    pub fn alert_channels(&self) -> Vec<ChannelKind> {
        let mut channels = Vec::new();
        if self.config.email.enable_alert {
            channels.push(ChannelKind::Email);
        }
        if self.config.slack.enable_alert {
            channels.push(ChannelKind::Slack);
        }
        if self.config.telegram.enable_alert {
            channels.push(ChannelKind::Telegram);
        }
        channels
    }

    /// Deliver `text` to every alert-enabled channel. A failing channel does
    /// not stop delivery to the others.
    pub async fn alert(&self, text: &str) -> Vec<(ChannelKind, DispatchResult)> {
        let inputs = RequestInputs::default().with_text(text);
        let mut results = Vec::new();
        for kind in self.alert_channels() {
            let result = self.dispatch(kind, &inputs).await;
            results.push((kind, result));
        }
        if results.is_empty() {
            tracing::debug!("No alert channel enabled");
        }
        results
    }
}

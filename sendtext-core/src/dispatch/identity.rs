//! Session identity cache for provider-discovered facts.
//!
//! Facts are learned per credential and live for the lifetime of the owning
//! dispatcher. Authorization is checked before trusting the bot identity or
//! chat id; a rejection is not cleared by later reads, only by a successful
//! call or a different credential.

use crate::dispatch::error::ProviderCall;
use tokio::sync::RwLock;

/// Authorization as last observed for the bound credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Unknown,
    Authorized,
    Rejected,
}

/// Chat id and display name, always stored together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatIdentity {
    pub id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct IdentitySnapshot {
    pub credential: Option<String>,
    pub auth: AuthState,
    pub bot_identity: Option<String>,
    pub chat: Option<ChatIdentity>,
    /// Provider reply that caused the current rejection
    pub rejection: Option<ProviderCall>,
}

/// Process-scoped cache guarded by a single lock.
#[derive(Debug, Default)]
pub struct SessionIdentityCache {
    inner: RwLock<IdentitySnapshot>,
}

impl SessionIdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate the cache with `credential`; a different credential
    /// discards every fact learned so far. Returns true when facts were reset.
    pub async fn bind_credential(&self, credential: &str) -> bool {
        let mut inner = self.inner.write().await;
        if inner.credential.as_deref() == Some(credential) {
            return false;
        }
        let had_credential = inner.credential.is_some();
        *inner = IdentitySnapshot {
            credential: Some(credential.to_string()),
            ..IdentitySnapshot::default()
        };
        had_credential
    }

    pub async fn get_bot_identity(&self) -> Option<String> {
        self.inner.read().await.bot_identity.clone()
    }

    pub async fn set_bot_identity(&self, bot_identity: Option<String>) {
        self.inner.write().await.bot_identity = bot_identity;
    }

    pub async fn get_chat_id(&self) -> Option<String> {
        self.inner.read().await.chat.as_ref().map(|chat| chat.id.clone())
    }

    pub async fn get_chat(&self) -> Option<ChatIdentity> {
        self.inner.read().await.chat.clone()
    }

    pub async fn set_chat_and_name(&self, id: String, display_name: String) {
        self.inner.write().await.chat = Some(ChatIdentity { id, display_name });
    }

    pub async fn invalidate_chat(&self) {
        self.inner.write().await.chat = None;
    }

    pub async fn get_authorized(&self) -> AuthState {
        self.inner.read().await.auth
    }

    pub async fn set_authorized(&self, authorized: bool) {
        let mut inner = self.inner.write().await;
        if authorized {
            inner.auth = AuthState::Authorized;
            inner.rejection = None;
        } else {
            inner.auth = AuthState::Rejected;
        }
    }

    /// Mark the credential rejected and keep the reply for later requests.
    pub async fn record_rejection(&self, call: ProviderCall) {
        let mut inner = self.inner.write().await;
        inner.auth = AuthState::Rejected;
        inner.rejection = Some(call);
    }

    pub async fn rejection(&self) -> Option<ProviderCall> {
        self.inner.read().await.rejection.clone()
    }

    /// Copy of every cached fact. Test aid; dispatch reads single fields.
    pub async fn snapshot(&self) -> IdentitySnapshot {
        self.inner.read().await.clone()
    }
}

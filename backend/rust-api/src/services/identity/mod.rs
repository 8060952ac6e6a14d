//! Authentication seam. Accounts live with the identity provider; this crate
//! only signs users in and out and relays session changes.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::BackendError;
use crate::models::user::{AuthSession, AuthUser, SessionEvent, SignUpMetadata, SignUpOutcome};

pub mod memory;
pub mod supabase;

pub use memory::MemoryIdentity;
pub use supabase::SupabaseIdentity;

pub type IdentityResult<T> = Result<T, BackendError>;

const SESSION_EVENT_CAPACITY: usize = 64;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The user behind `access_token`, or `None` once the session is gone.
    async fn current_session(&self, access_token: &str) -> IdentityResult<Option<AuthUser>>;

    async fn sign_in(&self, email: &str, password: &str) -> IdentityResult<AuthSession>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: SignUpMetadata,
    ) -> IdentityResult<SignUpOutcome>;

    async fn sign_out(&self, access_token: &str, user_id: &str) -> IdentityResult<()>;

    /// Receives every sign-in and sign-out from the moment of subscription.
    fn on_session_change(&self) -> broadcast::Receiver<SessionEvent>;
}

/// Fan-out of session changes shared by the provider implementations.
pub(crate) struct SessionEvents {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    pub(crate) fn new() -> Self {
        let (sender, _) = broadcast::channel(SESSION_EVENT_CAPACITY);
        Self { sender }
    }

    pub(crate) fn publish(&self, event: SessionEvent) {
        // No subscribers is the common case
        let _ = self.sender.send(event);
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }
}

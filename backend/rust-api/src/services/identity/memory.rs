use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use super::{IdentityProvider, IdentityResult, SessionEvents};
use crate::error::BackendError;
use crate::middlewares::auth::{JwtService, SessionClaims};
use crate::models::user::{AuthSession, AuthUser, SessionEvent, SignUpMetadata, SignUpOutcome};

const SESSION_TTL_SECONDS: i64 = 3600;
// bcrypt minimum
const PASSWORD_HASH_COST: u32 = 4;

struct Account {
    user: AuthUser,
    password_hash: String,
}

/// In-process identity provider. Accounts are confirmed on sign-up and
/// tokens are signed with the same secret the auth middleware checks.
pub struct MemoryIdentity {
    jwt: JwtService,
    accounts: RwLock<HashMap<String, Account>>,
    revoked: RwLock<HashSet<String>>,
    events: SessionEvents,
}

impl MemoryIdentity {
    pub fn new(jwt_secret: &str) -> Self {
        Self {
            jwt: JwtService::new(jwt_secret),
            accounts: RwLock::new(HashMap::new()),
            revoked: RwLock::new(HashSet::new()),
            events: SessionEvents::new(),
        }
    }

    fn issue(&self, user: &AuthUser) -> IdentityResult<AuthSession> {
        let claims = SessionClaims::for_user(user, SESSION_TTL_SECONDS);
        let access_token = self
            .jwt
            .generate_token(&claims)
            .map_err(|e| BackendError::Unknown(e.to_string()))?;
        Ok(AuthSession {
            access_token,
            refresh_token: None,
            expires_in: SESSION_TTL_SECONDS,
            user: user.clone(),
        })
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn current_session(&self, access_token: &str) -> IdentityResult<Option<AuthUser>> {
        if self.revoked.read().await.contains(access_token) {
            return Ok(None);
        }
        Ok(self.jwt.validate_token(access_token).ok().map(|claims| AuthUser {
            id: claims.sub,
            email: claims.email,
        }))
    }

    async fn sign_in(&self, email: &str, password: &str) -> IdentityResult<AuthSession> {
        let user = {
            let accounts = self.accounts.read().await;
            let account = accounts
                .get(&normalize_email(email))
                .filter(|account| {
                    bcrypt::verify(password, &account.password_hash).unwrap_or(false)
                })
                .ok_or_else(|| BackendError::Validation("Invalid login credentials".to_string()))?;
            account.user.clone()
        };

        let session = self.issue(&user)?;
        self.events.publish(SessionEvent::SignedIn {
            user_id: user.id.clone(),
        });
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        _metadata: SignUpMetadata,
    ) -> IdentityResult<SignUpOutcome> {
        let email = normalize_email(email);
        let password_hash = bcrypt::hash(password, PASSWORD_HASH_COST)
            .map_err(|e| BackendError::Unknown(format!("Failed to hash password: {}", e)))?;

        let user = {
            let mut accounts = self.accounts.write().await;
            if accounts.contains_key(&email) {
                return Err(BackendError::Validation(
                    "User already registered".to_string(),
                ));
            }
            let user = AuthUser {
                id: Uuid::new_v4().to_string(),
                email: Some(email.clone()),
            };
            accounts.insert(
                email,
                Account {
                    user: user.clone(),
                    password_hash,
                },
            );
            user
        };

        let session = self.issue(&user)?;
        self.events.publish(SessionEvent::SignedIn {
            user_id: user.id.clone(),
        });
        Ok(SignUpOutcome::SignedIn(session))
    }

    async fn sign_out(&self, access_token: &str, user_id: &str) -> IdentityResult<()> {
        self.revoked.write().await.insert(access_token.to_string());
        self.events.publish(SessionEvent::SignedOut {
            user_id: user_id.to_string(),
        });
        Ok(())
    }

    fn on_session_change(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> SignUpMetadata {
        SignUpMetadata {
            username: "mage".to_string(),
            full_name: None,
            ip_address: None,
        }
    }

    #[tokio::test]
    async fn sign_up_then_sign_in_yields_valid_session() {
        let identity = MemoryIdentity::new("secret");
        let outcome = identity
            .sign_up("Mage@Example.com", "hunter22", metadata())
            .await
            .unwrap();
        let user_id = outcome.user().id.clone();

        let session = identity.sign_in("mage@example.com", "hunter22").await.unwrap();
        assert_eq!(session.user.id, user_id);

        let current = identity.current_session(&session.access_token).await.unwrap();
        assert_eq!(current.map(|u| u.id), Some(user_id));
    }

    #[tokio::test]
    async fn wrong_password_and_duplicate_email_are_validation_errors() {
        let identity = MemoryIdentity::new("secret");
        identity
            .sign_up("mage@example.com", "hunter22", metadata())
            .await
            .unwrap();

        let err = identity.sign_in("mage@example.com", "nope").await.unwrap_err();
        assert_eq!(err.kind(), "validation");

        let err = identity
            .sign_up("mage@example.com", "other", metadata())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[tokio::test]
    async fn sign_out_revokes_token_and_broadcasts() {
        let identity = MemoryIdentity::new("secret");
        let session = match identity
            .sign_up("mage@example.com", "hunter22", metadata())
            .await
            .unwrap()
        {
            SignUpOutcome::SignedIn(session) => session,
            SignUpOutcome::PendingConfirmation { .. } => panic!("memory accounts auto-confirm"),
        };
        let mut events = identity.on_session_change();

        identity
            .sign_out(&session.access_token, &session.user.id)
            .await
            .unwrap();

        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::SignedOut {
                user_id: session.user.id.clone()
            }
        );
        assert!(identity
            .current_session(&session.access_token)
            .await
            .unwrap()
            .is_none());
    }
}

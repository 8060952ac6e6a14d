use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast;
use url::Url;

use super::{IdentityProvider, IdentityResult, SessionEvents};
use crate::config::SupabaseConfig;
use crate::error::BackendError;
use crate::metrics::record_identity_call;
use crate::models::user::{AuthSession, AuthUser, SessionEvent, SignUpMetadata, SignUpOutcome};

/// GoTrue client authenticated with the project's anon key.
pub struct SupabaseIdentity {
    http: Client,
    auth_url: Url,
    anon_key: String,
    events: SessionEvents,
}

/// `/signup` answers with a full session when email confirmation is off and
/// with the bare user otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpBody {
    Session(AuthSession),
    User(AuthUser),
}

impl SupabaseIdentity {
    pub fn new(config: &SupabaseConfig) -> Result<Self, BackendError> {
        let auth_url = Url::parse(&format!("{}/auth/v1/", config.url))
            .map_err(|e| BackendError::Unknown(format!("Invalid Supabase URL: {}", e)))?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| BackendError::Unknown(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            auth_url,
            anon_key: config.anon_key.clone(),
            events: SessionEvents::new(),
        })
    }

    fn endpoint(&self, path: &str) -> IdentityResult<Url> {
        self.auth_url
            .join(path)
            .map_err(|e| BackendError::Unknown(format!("Invalid auth path {}: {}", path, e)))
    }

    fn post(&self, url: Url) -> RequestBuilder {
        self.http.post(url).header("apikey", &self.anon_key)
    }

    async fn request_sign_in(&self, email: &str, password: &str) -> IdentityResult<AuthSession> {
        let mut url = self.endpoint("token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");

        let response = self
            .post(url)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(BackendError::from_response(response).await);
        }
        Ok(response.json::<AuthSession>().await?)
    }

    async fn request_sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignUpMetadata,
    ) -> IdentityResult<SignUpOutcome> {
        let response = self
            .post(self.endpoint("signup")?)
            .json(&json!({ "email": email, "password": password, "data": metadata }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(BackendError::from_response(response).await);
        }

        Ok(match response.json::<SignUpBody>().await? {
            SignUpBody::Session(session) => SignUpOutcome::SignedIn(session),
            SignUpBody::User(user) => SignUpOutcome::PendingConfirmation { user },
        })
    }

    async fn request_sign_out(&self, access_token: &str) -> IdentityResult<()> {
        let response = self
            .post(self.endpoint("logout")?)
            .bearer_auth(access_token)
            .send()
            .await?;
        match response.status() {
            // Already gone counts as signed out
            status if status.is_success() || status == StatusCode::UNAUTHORIZED => Ok(()),
            _ => Err(BackendError::from_response(response).await),
        }
    }

    async fn request_user(&self, access_token: &str) -> IdentityResult<Option<AuthUser>> {
        let response = self
            .http
            .get(self.endpoint("user")?)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            status if status.is_success() => Ok(Some(response.json::<AuthUser>().await?)),
            _ => Err(BackendError::from_response(response).await),
        }
    }
}

#[async_trait]
impl IdentityProvider for SupabaseIdentity {
    async fn current_session(&self, access_token: &str) -> IdentityResult<Option<AuthUser>> {
        let result = self.request_user(access_token).await;
        record_identity_call("current_session", &result);
        result
    }

    async fn sign_in(&self, email: &str, password: &str) -> IdentityResult<AuthSession> {
        let result = self.request_sign_in(email, password).await;
        record_identity_call("sign_in", &result);
        if let Ok(session) = &result {
            self.events.publish(SessionEvent::SignedIn {
                user_id: session.user.id.clone(),
            });
        }
        result
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: SignUpMetadata,
    ) -> IdentityResult<SignUpOutcome> {
        let result = self.request_sign_up(email, password, &metadata).await;
        record_identity_call("sign_up", &result);
        if let Ok(SignUpOutcome::SignedIn(session)) = &result {
            self.events.publish(SessionEvent::SignedIn {
                user_id: session.user.id.clone(),
            });
        }
        result
    }

    async fn sign_out(&self, access_token: &str, user_id: &str) -> IdentityResult<()> {
        let result = self.request_sign_out(access_token).await;
        record_identity_call("sign_out", &result);
        if result.is_ok() {
            self.events.publish(SessionEvent::SignedOut {
                user_id: user_id.to_string(),
            });
        }
        result
    }

    fn on_session_change(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_up_body_distinguishes_session_from_bare_user() {
        let session: SignUpBody = serde_json::from_value(json!({
            "access_token": "jwt",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "refresh",
            "user": { "id": "u1", "email": "a@example.com" }
        }))
        .unwrap();
        assert!(matches!(session, SignUpBody::Session(s) if s.user.id == "u1"));

        let pending: SignUpBody = serde_json::from_value(json!({
            "id": "u2",
            "email": "b@example.com",
            "confirmation_sent_at": "2026-01-01T00:00:00Z"
        }))
        .unwrap();
        assert!(matches!(pending, SignUpBody::User(u) if u.id == "u2"));
    }

    #[test]
    fn token_endpoint_carries_grant_type() {
        let identity = SupabaseIdentity::new(&SupabaseConfig {
            url: "https://project.supabase.co".to_string(),
            anon_key: "anon".to_string(),
            service_role_key: "service".to_string(),
            request_timeout_seconds: 5,
        })
        .unwrap();
        let mut url = identity.endpoint("token").unwrap();
        url.query_pairs_mut().append_pair("grant_type", "password");
        assert_eq!(
            url.as_str(),
            "https://project.supabase.co/auth/v1/token?grant_type=password"
        );
    }
}

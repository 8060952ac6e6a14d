use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    error::ApiError,
    models::user::{AuthUser, UserRole},
    services::AppState,
};

/// Cookie carrying the access token for browser clients (EventSource cannot
/// set an `Authorization` header).
pub const ACCESS_TOKEN_COOKIE: &str = "arcane_access_token";

/// Audience stamped on every session token by the identity provider.
pub const SESSION_AUDIENCE: &str = "authenticated";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    pub sub: String, // identity provider user id
    #[serde(default)]
    pub email: Option<String>,
    pub role: String, // database role, "authenticated" for signed-in users
    pub aud: String,
    #[serde(default)]
    pub session_id: Option<String>,
    pub exp: usize,
    pub iat: usize,
}

impl SessionClaims {
    pub fn for_user(user: &AuthUser, ttl_seconds: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: SESSION_AUDIENCE.to_string(),
            aud: SESSION_AUDIENCE.to_string(),
            session_id: Some(uuid::Uuid::new_v4().to_string()),
            exp: (now + ttl_seconds) as usize,
            iat: now as usize,
        }
    }
}

/// Raw bearer token of the current request, kept for sign-out.
#[derive(Debug, Clone)]
pub struct AccessToken(pub String);

#[derive(Debug)]
pub enum AuthError {
    InvalidToken,
    ExpiredToken,
    MissingToken,
    InvalidSignature,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::InvalidToken => write!(f, "Invalid token"),
            AuthError::ExpiredToken => write!(f, "Token expired"),
            AuthError::MissingToken => write!(f, "Missing authorization token"),
            AuthError::InvalidSignature => write!(f, "Invalid token signature"),
        }
    }
}

impl std::error::Error for AuthError {}

/// HS256 session tokens shared with the identity provider's signing secret.
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn generate_token(&self, claims: &SessionClaims) -> Result<String, AuthError> {
        encode(&Header::default(), claims, &self.encoding_key).map_err(|_| AuthError::InvalidToken)
    }

    pub fn validate_token(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let mut validation = Validation::default();
        validation.set_audience(&[SESSION_AUDIENCE]);

        decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::InvalidToken,
            })
    }
}

fn bearer_or_cookie(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    bearer.or_else(|| {
        CookieJar::from_headers(headers)
            .get(ACCESS_TOKEN_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|v| !v.is_empty())
    })
}

/// Requires a valid session token for a live session and stores its claims
/// and the provider's user in the request extensions.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_or_cookie(&headers)
        .ok_or_else(|| ApiError::unauthorized(AuthError::MissingToken.to_string()))?;

    let claims = state.jwt.validate_token(&token).map_err(|e| {
        tracing::warn!("JWT validation failed: {}", e);
        ApiError::unauthorized(e.to_string())
    })?;

    // A signed token outlives sign-out; the provider decides whether the
    // session still exists
    let user = state
        .identity
        .current_session(&token)
        .await?
        .ok_or_else(|| {
            tracing::warn!(user_id = %claims.sub, "Token presented after sign-out");
            ApiError::unauthorized("Session has ended")
        })?;

    tracing::debug!("Authenticated user: {}", claims.sub);

    request.extensions_mut().insert(claims);
    request.extensions_mut().insert(user);
    request.extensions_mut().insert(AccessToken(token));

    Ok(next.run(request).await)
}

/// Lets the request through only when the caller's profile has the admin
/// role. Must run after [`auth_middleware`].
pub async fn admin_guard_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(claims) = request.extensions().get::<SessionClaims>().cloned() else {
        return Err(ApiError::unauthorized(AuthError::MissingToken.to_string()));
    };

    let profile = state.store.get_profile(&claims.sub).await?;
    match profile {
        Some(profile) if profile.role == UserRole::Admin => {
            request.extensions_mut().insert(profile);
            Ok(next.run(request).await)
        }
        _ => {
            tracing::warn!(user_id = %claims.sub, "Access denied: admin role required");
            Err(ApiError::forbidden("Admin role required"))
        }
    }
}

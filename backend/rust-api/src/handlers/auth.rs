use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::{ApiError, BackendError},
    extractors::AppJson,
    middlewares::auth::{AccessToken, SessionClaims, ACCESS_TOKEN_COOKIE},
    models::user::{
        AuthUser, LoginRequest, LoginResponse, MeResponse, NewProfile, RegisterRequest,
        RegisterResponse, SignUpMetadata, SignUpOutcome,
    },
    services::AppState,
    utils::{request::client_ip, sanitize::sanitize_input},
};

fn session_cookie(token: String, max_age_seconds: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((ACCESS_TOKEN_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age_seconds))
        .build()
}

/// POST /api/v1/auth/register - Create an account and its profile row
pub async fn register(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let username = sanitize_input(&req.username);
    if username.is_empty() {
        return Err(ApiError::bad_request("Username must not be empty"));
    }
    let full_name = req
        .full_name
        .as_deref()
        .map(sanitize_input)
        .filter(|name| !name.is_empty());
    let ip_address = client_ip(&headers);
    let email = req.email.trim().to_lowercase();

    tracing::info!("Registering new participant: {}", email);

    let outcome = state
        .identity
        .sign_up(
            &email,
            &req.password,
            SignUpMetadata {
                username: username.clone(),
                full_name: full_name.clone(),
                ip_address: ip_address.clone(),
            },
        )
        .await
        .map_err(|e| {
            tracing::warn!("Sign-up failed for {}: {}", email, e);
            ApiError::from(e)
        })?;

    let user_id = outcome.user().id.clone();
    let profile = NewProfile {
        id: user_id.clone(),
        email: email.clone(),
        username: Some(username),
        full_name,
        ip_address,
    };
    match state.store.insert_profile(profile).await {
        Ok(_) => tracing::debug!(user_id = %user_id, "Profile created"),
        // A database trigger may already have created the row
        Err(BackendError::Validation(message)) => {
            tracing::debug!(user_id = %user_id, "Profile already present: {}", message)
        }
        // The account exists at the identity provider either way
        Err(e) => tracing::error!(user_id = %user_id, "Failed to create profile: {}", e),
    }

    let (jar, body) = match outcome {
        SignUpOutcome::SignedIn(session) => (
            jar.add(session_cookie(
                session.access_token.clone(),
                session.expires_in,
                state.config.cookie_secure,
            )),
            RegisterResponse {
                user_id,
                confirmation_required: false,
                access_token: Some(session.access_token),
                message: "Registration complete".to_string(),
            },
        ),
        SignUpOutcome::PendingConfirmation { .. } => (
            jar,
            RegisterResponse {
                user_id,
                confirmation_required: true,
                access_token: None,
                message: "Check your email to confirm your account".to_string(),
            },
        ),
    };

    Ok((StatusCode::CREATED, jar, Json(body)))
}

/// POST /api/v1/auth/login - Sign in with email and password
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let email = req.email.trim().to_lowercase();
    tracing::info!("Login attempt for user: {}", email);

    let session = state
        .identity
        .sign_in(&email, &req.password)
        .await
        .map_err(|e| match e {
            BackendError::Validation(_) | BackendError::PermissionDenied(_) => {
                tracing::warn!("Login failed for {}: {}", email, e);
                ApiError::unauthorized("Invalid email or password")
            }
            other => other.into(),
        })?;

    let jar = jar.add(session_cookie(
        session.access_token.clone(),
        session.expires_in,
        state.config.cookie_secure,
    ));

    Ok((
        jar,
        Json(LoginResponse {
            access_token: session.access_token,
            expires_in: session.expires_in,
            user: session.user,
        }),
    ))
}

/// POST /api/v1/auth/logout - End the session and clear the cookie
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<SessionClaims>,
    Extension(AccessToken(token)): Extension<AccessToken>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    state.identity.sign_out(&token, &claims.sub).await?;
    tracing::info!(user_id = %claims.sub, "User signed out");

    let jar = jar.remove(Cookie::build(ACCESS_TOKEN_COOKIE).path("/"));
    Ok((StatusCode::NO_CONTENT, jar))
}

/// GET /api/v1/auth/me - Current user with profile
pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<SessionClaims>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<MeResponse>, ApiError> {
    let profile = state.store.get_profile(&user.id).await?;
    Ok(Json(MeResponse {
        id: user.id,
        email: user.email.or(claims.email),
        role: profile.as_ref().map(|p| p.role).unwrap_or_default(),
        profile,
    }))
}

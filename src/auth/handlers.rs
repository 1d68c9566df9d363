use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            LoginRequest, PublicUser, RegisterRequest, ResetConfirmRequest, ResetRequest,
            SessionResponse, VerifyRequest,
        },
        password::{hash_password, verify_password},
        tokens::{TokenKeys, TokenKind},
    },
    state::AppState,
    store::StoreError,
    users::RegistrationData,
};

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/verify", post(verify))
        .route("/auth/reset", post(request_reset))
        .route("/auth/reset/confirm", post(confirm_reset))
        .route("/auth/logout", get(logout))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<axum::http::StatusCode, (axum::http::StatusCode, String)> {
    payload.email = payload.email.trim().to_lowercase();
    payload.username = payload.username.trim().to_string();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err((axum::http::StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    // Identifier lookup treats anything with an `@` as an email address, so
    // such usernames would be unreachable.
    if payload.username.is_empty() || payload.username.contains('@') {
        warn!(username = %payload.username, "invalid username");
        return Err((
            axum::http::StatusCode::BAD_REQUEST,
            "Invalid username".into(),
        ));
    }

    if payload.password.len() < 8 {
        warn!("password too short");
        return Err((
            axum::http::StatusCode::BAD_REQUEST,
            "Password too short".into(),
        ));
    }

    let hash = match hash_password(&payload.password) {
        Ok(h) => h,
        Err(e) => {
            error!(error = %e, "hash_password failed");
            return Err((axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    let data = RegistrationData {
        username: payload.username.clone(),
        email: payload.email.clone(),
        first_name: payload.first_name,
        last_name: payload.last_name,
        password_hash: hash,
    };
    match state.users.insert_user(data).await {
        Ok(true) => {}
        Ok(false) => {
            error!("user insert not acknowledged");
            return Err((
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                "Registration failed".into(),
            ));
        }
        Err(StoreError::ConstraintViolation { index }) => {
            warn!(%index, "registration conflicts with an existing user");
            return Err((
                axum::http::StatusCode::CONFLICT,
                "Username or email already registered".into(),
            ));
        }
        Err(e) => {
            error!(error = %e, "insert_user failed");
            return Err((axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    }

    let keys = TokenKeys::from_ref(&state);
    let token = match keys.sign_verification(&payload.email) {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "sign verification token failed");
            return Err((axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };
    state.mailer.send_verification(&payload.email, &token);

    info!(username = %payload.username, email = %payload.email, "user registered");
    Ok(axum::http::StatusCode::CREATED)
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, (axum::http::StatusCode, String)> {
    let identifier = payload.identifier.trim();

    let user = match state.users.user_by_identifier(identifier).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(identifier = %identifier, "login unknown identifier");
            return Err((
                axum::http::StatusCode::UNAUTHORIZED,
                "Invalid credentials".into(),
            ));
        }
        Err(e) => {
            error!(error = %e, "user_by_identifier failed");
            return Err((axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    let ok = match verify_password(&payload.password, &state.users.password_hash(&user)) {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, "verify_password failed");
            return Err((axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };
    if !ok {
        warn!(identifier = %identifier, "login invalid password");
        return Err((
            axum::http::StatusCode::UNAUTHORIZED,
            "Invalid credentials".into(),
        ));
    }

    if !state.users.is_verified(&user) {
        warn!(identifier = %identifier, "login before verification");
        return Err((
            axum::http::StatusCode::FORBIDDEN,
            "Registration not verified".into(),
        ));
    }

    let (Some(id), Some(public)) = (user.id(), PublicUser::of(&user)) else {
        error!("stored user without id");
        return Err((
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            "Login failed".into(),
        ));
    };

    let keys = TokenKeys::from_ref(&state);
    let token = match keys.sign_session(id) {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "sign session token failed");
            return Err((axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    info!(user_id = %id, identifier = %identifier, "user logged in");
    Ok(Json(SessionResponse {
        token,
        user: public,
    }))
}

#[instrument(skip(state, payload))]
pub async fn verify(
    State(state): State<AppState>,
    Json(payload): Json<VerifyRequest>,
) -> Result<axum::http::StatusCode, (axum::http::StatusCode, String)> {
    let keys = TokenKeys::from_ref(&state);
    let claims = keys
        .verify_kind(&payload.token, TokenKind::Verify)
        .map_err(|e| {
            warn!(error = %e, "rejecting verification token");
            (
                axum::http::StatusCode::UNAUTHORIZED,
                "Invalid or expired token".to_string(),
            )
        })?;

    let mut user = match state.users.user_by_identifier(&claims.sub).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(identifier = %claims.sub, "verification for unknown user");
            return Err((axum::http::StatusCode::NOT_FOUND, "User not found".into()));
        }
        Err(e) => {
            error!(error = %e, "user_by_identifier failed");
            return Err((axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    let verified = match state.users.verify_registration(&mut user).await {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, "verify_registration failed");
            return Err((axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };
    if !verified {
        warn!(identifier = %claims.sub, "registration already verified");
        return Err((
            axum::http::StatusCode::CONFLICT,
            "Registration already verified".into(),
        ));
    }

    info!(identifier = %claims.sub, "registration verified");
    Ok(axum::http::StatusCode::OK)
}

#[instrument(skip(state, payload))]
pub async fn request_reset(
    State(state): State<AppState>,
    Json(payload): Json<ResetRequest>,
) -> Result<axum::http::StatusCode, (axum::http::StatusCode, String)> {
    let identifier = payload.identifier.trim();
    let keys = TokenKeys::from_ref(&state);

    match state.users.user_by_identifier(identifier).await {
        Ok(Some(user)) => {
            let reset_key = state.users.reset_key(&user);
            let token = match keys.sign_reset(&reset_key) {
                Ok(t) => t,
                Err(e) => {
                    error!(error = %e, "sign reset token failed");
                    return Err((axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
                }
            };
            state.mailer.send_password_reset(&reset_key, &token);
            info!("password reset mail dispatched");
        }
        Ok(None) => {
            warn!(identifier = %identifier, "password reset for unknown identifier");
        }
        Err(e) => {
            error!(error = %e, "user_by_identifier failed");
            return Err((axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    }

    // The response does not reveal whether the identifier matched an account.
    Ok(axum::http::StatusCode::ACCEPTED)
}

#[instrument(skip(state, payload))]
pub async fn confirm_reset(
    State(state): State<AppState>,
    Json(payload): Json<ResetConfirmRequest>,
) -> Result<axum::http::StatusCode, (axum::http::StatusCode, String)> {
    let keys = TokenKeys::from_ref(&state);
    let claims = keys
        .verify_kind(&payload.token, TokenKind::Reset)
        .map_err(|e| {
            warn!(error = %e, "rejecting reset token");
            (
                axum::http::StatusCode::UNAUTHORIZED,
                "Invalid or expired token".to_string(),
            )
        })?;

    if payload.password.len() < 8 {
        warn!("password too short");
        return Err((
            axum::http::StatusCode::BAD_REQUEST,
            "Password too short".into(),
        ));
    }

    let mut user = match state.users.user_by_identifier(&claims.sub).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(identifier = %claims.sub, "password reset for unknown user");
            return Err((axum::http::StatusCode::NOT_FOUND, "User not found".into()));
        }
        Err(e) => {
            error!(error = %e, "user_by_identifier failed");
            return Err((axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    let hash = match hash_password(&payload.password) {
        Ok(h) => h,
        Err(e) => {
            error!(error = %e, "hash_password failed");
            return Err((axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    let updated = match state.users.update_password(&mut user, &hash).await {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, "update_password failed");
            return Err((axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };
    if !updated {
        error!(identifier = %claims.sub, "password update not applied");
        return Err((
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            "Password update failed".into(),
        ));
    }

    info!(identifier = %claims.sub, "password updated");
    Ok(axum::http::StatusCode::OK)
}

/// Stateless logout target for the demo page's logout link.
pub async fn logout() -> &'static str {
    "Logged out"
}

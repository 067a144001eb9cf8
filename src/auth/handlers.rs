use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, MessageResponse, RegisterRequest, TokenResponse, UserResponse},
        extractors::AuthUser,
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo_types::User,
        validate::{is_valid_email, password_violations},
    },
    error::{ApiError, FieldError},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/verify/:token", get(verify_email))
}

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/user", get(get_user))
}

fn email_field_error() -> FieldError {
    FieldError {
        field: "email",
        message: "Enter a valid email address".into(),
    }
}

/// `Unregistered -> PendingVerification`. Hashes the password, mints a
/// verification token, and inserts atomically; does not log the user in.
#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    let mut errors = Vec::new();
    if !is_valid_email(&payload.email) {
        errors.push(email_field_error());
    }
    errors.extend(password_violations(&payload.password));
    if !errors.is_empty() {
        warn!(email = %payload.email, count = errors.len(), "registration input rejected");
        return Err(ApiError::Validation(errors));
    }

    let password_hash = hash_password(&payload.password)?;

    let keys = JwtKeys::from_ref(&state);
    let verification_token = keys.sign_verification(&payload.email)?;

    let user = User::create(&state.db, &payload.email, &password_hash, &verification_token)
        .await?
        .ok_or_else(|| {
            warn!(email = %payload.email, "email already registered");
            ApiError::DuplicateUser
        })?;

    // The record is already committed; a delivery failure must not undo the
    // registration.
    if let Err(e) = state
        .mailer
        .send_verification(&user.email, &verification_token)
        .await
    {
        warn!(error = %e, email = %user.email, "verification mail delivery failed");
    }

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User registered successfully. Please check your email to verify your account.",
        }),
    ))
}

/// Requires `Verified`. Unknown email and wrong password collapse into the
/// same response; an unverified account is reported as such.
#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    let mut errors = Vec::new();
    if !is_valid_email(&payload.email) {
        errors.push(email_field_error());
    }
    if payload.password.is_empty() {
        errors.push(FieldError {
            field: "password",
            message: "Password is required".into(),
        });
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| {
            warn!(email = %payload.email, "login unknown email");
            ApiError::InvalidCredentials
        })?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    if !user.is_verified {
        warn!(user_id = %user.id, "login before verification");
        return Err(ApiError::NotVerified);
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign_session(user.id)?;

    info!(user_id = %user.id, "login succeeded");
    Ok(Json(TokenResponse { token }))
}

/// `PendingVerification -> Verified`. The presented token must carry a valid
/// signature and match the copy stored on the user row; the row update
/// clears the stored token, so replays fail.
#[instrument(skip(state, token))]
pub async fn verify_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_verification(&token)
        .map_err(|_| ApiError::InvalidToken)?;

    let user = User::mark_verified(&state.db, &claims.email, &token)
        .await?
        .ok_or_else(|| {
            warn!(email = %claims.email, "verification token did not match a pending user");
            ApiError::InvalidToken
        })?;

    info!(user_id = %user.id, email = %user.email, "email verified");
    Ok(Json(MessageResponse {
        message: "Email verified successfully. You can now log in.",
    }))
}

/// Protected by the session token. The extractor trusts the signed claim;
/// the row is fetched here, and a claim whose user has vanished is treated
/// as an invalid session.
#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| {
            warn!(user_id = %user_id, "session claim for missing user");
            ApiError::InvalidSessionToken
        })?;

    Ok(Json(UserResponse::from(user)))
}

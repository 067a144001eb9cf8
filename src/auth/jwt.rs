use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{config::JwtConfig, state::AppState};

/// Token type: short-lived session credential or single-use email
/// verification credential. Carried in the payload so one kind can never be
/// presented as the other.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Session,
    Verification,
}

/// Payload of a session token: the authenticated user's id.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub iat: usize,
    pub exp: usize,
    pub kind: TokenKind,
}

/// Payload of a verification token: the email address being proven.
#[derive(Debug, Serialize, Deserialize)]
pub struct VerificationClaims {
    pub email: String,
    pub iat: usize,
    pub exp: usize,
    pub kind: TokenKind,
}

/// Signing and verification keys derived from the process-wide secret.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub session_ttl: Duration,
    pub verification_ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            session_ttl_minutes,
            verification_ttl_hours,
        } = state.config.jwt.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            session_ttl: Duration::from_secs((session_ttl_minutes as u64) * 60),
            verification_ttl: Duration::from_secs((verification_ttl_hours as u64) * 3600),
        }
    }
}

fn validation() -> Validation {
    let mut validation = Validation::default();
    // Expiry is the only invalidation mechanism for session tokens, so it is
    // enforced exactly.
    validation.leeway = 0;
    validation
}

impl JwtKeys {
    fn timestamps(&self, ttl: Duration) -> (usize, usize) {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        (now.unix_timestamp() as usize, exp.unix_timestamp() as usize)
    }

    pub fn sign_session(&self, user_id: Uuid) -> anyhow::Result<String> {
        let (iat, exp) = self.timestamps(self.session_ttl);
        let claims = SessionClaims {
            sub: user_id,
            iat,
            exp,
            kind: TokenKind::Session,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "session token signed");
        Ok(token)
    }

    pub fn sign_verification(&self, email: &str) -> anyhow::Result<String> {
        let (iat, exp) = self.timestamps(self.verification_ttl);
        let claims = VerificationClaims {
            email: email.to_string(),
            iat,
            exp,
            kind: TokenKind::Verification,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(email = %email, "verification token signed");
        Ok(token)
    }

    /// Tampered, malformed, expired, and wrong-kind tokens all fail the same
    /// way; callers never learn which check tripped.
    pub fn verify_session(&self, token: &str) -> anyhow::Result<SessionClaims> {
        let data = decode::<SessionClaims>(token, &self.decoding, &validation())?;
        if data.claims.kind != TokenKind::Session {
            anyhow::bail!("not a session token");
        }
        Ok(data.claims)
    }

    pub fn verify_verification(&self, token: &str) -> anyhow::Result<VerificationClaims> {
        let data = decode::<VerificationClaims>(token, &self.decoding, &validation())?;
        if data.claims.kind != TokenKind::Verification {
            anyhow::bail!("not a verification token");
        }
        Ok(data.claims)
    }
}

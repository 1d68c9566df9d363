use std::time::Duration;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{config::AuthConfig, state::AppState};

/// What a signed token is good for. Session tokens are signed with the
/// application secret; verification and reset tokens with the separate
/// signing key, so neither kind can stand in for the other.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Session,
    Verify,
    Reset,
}

/// Claims carried by every token. `sub` is the user id for sessions and the
/// lookup identifier for verification and reset tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
    pub iss: String,
    pub kind: TokenKind,
}

/// Signing and verification keys for both token families.
#[derive(Clone)]
pub struct TokenKeys {
    session_enc: EncodingKey,
    session_dec: DecodingKey,
    signing_enc: EncodingKey,
    signing_dec: DecodingKey,
    issuer: String,
    session_ttl: Duration,
    token_ttl: Duration,
}

impl FromRef<AppState> for TokenKeys {
    fn from_ref(state: &AppState) -> Self {
        let AuthConfig {
            secret_key,
            token_signing_key,
            issuer,
            session_ttl_minutes,
            token_ttl_minutes,
        } = state.config.auth.clone();
        Self {
            session_enc: EncodingKey::from_secret(secret_key.as_bytes()),
            session_dec: DecodingKey::from_secret(secret_key.as_bytes()),
            signing_enc: EncodingKey::from_secret(token_signing_key.as_bytes()),
            signing_dec: DecodingKey::from_secret(token_signing_key.as_bytes()),
            issuer,
            session_ttl: Duration::from_secs((session_ttl_minutes as u64) * 60),
            token_ttl: Duration::from_secs((token_ttl_minutes as u64) * 60),
        }
    }
}

impl TokenKeys {
    fn sign_with_kind(&self, subject: &str, kind: TokenKind) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let (key, ttl) = match kind {
            TokenKind::Session => (&self.session_enc, self.session_ttl),
            TokenKind::Verify | TokenKind::Reset => (&self.signing_enc, self.token_ttl),
        };
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            sub: subject.to_owned(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            kind,
        };
        let token = encode(&Header::default(), &claims, key)?;
        debug!(subject = %subject, kind = ?kind, "token signed");
        Ok(token)
    }

    pub fn sign_session(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.sign_with_kind(&user_id.to_string(), TokenKind::Session)
    }

    pub fn sign_verification(&self, identifier: &str) -> anyhow::Result<String> {
        self.sign_with_kind(identifier, TokenKind::Verify)
    }

    pub fn sign_reset(&self, reset_key: &str) -> anyhow::Result<String> {
        self.sign_with_kind(reset_key, TokenKind::Reset)
    }

    /// Decodes a token and insists it is of the expected kind.
    pub fn verify_kind(&self, token: &str, kind: TokenKind) -> anyhow::Result<Claims> {
        let key = match kind {
            TokenKind::Session => &self.session_dec,
            TokenKind::Verify | TokenKind::Reset => &self.signing_dec,
        };
        let mut validation = Validation::default();
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, key, &validation)?;
        if data.claims.kind != kind {
            anyhow::bail!("unexpected token kind");
        }
        debug!(subject = %data.claims.sub, kind = ?kind, "token verified");
        Ok(data.claims)
    }
}

/// The id string of the user behind the request's Bearer session token.
pub struct AuthUser(pub String);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    TokenKeys: FromRef<S>,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = TokenKeys::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or((
                StatusCode::UNAUTHORIZED,
                "Missing Authorization header".to_string(),
            ))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or((
            StatusCode::UNAUTHORIZED,
            "Invalid Authorization header".to_string(),
        ))?;

        match keys.verify_kind(token, TokenKind::Session) {
            Ok(claims) => Ok(AuthUser(claims.sub)),
            Err(_) => {
                warn!("invalid or expired session token");
                Err((
                    StatusCode::UNAUTHORIZED,
                    "Invalid or expired token".to_string(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys() -> TokenKeys {
        let state = AppState::fake();
        TokenKeys::from_ref(&state)
    }

    #[test]
    fn sign_and_verify_session_token() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign_session(user_id).expect("sign session");
        let claims = keys
            .verify_kind(&token, TokenKind::Session)
            .expect("verify token");
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.kind, TokenKind::Session);
    }

    #[test]
    fn verification_token_carries_the_identifier() {
        let keys = make_keys();
        let token = keys.sign_verification("a@x.com").expect("sign");
        let claims = keys
            .verify_kind(&token, TokenKind::Verify)
            .expect("verify");
        assert_eq!(claims.sub, "a@x.com");
        assert_eq!(claims.kind, TokenKind::Verify);
    }

    #[test]
    fn kinds_are_not_interchangeable() {
        let keys = make_keys();
        let reset = keys.sign_reset("a@x.com").expect("sign reset");
        assert!(keys.verify_kind(&reset, TokenKind::Verify).is_err());
        // Signed with the other key entirely, so this fails twice over.
        assert!(keys.verify_kind(&reset, TokenKind::Session).is_err());
    }

    #[test]
    fn session_and_signing_keys_are_distinct() {
        let keys = make_keys();
        let session = keys.sign_session(Uuid::new_v4()).expect("sign session");
        assert!(keys.verify_kind(&session, TokenKind::Reset).is_err());
    }
}

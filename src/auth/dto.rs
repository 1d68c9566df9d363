use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::users::User;

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

/// Request body for login. The identifier is a username or an email address.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

/// Request body for registration verification.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub token: String,
}

/// Request body asking for a password-reset mail.
#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub identifier: String,
}

/// Request body completing a password reset.
#[derive(Debug, Deserialize)]
pub struct ResetConfirmRequest {
    pub token: String,
    pub password: String,
}

/// Response returned after a successful login.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: PublicUser,
}

/// Public part of the user returned to clients.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

impl PublicUser {
    /// `None` until the record has a storage-assigned id.
    pub fn of(user: &User) -> Option<Self> {
        user.id().map(|id| Self {
            id,
            username: user.username.clone(),
            email: user.email.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_user_requires_an_id() {
        let user = User::default();
        assert!(PublicUser::of(&user).is_none());
    }

    #[test]
    fn session_response_serializes_public_fields_only() {
        let response = SessionResponse {
            token: "t".into(),
            user: PublicUser {
                id: Uuid::new_v4(),
                username: "alice".into(),
                email: "a@x.com".into(),
            },
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("alice"));
        assert!(json.contains("a@x.com"));
        assert!(!json.contains("password"));
    }
}

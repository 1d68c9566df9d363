use serde::Deserialize;

/// Connection surface of the document store.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub username: String,
    pub password: String,
    pub collection: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Secret the session tokens are signed with.
    pub secret_key: String,
    /// Separate key for verification and password-reset tokens.
    pub token_signing_key: String,
    pub issuer: String,
    pub session_ttl_minutes: i64,
    pub token_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database = DatabaseConfig {
            host: std::env::var("DB_HOST").unwrap_or_else(|_| "localhost".into()),
            port: std::env::var("DB_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(27017),
            name: std::env::var("DB_NAME").unwrap_or_else(|_| "userdemo".into()),
            username: std::env::var("DB_USERNAME").unwrap_or_default(),
            password: std::env::var("DB_PASSWORD").unwrap_or_default(),
            collection: std::env::var("DB_USER_COLLECTION").unwrap_or_else(|_| "users".into()),
        };
        let auth = AuthConfig {
            secret_key: std::env::var("SECRET_KEY")?,
            token_signing_key: std::env::var("TOKEN_SIGNING_KEY")?,
            issuer: std::env::var("TOKEN_ISSUER").unwrap_or_else(|_| "userdemo".into()),
            session_ttl_minutes: std::env::var("SESSION_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
            token_ttl_minutes: std::env::var("TOKEN_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24),
        };
        Ok(Self { database, auth })
    }
}

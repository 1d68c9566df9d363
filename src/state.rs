use std::sync::Arc;

use crate::auth::mail::{ConsoleMailer, Mailer};
use crate::config::AppConfig;
use crate::store::{Collection, DocumentStore, MemoryStore};
use crate::users::{User, UserGateway, UserLoader, UserRepo};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserGateway>,
    pub loader: Arc<dyn UserLoader>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        tracing::info!(
            host = %config.database.host,
            port = config.database.port,
            database = %config.database.name,
            collection = %config.database.collection,
            user = %config.database.username,
            credentials = !config.database.password.is_empty(),
            "document store ready"
        );

        let users: Collection<User> = Collection::new(store, config.database.collection.clone());
        users.ensure_indexes().await?;
        let repo = Arc::new(UserRepo::new(users));

        Ok(Self {
            config,
            users: repo.clone(),
            loader: repo,
            mailer: Arc::new(ConsoleMailer),
        })
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::{AuthConfig, DatabaseConfig};

        let config = Arc::new(AppConfig {
            database: DatabaseConfig {
                host: "localhost".into(),
                port: 27017,
                name: "test".into(),
                username: String::new(),
                password: String::new(),
                collection: "users".into(),
            },
            auth: AuthConfig {
                secret_key: "test-secret".into(),
                token_signing_key: "test-signing-key".into(),
                issuer: "test-issuer".into(),
                session_ttl_minutes: 5,
                token_ttl_minutes: 60,
            },
        });
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let repo = Arc::new(UserRepo::new(Collection::new(store, "users")));
        Self {
            config,
            users: repo.clone(),
            loader: repo,
            mailer: Arc::new(ConsoleMailer),
        }
    }
}

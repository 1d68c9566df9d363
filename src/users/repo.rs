use async_trait::async_trait;
use uuid::Uuid;

use crate::store::{doc, Collection, StoreError};
use crate::users::model::{RegistrationData, User, UserState};

/// Slot the session layer is wired with to rehydrate the current user from
/// the opaque id string it carries around.
#[async_trait]
pub trait UserLoader: Send + Sync {
    async fn load_user(&self, user_id: &str) -> Result<Option<User>, StoreError>;
}

/// The extension points the user-handling component is wired with. Lookups
/// report absence as `None`; writes report failure as `false`, folding
/// "not acknowledged" and "nothing modified" into one signal. Constraint
/// violations and other storage failures pass through as errors.
#[async_trait]
pub trait UserGateway: Send + Sync {
    /// Looks a user up by username or email address.
    async fn user_by_identifier(&self, identifier: &str) -> Result<Option<User>, StoreError>;

    /// Stable identifier used to correlate a password reset with a user.
    fn reset_key(&self, user: &User) -> String;

    fn password_hash(&self, user: &User) -> String;

    /// Creates the user described by the registration form data.
    async fn insert_user(&self, data: RegistrationData) -> Result<bool, StoreError>;

    /// Whether the user's registration has been verified.
    fn is_verified(&self, user: &User) -> bool;

    /// Replaces the user's password hash, persisting only that field.
    async fn update_password(
        &self,
        user: &mut User,
        password_hash: &str,
    ) -> Result<bool, StoreError>;

    /// Marks the user's registration as verified, persisting only the state
    /// field. Fails without touching storage unless the registration is
    /// still pending.
    async fn verify_registration(&self, user: &mut User) -> Result<bool, StoreError>;
}

/// Binds the session and user-handling slots to one collection of [`User`]
/// documents. Holds no state of its own; every method is a single storage
/// operation.
pub struct UserRepo {
    users: Collection<User>,
}

impl UserRepo {
    pub fn new(users: Collection<User>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl UserLoader for UserRepo {
    async fn load_user(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        // An id string that never came from this store matches nothing.
        let Ok(id) = Uuid::parse_str(user_id) else {
            return Ok(None);
        };
        self.users.find_by_id(id).await
    }
}

#[async_trait]
impl UserGateway for UserRepo {
    async fn user_by_identifier(&self, identifier: &str) -> Result<Option<User>, StoreError> {
        // An identifier with an `@` is taken for an email address, anything
        // else for a username. Usernames containing `@` are unreachable here.
        let field = if identifier.contains('@') {
            "email"
        } else {
            "username"
        };
        self.users.find_one(doc(field, identifier)).await
    }

    fn reset_key(&self, user: &User) -> String {
        user.email.clone()
    }

    fn password_hash(&self, user: &User) -> String {
        user.password_hash.clone()
    }

    async fn insert_user(&self, data: RegistrationData) -> Result<bool, StoreError> {
        let mut user = User::from_registration(data);
        let result = self.users.insert_one(&mut user).await?;
        Ok(result.acknowledged && result.inserted_id.is_some())
    }

    fn is_verified(&self, user: &User) -> bool {
        user.state == UserState::Active
    }

    async fn update_password(
        &self,
        user: &mut User,
        password_hash: &str,
    ) -> Result<bool, StoreError> {
        let Some(id) = user.id() else {
            return Ok(false);
        };
        user.password_hash = password_hash.to_owned();
        let result = self
            .users
            .update_one(
                doc("_id", id.to_string()),
                doc("password", user.password_hash.clone()),
            )
            .await?;
        Ok(result.acknowledged && result.modified_count == 1)
    }

    async fn verify_registration(&self, user: &mut User) -> Result<bool, StoreError> {
        if user.state != UserState::PendingVerification {
            return Ok(false);
        }
        let Some(id) = user.id() else {
            return Ok(false);
        };
        user.state = UserState::Active;
        let result = self
            .users
            .update_one(doc("_id", id.to_string()), doc("state", user.state.code()))
            .await?;
        Ok(result.acknowledged && result.modified_count == 1)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::store::{Document, DocumentStore, MemoryStore};

    use super::*;

    async fn repo() -> UserRepo {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let users: Collection<User> = Collection::new(store, "users");
        users.ensure_indexes().await.expect("create indexes");
        UserRepo::new(users)
    }

    fn alice() -> RegistrationData {
        RegistrationData {
            username: "alice".into(),
            email: "a@x.com".into(),
            first_name: "A".into(),
            last_name: "L".into(),
            password_hash: "h1".into(),
        }
    }

    #[tokio::test]
    async fn inserted_user_is_found_by_username_and_email() {
        let repo = repo().await;
        assert!(repo.insert_user(alice()).await.expect("insert"));

        let by_name = repo
            .user_by_identifier("alice")
            .await
            .expect("lookup")
            .expect("present");
        assert_eq!(by_name.state, UserState::PendingVerification);

        let by_email = repo
            .user_by_identifier("a@x.com")
            .await
            .expect("lookup")
            .expect("present");
        assert_eq!(by_name, by_email);
    }

    #[tokio::test]
    async fn duplicate_email_fails_with_constraint_violation() {
        let repo = repo().await;
        assert!(repo.insert_user(alice()).await.expect("insert"));

        let mut dup = alice();
        dup.username = "someone-else".into();
        let err = repo.insert_user(dup).await.expect_err("must be rejected");
        assert!(matches!(
            err,
            StoreError::ConstraintViolation { ref index } if index == "email_index"
        ));
    }

    #[tokio::test]
    async fn duplicate_username_fails_with_constraint_violation() {
        let repo = repo().await;
        assert!(repo.insert_user(alice()).await.expect("insert"));

        let mut dup = alice();
        dup.email = "other@x.com".into();
        let err = repo.insert_user(dup).await.expect_err("must be rejected");
        assert!(matches!(
            err,
            StoreError::ConstraintViolation { ref index } if index == "username_index"
        ));
    }

    #[tokio::test]
    async fn verification_advances_exactly_once() {
        let repo = repo().await;
        repo.insert_user(alice()).await.expect("insert");

        let mut user = repo
            .user_by_identifier("alice")
            .await
            .expect("lookup")
            .expect("present");
        assert!(!repo.is_verified(&user));
        assert!(repo.verify_registration(&mut user).await.expect("verify"));
        assert_eq!(user.state, UserState::Active);

        let mut reloaded = repo
            .user_by_identifier("alice")
            .await
            .expect("lookup")
            .expect("present");
        assert_eq!(reloaded.state, UserState::Active);
        assert!(repo.is_verified(&reloaded));

        // Second verification is a no-op failure, not a toggle.
        assert!(!repo
            .verify_registration(&mut reloaded)
            .await
            .expect("verify again"));
        assert_eq!(reloaded.state, UserState::Active);
    }

    #[tokio::test]
    async fn password_update_touches_only_the_hash() {
        let repo = repo().await;
        repo.insert_user(alice()).await.expect("insert");

        let mut user = repo
            .user_by_identifier("alice")
            .await
            .expect("lookup")
            .expect("present");
        let before = user.to_document();

        assert!(repo
            .update_password(&mut user, "h2")
            .await
            .expect("update"));
        assert_eq!(repo.password_hash(&user), "h2");

        let mut after = repo
            .user_by_identifier("alice")
            .await
            .expect("lookup")
            .expect("present")
            .to_document();
        assert_eq!(after.remove("password"), Some("h2".into()));
        let mut rest = before;
        rest.remove("password");
        assert_eq!(after, rest);
    }

    #[tokio::test]
    async fn email_shaped_identifier_never_matches_a_username() {
        let repo = repo().await;
        let mut data = alice();
        data.username = "bob@home".into();
        data.email = "bob@x.com".into();
        repo.insert_user(data).await.expect("insert");

        // The username exists verbatim, but an `@` forces the email field.
        assert!(repo
            .user_by_identifier("bob@home")
            .await
            .expect("lookup")
            .is_none());
        assert!(repo
            .user_by_identifier("bob@x.com")
            .await
            .expect("lookup")
            .is_some());
    }

    #[tokio::test]
    async fn loader_resolves_stored_ids_and_ignores_garbage() {
        let repo = repo().await;
        repo.insert_user(alice()).await.expect("insert");
        let user = repo
            .user_by_identifier("alice")
            .await
            .expect("lookup")
            .expect("present");
        let id = user.id().expect("assigned").to_string();

        let loaded = repo
            .load_user(&id)
            .await
            .expect("load")
            .expect("present");
        assert_eq!(loaded, user);
        assert!(repo
            .load_user("not-an-id")
            .await
            .expect("load")
            .is_none());
    }

    #[tokio::test]
    async fn registration_to_login_flow() {
        let repo = repo().await;
        assert!(repo.insert_user(alice()).await.expect("insert"));

        let mut user = repo
            .user_by_identifier("a@x.com")
            .await
            .expect("lookup")
            .expect("present");
        assert_eq!(user.state, UserState::PendingVerification);
        assert_eq!(repo.reset_key(&user), "a@x.com");
        assert_eq!(repo.password_hash(&user), "h1");

        assert!(repo.verify_registration(&mut user).await.expect("verify"));

        let same = repo
            .user_by_identifier("alice")
            .await
            .expect("lookup")
            .expect("present");
        assert_eq!(same, user);
        assert_eq!(same.state, UserState::Active);
    }
}

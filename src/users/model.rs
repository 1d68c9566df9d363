use serde_json::Value;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::store::{get_i64, get_str, Document, IndexSpec, RawDocument, StoreError};

/// Where a user stands in the registration lifecycle. The only transition is
/// `PendingVerification` to `Active`, taken exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserState {
    /// Registered but the registration has not been verified yet.
    PendingVerification,
    /// Registered and verified.
    Active,
}

impl UserState {
    pub(crate) fn code(self) -> i64 {
        match self {
            UserState::PendingVerification => 1,
            UserState::Active => 2,
        }
    }

    pub(crate) fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(UserState::PendingVerification),
            2 => Some(UserState::Active),
            _ => None,
        }
    }
}

/// Registration form data a new user record is created from. The password
/// arrives already hashed.
#[derive(Debug, Clone)]
pub struct RegistrationData {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
}

/// A stored user. `email` and `username` are each unique across the
/// collection, enforced by the indexes in [`Document::index_models`].
#[derive(Debug, Clone)]
pub struct User {
    id: Option<Uuid>,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub registration_date: Date,
    pub state: UserState,
    pub username: String,
}

impl User {
    pub fn from_registration(data: RegistrationData) -> Self {
        Self {
            email: data.email,
            first_name: data.first_name,
            last_name: data.last_name,
            password_hash: data.password_hash,
            username: data.username,
            ..Self::default()
        }
    }

    /// Storage-assigned identifier, present once the record was inserted.
    pub fn id(&self) -> Option<Uuid> {
        self.id
    }
}

impl Default for User {
    fn default() -> Self {
        Self {
            id: None,
            email: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: String::new(),
            registration_date: OffsetDateTime::now_utc().date(),
            state: UserState::PendingVerification,
            username: String::new(),
        }
    }
}

/// Two records are the same user only when both carry a storage-assigned id
/// and the ids match; records that were never inserted compare unequal. Not
/// `Eq` since an id-less record is unequal even to itself.
impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        match (self.id, other.id) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl Document for User {
    fn assign_id(&mut self, id: Uuid) {
        self.id = Some(id);
    }

    fn index_models() -> Vec<IndexSpec> {
        vec![
            IndexSpec {
                field: "email",
                name: "email_index",
                unique: true,
            },
            IndexSpec {
                field: "username",
                name: "username_index",
                unique: true,
            },
        ]
    }

    fn to_document(&self) -> RawDocument {
        let mut doc = RawDocument::new();
        if let Some(id) = self.id {
            doc.insert("_id".to_owned(), Value::String(id.to_string()));
        }
        doc.insert("email".to_owned(), self.email.clone().into());
        doc.insert("first_name".to_owned(), self.first_name.clone().into());
        doc.insert("last_name".to_owned(), self.last_name.clone().into());
        doc.insert("password".to_owned(), self.password_hash.clone().into());
        doc.insert(
            "registration_date".to_owned(),
            self.registration_date.to_julian_day().into(),
        );
        doc.insert("state".to_owned(), self.state.code().into());
        doc.insert("username".to_owned(), self.username.clone().into());
        doc
    }

    fn load(&mut self, doc: &RawDocument) -> Result<(), StoreError> {
        let id = get_str(doc, "_id")?;
        self.id = Some(
            Uuid::parse_str(&id).map_err(|_| StoreError::InvalidField { field: "_id" })?,
        );
        self.email = get_str(doc, "email")?;
        self.first_name = get_str(doc, "first_name")?;
        self.last_name = get_str(doc, "last_name")?;
        self.password_hash = get_str(doc, "password")?;
        let day = i32::try_from(get_i64(doc, "registration_date")?).map_err(|_| {
            StoreError::InvalidField {
                field: "registration_date",
            }
        })?;
        self.registration_date = Date::from_julian_day(day).map_err(|_| {
            StoreError::InvalidField {
                field: "registration_date",
            }
        })?;
        self.state = UserState::from_code(get_i64(doc, "state")?)
            .ok_or(StoreError::InvalidField { field: "state" })?;
        self.username = get_str(doc, "username")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> User {
        let mut user = User::from_registration(RegistrationData {
            username: "alice".into(),
            email: "a@x.com".into(),
            first_name: "A".into(),
            last_name: "L".into(),
            password_hash: "h1".into(),
        });
        user.assign_id(Uuid::new_v4());
        user
    }

    #[test]
    fn registration_starts_pending_and_dated_today() {
        let user = User::from_registration(RegistrationData {
            username: "alice".into(),
            email: "a@x.com".into(),
            first_name: "A".into(),
            last_name: "L".into(),
            password_hash: "h1".into(),
        });
        assert_eq!(user.state, UserState::PendingVerification);
        assert_eq!(user.registration_date, OffsetDateTime::now_utc().date());
        assert!(user.id().is_none());
    }

    #[test]
    fn document_round_trip_preserves_every_field() {
        let user = sample();
        let doc = user.to_document();
        let mut loaded = User::default();
        loaded.load(&doc).expect("load");
        assert_eq!(loaded.to_document(), doc);
        assert_eq!(loaded.id(), user.id());
        assert_eq!(loaded.state, user.state);
        assert_eq!(loaded.registration_date, user.registration_date);
    }

    #[test]
    fn load_fails_fast_on_missing_field() {
        let mut doc = sample().to_document();
        doc.remove("password");
        let err = User::default().load(&doc).expect_err("must fail");
        assert!(matches!(err, StoreError::MissingField { field: "password" }));
    }

    #[test]
    fn load_rejects_unknown_state_code() {
        let mut doc = sample().to_document();
        doc.insert("state".into(), 9.into());
        let err = User::default().load(&doc).expect_err("must fail");
        assert!(matches!(err, StoreError::InvalidField { field: "state" }));
    }

    #[test]
    fn equality_is_by_assigned_id_only() {
        let a = sample();
        let mut b = a.clone();
        b.username = "someone-else".into();
        assert_eq!(a, b);

        let c = sample();
        assert_ne!(a, c);
    }

    #[test]
    fn records_without_ids_never_compare_equal() {
        let a = User::default();
        let b = a.clone();
        assert_ne!(a, b);
        assert_ne!(a, a.clone());
    }

    #[test]
    fn state_codes_round_trip() {
        assert_eq!(
            UserState::from_code(UserState::PendingVerification.code()),
            Some(UserState::PendingVerification)
        );
        assert_eq!(
            UserState::from_code(UserState::Active.code()),
            Some(UserState::Active)
        );
        assert_eq!(UserState::from_code(0), None);
    }
}

//! User accounts.
//!
//! Users hold an argon2 password hash, never the password itself. The store
//! does not enforce username uniqueness; `UserRepository::find_by_username`
//! takes the first match, so registration checks for an existing name first.

use chrono::{DateTime, Utc};
use meridian_core::{Email, UserId};
use serde::Serialize;
use serde_json::json;

use crate::store::{Collection, DocumentStore, Fields, Record, StoreError};

const COLLECTION: &str = "users";

/// A user account.
#[derive(Debug, Clone)]
pub struct User {
    /// Store-assigned id; `None` until first save.
    pub id: Option<UserId>,
    pub username: String,
    /// Argon2 PHC-format hash.
    pub password_hash: String,
    pub email: Option<Email>,
    pub is_admin: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    /// New unsaved account.
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        password_hash: impl Into<String>,
        email: Option<Email>,
    ) -> Self {
        Self {
            id: None,
            username: username.into(),
            password_hash: password_hash.into(),
            email,
            is_admin: false,
            created_at: None,
            updated_at: None,
        }
    }

    fn from_record(record: &Record) -> Result<Self, StoreError> {
        let password_hash = record
            .opt_string("password_hash")
            .ok_or_else(|| StoreError::Corrupt {
                collection: COLLECTION.to_owned(),
                reason: format!("user {} has no password hash", record.id),
            })?;

        let email = match record.str("email") {
            None | Some("") => None,
            Some(raw) => Some(Email::parse(raw).map_err(|e| StoreError::Corrupt {
                collection: COLLECTION.to_owned(),
                reason: format!("user {}: {e}", record.id),
            })?),
        };

        Ok(Self {
            id: Some(UserId::new(record.id.clone())),
            username: record.string_or_empty("username"),
            password_hash,
            email,
            is_admin: record.bool_or("is_admin", false),
            created_at: record.timestamp("created_at"),
            updated_at: record.timestamp("updated_at"),
        })
    }

    fn to_fields(&self) -> Fields {
        super::fields_of(json!({
            "username": self.username,
            "password_hash": self.password_hash,
            "email": self.email.as_ref().map(Email::as_str),
            "is_admin": self.is_admin,
        }))
    }

    /// Response shape, with the password hash withheld.
    #[must_use]
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.as_ref().map(|e| e.as_str().to_owned()),
            is_admin: self.is_admin,
            created_at: self.created_at,
        }
    }
}

/// What callers are allowed to see of a [`User`].
#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: Option<UserId>,
    pub username: String,
    pub email: Option<String>,
    pub is_admin: bool,
    pub created_at: Option<DateTime<Utc>>,
}

/// Accessor for the `users` collection.
pub struct UserRepository<'a> {
    users: Collection<'a>,
}

impl<'a> UserRepository<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self {
            users: Collection::new(store, COLLECTION),
        }
    }

    /// Look up a user by id.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn get(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        let record = self.users.get(id.as_str()).await?;
        record.as_ref().map(User::from_record).transpose()
    }

    /// First user with the given username, if any.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let records = self
            .users
            .filter(&[("username", json!(username))])
            .await?;
        records.first().map(User::from_record).transpose()
    }

    /// Insert or update, writing the assigned id back onto `user`.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn save(&self, user: &mut User) -> Result<UserId, StoreError> {
        let id = self
            .users
            .upsert(user.id.as_ref().map(UserId::as_str), user.to_fields())
            .await?;
        let id = UserId::new(id);
        user.id = Some(id.clone());
        Ok(id)
    }

    /// Delete an account. Deleting an absent account succeeds.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn delete(&self, id: &UserId) -> Result<(), StoreError> {
        self.users.delete(id.as_str()).await
    }
}

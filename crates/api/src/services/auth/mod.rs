//! Authentication service.
//!
//! Password login over the users collection. Passwords are hashed with
//! Argon2id; successful logins are answered with a bearer token from the
//! [`TokenService`].
//!
//! The store does not enforce username uniqueness, so registration checks
//! for an existing name first. Two concurrent registrations of the same name
//! can still both land; login then picks whichever the store returns first.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use meridian_core::{Email, UserId};

use crate::models::{User, UserRepository};
use crate::services::token::TokenService;
use crate::store::DocumentStore;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    tokens: &'a TokenService,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore, tokens: &'a TokenService) -> Self {
        Self {
            users: UserRepository::new(store),
            tokens,
        }
    }

    /// Register a new user with username and password.
    ///
    /// Deliberately not exposed over HTTP: accounts are provisioned
    /// out-of-band (seed scripts, an operator console), never by
    /// self-service signup.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` if the password doesn't meet
    /// requirements, `AuthError::InvalidEmail` for a malformed email, and
    /// `AuthError::UserAlreadyExists` if the username is taken.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        email: Option<&str>,
    ) -> Result<User, AuthError> {
        validate_password(password)?;
        let email = email.map(Email::parse).transpose()?;

        if self.users.find_by_username(username).await?.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }

        let mut user = User::new(username, hash_password(password)?, email);
        self.users.save(&mut user).await?;
        Ok(user)
    }

    /// Login with username and password, minting a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the username/password is
    /// wrong. Unknown usernames get the same answer as wrong passwords.
    pub async fn login(&self, username: &str, password: &str) -> Result<(String, User), AuthError> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &user.password_hash)?;

        let id = user.id.as_ref().ok_or(AuthError::UserNotFound)?;
        let token = self.tokens.issue(id)?;
        Ok((token, user))
    }

    /// Replace a user's password after checking the current one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the current password is
    /// wrong and `AuthError::WeakPassword` if the new one is too short.
    pub async fn change_password(
        &self,
        user_id: &UserId,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let mut user = self
            .users
            .get(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        verify_password(current_password, &user.password_hash)?;
        validate_password(new_password)?;

        user.password_hash = hash_password(new_password)?;
        self.users.save(&mut user).await?;
        Ok(())
    }

    /// Get a user by id.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: &UserId) -> Result<User, AuthError> {
        self.users
            .get(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Argon2id with a fresh random salt.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// An unparseable stored hash answers the same as a wrong password.
fn verify_password(password: &str, stored: &str) -> Result<(), AuthError> {
    let parsed = PasswordHash::new(stored).map_err(|_| AuthError::InvalidCredentials)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AuthError::InvalidCredentials)
}

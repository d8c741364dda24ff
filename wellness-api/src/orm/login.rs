//! Database side of registration and login.
//!
//! Password hashing runs on a blocking thread, and the workflow functions
//! are generic over [`DbRunner`] so they can be exercised against an
//! in-memory connection as well as the Rocket pool.

use argon2::{
    Argon2, PasswordHasher,
    password_hash::{self, PasswordHash, PasswordVerifier, SaltString, rand_core::OsRng},
};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use rocket::tokio::task::spawn_blocking;

use crate::DbConn;
use crate::error::ApiError;
use crate::models::{User, UserInput};
use crate::orm::user::{find_user_by_email, insert_user};
#[cfg(any(test, feature = "test-staging"))]
use crate::orm::testing::FakeDbConn;

/// Returned for every failed login so callers cannot tell which part was wrong.
pub const INVALID_LOGIN: &str = "Invalid email or password";
pub const EMAIL_TAKEN: &str = "Email already registered";

/// Trait for abstracting database operations to support both production and testing.
///
/// This trait allows the same functions to work with both `DbConn` (production)
/// and `FakeDbConn` (testing) by providing a unified interface for database operations.
pub trait DbRunner {
    fn run<F, R>(&self, f: F) -> impl std::future::Future<Output = R>
    where
        F: FnOnce(&mut diesel::SqliteConnection) -> R + Send + 'static,
        R: Send + 'static;
}

impl DbRunner for DbConn {
    fn run<F, R>(&self, f: F) -> impl std::future::Future<Output = R>
    where
        F: FnOnce(&mut diesel::SqliteConnection) -> R + Send + 'static,
        R: Send + 'static,
    {
        DbConn::run(self, f)
    }
}

#[cfg(any(test, feature = "test-staging"))]
impl<'a> DbRunner for FakeDbConn<'a> {
    fn run<F, R>(&self, f: F) -> impl std::future::Future<Output = R>
    where
        F: FnOnce(&mut diesel::SqliteConnection) -> R + Send + 'static,
        R: Send + 'static,
    {
        FakeDbConn::run(self, f)
    }
}

/// Hashes a password with Argon2 and a random salt, in PHC string format.
pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Verifies a password against a stored hash. A hash that cannot be parsed
/// never matches.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed_hash) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok(),
        Err(e) => {
            warn!("Stored password hash could not be parsed: {}", e);
            false
        }
    }
}

/// Creates an account for an already validated and normalised email.
///
/// Fails with 400 if the email is taken, including when a concurrent
/// registration wins the race and the unique index rejects the insert.
pub async fn register_user<D: DbRunner>(
    db: &D,
    email: String,
    password: String,
) -> Result<User, ApiError> {
    let lookup = email.clone();
    if db
        .run(move |conn| find_user_by_email(conn, &lookup))
        .await?
        .is_some()
    {
        return Err(ApiError::BadRequest(EMAIL_TAKEN.to_string()));
    }

    let password_hash = spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::internal("Server error", e))?
        .map_err(|e| ApiError::internal("Server error", e))?;

    let input = UserInput {
        email,
        password_hash,
    };
    match db.run(move |conn| insert_user(conn, input)).await {
        Ok(user) => {
            info!("Registered user {} ({})", user.id, user.email);
            Ok(user)
        }
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            Err(ApiError::BadRequest(EMAIL_TAKEN.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Looks up the user and checks the password. Every failure is the same
/// 400 [`INVALID_LOGIN`].
pub async fn authenticate<D: DbRunner>(
    db: &D,
    email: String,
    password: String,
) -> Result<User, ApiError> {
    let user = db
        .run(move |conn| find_user_by_email(conn, &email))
        .await?
        .ok_or_else(|| ApiError::BadRequest(INVALID_LOGIN.to_string()))?;

    let stored_hash = user.password_hash.clone();
    let matches = spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|e| ApiError::internal("Server error", e))?;

    if matches {
        Ok(user)
    } else {
        Err(ApiError::BadRequest(INVALID_LOGIN.to_string()))
    }
}

//! Account endpoints: registration, login and the current user.
//!
//! Registration and login both answer with a bearer token that clients
//! send back as `Authorization: Bearer <token>`.

use email_address::EmailAddress;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::{Error as JsonError, Json};
use rocket::{Route, State};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::config::AppContext;
use crate::error::{ApiError, ValidationError};
use crate::models::{PublicUser, User, UserProfile, normalize_email};
use crate::orm::DbConn;
use crate::orm::login::{INVALID_LOGIN, authenticate, register_user};
use crate::session_guards::AuthenticatedUser;

/// Request payload for register and login.
#[derive(Debug, Deserialize, TS)]
#[ts(export)]
pub struct Credentials {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Successful register/login response.
#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

/// Accepts a bare `local@host.tld` address. Display names and domain
/// literals are refused and host labels are alphanumeric with inner hyphens.
fn is_valid_email(email: &str) -> bool {
    let Ok(address) = email.parse::<EmailAddress>() else {
        return false;
    };
    let (local, domain) = (address.local_part(), address.domain());
    format!("{}@{}", local, domain) == email
        && !local.starts_with('.')
        && !local.ends_with('.')
        && !local.contains("..")
        && domain.contains('.')
        && domain.split('.').all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

impl Credentials {
    /// Normalised email and password, both present and non-blank.
    fn into_parts(self) -> Option<(String, String)> {
        let email = self
            .email
            .map(|e| normalize_email(&e))
            .filter(|e| !e.is_empty())?;
        let password = self.password.filter(|p| !p.trim().is_empty())?;
        Some((email, password))
    }

    fn for_registration(self) -> Result<(String, String), ValidationError> {
        let (email, password) = self
            .into_parts()
            .ok_or(ValidationError::MissingCredentials)?;
        if !is_valid_email(&email) {
            return Err(ValidationError::InvalidEmail);
        }
        Ok((email, password))
    }
}

fn token_response(ctx: &AppContext, user: &User) -> Result<AuthResponse, ApiError> {
    let token = ctx
        .tokens
        .issue(user.id)
        .map_err(|e| ApiError::internal("Server error", e))?;
    Ok(AuthResponse {
        token,
        user: PublicUser::from(user),
    })
}

/// Register endpoint.
///
/// - **URL:** `/api/auth/register`
/// - **Method:** `POST`
/// - **Authentication:** None
///
/// # Request Format
///
/// ```json
/// { "email": "user@example.com", "password": "password123" }
/// ```
///
/// # Response
///
/// **Success (HTTP 201 Created):**
/// ```json
/// { "token": "<jwt>", "user": { "id": 1, "email": "user@example.com" } }
/// ```
///
/// **Failure (HTTP 400 Bad Request):** missing fields, malformed email, or
/// an email that is already registered.
#[post("/auth/register", data = "<body>")]
pub async fn register(
    db: DbConn,
    ctx: &State<AppContext>,
    body: Result<Json<Credentials>, JsonError<'_>>,
) -> Result<status::Custom<Json<AuthResponse>>, ApiError> {
    let credentials = body
        .map_err(|_| ApiError::from(ValidationError::MissingCredentials))?
        .into_inner();
    let (email, password) = credentials.for_registration()?;

    let user = register_user(&db, email, password).await?;
    let response = token_response(ctx, &user)?;
    Ok(status::Custom(Status::Created, Json(response)))
}

/// Login endpoint.
///
/// - **URL:** `/api/auth/login`
/// - **Method:** `POST`
/// - **Authentication:** None
///
/// Returns the same body as register with HTTP 200. Any failure is
/// HTTP 400 with `{"message": "Invalid email or password"}`.
#[post("/auth/login", data = "<body>")]
pub async fn login(
    db: DbConn,
    ctx: &State<AppContext>,
    body: Result<Json<Credentials>, JsonError<'_>>,
) -> Result<Json<AuthResponse>, ApiError> {
    let invalid = || ApiError::BadRequest(INVALID_LOGIN.to_string());
    let (email, password) = body
        .map_err(|_| invalid())?
        .into_inner()
        .into_parts()
        .ok_or_else(invalid)?;

    let user = authenticate(&db, email, password).await?;
    info!("User {} logged in", user.id);
    Ok(Json(token_response(ctx, &user)?))
}

/// Current user endpoint.
///
/// - **URL:** `/api/auth/me`
/// - **Method:** `GET`
/// - **Authentication:** Bearer token
///
/// ```json
/// { "id": 1, "email": "user@example.com", "createdAt": "2025-01-01T00:00:00" }
/// ```
#[get("/auth/me")]
pub fn me(auth: AuthenticatedUser) -> Json<UserProfile> {
    Json(UserProfile::from(&auth.user))
}

pub fn routes() -> Vec<Route> {
    routes![register, login, me]
}

//! API endpoints for wellness sessions.
//!
//! # Authorization Rules
//! - Anyone can list published sessions and read a published session
//! - Drafts are only readable by their owner
//! - Only the owner can update a session; ownership never changes

use chrono::Utc;
use rocket::Route;
use rocket::response::status;
use rocket::serde::json::{Error as JsonError, Json};

use crate::error::ApiError;
use crate::logged_json::LoggedJson;
use crate::models::{Session, SessionInput, SessionStatus, SessionUpdate, SessionWithOwner};
use crate::orm::DbConn;
use crate::orm::session::{
    get_session, get_session_with_owner, insert_session, list_by_owner, list_published,
    update_session,
};
use crate::session_guards::{AuthenticatedUser, OptionalUser};

fn not_found() -> ApiError {
    ApiError::NotFound("Session not found".to_string())
}

fn malformed_body(e: JsonError<'_>) -> ApiError {
    ApiError::BadRequest(format!("Invalid request body: {}", e))
}

/// List Published Sessions endpoint.
///
/// - **URL:** `/api/session`
/// - **Method:** `GET`
/// - **Authentication:** None
///
/// Returns every published session, oldest first, with the owner's id and
/// email under `user`. Drafts are never included.
#[get("/session")]
pub async fn list_published_sessions(
    db: DbConn,
) -> Result<Json<Vec<SessionWithOwner>>, ApiError> {
    let sessions = db.run(list_published).await?;
    Ok(Json(sessions))
}

/// My Sessions endpoint.
///
/// - **URL:** `/api/session/my-sessions`
/// - **Method:** `GET`
/// - **Authentication:** Bearer token
///
/// Returns all of the caller's sessions, drafts included, most recently
/// updated first.
#[get("/session/my-sessions")]
pub async fn my_sessions(
    db: DbConn,
    auth: AuthenticatedUser,
) -> Result<Json<Vec<Session>>, ApiError> {
    let owner_id = auth.id();
    let sessions = db.run(move |conn| list_by_owner(conn, owner_id)).await?;
    Ok(Json(sessions))
}

/// Get Session endpoint.
///
/// - **URL:** `/api/session/<id>`
/// - **Method:** `GET`
/// - **Authentication:** Optional bearer token
///
/// # Response
/// - **200:** the session with owner annotation
/// - **401:** an `Authorization` header was sent but is not valid
/// - **403:** the session is a draft and the caller is not its owner
/// - **404:** no such session (non-numeric ids included)
#[get("/session/<id>")]
pub async fn get_one_session(
    db: DbConn,
    caller: OptionalUser,
    id: Result<i32, &str>,
) -> Result<Json<SessionWithOwner>, ApiError> {
    let id = id.map_err(|_| not_found())?;
    let session = db
        .run(move |conn| get_session_with_owner(conn, id))
        .await?
        .ok_or_else(not_found)?;

    if session.status == SessionStatus::Draft && caller.id() != Some(session.user.id) {
        return Err(ApiError::Forbidden("Unauthorized access to draft".to_string()));
    }

    Ok(Json(session))
}

/// Create Session endpoint.
///
/// - **URL:** `/api/session`
/// - **Method:** `POST`
/// - **Authentication:** Bearer token
///
/// # Request Format
///
/// ```json
/// {
///   "title": "Morning Meditation",
///   "tags": ["meditation", "morning"],
///   "jsonUrl": "https://example.com/json1",
///   "status": "draft"
/// }
/// ```
///
/// `tags` may also be a single comma-separated string. Returns HTTP 201 with
/// the stored session and a `Location` header.
#[post("/session", data = "<body>")]
pub async fn create_session(
    db: DbConn,
    auth: AuthenticatedUser,
    body: Result<LoggedJson<SessionInput>, JsonError<'_>>,
) -> Result<status::Created<Json<Session>>, ApiError> {
    let input = body.map_err(malformed_body)?.into_inner();
    let new_session = input.into_new_session(auth.id(), Utc::now().naive_utc())?;

    let session = db.run(move |conn| insert_session(conn, new_session)).await?;
    info!("User {} created session {}", auth.id(), session.id);

    let location = format!("/api/session/{}", session.id);
    Ok(status::Created::new(location).body(Json(session)))
}

/// Update Session endpoint.
///
/// - **URL:** `/api/session/<id>`
/// - **Method:** `PUT`
/// - **Authentication:** Bearer token (owner only)
///
/// Every field of the create payload is optional here; omitted fields keep
/// their value and `updatedAt` is refreshed. The owner cannot be changed.
///
/// # Response
/// - **200:** the updated session
/// - **400:** malformed body, no updatable field, blank field or bad status
/// - **403:** the caller does not own the session (nothing is written)
/// - **404:** no such session
#[put("/session/<id>", data = "<body>")]
pub async fn update_one_session(
    db: DbConn,
    auth: AuthenticatedUser,
    id: Result<i32, &str>,
    body: Result<LoggedJson<SessionUpdate>, JsonError<'_>>,
) -> Result<Json<Session>, ApiError> {
    let changes = body
        .map_err(malformed_body)?
        .into_inner()
        .into_changeset(Utc::now().naive_utc())?;
    let id = id.map_err(|_| not_found())?;

    let existing = db
        .run(move |conn| get_session(conn, id))
        .await?
        .ok_or_else(not_found)?;
    if !existing.is_owned_by(auth.id()) {
        warn!(
            "User {} tried to update session {} owned by {}",
            auth.id(),
            id,
            existing.user_id
        );
        return Err(ApiError::Forbidden(
            "Not authorized to update this session".to_string(),
        ));
    }

    let session = db.run(move |conn| update_session(conn, id, changes)).await?;
    Ok(Json(session))
}

pub fn routes() -> Vec<Route> {
    routes![
        list_published_sessions,
        my_sessions,
        get_one_session,
        create_session,
        update_one_session
    ]
}

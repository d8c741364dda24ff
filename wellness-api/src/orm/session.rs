use diesel::prelude::*;

use crate::models::{NewSession, Session, SessionChangeset, SessionStatus, SessionWithOwner};
use crate::orm::user::last_insert_rowid;
use crate::schema::{sessions, users};

/// Inserts a session and returns the stored row.
pub fn insert_session(
    conn: &mut SqliteConnection,
    new_session: NewSession,
) -> Result<Session, diesel::result::Error> {
    diesel::insert_into(sessions::table)
        .values(&new_session)
        .execute(conn)?;

    let last_id = last_insert_rowid(conn)?;
    sessions::table
        .filter(sessions::id.eq(last_id))
        .select(Session::as_select())
        .first(conn)
}

pub fn get_session(
    conn: &mut SqliteConnection,
    session_id: i32,
) -> Result<Option<Session>, diesel::result::Error> {
    sessions::table
        .filter(sessions::id.eq(session_id))
        .select(Session::as_select())
        .first(conn)
        .optional()
}

/// A single session with its owner's email, regardless of status.
pub fn get_session_with_owner(
    conn: &mut SqliteConnection,
    session_id: i32,
) -> Result<Option<SessionWithOwner>, diesel::result::Error> {
    let row = sessions::table
        .inner_join(users::table)
        .filter(sessions::id.eq(session_id))
        .select((Session::as_select(), users::email))
        .first::<(Session, String)>(conn)
        .optional()?;
    Ok(row.map(SessionWithOwner::from))
}

/// All published sessions, oldest first, each with its owner's email.
pub fn list_published(
    conn: &mut SqliteConnection,
) -> Result<Vec<SessionWithOwner>, diesel::result::Error> {
    let rows = sessions::table
        .inner_join(users::table)
        .filter(sessions::status.eq(SessionStatus::Published))
        .order(sessions::id.asc())
        .select((Session::as_select(), users::email))
        .load::<(Session, String)>(conn)?;
    Ok(rows.into_iter().map(SessionWithOwner::from).collect())
}

/// Every session owned by `owner_id`, drafts included, most recently
/// updated first.
pub fn list_by_owner(
    conn: &mut SqliteConnection,
    owner_id: i32,
) -> Result<Vec<Session>, diesel::result::Error> {
    sessions::table
        .filter(sessions::user_id.eq(owner_id))
        .order((sessions::updated_at.desc(), sessions::id.desc()))
        .select(Session::as_select())
        .load(conn)
}

/// Applies a changeset and returns the updated row. Ownership is checked by
/// the caller.
pub fn update_session(
    conn: &mut SqliteConnection,
    session_id: i32,
    changes: SessionChangeset,
) -> Result<Session, diesel::result::Error> {
    diesel::update(sessions::table.filter(sessions::id.eq(session_id)))
        .set(&changes)
        .execute(conn)?;

    sessions::table
        .filter(sessions::id.eq(session_id))
        .select(Session::as_select())
        .first(conn)
}

pub fn delete_all_sessions(conn: &mut SqliteConnection) -> Result<usize, diesel::result::Error> {
    diesel::delete(sessions::table).execute(conn)
}

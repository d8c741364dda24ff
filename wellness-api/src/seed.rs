//! Demo data for local development: two users and a dozen sessions.
//!
//! `wellness-api seed` wipes both tables first, so it refuses to touch a
//! production database unless `--yes` is given.

use argon2::password_hash;
use chrono::Utc;
use diesel::prelude::*;
use rocket::figment::Figment;

use crate::config::{AppConfig, ConfigError};
use crate::models::SessionStatus::{self, Draft, Published};
use crate::models::{NewSession, Tags, UserInput};
use crate::orm::login::hash_password;
use crate::orm::session::{delete_all_sessions, insert_session};
use crate::orm::user::{delete_all_users, insert_user};
use crate::orm::{run_pending_migrations, set_foreign_keys};

pub const SEED_PASSWORD: &str = "password123";
pub const SEED_USERS: [&str; 2] = ["user1@example.com", "user2@example.com"];

struct SeedSession {
    title: &'static str,
    tags: &'static [&'static str],
    json_url: &'static str,
    status: SessionStatus,
    /// Index into [`SEED_USERS`].
    owner: usize,
}

const fn seed(
    title: &'static str,
    tags: &'static [&'static str],
    json_url: &'static str,
    status: SessionStatus,
    owner: usize,
) -> SeedSession {
    SeedSession {
        title,
        tags,
        json_url,
        status,
        owner,
    }
}

const SEED_SESSIONS: [SeedSession; 12] = [
    seed("Morning Meditation", &["meditation", "morning"], "https://example.com/json1", Published, 0),
    seed("Evening Yoga Flow", &["yoga", "evening"], "https://example.com/json2", Published, 1),
    seed("Breathing Practice", &["breathing"], "https://example.com/json3", Published, 0),
    seed("Mindfulness Reset", &["mindfulness", "mental"], "https://example.com/json4", Draft, 0),
    seed("10-min Body Scan", &["scan", "relax"], "https://example.com/json5", Published, 1),
    seed("Sun Salutation A", &["yoga", "beginner"], "https://example.com/json6", Published, 1),
    seed("Sleep Prep Meditation", &["sleep", "calm"], "https://example.com/json7", Draft, 0),
    seed("Lunchtime Reset", &["quick", "relax"], "https://example.com/json8", Published, 1),
    seed("Walking Meditation", &["meditation", "movement"], "https://example.com/json9", Published, 0),
    seed("Energy Boost Flow", &["yoga", "energize"], "https://example.com/json10", Draft, 1),
    seed("5-Minute Calm", &["quick", "calm"], "https://example.com/json11", Published, 0),
    seed("Stretch & Breathe", &["stretching", "breathwork"], "https://example.com/json12", Published, 1),
];

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("refusing to wipe a production database without --yes")]
    NotConfirmed,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("no database url configured: {0}")]
    DatabaseUrl(#[from] rocket::figment::Error),
    #[error("failed to connect to the database: {0}")]
    Connection(#[from] diesel::ConnectionError),
    #[error("failed to run migrations: {0}")]
    Migration(Box<dyn std::error::Error + Send + Sync>),
    #[error("failed to hash the seed password: {0}")]
    Hash(password_hash::Error),
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub published: usize,
    pub drafts: usize,
}

/// Replaces the contents of both tables with the demo data set.
pub fn seed_database(conn: &mut SqliteConnection) -> Result<SeedSummary, SeedError> {
    let password_hash = hash_password(SEED_PASSWORD).map_err(SeedError::Hash)?;

    conn.transaction::<_, SeedError, _>(|conn| {
        let removed_sessions = delete_all_sessions(conn)?;
        let removed_users = delete_all_users(conn)?;
        info!(
            "Cleared {} sessions and {} users",
            removed_sessions, removed_users
        );

        let mut owners = Vec::with_capacity(SEED_USERS.len());
        for email in SEED_USERS {
            let user = insert_user(
                conn,
                UserInput {
                    email: email.to_string(),
                    password_hash: password_hash.clone(),
                },
            )?;
            owners.push(user.id);
        }

        let mut summary = SeedSummary {
            users: owners.len(),
            ..Default::default()
        };
        for entry in &SEED_SESSIONS {
            let now = Utc::now().naive_utc();
            insert_session(
                conn,
                NewSession {
                    title: entry.title.to_string(),
                    tags: Tags::normalized(entry.tags.iter()),
                    json_url: entry.json_url.to_string(),
                    status: entry.status,
                    user_id: owners[entry.owner],
                    created_at: now,
                    updated_at: now,
                },
            )?;
            match entry.status {
                Published => summary.published += 1,
                Draft => summary.drafts += 1,
            }
        }
        Ok(summary)
    })
}

/// Connects to the configured database, migrates it and seeds it.
pub fn run_seed(figment: &Figment, confirmed: bool) -> Result<SeedSummary, SeedError> {
    let config = AppConfig::from_figment(figment)?;
    if config.is_production() && !confirmed {
        return Err(SeedError::NotConfirmed);
    }

    let url: String = figment.extract_inner("databases.sqlite_db.url")?;
    info!("Seeding database at {}", url);
    let mut conn = SqliteConnection::establish(&url)?;
    set_foreign_keys(&mut conn)?;
    run_pending_migrations(&mut conn).map_err(SeedError::Migration)?;

    seed_database(&mut conn)
}

use std::sync::Mutex;

use diesel::connection::SimpleConnection;
use diesel::sqlite::SqliteConnection;
use rocket::figment::{
    Figment,
    util::map,
    value::{Map, Value},
};
use rocket::{Build, Rocket, fairing::AdHoc};
use rocket_sync_db_pools::diesel;

use super::db::{DbConn, run_pending_migrations, set_foreign_keys};

/// Signing secret of every Rocket built by [`test_rocket`].
pub const TEST_JWT_SECRET: &str = "test-secret";

/// Configures SQLite with performance-optimized settings for testing.
///
/// Sets the following PRAGMAs:
/// - `synchronous = OFF`: Disables synchronous writes for faster performance
/// - `journal_mode = OFF`: Disables rollback journal
///
/// These settings make SQLite faster but less durable - only use for testing.
fn set_sqlite_test_pragmas(conn: &mut diesel::SqliteConnection) -> diesel::QueryResult<()> {
    conn.batch_execute(
        r#"
        PRAGMA synchronous = OFF;
        PRAGMA journal_mode = OFF;
        "#,
    )
}

fn set_sqlite_test_pragmas_fairing() -> AdHoc {
    AdHoc::on_ignite("Set SQLite Test Pragmas", |rocket| async {
        let conn = DbConn::get_one(&rocket)
            .await
            .expect("database connection for test pragmas");
        conn.run(set_sqlite_test_pragmas)
            .await
            .expect("Failed to set SQLite PRAGMAs");
        rocket
    })
}

/// Figment for a test server: a unique shared in-memory database plus a
/// fixed signing secret.
pub fn test_figment() -> Figment {
    use uuid::Uuid;

    // Unique name so parallel tests never share data
    let unique_db_name = format!("file:test_db_{}?mode=memory&cache=shared", Uuid::new_v4());

    let db_config: Map<_, Value> = map! {
        "url" => unique_db_name.into(),
        "pool_size" => 5.into(),
        "timeout" => 5.into(),
    };

    rocket::Config::figment()
        .merge(("databases", map!["sqlite_db" => db_config]))
        .merge(("environment", "test"))
        .merge(("jwt_secret", TEST_JWT_SECRET))
        .merge(("cors_origin", "*"))
        .merge(("token_ttl_days", 7))
}

/// Creates a Rocket instance for integration tests.
///
/// The returned instance has an in-memory SQLite database, foreign keys
/// enabled, testing pragmas set, all migrations run and every API route
/// mounted.
pub fn test_rocket() -> Rocket<Build> {
    test_rocket_with(test_figment())
}

/// Like [`test_rocket`], for a figment derived from [`test_figment`].
pub fn test_rocket_with(figment: Figment) -> Rocket<Build> {
    crate::build_rocket(figment)
        .expect("test configuration is valid")
        .attach(set_sqlite_test_pragmas_fairing())
}

/// Creates a synchronous in-memory SQLite database connection for unit tests,
/// with migrations applied and foreign keys on. Each call returns a new,
/// independent database.
pub fn setup_test_db() -> SqliteConnection {
    use diesel::Connection;

    let mut conn = SqliteConnection::establish(":memory:")
        .expect("Failed to create in-memory SQLite database");
    set_foreign_keys(&mut conn).expect("Failed to enable foreign keys");
    run_pending_migrations(&mut conn).expect("Failed to run pending migrations");
    conn
}

/// Async-style wrapper around a test connection, for code written against
/// [`crate::orm::login::DbRunner`].
pub struct FakeDbConn<'a>(Mutex<&'a mut diesel::SqliteConnection>);

impl<'a> FakeDbConn<'a> {
    /// Runs the closure on the wrapped connection, mimicking the pool's
    /// `.run()` interface.
    pub async fn run<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut diesel::SqliteConnection) -> R + Send + 'static,
        R: Send + 'static,
    {
        let mut conn = self.0.lock().expect("test connection lock poisoned");
        f(&mut **conn)
    }
}

pub fn setup_test_dbconn(conn: &mut diesel::SqliteConnection) -> FakeDbConn<'_> {
    FakeDbConn(Mutex::new(conn))
}

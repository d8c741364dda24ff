#[macro_use]
extern crate rocket;

use rocket::figment::Figment;
use rocket::figment::value::Map;
use rocket::request::Request;
use rocket::serde::json::{Json, Value, json};
use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod error;
pub mod logged_json;
pub mod models;
pub mod orm;
pub use orm::DbConn;
pub mod schema;
pub mod seed;
pub mod session_guards;
pub mod token;

#[cfg(test)]
pub mod generate_types;

use config::{AppConfig, AppContext, ConfigError};
use session_guards::AuthFailure;

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

fn error_body(message: &str, req: &Request, status: u16) -> Json<Value> {
    Json(json!({
        "message": message,
        "path": req.uri().path().to_string(),
        "status": status
    }))
}

#[catch(400)]
fn bad_request(req: &Request) -> Json<Value> {
    error_body("Bad Request", req, 400)
}

#[catch(401)]
fn unauthorized(req: &Request) -> Json<Value> {
    let message = req
        .local_cache(|| None::<AuthFailure>)
        .as_ref()
        .map(AuthFailure::message)
        .unwrap_or("Unauthorized");
    error_body(message, req, 401)
}

#[catch(403)]
fn forbidden(req: &Request) -> Json<Value> {
    error_body("Forbidden", req, 403)
}

#[catch(404)]
fn not_found(req: &Request) -> Json<Value> {
    error_body("Not Found", req, 404)
}

#[catch(422)]
fn unprocessable_entity(req: &Request) -> Json<Value> {
    error_body("Unprocessable Entity", req, 422)
}

#[catch(500)]
fn internal_server_error(req: &Request) -> Json<Value> {
    error_body("Server error", req, 500)
}

#[catch(default)]
fn default_catcher(status: rocket::http::Status, req: &Request) -> Json<Value> {
    error_body(status.reason().unwrap_or("Unknown Error"), req, status.code)
}

pub fn mount_api_routes(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket.mount("/api", api::routes())
}

fn log_rocket_info(rocket: &Rocket<Build>, config: &AppConfig) {
    let figment = rocket.figment();

    if let Ok(address) = figment.extract_inner::<String>("address") {
        info!("Rocket is running at: {}", address);
    }

    if let Ok(port) = figment.extract_inner::<u16>("port") {
        info!("Rocket is listening on port: {}", port);
    }

    match figment.extract_inner::<Map<String, Value>>("databases.sqlite_db") {
        Ok(db_config) => {
            if let Some(Value::String(url)) = db_config.get("url") {
                info!("Database URL: {}", url);
            } else {
                warn!("Database URL not found in configuration");
            }
        }
        Err(e) => {
            warn!("Failed to extract database configuration: {}", e);
        }
    }

    info!("Environment: {}", config.environment);
    info!("CORS origin: {}", config.cors_origin);
}

/// Builds the server from a figment: database pool, migrations, CORS,
/// managed [`AppContext`], JSON catchers and the `/api` routes.
///
/// Tests call this with an in-memory database (see `orm::testing`).
pub fn build_rocket(figment: Figment) -> Result<Rocket<Build>, ConfigError> {
    let config = AppConfig::from_figment(&figment)?;
    let cors = config.cors()?;
    let context = AppContext::new(config.clone())?;

    let rocket = rocket::custom(figment)
        .attach(DbConn::fairing())
        .attach(orm::set_foreign_keys_fairing())
        .attach(orm::run_migrations_fairing())
        .attach(cors)
        .manage(context)
        .register(
            "/",
            catchers![
                bad_request,
                unauthorized,
                forbidden,
                not_found,
                unprocessable_entity,
                internal_server_error,
                default_catcher
            ],
        );

    log_rocket_info(&rocket, &config);

    Ok(mount_api_routes(rocket))
}

/// The production server, configured from `Rocket.toml` and the environment.
pub fn rocket() -> Result<Rocket<Build>, ConfigError> {
    build_rocket(config::figment())
}

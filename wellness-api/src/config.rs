//! Application configuration.
//!
//! Values come from Rocket's figment: built-in defaults, then `Rocket.toml`,
//! then `ROCKET_*` variables, then the plain variables the deployment sets
//! (`PORT`, `APP_ENV`, `JWT_SECRET`, `CORS_ORIGIN`, `TOKEN_TTL_DAYS` and
//! `DATABASE_URL`).

use std::time::Instant;

use rocket::figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use rocket::http::Method;
use rocket_cors::{AllowedHeaders, AllowedOrigins, Cors, CorsOptions};
use serde::Deserialize;
use thiserror::Error;

use crate::token::TokenKeys;

/// Secret used to sign tokens when none is configured outside production.
pub const DEV_SECRET: &str = "devsecret";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set when APP_ENV is production")]
    MissingSecret,
    #[error("TOKEN_TTL_DAYS must be positive, got {0}")]
    InvalidTokenTtl(i64),
    #[error("invalid configuration: {0}")]
    Figment(#[from] rocket::figment::Error),
    #[error("invalid CORS configuration: {0}")]
    Cors(#[from] rocket_cors::Error),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// `production` switches off error details and the fallback secret.
    pub environment: String,
    pub jwt_secret: Option<String>,
    /// `*` allows any origin.
    pub cors_origin: String,
    pub token_ttl_days: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            environment: "development".to_string(),
            jwt_secret: None,
            cors_origin: "*".to_string(),
            token_ttl_days: 7,
        }
    }
}

impl AppConfig {
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let config: AppConfig = figment.extract()?;
        if config.token_ttl_days <= 0 {
            return Err(ConfigError::InvalidTokenTtl(config.token_ttl_days));
        }
        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn signing_secret(&self) -> Result<String, ConfigError> {
        match self.jwt_secret.as_deref().map(str::trim) {
            Some(secret) if !secret.is_empty() => Ok(secret.to_string()),
            _ if self.is_production() => Err(ConfigError::MissingSecret),
            _ => {
                warn!("JWT_SECRET is not set, signing tokens with the development secret");
                Ok(DEV_SECRET.to_string())
            }
        }
    }

    pub fn cors(&self) -> Result<Cors, ConfigError> {
        let origin = self.cors_origin.trim();
        let any_origin = origin == "*";
        let allowed_origins = if any_origin {
            AllowedOrigins::all()
        } else {
            AllowedOrigins::some_exact(&[origin])
        };

        let cors = CorsOptions {
            allowed_origins,
            allowed_methods: [Method::Get, Method::Post, Method::Put, Method::Options]
                .into_iter()
                .map(From::from)
                .collect(),
            allowed_headers: AllowedHeaders::some(&["Authorization", "Content-Type", "Accept"]),
            // Tokens travel in the Authorization header, never in cookies
            allow_credentials: false,
            send_wildcard: any_origin,
            ..Default::default()
        }
        .to_cors()?;
        Ok(cors)
    }
}

/// Process-wide immutable state handed to handlers through `&State<AppContext>`.
#[derive(Debug)]
pub struct AppContext {
    pub config: AppConfig,
    pub tokens: TokenKeys,
    pub started_at: Instant,
}

impl AppContext {
    pub fn new(config: AppConfig) -> Result<Self, ConfigError> {
        let secret = config.signing_secret()?;
        let tokens = TokenKeys::new(&secret, chrono::Duration::days(config.token_ttl_days));
        Ok(AppContext {
            config,
            tokens,
            started_at: Instant::now(),
        })
    }

    pub fn uptime_secs(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}

/// Builds the figment the server runs with.
pub fn figment() -> Figment {
    let mut figment = Figment::from(rocket::Config::default())
        .merge(Toml::file("Rocket.toml").nested())
        .merge(Env::prefixed("ROCKET_").global())
        .merge(Env::raw().only(&["port", "jwt_secret", "cors_origin", "token_ttl_days"]))
        .merge(Env::raw().only(&["app_env"]).map(|_| "environment".into()));

    if let Ok(database_url) = std::env::var("DATABASE_URL") {
        figment = figment.merge(("databases.sqlite_db.url", database_url));
    }

    figment
}

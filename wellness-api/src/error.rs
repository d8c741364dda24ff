//! Error taxonomy for the API and its mapping onto HTTP responses.
//!
//! Handlers return `Result<_, ApiError>`. Every error renders as a JSON body
//! `{"message": "..."}`; internal failures also carry an `"error"` detail
//! unless the server runs in the production environment.

use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{self, Responder, status::Custom};
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::config::AppContext;

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub error: Option<String>,
}

/// Input that failed validation. Always rendered as 400.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Email and password are required")]
    MissingCredentials,
    #[error("A valid email address is required")]
    InvalidEmail,
    #[error("Please include a title, tags (e.g. \"yoga, evening\") and jsonUrl to create a session.")]
    MissingSessionFields,
    #[error("Status should be either 'draft' or 'published'.")]
    InvalidStatus,
    #[error("Provide at least one of title, tags, jsonUrl or status to update.")]
    EmptyUpdate,
    #[error("{0} must not be blank")]
    BlankField(&'static str),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{message}")]
    Internal {
        message: String,
        detail: Option<String>,
    },
}

impl ApiError {
    pub fn internal(message: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        ApiError::Internal {
            message: message.into(),
            detail: Some(detail.to_string()),
        }
    }

    pub fn status(&self) -> Status {
        match self {
            ApiError::BadRequest(_) => Status::BadRequest,
            ApiError::Unauthorized(_) => Status::Unauthorized,
            ApiError::Forbidden(_) => Status::Forbidden,
            ApiError::NotFound(_) => Status::NotFound,
            ApiError::Internal { .. } => Status::InternalServerError,
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<diesel::result::Error> for ApiError {
    fn from(err: diesel::result::Error) -> Self {
        ApiError::internal("Server error", err)
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        let expose_detail = req
            .rocket()
            .state::<AppContext>()
            .map(|ctx| !ctx.config.is_production())
            .unwrap_or(false);

        let body = match self {
            ApiError::Internal { message, detail } => {
                error!(
                    "{} {} failed: {} ({})",
                    req.method(),
                    req.uri().path(),
                    message,
                    detail.as_deref().unwrap_or("no detail")
                );
                ErrorResponse {
                    message,
                    error: detail.filter(|_| expose_detail),
                }
            }
            other => ErrorResponse {
                message: other.to_string(),
                error: None,
            },
        };

        Custom(status, Json(body)).respond_to(req)
    }
}

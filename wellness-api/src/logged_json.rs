//! JSON data guard that logs the parsed body.
//!
//! Used for session writes so their payloads show up in the server log.
//! Credential bodies go through plain `Json` and are never logged.

use rocket::serde::json::Json;
use rocket::serde::{Deserialize, Serialize};
use rocket::{
    Data, Request,
    data::{self, FromData},
};

/// Drop-in replacement for `Json<T>` that logs the body at `info` level.
pub struct LoggedJson<T>(pub T);

impl<T> LoggedJson<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::ops::Deref for LoggedJson<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r, T: Deserialize<'r> + Serialize> FromData<'r> for LoggedJson<T> {
    type Error = rocket::serde::json::Error<'r>;

    async fn from_data(req: &'r Request<'_>, data: Data<'r>) -> data::Outcome<'r, Self> {
        match Json::<T>::from_data(req, data).await {
            data::Outcome::Success(json_data) => {
                let body = serde_json::to_string(&json_data.0)
                    .unwrap_or_else(|_| "<failed to serialize>".to_string());
                info!("{} {} body: {}", req.method(), req.uri().path(), body);
                data::Outcome::Success(LoggedJson(json_data.into_inner()))
            }
            data::Outcome::Error((status, e)) => {
                warn!("{} {} rejected body: {}", req.method(), req.uri().path(), e);
                data::Outcome::Error((status, e))
            }
            data::Outcome::Forward(f) => data::Outcome::Forward(f),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for LoggedJson<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

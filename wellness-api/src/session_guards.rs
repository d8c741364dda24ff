//! Bearer-token request guards.
//!
//! ```rust,ignore
//! #[get("/me")]
//! fn me(auth: AuthenticatedUser) -> Json<UserProfile> {
//!     Json(UserProfile::from(&auth.user))
//! }
//! ```
//!
//! [`AuthenticatedUser`] rejects the request with 401 unless the
//! `Authorization: Bearer <token>` header carries a valid, unexpired token
//! for a user that still exists. [`OptionalUser`] lets anonymous requests
//! through but still rejects a header that is present and invalid.

use rocket::http::Status;
use rocket::outcome::Outcome;
use rocket::request::{self, FromRequest, Request};

use crate::DbConn;
use crate::config::AppContext;
use crate::models::User;
use crate::orm::user::get_user;
use crate::token::Claims;

/// Why a request failed authentication. The 401 catcher reads it back from
/// the request-local cache to pick the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    MissingToken,
    InvalidToken,
    Unavailable,
}

impl AuthFailure {
    pub fn message(&self) -> &'static str {
        match self {
            AuthFailure::MissingToken => "Missing or invalid token",
            AuthFailure::InvalidToken => "Invalid token",
            AuthFailure::Unavailable => "Server error",
        }
    }

    fn status(&self) -> Status {
        match self {
            AuthFailure::Unavailable => Status::InternalServerError,
            _ => Status::Unauthorized,
        }
    }

    fn reject<T>(self, request: &Request<'_>) -> request::Outcome<T, AuthFailure> {
        request.local_cache(|| Some(self));
        Outcome::Error((self.status(), self))
    }
}

/// The caller, resolved from a bearer token.
#[derive(Debug)]
pub struct AuthenticatedUser {
    pub user: User,
    pub claims: Claims,
}

impl AuthenticatedUser {
    pub fn id(&self) -> i32 {
        self.user.id
    }
}

fn bearer_token<'a>(request: &'a Request<'_>) -> Option<&'a str> {
    request
        .headers()
        .get_one("Authorization")
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedUser {
    type Error = AuthFailure;

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let Some(token) = bearer_token(request) else {
            return AuthFailure::MissingToken.reject(request);
        };

        let Some(ctx) = request.rocket().state::<AppContext>() else {
            error!("AppContext is not managed; cannot verify tokens");
            return AuthFailure::Unavailable.reject(request);
        };

        let claims = match ctx.tokens.verify(token) {
            Ok(claims) => claims,
            Err(e) => {
                info!("Rejected bearer token: {}", e);
                return AuthFailure::InvalidToken.reject(request);
            }
        };

        let db = match request.guard::<DbConn>().await {
            Outcome::Success(db) => db,
            _ => return AuthFailure::Unavailable.reject(request),
        };

        let user_id = claims.id;
        match db.run(move |conn| get_user(conn, user_id)).await {
            Ok(Some(user)) => Outcome::Success(AuthenticatedUser { user, claims }),
            Ok(None) => AuthFailure::InvalidToken.reject(request),
            Err(e) => {
                error!("Database error finding user: {:?}", e);
                AuthFailure::Unavailable.reject(request)
            }
        }
    }
}

/// The caller if an `Authorization` header was sent, `None` for anonymous
/// requests.
#[derive(Debug)]
pub struct OptionalUser(pub Option<AuthenticatedUser>);

impl OptionalUser {
    pub fn id(&self) -> Option<i32> {
        self.0.as_ref().map(AuthenticatedUser::id)
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for OptionalUser {
    type Error = AuthFailure;

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        if request.headers().get_one("Authorization").is_none() {
            return Outcome::Success(OptionalUser(None));
        }
        AuthenticatedUser::from_request(request)
            .await
            .map(|user| OptionalUser(Some(user)))
    }
}

pub mod auth;
pub mod health;
pub mod session;

use rocket::Route;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(health::routes());
    routes.extend(session::routes());
    routes
}

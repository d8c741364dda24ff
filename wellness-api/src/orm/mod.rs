mod db;
pub mod login;
pub mod session;
#[cfg(any(test, feature = "test-staging"))]
pub mod testing;
pub mod user;

pub use db::*;

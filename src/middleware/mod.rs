pub mod auth;

pub use auth::{DEMO_COOKIE, OptionalSession, bearer_token, demo_cookie};

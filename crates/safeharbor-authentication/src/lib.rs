//! SafeHarbor Authentication
//!
//! Establishes who is calling. Credentials are checked once at login; the
//! resulting session id is then presented on every request and must pass
//! both the liveness and the integrity gate of the [`SessionManager`].
//!
//! Authentication never decides what a caller may do. That is the
//! authorization crate's job, fed with the user id resolved here.

#![forbid(unsafe_code)]

pub mod config;
pub mod cookie;
pub mod email;
pub mod password;
pub mod session;
pub mod throttle;
pub mod token;

pub use config::SessionConfig;
pub use cookie::SessionCookie;
pub use email::{EmailSender, EmailVerifier};
pub use password::PasswordHasher;
pub use session::SessionManager;
pub use throttle::LoginThrottle;
pub use token::{Credentials, SessionToken};

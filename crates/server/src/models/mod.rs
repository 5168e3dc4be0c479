//! Server-side models.

pub mod session;
pub mod user;

pub use session::CurrentUser;
pub use user::{NewUser, User, UserUpdate};

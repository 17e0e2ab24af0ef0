//! Credentials and the authorization gate.
//!
//! - `password` - bcrypt hashing, run off the async executor
//! - `token`    - HMAC-SHA256 signed claims in compact JWT form
//! - `gate`     - bearer authentication and role enforcement

mod gate;
mod password;
mod token;

pub use gate::{bearer_token, require_roles, Authenticator};
pub use password::{PasswordError, PasswordHasher};
pub use token::{Claims, TokenError, TokenIssuer};

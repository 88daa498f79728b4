//! Password hashing, bearer tokens and identity extraction.
//!
//! Flow Overview: `register` hashes the password with bcrypt, `login` verifies
//! it and issues an HS256 token whose `sub` is the user id, and every protected
//! handler calls [`require_auth`] to turn the `Authorization` header back into a
//! [`Principal`].

mod password;
mod principal;
mod state;
mod token;
mod utils;

pub use self::password::{hash_password, verify_password};
pub use self::principal::{require_auth, Principal};
pub use self::state::{AuthConfig, AuthState};
pub use self::token::{Claims, TokenKeys};
pub use self::utils::{normalize_email, valid_email, MIN_PASSWORD_LENGTH};

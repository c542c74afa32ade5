//! Authentication primitives: password hashing/policy and JWT bearer tokens.

mod password;
mod token;

pub use password::{hash_password, validate_password_strength, verify_password, MIN_PASSWORD_LEN};
pub use token::{AuthError, Claims, JwtKeys, TokenResponse};

//! Token and password primitives used by the auth endpoints and the extractor.

pub mod jwt;
pub mod password;

pub use jwt::{issue_token, validate_token, Claims};

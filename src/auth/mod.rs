//! Authentication: JWT access tokens.

mod jwt;

pub use jwt::{Claims, JwtSecret};

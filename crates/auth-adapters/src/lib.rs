//! # auth-adapters
//!
//! `SessionVerifier` implementations. Accounts and sign-in live in an
//! external system; this crate only checks the tokens it hands out.

#[cfg(feature = "auth-jwt")]
pub mod jwt;

#[cfg(feature = "auth-jwt")]
pub use jwt::{Claims, JwtSessionVerifier, TokenError};

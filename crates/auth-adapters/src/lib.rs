//! # auth-adapters
//!
//! Credential primitives behind the auth ports:
//! - `Argon2PasswordHasher`: salted Argon2id password hashes (PHC strings)
//! - `CookieSigner`: HMAC-SHA256 signatures binding session ids to cookies

pub mod argon;
pub mod cookie;

pub use argon::Argon2PasswordHasher;
pub use cookie::CookieSigner;

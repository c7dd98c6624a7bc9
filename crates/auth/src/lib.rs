//! `lingora-auth` — token lifecycle, credentials, and roles.
//!
//! This crate is intentionally decoupled from HTTP and storage: the issuer
//! signs and verifies tokens statelessly, and revocation is a *record model*
//! here — the ledger itself is a store capability consulted by callers.

pub mod claims;
pub mod password;
pub mod revocation;
pub mod roles;
pub mod tokens;

pub use claims::{TokenClaims, TokenType};
pub use password::{hash_password, validate_password_complexity, verify_password};
pub use revocation::RevokedToken;
pub use roles::Role;
pub use tokens::{TokenError, TokenIssuer, TokenPair};

//! `lingora-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod content;
pub mod error;
pub mod id;

pub use content::{fingerprint_sha256, masked_preview, MAX_PREVIEW_CHARS};
pub use error::DomainError;
pub use id::{JobId, UserId};

//! Content fingerprinting and PII-masked previews.
//!
//! Imported content is never persisted verbatim: durable storage carries only
//! a SHA-256 fingerprint plus a masked preview capped at [`MAX_PREVIEW_CHARS`].

use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};

/// Upper bound on the persisted preview, in characters.
pub const MAX_PREVIEW_CHARS: usize = 500;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+").unwrap());

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:\+?\d{1,3}[ -]?)?(?:\d{2,4}[ -]?)?\d{3,4}[ -]?\d{4}\b").unwrap()
});

static NATIONAL_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{6}-?\d{7}\b").unwrap());

static ACCOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{2,6}-\d{2,6}-\d{2,6}\b").unwrap());

/// Hex-encoded SHA-256 fingerprint of the raw content.
pub fn fingerprint_sha256(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Produce a PII-scrubbed preview of `content`, truncated to
/// [`MAX_PREVIEW_CHARS`] characters.
///
/// The masking order matters: national-id and account patterns would
/// otherwise be partially consumed by the generic phone pattern.
pub fn masked_preview(content: &str) -> String {
    let masked = EMAIL_RE.replace_all(content, "[EMAIL]");
    let masked = NATIONAL_ID_RE.replace_all(&masked, "[NATIONAL_ID]");
    let masked = ACCOUNT_RE.replace_all(&masked, "[ACCOUNT]");
    let masked = PHONE_RE.replace_all(&masked, "[PHONE]");
    masked.chars().take(MAX_PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_matches_known_vector() {
        // sha256("hello")
        assert_eq!(
            fingerprint_sha256("hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn fingerprint_is_stable_for_equal_content() {
        assert_eq!(fingerprint_sha256("abc"), fingerprint_sha256("abc"));
        assert_ne!(fingerprint_sha256("abc"), fingerprint_sha256("abd"));
    }

    #[test]
    fn emails_are_masked() {
        let preview = masked_preview("contact me at alice@example.com please");
        assert!(!preview.contains("alice@example.com"));
        assert!(preview.contains("[EMAIL]"));
    }

    #[test]
    fn phone_numbers_are_masked() {
        let preview = masked_preview("call +82 10-1234-5678 tonight");
        assert!(!preview.contains("1234-5678"));
        assert!(preview.contains("[PHONE]"));
    }

    #[test]
    fn national_id_like_patterns_are_masked() {
        let preview = masked_preview("rrn 900101-1234567 on file");
        assert!(!preview.contains("900101-1234567"));
        assert!(preview.contains("[NATIONAL_ID]"));
    }

    #[test]
    fn preview_is_truncated() {
        let long = "a".repeat(2 * MAX_PREVIEW_CHARS);
        assert_eq!(masked_preview(&long).chars().count(), MAX_PREVIEW_CHARS);
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(masked_preview("just words"), "just words");
    }
}

//! Password hashing (PBKDF2-HMAC-SHA256) and complexity rules.
//!
//! Stored format: `pbkdf2_sha256$<salt_hex>$<digest_hex>`. The scheme tag is
//! part of the stored value so the algorithm can be migrated later without a
//! flag day.

use pbkdf2::pbkdf2_hmac_array;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use lingora_core::DomainError;

const SCHEME: &str = "pbkdf2_sha256";
const ITERATIONS: u32 = 120_000;
const SALT_BYTES: usize = 16;
const DIGEST_BYTES: usize = 32;

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_BYTES];
    rand::thread_rng().fill_bytes(&mut salt);
    hash_with_salt(password, &salt)
}

fn hash_with_salt(password: &str, salt: &[u8]) -> String {
    let digest =
        pbkdf2_hmac_array::<Sha256, DIGEST_BYTES>(password.as_bytes(), salt, ITERATIONS);
    format!("{SCHEME}${}${}", hex::encode(salt), hex::encode(digest))
}

/// Verify `password` against a stored hash.
///
/// Fails closed: unknown schemes and malformed stored values verify false.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.splitn(3, '$');
    let (Some(scheme), Some(salt_hex), Some(digest_hex)) =
        (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    if scheme != SCHEME {
        return false;
    }
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    let Ok(expected) = hex::decode(digest_hex) else {
        return false;
    };

    let computed =
        pbkdf2_hmac_array::<Sha256, DIGEST_BYTES>(password.as_bytes(), &salt, ITERATIONS);
    computed.ct_eq(expected.as_slice()).into()
}

/// Signup password policy: length plus upper/lower/digit classes.
pub fn validate_password_complexity(password: &str) -> Result<(), DomainError> {
    if password.len() < 8 || password.len() > 128 {
        return Err(DomainError::validation(
            "password must be 8-128 characters",
        ));
    }
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_upper && has_lower && has_digit) {
        return Err(DomainError::validation(
            "password must include upper/lowercase and number",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_round_trip() {
        let stored = hash_password("Correct-Horse1");
        assert!(verify_password("Correct-Horse1", &stored));
        assert!(!verify_password("Correct-Horse2", &stored));
    }

    #[test]
    fn salts_are_unique_per_hash() {
        let a = hash_password("Same-Password1");
        let b = hash_password("Same-Password1");
        assert_ne!(a, b);
        assert!(verify_password("Same-Password1", &a));
        assert!(verify_password("Same-Password1", &b));
    }

    #[test]
    fn malformed_stored_value_fails_closed() {
        assert!(!verify_password("whatever", ""));
        assert!(!verify_password("whatever", "plain$nope"));
        assert!(!verify_password("whatever", "bcrypt$00$00"));
        assert!(!verify_password("whatever", "pbkdf2_sha256$zz$zz"));
    }

    #[test]
    fn complexity_rules() {
        assert!(validate_password_complexity("Abcdefg1").is_ok());
        assert!(validate_password_complexity("short1A").is_err());
        assert!(validate_password_complexity("alllowercase1").is_err());
        assert!(validate_password_complexity("ALLUPPERCASE1").is_err());
        assert!(validate_password_complexity("NoDigitsHere").is_err());
    }
}

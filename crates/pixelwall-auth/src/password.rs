use rand::RngCore;
use sha2::{Digest, Sha256};

/// Hash a password as `salt:digest`. A fresh salt is drawn per call, so
/// hashing the same password twice yields different strings.
pub fn hash_password(password: &str) -> String {
    let mut salt_bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut salt_bytes);
    let salt = hex::encode(salt_bytes);
    let digest = digest_hex(&salt, password);
    format!("{salt}:{digest}")
}

/// Check a password against a stored `salt:digest` string.
/// Malformed stored values verify as false rather than erroring.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, digest)) = stored.split_once(':') else {
        return false;
    };
    digest_hex(salt, password) == digest
}

fn digest_hex(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

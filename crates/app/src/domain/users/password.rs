//! Password digests

use sha2::{Digest, Sha256};

pub(crate) fn hash_password(password: &str) -> String {
    format!("{:x}", Sha256::digest(password.as_bytes()))
}

pub(crate) fn verify_password(password: &str, password_hash: &str) -> bool {
    hash_password(password) == password_hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_lowercase_hex_sha256() {
        assert_eq!(
            hash_password("1234"),
            "03ac674216f3e15c761ee1a5e255f067953623c8b388b4459e13f978d7c846f4"
        );
    }

    #[test]
    fn wrong_password_does_not_verify() {
        let hash = hash_password("1234");

        assert!(verify_password("1234", &hash));
        assert!(!verify_password("12345", &hash));
    }
}

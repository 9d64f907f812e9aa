//! Random credential generation (spec §4.9 "generate any credential left
//! unset: admin password, kubelet/kube-proxy/bearer tokens, SSH key name").
//!
//! Grounded on the original's `utils.GenerateRandomBase64String`: sample
//! more bytes than needed, base64-encode, strip characters that would need
//! shell-quoting, then truncate to the requested length.

use base64::Engine;
use rand::RngCore;

const ADMIN_PASSWORD_LENGTH: usize = 16;
const TOKEN_LENGTH: usize = 32;

/// Generates a `length`-character token from a shell-safe base64 alphabet
/// (no `=`, `+`, `/`). Oversamples and strips rather than re-encoding a
/// filtered byte source, matching the original's approach.
pub fn random_token(length: usize) -> String {
    let mut token = String::with_capacity(length);
    while token.len() < length {
        let mut raw = vec![0u8; length * 2];
        rand::thread_rng().fill_bytes(&mut raw);
        let encoded = base64::engine::general_purpose::STANDARD.encode(&raw);
        token.extend(encoded.chars().filter(|c| *c != '=' && *c != '+' && *c != '/'));
    }
    token.truncate(length);
    token
}

pub fn admin_password() -> String {
    random_token(ADMIN_PASSWORD_LENGTH)
}

pub fn kubelet_token() -> String {
    random_token(TOKEN_LENGTH)
}

pub fn kube_proxy_token() -> String {
    random_token(TOKEN_LENGTH)
}

pub fn bearer_token() -> String {
    random_token(TOKEN_LENGTH)
}

/// Derives a stable SSH key name from the MD5 digest of the public key
/// material when the caller didn't supply one (spec §4.9), the same
/// `kubernetes-<hex>` scheme the original's `computeSSHKeyFingerprint` uses.
pub fn ssh_key_name(public_key_material: &[u8]) -> String {
    use md5::{Digest, Md5};
    let digest = Md5::digest(public_key_material);
    format!("kubernetes-{}", hex::encode(digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_token_has_exact_requested_length() {
        for length in [1, 16, 32, 100] {
            assert_eq!(random_token(length).len(), length);
        }
    }

    #[test]
    fn random_token_never_contains_shell_sensitive_characters() {
        let token = random_token(256);
        assert!(!token.contains('='));
        assert!(!token.contains('+'));
        assert!(!token.contains('/'));
    }

    #[test]
    fn random_token_is_not_constant() {
        assert_ne!(random_token(32), random_token(32));
    }

    #[test]
    fn ssh_key_name_is_stable_for_the_same_material() {
        let material = b"ssh-rsa AAAAB3...";
        assert_eq!(ssh_key_name(material), ssh_key_name(material));
    }

    #[test]
    fn ssh_key_name_differs_for_different_material() {
        assert_ne!(ssh_key_name(b"one"), ssh_key_name(b"two"));
    }

    #[test]
    fn ssh_key_name_has_expected_prefix_and_length() {
        let name = ssh_key_name(b"anything");
        assert!(name.starts_with("kubernetes-"));
        assert_eq!(name.len(), "kubernetes-".len() + 32);
    }
}

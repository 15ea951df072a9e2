//! PKCE verifier/challenge generation.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// 32 random bytes from a CSPRNG, base64url-encoded without padding.
pub fn generate_verifier() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// SHA-256 of the verifier, same encoding as the verifier itself.
pub fn compute_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// 16 random bytes, hex-encoded. Used as the `state` parameter for
/// providers that don't reuse the verifier itself.
pub fn generate_state() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn challenge_is_deterministic_function_of_verifier() {
        let verifier = generate_verifier();
        assert_eq!(compute_challenge(&verifier), compute_challenge(&verifier));
    }

    #[test]
    fn verifier_and_state_have_no_padding() {
        let verifier = generate_verifier();
        let state = generate_state();
        assert!(!verifier.contains('='));
        assert_eq!(state.len(), 32);
    }
}

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use sha2::{Digest, Sha256};

/// PKCE verifier and its S256 challenge (RFC 7636).
///
/// The verifier stays with the browser (private cookie); only the challenge
/// travels to the identity provider in the authorization URL.
#[derive(Clone)]
pub struct PkcePair {
    verifier: String,
    challenge: String,
}

impl PkcePair {
    /// 48 random bytes, base64url encoded into a 64-character verifier.
    #[must_use]
    pub fn generate() -> Self {
        let random_bytes: [u8; 48] = rand::rng().random();
        Self::from_verifier(URL_SAFE_NO_PAD.encode(random_bytes))
    }

    /// Rebuild the pair from a stored verifier.
    #[must_use]
    pub fn from_verifier(verifier: impl Into<String>) -> Self {
        let verifier = verifier.into();
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        Self { verifier, challenge }
    }

    #[must_use]
    pub fn verifier(&self) -> &str {
        &self.verifier
    }

    #[must_use]
    pub fn challenge(&self) -> &str {
        &self.challenge
    }
}

/// Random CSRF `state` for the redirect round trip (16 bytes, 22 chars).
#[must_use]
pub fn generate_state() -> String {
    let random_bytes: [u8; 16] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_url_safe(s: &str) -> bool {
        s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }

    #[test]
    fn verifier_is_64_url_safe_chars() {
        let pair = PkcePair::generate();
        assert_eq!(pair.verifier().len(), 64);
        assert!(is_url_safe(pair.verifier()), "{}", pair.verifier());
    }

    #[test]
    fn challenge_matches_rfc7636_appendix_b() {
        let pair = PkcePair::from_verifier("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
        assert_eq!(pair.challenge(), "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn stored_verifier_reproduces_challenge() {
        let pair = PkcePair::generate();
        let rebuilt = PkcePair::from_verifier(pair.verifier());
        assert_eq!(rebuilt.challenge(), pair.challenge());
    }

    #[test]
    fn fresh_pairs_and_states_differ() {
        assert_ne!(PkcePair::generate().verifier(), PkcePair::generate().verifier());
        let state = generate_state();
        assert_eq!(state.len(), 22);
        assert_ne!(state, generate_state());
    }
}

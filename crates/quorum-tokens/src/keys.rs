use ed25519_dalek::{SigningKey, VerifyingKey};
use rand_core::OsRng;

/// One Ed25519 key pair under a key id. A keyring belongs to exactly one
/// trust domain; the public and internal domains never share one.
#[derive(Clone)]
pub struct Keyring {
    pub kid: String,
    pub(crate) signing_key: SigningKey,
    pub(crate) verifying_key: VerifyingKey,
}

impl Keyring {
    pub fn generate(kid: impl Into<String>) -> Self {
        let mut rng = OsRng;
        let signing_key = SigningKey::generate(&mut rng);
        let verifying_key = signing_key.verifying_key();
        Keyring {
            kid: kid.into(),
            signing_key,
            verifying_key,
        }
    }

    pub fn from_secret_bytes(kid: impl Into<String>, secret: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(secret);
        let verifying_key = signing_key.verifying_key();
        Keyring {
            kid: kid.into(),
            signing_key,
            verifying_key,
        }
    }
}

impl std::fmt::Debug for Keyring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keyring").field("kid", &self.kid).finish()
    }
}

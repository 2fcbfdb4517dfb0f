use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use sha2::Digest;

use crate::{
    CallbackError, HashOutput, Hasher, JsonObject, SaltGenerator, Signer, Verifier, VerifyInput,
};

/// Produces `salt-0`, `salt-1`, ...
#[derive(Debug, Default)]
pub struct SequentialSalts(AtomicUsize);

impl SequentialSalts {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SaltGenerator for SequentialSalts {
    async fn generate(&self) -> Result<String, CallbackError> {
        Ok(format!("salt-{}", self.0.fetch_add(1, Ordering::SeqCst)))
    }
}

/// Always produces the same salt.
#[derive(Debug, Clone)]
pub struct FixedSalt(pub &'static str);

#[async_trait]
impl SaltGenerator for FixedSalt {
    async fn generate(&self) -> Result<String, CallbackError> {
        Ok(self.0.to_owned())
    }
}

/// Always fails.
pub struct FailingHasher;

#[async_trait]
impl Hasher for FailingHasher {
    fn algorithm(&self) -> &str {
        "failing"
    }

    async fn hash(&self, _input: &str) -> Result<HashOutput, CallbackError> {
        Err("hasher offline".into())
    }
}

/// Toy signature scheme: `sha256(key || "." || message)`.
///
/// When verifying, a `{ "k": key }` public JWK overrides the key.
#[derive(Debug, Clone)]
pub struct TestKey(pub String);

impl TestKey {
    pub fn new(key: &str) -> Self {
        Self(key.to_owned())
    }
}

fn mac(key: &str, message: &str) -> Vec<u8> {
    let mut hasher = sha2::Sha256::new();
    hasher.update(key.as_bytes());
    hasher.update(b".");
    hasher.update(message.as_bytes());
    hasher.finalize().to_vec()
}

#[async_trait]
impl Signer for TestKey {
    async fn sign(
        &self,
        signing_input: &str,
        _header: &JsonObject,
    ) -> Result<Vec<u8>, CallbackError> {
        Ok(mac(&self.0, signing_input))
    }
}

#[async_trait]
impl Verifier for TestKey {
    async fn verify(&self, input: VerifyInput<'_>) -> Result<bool, CallbackError> {
        let key = match input.public_key_jwk.and_then(|jwk| jwk.get("k")) {
            Some(k) => k.as_str().ok_or("invalid test key")?,
            None => self.0.as_str(),
        };

        Ok(mac(key, input.message) == input.signature)
    }
}

#![allow(dead_code)]
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use p256::ecdsa::signature::Verifier as _;
use sd_jwt::{CallbackError, JsonObject, SaltGenerator, Signer, Verifier, VerifyInput};
use sha2::Digest;

pub fn at(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(seconds, 0).unwrap()
}

/// Produces `salt-0`, `salt-1`, ...
#[derive(Debug, Default)]
pub struct SequentialSalts(AtomicUsize);

#[async_trait]
impl SaltGenerator for SequentialSalts {
    async fn generate(&self) -> Result<String, CallbackError> {
        Ok(format!("salt-{}", self.0.fetch_add(1, Ordering::SeqCst)))
    }
}

/// Toy signature scheme: `sha256(key || "." || message)`.
///
/// When verifying, a `{ "k": key }` public JWK overrides the key.
#[derive(Debug, Clone)]
pub struct TestKey(pub &'static str);

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
        Ok(mac(self.0, signing_input))
    }
}

#[async_trait]
impl Verifier for TestKey {
    async fn verify(&self, input: VerifyInput<'_>) -> Result<bool, CallbackError> {
        let key = match input.public_key_jwk.and_then(|jwk| jwk.get("k")) {
            Some(k) => k.as_str().ok_or("invalid test key")?,
            None => self.0,
        };

        Ok(mac(key, input.message) == input.signature)
    }
}

/// ES256 verifier for a P-256 public JWK.
pub struct Es256Key {
    pub x: &'static str,
    pub y: &'static str,
}

#[async_trait]
impl Verifier for Es256Key {
    async fn verify(&self, input: VerifyInput<'_>) -> Result<bool, CallbackError> {
        let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
        let x = engine.decode(self.x)?;
        let y = engine.decode(self.y)?;

        let point = p256::EncodedPoint::from_affine_coordinates(
            p256::FieldBytes::from_slice(&x),
            p256::FieldBytes::from_slice(&y),
            false,
        );
        let verifying_key = p256::ecdsa::VerifyingKey::from_encoded_point(&point)?;
        let signature = p256::ecdsa::Signature::try_from(input.signature)?;

        Ok(verifying_key
            .verify(input.message.as_bytes(), &signature)
            .is_ok())
    }
}

use async_trait::async_trait;
use serde_json::Value;

use crate::{CallbackError, JsonObject};

/// JWT signer.
#[async_trait]
pub trait Signer: Send + Sync {
    /// Signs `signing_input`, i.e. `<base64url(header)>.<base64url(payload)>`.
    async fn sign(&self, signing_input: &str, header: &JsonObject)
        -> Result<Vec<u8>, CallbackError>;
}

/// Input of a [`Verifier`].
#[derive(Debug, Clone, Copy)]
pub struct VerifyInput<'a> {
    /// Signed message, i.e. `<base64url(header)>.<base64url(payload)>`.
    pub message: &'a str,

    /// Signature bytes.
    pub signature: &'a [u8],

    /// JOSE header.
    pub header: &'a JsonObject,

    /// Public key to verify with, if known.
    pub public_key_jwk: Option<&'a Value>,
}

/// JWT signature verifier.
#[async_trait]
pub trait Verifier: Send + Sync {
    /// Checks the signature.
    ///
    /// Returns `Ok(false)` for an invalid signature. Errors are reserved for
    /// failures preventing the verification itself.
    async fn verify(&self, input: VerifyInput<'_>) -> Result<bool, CallbackError>;
}

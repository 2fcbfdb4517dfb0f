use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::{Envelope, Error, Jwt, Signer, Verification, Verifier};

/// `typ` header of key binding JWTs.
pub const KB_JWT_TYPE: &str = "kb+jwt";

/// Key binding JWT, proving possession of the holder key.
///
/// Its header must have `typ` set to `kb+jwt` and an `alg`, and its payload
/// must have the `iat`, `aud` and `nonce` claims.
#[derive(Debug, Clone)]
pub struct KeyBinding(Jwt);

impl KeyBinding {
    /// Wraps a JWT, checking that it follows the key binding profile.
    pub fn new(jwt: Jwt) -> Result<Self, Error> {
        let kb = Self(jwt);
        kb.assert_valid()?;
        Ok(kb)
    }

    /// Parses a compact key binding JWT.
    pub fn from_compact(compact: &str) -> Result<Self, Error> {
        Self::new(Jwt::from_compact(compact)?)
    }

    /// Sets the signer.
    pub fn with_signer(self, signer: Arc<dyn Signer>) -> Self {
        Self(self.0.with_signer(signer))
    }

    /// Encodes the key binding JWT in compact form, signing it first if it has
    /// no signature.
    pub async fn to_compact(&mut self) -> Result<String, Error> {
        if self.0.signature().is_none() {
            Envelope::sign_and_add(self).await?;
        }

        self.0.encode()
    }

    /// Verifies the key binding JWT at the current time.
    pub async fn verify(
        &self,
        verifier: &dyn Verifier,
        public_key_jwk: Option<&Value>,
    ) -> Result<Verification, Error> {
        self.verify_at(verifier, public_key_jwk, Utc::now()).await
    }

    /// Verifies the key binding JWT. The profile is checked as a required
    /// claims check.
    pub async fn verify_at(
        &self,
        verifier: &dyn Verifier,
        public_key_jwk: Option<&Value>,
        now: DateTime<Utc>,
    ) -> Result<Verification, Error> {
        let mut verification = self
            .0
            .verify_at(verifier, &["iat", "aud", "nonce"], public_key_jwk, now)
            .await?;

        verification.are_required_claims_included = Some(self.assert_valid().is_ok());
        Ok(verification)
    }

    /// Returns the underlying JWT.
    pub fn into_jwt(self) -> Jwt {
        self.0
    }
}

impl Envelope for KeyBinding {
    fn jwt(&self) -> &Jwt {
        &self.0
    }

    fn jwt_mut(&mut self) -> &mut Jwt {
        &mut self.0
    }

    fn assert_valid(&self) -> Result<(), Error> {
        let check = || {
            self.0
                .assert_claim_in_header("typ", Some(&Value::String(KB_JWT_TYPE.to_owned())))?;
            self.0.assert_claim_in_header("alg", None)?;
            self.0.assert_claim_in_payload("iat", None)?;
            self.0.assert_claim_in_payload("aud", None)?;
            self.0.assert_claim_in_payload("nonce", None)
        };

        check().map_err(|e| Error::InvalidKeyBinding(Box::new(e)))
    }
}

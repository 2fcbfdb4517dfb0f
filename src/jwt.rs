use std::{fmt, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::{
    compact::{decode_json_object, decode_signature, encode_json_object},
    split_jwt,
    utils::{base64_encode, has_claim_deep},
    ClaimLocation, Error, JsonObject, Prerequisite, Signer, Verification, Verifier, VerifyInput,
};

/// JSON Web Token.
///
/// Header and payload are set independently. The JWT is signed either by
/// setting a signature directly or by setting a [`Signer`], in which case
/// [`Jwt::to_compact`] signs it when needed.
#[derive(Clone, Default)]
pub struct Jwt {
    pub(crate) header: Option<JsonObject>,
    pub(crate) payload: Option<JsonObject>,
    pub(crate) signature: Option<Vec<u8>>,
    pub(crate) signer: Option<Arc<dyn Signer>>,

    /// `<header>.<payload>` exactly as it was parsed, so that a parsed JWT is
    /// re-serialized and verified over the original bytes.
    pub(crate) encoded_signing_input: Option<String>,
}

impl Jwt {
    /// Creates an empty JWT.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the JOSE header.
    pub fn with_header(mut self, header: JsonObject) -> Self {
        self.set_header(header);
        self
    }

    /// Adds a claim to the JOSE header, creating it if needed.
    pub fn add_header_claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.encoded_signing_input = None;
        self.header
            .get_or_insert_with(JsonObject::new)
            .insert(name.into(), value.into());
        self
    }

    /// Sets the payload.
    pub fn with_payload(mut self, payload: JsonObject) -> Self {
        self.set_payload(payload);
        self
    }

    /// Adds a claim to the payload, creating it if needed.
    pub fn add_payload_claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.encoded_signing_input = None;
        self.payload
            .get_or_insert_with(JsonObject::new)
            .insert(name.into(), value.into());
        self
    }

    /// Sets the signature.
    pub fn with_signature(mut self, signature: Vec<u8>) -> Self {
        self.signature = Some(signature);
        self
    }

    /// Sets the signer.
    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub(crate) fn set_header(&mut self, header: JsonObject) {
        self.encoded_signing_input = None;
        self.header = Some(header);
    }

    pub(crate) fn set_payload(&mut self, payload: JsonObject) {
        self.encoded_signing_input = None;
        self.payload = Some(payload);
    }

    /// JOSE header.
    pub fn header(&self) -> Result<&JsonObject, Error> {
        self.header
            .as_ref()
            .ok_or(Error::MissingPrerequisite(Prerequisite::Header))
    }

    /// Payload.
    pub fn payload(&self) -> Result<&JsonObject, Error> {
        self.payload
            .as_ref()
            .ok_or(Error::MissingPrerequisite(Prerequisite::Payload))
    }

    /// Signature, if any.
    pub fn signature(&self) -> Option<&[u8]> {
        self.signature.as_deref()
    }

    /// Checks if a signer is set.
    pub fn has_signer(&self) -> bool {
        self.signer.is_some()
    }

    /// Checks that the header has the given claim and, if `expected` is
    /// given, that it has this value.
    pub fn assert_claim_in_header(&self, name: &str, expected: Option<&Value>) -> Result<(), Error> {
        assert_claim(self.header()?, ClaimLocation::Header, name, expected)
    }

    /// Checks that the payload has the given claim and, if `expected` is
    /// given, that it has this value.
    pub fn assert_claim_in_payload(
        &self,
        name: &str,
        expected: Option<&Value>,
    ) -> Result<(), Error> {
        assert_claim(self.payload()?, ClaimLocation::Payload, name, expected)
    }

    /// Signing input, `<base64url(header)>.<base64url(payload)>`.
    pub fn signing_input(&self) -> Result<String, Error> {
        if let Some(input) = &self.encoded_signing_input {
            return Ok(input.clone());
        }

        Ok(format!(
            "{}.{}",
            encode_json_object(self.header()?)?,
            encode_json_object(self.payload()?)?
        ))
    }

    /// Signs the JWT with its signer and sets the signature.
    pub async fn sign_and_add(&mut self) -> Result<(), Error> {
        let signer = self
            .signer
            .clone()
            .ok_or(Error::MissingPrerequisite(Prerequisite::Signer))?;

        let signing_input = self.signing_input()?;
        let signature = signer
            .sign(&signing_input, self.header()?)
            .await
            .map_err(Error::Signer)?;

        self.signature = Some(signature);
        Ok(())
    }

    /// Encodes the signed JWT in compact form.
    pub fn encode(&self) -> Result<String, Error> {
        let signature = self
            .signature
            .as_ref()
            .ok_or(Error::MissingPrerequisite(Prerequisite::Signature))?;

        Ok(format!(
            "{}.{}",
            self.signing_input()?,
            base64_encode(signature)
        ))
    }

    /// Encodes the JWT in compact form, signing it first if it has no
    /// signature.
    pub async fn to_compact(&mut self) -> Result<String, Error> {
        if self.signature.is_none() {
            self.sign_and_add().await?;
        }

        self.encode()
    }

    /// Parses a compact JWT.
    pub fn from_compact(compact: &str) -> Result<Self, Error> {
        let (header, payload, signature) = split_jwt(compact)?;

        Ok(Self {
            header: Some(decode_json_object(header, "header")?),
            payload: Some(decode_json_object(payload, "payload")?),
            signature: decode_signature(signature)?,
            signer: None,
            encoded_signing_input: Some(format!("{header}.{payload}")),
        })
    }

    /// Verifies the JWT at the current time.
    ///
    /// See [`Jwt::verify_at`].
    pub async fn verify(
        &self,
        verifier: &dyn Verifier,
        required_claims: &[&str],
        public_key_jwk: Option<&Value>,
    ) -> Result<Verification, Error> {
        self.verify_at(verifier, required_claims, public_key_jwk, Utc::now())
            .await
    }

    /// Verifies the signature, the `nbf` and `exp` claims against `now`, and
    /// that every required claim appears somewhere in the payload.
    pub async fn verify_at(
        &self,
        verifier: &dyn Verifier,
        required_claims: &[&str],
        public_key_jwk: Option<&Value>,
        now: DateTime<Utc>,
    ) -> Result<Verification, Error> {
        let mut verification = Verification {
            is_signature_valid: self.verify_signature(verifier, public_key_jwk).await?,
            ..Default::default()
        };

        check_claims(self.payload()?, required_claims, now, &mut verification);
        Ok(verification)
    }

    pub(crate) async fn verify_signature(
        &self,
        verifier: &dyn Verifier,
        public_key_jwk: Option<&Value>,
    ) -> Result<bool, Error> {
        let signature = self
            .signature
            .as_deref()
            .ok_or(Error::MissingPrerequisite(Prerequisite::Signature))?;

        let message = self.signing_input()?;
        verifier
            .verify(VerifyInput {
                message: &message,
                signature,
                header: self.header()?,
                public_key_jwk,
            })
            .await
            .map_err(Error::Verifier)
    }
}

impl fmt::Debug for Jwt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Jwt")
            .field("header", &self.header)
            .field("payload", &self.payload)
            .field("signature", &self.signature.as_ref().map(base64_encode))
            .field("has_signer", &self.signer.is_some())
            .finish()
    }
}

fn assert_claim(
    object: &JsonObject,
    location: ClaimLocation,
    name: &str,
    expected: Option<&Value>,
) -> Result<(), Error> {
    let actual = object.get(name).ok_or_else(|| Error::MissingClaim {
        location,
        claim: name.to_owned(),
    })?;

    match expected {
        Some(expected) if expected != actual => Err(Error::ClaimMismatch {
            location,
            claim: name.to_owned(),
            expected: expected.clone(),
            actual: actual.clone(),
        }),
        _ => Ok(()),
    }
}

/// Seconds since the Unix epoch, with sub-second precision.
fn numeric_date(time: DateTime<Utc>) -> f64 {
    time.timestamp() as f64 + f64::from(time.timestamp_subsec_nanos()) * 1.0e-9
}

/// Fills the time and required claims checks of `verification`.
pub(crate) fn check_claims(
    payload: &JsonObject,
    required_claims: &[&str],
    now: DateTime<Utc>,
    verification: &mut Verification,
) {
    let now = numeric_date(now);

    verification.is_not_before_valid = payload
        .get("nbf")
        .map(|nbf| nbf.as_f64().is_some_and(|nbf| nbf < now));

    verification.is_expiry_time_valid = payload
        .get("exp")
        .map(|exp| exp.as_f64().is_some_and(|exp| exp > now));

    if !required_claims.is_empty() {
        verification.are_required_claims_included = Some(required_claims.iter().all(|name| {
            payload.contains_key(*name) || payload.values().any(|v| has_claim_deep(v, name))
        }));
    }
}

/// JWT based envelope with a validity profile.
#[async_trait]
pub trait Envelope: Send + Sync {
    /// Underlying JWT.
    fn jwt(&self) -> &Jwt;

    /// Underlying JWT, mutably.
    fn jwt_mut(&mut self) -> &mut Jwt;

    /// Checks that the envelope follows its profile.
    fn assert_valid(&self) -> Result<(), Error> {
        self.jwt().header()?;
        self.jwt().payload()?;
        Ok(())
    }

    /// Checks the profile, then signs the envelope with its signer.
    async fn sign_and_add(&mut self) -> Result<(), Error> {
        self.assert_valid()?;
        self.jwt_mut().sign_and_add().await
    }
}

use std::{fmt, sync::Arc};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::{
    apply_disclosure_frame, join_compact, jwt::check_claims, payload_disclosure_mapping,
    reveal_claims, select_disclosures_with_map, split_compact, ClaimLocation, Disclosure,
    DisclosureMap, Envelope, Error, Hasher, JsonObject, Jwt, KeyBinding, ObjectFrame,
    PayloadMapping, Prerequisite, PresentationFrame, SaltGenerator, Signer, Verification,
    Verifier, SD_ALG_CLAIM_NAME,
};

/// Selective Disclosure JWT.
///
/// An issuer builds an SD-JWT from a header, a payload and a
/// [`ObjectFrame`] selecting the claims to conceal, then serializes it with
/// [`SdJwt::to_compact`]. Holders and verifiers parse it back with
/// [`SdJwt::from_compact`].
#[derive(Clone, Default)]
pub struct SdJwt {
    pub(crate) jwt: Jwt,
    pub(crate) disclosures: Vec<Disclosure>,
    pub(crate) disclosure_frame: Option<ObjectFrame>,
    pub(crate) key_binding: Option<KeyBinding>,
    pub(crate) salt_generator: Option<Arc<dyn SaltGenerator>>,
    pub(crate) hasher: Option<Arc<dyn Hasher>>,
}

impl SdJwt {
    /// Creates an empty SD-JWT.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the JOSE header.
    pub fn with_header(mut self, header: JsonObject) -> Self {
        self.jwt.set_header(header);
        self
    }

    /// Adds a claim to the JOSE header.
    pub fn add_header_claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.jwt = self.jwt.add_header_claim(name, value);
        self
    }

    /// Sets the payload, before concealment.
    pub fn with_payload(mut self, payload: JsonObject) -> Self {
        self.jwt.set_payload(payload);
        self
    }

    /// Adds a claim to the payload.
    pub fn add_payload_claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.jwt = self.jwt.add_payload_claim(name, value);
        self
    }

    /// Sets the issuer signature.
    pub fn with_signature(mut self, signature: Vec<u8>) -> Self {
        self.jwt = self.jwt.with_signature(signature);
        self
    }

    /// Sets the issuer signer.
    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.jwt = self.jwt.with_signer(signer);
        self
    }

    /// Sets the disclosure frame applied before signing.
    pub fn with_disclosure_frame(mut self, frame: ObjectFrame) -> Self {
        self.disclosure_frame = Some(frame);
        self
    }

    /// Sets the key binding JWT appended to the compact form.
    pub fn with_key_binding(mut self, key_binding: KeyBinding) -> Self {
        self.key_binding = Some(key_binding);
        self
    }

    /// Sets the hasher.
    pub fn with_hasher(mut self, hasher: Arc<dyn Hasher>) -> Self {
        self.hasher = Some(hasher);
        self
    }

    /// Sets the salt generator.
    pub fn with_salt_generator(mut self, salt_generator: Arc<dyn SaltGenerator>) -> Self {
        self.salt_generator = Some(salt_generator);
        self
    }

    /// JOSE header.
    pub fn header(&self) -> Result<&JsonObject, Error> {
        self.jwt.header()
    }

    /// Payload, as signed by the issuer once the disclosure frame is applied.
    pub fn payload(&self) -> Result<&JsonObject, Error> {
        self.jwt.payload()
    }

    /// Disclosures.
    pub fn disclosures(&self) -> &[Disclosure] {
        &self.disclosures
    }

    /// Pending disclosure frame.
    pub fn disclosure_frame(&self) -> Option<&ObjectFrame> {
        self.disclosure_frame.as_ref()
    }

    /// Key binding JWT.
    pub fn key_binding(&self) -> Option<&KeyBinding> {
        self.key_binding.as_ref()
    }

    fn hasher(&self) -> Result<&dyn Hasher, Error> {
        self.hasher
            .as_deref()
            .ok_or(Error::MissingPrerequisite(Prerequisite::Hasher))
    }

    /// Applies the pending disclosure frame to the payload.
    ///
    /// The produced disclosures are appended to the existing ones, and
    /// `_sd_alg` is added to the payload if any digest was added to it. Does
    /// nothing if no frame is pending.
    pub async fn apply_disclosure_frame(&mut self) -> Result<(), Error> {
        let Some(frame) = &self.disclosure_frame else {
            return Ok(());
        };

        if self.jwt.signature.is_some() {
            return Err(Error::SignatureAlreadySet);
        }

        let salt_generator = self
            .salt_generator
            .as_deref()
            .ok_or(Error::MissingPrerequisite(Prerequisite::SaltGenerator))?;
        let hasher = self.hasher()?;

        let (mut payload, disclosures) =
            apply_disclosure_frame(self.jwt.payload()?, frame, salt_generator, hasher).await?;

        if !disclosures.is_empty() || frame.has_decoys() {
            let algorithm = Value::String(hasher.algorithm().to_owned());
            match payload.get(SD_ALG_CLAIM_NAME) {
                Some(actual) if *actual != algorithm => {
                    return Err(Error::ClaimMismatch {
                        location: ClaimLocation::Payload,
                        claim: SD_ALG_CLAIM_NAME.to_owned(),
                        expected: algorithm,
                        actual: actual.clone(),
                    })
                }
                _ => {
                    payload.insert(SD_ALG_CLAIM_NAME.to_owned(), algorithm);
                }
            }
        }

        log::debug!("applied disclosure frame, {} disclosures", disclosures.len());

        self.jwt.set_payload(payload);
        self.disclosures.extend(disclosures);
        self.disclosure_frame = None;
        Ok(())
    }

    /// Encodes the SD-JWT in compact form.
    ///
    /// The pending disclosure frame is applied first, then the JWT is signed
    /// if it has no signature, and so is the key binding JWT. A pending frame
    /// on an already signed SD-JWT is an error unless a signer is set, in
    /// which case the SD-JWT is signed again.
    pub async fn to_compact(&mut self) -> Result<String, Error> {
        if self.disclosure_frame.is_some() && self.jwt.signature.is_some() {
            if !self.jwt.has_signer() {
                return Err(Error::SignatureAlreadySet);
            }

            self.jwt.signature = None;
        }

        self.apply_disclosure_frame().await?;

        if self.jwt.signature.is_none() {
            Envelope::sign_and_add(self).await?;
        }

        let jwt = self.jwt.encode()?;
        let key_binding = match &mut self.key_binding {
            Some(key_binding) => Some(key_binding.to_compact().await?),
            None => None,
        };

        let disclosures: Vec<&str> = self.disclosures.iter().map(Disclosure::encoded).collect();
        Ok(join_compact(&jwt, &disclosures, key_binding.as_deref()))
    }

    /// Parses a compact SD-JWT.
    ///
    /// When the `sha2` feature is enabled and the payload uses the `sha-256`
    /// digest algorithm, explicitly or by default, the hasher is set.
    pub fn from_compact(compact: &str) -> Result<Self, Error> {
        let parts = split_compact(compact)?;
        let jwt = Jwt::from_compact(parts.jwt)?;

        let disclosures = parts
            .disclosures
            .iter()
            .map(|d| Disclosure::decode(d))
            .collect::<Result<Vec<_>, _>>()?;

        let key_binding = parts
            .key_binding
            .map(KeyBinding::from_compact)
            .transpose()?;

        log::debug!(
            "parsed SD-JWT with {} disclosures, key binding: {}",
            disclosures.len(),
            key_binding.is_some()
        );

        let hasher = default_hasher(jwt.payload()?);

        Ok(Self {
            jwt,
            disclosures,
            disclosure_frame: None,
            key_binding,
            salt_generator: None,
            hasher,
        })
    }

    /// Relates the disclosures to each other.
    pub async fn disclosure_map(&self) -> Result<DisclosureMap, Error> {
        DisclosureMap::build(&self.disclosures, self.hasher()?).await
    }

    /// Rebuilds the payload with every disclosed claim revealed.
    ///
    /// The `_sd_alg` claim, if any, must match the hasher algorithm.
    pub async fn pretty_claims(&self) -> Result<JsonObject, Error> {
        let payload = self.jwt.payload()?;
        let hasher = self.hasher()?;

        if let Some(actual) = payload.get(SD_ALG_CLAIM_NAME) {
            if actual.as_str() != Some(hasher.algorithm()) {
                return Err(Error::ClaimMismatch {
                    location: ClaimLocation::Payload,
                    claim: SD_ALG_CLAIM_NAME.to_owned(),
                    expected: Value::String(hasher.algorithm().to_owned()),
                    actual: actual.clone(),
                });
            }
        }

        let map = self.disclosure_map().await?;
        reveal_claims(payload, &map)
    }

    /// Maps the revealed claims to the digests of their disclosures.
    pub async fn payload_disclosure_mapping(&self) -> Result<PayloadMapping, Error> {
        let map = self.disclosure_map().await?;
        payload_disclosure_mapping(self.jwt.payload()?, &map)
    }

    /// Encodes a presentation revealing the claims selected by `frame`.
    ///
    /// Only the required disclosures are kept. The key binding JWT, if set,
    /// is signed if needed and appended.
    pub async fn present(&self, frame: &PresentationFrame) -> Result<String, Error> {
        let jwt = self.jwt.encode()?;
        let payload = self.jwt.payload()?;

        let map = self.disclosure_map().await?;
        let pretty = reveal_claims(payload, &map)?;
        let selected = select_disclosures_with_map(payload, frame, &pretty, &map)?;

        log::debug!(
            "presenting {} of {} disclosures",
            selected.len(),
            self.disclosures.len()
        );

        let key_binding = match &self.key_binding {
            Some(key_binding) => Some(key_binding.clone().to_compact().await?),
            None => None,
        };

        let disclosures: Vec<&str> = selected.iter().map(Disclosure::encoded).collect();
        Ok(join_compact(&jwt, &disclosures, key_binding.as_deref()))
    }

    /// Verifies the SD-JWT at the current time.
    ///
    /// See [`SdJwt::verify_at`].
    pub async fn verify(
        &self,
        verifier: &dyn Verifier,
        required_claims: &[&str],
        public_key_jwk: Option<&Value>,
    ) -> Result<Verification, Error> {
        self.verify_at(verifier, required_claims, public_key_jwk, Utc::now())
            .await
    }

    /// Verifies the issuer signature, then checks `nbf`, `exp` and the
    /// required claims against the revealed claims.
    ///
    /// The key binding JWT, if any, is verified with the holder key found in
    /// the `cnf.jwk` claim.
    pub async fn verify_at(
        &self,
        verifier: &dyn Verifier,
        required_claims: &[&str],
        public_key_jwk: Option<&Value>,
        now: DateTime<Utc>,
    ) -> Result<Verification, Error> {
        let mut verification = Verification {
            is_signature_valid: self.jwt.verify_signature(verifier, public_key_jwk).await?,
            ..Default::default()
        };

        let pretty = self.pretty_claims().await?;
        check_claims(&pretty, required_claims, now, &mut verification);

        if let Some(key_binding) = &self.key_binding {
            let holder_jwk = pretty.get("cnf").and_then(|cnf| cnf.get("jwk"));
            let key_binding_verification = key_binding.verify_at(verifier, holder_jwk, now).await?;
            verification.is_key_binding_valid = Some(key_binding_verification.is_valid());
        }

        log::debug!("verified SD-JWT: {verification:?}");
        Ok(verification)
    }
}

impl Envelope for SdJwt {
    fn jwt(&self) -> &Jwt {
        &self.jwt
    }

    fn jwt_mut(&mut self) -> &mut Jwt {
        &mut self.jwt
    }
}

impl fmt::Debug for SdJwt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SdJwt")
            .field("jwt", &self.jwt)
            .field("disclosures", &self.disclosures)
            .field("disclosure_frame", &self.disclosure_frame)
            .field("key_binding", &self.key_binding)
            .field("has_salt_generator", &self.salt_generator.is_some())
            .field(
                "hasher",
                &self.hasher.as_ref().map(|hasher| hasher.algorithm().to_owned()),
            )
            .finish()
    }
}

#[cfg(feature = "sha2")]
fn default_hasher(payload: &JsonObject) -> Option<Arc<dyn Hasher>> {
    let algorithm = match payload.get(SD_ALG_CLAIM_NAME) {
        Some(Value::String(algorithm)) => algorithm.parse().ok()?,
        Some(_) => return None,
        None => crate::SdAlg::Sha256,
    };

    Some(Arc::new(algorithm))
}

#[cfg(not(feature = "sha2"))]
fn default_hasher(_payload: &JsonObject) -> Option<Arc<dyn Hasher>> {
    None
}

use std::{ops::Deref, sync::Arc};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::{
    ClaimPath, DisclosureFrame, Envelope, Error, Hasher, JsonObject, Jwt, KeyBinding, ObjectFrame,
    PresentationFrame, SaltGenerator, SdJwt, Signer, Verification, Verifier,
};

/// `typ` header of SD-JWT verifiable credentials.
pub const VC_SD_JWT_TYPE: &str = "vc+sd-jwt";

/// Claims every SD-JWT VC carries in clear text.
const REQUIRED_CLEAR_CLAIMS: [&str; 4] = ["iss", "type", "iat", "cnf"];

/// SD-JWT following the verifiable credential profile.
///
/// Its header must have `typ` set to `vc+sd-jwt` and an `alg`. Its payload
/// must have the `iss`, `type`, `iat` and `cnf` claims, none of which may be
/// concealed. The profile is checked when encoding and when parsing.
#[derive(Debug, Clone, Default)]
pub struct SdJwtVc(SdJwt);

impl SdJwtVc {
    /// Creates an empty SD-JWT VC.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the JOSE header.
    pub fn with_header(self, header: JsonObject) -> Self {
        Self(self.0.with_header(header))
    }

    /// Adds a claim to the JOSE header.
    pub fn add_header_claim(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self(self.0.add_header_claim(name, value))
    }

    /// Sets the payload.
    pub fn with_payload(self, payload: JsonObject) -> Self {
        Self(self.0.with_payload(payload))
    }

    /// Adds a claim to the payload.
    pub fn add_payload_claim(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self(self.0.add_payload_claim(name, value))
    }

    /// Sets the issuer signature.
    pub fn with_signature(self, signature: Vec<u8>) -> Self {
        Self(self.0.with_signature(signature))
    }

    /// Sets the issuer signer.
    pub fn with_signer(self, signer: Arc<dyn Signer>) -> Self {
        Self(self.0.with_signer(signer))
    }

    /// Sets the disclosure frame.
    pub fn with_disclosure_frame(self, frame: ObjectFrame) -> Self {
        Self(self.0.with_disclosure_frame(frame))
    }

    /// Sets the key binding JWT.
    pub fn with_key_binding(self, key_binding: KeyBinding) -> Self {
        Self(self.0.with_key_binding(key_binding))
    }

    /// Sets the hasher.
    pub fn with_hasher(self, hasher: Arc<dyn Hasher>) -> Self {
        Self(self.0.with_hasher(hasher))
    }

    /// Sets the salt generator.
    pub fn with_salt_generator(self, salt_generator: Arc<dyn SaltGenerator>) -> Self {
        Self(self.0.with_salt_generator(salt_generator))
    }

    /// Checks the profile, then encodes the credential in compact form.
    pub async fn to_compact(&mut self) -> Result<String, Error> {
        self.assert_valid()?;
        self.0.to_compact().await
    }

    /// Parses a compact SD-JWT VC and checks its profile.
    pub fn from_compact(compact: &str) -> Result<Self, Error> {
        let vc = Self(SdJwt::from_compact(compact)?);
        vc.assert_valid()?;
        Ok(vc)
    }

    /// Encodes a presentation revealing the claims selected by `frame`.
    pub async fn present(&self, frame: &PresentationFrame) -> Result<String, Error> {
        self.assert_valid()?;
        self.0.present(frame).await
    }

    /// Verifies the credential at the current time.
    ///
    /// See [`SdJwtVc::verify_at`].
    pub async fn verify(
        &self,
        verifier: &dyn Verifier,
        required_claims: &[&str],
        public_key_jwk: Option<&Value>,
        expected_cnf: Option<&Value>,
    ) -> Result<Verification, Error> {
        self.verify_at(
            verifier,
            required_claims,
            public_key_jwk,
            expected_cnf,
            Utc::now(),
        )
        .await
    }

    /// Verifies the credential like [`SdJwt::verify_at`], then checks the
    /// profile and, if given, that the `cnf` claim is `expected_cnf`.
    pub async fn verify_at(
        &self,
        verifier: &dyn Verifier,
        required_claims: &[&str],
        public_key_jwk: Option<&Value>,
        expected_cnf: Option<&Value>,
        now: DateTime<Utc>,
    ) -> Result<Verification, Error> {
        let mut verification = self
            .0
            .verify_at(verifier, required_claims, public_key_jwk, now)
            .await?;

        verification.contains_required_vc_properties = Some(self.assert_valid().is_ok());

        if let Some(expected_cnf) = expected_cnf {
            let cnf = self.0.payload()?.get("cnf");
            verification.contains_expected_key_binding = Some(cnf == Some(expected_cnf));
        }

        Ok(verification)
    }

    /// Returns the underlying SD-JWT.
    pub fn into_sd_jwt(self) -> SdJwt {
        self.0
    }
}

impl Deref for SdJwtVc {
    type Target = SdJwt;

    fn deref(&self) -> &SdJwt {
        &self.0
    }
}

impl Envelope for SdJwtVc {
    fn jwt(&self) -> &Jwt {
        &self.0.jwt
    }

    fn jwt_mut(&mut self) -> &mut Jwt {
        &mut self.0.jwt
    }

    fn assert_valid(&self) -> Result<(), Error> {
        let check = || -> Result<(), Error> {
            let jwt = &self.0.jwt;
            jwt.assert_claim_in_header("typ", Some(&Value::String(VC_SD_JWT_TYPE.to_owned())))?;
            jwt.assert_claim_in_header("alg", None)?;

            for claim in REQUIRED_CLEAR_CLAIMS {
                jwt.assert_claim_in_payload(claim, None)?;
            }

            if let Some(frame) = &self.0.disclosure_frame {
                for claim in REQUIRED_CLEAR_CLAIMS {
                    if frame
                        .get(claim)
                        .is_some_and(|f| !matches!(f, DisclosureFrame::Flag(false)))
                    {
                        return Err(Error::invalid_frame(
                            &ClaimPath::new().with_key(claim),
                            "this claim cannot be concealed",
                        ));
                    }
                }
            }

            Ok(())
        };

        check().map_err(|e| Error::InvalidVcClaims(Box::new(e)))
    }
}

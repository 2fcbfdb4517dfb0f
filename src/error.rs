use std::fmt;

use serde_json::Value;

use crate::ClaimPath;

/// Error returned by an injected callback ([`Hasher`](crate::Hasher),
/// [`SaltGenerator`](crate::SaltGenerator), [`Signer`](crate::Signer) or
/// [`Verifier`](crate::Verifier)).
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Part of a JWT a claim belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimLocation {
    /// JOSE header.
    Header,

    /// JWT payload.
    Payload,
}

impl fmt::Display for ClaimLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header => f.write_str("header"),
            Self::Payload => f.write_str("payload"),
        }
    }
}

/// Input required by an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prerequisite {
    /// JOSE header.
    Header,

    /// JWT payload.
    Payload,

    /// JWT signature.
    Signature,

    /// Signing callback.
    Signer,

    /// Salt generation callback.
    SaltGenerator,

    /// Hashing callback.
    Hasher,
}

impl fmt::Display for Prerequisite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header => f.write_str("header"),
            Self::Payload => f.write_str("payload"),
            Self::Signature => f.write_str("signature"),
            Self::Signer => f.write_str("signer"),
            Self::SaltGenerator => f.write_str("salt generator"),
            Self::Hasher => f.write_str("hasher"),
        }
    }
}

/// SD-JWT error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The disclosure frame references a claim absent from the payload.
    #[error("disclosure frame references `{path}` which is absent from `{payload}`")]
    FrameMismatch {
        /// Path of the missing claim.
        path: ClaimPath,

        /// Sub-payload the claim was looked up in.
        payload: Value,
    },

    /// Malformed disclosure or presentation frame.
    #[error("invalid frame at `{path}`: {reason}")]
    InvalidFrame {
        /// Path of the offending frame entry.
        path: ClaimPath,

        /// What is wrong with it.
        reason: String,
    },

    /// Malformed disclosure, `_sd` claim or array item marker.
    #[error("malformed disclosure: {0}")]
    MalformedDisclosure(String),

    /// Malformed compact serialization.
    #[error("malformed compact SD-JWT: {0}")]
    MalformedCompact(String),

    /// An input required by the operation is missing.
    #[error("missing {0}")]
    MissingPrerequisite(Prerequisite),

    /// A disclosure frame is pending but the JWT is already signed.
    #[error("signature is already set, applying the disclosure frame would invalidate it")]
    SignatureAlreadySet,

    /// The key binding JWT does not follow the `kb+jwt` profile.
    #[error("invalid key binding: {0}")]
    InvalidKeyBinding(#[source] Box<Error>),

    /// The SD-JWT does not follow the `vc+sd-jwt` profile.
    #[error("invalid SD-JWT VC claims: {0}")]
    InvalidVcClaims(#[source] Box<Error>),

    /// A claim is present but does not have the expected value.
    #[error("claim `{claim}` in {location} is `{actual}`, expected `{expected}`")]
    ClaimMismatch {
        /// Where the claim is.
        location: ClaimLocation,

        /// Claim name.
        claim: String,

        /// Expected value.
        expected: Value,

        /// Actual value.
        actual: Value,
    },

    /// A required claim is missing.
    #[error("claim `{claim}` is missing from {location}")]
    MissingClaim {
        /// Where the claim should be.
        location: ClaimLocation,

        /// Claim name.
        claim: String,
    },

    /// A presentation frame requests a claim that is not in the revealed
    /// claims.
    #[error("presentation path `{0}` does not exist in the revealed claims")]
    PresentationPathNotFound(ClaimPath),

    /// Hasher callback failed.
    #[error("hasher failed: {0}")]
    Hasher(#[source] CallbackError),

    /// Salt generator callback failed.
    #[error("salt generator failed: {0}")]
    SaltGenerator(#[source] CallbackError),

    /// Signer callback failed.
    #[error("signer failed: {0}")]
    Signer(#[source] CallbackError),

    /// Verifier callback failed.
    #[error("verifier failed: {0}")]
    Verifier(#[source] CallbackError),

    /// JSON (de)serialization failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid_frame(path: &ClaimPath, reason: impl Into<String>) -> Self {
        Self::InvalidFrame {
            path: path.clone(),
            reason: reason.into(),
        }
    }
}

//! Selective Disclosure for JWTs ([SD-JWT]).
//!
//! [SD-JWT]: <https://datatracker.ietf.org/doc/draft-ietf-oauth-selective-disclosure-jwt/>
//!
//! # Usage
//!
//! An SD-JWT is a JWT whose payload hides some of its claims behind salted
//! digests. Each hidden claim travels next to the JWT as a [`Disclosure`],
//! and the holder chooses which disclosures to hand over to a verifier.
//!
//! ```text
//! Issuer:   payload ─► conceal (DisclosureFrame) ─► sign ─► SdJwt::to_compact
//! Holder:   SdJwt::from_compact ─► SdJwt::present (PresentationFrame)
//! Verifier: SdJwt::from_compact ─► SdJwt::verify ─► SdJwt::pretty_claims
//! ```
//!
//! The crate never picks a cryptographic algorithm by itself. Hashing, salt
//! generation, signing and signature verification are all provided by the
//! caller through the [`Hasher`], [`SaltGenerator`], [`Signer`] and
//! [`Verifier`] traits. The `sha2` and `rand` features provide a default
//! [`SdAlg::Sha256`] hasher and a [`RandomSalt`] generator.
//!
//! The lower level building blocks are also public:
//! [`apply_disclosure_frame`] conceals claims, [`DisclosureMap::build`]
//! relates disclosures to each other, [`reveal_claims`] rebuilds the pretty
//! payload and [`select_disclosures`] picks the disclosures required by a
//! presentation.
#![warn(missing_docs)]

mod compact;
mod conceal;
mod decoy;
mod digest;
mod disclosure;
mod error;
mod frame;
mod jwt;
mod kb;
mod map;
mod path;
mod present;
mod reveal;
mod salt;
mod sd_jwt;
mod signature;
#[cfg(all(test, feature = "sha2"))]
mod test_utils;
pub(crate) mod utils;
mod vc;
mod verification;

pub use compact::{join_compact, split_compact, split_jwt, CompactParts};
pub use conceal::apply_disclosure_frame;
pub use decoy::create_decoys;
#[cfg(feature = "sha2")]
pub use digest::SdAlg;
pub use digest::{HashOutput, Hasher, UnknownSdAlg};
pub use disclosure::Disclosure;
pub use error::{CallbackError, ClaimLocation, Error, Prerequisite};
pub use frame::{DisclosureFrame, ObjectFrame, PresentationFrame, DECOY_COUNT_KEY, DISCLOSE_KEY};
pub use jwt::{Envelope, Jwt};
pub use kb::{KeyBinding, KB_JWT_TYPE};
pub use map::{payload_disclosure_mapping, DisclosureMap, DisclosureMapEntry, PayloadMapping};
pub use path::{ClaimPath, PathSegment};
pub use present::{select_disclosures, select_disclosures_with_map};
pub use reveal::reveal_claims;
#[cfg(feature = "rand")]
pub use salt::{generate_salt, RandomSalt, DEFAULT_SALT_SIZE};
pub use salt::SaltGenerator;
pub use sd_jwt::SdJwt;
pub use signature::{Signer, Verifier, VerifyInput};
pub use vc::{SdJwtVc, VC_SD_JWT_TYPE};
pub use verification::Verification;

/// JSON object, used for JWT headers and payloads.
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

const SD_CLAIM_NAME: &str = "_sd";
const SD_ALG_CLAIM_NAME: &str = "_sd_alg";
const ARRAY_CLAIM_ITEM_PROPERTY_NAME: &str = "...";

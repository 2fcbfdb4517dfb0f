use async_trait::async_trait;

use crate::{utils::base64_encode, CallbackError, Error};

/// Output of a [`Hasher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashOutput {
    /// Raw digest bytes, to be encoded as url-safe base64 without padding.
    Bytes(Vec<u8>),

    /// Digest already encoded as url-safe base64 without padding.
    Encoded(String),
}

impl HashOutput {
    /// Returns the url-safe base64 encoded digest.
    pub fn into_digest(self) -> String {
        match self {
            Self::Bytes(bytes) => base64_encode(bytes),
            Self::Encoded(digest) => digest,
        }
    }
}

impl From<Vec<u8>> for HashOutput {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<String> for HashOutput {
    fn from(value: String) -> Self {
        Self::Encoded(value)
    }
}

/// Hash function used to compute disclosure digests.
#[async_trait]
pub trait Hasher: Send + Sync {
    /// Hash algorithm identifier, written in the `_sd_alg` claim.
    fn algorithm(&self) -> &str;

    /// Hashes the given UTF-8 input.
    async fn hash(&self, input: &str) -> Result<HashOutput, CallbackError>;
}

/// Hashes `input` and returns the encoded digest.
pub(crate) async fn hash_digest(hasher: &dyn Hasher, input: &str) -> Result<String, Error> {
    hasher
        .hash(input)
        .await
        .map(HashOutput::into_digest)
        .map_err(Error::Hasher)
}

/// Unknown `_sd_alg` value.
#[derive(Debug, thiserror::Error)]
#[error("unknown SD-JWT hash algorithm `{0}`")]
pub struct UnknownSdAlg(pub String);

/// Elements of the _sd_alg claim
#[cfg(feature = "sha2")]
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SdAlg {
    /// SHA-256 algorithm for hashing disclosures
    Sha256,
}

#[cfg(feature = "sha2")]
impl SdAlg {
    const SHA256_STR: &'static str = "sha-256";

    /// String encoding of _sd_alg field
    pub fn to_str(&self) -> &'static str {
        match self {
            SdAlg::Sha256 => Self::SHA256_STR,
        }
    }
}

#[cfg(feature = "sha2")]
impl std::str::FromStr for SdAlg {
    type Err = UnknownSdAlg;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            Self::SHA256_STR => Ok(SdAlg::Sha256),
            other => Err(UnknownSdAlg(other.to_owned())),
        }
    }
}

#[cfg(feature = "sha2")]
impl serde::Serialize for SdAlg {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_str())
    }
}

#[cfg(feature = "sha2")]
impl<'de> serde::Deserialize<'de> for SdAlg {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        <String as serde::Deserialize>::deserialize(deserializer)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(feature = "sha2")]
#[async_trait]
impl Hasher for SdAlg {
    fn algorithm(&self) -> &str {
        self.to_str()
    }

    async fn hash(&self, input: &str) -> Result<HashOutput, CallbackError> {
        use sha2::Digest;
        match self {
            Self::Sha256 => Ok(HashOutput::Bytes(
                sha2::Sha256::digest(input.as_bytes()).to_vec(),
            )),
        }
    }
}

#[cfg(all(test, feature = "sha2"))]
mod tests {
    use super::*;

    #[async_std::test]
    async fn test_disclosure_hashing() {
        assert_eq!(
            hash_digest(
                &SdAlg::Sha256,
                "WyI2cU1RdlJMNWhhaiIsICJmYW1pbHlfbmFtZSIsICJNw7ZiaXVzIl0"
            )
            .await
            .unwrap(),
            "uutlBuYeMDyjLLTpf6Jxi7yNkEF35jdyWMn9U7b_RYY",
        );
    }

    #[test]
    fn parse_sd_alg() {
        assert_eq!("sha-256".parse::<SdAlg>().unwrap(), SdAlg::Sha256);
        assert!("sha-512".parse::<SdAlg>().is_err());
        assert_eq!(
            serde_json::to_value(SdAlg::Sha256).unwrap(),
            serde_json::json!("sha-256")
        );
    }
}

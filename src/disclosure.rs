use std::fmt;

use serde_json::Value;

use crate::{
    digest::hash_digest,
    utils::{base64_decode, base64_encode},
    Error, Hasher,
};

/// Selectively disclosable claim.
///
/// Object entry disclosures are encoded as the array `[salt, key, value]`,
/// array item disclosures as `[salt, value]`. The encoded form is the url-safe
/// base64 encoding (without padding) of that array, serialized as minified
/// JSON. It is what gets hashed into the disclosure digest and what appears in
/// the compact serialization.
///
/// See: <https://www.ietf.org/archive/id/draft-ietf-oauth-selective-disclosure-jwt-12.html#section-5>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disclosure {
    salt: String,
    key: Option<String>,
    value: Value,
    encoded: String,
}

impl Disclosure {
    /// Creates a new disclosure. A `key` makes it an object entry disclosure,
    /// its absence an array item disclosure.
    pub fn new(salt: impl Into<String>, key: Option<String>, value: Value) -> Self {
        let salt = salt.into();
        let encoded = base64_encode(to_array(&salt, key.as_deref(), &value).to_string());
        Self {
            salt,
            key,
            value,
            encoded,
        }
    }

    /// Creates an object entry disclosure.
    pub fn object_entry(salt: impl Into<String>, key: impl Into<String>, value: Value) -> Self {
        Self::new(salt, Some(key.into()), value)
    }

    /// Creates an array item disclosure.
    pub fn array_item(salt: impl Into<String>, value: Value) -> Self {
        Self::new(salt, None, value)
    }

    /// Decodes an encoded disclosure.
    ///
    /// The encoded string is kept as is so the digest computed by the issuer
    /// can be reproduced even if its JSON serialization was not minified.
    pub fn decode(encoded: &str) -> Result<Self, Error> {
        let bytes = base64_decode(encoded).ok_or_else(|| {
            Error::MalformedCompact(format!("disclosure `{encoded}` is not url-safe base64"))
        })?;

        let json: Value = serde_json::from_slice(&bytes).map_err(|e| {
            Error::MalformedCompact(format!("disclosure `{encoded}` is not JSON: {e}"))
        })?;

        let Value::Array(items) = json else {
            return Err(Error::MalformedDisclosure(format!(
                "disclosure `{encoded}` is not an array"
            )));
        };

        let string = |value: Value, what: &str| match value {
            Value::String(s) => Ok(s),
            other => Err(Error::MalformedDisclosure(format!(
                "disclosure {what} is not a string: `{other}`"
            ))),
        };

        let mut items = items.into_iter();
        let (salt, key, value) = match (items.next(), items.next(), items.next(), items.next()) {
            (Some(salt), Some(key), Some(value), None) => {
                (string(salt, "salt")?, Some(string(key, "key")?), value)
            }
            (Some(salt), Some(value), None, None) => (string(salt, "salt")?, None, value),
            _ => {
                return Err(Error::MalformedDisclosure(format!(
                    "disclosure `{encoded}` must have 2 or 3 elements"
                )))
            }
        };

        Ok(Self {
            salt,
            key,
            value,
            encoded: encoded.to_owned(),
        })
    }

    /// Disclosure salt.
    pub fn salt(&self) -> &str {
        &self.salt
    }

    /// Claim name, for object entry disclosures.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Disclosed value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Checks if this is an array item disclosure.
    pub fn is_array_item(&self) -> bool {
        self.key.is_none()
    }

    /// Encoded form, as it appears in the compact serialization.
    pub fn encoded(&self) -> &str {
        &self.encoded
    }

    /// Canonical array form: `[salt, key, value]` or `[salt, value]`.
    pub fn to_array(&self) -> Value {
        to_array(&self.salt, self.key.as_deref(), &self.value)
    }

    /// Computes the digest of this disclosure.
    pub async fn digest(&self, hasher: &dyn Hasher) -> Result<String, Error> {
        hash_digest(hasher, &self.encoded).await
    }
}

fn to_array(salt: &str, key: Option<&str>, value: &Value) -> Value {
    match key {
        Some(key) => Value::Array(vec![salt.into(), key.into(), value.clone()]),
        None => Value::Array(vec![salt.into(), value.clone()]),
    }
}

impl fmt::Display for Disclosure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.encoded.fmt(f)
    }
}

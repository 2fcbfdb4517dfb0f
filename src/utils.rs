use base64::{prelude::BASE64_URL_SAFE_NO_PAD, Engine};
use serde_json::Value;

use crate::{Error, JsonObject, ARRAY_CLAIM_ITEM_PROPERTY_NAME, SD_CLAIM_NAME};

pub const fn is_url_safe_base64_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_')
}

pub fn base64_encode(bytes: impl AsRef<[u8]>) -> String {
    BASE64_URL_SAFE_NO_PAD.encode(bytes)
}

/// Decodes an url-safe base64 string without padding, rejecting any other
/// alphabet.
pub fn base64_decode(encoded: &str) -> Option<Vec<u8>> {
    if !encoded.bytes().all(is_url_safe_base64_char) {
        return None;
    }

    BASE64_URL_SAFE_NO_PAD.decode(encoded).ok()
}

/// Returns the digest of an array item of the form `{ "...": digest }`.
///
/// Objects without the `...` key are regular array items and return `None`.
pub fn concealed_array_item(item: &Value) -> Result<Option<&str>, Error> {
    let Value::Object(object) = item else {
        return Ok(None);
    };

    match object.get(ARRAY_CLAIM_ITEM_PROPERTY_NAME) {
        Some(Value::String(digest)) if object.len() == 1 => Ok(Some(digest)),
        Some(Value::String(_)) => Err(Error::MalformedDisclosure(format!(
            "array item marker `{ARRAY_CLAIM_ITEM_PROPERTY_NAME}` must be the only key of its object"
        ))),
        Some(other) => Err(Error::MalformedDisclosure(format!(
            "array item marker `{ARRAY_CLAIM_ITEM_PROPERTY_NAME}` is not a string: `{other}`"
        ))),
        None => Ok(None),
    }
}

/// Returns the digests listed in the `_sd` claim of the given object.
pub fn sd_digests(object: &JsonObject) -> Result<Vec<&str>, Error> {
    match object.get(SD_CLAIM_NAME) {
        None => Ok(Vec::new()),
        Some(Value::Array(digests)) => digests
            .iter()
            .map(|digest| {
                digest.as_str().ok_or_else(|| {
                    Error::MalformedDisclosure(format!(
                        "`{SD_CLAIM_NAME}` entry is not a string: `{digest}`"
                    ))
                })
            })
            .collect(),
        Some(other) => Err(Error::MalformedDisclosure(format!(
            "`{SD_CLAIM_NAME}` is not an array: `{other}`"
        ))),
    }
}

/// Checks if `name` is a key of any object in the given tree.
pub fn has_claim_deep(value: &Value, name: &str) -> bool {
    match value {
        Value::Object(object) => {
            object.contains_key(name) || object.values().any(|v| has_claim_deep(v, name))
        }
        Value::Array(items) => items.iter().any(|v| has_claim_deep(v, name)),
        _ => false,
    }
}

pub trait TryRetainMut {
    type Item;

    fn try_retain_mut<E>(
        &mut self,
        f: impl FnMut(&mut Self::Item) -> Result<bool, E>,
    ) -> Result<(), E>;
}

impl<T> TryRetainMut for Vec<T> {
    type Item = T;

    fn try_retain_mut<E>(
        &mut self,
        mut f: impl FnMut(&mut Self::Item) -> Result<bool, E>,
    ) -> Result<(), E> {
        let mut result = Ok(());

        self.retain_mut(|t| {
            if result.is_ok() {
                match f(t) {
                    Ok(retain) => retain,
                    Err(e) => {
                        result = Err(e);
                        false
                    }
                }
            } else {
                true
            }
        });

        result
    }
}

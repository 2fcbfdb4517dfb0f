use std::collections::HashSet;

use serde_json::Value;

use crate::{
    utils::{concealed_array_item, sd_digests, TryRetainMut},
    Disclosure, DisclosureMap, Error, JsonObject, SD_ALG_CLAIM_NAME, SD_CLAIM_NAME,
};

/// Rebuilds the claims of an SD-JWT payload by substituting every disclosed
/// claim back in place of its digest.
///
/// The `_sd_alg` and `_sd` claims are removed, as are concealed array items
/// with no matching disclosure. Fails if a disclosure is referenced more
/// than once, from the wrong kind of location, collides with a clear text
/// claim, or is not referenced at all.
pub fn reveal_claims(payload: &JsonObject, map: &DisclosureMap) -> Result<JsonObject, Error> {
    let mut revealer = Revealer {
        map,
        used: HashSet::new(),
    };

    let mut claims = payload.clone();
    claims.remove(SD_ALG_CLAIM_NAME);
    revealer.reveal_object(&mut claims)?;

    if let Some(unused) = map.digests().find(|digest| !revealer.used.contains(*digest)) {
        return Err(Error::MalformedDisclosure(format!(
            "disclosure `{unused}` is not referenced by the payload"
        )));
    }

    log::debug!("revealed {} disclosed claims", revealer.used.len());
    Ok(claims)
}

struct Revealer<'a> {
    map: &'a DisclosureMap,
    used: HashSet<&'a str>,
}

impl<'a> Revealer<'a> {
    /// Marks the disclosure with the given digest as used.
    fn use_digest(&mut self, digest: &str) -> Result<Option<&'a Disclosure>, Error> {
        let Some((digest, entry)) = self.map.get_key_value(digest) else {
            return Ok(None);
        };

        if !self.used.insert(digest) {
            return Err(Error::MalformedDisclosure(format!(
                "disclosure `{digest}` is referenced more than once"
            )));
        }

        Ok(Some(&entry.disclosure))
    }

    fn reveal_value(&mut self, value: &mut Value) -> Result<(), Error> {
        match value {
            Value::Object(object) => self.reveal_object(object),
            Value::Array(array) => self.reveal_array(array),
            _ => Ok(()),
        }
    }

    fn reveal_object(&mut self, object: &mut JsonObject) -> Result<(), Error> {
        for value in object.values_mut() {
            self.reveal_value(value)?;
        }

        let digests: Vec<String> = sd_digests(object)?
            .into_iter()
            .map(ToOwned::to_owned)
            .collect();
        object.remove(SD_CLAIM_NAME);

        for digest in digests {
            let Some(disclosure) = self.use_digest(&digest)? else {
                continue;
            };

            let key = disclosure.key().ok_or_else(|| {
                Error::MalformedDisclosure(format!(
                    "array item disclosure `{digest}` referenced by an `_sd` claim"
                ))
            })?;

            if object.contains_key(key) {
                return Err(Error::MalformedDisclosure(format!(
                    "disclosed claim `{key}` collides with an existing claim"
                )));
            }

            let mut value = disclosure.value().clone();
            self.reveal_value(&mut value)?;
            object.insert(key.to_owned(), value);
        }

        Ok(())
    }

    fn reveal_array(&mut self, array: &mut Vec<Value>) -> Result<(), Error> {
        array.try_retain_mut(|item| {
            let Some(digest) = concealed_array_item(item)?.map(ToOwned::to_owned) else {
                self.reveal_value(item)?;
                return Ok(true);
            };

            match self.use_digest(&digest)? {
                Some(disclosure) => {
                    if disclosure.key().is_some() {
                        return Err(Error::MalformedDisclosure(format!(
                            "object entry disclosure `{digest}` referenced by an array item"
                        )));
                    }

                    let mut value = disclosure.value().clone();
                    self.reveal_value(&mut value)?;
                    *item = value;
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }
}

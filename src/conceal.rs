use std::collections::HashSet;

use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;

use crate::{
    decoy::create_decoys, utils::sd_digests, ClaimPath, Disclosure, DisclosureFrame, Error,
    Hasher, JsonObject, ObjectFrame, SaltGenerator, ARRAY_CLAIM_ITEM_PROPERTY_NAME,
    SD_CLAIM_NAME,
};

/// Conceals the claims of `payload` selected by `frame`.
///
/// Returns the redacted payload and the disclosures of every concealed
/// claim, in the order they were created. The frame is walked depth-first,
/// one entry at a time, so the output only depends on the order of the
/// frame entries and on the injected callbacks.
///
/// Concealing a claim absent from the payload fails with
/// [`Error::FrameMismatch`]. The `_sd` claim of every object the frame adds
/// digests to is sorted.
pub async fn apply_disclosure_frame(
    payload: &JsonObject,
    frame: &ObjectFrame,
    salt_generator: &dyn SaltGenerator,
    hasher: &dyn Hasher,
) -> Result<(JsonObject, Vec<Disclosure>), Error> {
    if frame.is_disclosed() {
        return Err(Error::invalid_frame(
            &ClaimPath::new(),
            "the root object cannot be concealed",
        ));
    }

    let mut concealer = Concealer {
        salt_generator,
        hasher,
        disclosures: Vec::new(),
    };

    let redacted = concealer
        .conceal_object(ClaimPath::new(), payload, frame)
        .await?;

    log::debug!(
        "concealed {} claims behind disclosures",
        concealer.disclosures.len()
    );

    Ok((redacted, concealer.disclosures))
}

struct Concealer<'a> {
    salt_generator: &'a dyn SaltGenerator,
    hasher: &'a dyn Hasher,
    disclosures: Vec<Disclosure>,
}

impl<'a> Concealer<'a> {
    /// Creates a disclosure for the given claim and returns its digest.
    async fn disclose(
        &mut self,
        path: &ClaimPath,
        key: Option<&str>,
        value: Value,
    ) -> Result<String, Error> {
        let salt = self
            .salt_generator
            .generate()
            .await
            .map_err(Error::SaltGenerator)?;

        let disclosure = Disclosure::new(salt, key.map(ToOwned::to_owned), value);
        let digest = disclosure.digest(self.hasher).await?;
        log::trace!("concealed `{path}` as {digest}");

        self.disclosures.push(disclosure);
        Ok(digest)
    }

    fn conceal_object<'b>(
        &'b mut self,
        path: ClaimPath,
        object: &'b JsonObject,
        frame: &'b ObjectFrame,
    ) -> BoxFuture<'b, Result<JsonObject, Error>> {
        async move {
            let mut redacted = object.clone();
            let mut digests = Vec::new();
            let mut concealed_keys = HashSet::new();

            for (key, entry) in frame.entries() {
                let entry_path = path.with_key(key);

                if key == SD_CLAIM_NAME {
                    return Err(Error::invalid_frame(
                        &entry_path,
                        "the `_sd` claim cannot be framed",
                    ));
                }

                match entry {
                    DisclosureFrame::Flag(false) => (),
                    DisclosureFrame::Flag(true) => {
                        let value = object
                            .get(key)
                            .ok_or_else(|| frame_mismatch(&entry_path, object))?;

                        let digest = self.disclose(&entry_path, Some(key), value.clone()).await?;
                        digests.push(digest);
                        concealed_keys.insert(key.as_str());
                    }
                    DisclosureFrame::Object(nested) => {
                        let value = object
                            .get(key)
                            .ok_or_else(|| frame_mismatch(&entry_path, object))?;

                        let Value::Object(child) = value else {
                            return Err(Error::invalid_frame(
                                &entry_path,
                                format!("object frame applied to `{value}`"),
                            ));
                        };

                        let redacted_child = self
                            .conceal_object(entry_path.clone(), child, nested)
                            .await?;

                        if nested.is_disclosed() {
                            let digest = self
                                .disclose(&entry_path, Some(key), Value::Object(redacted_child))
                                .await?;
                            digests.push(digest);
                            concealed_keys.insert(key.as_str());
                        } else {
                            redacted.insert(key.clone(), Value::Object(redacted_child));
                        }
                    }
                    DisclosureFrame::Array(items) => {
                        let value = object
                            .get(key)
                            .ok_or_else(|| frame_mismatch(&entry_path, object))?;

                        let Value::Array(array) = value else {
                            return Err(Error::invalid_frame(
                                &entry_path,
                                format!("array frame applied to `{value}`"),
                            ));
                        };

                        let redacted_array =
                            self.conceal_array(entry_path, array, items).await?;
                        redacted.insert(key.clone(), Value::Array(redacted_array));
                    }
                }
            }

            digests.extend(
                create_decoys(frame.decoy_count(), self.salt_generator, self.hasher).await?,
            );

            let mut redacted: JsonObject = redacted
                .into_iter()
                .filter(|(key, _)| !concealed_keys.contains(key.as_str()))
                .collect();

            add_digests(&mut redacted, digests)?;
            Ok(redacted)
        }
        .boxed()
    }

    fn conceal_array<'b>(
        &'b mut self,
        path: ClaimPath,
        array: &'b [Value],
        frames: &'b [DisclosureFrame],
    ) -> BoxFuture<'b, Result<Vec<Value>, Error>> {
        async move {
            let mut redacted = array.to_vec();

            for (i, frame) in frames.iter().enumerate() {
                let item_path = path.with_index(i);
                let item = match (frame, array.get(i)) {
                    (DisclosureFrame::Flag(false), _) => continue,
                    (_, Some(item)) => item,
                    (_, None) => {
                        return Err(Error::FrameMismatch {
                            path: item_path,
                            payload: Value::Array(array.to_vec()),
                        })
                    }
                };

                match frame {
                    DisclosureFrame::Flag(false) => (),
                    DisclosureFrame::Flag(true) => {
                        let digest = self.disclose(&item_path, None, item.clone()).await?;
                        redacted[i] = concealed_array_item(digest);
                    }
                    DisclosureFrame::Object(nested) => {
                        let Value::Object(child) = item else {
                            return Err(Error::invalid_frame(
                                &item_path,
                                format!("object frame applied to `{item}`"),
                            ));
                        };

                        let redacted_child = self
                            .conceal_object(item_path.clone(), child, nested)
                            .await?;

                        redacted[i] = if nested.is_disclosed() {
                            let digest = self
                                .disclose(&item_path, None, Value::Object(redacted_child))
                                .await?;
                            concealed_array_item(digest)
                        } else {
                            Value::Object(redacted_child)
                        };
                    }
                    DisclosureFrame::Array(items) => {
                        let Value::Array(child) = item else {
                            return Err(Error::invalid_frame(
                                &item_path,
                                format!("array frame applied to `{item}`"),
                            ));
                        };

                        redacted[i] =
                            Value::Array(self.conceal_array(item_path, child, items).await?);
                    }
                }
            }

            Ok(redacted)
        }
        .boxed()
    }
}

fn frame_mismatch(path: &ClaimPath, object: &JsonObject) -> Error {
    Error::FrameMismatch {
        path: path.clone(),
        payload: Value::Object(object.clone()),
    }
}

fn concealed_array_item(digest: String) -> Value {
    let mut object = JsonObject::new();
    object.insert(ARRAY_CLAIM_ITEM_PROPERTY_NAME.into(), digest.into());
    Value::Object(object)
}

/// Adds the given digests to the `_sd` claim of `object`, keeping any digest
/// already there, and sorts it.
fn add_digests(object: &mut JsonObject, digests: Vec<String>) -> Result<(), Error> {
    if digests.is_empty() {
        return Ok(());
    }

    let mut sd: Vec<String> = sd_digests(object)?
        .into_iter()
        .map(ToOwned::to_owned)
        .collect();
    sd.extend(digests);
    sd.sort_unstable();

    object.insert(
        SD_CLAIM_NAME.to_owned(),
        Value::Array(sd.into_iter().map(Value::String).collect()),
    );

    Ok(())
}

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

use crate::{
    utils::{concealed_array_item, sd_digests},
    Disclosure, Error, Hasher, JsonObject, PathSegment, SD_ALG_CLAIM_NAME, SD_CLAIM_NAME,
};

/// Disclosure, with the disclosures structurally containing it.
#[derive(Debug, Clone, PartialEq)]
pub struct DisclosureMapEntry {
    /// The disclosure.
    pub disclosure: Disclosure,

    /// Disclosures whose value references this disclosure, directly or
    /// through other disclosures, nearest first.
    pub parent_disclosures: Vec<Disclosure>,

    /// Digests of `parent_disclosures`, in the same order.
    pub parent_digests: Vec<String>,
}

/// Disclosures indexed by digest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisclosureMap(IndexMap<String, DisclosureMapEntry>);

impl DisclosureMap {
    /// Hashes the given disclosures and relates them to each other.
    ///
    /// A disclosure is the parent of another if its value references the
    /// other's digest, either in an `_sd` claim or in an array item marker,
    /// at any depth.
    pub async fn build(disclosures: &[Disclosure], hasher: &dyn Hasher) -> Result<Self, Error> {
        let mut digests = Vec::with_capacity(disclosures.len());
        for disclosure in disclosures {
            digests.push(disclosure.digest(hasher).await?);
        }

        let mut seen = IndexSet::with_capacity(digests.len());
        for digest in &digests {
            if !seen.insert(digest.as_str()) {
                return Err(Error::MalformedDisclosure(format!(
                    "disclosure with digest `{digest}` is given more than once"
                )));
            }
        }

        // Child digest to parent disclosure index.
        let mut parents = HashMap::new();
        for (i, disclosure) in disclosures.iter().enumerate() {
            let mut children = Vec::new();
            referenced_digests(disclosure.value(), &mut children)?;
            for child in children {
                parents.entry(child).or_insert(i);
            }
        }

        let mut map = IndexMap::with_capacity(disclosures.len());
        for (i, disclosure) in disclosures.iter().enumerate() {
            let mut parent_disclosures = Vec::new();
            let mut parent_digests = Vec::new();
            let mut visited = vec![i];

            let mut current = digests[i].as_str();
            while let Some(&p) = parents.get(current) {
                if visited.contains(&p) {
                    break;
                }

                visited.push(p);
                parent_disclosures.push(disclosures[p].clone());
                parent_digests.push(digests[p].clone());
                current = digests[p].as_str();
            }

            map.insert(
                digests[i].clone(),
                DisclosureMapEntry {
                    disclosure: disclosure.clone(),
                    parent_disclosures,
                    parent_digests,
                },
            );
        }

        Ok(Self(map))
    }

    /// Returns the entry of the disclosure with the given digest.
    pub fn get(&self, digest: &str) -> Option<&DisclosureMapEntry> {
        self.0.get(digest)
    }

    /// Returns the entry of the disclosure with the given digest, along with
    /// the digest as stored in the map.
    pub fn get_key_value(&self, digest: &str) -> Option<(&str, &DisclosureMapEntry)> {
        self.0
            .get_key_value(digest)
            .map(|(digest, entry)| (digest.as_str(), entry))
    }

    /// Checks if a disclosure has the given digest.
    pub fn contains(&self, digest: &str) -> bool {
        self.0.contains_key(digest)
    }

    /// Iterates over the entries, in disclosure order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DisclosureMapEntry)> {
        self.0.iter().map(|(digest, entry)| (digest.as_str(), entry))
    }

    /// Digests, in disclosure order.
    pub fn digests(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of disclosures.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Checks if there are no disclosures.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Collects every digest referenced by `value`, at any depth.
fn referenced_digests(value: &Value, digests: &mut Vec<String>) -> Result<(), Error> {
    match value {
        Value::Object(object) => {
            digests.extend(sd_digests(object)?.into_iter().map(ToOwned::to_owned));
            for (key, value) in object {
                if key != SD_CLAIM_NAME {
                    referenced_digests(value, digests)?;
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                match concealed_array_item(item)? {
                    Some(digest) => digests.push(digest.to_owned()),
                    None => referenced_digests(item, digests)?,
                }
            }
        }
        _ => (),
    }

    Ok(())
}

/// Tree shaped like the revealed claims, giving the digest of every
/// disclosed claim.
///
/// Claims that are neither disclosed nor contain disclosed claims are
/// absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadMapping {
    /// Disclosed claim with no disclosed claims inside.
    Digest(String),

    /// Object containing disclosed claims.
    Object {
        /// Digest of the object, if it is itself disclosed.
        digest: Option<String>,

        /// Entries containing or being disclosed claims.
        entries: IndexMap<String, PayloadMapping>,
    },

    /// Array containing disclosed claims.
    Array {
        /// Digest of the array, if it is itself disclosed.
        digest: Option<String>,

        /// Array items, aligned with the revealed array. `None` for items
        /// with no disclosure.
        items: Vec<Option<PayloadMapping>>,
    },
}

impl PayloadMapping {
    /// Digest of this claim, if it is disclosed.
    pub fn digest(&self) -> Option<&str> {
        match self {
            Self::Digest(digest) => Some(digest),
            Self::Object { digest, .. } | Self::Array { digest, .. } => digest.as_deref(),
        }
    }

    /// Returns the mapping at the given path.
    pub fn get(&self, path: &[PathSegment]) -> Option<&Self> {
        path.iter()
            .try_fold(self, |mapping, segment| match (segment, mapping) {
                (PathSegment::Key(key), Self::Object { entries, .. }) => entries.get(key),
                (PathSegment::Index(i), Self::Array { items, .. }) => items.get(*i)?.as_ref(),
                _ => None,
            })
    }

    /// Adds the digest of this claim and of every disclosed claim it contains.
    pub fn collect_digests(&self, digests: &mut IndexSet<String>) {
        if let Some(digest) = self.digest() {
            digests.insert(digest.to_owned());
        }

        match self {
            Self::Digest(_) => (),
            Self::Object { entries, .. } => {
                for mapping in entries.values() {
                    mapping.collect_digests(digests)
                }
            }
            Self::Array { items, .. } => {
                for mapping in items.iter().flatten() {
                    mapping.collect_digests(digests)
                }
            }
        }
    }
}

/// Maps the revealed claims of `payload` to the digests of their disclosures.
///
/// Concealed array items with no disclosure are skipped, so that array
/// indices match the revealed claims.
pub fn payload_disclosure_mapping(
    payload: &JsonObject,
    map: &DisclosureMap,
) -> Result<PayloadMapping, Error> {
    let mapping = map_object(payload, None, map)?;
    Ok(mapping.unwrap_or_else(|| PayloadMapping::Object {
        digest: None,
        entries: IndexMap::new(),
    }))
}

fn map_value(
    value: &Value,
    digest: Option<&str>,
    map: &DisclosureMap,
) -> Result<Option<PayloadMapping>, Error> {
    match value {
        Value::Object(object) => map_object(object, digest, map),
        Value::Array(items) => map_array(items, digest, map),
        _ => Ok(digest.map(|d| PayloadMapping::Digest(d.to_owned()))),
    }
}

fn map_object(
    object: &JsonObject,
    digest: Option<&str>,
    map: &DisclosureMap,
) -> Result<Option<PayloadMapping>, Error> {
    let mut entries = IndexMap::new();

    for (key, value) in object {
        if key == SD_CLAIM_NAME || key == SD_ALG_CLAIM_NAME {
            continue;
        }

        if let Some(mapping) = map_value(value, None, map)? {
            entries.insert(key.clone(), mapping);
        }
    }

    for child in sd_digests(object)? {
        let Some(entry) = map.get(child) else {
            continue;
        };

        let key = entry.disclosure.key().ok_or_else(|| {
            Error::MalformedDisclosure(format!(
                "array item disclosure `{child}` referenced by an `_sd` claim"
            ))
        })?;

        if let Some(mapping) = map_value(entry.disclosure.value(), Some(child), map)? {
            entries.insert(key.to_owned(), mapping);
        }
    }

    Ok(match (digest, entries.is_empty()) {
        (None, true) => None,
        (Some(digest), true) => Some(PayloadMapping::Digest(digest.to_owned())),
        (digest, false) => Some(PayloadMapping::Object {
            digest: digest.map(ToOwned::to_owned),
            entries,
        }),
    })
}

fn map_array(
    array: &[Value],
    digest: Option<&str>,
    map: &DisclosureMap,
) -> Result<Option<PayloadMapping>, Error> {
    let mut items = Vec::with_capacity(array.len());

    for item in array {
        match concealed_array_item(item)? {
            Some(child) => {
                let Some(entry) = map.get(child) else {
                    continue;
                };

                if entry.disclosure.key().is_some() {
                    return Err(Error::MalformedDisclosure(format!(
                        "object entry disclosure `{child}` referenced by an array item"
                    )));
                }

                items.push(map_value(entry.disclosure.value(), Some(child), map)?);
            }
            None => items.push(map_value(item, None, map)?),
        }
    }

    Ok(match (digest, items.iter().all(Option::is_none)) {
        (None, true) => None,
        (Some(digest), true) => Some(PayloadMapping::Digest(digest.to_owned())),
        (digest, false) => Some(PayloadMapping::Array {
            digest: digest.map(ToOwned::to_owned),
            items,
        }),
    })
}

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::{ClaimPath, Error};

/// Reserved disclosure frame key giving the number of decoy digests to add
/// to an object.
pub const DECOY_COUNT_KEY: &str = "__decoyCount";

/// Reserved disclosure frame key turning a nested object into a disclosure
/// once its own members have been concealed.
pub const DISCLOSE_KEY: &str = "__disclose";

/// Disclosure frame of an object.
///
/// Selects which entries of the object are concealed behind disclosures and
/// how many decoys are added to its `_sd` claim.
///
/// In JSON form:
///
/// ```json
/// {
///   "given_name": true,
///   "address": { "__disclose": true, "street_address": true },
///   "nationalities": [true, false],
///   "__decoyCount": 2
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub struct ObjectFrame {
    entries: IndexMap<String, DisclosureFrame>,
    decoy_count: usize,
    disclose: bool,
}

impl ObjectFrame {
    /// Creates an empty frame, concealing nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Conceals the `key` entry.
    pub fn conceal(self, key: impl Into<String>) -> Self {
        self.with(key, true)
    }

    /// Sets the frame of the `key` entry.
    pub fn with(mut self, key: impl Into<String>, frame: impl Into<DisclosureFrame>) -> Self {
        self.entries.insert(key.into(), frame.into());
        self
    }

    /// Adds `count` decoy digests to the object.
    pub fn with_decoys(mut self, count: usize) -> Self {
        self.decoy_count = count;
        self
    }

    /// Conceals the whole object (once its entries have been concealed)
    /// behind a disclosure of its own.
    pub fn disclosed(mut self) -> Self {
        self.disclose = true;
        self
    }

    /// Entry frames.
    pub fn entries(&self) -> &IndexMap<String, DisclosureFrame> {
        &self.entries
    }

    /// Returns the frame of the `key` entry.
    pub fn get(&self, key: &str) -> Option<&DisclosureFrame> {
        self.entries.get(key)
    }

    /// Number of decoy digests to add.
    pub fn decoy_count(&self) -> usize {
        self.decoy_count
    }

    /// Checks if the object itself is concealed.
    pub fn is_disclosed(&self) -> bool {
        self.disclose
    }

    /// Checks if this frame, or any frame nested in it, adds decoys.
    pub fn has_decoys(&self) -> bool {
        self.decoy_count > 0 || self.entries.values().any(DisclosureFrame::has_decoys)
    }

    /// Parses a JSON disclosure frame.
    pub fn from_value(value: &Value) -> Result<Self, Error> {
        match value {
            Value::Object(object) => parse_object_frame(&ClaimPath::new(), object),
            other => Err(Error::invalid_frame(
                &ClaimPath::new(),
                format!("expected an object, found `{other}`"),
            )),
        }
    }
}

impl TryFrom<Value> for ObjectFrame {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(&value)
    }
}

/// Disclosure frame of a claim.
#[derive(Debug, Clone, PartialEq)]
pub enum DisclosureFrame {
    /// `true` conceals the claim, `false` leaves it in clear text.
    Flag(bool),

    /// Frame of an object claim.
    Object(ObjectFrame),

    /// Frames of an array claim, aligned with the array items.
    Array(Vec<DisclosureFrame>),
}

impl DisclosureFrame {
    fn has_decoys(&self) -> bool {
        match self {
            Self::Flag(_) => false,
            Self::Object(frame) => frame.has_decoys(),
            Self::Array(items) => items.iter().any(Self::has_decoys),
        }
    }
}

impl From<bool> for DisclosureFrame {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<ObjectFrame> for DisclosureFrame {
    fn from(value: ObjectFrame) -> Self {
        Self::Object(value)
    }
}

impl From<Vec<DisclosureFrame>> for DisclosureFrame {
    fn from(value: Vec<DisclosureFrame>) -> Self {
        Self::Array(value)
    }
}

fn parse_object_frame(
    path: &ClaimPath,
    object: &serde_json::Map<String, Value>,
) -> Result<ObjectFrame, Error> {
    let mut frame = ObjectFrame::new();

    for (key, value) in object {
        match key.as_str() {
            DECOY_COUNT_KEY => {
                let count = value.as_u64().ok_or_else(|| {
                    Error::invalid_frame(
                        &path.with_key(key),
                        format!("decoy count must be a non-negative integer, found `{value}`"),
                    )
                })?;

                frame.decoy_count = usize::try_from(count).map_err(|_| {
                    Error::invalid_frame(&path.with_key(key), "decoy count is too large")
                })?;
            }
            DISCLOSE_KEY => {
                frame.disclose = value.as_bool().ok_or_else(|| {
                    Error::invalid_frame(
                        &path.with_key(key),
                        format!("expected a boolean, found `{value}`"),
                    )
                })?;
            }
            _ => {
                let entry_path = path.with_key(key);
                frame
                    .entries
                    .insert(key.clone(), parse_frame(&entry_path, value)?);
            }
        }
    }

    Ok(frame)
}

fn parse_frame(path: &ClaimPath, value: &Value) -> Result<DisclosureFrame, Error> {
    match value {
        Value::Bool(b) => Ok(DisclosureFrame::Flag(*b)),
        Value::Object(object) => parse_object_frame(path, object).map(DisclosureFrame::Object),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| parse_frame(&path.with_index(i), item))
            .collect::<Result<_, _>>()
            .map(DisclosureFrame::Array),
        other => Err(Error::invalid_frame(
            path,
            format!("expected a boolean, object or array, found `{other}`"),
        )),
    }
}

/// Presentation frame.
///
/// Selects which of the disclosable claims a holder reveals. Same shape as
/// the revealed claims, with `true` on the revealed leaves.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub enum PresentationFrame {
    /// `true` reveals the claim (and everything under it).
    Flag(bool),

    /// Frame of an object claim.
    Object(IndexMap<String, PresentationFrame>),

    /// Frames of an array claim, aligned with the array items.
    Array(Vec<PresentationFrame>),
}

impl Default for PresentationFrame {
    fn default() -> Self {
        Self::Object(IndexMap::new())
    }
}

impl PresentationFrame {
    /// Parses a JSON presentation frame.
    ///
    /// The top level must be an object.
    pub fn from_value(value: &Value) -> Result<Self, Error> {
        match value {
            Value::Object(_) => parse_presentation_frame(&ClaimPath::new(), value),
            other => Err(Error::invalid_frame(
                &ClaimPath::new(),
                format!("expected an object, found `{other}`"),
            )),
        }
    }

    /// Returns the path of every `true` leaf, in frame order.
    pub fn revealed_paths(&self) -> Vec<ClaimPath> {
        let mut paths = Vec::new();
        self.collect_revealed_paths(&mut ClaimPath::new(), &mut paths);
        paths
    }

    fn collect_revealed_paths(&self, path: &mut ClaimPath, paths: &mut Vec<ClaimPath>) {
        match self {
            Self::Flag(true) => paths.push(path.clone()),
            Self::Flag(false) => (),
            Self::Object(entries) => {
                for (key, frame) in entries {
                    path.push(key.as_str());
                    frame.collect_revealed_paths(path, paths);
                    path.pop();
                }
            }
            Self::Array(items) => {
                for (i, frame) in items.iter().enumerate() {
                    path.push(i);
                    frame.collect_revealed_paths(path, paths);
                    path.pop();
                }
            }
        }
    }
}

impl TryFrom<Value> for PresentationFrame {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(&value)
    }
}

fn parse_presentation_frame(path: &ClaimPath, value: &Value) -> Result<PresentationFrame, Error> {
    match value {
        Value::Bool(b) => Ok(PresentationFrame::Flag(*b)),
        Value::Object(object) => object
            .iter()
            .map(|(key, value)| {
                let entry_path = path.with_key(key);
                if key == DECOY_COUNT_KEY {
                    return Err(Error::invalid_frame(
                        &entry_path,
                        "decoys are not allowed in a presentation frame",
                    ));
                }

                Ok((key.clone(), parse_presentation_frame(&entry_path, value)?))
            })
            .collect::<Result<_, _>>()
            .map(PresentationFrame::Object),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| parse_presentation_frame(&path.with_index(i), item))
            .collect::<Result<_, _>>()
            .map(PresentationFrame::Array),
        other => Err(Error::invalid_frame(
            path,
            format!("expected a boolean, found `{other}`"),
        )),
    }
}

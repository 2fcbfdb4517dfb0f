use std::fmt;

use serde_json::Value;

use crate::JsonObject;

/// Segment of a [`ClaimPath`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathSegment {
    /// Object entry key.
    Key(String),

    /// Array index.
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(value: &str) -> Self {
        Self::Key(value.to_owned())
    }
}

impl From<String> for PathSegment {
    fn from(value: String) -> Self {
        Self::Key(value)
    }
}

impl From<usize> for PathSegment {
    fn from(value: usize) -> Self {
        Self::Index(value)
    }
}

/// Path to a claim inside a claim tree.
///
/// Displayed as a JSON pointer (e.g. `/address/street_address`,
/// `/nationalities/0`).
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClaimPath(Vec<PathSegment>);

impl ClaimPath {
    /// Creates an empty path, pointing to the root of the claim tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the segments of this path.
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Checks if this path points to the root.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of segments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Appends a segment.
    pub fn push(&mut self, segment: impl Into<PathSegment>) {
        self.0.push(segment.into())
    }

    /// Removes the last segment.
    pub fn pop(&mut self) -> Option<PathSegment> {
        self.0.pop()
    }

    /// Returns a copy of this path with the given object key appended.
    pub fn with_key(&self, key: &str) -> Self {
        let mut path = self.clone();
        path.push(key);
        path
    }

    /// Returns a copy of this path with the given array index appended.
    pub fn with_index(&self, index: usize) -> Self {
        let mut path = self.clone();
        path.push(index);
        path
    }

    /// Looks up the value this path points to.
    pub fn resolve<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        self.0
            .iter()
            .try_fold(value, |value, segment| match (segment, value) {
                (PathSegment::Key(key), Value::Object(object)) => object.get(key),
                (PathSegment::Index(i), Value::Array(array)) => array.get(*i),
                _ => None,
            })
    }

    /// Looks up the value this path points to, starting from an object.
    ///
    /// Returns `None` for the empty path.
    pub fn resolve_in<'a>(&self, object: &'a JsonObject) -> Option<&'a Value> {
        let (first, rest) = self.0.split_first()?;
        let value = match first {
            PathSegment::Key(key) => object.get(key)?,
            PathSegment::Index(_) => return None,
        };

        ClaimPath::from(rest.to_vec()).resolve(value)
    }
}

impl From<Vec<PathSegment>> for ClaimPath {
    fn from(value: Vec<PathSegment>) -> Self {
        Self(value)
    }
}

impl<S: Into<PathSegment>> FromIterator<S> for ClaimPath {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for ClaimPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }

        for segment in &self.0 {
            match segment {
                PathSegment::Key(key) => {
                    write!(f, "/{}", key.replace('~', "~0").replace('/', "~1"))?
                }
                PathSegment::Index(i) => write!(f, "/{i}")?,
            }
        }

        Ok(())
    }
}

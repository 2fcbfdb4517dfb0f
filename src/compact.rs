use serde_json::Value;

use crate::{
    utils::{base64_decode, base64_encode},
    Error, JsonObject,
};

/// Parts of a compact SD-JWT:
/// `<header>.<payload>.<signature>~<disclosure>~...~<disclosure>~[<kb-jwt>]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactParts<'a> {
    /// Issuer signed JWT.
    pub jwt: &'a str,

    /// Encoded disclosures.
    pub disclosures: Vec<&'a str>,

    /// Compact key binding JWT.
    pub key_binding: Option<&'a str>,
}

/// Splits a compact SD-JWT into its parts.
///
/// A compact SD-JWT ending with `~` has no key binding. Otherwise, if it has
/// at least one `~`, the last segment is the key binding JWT.
pub fn split_compact(compact: &str) -> Result<CompactParts<'_>, Error> {
    let mut segments: Vec<&str> = compact.split('~').collect();
    let jwt = segments.remove(0);
    split_jwt(jwt)?;

    let key_binding = match segments.pop() {
        Some("") | None => None,
        Some(key_binding) => Some(key_binding),
    };

    Ok(CompactParts {
        jwt,
        disclosures: segments,
        key_binding,
    })
}

/// Splits a compact JWT into its header, payload and signature segments.
pub fn split_jwt(jwt: &str) -> Result<(&str, &str, &str), Error> {
    let mut parts = jwt.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(payload), Some(signature), None) => Ok((header, payload, signature)),
        _ => Err(Error::MalformedCompact(format!(
            "a compact JWT must have exactly 3 segments: `{jwt}`"
        ))),
    }
}

/// Joins the parts of a compact SD-JWT.
///
/// Disclosures are each followed by `~`, and the key binding JWT is
/// appended last, after a `~` if no disclosure precedes it.
pub fn join_compact<D: AsRef<str>>(
    jwt: &str,
    disclosures: &[D],
    key_binding: Option<&str>,
) -> String {
    let mut compact = jwt.to_owned();

    if !disclosures.is_empty() {
        compact.push('~');
        for disclosure in disclosures {
            compact.push_str(disclosure.as_ref());
            compact.push('~');
        }
    }

    if let Some(key_binding) = key_binding {
        if disclosures.is_empty() {
            compact.push('~');
        }

        compact.push_str(key_binding);
    }

    compact
}

/// Encodes a JSON object as url-safe base64 of its minified serialization.
pub(crate) fn encode_json_object(object: &JsonObject) -> Result<String, Error> {
    Ok(base64_encode(serde_json::to_string(object)?))
}

/// Decodes a JWT segment holding a JSON object.
pub(crate) fn decode_json_object(segment: &str, what: &str) -> Result<JsonObject, Error> {
    let bytes = base64_decode(segment)
        .ok_or_else(|| Error::MalformedCompact(format!("{what} is not url-safe base64")))?;

    match serde_json::from_slice(&bytes) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(_) => Err(Error::MalformedCompact(format!("{what} is not a JSON object"))),
        Err(e) => Err(Error::MalformedCompact(format!("{what} is not JSON: {e}"))),
    }
}

/// Decodes a JWT signature segment. An empty segment means no signature.
pub(crate) fn decode_signature(segment: &str) -> Result<Option<Vec<u8>>, Error> {
    if segment.is_empty() {
        return Ok(None);
    }

    base64_decode(segment)
        .map(Some)
        .ok_or_else(|| Error::MalformedCompact("signature is not url-safe base64".to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const JWT: &str = "eyJhbGciOiJFZERTQSIsInR5cCI6IkpXVCJ9.e30.c2ln";

    #[test]
    fn split_without_key_binding() {
        let compact = format!("{JWT}~d1~d2~");
        let parts = split_compact(&compact).unwrap();
        assert_eq!(parts.jwt, JWT);
        assert_eq!(parts.disclosures, ["d1", "d2"]);
        assert_eq!(parts.key_binding, None);
    }

    #[test]
    fn split_with_key_binding() {
        let compact = format!("{JWT}~d1~a.b.c");
        let parts = split_compact(&compact).unwrap();
        assert_eq!(parts.disclosures, ["d1"]);
        assert_eq!(parts.key_binding, Some("a.b.c"));

        let compact = format!("{JWT}~a.b.c");
        let parts = split_compact(&compact).unwrap();
        assert!(parts.disclosures.is_empty());
        assert_eq!(parts.key_binding, Some("a.b.c"));
    }

    #[test]
    fn split_plain_jwt() {
        for compact in [JWT.to_owned(), format!("{JWT}~")] {
            let parts = split_compact(&compact).unwrap();
            assert_eq!(parts.jwt, JWT);
            assert!(parts.disclosures.is_empty());
            assert_eq!(parts.key_binding, None);
        }
    }

    #[test]
    fn wrong_segment_count() {
        for compact in ["a.b~d~", "a.b.c.d~d~", "abc", ""] {
            assert!(matches!(
                split_compact(compact),
                Err(Error::MalformedCompact(_))
            ));
        }
    }

    #[test]
    fn join() {
        let none: [&str; 0] = [];
        assert_eq!(join_compact(JWT, &none, None), JWT);
        assert_eq!(join_compact(JWT, &["d1", "d2"], None), format!("{JWT}~d1~d2~"));
        assert_eq!(
            join_compact(JWT, &["d1"], Some("a.b.c")),
            format!("{JWT}~d1~a.b.c")
        );
        assert_eq!(join_compact(JWT, &none, Some("a.b.c")), format!("{JWT}~a.b.c"));
    }

    #[test]
    fn json_segments() {
        let header = decode_json_object("eyJhbGciOiJFZERTQSIsInR5cCI6IkpXVCJ9", "header").unwrap();
        assert_eq!(header["alg"], "EdDSA");
        assert_eq!(
            encode_json_object(&header).unwrap(),
            "eyJhbGciOiJFZERTQSIsInR5cCI6IkpXVCJ9"
        );

        // `[]`
        assert!(matches!(
            decode_json_object("W10", "payload"),
            Err(Error::MalformedCompact(_))
        ));
        assert!(matches!(
            decode_json_object("e30=", "payload"),
            Err(Error::MalformedCompact(_))
        ));

        assert_eq!(decode_signature("").unwrap(), None);
        assert_eq!(decode_signature("c2ln").unwrap().unwrap(), b"sig");
    }
}

use indexmap::IndexSet;

use crate::{
    map::payload_disclosure_mapping, Disclosure, DisclosureMap, Error, Hasher, JsonObject,
    PresentationFrame,
};

/// Selects the disclosures needed to reveal the claims selected by `frame`.
///
/// `signed_payload` is the payload of the SD-JWT and `pretty_payload` its
/// revealed claims. See [`select_disclosures_with_map`].
pub async fn select_disclosures(
    signed_payload: &JsonObject,
    frame: &PresentationFrame,
    pretty_payload: &JsonObject,
    hasher: &dyn Hasher,
    disclosures: &[Disclosure],
) -> Result<Vec<Disclosure>, Error> {
    let map = DisclosureMap::build(disclosures, hasher).await?;
    select_disclosures_with_map(signed_payload, frame, pretty_payload, &map)
}

/// Selects the disclosures needed to reveal the claims selected by `frame`,
/// using an already built disclosure map.
///
/// Every revealed path must exist in `pretty_payload`, otherwise
/// [`Error::PresentationPathNotFound`] is returned. Revealing a claim selects
/// its own disclosure, the disclosures of every claim under it, and the
/// disclosures of every disclosed claim containing it. Revealing a clear text
/// claim nested inside a disclosed claim selects the disclosure of the
/// nearest disclosed ancestor. Clear text claims outside of any disclosure
/// need no disclosure.
///
/// Disclosures are returned in selection order.
pub fn select_disclosures_with_map(
    signed_payload: &JsonObject,
    frame: &PresentationFrame,
    pretty_payload: &JsonObject,
    map: &DisclosureMap,
) -> Result<Vec<Disclosure>, Error> {
    let mapping = payload_disclosure_mapping(signed_payload, map)?;
    let mut selected = IndexSet::new();

    for path in frame.revealed_paths() {
        if !path.is_empty() && path.resolve_in(pretty_payload).is_none() {
            return Err(Error::PresentationPathNotFound(path));
        }

        let segments = path.segments();
        if let Some(node) = mapping.get(segments) {
            node.collect_digests(&mut selected);
            continue;
        }

        let ancestor = (0..segments.len())
            .rev()
            .find_map(|len| mapping.get(&segments[..len])?.digest());

        match ancestor {
            Some(digest) => {
                log::trace!("`{path}` is revealed through its ancestor {digest}");
                selected.insert(digest.to_owned());
            }
            None => log::trace!("`{path}` is not disclosable"),
        }
    }

    let requested: Vec<String> = selected.iter().cloned().collect();
    for digest in requested {
        if let Some(entry) = map.get(&digest) {
            selected.extend(entry.parent_digests.iter().cloned());
        }
    }

    let disclosures: Vec<Disclosure> = selected
        .iter()
        .filter_map(|digest| map.get(digest))
        .map(|entry| entry.disclosure.clone())
        .collect();

    log::debug!(
        "selected {} of {} disclosures",
        disclosures.len(),
        map.len()
    );

    Ok(disclosures)
}

#[cfg(all(test, feature = "sha2"))]
mod tests {
    use super::*;
    use crate::{
        apply_disclosure_frame, reveal_claims, test_utils::SequentialSalts, ObjectFrame, SdAlg,
    };
    use serde_json::{json, Value};

    struct Issued {
        payload: JsonObject,
        pretty: JsonObject,
        disclosures: Vec<Disclosure>,
    }

    async fn issue(payload: Value, frame: Value) -> Issued {
        let frame = ObjectFrame::from_value(&frame).unwrap();
        let (payload, disclosures) = apply_disclosure_frame(
            payload.as_object().unwrap(),
            &frame,
            &SequentialSalts::default(),
            &SdAlg::Sha256,
        )
        .await
        .unwrap();

        let map = DisclosureMap::build(&disclosures, &SdAlg::Sha256)
            .await
            .unwrap();
        let pretty = reveal_claims(&payload, &map).unwrap();

        Issued {
            payload,
            pretty,
            disclosures,
        }
    }

    async fn select(issued: &Issued, frame: Value) -> Result<Vec<Disclosure>, Error> {
        select_disclosures(
            &issued.payload,
            &PresentationFrame::from_value(&frame).unwrap(),
            &issued.pretty,
            &SdAlg::Sha256,
            &issued.disclosures,
        )
        .await
    }

    #[async_std::test]
    async fn nested_minimal() {
        let issued = issue(
            json!({ "a": { "b": 1, "c": 2 } }),
            json!({ "a": { "__disclose": true, "b": true, "c": true } }),
        )
        .await;

        // b, c, a
        let selected = select(&issued, json!({ "a": { "b": true } })).await.unwrap();
        assert_eq!(
            selected,
            [issued.disclosures[0].clone(), issued.disclosures[2].clone()]
        );
    }

    #[async_std::test]
    async fn whole_subtree() {
        let issued = issue(
            json!({ "a": { "b": 1, "c": 2, "d": 3 } }),
            json!({ "a": { "__disclose": true, "b": true, "c": true } }),
        )
        .await;

        // b, c, a. Members of `a` follow its sorted `_sd` claim, where the
        // digest of `c` comes first.
        let selected = select(&issued, json!({ "a": true })).await.unwrap();
        assert_eq!(
            selected,
            [
                issued.disclosures[2].clone(),
                issued.disclosures[1].clone(),
                issued.disclosures[0].clone()
            ]
        );

        // `d` is clear text inside `a`.
        let selected = select(&issued, json!({ "a": { "d": true } }))
            .await
            .unwrap();
        assert_eq!(selected, [issued.disclosures[2].clone()]);
    }

    #[async_std::test]
    async fn clear_text_claims() {
        let issued = issue(
            json!({ "iss": "issuer", "a": { "b": 1 }, "c": 2 }),
            json!({ "c": true }),
        )
        .await;

        let selected = select(&issued, json!({ "iss": true, "a": { "b": true } }))
            .await
            .unwrap();
        assert!(selected.is_empty());

        let selected = select(&issued, json!({ "c": false })).await.unwrap();
        assert!(selected.is_empty());

        let selected = select(&issued, json!({ "c": true })).await.unwrap();
        assert_eq!(selected, issued.disclosures);
    }

    #[async_std::test]
    async fn array_items() {
        let issued = issue(
            json!({ "list": ["x", { "y": 1, "z": 2 }, "w"] }),
            json!({ "list": [true, { "__disclose": true, "y": true }, false] }),
        )
        .await;

        // list/0, list/1/y, list/1
        let selected = select(&issued, json!({ "list": [false, { "y": true }] }))
            .await
            .unwrap();
        assert_eq!(
            selected,
            [issued.disclosures[1].clone(), issued.disclosures[2].clone()]
        );

        let selected = select(&issued, json!({ "list": [true] })).await.unwrap();
        assert_eq!(selected, [issued.disclosures[0].clone()]);
    }

    #[async_std::test]
    async fn path_not_found() {
        let issued = issue(json!({ "a": 1 }), json!({ "a": true })).await;

        match select(&issued, json!({ "b": true })).await {
            Err(Error::PresentationPathNotFound(path)) => assert_eq!(path.to_string(), "/b"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}

#![cfg(feature = "sha2")]
mod common;

use common::SequentialSalts;
use sd_jwt::{
    apply_disclosure_frame, reveal_claims, select_disclosures, Disclosure, DisclosureMap, Error,
    JsonObject, ObjectFrame, PresentationFrame, SdAlg,
};
use serde_json::{json, Value};

struct Issued {
    signed: JsonObject,
    pretty: JsonObject,
    disclosures: Vec<Disclosure>,
}

async fn issue(payload: Value, frame: Value) -> Issued {
    let Value::Object(payload) = payload else {
        unreachable!()
    };

    let frame = ObjectFrame::from_value(&frame).unwrap();
    let (signed, disclosures) =
        apply_disclosure_frame(&payload, &frame, &SequentialSalts::default(), &SdAlg::Sha256)
            .await
            .unwrap();

    let map = DisclosureMap::build(&disclosures, &SdAlg::Sha256)
        .await
        .unwrap();
    let pretty = reveal_claims(&signed, &map).unwrap();
    assert_eq!(pretty, payload);

    Issued {
        signed,
        pretty,
        disclosures,
    }
}

impl Issued {
    async fn select(&self, frame: Value) -> Result<Vec<Disclosure>, Error> {
        let frame = PresentationFrame::from_value(&frame)?;
        select_disclosures(
            &self.signed,
            &frame,
            &self.pretty,
            &SdAlg::Sha256,
            &self.disclosures,
        )
        .await
    }

    /// Claims a verifier sees given the selected disclosures.
    async fn reveal(&self, selected: &[Disclosure]) -> Value {
        let map = DisclosureMap::build(selected, &SdAlg::Sha256)
            .await
            .unwrap();
        Value::Object(reveal_claims(&self.signed, &map).unwrap())
    }
}

fn keys(disclosures: &[Disclosure]) -> Vec<Option<&str>> {
    disclosures.iter().map(Disclosure::key).collect()
}

#[async_std::test]
async fn present_nested_minimal() {
    let issued = issue(
        json!({ "a": { "b": 1, "c": 2 } }),
        json!({ "a": { "__disclose": true, "b": true, "c": true } }),
    )
    .await;

    let selected = issued.select(json!({ "a": { "b": true } })).await.unwrap();
    assert_eq!(keys(&selected), [Some("b"), Some("a")]);
    assert_eq!(issued.reveal(&selected).await, json!({ "a": { "b": 1 } }));
}

#[async_std::test]
async fn present_whole_subtree() {
    let issued = issue(
        json!({ "a": { "b": 1, "c": 2 } }),
        json!({ "a": { "__disclose": true, "b": true, "c": true } }),
    )
    .await;

    let selected = issued.select(json!({ "a": true })).await.unwrap();
    // Members follow the `_sd` digest order.
    assert_eq!(keys(&selected), [Some("a"), Some("c"), Some("b")]);
    assert_eq!(
        issued.reveal(&selected).await,
        json!({ "a": { "b": 1, "c": 2 } })
    );
}

#[async_std::test]
async fn present_array_items() {
    let issued = issue(
        json!({ "nationalities": ["US", "DE", "FR"] }),
        json!({ "nationalities": [true, false, true] }),
    )
    .await;

    let selected = issued
        .select(json!({ "nationalities": [false, false, true] }))
        .await
        .unwrap();
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].key(), None);
    assert_eq!(selected[0].value(), "FR");
    assert_eq!(
        issued.reveal(&selected).await,
        json!({ "nationalities": ["DE", "FR"] })
    );

    // Clear text items need no disclosure.
    let selected = issued
        .select(json!({ "nationalities": [false, true] }))
        .await
        .unwrap();
    assert!(selected.is_empty());
}

#[async_std::test]
async fn present_clear_text_inside_disclosure() {
    let issued = issue(
        json!({
            "address": { "street_address": "123 Main St", "country": "US" },
            "iss": "https://issuer.example.com"
        }),
        json!({ "address": { "__disclose": true, "street_address": true } }),
    )
    .await;

    let selected = issued
        .select(json!({ "address": { "country": true }, "iss": true }))
        .await
        .unwrap();
    assert_eq!(keys(&selected), [Some("address")]);
    assert_eq!(
        issued.reveal(&selected).await,
        json!({
            "address": { "country": "US" },
            "iss": "https://issuer.example.com"
        })
    );
}

#[async_std::test]
async fn present_rejections() {
    let issued = issue(json!({ "a": { "b": 1 } }), json!({ "a": { "b": true } })).await;

    assert!(matches!(
        issued.select(json!({ "a": { "c": true } })).await,
        Err(Error::PresentationPathNotFound(_))
    ));
    assert!(matches!(
        issued.select(json!({ "a": { "b": 1 } })).await,
        Err(Error::InvalidFrame { .. })
    ));
    assert!(matches!(
        issued.select(json!({ "__decoyCount": 1 })).await,
        Err(Error::InvalidFrame { .. })
    ));

    // `false` leaves are skipped, even for missing claims.
    let selected = issued.select(json!({ "a": { "c": false } })).await.unwrap();
    assert!(selected.is_empty());
}

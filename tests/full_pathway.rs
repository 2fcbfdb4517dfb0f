#![cfg(feature = "sha2")]
mod common;

use std::sync::Arc;

use common::{at, SequentialSalts, TestKey};
use sd_jwt::{
    split_compact, Error, Jwt, KeyBinding, ObjectFrame, PresentationFrame, SdAlg, SdJwt,
    SdJwtVc, Verification,
};
use serde_json::{json, Value};

fn claims() -> Value {
    json!({
        "iss": "https://issuer.example.com",
        "iat": 1000,
        "exp": 5000,
        "cnf": { "jwk": { "k": "holder-key" } },
        "given_name": "John",
        "family_name": "Doe",
        "address": {
            "street_address": "123 Main St",
            "locality": "Anytown",
            "country": "US"
        },
        "nationalities": ["US", "DE"],
        "degrees": [{ "type": "BSc", "university": "MIT" }]
    })
}

fn frame() -> ObjectFrame {
    ObjectFrame::from_value(&json!({
        "given_name": true,
        "family_name": true,
        "address": {
            "street_address": true,
            "locality": true,
            "__decoyCount": 1
        },
        "nationalities": [true, false],
        "degrees": [{ "__disclose": true, "type": true }],
        "__decoyCount": 2
    }))
    .unwrap()
}

async fn issue() -> String {
    let Value::Object(claims) = claims() else {
        unreachable!()
    };

    SdJwt::new()
        .add_header_claim("alg", "HS256")
        .add_header_claim("typ", "sd+jwt")
        .with_payload(claims)
        .with_disclosure_frame(frame())
        .with_salt_generator(Arc::new(SequentialSalts::default()))
        .with_hasher(Arc::new(SdAlg::Sha256))
        .with_signer(Arc::new(TestKey("issuer-key")))
        .to_compact()
        .await
        .unwrap()
}

fn key_binding() -> KeyBinding {
    KeyBinding::new(
        Jwt::new()
            .add_header_claim("typ", "kb+jwt")
            .add_header_claim("alg", "HS256")
            .add_payload_claim("iat", 2000)
            .add_payload_claim("aud", "https://verifier.example.com")
            .add_payload_claim("nonce", "1234567890"),
    )
    .unwrap()
    .with_signer(Arc::new(TestKey("holder-key")))
}

#[async_std::test]
async fn full_pathway_issuance() {
    let compact = issue().await;
    let sd_jwt = SdJwt::from_compact(&compact).unwrap();

    assert_eq!(sd_jwt.disclosures().len(), 7);

    let payload = sd_jwt.payload().unwrap();
    assert_eq!(payload["_sd"].as_array().unwrap().len(), 4);
    assert_eq!(payload["address"]["_sd"].as_array().unwrap().len(), 3);
    assert_eq!(payload["address"]["country"], "US");
    assert_eq!(payload["nationalities"][1], "DE");
    assert!(payload["nationalities"][0].get("...").is_some());
    assert!(payload["degrees"][0].get("...").is_some());
    assert_eq!(payload["_sd_alg"], "sha-256");

    assert_eq!(
        Value::Object(sd_jwt.pretty_claims().await.unwrap()),
        claims()
    );
}

#[async_std::test]
async fn full_pathway_presentation() {
    let issued = SdJwt::from_compact(&issue().await)
        .unwrap()
        .with_key_binding(key_binding());

    let frame = PresentationFrame::from_value(&json!({
        "given_name": true,
        "address": { "locality": true },
        "degrees": [{ "type": true }]
    }))
    .unwrap();
    let presentation = issued.present(&frame).await.unwrap();

    let parts = split_compact(&presentation).unwrap();
    assert_eq!(parts.disclosures.len(), 4);
    assert!(parts.key_binding.is_some());

    let received = SdJwt::from_compact(&presentation).unwrap();
    assert_eq!(
        Value::Object(received.pretty_claims().await.unwrap()),
        json!({
            "iss": "https://issuer.example.com",
            "iat": 1000,
            "exp": 5000,
            "cnf": { "jwk": { "k": "holder-key" } },
            "given_name": "John",
            "address": {
                "locality": "Anytown",
                "country": "US"
            },
            "nationalities": ["DE"],
            "degrees": [{ "type": "BSc", "university": "MIT" }]
        })
    );

    let verification = received
        .verify_at(&TestKey("issuer-key"), &["given_name", "type"], None, at(3000))
        .await
        .unwrap();
    assert_eq!(
        verification,
        Verification {
            is_signature_valid: true,
            is_expiry_time_valid: Some(true),
            are_required_claims_included: Some(true),
            is_key_binding_valid: Some(true),
            ..Default::default()
        }
    );
}

#[async_std::test]
async fn full_pathway_nothing_revealed() {
    let issued = SdJwt::from_compact(&issue().await).unwrap();
    let presentation = issued.present(&PresentationFrame::default()).await.unwrap();
    assert!(!presentation.contains('~'));

    let received = SdJwt::from_compact(&presentation).unwrap();
    assert_eq!(
        Value::Object(received.pretty_claims().await.unwrap()),
        json!({
            "iss": "https://issuer.example.com",
            "iat": 1000,
            "exp": 5000,
            "cnf": { "jwk": { "k": "holder-key" } },
            "address": { "country": "US" },
            "nationalities": ["DE"],
            "degrees": []
        })
    );
}

#[async_std::test]
async fn full_pathway_rejections() {
    let issued = SdJwt::from_compact(&issue().await).unwrap();

    let frame = PresentationFrame::from_value(&json!({ "address": { "region": true } })).unwrap();
    assert!(matches!(
        issued.present(&frame).await,
        Err(Error::PresentationPathNotFound(_))
    ));

    let verification = issued
        .verify_at(&TestKey("other-key"), &[], None, at(3000))
        .await
        .unwrap();
    assert!(!verification.is_signature_valid);

    let verification = issued
        .verify_at(&TestKey("issuer-key"), &[], None, at(6000))
        .await
        .unwrap();
    assert_eq!(verification.is_expiry_time_valid, Some(false));

    // Key binding signed by another key.
    let forged = issued.clone().with_key_binding(
        key_binding().with_signer(Arc::new(TestKey("other-key"))),
    );
    let frame = PresentationFrame::from_value(&json!({ "given_name": true })).unwrap();
    let received = SdJwt::from_compact(&forged.present(&frame).await.unwrap()).unwrap();
    let verification = received
        .verify_at(&TestKey("issuer-key"), &[], None, at(3000))
        .await
        .unwrap();
    assert!(verification.is_signature_valid);
    assert_eq!(verification.is_key_binding_valid, Some(false));
}

#[async_std::test]
async fn full_pathway_vc() {
    let Value::Object(claims) = claims() else {
        unreachable!()
    };

    let mut credential = SdJwtVc::new()
        .add_header_claim("alg", "HS256")
        .add_header_claim("typ", "vc+sd-jwt")
        .with_payload(claims)
        .add_payload_claim("type", "IdentityCredential")
        .with_disclosure_frame(frame())
        .with_salt_generator(Arc::new(SequentialSalts::default()))
        .with_hasher(Arc::new(SdAlg::Sha256))
        .with_signer(Arc::new(TestKey("issuer-key")));
    let compact = credential.to_compact().await.unwrap();

    let issued = SdJwtVc::from_compact(&compact)
        .unwrap()
        .with_key_binding(key_binding());
    let frame = PresentationFrame::from_value(&json!({ "family_name": true })).unwrap();
    let presentation = issued.present(&frame).await.unwrap();

    let received = SdJwtVc::from_compact(&presentation).unwrap();
    let verification = received
        .verify_at(
            &TestKey("issuer-key"),
            &["family_name"],
            None,
            Some(&json!({ "jwk": { "k": "holder-key" } })),
            at(3000),
        )
        .await
        .unwrap();
    assert_eq!(
        verification,
        Verification {
            is_signature_valid: true,
            is_expiry_time_valid: Some(true),
            are_required_claims_included: Some(true),
            is_key_binding_valid: Some(true),
            contains_required_vc_properties: Some(true),
            contains_expected_key_binding: Some(true),
            ..Default::default()
        }
    );
}

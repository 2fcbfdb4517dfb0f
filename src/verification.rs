use serde::{Deserialize, Serialize};

/// Verification result.
///
/// Checks that were not performed are `None`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    /// The signature is valid.
    pub is_signature_valid: bool,

    /// `nbf` is in the past.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_not_before_valid: Option<bool>,

    /// `exp` is in the future.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_expiry_time_valid: Option<bool>,

    /// Every required claim is present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub are_required_claims_included: Option<bool>,

    /// The key binding is signed by the holder key and follows the
    /// `kb+jwt` profile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_key_binding_valid: Option<bool>,

    /// The SD-JWT follows the `vc+sd-jwt` profile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contains_required_vc_properties: Option<bool>,

    /// The `cnf` claim is the expected one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contains_expected_key_binding: Option<bool>,
}

impl Verification {
    /// Checks if every performed check passed.
    pub fn is_valid(&self) -> bool {
        self.is_signature_valid
            && [
                self.is_not_before_valid,
                self.is_expiry_time_valid,
                self.are_required_claims_included,
                self.is_key_binding_valid,
                self.contains_required_vc_properties,
                self.contains_expected_key_binding,
            ]
            .into_iter()
            .all(|check| check.unwrap_or(true))
    }
}

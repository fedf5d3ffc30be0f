//! Proptest generators for property-based testing.

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;

use permit_core::{Attributes, Permit, DEFAULT_ATTRIBUTES, PERMIT_VERSION};

/// Generate a domain matching the domain pattern.
pub fn domain() -> impl Strategy<Value = String> {
    "([a-z0-9_-]{1,10}\\.){0,2}[a-z0-9][a-z0-9_-]{1,20}\\.[a-zA-Z]{2,11}".prop_map(String::from)
}

/// Generate a key shaped like a generated one.
pub fn permit_key() -> impl Strategy<Value = String> {
    "[A-Za-z0-9]{64}".prop_map(String::from)
}

/// Generate an attribute value in the `-1 / 0 / n` convention.
pub fn attribute_value() -> impl Strategy<Value = i64> {
    prop_oneof![Just(-1i64), Just(0i64), 1i64..=10_000]
}

/// Generate a full attribute set over the canonical names.
pub fn attributes() -> impl Strategy<Value = Attributes> {
    prop::collection::vec(attribute_value(), DEFAULT_ATTRIBUTES.len()).prop_map(|values| {
        DEFAULT_ATTRIBUTES
            .iter()
            .zip(values)
            .map(|((name, _), value)| (name.to_string(), value))
            .collect()
    })
}

/// Generate a whole-second timestamp between 2000 and 2100.
pub fn timestamp() -> impl Strategy<Value = DateTime<Utc>> {
    (946_684_800i64..=4_102_444_800i64).prop_map(|secs| {
        Utc.timestamp_opt(secs, 0)
            .single()
            .expect("timestamp in range")
    })
}

/// Parameters for generating a permit.
#[derive(Debug, Clone)]
pub struct PermitParams {
    pub key: String,
    pub domain: String,
    pub expires: Option<DateTime<Utc>>,
    pub valid: bool,
    pub attributes: Attributes,
    pub contact: String,
    pub entity: String,
    pub issued: DateTime<Utc>,
}

impl Arbitrary for PermitParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            permit_key(),
            domain(),
            proptest::option::of(timestamp()),
            any::<bool>(),
            attributes(),
            "[a-z]{0,12}(@[a-z]{1,8}\\.com)?",
            "[A-Za-z ]{0,20}",
            timestamp(),
        )
            .prop_map(
                |(key, domain, expires, valid, attributes, contact, entity, issued)| PermitParams {
                    key,
                    domain,
                    expires,
                    valid,
                    attributes,
                    contact,
                    entity,
                    issued,
                },
            )
            .boxed()
    }
}

/// Generate a permit from parameters.
pub fn permit_from_params(params: &PermitParams) -> Permit {
    Permit {
        version: PERMIT_VERSION,
        key: params.key.clone(),
        domain: params.domain.clone(),
        expires: params.expires,
        valid: params.valid,
        attributes: params.attributes.clone(),
        contact: params.contact.clone(),
        entity: params.entity.clone(),
        issued: params.issued,
    }
}

//! # Raw Wikidata Entities
//!
//! Typed view of the `wbgetentities` entity document (labels + claims).
//!
//! The model is lenient at every level. A part with the wrong shape (a
//! label that is not a string, `claims: []`, a `null` snaktype) decodes as
//! empty instead of failing the entity, so one bad field only empties the
//! reference fields derived from it. A claim value whose shape we do not
//! understand decodes as [`DataValue::Other`].

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

/// A raw entity as returned by the knowledge base.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEntity {
    /// Source-specific key (`Q43010`).
    #[serde(default, deserialize_with = "lenient")]
    pub id: String,
    /// Localized labels keyed by language code.
    #[serde(default, deserialize_with = "lenient_map")]
    pub labels: BTreeMap<String, Label>,
    /// Property claims keyed by property id (`P274`).
    #[serde(default, deserialize_with = "lenient_claims")]
    pub claims: BTreeMap<String, Vec<Claim>>,
}

/// A label in one language.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Label {
    #[serde(default, deserialize_with = "lenient")]
    pub value: String,
}

/// One statement about a property.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Claim {
    #[serde(default, deserialize_with = "lenient")]
    pub mainsnak: Snak,
}

/// The main value of a statement.
#[derive(Debug, Clone, Deserialize)]
pub struct Snak {
    /// `value`, `somevalue` or `novalue`; empty when malformed.
    #[serde(default = "default_snaktype", deserialize_with = "lenient")]
    pub snaktype: String,
    #[serde(default, deserialize_with = "lenient")]
    pub datavalue: Option<DataValue>,
}

impl Default for Snak {
    fn default() -> Self {
        Self {
            snaktype: default_snaktype(),
            datavalue: None,
        }
    }
}

fn default_snaktype() -> String {
    "value".to_string()
}

/// A claim value, keyed on its JSON shape.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    /// `{"value": "SiO2", "type": "string"}`
    String { value: String },
    /// `{"value": {"id": "Q3504248", ...}, "type": "wikibase-entityid"}`
    EntityId { value: EntityRef },
    /// Quantities, times, monolingual text and anything else.
    Other(IgnoredAny),
}

/// Reference to another entity.
#[derive(Debug, Clone, Deserialize)]
pub struct EntityRef {
    pub id: String,
}

// =============================================================================
// LENIENT DECODING
// =============================================================================

/// Either a well-formed `T` or anything else.
#[derive(Deserialize)]
#[serde(untagged)]
enum Shape<T> {
    Valid(T),
    Invalid(#[allow(dead_code)] IgnoredAny),
}

impl<T> Shape<T> {
    fn valid(self) -> Option<T> {
        match self {
            Self::Valid(value) => Some(value),
            Self::Invalid(_) => None,
        }
    }
}

/// `T::default()` when the value has the wrong shape.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Shape::<T>::deserialize(deserializer)?
        .valid()
        .unwrap_or_default())
}

/// A map that drops malformed entries, or empty when it is not a map.
fn lenient_map<'de, D, V>(deserializer: D) -> Result<BTreeMap<String, V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    let entries = Shape::<BTreeMap<String, Shape<V>>>::deserialize(deserializer)?
        .valid()
        .unwrap_or_default();
    Ok(entries
        .into_iter()
        .filter_map(|(key, value)| value.valid().map(|value| (key, value)))
        .collect())
}

/// Claims keyed by property; a malformed list or claim is dropped.
fn lenient_claims<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<Claim>>, D::Error>
where
    D: Deserializer<'de>,
{
    let lists = lenient_map::<D, Vec<Shape<Claim>>>(deserializer)?;
    Ok(lists
        .into_iter()
        .map(|(property, claims)| {
            (property, claims.into_iter().filter_map(Shape::valid).collect())
        })
        .collect())
}

impl Snak {
    /// The snak's value when it carries one (`snaktype == "value"`).
    #[must_use]
    pub fn value(&self) -> Option<&DataValue> {
        if self.snaktype == "value" {
            self.datavalue.as_ref()
        } else {
            None
        }
    }
}

impl RawEntity {
    /// Create an empty entity with the given key.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Add a label.
    #[must_use]
    pub fn with_label(mut self, language: &str, value: impl Into<String>) -> Self {
        self.labels.insert(
            language.to_string(),
            Label {
                value: value.into(),
            },
        );
        self
    }

    /// Add a string-valued claim.
    #[must_use]
    pub fn with_string_claim(self, property: &str, value: impl Into<String>) -> Self {
        self.with_claim(
            property,
            DataValue::String {
                value: value.into(),
            },
        )
    }

    /// Add an entity-valued claim.
    #[must_use]
    pub fn with_entity_claim(self, property: &str, entity: impl Into<String>) -> Self {
        self.with_claim(
            property,
            DataValue::EntityId {
                value: EntityRef { id: entity.into() },
            },
        )
    }

    fn with_claim(mut self, property: &str, value: DataValue) -> Self {
        self.claims
            .entry(property.to_string())
            .or_default()
            .push(Claim {
                mainsnak: Snak {
                    snaktype: default_snaktype(),
                    datavalue: Some(value),
                },
            });
        self
    }

    /// The label in `language`, if present and non-empty.
    #[must_use]
    pub fn label(&self, language: &str) -> Option<&str> {
        self.labels
            .get(language)
            .map(|label| label.value.as_str())
            .filter(|value| !value.is_empty())
    }

    /// All values claimed for `property`, in statement order.
    pub fn values(&self, property: &str) -> impl Iterator<Item = &DataValue> {
        self.claims
            .get(property)
            .into_iter()
            .flatten()
            .filter_map(|claim| claim.mainsnak.value())
    }
}

//! # Entity Normalizer
//!
//! Maps a raw Wikidata entity onto [`ReferenceFields`].
//!
//! `normalize` is total: a missing or malformed claim degrades that one field
//! to the empty string and never fails the record.
//!
//! ## Property Mapping
//!
//! | Field               | Source                         |
//! |---------------------|--------------------------------|
//! | `name_en`           | label `en`                     |
//! | `name_ru`           | label `ru`, else `name_en`     |
//! | `chemical_formula`  | `P274` (string)                |
//! | `crystal_system_id` | `P2055` (entity, re-prefixed)  |
//! | `hardness_id`       | `P189` (entity, re-prefixed)   |
//! | `cleavage_id`       | `P2056` (entity, re-prefixed)  |
//! | `mineral_type_id`   | always empty                   |
//! | `crystal_form_id`   | always empty                   |
//!
//! Classification references are re-encoded as external identifiers so they
//! resolve later through the same scheme. Nothing checks that the referenced
//! entity is itself a meaningful classification, and the mineral type is not
//! exposed reliably by the source, so it stays empty.

use crate::entity::{DataValue, RawEntity};
use crate::types::{MineralId, ReferenceFields};

/// Chemical formula.
pub const PROP_CHEMICAL_FORMULA: &str = "P274";
/// Crystal system.
pub const PROP_CRYSTAL_SYSTEM: &str = "P2055";
/// Mohs hardness.
pub const PROP_HARDNESS: &str = "P189";
/// Cleavage.
pub const PROP_CLEAVAGE: &str = "P2056";

/// Normalize a raw entity into reference fields.
#[must_use]
pub fn normalize(entity: &RawEntity) -> ReferenceFields {
    let name_en = entity.label("en").unwrap_or_default().to_string();
    let name_ru = entity
        .label("ru")
        .map(str::to_string)
        .unwrap_or_else(|| name_en.clone());

    ReferenceFields {
        name_ru,
        name_en,
        chemical_formula: first_string(entity, PROP_CHEMICAL_FORMULA),
        mineral_type_id: String::new(),
        hardness_id: first_reference(entity, PROP_HARDNESS),
        cleavage_id: first_reference(entity, PROP_CLEAVAGE),
        crystal_system_id: first_reference(entity, PROP_CRYSTAL_SYSTEM),
        crystal_form_id: String::new(),
    }
}

/// First string value claimed for `property`, or empty.
fn first_string(entity: &RawEntity, property: &str) -> String {
    entity
        .values(property)
        .find_map(|value| match value {
            DataValue::String { value } if !value.is_empty() => Some(value.clone()),
            _ => None,
        })
        .unwrap_or_default()
}

/// First entity reference claimed for `property` as an external id, or empty.
fn first_reference(entity: &RawEntity, property: &str) -> String {
    entity
        .values(property)
        .find_map(|value| match value {
            DataValue::EntityId { value } if !value.id.is_empty() => {
                Some(MineralId::external(&value.id).to_string())
            }
            _ => None,
        })
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn english_only_entity_degrades_cleanly() {
        let entity = RawEntity::new("Q1").with_label("en", "Quartz");
        let fields = normalize(&entity);

        assert_eq!(fields.name_en, "Quartz");
        assert_eq!(fields.name_ru, fields.name_en);
        assert!(fields.chemical_formula.is_empty());
        assert!(fields.mineral_type_id.is_empty());
        assert!(fields.hardness_id.is_empty());
        assert!(fields.cleavage_id.is_empty());
        assert!(fields.crystal_system_id.is_empty());
        assert!(fields.crystal_form_id.is_empty());
    }

    #[test]
    fn russian_label_wins_when_present() {
        let entity = RawEntity::new("Q1")
            .with_label("en", "Quartz")
            .with_label("ru", "Кварц");
        assert_eq!(normalize(&entity).name_ru, "Кварц");
    }

    #[test]
    fn classification_claims_are_reprefixed() {
        let entity = RawEntity::new("Q43010")
            .with_label("en", "Quartz")
            .with_string_claim(PROP_CHEMICAL_FORMULA, "SiO2")
            .with_entity_claim(PROP_CRYSTAL_SYSTEM, "Q3504248")
            .with_entity_claim(PROP_HARDNESS, "Q11")
            .with_entity_claim(PROP_CLEAVAGE, "Q12");

        let fields = normalize(&entity);
        assert_eq!(fields.chemical_formula, "SiO2");
        assert_eq!(fields.crystal_system_id, "wikidata:Q3504248");
        assert_eq!(fields.hardness_id, "wikidata:Q11");
        assert_eq!(fields.cleavage_id, "wikidata:Q12");
        assert!(fields.mineral_type_id.is_empty());
    }

    #[test]
    fn mistyped_claims_degrade_per_field() {
        // Formula given as an entity, crystal system given as a string.
        let entity = RawEntity::new("Q1")
            .with_label("en", "Odd")
            .with_entity_claim(PROP_CHEMICAL_FORMULA, "Q5")
            .with_string_claim(PROP_CRYSTAL_SYSTEM, "trigonal")
            .with_entity_claim(PROP_HARDNESS, "Q7");

        let fields = normalize(&entity);
        assert!(fields.chemical_formula.is_empty());
        assert!(fields.crystal_system_id.is_empty());
        assert_eq!(fields.hardness_id, "wikidata:Q7");
    }

    #[test]
    fn skips_unusable_leading_claims() {
        let entity = RawEntity::new("Q1")
            .with_entity_claim(PROP_CHEMICAL_FORMULA, "Q5")
            .with_string_claim(PROP_CHEMICAL_FORMULA, "CaCO3");
        assert_eq!(normalize(&entity).chemical_formula, "CaCO3");
    }

    #[test]
    fn empty_entity_yields_empty_fields() {
        assert_eq!(
            normalize(&RawEntity::default()),
            ReferenceFields::default()
        );
    }
}

//! # Property-Based Tests
//!
//! Invariants of identifiers, the normalizer and the append-only store.

use mineralspace_core::{
    EXTERNAL_PREFIX, MemoryReferenceStore, MineralId, MineralReference, RawEntity,
    ReferenceFields, ReferenceStore, normalize,
    normalizer::{PROP_CHEMICAL_FORMULA, PROP_CLEAVAGE, PROP_CRYSTAL_SYSTEM, PROP_HARDNESS},
};
use proptest::option;
use proptest::prelude::*;

proptest! {
    /// An external id always yields back the key it was built from.
    #[test]
    fn external_id_round_trips_key(key in "Q[1-9][0-9]{0,8}") {
        let id = MineralId::external(&key);
        prop_assert_eq!(id.external_key(), Some(key.as_str()));
        prop_assert!(id.as_str().starts_with(EXTERNAL_PREFIX));
    }

    /// Identifiers without the prefix are never external.
    #[test]
    fn unprefixed_ids_are_local(raw in "[a-z][a-z0-9_-]{0,40}") {
        let id = MineralId::parse(raw).expect("valid id");
        prop_assert!(!id.is_external());
    }

    /// The normalizer never fails and the Russian name always falls back.
    #[test]
    fn normalize_is_total(
        en in option::of("[A-Za-z ]{1,20}"),
        ru in option::of("[а-я]{1,20}"),
        formula in option::of("[A-Za-z0-9]{1,12}"),
        system in option::of("Q[0-9]{1,6}"),
        hardness in option::of("Q[0-9]{1,6}"),
        cleavage in option::of("Q[0-9]{1,6}"),
    ) {
        let mut entity = RawEntity::new("Q1");
        if let Some(en) = &en {
            entity = entity.with_label("en", en.clone());
        }
        if let Some(ru) = &ru {
            entity = entity.with_label("ru", ru.clone());
        }
        if let Some(formula) = &formula {
            entity = entity.with_string_claim(PROP_CHEMICAL_FORMULA, formula.clone());
        }
        if let Some(q) = &system {
            entity = entity.with_entity_claim(PROP_CRYSTAL_SYSTEM, q.clone());
        }
        if let Some(q) = &hardness {
            entity = entity.with_entity_claim(PROP_HARDNESS, q.clone());
        }
        if let Some(q) = &cleavage {
            entity = entity.with_entity_claim(PROP_CLEAVAGE, q.clone());
        }

        let fields = normalize(&entity);
        let expected_en = en.clone().unwrap_or_default();
        prop_assert_eq!(&fields.name_en, &expected_en);
        prop_assert_eq!(&fields.name_ru, &ru.clone().unwrap_or(expected_en));
        prop_assert_eq!(&fields.chemical_formula, &formula.unwrap_or_default());
        prop_assert_eq!(
            &fields.crystal_system_id,
            &system.map(|q| format!("{EXTERNAL_PREFIX}{q}")).unwrap_or_default()
        );
        prop_assert_eq!(
            &fields.hardness_id,
            &hardness.map(|q| format!("{EXTERNAL_PREFIX}{q}")).unwrap_or_default()
        );
        prop_assert_eq!(
            &fields.cleavage_id,
            &cleavage.map(|q| format!("{EXTERNAL_PREFIX}{q}")).unwrap_or_default()
        );
        prop_assert!(fields.mineral_type_id.is_empty());
        prop_assert!(fields.crystal_form_id.is_empty());
    }

    /// Repeated inserts of one id leave exactly the first record.
    #[test]
    fn store_keeps_first_insert(names in proptest::collection::vec("[A-Za-z]{1,10}", 1..10)) {
        let store = MemoryReferenceStore::new();
        let id = MineralId::parse("quartz").expect("valid id");

        let mut accepted = 0;
        for name in &names {
            let record = MineralReference::curated(
                id.clone(),
                ReferenceFields { name_en: name.clone(), ..ReferenceFields::default() },
            );
            if store.insert(&record).is_ok() {
                accepted += 1;
            }
        }

        prop_assert_eq!(accepted, 1);
        let stored = store.get(&id).expect("get").expect("present");
        prop_assert_eq!(&stored.name_en, &names[0]);
    }
}

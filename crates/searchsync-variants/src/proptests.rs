//! Property-based tests for variant expansion.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use proptest::prelude::*;
use searchsync_core::{Capability, Record, StaticHostSchema};

use crate::config::VariantConfig;
use crate::registry::VariantRegistry;

fn registry() -> VariantRegistry {
    let host = StaticHostSchema::new()
        .with_class("Page")
        .with_capability("Page", Capability::Versioned)
        .with_capability("Page", Capability::Subsites);
    VariantRegistry::from_config(
        Arc::new(host),
        &VariantConfig {
            subsites: true,
            ..Default::default()
        },
    )
}

proptest! {
    #[test]
    fn expansion_keys_are_unique_and_stable(
        key in 1u64..10_000,
        published in any::<bool>(),
        subsite in 0i64..50,
    ) {
        let registry = registry();
        let record = Record::new("Page", key)
            .with_field("published", published)
            .with_field("subsite_id", subsite);

        let first = registry.expand(&record).unwrap();
        registry.invalidate();
        let second = registry.expand(&record).unwrap();
        prop_assert_eq!(&first, &second);

        let mut keys: Vec<String> = first.iter().map(|e| e.key.to_string()).collect();
        let total = keys.len();
        keys.sort();
        keys.dedup();
        prop_assert_eq!(keys.len(), total);
    }

    #[test]
    fn draft_scope_always_present(published in any::<bool>(), subsite in 0i64..50) {
        let record = Record::new("Page", 1)
            .with_field("published", published)
            .with_field("subsite_id", subsite);
        let scopes = registry().expand(&record).unwrap();
        let present = scopes.iter().filter(|s| s.is_present()).count();
        prop_assert_eq!(present, if published { 2 } else { 1 });
        prop_assert!(scopes[0].is_present());
    }
}

//! Property-based tests for `ConnectionRegistry`.
//!
//! Random sequences of inserts and removes are checked against a simple
//! model: a set of occupied slots, each holding the handle it was given.

use std::collections::BTreeMap;

use linechat_server::ConnectionRegistry;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Insert,
    Remove(usize),
}

fn ops() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(
        prop_oneof![3 => Just(Op::Insert), 2 => (0usize..12).prop_map(Op::Remove)],
        0..64,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Property: the registry matches the model after every operation
    #[test]
    fn prop_registry_matches_model(capacity in 1usize..10, ops in ops()) {
        let mut registry = ConnectionRegistry::new(capacity);
        let mut model: BTreeMap<usize, u32> = BTreeMap::new();
        let mut next_handle = 0u32;

        for op in ops {
            match op {
                Op::Insert => {
                    next_handle += 1;
                    let result = registry.insert(next_handle);

                    if model.len() == capacity {
                        // PROPERTY: a full registry refuses without side effects
                        prop_assert_eq!(result, Err(next_handle));
                    } else {
                        // PROPERTY: the lowest free slot is taken
                        let expected = (0..capacity).find(|s| !model.contains_key(s)).unwrap();
                        prop_assert_eq!(result, Ok(expected));
                        model.insert(expected, next_handle);
                    }
                },
                Op::Remove(slot) => {
                    let removed = registry.remove(slot).map(|conn| conn.into_handle());
                    prop_assert_eq!(removed, model.remove(&slot));
                },
            }

            // PROPERTY: each live connection occupies exactly one slot
            prop_assert_eq!(registry.len(), model.len());
            prop_assert!(registry.len() <= registry.capacity());
            let live: Vec<(usize, u32)> =
                registry.iter().map(|(slot, conn)| (slot, *conn.handle())).collect();
            let expected: Vec<(usize, u32)> = model.iter().map(|(&s, &h)| (s, h)).collect();
            prop_assert_eq!(live, expected);
        }
    }
}

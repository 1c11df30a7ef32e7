//! Property tests: random operation sequences against a model `HashMap`
//!
//! Values are `Option<i16>` so that stored nulls, the absent marker and the
//! null-as-absent rules of the conditional operations all get exercised.

use std::collections::HashMap;

use proptest::prelude::*;

use mapcontract::{HashStore, MapView, SharedStore, VerifiedMap, VerifyConfig};

type Model = HashMap<u8, Option<i16>>;

#[derive(Debug, Clone)]
enum Op {
    Put(u8, Option<i16>),
    Remove(u8),
    PutIfAbsent(u8, Option<i16>),
    RemoveEntry(u8, Option<i16>),
    Replace(u8, Option<i16>),
    ComputeIfPresent(u8, i16),
    Merge(u8, i16),
    Clear,
}

fn op() -> impl Strategy<Value = Op> {
    let key = 0u8..8;
    let value = proptest::option::of(-4i16..4);
    prop_oneof![
        4 => (key.clone(), value.clone()).prop_map(|(k, v)| Op::Put(k, v)),
        2 => key.clone().prop_map(Op::Remove),
        2 => (key.clone(), value.clone()).prop_map(|(k, v)| Op::PutIfAbsent(k, v)),
        2 => (key.clone(), value.clone()).prop_map(|(k, v)| Op::RemoveEntry(k, v)),
        2 => (key.clone(), value).prop_map(|(k, v)| Op::Replace(k, v)),
        2 => (key.clone(), -2i16..2).prop_map(|(k, d)| Op::ComputeIfPresent(k, d)),
        2 => (key, -4i16..4).prop_map(|(k, v)| Op::Merge(k, v)),
        1 => Just(Op::Clear),
    ]
}

/// Apply `op` to both map and model; returns both results rendered for comparison
fn apply(map: &mut VerifiedMap<u8, Option<i16>>, model: &mut Model, op: &Op) -> (String, String) {
    match *op {
        Op::Put(k, v) => (format!("{:?}", map.put(k, v)), format!("{:?}", Ok::<_, ()>(model.insert(k, v)))),
        Op::Remove(k) => (format!("{:?}", map.remove(&k)), format!("{:?}", Ok::<_, ()>(model.remove(&k)))),
        Op::PutIfAbsent(k, v) => {
            let current = model.get(&k).copied();
            if current.flatten().is_none() {
                model.insert(k, v);
            }
            (format!("{:?}", map.put_if_absent(k, v)), format!("{:?}", Ok::<_, ()>(current)))
        }
        Op::RemoveEntry(k, v) => {
            let matched = model.get(&k) == Some(&v);
            if matched {
                model.remove(&k);
            }
            (format!("{:?}", map.remove_entry(&k, &v)), format!("{:?}", Ok::<_, ()>(matched)))
        }
        Op::Replace(k, v) => {
            let old = if model.contains_key(&k) { model.insert(k, v) } else { None };
            (format!("{:?}", map.replace(k, v)), format!("{:?}", Ok::<_, ()>(old)))
        }
        Op::ComputeIfPresent(k, delta) => {
            let expected = match model.get(&k).copied().flatten() {
                None => None,
                Some(_) if delta == 0 => {
                    model.remove(&k);
                    None
                }
                Some(x) => {
                    let value = Some(x.wrapping_add(delta));
                    model.insert(k, value);
                    Some(value)
                }
            };
            let actual = map.compute_if_present(k, |_, v| {
                (delta != 0).then(|| v.map(|x| x.wrapping_add(delta)))
            });
            (format!("{actual:?}"), format!("{:?}", Ok::<_, ()>(expected)))
        }
        Op::Merge(k, v) => {
            let expected = match model.get(&k).copied().flatten() {
                None => Some(v),
                Some(x) => Some(x.wrapping_add(v)).filter(|sum| *sum != 0),
            };
            match expected {
                Some(value) => model.insert(k, Some(value)),
                None => model.remove(&k),
            };
            let actual = map.merge(k, Some(v), |old, new| {
                let sum = old.unwrap_or(0).wrapping_add(new.unwrap_or(0));
                (sum != 0).then_some(Some(sum))
            });
            (format!("{actual:?}"), format!("{:?}", Ok::<_, ()>(expected.map(Some))))
        }
        Op::Clear => {
            model.clear();
            (format!("{:?}", map.clear()), format!("{:?}", Ok::<_, ()>(())))
        }
    }
}

fn assert_matches_model(map: &VerifiedMap<u8, Option<i16>>, model: &Model) {
    assert_eq!(map.store().len(), model.len());
    for (k, v) in model {
        assert_eq!(map.store().get(k), Some(*v), "key {k}");
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Every call on a correct store satisfies its contract and agrees with the model
    #[test]
    fn verified_map_agrees_with_model(ops in prop::collection::vec(op(), 1..64)) {
        let mut map = VerifiedMap::with_config(HashStore::new(), VerifyConfig::enforced());
        let mut model = Model::new();

        for op in &ops {
            let (actual, expected) = apply(&mut map, &mut model, op);
            prop_assert_eq!(actual, expected, "after {:?}", op);
            assert_matches_model(&map, &model);
        }
        prop_assert_eq!(map.stats().violations, 0);
        prop_assert_eq!(map.len().unwrap(), model.len());
    }

    /// Disabling verification never changes results
    #[test]
    fn disabled_mode_is_transparent(ops in prop::collection::vec(op(), 1..64)) {
        let mut enforced = VerifiedMap::with_config(HashStore::new(), VerifyConfig::enforced());
        let mut disabled = VerifiedMap::with_config(HashStore::new(), VerifyConfig::disabled());
        let mut model_a = Model::new();
        let mut model_b = Model::new();

        for op in &ops {
            let (a, _) = apply(&mut enforced, &mut model_a, op);
            let (b, _) = apply(&mut disabled, &mut model_b, op);
            prop_assert_eq!(a, b, "after {:?}", op);
        }
        prop_assert_eq!(enforced.snapshot(), disabled.snapshot());
        prop_assert_eq!(disabled.stats().predicates_evaluated, 0);
    }

    /// Insertion order never affects equality or the hash code
    #[test]
    fn hash_code_ignores_order(entries in prop::collection::vec((any::<u8>(), any::<i16>()), 0..32)) {
        let mut forward = VerifiedMap::<u8, i16>::with_config(HashStore::new(), VerifyConfig::enforced());
        let mut backward = VerifiedMap::<u8, i16>::with_config(HashStore::new(), VerifyConfig::enforced());

        let mut dedup: HashMap<u8, i16> = HashMap::new();
        for (k, v) in &entries {
            dedup.insert(*k, *v);
        }
        forward.put_all(dedup.iter().map(|(k, v)| (*k, *v))).unwrap();
        let mut reversed: Vec<_> = dedup.into_iter().collect();
        reversed.reverse();
        backward.put_all(reversed).unwrap();

        prop_assert!(forward.equals(backward.store()).unwrap());
        prop_assert_eq!(forward.hash_code().unwrap(), backward.hash_code().unwrap());
    }

    /// A shared store behaves like a hash store while another handle reads it
    #[test]
    fn shared_store_agrees_with_model(writes in prop::collection::vec((0u8..16, any::<i16>(), any::<bool>()), 1..64)) {
        let store = SharedStore::<u8, i16>::new();
        let reader = store.clone();
        let mut map = VerifiedMap::with_config(store, VerifyConfig::enforced());
        let mut model: HashMap<u8, i16> = HashMap::new();

        for (k, v, insert) in writes {
            if insert {
                prop_assert_eq!(map.put(k, v).unwrap(), model.insert(k, v));
            } else {
                prop_assert_eq!(map.remove(&k).unwrap(), model.remove(&k));
            }
            prop_assert_eq!(reader.len(), model.len());
        }
        prop_assert_eq!(map.stats().violations, 0);
    }
}

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use orderedmap::{Config, Error, KeyOrder, OrderedContainer, OrderedMap, RandomState};

fn by_len(a: &&str, b: &&str) -> bool {
    a.len() < b.len()
}

// ─── Scenarios ───────────────────────────────────────────────────────────────

#[test]
fn update_does_not_reorder() {
    let map = OrderedContainer::new();
    map.set("b", 2);
    map.set("a", 1);
    map.set("a", 3);

    assert!(map.has(&"a"));
    assert!(map.has(&"b"));
    assert_eq!(map.get(&"a"), Some(3));
    assert_eq!(map.len(), 2);
    assert_eq!(map.pairs(), vec![("b", 2), ("a", 3)]);
}

#[test]
fn insert_before_and_after() {
    let map = OrderedContainer::new();
    map.set("a", 1);
    map.set("c", 3);

    map.insert_before(&"c", "b", 2).unwrap();
    map.insert_after(&"c", "d", 4).unwrap();

    assert_eq!(map.keys(), vec!["a", "b", "c", "d"]);
    assert_eq!(map.values(), vec![1, 2, 3, 4]);
}

#[test]
fn insert_after_last_appends() {
    let map = OrderedContainer::new();
    map.set("a", 1);
    map.insert_after(&"a", "b", 2).unwrap();
    map.insert_before(&"a", "z", 0).unwrap();

    assert_eq!(map.keys(), vec!["z", "a", "b"]);
}

#[test]
fn sorted_pairs_is_stable_for_equivalent_keys() {
    let map = OrderedContainer::builder().default_comparator(by_len).build();
    map.set("aa", 1);
    map.set("bb", 2);
    map.set("c", 3);

    let sorted = map.sorted_pairs(None).unwrap();
    let keys: Vec<_> = sorted.iter().map(|(k, _)| *k).collect();
    assert_eq!(keys, vec!["c", "aa", "bb"]);

    // stored order is untouched
    assert_eq!(map.keys(), vec!["aa", "bb", "c"]);
}

#[test]
fn sorted_pairs_without_any_comparator_fails() {
    let map: OrderedContainer<&str, i32> = OrderedContainer::new();
    assert_eq!(map.sorted_pairs(None), Err(Error::MissingComparator));

    map.set("x", 1);
    assert_eq!(map.sorted_pairs(None), Err(Error::MissingComparator));
}

#[test]
fn delete_compacts_order() {
    let map = OrderedContainer::new();
    map.set("a", 1);
    map.set("b", 2);
    map.set("c", 3);

    assert_eq!(map.delete(&"b"), Some(2));
    assert_eq!(map.keys(), vec!["a", "c"]);

    assert_eq!(map.delete(&"a"), Some(1));
    assert_eq!(map.keys(), vec!["c"]);

    assert_eq!(map.delete(&"a"), None);
    assert_eq!(map.len(), 1);
}

#[test]
fn concurrent_set_from_fifty_threads() {
    let map = OrderedContainer::new();

    std::thread::scope(|s| {
        for i in 0..50 {
            let map = &map;
            s.spawn(move || {
                map.set(i, i);
                assert_eq!(map.get(&i), Some(i));
                assert!(map.has(&i));
            });
        }
    });

    assert_eq!(map.len(), 50);
    let mut keys = map.keys();
    keys.sort_unstable();
    assert_eq!(keys, (0..50).collect::<Vec<_>>());
}

// ─── Upsert ──────────────────────────────────────────────────────────────────

#[test]
fn upsert_updates_existing_and_inserts_new() {
    let map = OrderedContainer::new();
    map.set("a", 1);

    assert_eq!(map.upsert("a", 10, Some(&|old: &i32| old + 1)), Ok((2, false)));
    assert_eq!(map.get(&"a"), Some(2));

    // the update function is ignored on insert
    assert_eq!(map.upsert("b", 5, Some(&|old: &i32| *old)), Ok((5, true)));
    assert_eq!(map.upsert("c", 6, None), Ok((6, true)));

    assert_eq!(map.keys(), vec!["a", "b", "c"]);
}

#[test]
fn upsert_existing_key_without_update_fn_fails_cleanly() {
    let map = OrderedContainer::new();
    map.set("a", 1);
    map.set("b", 2);

    assert_eq!(map.upsert("a", 0, None), Err(Error::MissingUpdateFunction));
    assert_eq!(map.pairs(), vec![("a", 1), ("b", 2)]);
}

#[test]
fn upsert_calls_update_exactly_once() {
    let calls = AtomicUsize::new(0);
    let map = OrderedContainer::new();
    map.set("n", 0u32);

    let bump = |old: &u32| {
        calls.fetch_add(1, Ordering::SeqCst);
        old + 1
    };
    map.upsert("n", 0, Some(&bump)).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    map.upsert("m", 0, Some(&bump)).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn upsert_with_is_atomic_under_contention() {
    let map = OrderedContainer::new();

    std::thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                for _ in 0..500 {
                    map.upsert_with("hits", 1u64, |old| old + 1);
                }
            });
        }
    });

    assert_eq!(map.get(&"hits"), Some(4000));
    assert_eq!(map.len(), 1);
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "would deadlock")]
fn reentrant_upsert_callback_is_caught() {
    let map = OrderedContainer::new();
    map.set("a", 1);
    map.upsert_with("a", 0, |old| old + map.len() as i32);
}

#[cfg(debug_assertions)]
#[test]
fn container_is_usable_after_a_caught_reentry() {
    let map = Arc::new(OrderedContainer::new());
    map.set("a", 1);

    let inner = Arc::clone(&map);
    let result = std::thread::spawn(move || {
        inner.get_with(&"a", |v| *v + inner.get(&"a").unwrap_or(0));
    })
    .join();
    assert!(result.is_err());

    map.set("b", 2);
    assert_eq!(map.pairs(), vec![("a", 1), ("b", 2)]);
}

#[cfg(debug_assertions)]
#[test]
fn reentry_is_caught_while_another_thread_runs_a_callback() {
    let map = OrderedContainer::new();
    map.set("a", 1);
    map.set("b", 2);

    let inside = Barrier::new(2);
    let other_done = Barrier::new(2);

    std::thread::scope(|s| {
        let reentrant = s.spawn(|| {
            map.get_with(&"b", |_| {
                inside.wait();
                other_done.wait();
                map.len()
            })
        });

        inside.wait();
        assert_eq!(map.get_with(&"a", |v| *v), Some(1));
        other_done.wait();

        assert!(reentrant.join().is_err());
    });

    assert_eq!(map.get_with(&"b", |v| *v), Some(2));
}

// ─── Positional insertion errors ─────────────────────────────────────────────

#[test]
fn positional_insert_errors_leave_map_untouched() {
    let map = OrderedContainer::new();
    map.set("a", 1);
    map.set("b", 2);

    assert_eq!(map.insert_before(&"x", "z", 0), Err(Error::TargetNotFound));
    assert_eq!(map.insert_after(&"a", "b", 99), Err(Error::DuplicateKey));
    // duplicate is reported even when the target is missing too
    assert_eq!(map.insert_after(&"x", "a", 99), Err(Error::DuplicateKey));

    assert_eq!(map.pairs(), vec![("a", 1), ("b", 2)]);
}

#[test]
fn error_messages() {
    assert_eq!(Error::MissingComparator.to_string(), "comparator is required");
    assert_eq!(Error::TargetNotFound.to_string(), "target key not found");
    assert_eq!(Error::DuplicateKey.to_string(), "key already exists");
}

// ─── Snapshots ───────────────────────────────────────────────────────────────

#[test]
fn snapshot_unaffected_by_later_mutation() {
    let map = OrderedContainer::new();
    map.set("a", 1);
    map.set("b", 2);

    let pairs = map.pairs();
    let keys = map.keys();
    map.set("c", 3);
    map.set("a", 100);
    map.delete(&"b");

    assert_eq!(pairs, vec![("a", 1), ("b", 2)]);
    assert_eq!(keys, vec!["a", "b"]);
}

#[test]
fn mutating_snapshot_does_not_affect_map() {
    let map = OrderedContainer::new();
    map.set("a".to_string(), 1);
    map.set("b".to_string(), 2);

    let mut keys = map.keys();
    keys[0] = "x".to_string();
    let mut pairs = map.pairs();
    pairs[0].1 = 999;
    let mut values = map.values();
    values.clear();

    assert!(!map.has("x"));
    assert_eq!(map.keys(), vec!["a".to_string(), "b".to_string()]);
    assert_eq!(map.get("a"), Some(1));
}

#[test]
fn sorted_pairs_override_wins_over_default() {
    let map = OrderedContainer::builder()
        .default_comparator(|a: &String, b: &String| a < b)
        .build();
    map.set("b".to_string(), 2);
    map.set("a".to_string(), 1);
    map.set("c".to_string(), 3);

    let asc = map.sorted_pairs(None).unwrap();
    assert_eq!(
        asc,
        vec![
            ("a".to_string(), 1),
            ("b".to_string(), 2),
            ("c".to_string(), 3)
        ]
    );

    let desc: &dyn Fn(&String, &String) -> bool = &|a, b| a > b;
    let sorted = map.sorted_pairs(Some(desc)).unwrap();
    assert_eq!(sorted[0].0, "c");
    assert_eq!(sorted[2].0, "a");
}

#[test]
fn comparator_may_use_the_container() {
    let map = Arc::new(OrderedContainer::new());
    map.set("low", 1);
    map.set("high", 9);
    map.set("mid", 5);

    let lookup = Arc::clone(&map);
    let by_value: &dyn Fn(&&str, &&str) -> bool =
        &move |a, b| lookup.get(*a).unwrap_or(0) < lookup.get(*b).unwrap_or(0);

    let sorted = map.sorted_pairs(Some(by_value)).unwrap();
    assert_eq!(sorted, vec![("low", 1), ("mid", 5), ("high", 9)]);
}

#[test]
fn inconsistent_comparator_does_not_panic() {
    let map = OrderedContainer::new();
    for i in 0..200 {
        map.set(i, i);
    }

    let flips = AtomicUsize::new(0);
    let chaotic: &dyn Fn(&i32, &i32) -> bool = &|_, _| flips.fetch_add(1, Ordering::Relaxed) % 2 == 0;
    let mut sorted: Vec<_> = map.sorted_pairs(Some(chaotic)).unwrap();

    sorted.sort_unstable();
    assert_eq!(sorted, map.pairs());
}

#[test]
fn writers_proceed_while_comparator_runs() {
    let map = OrderedContainer::builder()
        .default_comparator(|a: &i32, b: &i32| a < b)
        .build();
    for i in (0..20).rev() {
        map.set(i, i);
    }

    let (started_tx, started_rx) = std::sync::mpsc::channel::<()>();
    let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();

    std::thread::scope(|s| {
        let map = &map;
        let sorter = s.spawn(move || {
            let first = std::cell::Cell::new(true);
            let slow: &dyn Fn(&i32, &i32) -> bool = &|a, b| {
                if first.replace(false) {
                    started_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                }
                a < b
            };
            map.sorted_pairs(Some(slow)).unwrap()
        });

        started_rx.recv().unwrap();
        // the sorter is parked inside its comparator; this write must not wait for it
        map.set(100, 100);
        release_tx.send(()).unwrap();

        let sorted = sorter.join().unwrap();
        assert_eq!(sorted.len(), 20);
        assert_eq!(sorted.first(), Some(&(0, 0)));
    });

    assert_eq!(map.len(), 21);
}

// ─── Lifecycle, construction, config ─────────────────────────────────────────

#[test]
fn clear_empties_and_stays_usable() {
    let map = OrderedContainer::with_capacity(16);
    map.set("a", 1);
    map.set("b", 2);
    let capacity = map.capacity();

    map.clear();
    assert!(map.is_empty());
    assert!(map.pairs().is_empty());
    assert_eq!(map.get(&"a"), None);
    assert_eq!(map.capacity(), capacity);

    map.set("b", 3);
    map.set("a", 4);
    assert_eq!(map.pairs(), vec![("b", 3), ("a", 4)]);
}

#[test]
fn capacity_hint_zero_is_ignored_and_last_positive_wins() {
    let map: OrderedContainer<u32, u32> = OrderedContainer::builder()
        .capacity_hint(100)
        .capacity_hint(0)
        .build();
    assert!(map.capacity() >= 100);

    let map: OrderedContainer<u32, u32> = OrderedContainer::builder()
        .capacity_hint(0)
        .build();
    assert_eq!(map.capacity(), 0);
}

#[test]
fn last_default_comparator_wins() {
    let map = OrderedContainer::builder()
        .default_comparator(|a: &i32, b: &i32| a < b)
        .default_comparator(|a: &i32, b: &i32| a > b)
        .build();
    map.set(1, ());
    map.set(3, ());
    map.set(2, ());

    let keys: Vec<_> = map.sorted_pairs(None).unwrap().into_iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec![3, 2, 1]);
    assert!(map.default_comparator().is_some());
}

#[test]
fn config_from_toml_drives_construction() {
    let config = Config::from_toml("capacity = 32\norder = \"descending\"").unwrap();
    assert_eq!(config.order, Some(KeyOrder::Descending));

    let map = OrderedContainer::builder().config(&config).build();
    assert!(map.capacity() >= 32);

    map.set("alpha", 1);
    map.set("gamma", 3);
    map.set("beta", 2);
    let keys: Vec<_> = map.sorted_pairs(None).unwrap().into_iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["gamma", "beta", "alpha"]);
}

#[test]
fn explicit_hasher_and_into_inner() {
    let map = OrderedContainer::with_hasher(RandomState::<1, 3>::with_keys(1, 2));
    map.set("a", 1);
    map.set("b", 2);

    let inner: OrderedMap<_, _, _> = map.into_inner();
    assert_eq!(inner.get_index_of("b"), Some(1));
    assert_eq!(inner[&"a"], 1);

    let again = OrderedContainer::from(inner);
    assert_eq!(again.keys(), vec!["a", "b"]);
}

#[test]
fn get_with_borrows_without_cloning() {
    struct NotClone(Vec<u8>);

    let map = OrderedContainer::new();
    map.set("blob", NotClone(vec![1, 2, 3]));

    assert_eq!(map.get_with("blob", |v| v.0.len()), Some(3));
    assert_eq!(map.get_with("missing", |v| v.0.len()), None);
}

#[test]
fn serializes_in_order() {
    let map: OrderedContainer<String, i32> = OrderedContainer::new();
    map.set("z".into(), 1);
    map.set("a".into(), 2);
    map.set("m".into(), 3);

    let json = serde_json::to_string(&map).unwrap();
    assert_eq!(json, r#"{"z":1,"a":2,"m":3}"#);

    let back: OrderedContainer<String, i32> = serde_json::from_str(&json).unwrap();
    assert_eq!(back.pairs(), map.pairs());
}

#[test]
fn debug_lists_entries_in_order() {
    let map = OrderedContainer::new();
    map.set(2, "two");
    map.set(1, "one");
    assert_eq!(format!("{:?}", map), r#"{2: "two", 1: "one"}"#);
}

#[test]
fn mixed_readers_and_writers() {
    let map = OrderedContainer::new();
    for i in 0..100 {
        map.set(i, 0u64);
    }

    std::thread::scope(|s| {
        for t in 0..4 {
            let map = &map;
            s.spawn(move || {
                for i in 0..100 {
                    map.upsert_with(i, 0, |v| v + 1);
                    if i % 10 == t {
                        map.delete(&(1000 + i));
                        let _ = map.insert_after(&i, 1000 + i, 0);
                    }
                }
            });
            s.spawn(move || {
                for _ in 0..50 {
                    let keys = map.keys();
                    let mut unique = keys.clone();
                    unique.sort_unstable();
                    unique.dedup();
                    assert_eq!(unique.len(), keys.len());
                }
            });
        }
    });

    for i in 0..100 {
        assert_eq!(map.get(&i), Some(4));
    }
}

// ─── Properties ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Op {
    Set(u8, u32),
    Upsert(u8, u32),
    Delete(u8),
    Before(u8, u8, u32),
    After(u8, u8, u32),
    Clear,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (any::<u8>(), any::<u32>()).prop_map(|(k, v)| Op::Set(k % 32, v)),
        2 => (any::<u8>(), any::<u32>()).prop_map(|(k, v)| Op::Upsert(k % 32, v)),
        3 => any::<u8>().prop_map(|k| Op::Delete(k % 32)),
        2 => (any::<u8>(), any::<u8>(), any::<u32>()).prop_map(|(t, k, v)| Op::Before(t % 32, k % 32, v)),
        2 => (any::<u8>(), any::<u8>(), any::<u32>()).prop_map(|(t, k, v)| Op::After(t % 32, k % 32, v)),
        1 => Just(Op::Clear),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Replays random operations against a plain `Vec` model and compares after every step.
    #[test]
    fn matches_vec_model(ops in proptest::collection::vec(op_strategy(), 1..200)) {
        let map = OrderedContainer::new();
        let mut model: Vec<(u8, u32)> = Vec::new();

        for op in &ops {
            match *op {
                Op::Set(k, v) => {
                    map.set(k, v);
                    match model.iter_mut().find(|(mk, _)| *mk == k) {
                        Some(entry) => entry.1 = v,
                        None => model.push((k, v)),
                    }
                }
                Op::Upsert(k, v) => {
                    let got = map.upsert(k, v, Some(&|old: &u32| old.wrapping_add(1))).unwrap();
                    let want = match model.iter_mut().find(|(mk, _)| *mk == k) {
                        Some(entry) => {
                            entry.1 = entry.1.wrapping_add(1);
                            (entry.1, false)
                        }
                        None => {
                            model.push((k, v));
                            (v, true)
                        }
                    };
                    prop_assert_eq!(got, want);
                }
                Op::Delete(k) => {
                    let got = map.delete(&k);
                    let want = model.iter().position(|(mk, _)| *mk == k).map(|i| model.remove(i).1);
                    prop_assert_eq!(got, want);
                }
                Op::Before(t, k, v) | Op::After(t, k, v) => {
                    let after = matches!(op, Op::After(..));
                    let got = if after {
                        map.insert_after(&t, k, v)
                    } else {
                        map.insert_before(&t, k, v)
                    };
                    let want = if model.iter().any(|(mk, _)| *mk == k) {
                        Err(Error::DuplicateKey)
                    } else if let Some(i) = model.iter().position(|(mk, _)| *mk == t) {
                        model.insert(if after { i + 1 } else { i }, (k, v));
                        Ok(())
                    } else {
                        Err(Error::TargetNotFound)
                    };
                    prop_assert_eq!(got, want);
                }
                Op::Clear => {
                    map.clear();
                    model.clear();
                }
            }

            prop_assert_eq!(map.pairs(), model.clone());
            prop_assert_eq!(map.len(), model.len());
        }
    }

    /// Re-setting existing keys never moves them.
    #[test]
    fn set_never_reorders(
        keys in proptest::collection::vec(any::<u16>(), 1..64),
        updates in proptest::collection::vec((any::<prop::sample::Index>(), any::<u32>()), 0..64),
    ) {
        let map = OrderedContainer::new();
        for k in &keys {
            map.set(*k, 0u32);
        }
        let before = map.keys();

        for (index, v) in updates {
            map.set(*index.get(&before), v);
        }

        prop_assert_eq!(map.keys(), before);
    }

    /// Keys the comparator treats as equal come out in their stored order.
    #[test]
    fn sorted_pairs_is_stable(keys in proptest::collection::hash_set(any::<u16>(), 0..100)) {
        let map = OrderedContainer::builder()
            .default_comparator(|a: &u16, b: &u16| a % 7 < b % 7)
            .build();
        for (i, k) in keys.iter().enumerate() {
            map.set(*k, i);
        }

        let sorted = map.sorted_pairs(None).unwrap();
        prop_assert_eq!(sorted.len(), keys.len());
        for pair in sorted.windows(2) {
            let (a, ia) = pair[0];
            let (b, ib) = pair[1];
            prop_assert!(a % 7 <= b % 7);
            if a % 7 == b % 7 {
                prop_assert!(ia < ib);
            }
        }
    }

    #[test]
    fn set_then_get_then_delete(k in any::<i64>(), v in any::<i64>()) {
        let map = OrderedContainer::new();
        map.set(k, v);
        prop_assert_eq!(map.get(&k), Some(v));
        prop_assert_eq!(map.delete(&k), Some(v));
        prop_assert_eq!(map.get(&k), None);
        prop_assert!(!map.has(&k));
    }
}

use super::*;

use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// Multiway tree vs BTreeSet
// =============================================================================

#[derive(Clone, Debug)]
enum TreeOp {
    Insert(i64),
    Get(i64),
    UpperBound(i64),
    LowerBound(i64),
    TrimBelow(i64),
}

fn tree_ops() -> impl Strategy<Value = Vec<TreeOp>> {
    let key = -200i64..=200;
    let op = prop_oneof![
        50 => key.clone().prop_map(TreeOp::Insert),
        15 => key.clone().prop_map(TreeOp::Get),
        13 => key.clone().prop_map(TreeOp::UpperBound),
        13 => key.clone().prop_map(TreeOp::LowerBound),
        4 => key.prop_map(TreeOp::TrimBelow),
    ];
    prop::collection::vec(op, 0..=400)
}

// =============================================================================
// Treap vs BTreeMap + brute force
// =============================================================================

#[derive(Clone, Debug)]
enum TreapOp {
    Insert(i64, i64),
    Closest(i64, i64),
}

fn treap_ops() -> impl Strategy<Value = Vec<TreapOp>> {
    let key = -100i64..=100;
    let priority = -50i64..=50;
    let op = prop_oneof![
        60 => (key.clone(), priority.clone()).prop_map(|(k, p)| TreapOp::Insert(k, p)),
        40 => (key, priority).prop_map(|(k, p)| TreapOp::Closest(k, p)),
    ];
    prop::collection::vec(op, 0..=300)
}

fn heap_order() -> impl Strategy<Value = HeapOrder> {
    prop_oneof![Just(HeapOrder::Min), Just(HeapOrder::Max)]
}

fn model_closest(
    model: &BTreeMap<i64, i64>,
    order: HeapOrder,
    key: i64,
    threshold: i64,
) -> Option<i64> {
    model
        .iter()
        .filter(|(_, &p)| match order {
            HeapOrder::Min => p >= threshold,
            HeapOrder::Max => p <= threshold,
        })
        .map(|(&k, _)| k)
        .min_by_key(|k| ((key - k).abs(), *k))
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn btree_matches_btreeset(factor in 1usize..=4, ops in tree_ops()) {
        let mut tree = BTree::with_factor(factor);
        let mut model: BTreeSet<i64> = BTreeSet::new();

        for op in ops {
            match op {
                TreeOp::Insert(key) => {
                    prop_assert_eq!(tree.insert(key), model.insert(key));
                }
                TreeOp::Get(key) => {
                    prop_assert_eq!(tree.get(&key), model.get(&key));
                }
                TreeOp::UpperBound(key) => {
                    prop_assert_eq!(
                        tree.upper_bound(&key).copied(),
                        model.range(key..).next().copied()
                    );
                }
                TreeOp::LowerBound(key) => {
                    prop_assert_eq!(
                        tree.lower_bound(&key).copied(),
                        model.range(..=key).next_back().copied()
                    );
                }
                TreeOp::TrimBelow(bound) => {
                    tree.trim_below(&bound);
                    model = model.split_off(&bound);
                }
            }
            prop_assert_eq!(tree.len(), model.len());
        }

        tree.check_invariants();
        let got: Vec<i64> = tree.iter().copied().collect();
        let expected: Vec<i64> = model.iter().copied().collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn btree_leaves_stay_level_without_trims(keys in prop::collection::vec(-500i64..=500, 1..=300)) {
        let mut tree = BTree::with_factor(2);
        for key in keys {
            tree.insert(key);
        }
        tree.check_invariants();

        // Splits only ever add a level at the root, so the leftmost-path
        // height and the breadth-first snapshot depth must agree.
        prop_assert_eq!(tree.height(), tree.level_keys().len());
    }

    #[test]
    fn treap_matches_model(
        order in heap_order(),
        seed in (-100i64..=100, -50i64..=50),
        ops in treap_ops(),
    ) {
        let (seed_key, seed_priority) = seed;
        let mut treap = Treap::with_order(seed_key, seed_priority, order);
        let mut model: BTreeMap<i64, i64> = BTreeMap::new();
        model.insert(seed_key, seed_priority);

        for op in ops {
            match op {
                TreapOp::Insert(key, priority) => {
                    let fresh = !model.contains_key(&key);
                    prop_assert_eq!(treap.insert(key, priority), fresh);
                    model.entry(key).or_insert(priority);
                }
                TreapOp::Closest(key, threshold) => {
                    prop_assert_eq!(
                        treap.closest_with_min_priority(key, threshold),
                        model_closest(&model, order, key, threshold)
                    );
                }
            }
            prop_assert_eq!(treap.len(), model.len());
        }

        treap.check_invariants();
        let got: Vec<(i64, i64)> = treap.iter().map(|(k, p)| (*k, *p)).collect();
        let expected: Vec<(i64, i64)> = model.iter().map(|(k, p)| (*k, *p)).collect();
        prop_assert_eq!(got, expected);
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

#[test]
fn exhaustive_insert_order_small_set() {
    let keys: Vec<i64> = vec![2, 3, 5, 8, 13, 21, 34];

    for_each_permutation(&keys, |perm| {
        let mut tree = BTree::with_factor(2);
        for key in perm {
            assert!(tree.insert(key));
        }

        tree.check_invariants();
        let got: Vec<i64> = tree.iter().copied().collect();
        assert_eq!(got, vec![2, 3, 5, 8, 13, 21, 34]);
    });
}

#[test]
fn exhaustive_treap_insert_order_small_set() {
    let entries: Vec<(i64, i64)> = vec![(1, 30), (4, 10), (6, 40), (8, 20), (9, 50)];

    for_each_permutation(&entries, |perm| {
        let mut iter = perm.into_iter();
        let (seed_key, seed_priority) = iter.next().expect("permutation is nonempty");
        let mut treap = Treap::new(seed_key, seed_priority);
        for (key, priority) in iter {
            assert!(treap.insert(key, priority));
        }

        treap.check_invariants();
        let keys: Vec<i64> = treap.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![1, 4, 6, 8, 9]);
        // Distinct priorities pin the root: the min-priority entry always
        // surfaces there, whatever the insertion order.
        assert_eq!(treap.level_keys()[0], vec![4]);
        assert_eq!(treap.level_priorities()[0], vec![10]);
    });
}

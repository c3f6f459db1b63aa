use avl_bst::avl_tree::{AvlMap, AvlSet};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::vec::Vec;

fn assert_height_bound(height: usize, len: usize) {
    let bound = 1.4405 * ((len + 2) as f64).log2();
    assert!(
        (height as f64) <= bound,
        "height {} exceeds the AVL bound {} for {} keys",
        height,
        bound,
        len,
    );
}

#[test]
fn int_test_avlmap() {
    let mut rng = StdRng::seed_from_u64(1);
    let mut map = AvlMap::new();
    let mut expected = Vec::new();
    for _ in 0..100_000 {
        let key = rng.gen::<u32>() % 50_000;
        let val = rng.gen::<u32>();

        map.insert(key, val);
        expected.push((key, val));
    }

    map.assert_invariants();
    assert_height_bound(map.height(), map.len());

    expected.reverse();
    expected.sort_by(|l, r| l.0.cmp(&r.0));
    expected.dedup_by_key(|pair| pair.0);

    assert_eq!(map.len(), expected.len());

    assert_eq!(map.min(), Some(&expected[0].0));
    assert_eq!(map.max(), Some(&expected[expected.len() - 1].0));

    for entry in &expected {
        assert!(map.contains_key(&entry.0));
        assert_eq!(map.get(&entry.0), Some(&entry.1));
    }

    for entry in &mut expected {
        let val_1 = rng.gen::<u32>();
        let val_2 = rng.gen::<u32>();

        let old_val = map.insert(entry.0, val_1);
        assert_eq!(old_val, Some(entry.1));
        {
            let old_val = map.get_mut(&entry.0);
            *old_val.unwrap() = val_2;
        }
        entry.1 = val_2;
        assert_eq!(map.get(&entry.0), Some(&val_2));
    }

    assert_eq!(
        map.iter().map(|(key, val)| (*key, *val)).collect::<Vec<(u32, u32)>>(),
        expected,
    );

    expected.shuffle(&mut rng);

    let mut expected_len = expected.len();
    for (index, entry) in expected.into_iter().enumerate() {
        let old_entry = map.remove(&entry.0);
        expected_len -= 1;
        assert_eq!(old_entry, Some((entry.0, entry.1)));
        assert_eq!(map.len(), expected_len);
        if index % 1000 == 0 {
            map.assert_invariants();
            assert_height_bound(map.height(), map.len());
        }
    }

    assert!(map.is_empty());
    assert_eq!(map.height(), 0);
}

#[test]
fn int_test_avlset_interleaved() {
    let mut rng = StdRng::seed_from_u64(2);
    let mut set = AvlSet::with_chunk_size(64);
    let mut expected = Vec::new();
    for round in 0..20_000 {
        let key = rng.gen_range(0..2_000);
        if rng.gen_bool(0.6) {
            let inserted = set.insert(key);
            match expected.binary_search(&key) {
                Ok(_) => assert!(!inserted),
                Err(index) => {
                    assert!(inserted);
                    expected.insert(index, key);
                },
            }
        } else {
            let removed = set.remove(&key);
            match expected.binary_search(&key) {
                Ok(index) => {
                    assert_eq!(removed, Some(key));
                    expected.remove(index);
                },
                Err(_) => assert_eq!(removed, None),
            }
        }

        if round % 500 == 0 {
            set.assert_invariants();
        }
    }

    set.assert_invariants();
    assert_eq!(set.len(), expected.len());
    assert_eq!(set.iter().cloned().collect::<Vec<u32>>(), expected);
}

#[test]
fn int_test_sorted_runs() {
    let mut map = AvlMap::new();
    for key in 0..(1 << 12) - 1 {
        map.insert(key, ());
    }
    map.assert_invariants();
    assert_eq!(map.height(), 12);

    for key in (0..(1 << 12) - 1).step_by(2) {
        assert_eq!(map.remove(&key), Some((key, ())));
    }
    map.assert_invariants();
    assert_height_bound(map.height(), map.len());

    for key in (0..(1 << 12) - 1).rev() {
        map.remove(&key);
    }
    assert!(map.is_empty());
}

/// Calls `visit` with every permutation of `items`, generated with Heap's algorithm.
fn for_each_permutation<F>(items: &mut [u32], visit: &mut F)
where
    F: FnMut(&[u32]),
{
    let len = items.len();
    let mut counters = vec![0; len];
    visit(items);

    let mut index = 1;
    while index < len {
        if counters[index] < index {
            if index % 2 == 0 {
                items.swap(0, index);
            } else {
                items.swap(counters[index], index);
            }
            visit(items);
            counters[index] += 1;
            index = 1;
        } else {
            counters[index] = 0;
            index += 1;
        }
    }
}

fn insert_remove_all(order: &[u32], removal: &[u32]) {
    let mut set = AvlSet::with_chunk_size(4);
    for &key in order {
        assert!(set.insert(key));
        set.assert_invariants();
    }
    for &key in removal {
        assert_eq!(set.remove(&key), Some(key));
        set.assert_invariants();
    }
    assert!(set.is_empty());
}

#[test]
fn int_test_all_permutations() {
    for len in 0..=7 {
        let mut keys: Vec<u32> = (0..len).collect();
        let mut visited = 0;
        for_each_permutation(&mut keys, &mut |order| {
            let reversed: Vec<u32> = order.iter().rev().cloned().collect();
            insert_remove_all(order, order);
            insert_remove_all(order, &reversed);
            visited += 1;
        });
        assert_eq!(visited, (1..=len as usize).product::<usize>());
    }
}

#[test]
fn int_test_removal_orders_of_full_tree() {
    let mut keys: Vec<u32> = (0..7).collect();
    let ascending = keys.clone();
    for_each_permutation(&mut keys, &mut |removal| {
        insert_remove_all(&ascending, removal);
    });
}

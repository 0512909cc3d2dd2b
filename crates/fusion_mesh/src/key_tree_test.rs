use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;

fn assert_strictly_increasing(tree: &KeyTree<i32, i32>) {
  let keys = tree.keys();
  assert_eq!(keys.len(), tree.len());
  for pair in keys.windows(2) {
    assert!(pair[0] < pair[1], "In-order keys not increasing: {keys:?}");
  }
}

#[test]
fn test_empty_tree() {
  let tree: KeyTree<i32, ()> = KeyTree::new();
  assert!(tree.is_empty());
  assert_eq!(tree.height(), 0);
  assert!(tree.get(0).is_none());
  assert_eq!(tree.iter().count(), 0);
}

#[test]
fn test_insert_and_query() {
  let mut tree = KeyTree::new();
  assert!(tree.insert(5, "five"));
  assert!(tree.insert(-3, "minus three"));
  assert!(tree.insert(12, "twelve"));

  assert_eq!(tree.get(5), Some(&"five"));
  assert_eq!(tree.get(-3), Some(&"minus three"));
  assert_eq!(tree.get(7), None, "Query must not create entries");
  assert_eq!(tree.len(), 3);
}

#[test]
fn test_duplicate_insert_reuses_existing() {
  let mut tree = KeyTree::new();
  assert!(tree.insert(1, 10));
  assert!(!tree.insert(1, 20), "Second insert of same key is a no-op");
  assert_eq!(tree.get(1), Some(&10));
  assert_eq!(tree.len(), 1);

  let (value, created) = tree.get_or_insert_with(1, || 30);
  assert!(!created);
  assert_eq!(*value, 10);

  let (value, created) = tree.get_or_insert_with(2, || 30);
  assert!(created);
  *value += 1;
  assert_eq!(tree.get(2), Some(&31));
}

#[test]
fn test_iteration_is_in_key_order() {
  let mut tree = KeyTree::new();
  for key in [40, 10, 30, -20, 0, 50, 20] {
    tree.insert(key, key * 2);
  }

  let collected: Vec<_> = tree.iter().map(|(k, v)| (k, *v)).collect();
  assert_eq!(
    collected,
    vec![(-20, -40), (0, 0), (10, 20), (20, 40), (30, 60), (40, 80), (50, 100)]
  );

  // Restartable: a second pass yields the same sequence.
  let again: Vec<_> = tree.iter().map(|(k, _)| k).collect();
  assert_eq!(again, tree.keys());
}

#[test]
fn test_iter_mut_visits_each_value_once() {
  let mut tree = KeyTree::new();
  for key in 0..32 {
    tree.insert(key, 0u32);
  }
  for (_, value) in tree.iter_mut() {
    *value += 1;
  }
  assert!(tree.iter().all(|(_, v)| *v == 1));

  let keys: Vec<_> = tree.iter_mut().map(|(k, _)| k).collect();
  assert_eq!(keys, (0..32).collect::<Vec<_>>());
}

#[test]
fn test_remove_leaf_single_child_and_two_children() {
  let mut tree = KeyTree::new();
  for key in [50, 30, 70, 20, 40, 60, 80, 65] {
    tree.insert(key, key);
  }

  // Leaf
  assert_eq!(tree.remove(20), Some(20));
  assert_strictly_increasing(&tree);

  // Single child (60 has right child 65)
  assert_eq!(tree.remove(60), Some(60));
  assert_strictly_increasing(&tree);
  assert_eq!(tree.get(65), Some(&65));

  // Two children: replaced by in-order successor
  assert_eq!(tree.remove(50), Some(50));
  assert_strictly_increasing(&tree);
  assert_eq!(tree.keys(), vec![30, 40, 65, 70, 80]);

  assert_eq!(tree.remove(999), None, "Removing absent key is not an error");
  assert_eq!(tree.len(), 5);
}

#[test]
fn test_removed_slots_are_reused() {
  let mut tree = KeyTree::new();
  for key in 0..8 {
    tree.insert(key, key);
  }
  let arena_len = tree.nodes.len();

  tree.remove(3);
  tree.remove(5);
  tree.insert(100, 100);
  tree.insert(101, 101);

  assert_eq!(tree.nodes.len(), arena_len, "Free slots should be recycled");
  assert_strictly_increasing(&tree);
}

#[test]
fn test_bst_invariant_under_random_operations() {
  let mut rng = StdRng::seed_from_u64(0xC0FFEE);
  let mut tree = KeyTree::new();
  let mut reference = std::collections::BTreeMap::new();

  for _ in 0..4000 {
    let key = rng.random_range(-300..300);
    if rng.random_bool(0.6) {
      let inserted = tree.insert(key, key);
      assert_eq!(inserted, reference.insert(key, key).is_none());
    } else {
      assert_eq!(tree.remove(key), reference.remove(&key));
    }
    assert_strictly_increasing(&tree);
  }

  assert_eq!(tree.keys(), reference.keys().copied().collect::<Vec<_>>());
}

#[test]
fn test_monotonic_inserts_stay_balanced() {
  let mut tree = KeyTree::new();
  for key in 0..1024 {
    tree.insert(key, ());
  }
  // AVL bound: height < 1.45 * log2(n + 2)
  assert!(
    tree.height() <= 15,
    "Sequential keys degenerated the tree (height {})",
    tree.height()
  );
}

#[test]
fn test_drain_returns_sorted_entries_and_empties() {
  let mut tree = KeyTree::new();
  for key in [3, 1, 2] {
    tree.insert(key, key * 10);
  }
  let drained = tree.drain();
  assert_eq!(drained, vec![(1, 10), (2, 20), (3, 30)]);
  assert!(tree.is_empty());
  assert!(tree.get(1).is_none());
}

#[test]
fn test_clear_releases_everything() {
  let mut tree = KeyTree::new();
  for key in 0..10 {
    tree.insert(key, key);
  }
  tree.clear();
  assert!(tree.is_empty());
  assert_eq!(tree.keys(), Vec::<i32>::new());
  assert!(tree.insert(4, 4));
}

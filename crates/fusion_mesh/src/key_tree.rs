//! KeyTree - ordered map from integer keys to owned values.
//!
//! Nodes live in an arena and refer to their children by [`NodeId`] handle, so
//! the tree has no parent back-pointers and no ownership cycles. Removed slots
//! go on a free list and are reused by later inserts.
//!
//! The tree is a binary search tree ordered by key and rebalanced with AVL
//! rotations, so monotonically increasing keys (a sensor sweeping along a
//! line) keep lookups logarithmic.
//!
//! ```text
//!   arena:  [ n0 | n1 | n2 | n3 (free) | n4 ]       free: [3]
//!
//!              n1 (key 7)
//!             /          \
//!        n0 (key 2)    n4 (key 9)
//!                        /
//!                   n2 (key 8)
//! ```

use std::cmp::Ordering;

/// Handle to a node slot in the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
  #[inline]
  fn index(self) -> usize {
    self.0 as usize
  }
}

struct Node<K, T> {
  key: K,
  value: Option<T>,
  left: Option<NodeId>,
  right: Option<NodeId>,
  height: i32,
}

/// Arena-backed balanced binary search tree.
pub struct KeyTree<K, T> {
  nodes: Vec<Node<K, T>>,
  free: Vec<NodeId>,
  root: Option<NodeId>,
  len: usize,
}

impl<K: Ord + Copy, T> KeyTree<K, T> {
  /// Create an empty tree.
  pub fn new() -> Self {
    Self {
      nodes: Vec::new(),
      free: Vec::new(),
      root: None,
      len: 0,
    }
  }

  /// Number of stored entries.
  pub fn len(&self) -> usize {
    self.len
  }

  /// True when no entries are stored.
  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  /// Height of the tree (0 when empty).
  pub fn height(&self) -> i32 {
    self.height_of(self.root)
  }

  /// Look up the value stored under `key`. Never creates an entry.
  pub fn get(&self, key: K) -> Option<&T> {
    let id = self.find(key)?;
    self.nodes[id.index()].value.as_ref()
  }

  /// Mutable lookup. Never creates an entry.
  pub fn get_mut(&mut self, key: K) -> Option<&mut T> {
    let id = self.find(key)?;
    self.nodes[id.index()].value.as_mut()
  }

  /// True when `key` is present.
  pub fn contains_key(&self, key: K) -> bool {
    self.find(key).is_some()
  }

  /// Return the value under `key`, inserting `make()` first if it is absent.
  ///
  /// The boolean is true when a new entry was created.
  pub fn get_or_insert_with(&mut self, key: K, make: impl FnOnce() -> T) -> (&mut T, bool) {
    let (id, created) = match self.find(key) {
      Some(id) => (id, false),
      None => {
        let id = self.alloc(key, None);
        self.root = Some(self.insert_node(self.root, id));
        self.len += 1;
        (id, true)
      }
    };
    (self.nodes[id.index()].value.get_or_insert_with(make), created)
  }

  /// Insert `value` under `key` unless the key is already present.
  ///
  /// Returns false (and drops `value`) when the key already existed; the
  /// stored entry is left untouched.
  pub fn insert(&mut self, key: K, value: T) -> bool {
    if self.find(key).is_some() {
      return false;
    }
    let id = self.alloc(key, Some(value));
    self.root = Some(self.insert_node(self.root, id));
    self.len += 1;
    true
  }

  /// Remove the entry under `key`, returning its value.
  pub fn remove(&mut self, key: K) -> Option<T> {
    let (root, removed) = self.remove_node(self.root, key);
    self.root = root;
    let removed = removed?;

    let slot = &mut self.nodes[removed.index()];
    slot.left = None;
    slot.right = None;
    let value = slot.value.take();
    self.free.push(removed);
    self.len -= 1;
    value
  }

  /// Drop every entry and release the arena.
  pub fn clear(&mut self) {
    self.nodes.clear();
    self.free.clear();
    self.root = None;
    self.len = 0;
  }

  /// Keys in ascending order.
  pub fn keys(&self) -> Vec<K> {
    self
      .in_order_ids()
      .into_iter()
      .map(|id| self.nodes[id.index()].key)
      .collect()
  }

  /// In-order iteration (ascending keys).
  pub fn iter(&self) -> impl Iterator<Item = (K, &T)> + '_ {
    InOrder {
      tree: self,
      stack: Vec::new(),
      cursor: self.root,
    }
  }

  /// In-order mutable iteration (ascending keys).
  pub fn iter_mut(&mut self) -> impl Iterator<Item = (K, &mut T)> + '_ {
    let order = self.in_order_ids();
    let mut slots: Vec<Option<(K, &mut T)>> = self
      .nodes
      .iter_mut()
      .map(|node| {
        let key = node.key;
        node.value.as_mut().map(|value| (key, value))
      })
      .collect();
    order.into_iter().filter_map(move |id| slots[id.index()].take())
  }

  /// Drain every entry in ascending key order, leaving the tree empty.
  pub fn drain(&mut self) -> Vec<(K, T)> {
    let order = self.in_order_ids();
    let mut out = Vec::with_capacity(order.len());
    for id in order {
      let node = &mut self.nodes[id.index()];
      if let Some(value) = node.value.take() {
        out.push((node.key, value));
      }
    }
    self.clear();
    out
  }

  // ---------------------------------------------------------------------------
  // Internals
  // ---------------------------------------------------------------------------

  fn find(&self, key: K) -> Option<NodeId> {
    let mut cursor = self.root;
    while let Some(id) = cursor {
      let node = &self.nodes[id.index()];
      cursor = match key.cmp(&node.key) {
        Ordering::Less => node.left,
        Ordering::Greater => node.right,
        Ordering::Equal => return Some(id),
      };
    }
    None
  }

  fn alloc(&mut self, key: K, value: Option<T>) -> NodeId {
    let node = Node {
      key,
      value,
      left: None,
      right: None,
      height: 1,
    };
    match self.free.pop() {
      Some(id) => {
        self.nodes[id.index()] = node;
        id
      }
      None => {
        self.nodes.push(node);
        NodeId((self.nodes.len() - 1) as u32)
      }
    }
  }

  fn in_order_ids(&self) -> Vec<NodeId> {
    let mut out = Vec::with_capacity(self.len);
    let mut stack = Vec::new();
    let mut cursor = self.root;
    loop {
      while let Some(id) = cursor {
        stack.push(id);
        cursor = self.nodes[id.index()].left;
      }
      let Some(id) = stack.pop() else {
        break;
      };
      out.push(id);
      cursor = self.nodes[id.index()].right;
    }
    out
  }

  /// Insert a detached node below `subtree`, returning the new subtree root.
  fn insert_node(&mut self, subtree: Option<NodeId>, id: NodeId) -> NodeId {
    let Some(root) = subtree else {
      return id;
    };

    let key = self.nodes[id.index()].key;
    if key < self.nodes[root.index()].key {
      let left = self.insert_node(self.nodes[root.index()].left, id);
      self.nodes[root.index()].left = Some(left);
    } else {
      let right = self.insert_node(self.nodes[root.index()].right, id);
      self.nodes[root.index()].right = Some(right);
    }
    self.rebalance(root)
  }

  /// Unlink the node holding `key` from `subtree`.
  ///
  /// Returns the new subtree root and the detached node, if found. A node
  /// with two children is replaced by its in-order successor (the minimum of
  /// its right subtree); a node with fewer children is spliced out.
  fn remove_node(&mut self, subtree: Option<NodeId>, key: K) -> (Option<NodeId>, Option<NodeId>) {
    let Some(root) = subtree else {
      return (None, None);
    };

    match key.cmp(&self.nodes[root.index()].key) {
      Ordering::Less => {
        let (left, removed) = self.remove_node(self.nodes[root.index()].left, key);
        self.nodes[root.index()].left = left;
        (Some(self.rebalance(root)), removed)
      }
      Ordering::Greater => {
        let (right, removed) = self.remove_node(self.nodes[root.index()].right, key);
        self.nodes[root.index()].right = right;
        (Some(self.rebalance(root)), removed)
      }
      Ordering::Equal => {
        let left = self.nodes[root.index()].left;
        let right = self.nodes[root.index()].right;
        let replacement = match (left, right) {
          (None, None) => None,
          (Some(child), None) | (None, Some(child)) => Some(child),
          (Some(_), Some(right)) => {
            let (new_right, successor) = self.detach_min(right);
            let node = &mut self.nodes[successor.index()];
            node.left = left;
            node.right = new_right;
            Some(self.rebalance(successor))
          }
        };
        (replacement, Some(root))
      }
    }
  }

  /// Detach the minimum node of `subtree`, returning (new root, minimum).
  fn detach_min(&mut self, subtree: NodeId) -> (Option<NodeId>, NodeId) {
    match self.nodes[subtree.index()].left {
      None => (self.nodes[subtree.index()].right, subtree),
      Some(left) => {
        let (new_left, min) = self.detach_min(left);
        self.nodes[subtree.index()].left = new_left;
        (Some(self.rebalance(subtree)), min)
      }
    }
  }

  #[inline]
  fn height_of(&self, id: Option<NodeId>) -> i32 {
    id.map_or(0, |id| self.nodes[id.index()].height)
  }

  fn update_height(&mut self, id: NodeId) {
    let node = &self.nodes[id.index()];
    let height = 1 + self.height_of(node.left).max(self.height_of(node.right));
    self.nodes[id.index()].height = height;
  }

  fn balance_factor(&self, id: NodeId) -> i32 {
    let node = &self.nodes[id.index()];
    self.height_of(node.left) - self.height_of(node.right)
  }

  fn rotate_right(&mut self, id: NodeId) -> NodeId {
    let Some(pivot) = self.nodes[id.index()].left else {
      return id;
    };
    self.nodes[id.index()].left = self.nodes[pivot.index()].right;
    self.nodes[pivot.index()].right = Some(id);
    self.update_height(id);
    self.update_height(pivot);
    pivot
  }

  fn rotate_left(&mut self, id: NodeId) -> NodeId {
    let Some(pivot) = self.nodes[id.index()].right else {
      return id;
    };
    self.nodes[id.index()].right = self.nodes[pivot.index()].left;
    self.nodes[pivot.index()].left = Some(id);
    self.update_height(id);
    self.update_height(pivot);
    pivot
  }

  fn rebalance(&mut self, id: NodeId) -> NodeId {
    self.update_height(id);
    let balance = self.balance_factor(id);

    if balance > 1 {
      if let Some(left) = self.nodes[id.index()].left {
        if self.balance_factor(left) < 0 {
          let rotated = self.rotate_left(left);
          self.nodes[id.index()].left = Some(rotated);
        }
      }
      return self.rotate_right(id);
    }

    if balance < -1 {
      if let Some(right) = self.nodes[id.index()].right {
        if self.balance_factor(right) > 0 {
          let rotated = self.rotate_right(right);
          self.nodes[id.index()].right = Some(rotated);
        }
      }
      return self.rotate_left(id);
    }

    id
  }
}

impl<K: Ord + Copy, T> Default for KeyTree<K, T> {
  fn default() -> Self {
    Self::new()
  }
}

/// Borrowing in-order iterator.
struct InOrder<'a, K, T> {
  tree: &'a KeyTree<K, T>,
  stack: Vec<NodeId>,
  cursor: Option<NodeId>,
}

impl<'a, K: Copy, T> Iterator for InOrder<'a, K, T> {
  type Item = (K, &'a T);

  fn next(&mut self) -> Option<Self::Item> {
    loop {
      while let Some(id) = self.cursor {
        self.stack.push(id);
        self.cursor = self.tree.nodes[id.index()].left;
      }
      let id = self.stack.pop()?;
      let node = &self.tree.nodes[id.index()];
      self.cursor = node.right;
      if let Some(value) = node.value.as_ref() {
        return Some((node.key, value));
      }
    }
  }
}

#[cfg(test)]
#[path = "key_tree_test.rs"]
mod key_tree_test;

//! Binary search tree with an independent heap order on priorities.
//!
//! Keys follow the usual search-tree order; priorities follow a min- or
//! max-heap order chosen at construction. Inserts attach a leaf at the key's
//! search position and repair the heap order with one local rotation step per
//! ancestor on the way back up. The heap order is what makes
//! [`Treap::closest_with_min_priority`] cheap: once a node's priority clears
//! the threshold, its entire subtree does too, and the query collapses into a
//! plain nearest-key search.

use std::cmp::Ordering;
use std::fmt;
use std::mem;
use std::ops::Sub;

/// Which end of the priority scale wins the root.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeapOrder {
    /// Ancestors hold priorities no larger than their descendants'.
    Min,
    /// Ancestors hold priorities no smaller than their descendants'.
    Max,
}

impl HeapOrder {
    /// Whether a child with `child` priority may not sit below `parent`.
    #[inline]
    fn violated<P: Ord>(self, parent: &P, child: &P) -> bool {
        match self {
            HeapOrder::Min => child < parent,
            HeapOrder::Max => child > parent,
        }
    }

    /// Whether `priority` clears `threshold`: `>=` under [`HeapOrder::Min`],
    /// `<=` under [`HeapOrder::Max`]. This is the side of the heap order that
    /// is closed downward, so every descendant of a qualifying node
    /// qualifies too.
    #[inline]
    fn admits<P: Ord>(self, priority: &P, threshold: &P) -> bool {
        match self {
            HeapOrder::Min => priority >= threshold,
            HeapOrder::Max => priority <= threshold,
        }
    }
}

#[derive(Clone)]
struct TreapNode<K, P> {
    key: K,
    priority: P,
    left: Option<Box<TreapNode<K, P>>>,
    right: Option<Box<TreapNode<K, P>>>,
}

impl<K, P> TreapNode<K, P> {
    fn new(key: K, priority: P) -> Box<Self> {
        Box::new(TreapNode {
            key,
            priority,
            left: None,
            right: None,
        })
    }
}

/// Rotate the subtree right: the left child becomes the subtree root and the
/// old root becomes its right child, keeping key order intact.
fn rotate_right<K, P>(node: &mut Box<TreapNode<K, P>>) {
    let mut left = node.left.take().expect("rotation requires a left child");
    node.left = left.right.take();
    mem::swap(node, &mut left);
    node.right = Some(left);
}

/// Mirror of [`rotate_right`].
fn rotate_left<K, P>(node: &mut Box<TreapNode<K, P>>) {
    let mut right = node.right.take().expect("rotation requires a right child");
    node.right = right.left.take();
    mem::swap(node, &mut right);
    node.left = Some(right);
}

/// Absolute difference without a signedness requirement.
#[inline]
fn distance<K>(a: K, b: K) -> K
where
    K: Ord + Copy + Sub<Output = K>,
{
    if a >= b {
        a - b
    } else {
        b - a
    }
}

/// Of two candidates, the one nearer `key`; `a` wins ties. Both call sites
/// pass the smaller-side candidate first, so ties resolve to the smaller key.
#[inline]
fn closer_to<K>(key: K, a: K, b: K) -> K
where
    K: Ord + Copy + Sub<Output = K>,
{
    if distance(key, b) < distance(key, a) {
        b
    } else {
        a
    }
}

/// A treap: search tree on keys, heap on priorities.
///
/// Constructed around its first entry (there is no empty state) with a
/// fixed [`HeapOrder`]. Keys are unique; inserting an existing key is a
/// no-op that keeps the original priority.
pub struct Treap<K, P> {
    root: Box<TreapNode<K, P>>,
    order: HeapOrder,
    len: usize,
}

impl<K, P> Treap<K, P> {
    /// Create a min-ordered treap seeded with its first entry.
    pub fn new(key: K, priority: P) -> Self {
        Self::with_order(key, priority, HeapOrder::Min)
    }

    /// Create a treap with an explicit heap order.
    pub fn with_order(key: K, priority: P, order: HeapOrder) -> Self {
        Treap {
            root: TreapNode::new(key, priority),
            order,
            len: 1,
        }
    }

    /// The heap order fixed at construction.
    #[inline]
    pub fn order(&self) -> HeapOrder {
        self.order
    }

    /// Number of stored entries; never zero.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True maximum depth over both branches. Unlike a proactively split
    /// multiway tree, a treap's balance is probabilistic, so every path has
    /// to be measured.
    pub fn height(&self) -> usize {
        fn depth_of<K, P>(node: &TreapNode<K, P>) -> usize {
            let left = node.left.as_deref().map_or(0, depth_of);
            let right = node.right.as_deref().map_or(0, depth_of);
            1 + left.max(right)
        }
        depth_of(&self.root)
    }

    fn levels_by<T>(&self, field: impl Fn(&TreapNode<K, P>) -> T) -> Vec<Vec<T>> {
        let mut levels = Vec::new();
        let mut current: Vec<&TreapNode<K, P>> = vec![&self.root];
        while !current.is_empty() {
            levels.push(current.iter().map(|node| field(node)).collect());
            current = current
                .into_iter()
                .flat_map(|node| [node.left.as_deref(), node.right.as_deref()])
                .flatten()
                .collect();
        }
        levels
    }

    /// Per-depth snapshot of the keys, breadth-first.
    pub fn level_keys(&self) -> Vec<Vec<K>>
    where
        K: Clone,
    {
        self.levels_by(|node| node.key.clone())
    }

    /// Per-depth snapshot of the priorities, breadth-first.
    pub fn level_priorities(&self) -> Vec<Vec<P>>
    where
        P: Clone,
    {
        self.levels_by(|node| node.priority.clone())
    }

    /// Iterator over `(key, priority)` pairs in ascending key order.
    pub fn iter(&self) -> Iter<'_, K, P> {
        let mut iter = Iter { stack: Vec::new() };
        iter.push_left_spine(&self.root);
        iter
    }
}

impl<K: Ord, P: Ord> Treap<K, P> {
    /// Insert `key` with `priority` if the key is absent. Returns whether an
    /// insertion happened; a duplicate key is a no-op reported as `false`.
    ///
    /// The new node attaches as a leaf at its search position; each ancestor
    /// on the way back up then runs one heap-repair step, so a violation is
    /// fixed locally and carried upward exactly once per level.
    pub fn insert(&mut self, key: K, priority: P) -> bool {
        let inserted = Self::insert_below(self.order, &mut self.root, key, priority);
        if inserted {
            self.len += 1;
        }
        inserted
    }

    fn insert_below(
        order: HeapOrder,
        node: &mut Box<TreapNode<K, P>>,
        key: K,
        priority: P,
    ) -> bool {
        let inserted = match key.cmp(&node.key) {
            Ordering::Equal => return false,
            Ordering::Less => match node.left.as_mut() {
                Some(left) => Self::insert_below(order, left, key, priority),
                None => {
                    node.left = Some(TreapNode::new(key, priority));
                    true
                }
            },
            Ordering::Greater => match node.right.as_mut() {
                Some(right) => Self::insert_below(order, right, key, priority),
                None => {
                    node.right = Some(TreapNode::new(key, priority));
                    true
                }
            },
        };
        if inserted {
            Self::sift(order, node);
        }
        inserted
    }

    /// One heap-repair step at `node`: a left child that out-prioritizes the
    /// node rotates over it to the right, then the same check runs against
    /// the (possibly new) right child.
    fn sift(order: HeapOrder, node: &mut Box<TreapNode<K, P>>) {
        if node
            .left
            .as_ref()
            .map_or(false, |left| order.violated(&node.priority, &left.priority))
        {
            rotate_right(node);
        }
        if node
            .right
            .as_ref()
            .map_or(false, |right| order.violated(&node.priority, &right.priority))
        {
            rotate_left(node);
        }
    }
}

impl<K, P> Treap<K, P>
where
    K: Ord + Copy + Sub<Output = K>,
    P: Ord,
{
    /// The stored key closest to `key` by absolute difference among entries
    /// whose priority clears `min_priority` under the tree's heap order
    /// (`>=` for min-trees, `<=` for max-trees), or `None` if nothing
    /// qualifies. Ties resolve to the smaller key.
    pub fn closest_with_min_priority(&self, key: K, min_priority: P) -> Option<K> {
        Self::closest_below(self.order, &self.root, key, &min_priority)
    }

    fn closest_below(
        order: HeapOrder,
        node: &TreapNode<K, P>,
        key: K,
        threshold: &P,
    ) -> Option<K> {
        if order.admits(&node.priority, threshold) {
            // Qualification is closed downward, so the whole subtree
            // qualifies and priorities drop out of the search.
            return Some(Self::nearest_in(node, key));
        }
        let left = node
            .left
            .as_deref()
            .and_then(|left| Self::closest_below(order, left, key, threshold));
        let right = node
            .right
            .as_deref()
            .and_then(|right| Self::closest_below(order, right, key, threshold));
        match (left, right) {
            (Some(left), Some(right)) => Some(closer_to(key, left, right)),
            (left, right) => left.or(right),
        }
    }

    /// Nearest key to `key` within `node`'s subtree, ignoring priorities:
    /// an exact hit, or the closer of the subtree floor and ceiling.
    fn nearest_in(node: &TreapNode<K, P>, key: K) -> K {
        if node.key == key {
            return key;
        }
        match (Self::floor_in(node, key), Self::ceil_in(node, key)) {
            (Some(floor), Some(ceil)) => closer_to(key, floor, ceil),
            (Some(bound), None) | (None, Some(bound)) => bound,
            (None, None) => unreachable!("a nonempty subtree has a floor or a ceiling"),
        }
    }

    /// Largest key `<= key` in the subtree.
    fn floor_in(node: &TreapNode<K, P>, key: K) -> Option<K> {
        match key.cmp(&node.key) {
            Ordering::Equal => Some(key),
            Ordering::Less => node.left.as_deref().and_then(|left| Self::floor_in(left, key)),
            Ordering::Greater => node
                .right
                .as_deref()
                .and_then(|right| Self::floor_in(right, key))
                .or(Some(node.key)),
        }
    }

    /// Smallest key `>= key` in the subtree.
    fn ceil_in(node: &TreapNode<K, P>, key: K) -> Option<K> {
        match key.cmp(&node.key) {
            Ordering::Equal => Some(key),
            Ordering::Greater => node
                .right
                .as_deref()
                .and_then(|right| Self::ceil_in(right, key)),
            Ordering::Less => node
                .left
                .as_deref()
                .and_then(|left| Self::ceil_in(left, key))
                .or(Some(node.key)),
        }
    }
}

impl<K: Clone, P: Clone> Clone for Treap<K, P> {
    fn clone(&self) -> Self {
        Treap {
            root: self.root.clone(),
            order: self.order,
            len: self.len,
        }
    }
}

impl<K: fmt::Debug, P: fmt::Debug> fmt::Debug for Treap<K, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// In-order iterator: left spine down, then node, then the right subtree.
pub struct Iter<'a, K, P> {
    stack: Vec<&'a TreapNode<K, P>>,
}

impl<'a, K, P> Iter<'a, K, P> {
    fn push_left_spine(&mut self, mut node: &'a TreapNode<K, P>) {
        loop {
            self.stack.push(node);
            match node.left.as_deref() {
                Some(left) => node = left,
                None => break,
            }
        }
    }
}

impl<'a, K, P> Iterator for Iter<'a, K, P> {
    type Item = (&'a K, &'a P);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        if let Some(right) = node.right.as_deref() {
            self.push_left_spine(right);
        }
        Some((&node.key, &node.priority))
    }
}

#[cfg(test)]
impl<K: Ord, P: Ord> Treap<K, P> {
    /// Structural self-check used by the test suites: heap order on every
    /// parent-child edge, strictly ascending in-order keys, and the stored
    /// length.
    pub(crate) fn check_invariants(&self) {
        fn walk<K: Ord, P: Ord>(node: &TreapNode<K, P>, order: HeapOrder) -> usize {
            let mut count = 1;
            for child in [node.left.as_deref(), node.right.as_deref()]
                .into_iter()
                .flatten()
            {
                assert!(
                    !order.violated(&node.priority, &child.priority),
                    "heap order violated on a parent-child edge"
                );
                count += walk(child, order);
            }
            count
        }

        assert_eq!(walk(&self.root, self.order), self.len, "stored length is stale");

        let mut prev: Option<&K> = None;
        for (key, _) in self.iter() {
            if let Some(prev) = prev {
                assert!(prev < key, "in-order keys must be strictly ascending");
            }
            prev = Some(key);
        }
    }
}

//! Multiway search tree with proactive node splitting.
//!
//! Every node holds up to `2 * factor - 1` sorted keys and, when internal,
//! exactly one more child than keys. Full nodes are split on the way down
//! during insertion, so a split never has to propagate back upward. There is
//! no balanced delete; the only removal is [`BTree::trim_below`], which
//! discards everything below a bound without restoring occupancy.

use std::cmp::Ordering;
use std::fmt;
use std::mem;

use smallvec::SmallVec;

/// Inline capacity for per-node key storage. Nodes at the default factor
/// hold at most 3 keys; factors up to 4 stay inline before spilling.
const INLINE_KEYS: usize = 8;

type Keys<K> = SmallVec<[K; INLINE_KEYS]>;

#[derive(Clone)]
struct Node<K> {
    /// Strictly ascending, duplicate-free.
    keys: Keys<K>,
    /// Empty for a leaf, `keys.len() + 1` otherwise.
    children: Vec<Node<K>>,
}

impl<K> Node<K> {
    fn leaf() -> Self {
        Node {
            keys: SmallVec::new(),
            children: Vec::new(),
        }
    }

    #[inline]
    fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    #[inline]
    fn is_full(&self, factor: usize) -> bool {
        self.keys.len() >= 2 * factor - 1
    }

    fn count_keys(&self) -> usize {
        self.keys.len() + self.children.iter().map(Node::count_keys).sum::<usize>()
    }
}

impl<K: Ord> Node<K> {
    /// Detach the upper half around the key at `pivot_idx`: the keys after it
    /// and, when internal, the children to its right. The pivot is left
    /// behind as this node's last key.
    fn split_high(&mut self, pivot_idx: usize) -> Node<K> {
        let keys: Keys<K> = self.keys.drain(pivot_idx + 1..).collect();
        let children = if self.children.is_empty() {
            Vec::new()
        } else {
            self.children.split_off(pivot_idx + 1)
        };
        Node { keys, children }
    }

    /// Split the full child at `i`, lifting its middle key into this node.
    /// The child shrinks into the lower half; the upper half is installed
    /// immediately to its right.
    fn split_child(&mut self, i: usize) {
        let pivot_idx = self.children[i].keys.len() / 2;
        let right = self.children[i].split_high(pivot_idx);
        let pivot = self.children[i]
            .keys
            .pop()
            .expect("a full node has at least one key");
        self.keys.insert(i, pivot);
        self.children.insert(i + 1, right);
    }

    /// Insert below a node that is known not to be full. Full children are
    /// split before descending into them; the duplicate answer falls out of
    /// comparing against the freshly lifted pivot.
    fn insert_non_full(&mut self, key: K, factor: usize) -> bool {
        let mut pos = match self.keys.binary_search(&key) {
            Ok(_) => return false,
            Err(pos) => pos,
        };
        if self.is_leaf() {
            self.keys.insert(pos, key);
            return true;
        }
        if self.children[pos].is_full(factor) {
            self.split_child(pos);
            match key.cmp(&self.keys[pos]) {
                Ordering::Less => {}
                Ordering::Greater => pos += 1,
                Ordering::Equal => return false,
            }
        }
        self.children[pos].insert_non_full(key, factor)
    }

    fn get(&self, key: &K) -> Option<&K> {
        match self.keys.binary_search(key) {
            Ok(i) => Some(&self.keys[i]),
            Err(i) => self.children.get(i).and_then(|child| child.get(key)),
        }
    }

    fn upper_bound(&self, key: &K) -> Option<&K> {
        let pos = match self.keys.binary_search(key) {
            Ok(i) => return Some(&self.keys[i]),
            Err(pos) => pos,
        };
        if self.is_leaf() {
            return self.keys.get(pos);
        }
        if pos == self.keys.len() {
            // Nothing here is >= key; only the rightmost subtree can be.
            return self.children[pos].upper_bound(key);
        }
        // A tighter bound may hide in the subtree left of the local candidate.
        self.children[pos].upper_bound(key).or(Some(&self.keys[pos]))
    }

    fn lower_bound(&self, key: &K) -> Option<&K> {
        let pos = match self.keys.binary_search(key) {
            Ok(i) => return Some(&self.keys[i]),
            Err(pos) => pos,
        };
        if pos == 0 {
            // Nothing here is <= key; only the leftmost subtree can be.
            return self.children.first().and_then(|child| child.lower_bound(key));
        }
        let local = &self.keys[pos - 1];
        if self.is_leaf() {
            return Some(local);
        }
        self.children[pos].lower_bound(key).or(Some(local))
    }

    fn trim_below(&mut self, bound: &K) {
        loop {
            let all_below = match self.keys.last() {
                Some(last) => last < bound,
                None => return,
            };
            if !all_below {
                break;
            }
            // Everything in this node is below the bound; the rightmost
            // subtree takes it over wholesale.
            match self.children.pop() {
                Some(tail) => *self = tail,
                None => {
                    self.keys.clear();
                    return;
                }
            }
        }
        let below = self.keys.iter().take_while(|k| *k < bound).count();
        if below > 0 {
            self.keys.drain(..below);
            if !self.children.is_empty() {
                self.children.drain(..below);
            }
        }
        // The surviving first child straddles the bound.
        if let Some(first) = self.children.first_mut() {
            first.trim_below(bound);
        }
    }
}

/// A multiway search tree over unique, totally-ordered keys.
///
/// The fan-out `factor` bounds node capacity at `2 * factor - 1` keys and is
/// fixed at construction. Inserts keep every node within capacity by
/// splitting full nodes top-down; [`BTree::trim_below`] is the only removal
/// and deliberately skips rebalancing.
pub struct BTree<K> {
    root: Node<K>,
    factor: usize,
    len: usize,
}

impl<K> BTree<K> {
    /// Create an empty tree with the default fan-out factor of 2.
    pub fn new() -> Self {
        Self::with_factor(2)
    }

    /// Create an empty tree with the given fan-out factor.
    ///
    /// # Panics
    ///
    /// Panics if `factor` is zero. A factor of 1 is accepted but degenerates
    /// to one key per node; meaningful fan-out starts at 2.
    pub fn with_factor(factor: usize) -> Self {
        assert!(factor >= 1, "fan-out factor must be at least 1");
        BTree {
            root: Node::leaf(),
            factor,
            len: 0,
        }
    }

    /// The fan-out factor fixed at construction.
    #[inline]
    pub fn factor(&self) -> usize {
        self.factor
    }

    /// Number of stored keys.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Tree height counted in levels, by walking the leftmost child chain.
    ///
    /// Insertion always grows the tree at the root, keeping every leaf at the
    /// same depth, so one path suffices. A tree that has been trimmed with
    /// [`BTree::trim_below`] is not guaranteed to keep that property.
    pub fn height(&self) -> usize {
        let mut node = &self.root;
        let mut depth = 1;
        while let Some(first) = node.children.first() {
            node = first;
            depth += 1;
        }
        depth
    }

    /// Per-depth snapshot of the tree: for each level, the key list of every
    /// node at that level, left to right.
    pub fn level_keys(&self) -> Vec<Vec<Vec<K>>>
    where
        K: Clone,
    {
        let mut levels = Vec::new();
        let mut current: Vec<&Node<K>> = vec![&self.root];
        while !current.is_empty() {
            levels.push(current.iter().map(|node| node.keys.to_vec()).collect());
            current = current
                .into_iter()
                .flat_map(|node| node.children.iter())
                .collect();
        }
        levels
    }

    /// In-order iterator over the stored keys.
    pub fn iter(&self) -> Iter<'_, K> {
        Iter {
            stack: vec![(&self.root, 0)],
        }
    }
}

impl<K: Ord> BTree<K> {
    /// Insert `key` if absent. Returns whether an insertion happened; a
    /// duplicate is a no-op reported as `false`.
    ///
    /// Descends from the root, splitting any full node before entering it:
    /// the root is rewritten in place around its middle key (growing the tree
    /// a level), and a full child is split into the current node before the
    /// descent continues into whichever half the key belongs to.
    pub fn insert(&mut self, key: K) -> bool {
        if self.root.keys.is_empty() {
            self.root.keys.push(key);
            self.len += 1;
            return true;
        }
        if self.root.is_full(self.factor) {
            self.split_root();
        }
        let inserted = self.root.insert_non_full(key, self.factor);
        if inserted {
            self.len += 1;
        }
        inserted
    }

    /// Rewrite a full root in place: it keeps only its middle key, with the
    /// lower and upper halves as its two children. This is the only way the
    /// tree gains a level.
    fn split_root(&mut self) {
        let pivot_idx = self.root.keys.len() / 2;
        let right = self.root.split_high(pivot_idx);
        let pivot = self
            .root
            .keys
            .pop()
            .expect("a full node has at least one key");
        let left = Node {
            keys: mem::take(&mut self.root.keys),
            children: mem::take(&mut self.root.children),
        };
        self.root.keys.push(pivot);
        self.root.children.push(left);
        self.root.children.push(right);
    }

    /// Look up `key`, returning the stored key if present.
    pub fn get(&self, key: &K) -> Option<&K> {
        self.root.get(key)
    }

    /// Whether `key` is stored.
    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// The smallest stored key `>= key`, or `None` if every key is smaller.
    pub fn upper_bound(&self, key: &K) -> Option<&K> {
        self.root.upper_bound(key)
    }

    /// The largest stored key `<= key`, or `None` if every key is larger.
    pub fn lower_bound(&self, key: &K) -> Option<&K> {
        self.root.lower_bound(key)
    }

    /// Discard every key strictly below `bound`, along with the subtrees
    /// hanging left of them.
    ///
    /// Works down the left spine only: a node whose keys are all below the
    /// bound is replaced wholesale by its rightmost child, repeatedly, which
    /// skips whole subtrees in one step; otherwise the leading keys and
    /// children below the bound are dropped and the walk continues into the
    /// surviving first child. Ordering is preserved; minimum occupancy is
    /// not restored.
    pub fn trim_below(&mut self, bound: &K) {
        self.root.trim_below(bound);
        self.len = self.root.count_keys();
    }
}

impl<K> Default for BTree<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone> Clone for BTree<K> {
    fn clone(&self) -> Self {
        BTree {
            root: self.root.clone(),
            factor: self.factor,
            len: self.len,
        }
    }
}

impl<K: fmt::Debug> fmt::Debug for BTree<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// In-order key iterator backed by an explicit stack.
///
/// Each frame steps through a node's interleaving of children and keys:
/// even steps descend, odd steps yield. Leaves step straight through their
/// keys.
pub struct Iter<'a, K> {
    stack: Vec<(&'a Node<K>, usize)>,
}

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        while let Some(frame) = self.stack.last_mut() {
            let node = frame.0;
            let step = frame.1;
            frame.1 += 1;
            if node.is_leaf() {
                if step < node.keys.len() {
                    return Some(&node.keys[step]);
                }
                self.stack.pop();
            } else if step % 2 == 0 {
                match node.children.get(step / 2) {
                    Some(child) => self.stack.push((child, 0)),
                    None => {
                        self.stack.pop();
                    }
                }
            } else if let Some(key) = node.keys.get(step / 2) {
                return Some(key);
            } else {
                self.stack.pop();
            }
        }
        None
    }
}

#[cfg(test)]
impl<K: Ord> BTree<K> {
    /// Structural self-check used by the test suites: per-node ordering and
    /// capacity, internal child counts, separator ranges, and the stored
    /// length. Minimum occupancy is deliberately not checked; trimming is
    /// allowed to violate it.
    pub(crate) fn check_invariants(&self) {
        fn check_node<K: Ord>(node: &Node<K>, cap: usize) {
            assert!(node.keys.len() <= cap, "node exceeds key capacity");
            for pair in node.keys.windows(2) {
                assert!(pair[0] < pair[1], "node keys must be strictly ascending");
            }
            if node.children.is_empty() {
                return;
            }
            assert_eq!(
                node.children.len(),
                node.keys.len() + 1,
                "internal node must have one more child than keys"
            );
            for (i, child) in node.children.iter().enumerate() {
                if i > 0 {
                    assert!(
                        child.keys.first().map_or(true, |k| *k > node.keys[i - 1]),
                        "child keys must sit above the separator on their left"
                    );
                }
                if i < node.keys.len() {
                    assert!(
                        child.keys.last().map_or(true, |k| *k < node.keys[i]),
                        "child keys must sit below the separator on their right"
                    );
                }
                check_node(child, cap);
            }
        }

        check_node(&self.root, 2 * self.factor - 1);
        assert_eq!(self.root.count_keys(), self.len, "stored length is stale");

        let mut prev: Option<&K> = None;
        for key in self.iter() {
            if let Some(prev) = prev {
                assert!(prev < key, "traversal must be strictly ascending");
            }
            prev = Some(key);
        }
    }
}

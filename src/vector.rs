//! Persistent vector.
//!
//! A 32-way branching trie with a tail buffer, as in Clojure's
//! `PersistentVector`. Values live in leaf arrays; `nth` descends the trie five
//! bits of the index at a time. Appends go to the tail until it holds 32
//! values, then the tail is pushed into the trie as a new leaf. Every update
//! copies the arrays on the root-to-leaf path it touches and shares the rest.

use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;

use crate::error::IndexOutOfBounds;

const SHIFT: u32 = 5;
const WIDTH: usize = 1 << SHIFT;
const MASK: usize = WIDTH - 1;

enum Node<T> {
    Branch(Arc<Vec<Node<T>>>),
    Leaf(Arc<Vec<T>>),
}

impl<T> Clone for Node<T> {
    fn clone(&self) -> Self {
        match self {
            Node::Branch(children) => Node::Branch(children.clone()),
            Node::Leaf(values) => Node::Leaf(values.clone()),
        }
    }
}

pub struct Vector<T> {
    count: usize,
    /// Bits of the index consumed by the root level.
    shift: u32,
    root: Arc<Vec<Node<T>>>,
    tail: Arc<Vec<T>>,
}

impl<T> Vector<T> {
    pub fn new() -> Self {
        Self {
            count: 0,
            shift: SHIFT,
            root: Arc::new(Vec::new()),
            tail: Arc::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Index of the first value held in the tail.
    fn tail_offset(&self) -> usize {
        if self.count < WIDTH {
            0
        } else {
            ((self.count - 1) >> SHIFT) << SHIFT
        }
    }

    /// The leaf array (or the tail) that holds index `i`.
    fn array_for(&self, i: usize) -> Result<&[T], IndexOutOfBounds> {
        if i >= self.count {
            return Err(IndexOutOfBounds {
                index: i,
                count: self.count,
            });
        }

        if i >= self.tail_offset() {
            return Ok(&self.tail);
        }

        let mut children: &[Node<T>] = &self.root;
        let mut level = self.shift;

        loop {
            match &children[(i >> level) & MASK] {
                Node::Branch(next) => {
                    children = next;
                    level -= SHIFT;
                }
                Node::Leaf(values) => return Ok(values),
            }
        }
    }

    pub fn nth(&self, i: usize) -> Result<&T, IndexOutOfBounds> {
        let values = self.array_for(i)?;
        Ok(&values[i & MASK])
    }

    pub fn get(&self, i: usize) -> Option<&T> {
        self.nth(i).ok()
    }

    pub fn first(&self) -> Option<&T> {
        self.get(0)
    }

    pub fn last(&self) -> Option<&T> {
        self.count.checked_sub(1).and_then(|i| self.get(i))
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            vector: self,
            index: 0,
            chunk: &[],
        }
    }
}

impl<T: Clone> Vector<T> {
    /// Returns a new vector with `value` appended.
    pub fn conj(&self, value: T) -> Vector<T> {
        if self.count - self.tail_offset() < WIDTH {
            let mut tail = Vec::with_capacity(self.tail.len() + 1);
            tail.extend(self.tail.iter().cloned());
            tail.push(value);

            return Vector {
                count: self.count + 1,
                shift: self.shift,
                root: self.root.clone(),
                tail: Arc::new(tail),
            };
        }

        let tail_node = Node::Leaf(self.tail.clone());

        let (root, shift) = if (self.count >> SHIFT) > (1usize << self.shift) {
            // The trie is full at this height; the old root becomes the left child.
            let root = vec![
                Node::Branch(self.root.clone()),
                new_path(self.shift, tail_node),
            ];
            (root, self.shift + SHIFT)
        } else {
            (self.push_tail(self.shift, &self.root, tail_node), self.shift)
        };

        Vector {
            count: self.count + 1,
            shift,
            root: Arc::new(root),
            tail: Arc::new(vec![value]),
        }
    }

    fn push_tail(&self, level: u32, parent: &[Node<T>], tail_node: Node<T>) -> Vec<Node<T>> {
        let sub = ((self.count - 1) >> level) & MASK;
        let mut children = parent.to_vec();

        let node = if level == SHIFT {
            tail_node
        } else {
            match parent.get(sub) {
                Some(Node::Branch(child)) => {
                    Node::Branch(Arc::new(self.push_tail(level - SHIFT, child, tail_node)))
                }
                _ => new_path(level - SHIFT, tail_node),
            }
        };

        if sub < children.len() {
            children[sub] = node;
        } else {
            children.push(node);
        }

        children
    }

    /// Returns a new vector where index `i` holds `value`. `i == len()` appends.
    pub fn assoc(&self, i: usize, value: T) -> Result<Vector<T>, IndexOutOfBounds> {
        if i > self.count {
            return Err(IndexOutOfBounds {
                index: i,
                count: self.count,
            });
        }

        if i == self.count {
            return Ok(self.conj(value));
        }

        if i >= self.tail_offset() {
            let mut tail = self.tail.as_ref().clone();
            tail[i & MASK] = value;

            return Ok(Vector {
                count: self.count,
                shift: self.shift,
                root: self.root.clone(),
                tail: Arc::new(tail),
            });
        }

        Ok(Vector {
            count: self.count,
            shift: self.shift,
            root: Arc::new(do_assoc(self.shift, &self.root, i, value)),
            tail: self.tail.clone(),
        })
    }
}

fn new_path<T>(level: u32, node: Node<T>) -> Node<T> {
    if level == 0 {
        node
    } else {
        Node::Branch(Arc::new(vec![new_path(level - SHIFT, node)]))
    }
}

fn do_assoc<T: Clone>(level: u32, children: &[Node<T>], i: usize, value: T) -> Vec<Node<T>> {
    let sub = (i >> level) & MASK;
    let mut copy = children.to_vec();

    copy[sub] = match &children[sub] {
        Node::Leaf(values) => {
            let mut values = values.as_ref().clone();
            values[i & MASK] = value;
            Node::Leaf(Arc::new(values))
        }
        Node::Branch(next) => Node::Branch(Arc::new(do_assoc(level - SHIFT, next, i, value))),
    };

    copy
}

impl<T> Clone for Vector<T> {
    fn clone(&self) -> Self {
        Self {
            count: self.count,
            shift: self.shift,
            root: self.root.clone(),
            tail: self.tail.clone(),
        }
    }
}

impl<T> Default for Vector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> FromIterator<T> for Vector<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Vector::new(), |vector, value| vector.conj(value))
    }
}

impl<T: Clone> From<Vec<T>> for Vector<T> {
    fn from(items: Vec<T>) -> Self {
        items.into_iter().collect()
    }
}

impl<T: PartialEq> PartialEq for Vector<T> {
    fn eq(&self, other: &Self) -> bool {
        self.count == other.count && self.iter().eq(other.iter())
    }
}

impl<T: Eq> Eq for Vector<T> {}

pub struct Iter<'a, T> {
    vector: &'a Vector<T>,
    index: usize,
    chunk: &'a [T],
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.vector.count {
            return None;
        }

        if self.index & MASK == 0 {
            self.chunk = self.vector.array_for(self.index).ok()?;
        }

        let value = &self.chunk[self.index & MASK];
        self.index += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.vector.count - self.index;
        (left, Some(left))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

impl<'a, T> IntoIterator for &'a Vector<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: fmt::Display> fmt::Display for Vector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, item) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", item)?;
        }
        f.write_str("]")
    }
}

impl<T: fmt::Debug> fmt::Debug for Vector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

//! Persistent singly-linked list.
//!
//! A `List` is either empty or a cons cell holding a head value and a shared
//! reference to the rest of the list. Lists are never mutated once built;
//! `cons` and `append` return new lists that share structure with their inputs.

use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;

struct Cons<T> {
    head: T,
    tail: List<T>,
}

pub struct List<T> {
    node: Option<Arc<Cons<T>>>,
}

impl<T> List<T> {
    pub const fn new() -> Self {
        Self { node: None }
    }

    /// Prepends `head`, sharing `tail`.
    pub fn cons(head: T, tail: List<T>) -> Self {
        Self {
            node: Some(Arc::new(Cons { head, tail })),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.node.is_none()
    }

    pub fn first(&self) -> Option<&T> {
        self.node.as_ref().map(|cell| &cell.head)
    }

    /// The list without its first element. The rest of an empty list is empty.
    pub fn rest(&self) -> List<T> {
        match &self.node {
            Some(cell) => cell.tail.clone(),
            None => List::new(),
        }
    }

    pub fn split_first(&self) -> Option<(&T, &List<T>)> {
        self.node.as_ref().map(|cell| (&cell.head, &cell.tail))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// O(i) walk to the i-th element.
    pub fn nth(&self, i: usize) -> Option<&T> {
        self.iter().nth(i)
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter { list: self }
    }

    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        match (&this.node, &other.node) {
            (None, None) => true,
            (Some(x), Some(y)) => Arc::ptr_eq(x, y),
            _ => false,
        }
    }
}

impl<T: Clone> List<T> {
    /// Copies the cells of `self` in front of `other`. `other` is shared, not copied.
    pub fn append(&self, other: &List<T>) -> List<T> {
        let items = self.iter().cloned().collect::<Vec<_>>();
        let mut list = other.clone();
        for item in items.into_iter().rev() {
            list = List::cons(item, list);
        }
        list
    }

    pub fn reverse(&self) -> List<T> {
        let mut list = List::new();
        for item in self.iter() {
            list = List::cons(item.clone(), list);
        }
        list
    }
}

impl<T> Clone for List<T> {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
        }
    }
}

impl<T> Default for List<T> {
    fn default() -> Self {
        Self::new()
    }
}

// Unlinks uniquely owned cells one at a time so that long lists do not recurse
// once per element on drop.
impl<T> Drop for List<T> {
    fn drop(&mut self) {
        let mut node = self.node.take();
        while let Some(cell) = node {
            match Arc::try_unwrap(cell) {
                Ok(mut cell) => node = cell.tail.node.take(),
                Err(_) => break,
            }
        }
    }
}

impl<T> FromIterator<T> for List<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let items = iter.into_iter().collect::<Vec<_>>();
        let mut list = List::new();
        for item in items.into_iter().rev() {
            list = List::cons(item, list);
        }
        list
    }
}

impl<T> From<Vec<T>> for List<T> {
    fn from(items: Vec<T>) -> Self {
        items.into_iter().collect()
    }
}

impl<T: PartialEq> PartialEq for List<T> {
    fn eq(&self, other: &Self) -> bool {
        let mut xs = self.iter();
        let mut ys = other.iter();
        loop {
            match (xs.next(), ys.next()) {
                (None, None) => return true,
                (Some(x), Some(y)) if x == y => continue,
                _ => return false,
            }
        }
    }
}

impl<T: Eq> Eq for List<T> {}

pub struct Iter<'a, T> {
    list: &'a List<T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let list: &'a List<T> = self.list;
        let cell = list.node.as_ref()?;
        self.list = &cell.tail;
        Some(&cell.head)
    }
}

impl<T> FusedIterator for Iter<'_, T> {}

impl<'a, T> IntoIterator for &'a List<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: fmt::Display> fmt::Display for List<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, item) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", item)?;
        }
        f.write_str(")")
    }
}

impl<T: fmt::Debug> fmt::Debug for List<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cons_shares_tail() {
        let tail = List::from(vec![2, 3]);
        let a = List::cons(1, tail.clone());
        let b = List::cons(10, tail.clone());

        assert!(List::ptr_eq(&a.rest(), &tail));
        assert!(List::ptr_eq(&b.rest(), &tail));
        assert_eq!(a.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(b.iter().copied().collect::<Vec<_>>(), vec![10, 2, 3]);
    }

    #[test]
    fn empty_list() {
        let list = List::<i64>::new();
        assert!(list.is_empty());
        assert_eq!(list.first(), None);
        assert!(list.rest().is_empty());
        assert_eq!(list.len(), 0);
        assert_eq!(list.to_string(), "()");
    }

    #[test]
    fn from_items_keeps_order() {
        let list: List<i64> = (1..=4).collect();
        assert_eq!(list.first(), Some(&1));
        assert_eq!(list.nth(3), Some(&4));
        assert_eq!(list.nth(4), None);
        assert_eq!(list.len(), 4);
        assert_eq!(list.to_string(), "(1 2 3 4)");
    }

    #[test]
    fn append_copies_left_and_shares_right() {
        let left = List::from(vec![1, 2]);
        let right = List::from(vec![3, 4]);
        let joined = left.append(&right);

        assert_eq!(joined, List::from(vec![1, 2, 3, 4]));
        assert!(List::ptr_eq(&joined.rest().rest(), &right));
        assert_eq!(left, List::from(vec![1, 2]));
    }

    #[test]
    fn reverse() {
        let list = List::from(vec![1, 2, 3]);
        assert_eq!(list.reverse(), List::from(vec![3, 2, 1]));
    }

    #[test]
    fn structural_equality() {
        assert_eq!(List::from(vec![1, 2]), List::cons(1, List::cons(2, List::new())));
        assert_ne!(List::from(vec![1, 2]), List::from(vec![1]));
        assert_ne!(List::from(vec![1, 2]), List::from(vec![1, 3]));
    }

    #[test]
    fn dropping_a_long_list_does_not_overflow() {
        let mut list = List::new();
        for i in 0..1_000_000 {
            list = List::cons(i, list);
        }
        assert_eq!(list.first(), Some(&999_999));
        drop(list);
    }
}

//! Append-only fragment list.
//!
//! Rendering builds output bottom-up: every handler returns a list of
//! fragments that its caller splices into its own list. Splicing must not copy,
//! otherwise deep documents degrade to quadratic time, so [`CatList::append`]
//! moves the other list's nodes in O(1) and leaves it consumed.

use std::collections::LinkedList;
use std::collections::linked_list;
use std::fmt;

/// Rendered output fragments.
pub type Html = CatList<String>;

pub struct CatList<T> {
    items: LinkedList<T>,
    consumed: bool,
}

impl<T> CatList<T> {
    pub fn new() -> Self {
        Self {
            items: LinkedList::new(),
            consumed: false,
        }
    }

    pub fn push(&mut self, item: T) {
        self.check_live("push");
        self.items.push_back(item);
    }

    /// Moves every element of `other` to the end of `self` in O(1).
    ///
    /// `other` is consumed: calling `push`, `append` or `iter` on it
    /// afterwards panics.
    pub fn append(&mut self, other: &mut CatList<T>) {
        self.check_live("append");
        other.check_live("append");
        self.items.append(&mut other.items);
        other.consumed = true;
    }

    pub fn append_owned(&mut self, mut other: CatList<T>) {
        self.append(&mut other);
    }

    pub fn iter(&self) -> Iter<'_, T> {
        self.check_live("iter");
        Iter {
            inner: self.items.iter(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    fn check_live(&self, op: &str) {
        if self.consumed {
            panic!("CatList::{op} called on a list already consumed by append");
        }
    }
}

impl CatList<String> {
    /// Single-fragment list.
    pub fn text(fragment: impl Into<String>) -> Self {
        let mut list = Self::new();
        list.push(fragment.into());
        list
    }

    pub fn push_str(&mut self, fragment: &str) {
        if !fragment.is_empty() {
            self.push(fragment.to_string());
        }
    }

    /// Flattens the fragments into one string.
    pub fn concat(&self) -> String {
        let len = self.iter().map(String::len).sum();
        let mut out = String::with_capacity(len);
        for fragment in self.iter() {
            out.push_str(fragment);
        }
        out
    }
}

impl<T> Default for CatList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<T> for CatList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = Self::new();
        list.extend(iter);
        list
    }
}

impl<T> Extend<T> for CatList<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.check_live("extend");
        self.items.extend(iter);
    }
}

impl<T: PartialEq> PartialEq for CatList<T> {
    fn eq(&self, other: &Self) -> bool {
        self.consumed == other.consumed && self.items == other.items
    }
}

impl<T: fmt::Debug> fmt::Debug for CatList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.consumed {
            return f.write_str("CatList(<consumed>)");
        }
        f.debug_list().entries(self.items.iter()).finish()
    }
}

pub struct Iter<'a, T> {
    inner: linked_list::Iter<'a, T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, T> IntoIterator for &'a CatList<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T> IntoIterator for CatList<T> {
    type Item = T;
    type IntoIter = linked_list::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.check_live("into_iter");
        self.items.into_iter()
    }
}

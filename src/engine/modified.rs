//! Per-connection set of endpoints carrying unflushed local changes.
//!
//! Membership is an intrusive doubly linked list threaded through a side
//! table indexed by arena slot, so insertion and removal are O(1) and the
//! transport can drain dirty endpoints without walking the whole topology.
//! An endpoint's `modified` flag is read from this table, which keeps the
//! flag and list membership a single piece of state.

use tracing::trace;

use super::arena::ArenaKey;

#[derive(Debug, Clone, Copy, Default)]
struct Links {
    member: Option<ArenaKey>,
    prev: Option<u32>,
    next: Option<u32>,
}

/// Insertion-ordered membership list over endpoint slots.
#[derive(Debug, Default)]
pub(crate) struct ModifiedSet {
    links: Vec<Links>,
    head: Option<u32>,
    tail: Option<u32>,
    len: usize,
}

impl ModifiedSet {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            links: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    fn slot(&mut self, index: u32) -> &mut Links {
        let index = index as usize;
        if index >= self.links.len() {
            self.links.resize(index + 1, Links::default());
        }
        &mut self.links[index]
    }

    /// Whether `key` is currently linked.
    pub(crate) fn contains(&self, key: ArenaKey) -> bool {
        self.links
            .get(key.index() as usize)
            .is_some_and(|links| links.member == Some(key))
    }

    /// Append `key` at the tail. Returns `false` if it was already linked.
    pub(crate) fn insert(&mut self, key: ArenaKey) -> bool {
        if self.contains(key) {
            return false;
        }
        let index = key.index();
        let tail = self.tail;
        *self.slot(index) = Links {
            member: Some(key),
            prev: tail,
            next: None,
        };
        match tail {
            Some(tail) => self.slot(tail).next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.len += 1;
        trace!(endpoint = ?key, len = self.len, "endpoint marked modified");
        true
    }

    /// Unlink `key`, patching its neighbours. Returns `false` if it was not linked.
    pub(crate) fn remove(&mut self, key: ArenaKey) -> bool {
        if !self.contains(key) {
            return false;
        }
        let index = key.index();
        let Links { prev, next, .. } = std::mem::take(self.slot(index));
        match prev {
            Some(prev) => self.slot(prev).next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.slot(next).prev = prev,
            None => self.tail = prev,
        }
        self.len -= 1;
        trace!(endpoint = ?key, len = self.len, "endpoint modification cleared");
        true
    }

    /// Unlink and return the oldest member.
    pub(crate) fn pop_front(&mut self) -> Option<ArenaKey> {
        let head = self.head?;
        let key = self.links[head as usize].member?;
        self.remove(key);
        Some(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn iter(&self) -> Iter<'_> {
        Iter {
            set: self,
            cursor: self.head,
        }
    }
}

/// Members of a [`ModifiedSet`] from oldest to newest.
#[derive(Debug, Clone)]
pub(crate) struct Iter<'a> {
    set: &'a ModifiedSet,
    cursor: Option<u32>,
}

impl Iterator for Iter<'_> {
    type Item = ArenaKey;

    fn next(&mut self) -> Option<Self::Item> {
        let links = self.set.links.get(self.cursor? as usize)?;
        self.cursor = links.next;
        links.member
    }
}

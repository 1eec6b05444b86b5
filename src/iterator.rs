//! A bidirectional cursor over a `Kv`'s sorted arrays.
//!
//! `KvIterator` borrows the `Kv` it was created from, so the borrow checker
//! rules out mutating the index while an iterator is live at compile time
//! rather than requiring a runtime snapshot or documentation of undefined
//! behavior.

use crate::kv::Kv;

pub struct KvIterator<'a> {
    kv: &'a Kv,
    pos: usize,
}

impl<'a> KvIterator<'a> {
    pub(crate) fn new(kv: &'a Kv, pos: usize) -> Self {
        KvIterator { kv, pos }
    }

    #[inline]
    pub fn valid(&self) -> bool {
        self.pos < self.kv.len()
    }

    #[inline]
    pub fn key(&self) -> Option<&'a [u8]> {
        self.valid().then(|| self.kv.key_at(self.pos))
    }

    #[inline]
    pub fn value(&self) -> Option<&'a [u8]> {
        self.valid().then(|| self.kv.value_at(self.pos))
    }

    /// Advances one position. Clamped at `len()`; does not wrap.
    pub fn next(&mut self) {
        if self.pos < self.kv.len() {
            self.pos += 1;
        }
    }

    /// Retreats one position. Clamped at `0`; does not wrap.
    pub fn prev(&mut self) {
        if self.pos > 0 {
            self.pos -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{Kv, UpdateMode};
    use tempfile::tempdir;

    #[test]
    fn ordered_seek_scenarios() {
        let dir = tempdir().unwrap();
        let mut kv = Kv::open(dir.path().join("log")).unwrap();
        for v in [0u8, 2, 4, 6, 8] {
            kv.set(&[v], &[v], UpdateMode::Upsert).unwrap();
        }

        let mut it = kv.seek(&[0]);
        let mut collected = Vec::new();
        while it.valid() {
            collected.push(it.key().unwrap().to_vec());
            it.next();
        }
        assert_eq!(collected, vec![vec![0], vec![2], vec![4], vec![6], vec![8]]);

        let mut it = kv.seek(&[3]);
        let mut collected = Vec::new();
        while it.valid() {
            collected.push(it.key().unwrap()[0]);
            it.next();
        }
        assert_eq!(collected, vec![4, 6, 8]);

        let it = kv.seek(&[9]);
        assert!(!it.valid());
    }

    #[test]
    fn prev_clamps_at_start() {
        let dir = tempdir().unwrap();
        let mut kv = Kv::open(dir.path().join("log")).unwrap();
        kv.set(b"a", b"1", UpdateMode::Upsert).unwrap();
        kv.set(b"b", b"2", UpdateMode::Upsert).unwrap();
        let mut it = kv.seek(b"a");
        it.prev();
        it.prev();
        assert!(it.valid());
        assert_eq!(it.key().unwrap(), b"a");
    }
}

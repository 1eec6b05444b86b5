//! The in-memory sorted index: two parallel arrays of keys and values,
//! rebuilt from the log on open and kept in sync with it on every mutation.

use std::path::PathBuf;

use crate::iterator::KvIterator;
use crate::log_file::Log;
use crate::record::Record;
use crate::util::status::{Result, Status};

/// Controls how `Kv::set` decides whether a write should happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Insert a new key or overwrite an existing one.
    Upsert,
    /// Insert only if the key is absent.
    Insert,
    /// Overwrite only if the key is already present.
    Update,
}

/// An open KV index backed by one append-only log file.
pub struct Kv {
    log: Log,
    keys: Vec<Vec<u8>>,
    vals: Vec<Vec<u8>>,
}

impl Kv {
    /// Opens (creating if necessary) the log at `path` and rebuilds the
    /// in-memory index by replaying it.
    ///
    /// Replay tolerates a torn tail: a record that fails to decode with
    /// `BadChecksum` or `UnexpectedEOF` (or a clean end of stream) stops
    /// replay without error, discarding everything from that point on, on
    /// the theory that an un-acknowledged write was, by definition,
    /// un-acknowledged. Any other read error aborts `open`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let mut log = Log::new(path);
        log.open()?;

        let mut buffered: Vec<Record> = Vec::new();
        loop {
            match log.read_next() {
                Ok(Some(record)) => buffered.push(record),
                Ok(None) => break,
                Err(e) => match e.status() {
                    Status::BadChecksum | Status::UnexpectedEOF => {
                        warn!("log replay stopped at a torn tail: {}", e);
                        break;
                    }
                    _ => return Err(e),
                },
            }
        }

        // Stable sort: since replay order equals write order, the last
        // record in a run of equal keys is the most recently written one.
        buffered.sort_by(|a, b| a.key.cmp(&b.key));

        let mut keys = Vec::new();
        let mut vals = Vec::new();
        let mut i = 0;
        while i < buffered.len() {
            let mut j = i;
            while j + 1 < buffered.len() && buffered[j + 1].key == buffered[i].key {
                j += 1;
            }
            let latest = &buffered[j];
            if !latest.tombstone {
                keys.push(latest.key.clone());
                vals.push(latest.val.clone());
            }
            i = j + 1;
        }

        debug!("kv index rebuilt with {} live keys", keys.len());
        Ok(Kv { log, keys, vals })
    }

    pub fn close(&mut self) -> Result<()> {
        self.log.close()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn find(&self, key: &[u8]) -> std::result::Result<usize, usize> {
        self.keys.binary_search_by(|k| k.as_slice().cmp(key))
    }

    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.find(key).ok().map(|idx| self.vals[idx].as_slice())
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.find(key).is_ok()
    }

    /// Applies `mode`'s rule to decide whether a write should happen, and
    /// if so, durably logs it before mutating the in-memory arrays. If the
    /// log write fails, the in-memory state is left unchanged and the
    /// error is returned. Returns whether a write happened.
    pub fn set(&mut self, key: &[u8], val: &[u8], mode: UpdateMode) -> Result<bool> {
        let idx_result = self.find(key);
        let existed = idx_result.is_ok();
        let differs = match idx_result {
            Ok(idx) => self.vals[idx].as_slice() != val,
            Err(_) => true,
        };
        let updating = match mode {
            UpdateMode::Upsert => !existed || differs,
            UpdateMode::Insert => !existed,
            UpdateMode::Update => existed && differs,
        };

        if updating {
            self.log.write(&Record::put(key.to_vec(), val.to_vec()))?;
            match idx_result {
                Ok(idx) => self.vals[idx] = val.to_vec(),
                Err(idx) => {
                    self.keys.insert(idx, key.to_vec());
                    self.vals.insert(idx, val.to_vec());
                }
            }
        }
        Ok(updating)
    }

    /// Deletes `key` if present. Returns whether anything was deleted.
    pub fn del(&mut self, key: &[u8]) -> Result<bool> {
        match self.find(key) {
            Ok(idx) => {
                self.log.write(&Record::tombstone(key.to_vec()))?;
                self.keys.remove(idx);
                self.vals.remove(idx);
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    /// Returns an iterator positioned at the lower bound: the smallest
    /// index whose key is `>= key`, or an exhausted iterator if none.
    pub fn seek(&self, key: &[u8]) -> KvIterator<'_> {
        let pos = match self.find(key) {
            Ok(idx) => idx,
            Err(idx) => idx,
        };
        KvIterator::new(self, pos)
    }

    pub(crate) fn key_at(&self, idx: usize) -> &[u8] {
        &self.keys[idx]
    }

    pub(crate) fn value_at(&self, idx: usize) -> &[u8] {
        &self.vals[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn put_get_delete_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log");

        let mut kv = Kv::open(&path).unwrap();
        assert!(kv.set(b"k1", b"v1", UpdateMode::Upsert).unwrap());
        assert!(kv.set(b"k2", b"v2", UpdateMode::Upsert).unwrap());
        assert!(kv.del(b"k1").unwrap());
        kv.close().unwrap();

        let kv = Kv::open(&path).unwrap();
        assert_eq!(kv.get(b"k1"), None);
        assert_eq!(kv.get(b"k2"), Some(b"v2".as_slice()));
    }

    #[test]
    fn torn_tail_is_tolerated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log");

        let mut kv = Kv::open(&path).unwrap();
        assert!(kv.set(b"k1", b"v1", UpdateMode::Upsert).unwrap());
        assert!(kv.set(b"k2", b"v2", UpdateMode::Upsert).unwrap());
        kv.close().unwrap();

        let len = std::fs::metadata(&path).unwrap().len();
        let f = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
        f.set_len(len - 1).unwrap();
        drop(f);

        let kv = Kv::open(&path).unwrap();
        assert_eq!(kv.get(b"k1"), Some(b"v1".as_slice()));
        assert_eq!(kv.get(b"k2"), None);
    }

    #[test]
    fn corrupted_payload_byte_is_tolerated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log");

        let mut kv = Kv::open(&path).unwrap();
        assert!(kv.set(b"k1", b"v1", UpdateMode::Upsert).unwrap());
        assert!(kv.set(b"k2", b"v2", UpdateMode::Upsert).unwrap());
        kv.close().unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        std::fs::write(&path, &bytes).unwrap();

        let kv = Kv::open(&path).unwrap();
        assert_eq!(kv.get(b"k1"), Some(b"v1".as_slice()));
        assert_eq!(kv.get(b"k2"), None);
    }

    #[test]
    fn keys_stay_strictly_increasing() {
        let dir = tempdir().unwrap();
        let mut kv = Kv::open(dir.path().join("log")).unwrap();
        for k in [b'c', b'a', b'b', b'a', b'd'] {
            kv.set(&[k], &[k], UpdateMode::Upsert).unwrap();
        }
        let mut prev: Option<Vec<u8>> = None;
        for i in 0..kv.len() {
            let k = kv.key_at(i).to_vec();
            if let Some(p) = &prev {
                assert!(p < &k);
            }
            prev = Some(k);
        }
    }

    #[test]
    fn upsert_idempotence_writes_no_record_on_repeat() {
        let dir = tempdir().unwrap();
        let mut kv = Kv::open(dir.path().join("log")).unwrap();
        assert!(kv.set(b"k", b"v", UpdateMode::Upsert).unwrap());
        assert!(!kv.set(b"k", b"v", UpdateMode::Upsert).unwrap());
    }

    #[test]
    fn insert_mode_rejects_existing_key() {
        let dir = tempdir().unwrap();
        let mut kv = Kv::open(dir.path().join("log")).unwrap();
        assert!(kv.set(b"k", b"v1", UpdateMode::Insert).unwrap());
        assert!(!kv.set(b"k", b"v2", UpdateMode::Insert).unwrap());
        assert_eq!(kv.get(b"k"), Some(b"v1".as_slice()));
    }

    #[test]
    fn update_mode_rejects_missing_key() {
        let dir = tempdir().unwrap();
        let mut kv = Kv::open(dir.path().join("log")).unwrap();
        assert!(!kv.set(b"k", b"v1", UpdateMode::Update).unwrap());
        assert_eq!(kv.get(b"k"), None);
    }
}

//! On-disk layout of one log record: a 32-byte fixed header (key length,
//! value length, payload checksum, tombstone flag) followed by the key and
//! value bytes. The checksum covers only the payload, so the reader always
//! knows the record's total size from the header alone before validating
//! its contents.

use std::io::{self, Read};

use crate::util::coding::{decode_fixed_64, put_fixed_64};
use crate::util::crc64;
use crate::util::status::{KvError, Result, Status};

pub const HEADER_SIZE: usize = 32;

/// One `(key, value, tombstone)` triple as persisted in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: Vec<u8>,
    pub val: Vec<u8>,
    pub tombstone: bool,
}

impl Record {
    pub fn put(key: Vec<u8>, val: Vec<u8>) -> Self {
        Record {
            key,
            val,
            tombstone: false,
        }
    }

    pub fn tombstone(key: Vec<u8>) -> Self {
        Record {
            key,
            val: Vec::new(),
            tombstone: true,
        }
    }

    /// Encodes this record's header + payload, appended onto `dst`.
    pub fn encode_to(&self, dst: &mut Vec<u8>) {
        let mut payload = Vec::with_capacity(self.key.len() + self.val.len());
        payload.extend_from_slice(&self.key);
        payload.extend_from_slice(&self.val);
        let checksum = crc64::checksum(&payload);

        put_fixed_64(dst, self.key.len() as u64);
        put_fixed_64(dst, self.val.len() as u64);
        put_fixed_64(dst, checksum);
        put_fixed_64(dst, if self.tombstone { 1 } else { 0 });
        dst.extend_from_slice(&payload);
    }

    /// Reads exactly one record from `r`.
    ///
    /// Returns `Ok(None)` for a clean end-of-stream (zero bytes read at a
    /// record boundary). A short read partway through the header or
    /// payload, or a checksum mismatch, returns the matching `Status`
    /// (`UnexpectedEOF` / `BadChecksum`); both are "expected tail
    /// conditions" the caller (the KV index's replay loop) tolerates by
    /// treating the torn tail as if it were absent.
    pub fn read_next<R: Read>(r: &mut R) -> Result<Option<Record>> {
        let mut header = [0u8; HEADER_SIZE];
        let n = read_fill(r, &mut header)?;
        if n == 0 {
            return Ok(None);
        }
        if n != HEADER_SIZE {
            return Err(KvError::new(
                Status::UnexpectedEOF,
                Some("log record header truncated"),
            ));
        }

        let key_len = decode_fixed_64(&header[0..8]) as usize;
        let val_len = decode_fixed_64(&header[8..16]) as usize;
        let checksum = decode_fixed_64(&header[16..24]);
        let tombstone = decode_fixed_64(&header[24..32]) & 1 == 1;

        let mut payload = vec![0u8; key_len + val_len];
        let m = read_fill(r, &mut payload)?;
        if m != payload.len() {
            return Err(KvError::new(
                Status::UnexpectedEOF,
                Some("log record payload truncated"),
            ));
        }

        if crc64::checksum(&payload) != checksum {
            return Err(KvError::new(
                Status::BadChecksum,
                Some("log record checksum mismatch"),
            ));
        }

        let val = payload.split_off(key_len);
        let key = payload;
        Ok(Some(Record { key, val, tombstone }))
    }
}

/// Like `Read::read_exact` but tolerant of reaching EOF early: returns the
/// number of bytes actually read instead of erroring on a short read, so
/// the caller can distinguish "clean EOF" from "torn record".
fn read_fill<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(KvError::from(e)),
        }
    }
    Ok(filled)
}

//! Table schemas: name, ordered columns, and the ordered primary-key column
//! indices used by the row codec to split a row into key bytes and value
//! bytes.

use crate::cell::CellTag;
use crate::util::coding::{decode_fixed_64, put_fixed_64};
use crate::util::status::{KvError, Result, Status};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub ty: CellTag,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: CellTag) -> Self {
        Column {
            name: name.into(),
            ty,
        }
    }
}

/// A table schema: name, ordered columns, ordered primary-key indices.
///
/// Invariants (checked by `Schema::new`): `table` is non-empty and contains
/// no NUL byte (NUL separates the table name from the key body in row keys,
/// see `row::encode_key`); `pkey` is non-empty, every index is in range for
/// `cols`, and no index repeats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub table: String,
    pub cols: Vec<Column>,
    pub pkey: Vec<usize>,
}

impl Schema {
    pub fn new(table: impl Into<String>, cols: Vec<Column>, pkey: Vec<usize>) -> Result<Self> {
        let table = table.into();
        if table.is_empty() {
            return Err(KvError::new(Status::Corruption, Some("table name is empty")));
        }
        if table.as_bytes().contains(&0x00) {
            return Err(KvError::new(
                Status::Corruption,
                Some("table name contains a NUL byte"),
            ));
        }
        if pkey.is_empty() {
            return Err(KvError::new(
                Status::Corruption,
                Some("primary key must name at least one column"),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for &idx in &pkey {
            if idx >= cols.len() {
                return Err(KvError::new(
                    Status::Corruption,
                    Some("primary key index out of range"),
                ));
            }
            if !seen.insert(idx) {
                return Err(KvError::new(
                    Status::Corruption,
                    Some("duplicate primary key column"),
                ));
            }
        }
        Ok(Schema { table, cols, pkey })
    }

    #[inline]
    pub fn is_pkey(&self, col_idx: usize) -> bool {
        self.pkey.contains(&col_idx)
    }

    pub fn col_index(&self, name: &str) -> Option<usize> {
        self.cols.iter().position(|c| c.name == name)
    }

    /// Serializes this schema for storage under its catalog key. Uses the
    /// same fixed-width-length-prefixed vocabulary as cell/row values rather
    /// than a general-purpose serialization format.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        put_fixed_64(&mut buf, self.table.len() as u64);
        buf.extend_from_slice(self.table.as_bytes());
        put_fixed_64(&mut buf, self.cols.len() as u64);
        for col in &self.cols {
            put_fixed_64(&mut buf, col.name.len() as u64);
            buf.extend_from_slice(col.name.as_bytes());
            buf.push(match col.ty {
                CellTag::I64 => 1,
                CellTag::Str => 2,
            });
        }
        put_fixed_64(&mut buf, self.pkey.len() as u64);
        for &idx in &self.pkey {
            put_fixed_64(&mut buf, idx as u64);
        }
        buf
    }

    pub fn decode(src: &[u8]) -> Result<Self> {
        fn take_len<'a>(src: &'a [u8]) -> Result<(usize, &'a [u8])> {
            if src.len() < 8 {
                return Err(KvError::new(
                    Status::SchemaMismatch,
                    Some("truncated schema catalog entry"),
                ));
            }
            Ok((decode_fixed_64(&src[..8]) as usize, &src[8..]))
        }
        fn take_bytes<'a>(src: &'a [u8], n: usize) -> Result<(&'a [u8], &'a [u8])> {
            if src.len() < n {
                return Err(KvError::new(
                    Status::SchemaMismatch,
                    Some("truncated schema catalog entry"),
                ));
            }
            Ok((&src[..n], &src[n..]))
        }

        let (table_len, rest) = take_len(src)?;
        let (table_bytes, rest) = take_bytes(rest, table_len)?;
        let table = String::from_utf8(table_bytes.to_vec())
            .map_err(|_| KvError::new(Status::SchemaMismatch, Some("table name is not utf-8")))?;

        let (num_cols, mut rest) = take_len(rest)?;
        let mut cols = Vec::with_capacity(num_cols);
        for _ in 0..num_cols {
            let (name_len, r) = take_len(rest)?;
            let (name_bytes, r) = take_bytes(r, name_len)?;
            let name = String::from_utf8(name_bytes.to_vec())
                .map_err(|_| KvError::new(Status::SchemaMismatch, Some("column name is not utf-8")))?;
            if r.is_empty() {
                return Err(KvError::new(
                    Status::SchemaMismatch,
                    Some("truncated schema catalog entry"),
                ));
            }
            let ty = match r[0] {
                1 => CellTag::I64,
                2 => CellTag::Str,
                _ => {
                    return Err(KvError::new(
                        Status::SchemaMismatch,
                        Some("unknown column type tag"),
                    ))
                }
            };
            cols.push(Column::new(name, ty));
            rest = &r[1..];
        }

        let (num_pkey, mut rest) = take_len(rest)?;
        let mut pkey = Vec::with_capacity(num_pkey);
        for _ in 0..num_pkey {
            let (idx, r) = take_len(rest)?;
            pkey.push(idx);
            rest = r;
        }

        if !rest.is_empty() {
            return Err(KvError::new(
                Status::TrailingGarbage,
                Some("trailing bytes after schema catalog entry"),
            ));
        }

        Schema::new(table, cols, pkey)
    }
}

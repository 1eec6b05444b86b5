//! Splitting a row into primary-key bytes and value bytes per a table
//! schema, and the inverse.

use crate::cell::Cell;
use crate::schema::Schema;
use crate::util::status::{KvError, Result, Status};

pub type Row = Vec<Cell>;

/// Builds an all-default row matching `schema`'s column count, suitable as
/// the output of `decode_key`/`decode_val` or as a Select/Delete probe whose
/// pkey positions will be overwritten before use.
pub fn new_row(schema: &Schema) -> Row {
    schema
        .cols
        .iter()
        .map(|c| match c.ty {
            crate::cell::CellTag::I64 => Cell::I64(0),
            crate::cell::CellTag::Str => Cell::Str(Vec::new()),
        })
        .collect()
}

fn check_len(schema: &Schema, row: &[Cell]) -> Result<()> {
    if row.len() != schema.cols.len() {
        return Err(KvError::new(
            Status::SchemaMismatch,
            Some("row length does not match schema column count"),
        ));
    }
    Ok(())
}

/// `table-name ‖ 0x00 ‖ concat(key-encode(row[i]) for i in schema.pkey)`.
///
/// All rows of one table share the `table-name ‖ 0x00` prefix, so they form
/// a contiguous lexicographic range in the KV index — this is what makes
/// per-table range scans possible.
pub fn encode_key(schema: &Schema, row: &[Cell]) -> Result<Vec<u8>> {
    check_len(schema, row)?;
    let mut key = Vec::new();
    key.extend_from_slice(schema.table.as_bytes());
    key.push(0x00);
    for &idx in &schema.pkey {
        if row[idx].tag() != schema.cols[idx].ty {
            return Err(KvError::new(
                Status::SchemaMismatch,
                Some("primary key cell tag does not match column type"),
            ));
        }
        row[idx].encode_key_to(&mut key);
    }
    Ok(key)
}

/// `concat(value-encode(row[i]) for i not in schema.pkey, in cols order)`.
/// Primary-key columns are omitted: they are recoverable from the key.
pub fn encode_val(schema: &Schema, row: &[Cell]) -> Result<Vec<u8>> {
    check_len(schema, row)?;
    let mut val = Vec::new();
    for (idx, cell) in row.iter().enumerate() {
        if schema.is_pkey(idx) {
            continue;
        }
        if cell.tag() != schema.cols[idx].ty {
            return Err(KvError::new(
                Status::SchemaMismatch,
                Some("value cell tag does not match column type"),
            ));
        }
        cell.encode_val_to(&mut val);
    }
    Ok(val)
}

/// Decodes the pkey positions of `row` from `key`, which must begin with
/// `schema.table ‖ 0x00` and contain nothing beyond the decoded cells.
pub fn decode_key(schema: &Schema, row: &mut [Cell], key: &[u8]) -> Result<()> {
    check_len(schema, row)?;
    let prefix_len = schema.table.len() + 1;
    if key.len() < prefix_len
        || &key[..schema.table.len()] != schema.table.as_bytes()
        || key[schema.table.len()] != 0x00
    {
        return Err(KvError::new(Status::BadKey, Some("key table prefix mismatch")));
    }
    let mut rest = &key[prefix_len..];
    for &idx in &schema.pkey {
        let (cell, tail) = Cell::decode_key(schema.cols[idx].ty, rest)?;
        row[idx] = cell;
        rest = tail;
    }
    if !rest.is_empty() {
        return Err(KvError::new(
            Status::TrailingGarbage,
            Some("trailing bytes after row key"),
        ));
    }
    Ok(())
}

/// Decodes the non-pkey positions of `row` from `val`, in `cols` order.
pub fn decode_val(schema: &Schema, row: &mut [Cell], val: &[u8]) -> Result<()> {
    check_len(schema, row)?;
    let mut rest = val;
    for (idx, col) in schema.cols.iter().enumerate() {
        if schema.is_pkey(idx) {
            continue;
        }
        let (cell, tail) = Cell::decode_val(col.ty, rest)?;
        row[idx] = cell;
        rest = tail;
    }
    if !rest.is_empty() {
        return Err(KvError::new(
            Status::TrailingGarbage,
            Some("trailing bytes after row value"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellTag;
    use crate::schema::Column;

    fn link_schema() -> Schema {
        Schema::new(
            "link",
            vec![
                Column::new("time", CellTag::I64),
                Column::new("src", CellTag::Str),
                Column::new("dst", CellTag::Str),
            ],
            vec![1, 2],
        )
        .unwrap()
    }

    #[test]
    fn row_encode_link_layout() {
        let schema = link_schema();
        let row = vec![
            Cell::I64(123),
            Cell::Str(b"a".to_vec()),
            Cell::Str(b"b".to_vec()),
        ];
        let key = encode_key(&schema, &row).unwrap();
        assert_eq!(
            key,
            vec![b'l', b'i', b'n', b'k', 0x00, b'a', 0x00, b'b', 0x00]
        );
        let val = encode_val(&schema, &row).unwrap();
        assert_eq!(val, vec![123, 0, 0, 0, 0, 0, 0, 0]);

        let mut decoded = new_row(&schema);
        decode_key(&schema, &mut decoded, &key).unwrap();
        decode_val(&schema, &mut decoded, &val).unwrap();
        assert_eq!(decoded, row);
    }

    #[test]
    fn key_order_follows_pkey_tuple_order() {
        let schema = link_schema();
        let rows = vec![
            vec![Cell::I64(123), Cell::Str(b"a".to_vec()), Cell::Str(b"bb".to_vec())],
            vec![Cell::I64(123), Cell::Str(b"a".to_vec()), Cell::Str(b"bba".to_vec())],
            vec![Cell::I64(123), Cell::Str(b"ba".to_vec()), Cell::Str(b"b".to_vec())],
        ];
        let keys: Vec<Vec<u8>> = rows.iter().map(|r| encode_key(&schema, r).unwrap()).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn decode_rejects_wrong_table_prefix() {
        let schema = link_schema();
        let mut row = new_row(&schema);
        let err = decode_key(&schema, &mut row, b"other\x00a\x00b\x00").unwrap_err();
        assert_eq!(err.status(), Status::BadKey);
    }

    #[test]
    fn decode_rejects_trailing_garbage() {
        let schema = link_schema();
        let mut row = new_row(&schema);
        let mut key = encode_key(&schema, &vec![Cell::I64(1), Cell::Str(b"a".to_vec()), Cell::Str(b"b".to_vec())]).unwrap();
        key.push(0xFF);
        let err = decode_key(&schema, &mut row, &key).unwrap_err();
        assert_eq!(err.status(), Status::TrailingGarbage);
    }

    #[test]
    fn encode_rejects_length_mismatch() {
        let schema = link_schema();
        let row = vec![Cell::I64(1)];
        let err = encode_key(&schema, &row).unwrap_err();
        assert_eq!(err.status(), Status::SchemaMismatch);
    }
}

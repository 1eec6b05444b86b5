//! Typed scalars and their two binary encodings: an order-preserving key
//! fragment and a self-delimiting, non-order-preserving value fragment.

use crate::util::coding::{decode_fixed_64, put_fixed_64};
use crate::util::status::{KvError, Result, Status};

/// A cell's type tag, used by `Column`/`Schema` to describe the shape of a
/// row independent of any particular cell's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellTag {
    I64,
    Str,
}

/// A tagged scalar value. The tag is fixed once a `Cell` is constructed or
/// decoded; there is no implicit coercion between `I64` and `Str`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    I64(i64),
    Str(Vec<u8>),
}

impl Cell {
    #[inline]
    pub fn tag(&self) -> CellTag {
        match self {
            Cell::I64(_) => CellTag::I64,
            Cell::Str(_) => CellTag::Str,
        }
    }

    /// Appends the order-preserving key fragment for this cell onto `dst`.
    ///
    /// I64 is encoded as 8 big-endian bytes of `value XOR 2^63`, flipping
    /// the sign bit so unsigned byte order matches signed numeric order.
    /// Str is escaped byte-for-byte (`0x00` -> `01 01`, `0x01` -> `01 02`)
    /// and terminated with an unescaped `0x00`, which sorts before every
    /// escaped continuation byte and so keeps shorter strings ordered
    /// before longer ones that share their prefix.
    pub fn encode_key_to(&self, dst: &mut Vec<u8>) {
        match self {
            Cell::I64(v) => {
                let flipped = (*v as u64) ^ (1u64 << 63);
                dst.extend_from_slice(&flipped.to_be_bytes());
            }
            Cell::Str(s) => {
                for &b in s {
                    if b == 0x00 || b == 0x01 {
                        dst.push(0x01);
                        dst.push(b + 1);
                    } else {
                        dst.push(b);
                    }
                }
                dst.push(0x00);
            }
        }
    }

    /// Decodes one key-encoded cell of type `tag` from the front of `src`,
    /// returning the cell and the unread tail.
    pub fn decode_key(tag: CellTag, src: &[u8]) -> Result<(Cell, &[u8])> {
        match tag {
            CellTag::I64 => {
                if src.len() < 8 {
                    return Err(KvError::new(
                        Status::TruncatedKey,
                        Some("not enough bytes for an i64 key"),
                    ));
                }
                let mut buf = [0u8; 8];
                buf.copy_from_slice(&src[..8]);
                let flipped = u64::from_be_bytes(buf);
                let v = (flipped ^ (1u64 << 63)) as i64;
                Ok((Cell::I64(v), &src[8..]))
            }
            CellTag::Str => {
                let mut out = Vec::new();
                let mut i = 0usize;
                loop {
                    if i >= src.len() {
                        return Err(KvError::new(
                            Status::TruncatedKey,
                            Some("unterminated string key"),
                        ));
                    }
                    let b = src[i];
                    if b == 0x00 {
                        i += 1;
                        break;
                    } else if b == 0x01 {
                        if i + 1 >= src.len() {
                            return Err(KvError::new(
                                Status::TruncatedKey,
                                Some("truncated escape sequence in string key"),
                            ));
                        }
                        out.push(src[i + 1] - 1);
                        i += 2;
                    } else {
                        out.push(b);
                        i += 1;
                    }
                }
                Ok((Cell::Str(out), &src[i..]))
            }
        }
    }

    /// Appends the little-endian value fragment for this cell onto `dst`.
    /// Unlike the key encoding, this does not preserve order.
    pub fn encode_val_to(&self, dst: &mut Vec<u8>) {
        match self {
            Cell::I64(v) => dst.extend_from_slice(&v.to_le_bytes()),
            Cell::Str(s) => {
                put_fixed_64(dst, s.len() as u64);
                dst.extend_from_slice(s);
            }
        }
    }

    /// Decodes one value-encoded cell of type `tag` from the front of
    /// `src`, returning the cell and the unread tail.
    pub fn decode_val(tag: CellTag, src: &[u8]) -> Result<(Cell, &[u8])> {
        match tag {
            CellTag::I64 => {
                if src.len() < 8 {
                    return Err(KvError::new(
                        Status::TruncatedValue,
                        Some("not enough bytes for an i64 value"),
                    ));
                }
                let mut buf = [0u8; 8];
                buf.copy_from_slice(&src[..8]);
                Ok((Cell::I64(i64::from_le_bytes(buf)), &src[8..]))
            }
            CellTag::Str => {
                if src.len() < 8 {
                    return Err(KvError::new(
                        Status::TruncatedValue,
                        Some("not enough bytes for a string value length"),
                    ));
                }
                let n = decode_fixed_64(&src[..8]) as usize;
                let rest = &src[8..];
                if rest.len() < n {
                    return Err(KvError::new(
                        Status::TruncatedValue,
                        Some("string value shorter than its declared length"),
                    ));
                }
                Ok((Cell::Str(rest[..n].to_vec()), &rest[n..]))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn i64_key_round_trip_and_sign_flip() {
        let c = Cell::I64(-2);
        let mut buf = Vec::new();
        c.encode_key_to(&mut buf);
        assert_eq!(buf, vec![0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE]);
        let (decoded, rest) = Cell::decode_key(CellTag::I64, &buf).unwrap();
        assert!(rest.is_empty());
        assert_eq!(decoded, c);
    }

    #[test]
    fn i64_key_order_matches_signed_order() {
        let values = [-2i64, -1, 0, 1, 2];
        let mut keys: Vec<Vec<u8>> = values
            .iter()
            .map(|v| {
                let mut b = Vec::new();
                Cell::I64(*v).encode_key_to(&mut b);
                b
            })
            .collect();
        let sorted = {
            let mut k = keys.clone();
            k.sort();
            k
        };
        assert_eq!(keys, sorted);
        // and strictly increasing
        keys.dedup();
        assert_eq!(keys.len(), values.len());
    }

    #[test]
    fn str_key_escaping() {
        let c = Cell::Str(b"a\x00s\x01d\x02f".to_vec());
        let mut buf = Vec::new();
        c.encode_key_to(&mut buf);
        assert_eq!(
            buf,
            vec![0x61, 0x01, 0x01, 0x73, 0x01, 0x02, 0x64, 0x02, 0x66, 0x00]
        );
        let (decoded, rest) = Cell::decode_key(CellTag::Str, &buf).unwrap();
        assert!(rest.is_empty());
        assert_eq!(decoded, c);
    }

    #[test]
    fn str_key_shorter_prefix_sorts_first() {
        // "b" vs "bb": the shared prefix sorts equal, then "b"'s terminator
        // (0x00) must sort before "bb"'s continuation byte (0x62).
        let mut a = Vec::new();
        Cell::Str(b"b".to_vec()).encode_key_to(&mut a);
        let mut b = Vec::new();
        Cell::Str(b"bb".to_vec()).encode_key_to(&mut b);
        assert!(a < b);
    }

    #[test]
    fn str_key_nul_prefix_case() {
        // "b\x00" vs "ba": the next original byte after the shared "b" is
        // 0x00 in the first string, which gets escaped to 01 01 rather than
        // left as a bare terminator, so it still sorts before 'a' (0x61).
        let mut shorter = Vec::new();
        Cell::Str(b"b\x00".to_vec()).encode_key_to(&mut shorter);
        let mut longer = Vec::new();
        Cell::Str(b"ba".to_vec()).encode_key_to(&mut longer);
        // "b\x00" < "ba" because 0x00 (escaped to 01 01) < 'a' (0x61)
        assert!(shorter < longer);
    }

    #[test]
    fn value_round_trip() {
        let c = Cell::I64(123);
        let mut buf = Vec::new();
        c.encode_val_to(&mut buf);
        assert_eq!(buf, vec![123, 0, 0, 0, 0, 0, 0, 0]);
        let (decoded, rest) = Cell::decode_val(CellTag::I64, &buf).unwrap();
        assert!(rest.is_empty());
        assert_eq!(decoded, c);

        let c = Cell::Str(b"asdf".to_vec());
        let mut buf = Vec::new();
        c.encode_val_to(&mut buf);
        assert_eq!(buf, vec![4, 0, 0, 0, 0, 0, 0, 0, b'a', b's', b'd', b'f']);
        let (decoded, rest) = Cell::decode_val(CellTag::Str, &buf).unwrap();
        assert!(rest.is_empty());
        assert_eq!(decoded, c);
    }

    #[test]
    fn truncated_inputs_fail() {
        assert_eq!(
            Cell::decode_key(CellTag::I64, &[1, 2, 3]).unwrap_err().status(),
            Status::TruncatedKey
        );
        assert_eq!(
            Cell::decode_key(CellTag::Str, b"no terminator").unwrap_err().status(),
            Status::TruncatedKey
        );
        assert_eq!(
            Cell::decode_val(CellTag::I64, &[1, 2, 3]).unwrap_err().status(),
            Status::TruncatedValue
        );
        assert_eq!(
            Cell::decode_val(CellTag::Str, &[5, 0, 0, 0, 0, 0, 0, 0, b'a'])
                .unwrap_err()
                .status(),
            Status::TruncatedValue
        );
    }
}

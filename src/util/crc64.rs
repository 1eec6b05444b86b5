//! CRC-64 using the ISO 3309 polynomial (reflected form `0xD800000000000000`),
//! the same polynomial used by `cksum -a crc64` and a handful of storage
//! formats that predate the newer ECMA/"xz" CRC-64 variant.
//!
//! The lookup table is a process-wide constant, built once on first use and
//! live for the remainder of the process — it has no mutable state once
//! constructed, so one `lazy_static` table is shared by every checksum call
//! rather than rebuilding it per record.

const POLY: u64 = 0xD800_0000_0000_0000;

fn build_table() -> [u64; 256] {
    let mut table = [0u64; 256];
    let mut i = 0usize;
    while i < 256 {
        let mut crc = i as u64;
        let mut j = 0;
        while j < 8 {
            crc = if crc & 1 == 1 {
                (crc >> 1) ^ POLY
            } else {
                crc >> 1
            };
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

lazy_static! {
    static ref TABLE: [u64; 256] = build_table();
}

/// Computes the CRC-64/ISO checksum of `data`.
pub fn checksum(data: &[u8]) -> u64 {
    let mut crc = !0u64;
    for &b in data {
        let idx = ((crc ^ u64::from(b)) & 0xff) as usize;
        crc = TABLE[idx] ^ (crc >> 8);
    }
    !crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input() {
        assert_eq!(checksum(b""), 0);
    }

    #[test]
    fn deterministic() {
        let a = checksum(b"hello world");
        let b = checksum(b"hello world");
        assert_eq!(a, b);
    }

    #[test]
    fn sensitive_to_every_byte() {
        let a = checksum(b"abcdef");
        let mut tampered = b"abcdef".to_vec();
        tampered[3] ^= 0x01;
        let b = checksum(&tampered);
        assert_ne!(a, b);
    }

    #[test]
    fn sensitive_to_length() {
        let a = checksum(b"abc");
        let b = checksum(b"abc\0");
        assert_ne!(a, b);
    }
}

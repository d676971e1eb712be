//! Byte-level helpers: order reversal, bit expansion, trimming and hex rendering.

use crate::{DtypError, Result};

/// Returns a copy of `bytes` in reverse order.
pub fn reverse(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().rev().copied().collect()
}

/// Expands up to 4 bytes into their bits, most significant bit first.
///
/// Index 0 is the highest bit of `bytes[0]`.
pub fn get_bits(bytes: &[u8]) -> Result<Vec<bool>> {
    if bytes.len() > 4 {
        return Err(DtypError::TooManyBytes(bytes.len()));
    }
    Ok(bytes
        .iter()
        .flat_map(|&b| (0..8).rev().map(move |i| (b >> i) & 1 == 1))
        .collect())
}

/// Big-endian accumulation of up to 4 bytes into an unsigned integer.
pub fn get_uint(bytes: &[u8]) -> Result<u32> {
    if bytes.len() > 4 {
        return Err(DtypError::TooManyBytes(bytes.len()));
    }
    Ok(bytes.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32))
}

/// Drops leading zero bytes.
pub fn left_trim(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

/// Drops trailing zero bytes.
pub fn right_trim(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    &bytes[..end]
}

/// Upper-case hex, no separators.
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode_upper(bytes)
}

/// `\XX` per byte, the escape form used in LDAP filter values.
pub fn to_escaped_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("\\{b:02X}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_bits_msb_first() {
        let bits = get_bits(&[0x84, 0x14]).unwrap();
        assert_eq!(bits.len(), 16);
        let set: Vec<usize> = bits
            .iter()
            .enumerate()
            .filter_map(|(i, &b)| b.then_some(i))
            .collect();
        assert_eq!(set, vec![0, 5, 11, 13]);
    }

    #[test]
    fn test_too_many_bytes() {
        assert!(matches!(
            get_bits(&[0; 5]),
            Err(DtypError::TooManyBytes(5))
        ));
        assert!(get_uint(&[1, 2, 3, 4, 5]).is_err());
    }

    #[test]
    fn test_get_uint() {
        assert_eq!(get_uint(&[]).unwrap(), 0);
        assert_eq!(get_uint(&[0x01, 0x02]).unwrap(), 0x0102);
        assert_eq!(get_uint(&[0xde, 0xad, 0xbe, 0xef]).unwrap(), 0xdeadbeef);
    }

    #[test]
    fn test_trim_and_reverse() {
        assert_eq!(left_trim(&[0, 0, 1, 0]), &[1, 0]);
        assert_eq!(right_trim(&[0, 1, 0, 0]), &[0, 1]);
        assert_eq!(left_trim(&[0, 0]), &[] as &[u8]);
        assert_eq!(right_trim(&[0, 0]), &[] as &[u8]);
        assert_eq!(reverse(&[1, 2, 3]), vec![3, 2, 1]);
    }

    #[test]
    fn test_hex_forms() {
        assert_eq!(to_hex(&[0x01, 0xab]), "01AB");
        assert_eq!(to_escaped_hex(&[0x01, 0xab]), "\\01\\AB");
    }
}

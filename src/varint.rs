//! Variable-length integers of the Avro binary encoding.
//!
//! Seven payload bits per byte, least significant group first, with the high
//! bit set on every byte but the last. Signed values are zig-zag mapped first
//! (0, -1, 1, -2, ... become 0, 1, 2, 3, ...) so small magnitudes stay short
//! whatever their sign.

use crate::error::DecodeError;

/// Maximum encoded length of a 64-bit varint.
pub const MAX_VARINT_LEN: usize = 10;

// ============================================================================
// Reading
// ============================================================================

/// Read an unsigned varint and advance the cursor past it.
///
/// Fails with `UnexpectedEof` on truncated input and `InvalidVarint` when
/// the continuation bits run past [`MAX_VARINT_LEN`] bytes.
#[inline]
pub fn decode_varint(data: &mut &[u8]) -> Result<u64, DecodeError> {
    let mut value = 0u64;
    for (i, &byte) in data.iter().enumerate().take(MAX_VARINT_LEN) {
        value |= u64::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            *data = &data[i + 1..];
            return Ok(value);
        }
    }
    if data.len() >= MAX_VARINT_LEN {
        Err(DecodeError::InvalidVarint)
    } else {
        Err(DecodeError::UnexpectedEof)
    }
}

/// Read a zig-zag varint as a signed integer.
#[inline]
pub fn decode_zigzag(data: &mut &[u8]) -> Result<i64, DecodeError> {
    let raw = decode_varint(data)?;
    Ok((raw >> 1) as i64 ^ -((raw & 1) as i64))
}

/// Step over one varint without assembling its value.
#[inline]
pub fn skip_varint(data: &mut &[u8]) -> Result<(), DecodeError> {
    match data.iter().position(|&byte| byte & 0x80 == 0) {
        Some(end) => {
            *data = &data[end + 1..];
            Ok(())
        }
        None => Err(DecodeError::UnexpectedEof),
    }
}

// ============================================================================
// Writing
// ============================================================================

/// Write an unsigned varint into `out`, returning the number of bytes used.
#[inline]
pub fn write_varint(mut value: u64, out: &mut [u8; MAX_VARINT_LEN]) -> usize {
    let mut len = 0;
    loop {
        let low = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out[len] = low;
            return len + 1;
        }
        out[len] = low | 0x80;
        len += 1;
    }
}

/// Write a signed integer as a zig-zag varint, returning the bytes used.
#[inline]
pub fn write_zigzag(value: i64, out: &mut [u8; MAX_VARINT_LEN]) -> usize {
    write_varint(((value << 1) ^ (value >> 63)) as u64, out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zigzag_bytes(value: i64) -> Vec<u8> {
        let mut buf = [0u8; MAX_VARINT_LEN];
        let len = write_zigzag(value, &mut buf);
        buf[..len].to_vec()
    }

    #[test]
    fn test_decode_varint_known_values() {
        let cases: [(&[u8], u64); 6] = [
            (&[0x00], 0),
            (&[0x7F], 127),
            (&[0x80, 0x01], 128),
            (&[0xAC, 0x02], 300),
            (&[0x80, 0x80, 0x01], 16384),
            (&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F], i64::MAX as u64),
        ];
        for (bytes, expected) in cases {
            let mut cursor = bytes;
            assert_eq!(decode_varint(&mut cursor).unwrap(), expected);
            assert!(cursor.is_empty());
        }
    }

    #[test]
    fn test_decode_varint_leaves_following_bytes() {
        let mut cursor: &[u8] = &[0xAC, 0x02, 0x33];
        assert_eq!(decode_varint(&mut cursor).unwrap(), 300);
        assert_eq!(cursor, &[0x33]);
    }

    #[test]
    fn test_decode_varint_truncated() {
        for bytes in [&[][..], &[0x80][..], &[0xFF, 0xFF][..]] {
            let mut cursor = bytes;
            assert!(matches!(
                decode_varint(&mut cursor),
                Err(DecodeError::UnexpectedEof)
            ));
        }
    }

    #[test]
    fn test_decode_varint_too_long() {
        let mut cursor: &[u8] = &[0xFF; 11];
        assert!(matches!(
            decode_varint(&mut cursor),
            Err(DecodeError::InvalidVarint)
        ));
    }

    #[test]
    fn test_decode_zigzag_sign_interleaving() {
        for (byte, expected) in [(0x00u8, 0i64), (0x01, -1), (0x02, 1), (0x03, -2), (0x04, 2)] {
            let data = [byte];
            let mut cursor = &data[..];
            assert_eq!(decode_zigzag(&mut cursor).unwrap(), expected);
        }
    }

    #[test]
    fn test_skip_varint() {
        let mut cursor: &[u8] = &[0x80, 0x80, 0x01, 0xFF];
        skip_varint(&mut cursor).unwrap();
        assert_eq!(cursor, &[0xFF]);

        let mut cursor: &[u8] = &[0x80];
        assert!(matches!(
            skip_varint(&mut cursor),
            Err(DecodeError::UnexpectedEof)
        ));
    }

    #[test]
    fn test_write_varint_layout() {
        let mut buf = [0u8; MAX_VARINT_LEN];
        let len = write_varint(300, &mut buf);
        assert_eq!(&buf[..len], &[0xAC, 0x02]);
        assert_eq!(write_varint(0, &mut buf), 1);
        assert_eq!(write_varint(u64::MAX, &mut buf), MAX_VARINT_LEN);
    }

    #[test]
    fn test_zigzag_round_trip_extremes() {
        for value in [i64::MIN, -129, -64, -1, 0, 63, 64, i64::MAX] {
            let bytes = zigzag_bytes(value);
            let mut cursor = bytes.as_slice();
            assert_eq!(decode_zigzag(&mut cursor).unwrap(), value);
            assert!(cursor.is_empty());
        }
        assert_eq!(zigzag_bytes(-64), vec![0x7F]);
        assert_eq!(zigzag_bytes(64), vec![0x80, 0x01]);
    }
}

//! Delta-of-delta timestamp codes.
//!
//! | prefix | payload bits | representable delta-of-delta |
//! |--------|--------------|------------------------------|
//! | `0`    | 0            | 0                            |
//! | `10`   | 7            | [-63, 64]                    |
//! | `110`  | 9            | [-255, 256]                  |
//! | `1110` | 12           | [-2047, 2048]                |
//! | `1111` | 32           | [-2^31, 2^31 - 1] except -1, or end of stream |

use crate::bitbuffer::{BitBuffer, BitInput, BufferFull, InsufficientBits};

/// Payload width selected by a prefix of `n` one bits, indexed by `n`.
pub(crate) const PAYLOAD_BITS: [u8; 5] = [0, 7, 9, 12, 32];

/// Longest prefix; it has no terminating zero.
const MAX_PREFIX_ONES: usize = PAYLOAD_BITS.len() - 1;

/// 32-bit payload reserved as the end-of-stream marker.
pub(crate) const END_OF_STREAM: u64 = 0xFFFF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dod {
    Value(i64),
    EndOfStream,
}

/// Reads one delta-of-delta code.
pub(crate) fn read_delta_of_delta<R: BitInput>(input: &mut R) -> Result<Dod, InsufficientBits> {
    let mut ones = 0;
    while ones < MAX_PREFIX_ONES && input.read_bit()? {
        ones += 1;
    }

    let width = PAYLOAD_BITS[ones];
    if width == 0 {
        return Ok(Dod::Value(0));
    }

    let raw = input.read_bits(width)?;
    if width == 32 && raw == END_OF_STREAM {
        return Ok(Dod::EndOfStream);
    }
    Ok(Dod::Value(to_signed(raw, width)))
}

/// Turns a `width`-bit unsigned payload back into a signed delta-of-delta.
///
/// For the narrow widths, values strictly above `2^(width-1)` are negative and
/// the boundary `2^(width-1)` itself stays positive. The 32-bit payload is
/// plain two's complement, so `0x8000_0000` is `-2^31`.
#[inline]
pub(crate) fn to_signed(raw: u64, width: u8) -> i64 {
    debug_assert!((1..64).contains(&width));
    if width == 32 {
        return raw as u32 as i32 as i64;
    }
    let half = 1u64 << (width - 1);
    if raw > half {
        raw as i64 - (1i64 << width)
    } else {
        raw as i64
    }
}

/// Writes the shortest code for `dod`. Returns `Ok(false)` when `dod` cannot be
/// represented, without writing anything.
pub(crate) fn write_delta_of_delta(buf: &mut BitBuffer, dod: i64) -> Result<bool, BufferFull> {
    if dod == 0 {
        buf.write_bit(false)?;
        return Ok(true);
    }

    let Some(ones) = (1..PAYLOAD_BITS.len()).find(|&i| fits(dod, PAYLOAD_BITS[i])) else {
        return Ok(false);
    };
    let width = PAYLOAD_BITS[ones];

    // A full prefix has no terminating zero bit.
    let (prefix, prefix_len) = if ones == MAX_PREFIX_ONES {
        ((1u64 << ones) - 1, ones as u8)
    } else {
        (((1u64 << ones) - 1) << 1, ones as u8 + 1)
    };
    let payload = dod as u64 & (u64::MAX >> (64 - width));

    if !buf.has_room_for((prefix_len + width) as usize) {
        return Err(BufferFull);
    }
    buf.write_bits(prefix, prefix_len)?;
    buf.write_bits(payload, width)?;
    Ok(true)
}

/// Whether `dod` survives a round trip through a `width`-bit payload.
fn fits(dod: i64, width: u8) -> bool {
    if width == 32 {
        // -1 would collide with the end-of-stream marker, but it always fits in 7.
        return i32::try_from(dod).is_ok();
    }
    let half = 1i64 << (width - 1);
    dod >= -(half - 1) && dod <= half
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitbuffer::BitReader;

    fn decode_bits(bits: &[(u64, u8)]) -> Result<Dod, InsufficientBits> {
        let mut buf = BitBuffer::new();
        for &(value, n) in bits {
            buf.write_bits(value, n).unwrap();
        }
        let mut reader = buf.reader();
        read_delta_of_delta(&mut reader)
    }

    #[test]
    fn test_zero_prefix() {
        assert_eq!(decode_bits(&[(0b0, 1)]), Ok(Dod::Value(0)));
    }

    #[test]
    fn test_every_prefix_selects_its_width() {
        assert_eq!(decode_bits(&[(0b10, 2), (5, 7)]), Ok(Dod::Value(5)));
        assert_eq!(decode_bits(&[(0b110, 3), (200, 9)]), Ok(Dod::Value(200)));
        assert_eq!(decode_bits(&[(0b1110, 4), (2000, 12)]), Ok(Dod::Value(2000)));
        assert_eq!(
            decode_bits(&[(0b1111, 4), (100_000, 32)]),
            Ok(Dod::Value(100_000))
        );
    }

    #[test]
    fn test_negative_payloads() {
        assert_eq!(decode_bits(&[(0b10, 2), (0x7F, 7)]), Ok(Dod::Value(-1)));
        assert_eq!(decode_bits(&[(0b10, 2), (65, 7)]), Ok(Dod::Value(-63)));
        assert_eq!(decode_bits(&[(0b110, 3), (257, 9)]), Ok(Dod::Value(-255)));
        assert_eq!(decode_bits(&[(0b1110, 4), (2049, 12)]), Ok(Dod::Value(-2047)));
        assert_eq!(
            decode_bits(&[(0b1111, 4), (0xFFFF_FFFE, 32)]),
            Ok(Dod::Value(-2))
        );
    }

    #[test]
    fn test_boundary_payload_is_positive() {
        for width in [7u8, 9, 12] {
            let half = 1u64 << (width - 1);
            assert_eq!(to_signed(half, width), half as i64, "width {width}");
            assert_eq!(to_signed(half + 1, width), -(half as i64 - 1), "width {width}");
        }
    }

    #[test]
    fn test_wide_payload_is_twos_complement() {
        assert_eq!(to_signed(0x8000_0000, 32), -(1i64 << 31));
        assert_eq!(to_signed(0x7FFF_FFFF, 32), (1i64 << 31) - 1);
        assert_eq!(to_signed(0x8000_0001, 32), -(1i64 << 31) + 1);
        assert_eq!(
            decode_bits(&[(0b1111, 4), (0x8000_0000, 32)]),
            Ok(Dod::Value(-(1 << 31)))
        );
    }

    #[test]
    fn test_end_of_stream_marker() {
        assert_eq!(
            decode_bits(&[(0b1111, 4), (END_OF_STREAM, 32)]),
            Ok(Dod::EndOfStream)
        );
    }

    #[test]
    fn test_all_ones_in_narrow_widths_is_not_a_marker() {
        assert_eq!(decode_bits(&[(0b1110, 4), (0xFFF, 12)]), Ok(Dod::Value(-1)));
    }

    #[test]
    fn test_truncated_payload() {
        let err = decode_bits(&[(0b110, 3), (0b1, 1)]).unwrap_err();
        assert_eq!(err.requested, 9);
        assert_eq!(err.remaining, 1);
    }

    #[test]
    fn test_truncated_prefix() {
        let bytes = [0b1100_0000];
        let mut reader = BitReader::new(&bytes, 2);
        assert!(read_delta_of_delta(&mut reader).is_err());
    }

    #[test]
    fn test_writer_picks_shortest_code() {
        let cases = [
            (0i64, 1usize),
            (64, 9),
            (-63, 9),
            (-64, 12),
            (256, 12),
            (-255, 12),
            (2048, 16),
            (-2048, 36),
            ((1 << 31) - 1, 36),
            (-(1 << 31), 36),
        ];
        for (dod, expected_bits) in cases {
            let mut buf = BitBuffer::new();
            assert!(write_delta_of_delta(&mut buf, dod).unwrap());
            assert_eq!(buf.len_bits(), expected_bits, "dod {dod}");
            assert_eq!(read_delta_of_delta(&mut buf.reader()), Ok(Dod::Value(dod)));
        }
    }

    #[test]
    fn test_writer_rejects_out_of_range() {
        let mut buf = BitBuffer::new();
        assert!(!write_delta_of_delta(&mut buf, 1 << 31).unwrap());
        assert!(!write_delta_of_delta(&mut buf, (1 << 31) + 1).unwrap());
        assert!(!write_delta_of_delta(&mut buf, -(1 << 31) - 1).unwrap());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_writer_respects_limit_atomically() {
        let mut buf = BitBuffer::with_limit(1);
        buf.write_bits(0, 4).unwrap();
        assert_eq!(write_delta_of_delta(&mut buf, 10), Err(BufferFull));
        assert_eq!(buf.len_bits(), 4);
    }
}

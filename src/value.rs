//! XOR compression of IEEE-754 values.
//!
//! Each value is XORed against the raw bits of the one before it. Only the
//! "meaningful" bits of the XOR, between a run of leading zeros and a run of
//! trailing zeros, are stored:
//!
//! - `0`: same value as before
//! - `10` + payload: payload fits the window of the previous stored value
//! - `11` + 5-bit leading zeros + 6-bit significant bits + payload: new window
//!
//! A significant-bit count of 64 is written as 0.

use crate::bitbuffer::{BitBuffer, BitInput, BufferFull};
use crate::error::DecodeError;

const LEADING_ZEROS_BITS: u8 = 5;
const SIGNIFICANT_BITS_BITS: u8 = 6;
/// Largest leading-zero count the 5-bit field can carry.
const MAX_LEADING_ZEROS: u8 = (1 << LEADING_ZEROS_BITS) - 1;

/// The leading/trailing zero run lengths that bound the meaningful XOR bits.
///
/// `leading + trailing < 64` always holds, since at least one bit is significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XorWindow {
    leading: u8,
    trailing: u8,
}

impl XorWindow {
    /// Window as read from the stream. `significant == 0` stands for 64.
    fn from_wire(leading: u8, significant: u8) -> Result<Self, DecodeError> {
        let significant_bits = if significant == 0 { 64 } else { significant };
        let trailing = 64u8
            .checked_sub(significant_bits)
            .and_then(|rest| rest.checked_sub(leading))
            .ok_or(DecodeError::InvalidWindow {
                leading,
                significant: significant_bits,
            })?;
        Ok(Self { leading, trailing })
    }

    /// Smallest window covering `xor` that the wire format can express.
    fn covering(xor: u64) -> Self {
        debug_assert_ne!(xor, 0);
        Self {
            leading: (xor.leading_zeros() as u8).min(MAX_LEADING_ZEROS),
            trailing: xor.trailing_zeros() as u8,
        }
    }

    #[inline]
    pub fn leading(&self) -> u8 {
        self.leading
    }

    #[inline]
    pub fn trailing(&self) -> u8 {
        self.trailing
    }

    /// Number of meaningful bits between the two zero runs (1..=64).
    #[inline]
    pub fn significant(&self) -> u8 {
        64 - self.leading - self.trailing
    }

    fn contains(&self, other: &XorWindow) -> bool {
        other.leading >= self.leading && other.trailing >= self.trailing
    }
}

/// Raw bits of the most recent value plus the window it was stored with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ValueState {
    pub(crate) bits: u64,
    /// `None` until the first window is signalled.
    pub(crate) window: Option<XorWindow>,
}

impl ValueState {
    pub(crate) fn new(bits: u64) -> Self {
        Self { bits, window: None }
    }

    /// Reads the next value and advances `self` to it.
    pub(crate) fn read_next<R: BitInput>(&mut self, input: &mut R) -> Result<u64, DecodeError> {
        if !input.read_bit()? {
            return Ok(self.bits);
        }

        let window = if input.read_bit()? {
            let leading = input.read_bits(LEADING_ZEROS_BITS)? as u8;
            let significant = input.read_bits(SIGNIFICANT_BITS_BITS)? as u8;
            let window = XorWindow::from_wire(leading, significant)?;
            tracing::debug!(
                leading = window.leading,
                trailing = window.trailing,
                "new xor window"
            );
            self.window = Some(window);
            window
        } else {
            self.window.ok_or(DecodeError::MissingWindow)?
        };

        let meaningful = input.read_bits(window.significant())?;
        self.bits ^= meaningful << window.trailing;
        Ok(self.bits)
    }

    /// Writes `bits` as the next value and advances `self` to it.
    ///
    /// Nothing is written if the buffer cannot hold the whole value.
    pub(crate) fn write_next(&mut self, buf: &mut BitBuffer, bits: u64) -> Result<(), BufferFull> {
        let xor = bits ^ self.bits;
        if xor == 0 {
            return buf.write_bit(false);
        }

        let wanted = XorWindow::covering(xor);
        match self.window {
            Some(window) if window.contains(&wanted) => {
                let significant = window.significant();
                if !buf.has_room_for(2 + significant as usize) {
                    return Err(BufferFull);
                }
                buf.write_bits(0b10, 2)?;
                buf.write_bits(xor >> window.trailing, significant)?;
            }
            _ => {
                let significant = wanted.significant();
                let header = (LEADING_ZEROS_BITS + SIGNIFICANT_BITS_BITS) as usize;
                if !buf.has_room_for(2 + header + significant as usize) {
                    return Err(BufferFull);
                }
                buf.write_bits(0b11, 2)?;
                buf.write_bits(u64::from(wanted.leading), LEADING_ZEROS_BITS)?;
                // 64 wraps to 0 in six bits.
                buf.write_bits(u64::from(significant), SIGNIFICANT_BITS_BITS)?;
                buf.write_bits(xor >> wanted.trailing, significant)?;
                self.window = Some(wanted);
            }
        }

        self.bits = bits;
        Ok(())
    }
}

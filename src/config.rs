use crate::error::ConfigError;

/// Width of the first delta when no other width has been agreed with the encoder.
pub const DEFAULT_FIRST_DELTA_BITS: u8 = 14;

/// Block-wide parameters shared out-of-band by encoder and decoder.
///
/// Nothing here is written into the stream; both sides must be built with the
/// same values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockConfig {
    first_delta_bits: u8,
}

impl BlockConfig {
    pub fn new() -> Self {
        Self {
            first_delta_bits: DEFAULT_FIRST_DELTA_BITS,
        }
    }

    /// Sets the bit width of the unsigned first delta (`1..=64`).
    pub fn with_first_delta_bits(self, bits: u8) -> Result<Self, ConfigError> {
        if bits == 0 || bits > 64 {
            return Err(ConfigError::InvalidFirstDeltaBits(bits));
        }
        Ok(Self {
            first_delta_bits: bits,
        })
    }

    #[inline]
    pub fn first_delta_bits(&self) -> u8 {
        self.first_delta_bits
    }

    /// Largest first delta the configured width can carry.
    pub(crate) fn max_first_delta(&self) -> u64 {
        u64::MAX >> (64 - self.first_delta_bits)
    }
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self::new()
    }
}

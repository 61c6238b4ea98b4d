use crate::bitbuffer::{BufferFull, InsufficientBits};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("first delta width must be between 1 and 64 bits, got {0}")]
    InvalidFirstDeltaBits(u8),
}

/// Errors raised while decoding a block.
///
/// Any of these leaves the decoder unusable; later calls return
/// [`DecodeError::Poisoned`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("compressed stream ended unexpectedly: {0}")]
    UnexpectedEnd(#[from] InsufficientBits),
    #[error("value reuses the previous xor window but none has been read yet")]
    MissingWindow,
    #[error("xor window of {leading} leading zeros and {significant} significant bits exceeds 64 bits")]
    InvalidWindow { leading: u8, significant: u8 },
    #[error("decoder used again after a failed read")]
    Poisoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error(transparent)]
    BufferFull(#[from] BufferFull),
    #[error("timestamp {timestamp} is before block timestamp {block_timestamp}")]
    BeforeBlockStart { timestamp: i64, block_timestamp: i64 },
    #[error("first delta {delta} does not fit in {bits} bits")]
    FirstDeltaOverflow { delta: u64, bits: u8 },
    #[error("delta-of-delta {0} does not fit in 32 bits")]
    DeltaOfDeltaOverflow(i64),
    #[error("a block needs at least one point")]
    EmptyBlock,
    #[error("cannot encode after finish()")]
    Finished,
}

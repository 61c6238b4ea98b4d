//! Bit-level storage: an MSB-first writer for the encoder and the forward-only
//! cursor the decoder consumes.

/// Error returned when a write would exceed the buffer's byte limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("write would exceed bit buffer byte limit")]
pub struct BufferFull;

/// Error returned when fewer bits remain in the input than a read requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("requested {requested} bits but only {remaining} remain")]
pub struct InsufficientBits {
    pub requested: u8,
    pub remaining: usize,
}

/// A sequential source of bits, read most-significant bit first.
///
/// Reads are all-or-nothing: a read that fails with [`InsufficientBits`]
/// leaves the cursor where it was.
pub trait BitInput {
    /// Reads and consumes a single bit.
    fn read_bit(&mut self) -> Result<bool, InsufficientBits>;

    /// Reads and consumes `n` bits (`n <= 64`) as an unsigned integer.
    fn read_bits(&mut self, n: u8) -> Result<u64, InsufficientBits>;
}

impl<T: BitInput + ?Sized> BitInput for &mut T {
    #[inline]
    fn read_bit(&mut self) -> Result<bool, InsufficientBits> {
        (**self).read_bit()
    }

    #[inline]
    fn read_bits(&mut self, n: u8) -> Result<u64, InsufficientBits> {
        (**self).read_bits(n)
    }
}

/// A growable bit buffer written MSB-first.
///
/// An optional byte limit caps memory usage. Once reached, writes return
/// `Err(BufferFull)` instead of growing.
#[derive(Debug, Clone, Default)]
pub struct BitBuffer {
    bytes: Vec<u8>,
    /// Total number of bits written.
    len_bits: usize,
    max_bytes: Option<usize>,
}

impl BitBuffer {
    /// Creates a new empty `BitBuffer` with no size limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a `BitBuffer` with the given pre-allocated capacity in bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
            len_bits: 0,
            max_bytes: None,
        }
    }

    /// Creates a `BitBuffer` that never holds more than `max_bytes` bytes.
    pub fn with_limit(max_bytes: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(max_bytes.min(128)),
            len_bits: 0,
            max_bytes: Some(max_bytes),
        }
    }

    /// Sets (or clears) the byte limit.
    pub fn set_limit(&mut self, max_bytes: Option<usize>) {
        self.max_bytes = max_bytes;
    }

    pub fn limit(&self) -> Option<usize> {
        self.max_bytes
    }

    /// Whether `n_bits` more bits can be written without exceeding the limit.
    pub fn has_room_for(&self, n_bits: usize) -> bool {
        match self.max_bytes {
            Some(max) => (self.len_bits + n_bits).div_ceil(8) <= max,
            None => true,
        }
    }

    /// Bytes that can still be added before hitting the limit, `None` when unlimited.
    pub fn remaining_capacity(&self) -> Option<usize> {
        self.max_bytes.map(|max| max.saturating_sub(self.bytes.len()))
    }

    #[inline]
    pub fn len_bits(&self) -> usize {
        self.len_bits
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len_bits == 0
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Drops every bit past the first `len_bits`.
    pub fn truncate(&mut self, len_bits: usize) {
        if len_bits >= self.len_bits {
            return;
        }
        self.bytes.truncate(len_bits.div_ceil(8));
        let offset = len_bits % 8;
        if offset != 0 {
            if let Some(last) = self.bytes.last_mut() {
                *last &= !(0xFFu8 >> offset);
            }
        }
        self.len_bits = len_bits;
    }

    /// Returns a cursor over the bits written so far.
    pub fn reader(&self) -> BitReader<'_> {
        BitReader::new(&self.bytes, self.len_bits)
    }

    /// Writes a single bit.
    #[inline]
    pub fn write_bit(&mut self, bit: bool) -> Result<(), BufferFull> {
        let offset = self.len_bits % 8;
        if offset == 0 {
            if self.max_bytes.is_some_and(|max| self.bytes.len() >= max) {
                return Err(BufferFull);
            }
            self.bytes.push(0);
        }
        if bit {
            if let Some(last) = self.bytes.last_mut() {
                *last |= 0x80 >> offset;
            }
        }
        self.len_bits += 1;
        Ok(())
    }

    /// Writes the lowest `n` bits of `value`, most significant first.
    ///
    /// The write is checked against the limit up front, so a failed call
    /// leaves the buffer unchanged.
    pub fn write_bits(&mut self, value: u64, n: u8) -> Result<(), BufferFull> {
        debug_assert!(n <= 64);
        if !self.has_room_for(n as usize) {
            return Err(BufferFull);
        }
        for i in (0..n).rev() {
            self.write_bit((value >> i) & 1 == 1)?;
        }
        Ok(())
    }
}

/// A forward-only cursor over a byte slice holding `total_bits` valid bits.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    bytes: &'a [u8],
    total_bits: usize,
    pos: usize,
}

impl<'a> BitReader<'a> {
    /// Creates a reader over `bytes`, of which only the first `total_bits` bits
    /// are readable. `total_bits` is clamped to the slice length.
    pub fn new(bytes: &'a [u8], total_bits: usize) -> Self {
        Self {
            bytes,
            total_bits: total_bits.min(bytes.len() * 8),
            pos: 0,
        }
    }

    /// Creates a reader over every bit of `bytes`.
    pub fn from_bytes(bytes: &'a [u8]) -> Self {
        Self::new(bytes, bytes.len() * 8)
    }

    /// Number of bits consumed so far.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.total_bits - self.pos
    }

    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.total_bits
    }

    #[inline]
    fn bit_at(&self, pos: usize) -> bool {
        (self.bytes[pos / 8] >> (7 - pos % 8)) & 1 == 1
    }

    fn ensure(&self, n: u8) -> Result<(), InsufficientBits> {
        if self.remaining() < n as usize {
            return Err(InsufficientBits {
                requested: n,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }
}

impl BitInput for BitReader<'_> {
    #[inline]
    fn read_bit(&mut self) -> Result<bool, InsufficientBits> {
        self.ensure(1)?;
        let bit = self.bit_at(self.pos);
        self.pos += 1;
        Ok(bit)
    }

    fn read_bits(&mut self, n: u8) -> Result<u64, InsufficientBits> {
        debug_assert!(n <= 64);
        self.ensure(n)?;
        let mut value = 0u64;
        for i in 0..n as usize {
            value = (value << 1) | u64::from(self.bit_at(self.pos + i));
        }
        self.pos += n as usize;
        Ok(value)
    }
}

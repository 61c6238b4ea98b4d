use crate::bitbuffer::{BitBuffer, BitReader, BufferFull};
use crate::config::BlockConfig;
use crate::decoder::Decoder;
use crate::error::{DecodeError, EncodeError};
use crate::point::DataPoint;
use crate::timestamp::{write_delta_of_delta, END_OF_STREAM};
use crate::value::ValueState;

/// Header: the 64-bit block timestamp.
const HEADER_BITS: usize = 64;
/// End-of-stream marker: `1111` followed by 32 one bits.
const END_MARKER_BITS: u8 = 36;

#[derive(Debug, Clone, Copy)]
struct Previous {
    timestamp: i64,
    delta: i64,
    value: ValueState,
}

/// Companion encoder producing blocks that [`Decoder`] reads back.
///
/// - **Timestamps**: the first is stored as an unsigned offset from the block
///   timestamp, later ones as a delta-of-delta with a variable-length prefix.
/// - **Values**: the first is stored raw, later ones XORed against the one
///   before.
///
/// # Example
/// ```
/// use gorilla_tsc::{DataPoint, Encoder};
///
/// let mut encoder = Encoder::new(1609459200);
/// encoder.encode(DataPoint::new(1609459200, 12.0)).unwrap();
/// encoder.encode(DataPoint::new(1609459260, 12.5)).unwrap();
/// encoder.encode(DataPoint::new(1609459320, 13.0)).unwrap();
/// encoder.finish().unwrap();
///
/// let compressed = encoder.into_compressed();
/// assert_eq!(compressed.count, 3);
/// ```
#[derive(Debug, Clone)]
pub struct Encoder {
    buf: BitBuffer,
    config: BlockConfig,
    block_timestamp: i64,
    count: u64,
    previous: Option<Previous>,
    finished: bool,
}

impl Encoder {
    /// Starts a block anchored at `block_timestamp`, default config, no size limit.
    pub fn new(block_timestamp: i64) -> Self {
        Self::with_config(block_timestamp, BlockConfig::default())
    }

    pub fn with_config(block_timestamp: i64, config: BlockConfig) -> Self {
        Self {
            buf: BitBuffer::with_capacity(128),
            config,
            block_timestamp,
            count: 0,
            previous: None,
            finished: false,
        }
    }

    /// Starts a block whose buffer will not grow beyond `max_bytes` bytes.
    /// Once the limit is reached, `encode()` returns `EncodeError::BufferFull`
    /// and leaves the block as it was.
    pub fn with_limit(block_timestamp: i64, max_bytes: usize) -> Self {
        let mut encoder = Self::new(block_timestamp);
        encoder.buf = BitBuffer::with_limit(max_bytes);
        encoder
    }

    /// Sets (or clears) the byte limit of the underlying buffer.
    pub fn set_limit(&mut self, max_bytes: Option<usize>) {
        self.buf.set_limit(max_bytes);
    }

    /// Appends a point.
    ///
    /// The first point must not precede the block timestamp and its offset must
    /// fit the configured first-delta width. Later points must keep the change
    /// in delta within 32 bits.
    pub fn encode(&mut self, dp: DataPoint) -> Result<(), EncodeError> {
        if self.finished {
            return Err(EncodeError::Finished);
        }

        match self.previous {
            None => self.encode_first(dp)?,
            Some(previous) => self.encode_subsequent(previous, dp)?,
        }

        self.count += 1;
        Ok(())
    }

    /// Writes the end-of-stream marker.
    ///
    /// A block with no points cannot be told apart from one cut short after its
    /// header, so finishing it fails with `EncodeError::EmptyBlock` and writes
    /// nothing; the encoder stays open.
    pub fn finish(&mut self) -> Result<(), EncodeError> {
        if self.finished {
            return Ok(());
        }
        if self.previous.is_none() {
            return Err(EncodeError::EmptyBlock);
        }
        self.buf
            .write_bits((0b1111 << 32) | END_OF_STREAM, END_MARKER_BITS)?;
        tracing::debug!(
            count = self.count,
            bits = self.buf.len_bits(),
            "finished block"
        );
        self.finished = true;
        Ok(())
    }

    pub fn buffer(&self) -> &BitBuffer {
        &self.buf
    }

    pub fn into_buffer(self) -> BitBuffer {
        self.buf
    }

    pub fn into_compressed(self) -> CompressedBlock {
        CompressedBlock {
            total_bits: self.buf.len_bits(),
            bytes: self.buf.into_bytes(),
            count: self.count,
            config: self.config,
        }
    }

    /// Number of points encoded so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn block_timestamp(&self) -> i64 {
        self.block_timestamp
    }

    fn write_header(&mut self) -> Result<(), EncodeError> {
        self.buf.write_bits(self.block_timestamp as u64, HEADER_BITS as u8)?;
        Ok(())
    }

    fn encode_first(&mut self, dp: DataPoint) -> Result<(), EncodeError> {
        if dp.timestamp < self.block_timestamp {
            return Err(EncodeError::BeforeBlockStart {
                timestamp: dp.timestamp,
                block_timestamp: self.block_timestamp,
            });
        }
        let delta = dp.timestamp.wrapping_sub(self.block_timestamp) as u64;
        let bits = self.config.first_delta_bits();
        if delta > self.config.max_first_delta() {
            return Err(EncodeError::FirstDeltaOverflow { delta, bits });
        }

        if !self.buf.has_room_for(HEADER_BITS + bits as usize + 64) {
            return Err(EncodeError::BufferFull(BufferFull));
        }
        self.write_header()?;
        self.buf.write_bits(delta, bits)?;
        let value_bits = dp.value.to_bits();
        self.buf.write_bits(value_bits, 64)?;

        self.previous = Some(Previous {
            timestamp: dp.timestamp,
            delta: delta as i64,
            value: ValueState::new(value_bits),
        });
        Ok(())
    }

    fn encode_subsequent(&mut self, mut previous: Previous, dp: DataPoint) -> Result<(), EncodeError> {
        let delta = dp.timestamp.wrapping_sub(previous.timestamp);
        let dod = delta.wrapping_sub(previous.delta);

        let mark = self.buf.len_bits();
        if !write_delta_of_delta(&mut self.buf, dod)? {
            return Err(EncodeError::DeltaOfDeltaOverflow(dod));
        }
        if let Err(full) = previous.value.write_next(&mut self.buf, dp.value.to_bits()) {
            self.buf.truncate(mark);
            return Err(full.into());
        }

        previous.timestamp = dp.timestamp;
        previous.delta = delta;
        self.previous = Some(previous);
        Ok(())
    }
}

/// A finished (or in-progress) block together with the parameters needed to
/// read it back.
#[derive(Debug, Clone)]
pub struct CompressedBlock {
    pub bytes: Vec<u8>,
    /// Number of valid bits in `bytes`.
    pub total_bits: usize,
    /// Number of points in this block.
    pub count: u64,
    pub config: BlockConfig,
}

impl CompressedBlock {
    /// Opens a streaming decoder over this block.
    pub fn decoder(&self) -> Result<Decoder<BitReader<'_>>, DecodeError> {
        Decoder::with_config(BitReader::new(&self.bytes, self.total_bits), self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_single_point() {
        let mut enc = Encoder::new(1609459200);
        enc.encode(DataPoint::new(1609459200, 42.0)).unwrap();
        enc.finish().unwrap();
        assert_eq!(enc.count(), 1);
        // header + first delta + raw value + end marker
        assert_eq!(enc.buffer().len_bits(), 64 + 14 + 64 + 36);
    }

    #[test]
    fn test_constant_series_costs_two_bits_per_point() {
        let mut enc = Encoder::new(1609459200);
        for i in 0..10 {
            enc.encode(DataPoint::new(1609459200 + i * 60, 42.0)).unwrap();
        }
        let before = enc.buffer().len_bits();
        enc.encode(DataPoint::new(1609459200 + 10 * 60, 42.0)).unwrap();
        assert_eq!(enc.buffer().len_bits() - before, 2);
    }

    #[test]
    fn test_finish_without_points_is_rejected() {
        let mut enc = Encoder::new(77);
        assert_eq!(enc.finish(), Err(EncodeError::EmptyBlock));
        assert!(enc.buffer().is_empty());

        // Still open: a point can follow and the block finishes normally.
        enc.encode(DataPoint::new(80, 1.0)).unwrap();
        enc.finish().unwrap();
        let decoded = enc.into_compressed().decoder().unwrap().collect::<Result<Vec<_>, _>>();
        assert_eq!(decoded, Ok(vec![DataPoint::new(80, 1.0)]));
    }

    #[test]
    fn test_first_point_before_block_start() {
        let mut enc = Encoder::new(1000);
        assert_eq!(
            enc.encode(DataPoint::new(999, 1.0)),
            Err(EncodeError::BeforeBlockStart {
                timestamp: 999,
                block_timestamp: 1000
            })
        );
        assert_eq!(enc.count(), 0);
    }

    #[test]
    fn test_first_delta_too_wide() {
        let mut enc = Encoder::new(0);
        assert_eq!(
            enc.encode(DataPoint::new(1 << 14, 1.0)),
            Err(EncodeError::FirstDeltaOverflow {
                delta: 1 << 14,
                bits: 14
            })
        );
        enc.encode(DataPoint::new((1 << 14) - 1, 1.0)).unwrap();
    }

    #[test]
    fn test_delta_of_delta_overflow() {
        let mut enc = Encoder::new(0);
        enc.encode(DataPoint::new(0, 1.0)).unwrap();
        let before = enc.buffer().len_bits();
        let err = enc.encode(DataPoint::new(1 << 40, 1.0)).unwrap_err();
        assert_eq!(err, EncodeError::DeltaOfDeltaOverflow(1 << 40));
        assert_eq!(enc.buffer().len_bits(), before);
        assert_eq!(enc.count(), 1);
    }

    #[test]
    fn test_encode_after_finish() {
        let mut enc = Encoder::new(0);
        enc.encode(DataPoint::new(0, 1.0)).unwrap();
        enc.finish().unwrap();
        assert_eq!(enc.encode(DataPoint::new(1, 1.0)), Err(EncodeError::Finished));
        // finishing twice is a no-op
        let len = enc.buffer().len_bits();
        enc.finish().unwrap();
        assert_eq!(enc.buffer().len_bits(), len);
    }

    #[test]
    fn test_limit_exceeded_leaves_block_intact() {
        // header + delta + value = 142 bits = 18 bytes
        let mut enc = Encoder::with_limit(0, 18);
        enc.encode(DataPoint::new(0, 1.0)).unwrap();
        let before = enc.buffer().len_bits();
        let err = enc.encode(DataPoint::new(60, 1.0e10)).unwrap_err();
        assert!(matches!(err, EncodeError::BufferFull(_)));
        assert_eq!(enc.buffer().len_bits(), before);
        assert_eq!(enc.count(), 1);
    }

    #[test]
    fn test_limit_too_small_for_first_point() {
        let mut enc = Encoder::with_limit(0, 17);
        assert!(enc.encode(DataPoint::new(0, 1.0)).is_err());
        assert!(enc.buffer().is_empty());
    }
}

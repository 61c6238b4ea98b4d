use tracing::instrument;

use crate::bitbuffer::{BitInput, BitReader};
use crate::config::BlockConfig;
use crate::encoder::CompressedBlock;
use crate::error::DecodeError;
use crate::point::DataPoint;
use crate::timestamp::{read_delta_of_delta, Dod};
use crate::value::{ValueState, XorWindow};

#[derive(Debug)]
enum State {
    /// Header read, no pair decoded yet.
    AwaitingFirst,
    Streaming {
        timestamp: i64,
        delta: i64,
        value: ValueState,
    },
    /// End-of-stream marker seen.
    Finished,
    /// A read failed; the bit position is no longer trustworthy.
    Failed,
}

/// Streaming decoder for one Gorilla block.
///
/// The block header is read on construction. After that every
/// [`read_pair`](Self::read_pair) call yields the next point until the
/// end-of-stream marker is reached.
///
/// # Example
/// ```
/// use gorilla_tsc::{DataPoint, Decoder, Encoder};
///
/// let mut encoder = Encoder::new(1_700_000_000);
/// encoder.encode(DataPoint::new(1_700_000_060, 12.0)).unwrap();
/// encoder.encode(DataPoint::new(1_700_000_120, 12.5)).unwrap();
/// encoder.finish().unwrap();
/// let block = encoder.into_compressed();
///
/// let mut decoder = block.decoder().unwrap();
/// assert_eq!(decoder.block_timestamp(), 1_700_000_000);
/// assert_eq!(decoder.read_pair().unwrap(), Some(DataPoint::new(1_700_000_060, 12.0)));
/// assert_eq!(decoder.read_pair().unwrap(), Some(DataPoint::new(1_700_000_120, 12.5)));
/// assert_eq!(decoder.read_pair().unwrap(), None);
/// ```
#[derive(Debug)]
pub struct Decoder<R> {
    input: R,
    config: BlockConfig,
    block_timestamp: i64,
    state: State,
}

impl<R: BitInput> Decoder<R> {
    /// Reads the block header using the default [`BlockConfig`].
    pub fn new(input: R) -> Result<Self, DecodeError> {
        Self::with_config(input, BlockConfig::default())
    }

    /// Reads the block header. `config` must match the encoder's.
    #[instrument(level = "debug", skip(input), err)]
    pub fn with_config(mut input: R, config: BlockConfig) -> Result<Self, DecodeError> {
        // The header is an unsigned word; timestamps are carried as i64.
        let block_timestamp = input.read_bits(64)? as i64;
        tracing::debug!(block_timestamp, "read block header");
        Ok(Self {
            input,
            config,
            block_timestamp,
            state: State::AwaitingFirst,
        })
    }

    pub fn block_timestamp(&self) -> i64 {
        self.block_timestamp
    }

    pub fn config(&self) -> &BlockConfig {
        &self.config
    }

    /// `true` once the end-of-stream marker has been read.
    pub fn is_finished(&self) -> bool {
        matches!(self.state, State::Finished)
    }

    /// The XOR window carried into the next value, if one has been signalled.
    pub fn xor_window(&self) -> Option<XorWindow> {
        match &self.state {
            State::Streaming { value, .. } => value.window,
            _ => None,
        }
    }

    /// Gives back the bit input, positioned after the last bit consumed.
    pub fn into_inner(self) -> R {
        self.input
    }

    /// Decodes the next point.
    ///
    /// Returns `Ok(None)` at the end of the block. Any error is final: the
    /// decoder returns [`DecodeError::Poisoned`] from then on.
    pub fn read_pair(&mut self) -> Result<Option<DataPoint>, DecodeError> {
        let state = std::mem::replace(&mut self.state, State::Failed);
        let (next, point) = match state {
            State::AwaitingFirst => {
                let (point, state) = self.read_first()?;
                (state, Some(point))
            }
            State::Streaming {
                timestamp,
                delta,
                value,
            } => self.read_next(timestamp, delta, value)?,
            State::Finished => (State::Finished, None),
            State::Failed => return Err(DecodeError::Poisoned),
        };
        self.state = next;
        Ok(point)
    }

    fn read_first(&mut self) -> Result<(DataPoint, State), DecodeError> {
        let delta = self.input.read_bits(self.config.first_delta_bits())? as i64;
        let bits = self.input.read_bits(64)?;

        let timestamp = self.block_timestamp.wrapping_add(delta);
        tracing::trace!(timestamp, delta, "decoded first pair");
        let point = DataPoint::new(timestamp, f64::from_bits(bits));
        let state = State::Streaming {
            timestamp,
            delta,
            value: ValueState::new(bits),
        };
        Ok((point, state))
    }

    fn read_next(
        &mut self,
        timestamp: i64,
        delta: i64,
        mut value: ValueState,
    ) -> Result<(State, Option<DataPoint>), DecodeError> {
        let dod = match read_delta_of_delta(&mut self.input)? {
            Dod::Value(dod) => dod,
            Dod::EndOfStream => {
                tracing::trace!(last_timestamp = timestamp, "end of stream");
                return Ok((State::Finished, None));
            }
        };
        let delta = delta.wrapping_add(dod);
        let timestamp = timestamp.wrapping_add(delta);
        let bits = value.read_next(&mut self.input)?;

        let point = DataPoint::new(timestamp, f64::from_bits(bits));
        Ok((
            State::Streaming {
                timestamp,
                delta,
                value,
            },
            Some(point),
        ))
    }
}

impl<R: BitInput> Iterator for Decoder<R> {
    type Item = Result<DataPoint, DecodeError>;

    /// Yields each point, or a single error after which iteration stops.
    fn next(&mut self) -> Option<Self::Item> {
        if matches!(self.state, State::Failed) {
            return None;
        }
        self.read_pair().transpose()
    }
}

/// Decodes every point of a block produced by [`Encoder`](crate::Encoder).
pub fn decode(block: &CompressedBlock) -> Result<Vec<DataPoint>, DecodeError> {
    decode_raw(&block.bytes, block.total_bits, block.config)
}

/// Decodes every point from raw bytes holding `total_bits` valid bits.
pub fn decode_raw(
    bytes: &[u8],
    total_bits: usize,
    config: BlockConfig,
) -> Result<Vec<DataPoint>, DecodeError> {
    Decoder::with_config(BitReader::new(bytes, total_bits), config)?.collect()
}

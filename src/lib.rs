//! # gorilla-tsc
//!
//! A streaming decoder for time-series blocks compressed with the scheme from
//! Facebook's *"Gorilla: A Fast, Scalable, In-Memory Time Series Database"*
//! (VLDB 2015), plus the companion encoder that produces them.
//!
//! ## Block layout
//!
//! Bits are read most-significant first.
//!
//! | field | bits |
//! |-------|------|
//! | block timestamp | 64, unsigned |
//! | first delta from the block timestamp | `W`, unsigned ([`BlockConfig`], default 14) |
//! | first value | 64, raw IEEE-754 bits |
//! | each later point | delta-of-delta code, then XOR value code |
//! | end of stream | `1111` + 32 one bits |
//!
//! - **Timestamps** arriving at regular intervals have a delta-of-delta of
//!   zero, which costs a single bit. Larger deviations escalate through 7, 9,
//!   12 and 32 bit payloads.
//! - **Values** are XORed with the previous value's bits. An unchanged value
//!   costs one bit; otherwise only the bits between the XOR's leading and
//!   trailing zero runs are stored, and the run lengths are re-sent only when
//!   they no longer fit.
//!
//! ## Example
//!
//! ```rust
//! use gorilla_tsc::{decode, DataPoint, Encoder};
//!
//! let mut encoder = Encoder::new(1_700_000_000);
//! encoder.encode(DataPoint::new(1_700_000_060, 12.0)).unwrap();
//! encoder.encode(DataPoint::new(1_700_000_120, 12.5)).unwrap();
//! encoder.encode(DataPoint::new(1_700_000_180, 13.0)).unwrap();
//! encoder.finish().unwrap();
//!
//! let compressed = encoder.into_compressed();
//! println!("Compressed {} points into {} bytes", compressed.count, compressed.bytes.len());
//!
//! let points = decode(&compressed).unwrap();
//! assert_eq!(points.len(), 3);
//! assert_eq!(points[0], DataPoint::new(1_700_000_060, 12.0));
//! ```
//!
//! ## Streaming
//!
//! [`Decoder`] works over any [`BitInput`] and yields one point per call, so a
//! block never has to be decoded in full:
//!
//! ```rust
//! # use gorilla_tsc::{DataPoint, Decoder, BitReader, Encoder};
//! # let mut encoder = Encoder::new(0);
//! # encoder.encode(DataPoint::new(60, 12.0)).unwrap();
//! # encoder.encode(DataPoint::new(120, 12.5)).unwrap();
//! # encoder.finish().unwrap();
//! # let block = encoder.into_compressed();
//! let reader = BitReader::new(&block.bytes, block.total_bits);
//! for result in Decoder::new(reader).unwrap() {
//!     let dp = result.unwrap();
//!     println!("{}: {}", dp.timestamp, dp.value);
//! }
//! ```

pub mod bitbuffer;
pub mod config;
pub mod decoder;
pub mod encoder;
pub mod error;
mod point;
mod timestamp;
pub mod value;

pub use bitbuffer::{BitBuffer, BitInput, BitReader, BufferFull, InsufficientBits};
pub use config::{BlockConfig, DEFAULT_FIRST_DELTA_BITS};
pub use decoder::{decode, decode_raw, Decoder};
pub use encoder::{CompressedBlock, Encoder};
pub use error::{ConfigError, DecodeError, EncodeError};
pub use point::DataPoint;
pub use value::XorWindow;

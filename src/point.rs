/// A single time-series observation.
///
/// `timestamp` is in whatever fixed unit the encoder used (usually seconds).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataPoint {
    pub timestamp: i64,
    pub value: f64,
}

impl DataPoint {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }

    /// Compares timestamps exactly and values by raw bit pattern, so `NaN`
    /// payloads and signed zeros count.
    pub fn bit_eq(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp && self.value.to_bits() == other.value.to_bits()
    }
}

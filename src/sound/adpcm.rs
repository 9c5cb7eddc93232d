//! Predictive delta sound chunks
//!
//! The first sound chunk of a stream starts with a table of 256 signed
//! deltas. Every following byte pair indexes that table once per channel:
//!
//! ```text
//! [512 bytes] 256 x i16 LE delta table (first chunk only)
//! [N bytes]   (left index, right index) pairs
//! ```
//!
//! Each index adds its delta to the channel's running predictor, and the
//! predictor value is the output sample. Predictors persist across chunks.

use super::decoder::{DecodeError, DecodeResult, SoundDecoder};
use super::formats::AudioFormat;

/// Entries in the delta table
pub const DELTA_TABLE_LEN: usize = 256;

/// Size of the delta table at the start of the first chunk
pub const DELTA_TABLE_BYTES: usize = DELTA_TABLE_LEN * 2;

/// Largest predictor magnitude a valid stream produces
pub const PREDICTOR_LIMIT: i32 = 0x5C00;

/// Per-stream table of predictor deltas
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaTable([i16; DELTA_TABLE_LEN]);

impl DeltaTable {
    /// Parses the table from the start of a chunk
    pub fn from_le_bytes(data: &[u8]) -> DecodeResult<Self> {
        if data.len() < DELTA_TABLE_BYTES {
            return Err(DecodeError::InvalidData(format!(
                "delta table needs {} bytes, chunk has {}",
                DELTA_TABLE_BYTES,
                data.len()
            )));
        }
        let mut table = [0i16; DELTA_TABLE_LEN];
        for (entry, bytes) in table.iter_mut().zip(data.chunks_exact(2)) {
            *entry = i16::from_le_bytes([bytes[0], bytes[1]]);
        }
        Ok(Self(table))
    }

    #[inline]
    pub fn delta(&self, index: u8) -> i32 {
        self.0[index as usize] as i32
    }
}

/// Stereo predictive decoder
#[derive(Debug, Clone, Default)]
pub struct AdpcmDecoder {
    table: Option<DeltaTable>,
    predictors: [i32; 2],
}

impl AdpcmDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current left and right predictor values
    pub fn predictors(&self) -> [i32; 2] {
        self.predictors
    }

    pub fn has_table(&self) -> bool {
        self.table.is_some()
    }
}

impl SoundDecoder for AdpcmDecoder {
    fn name(&self) -> &'static str {
        "ADPCM"
    }

    fn format(&self) -> AudioFormat {
        AudioFormat::Stereo16
    }

    fn decode_chunk(&mut self, payload: &[u8]) -> DecodeResult<Vec<u8>> {
        let (table, data) = match self.table.take() {
            Some(table) => (table, payload),
            None => (
                DeltaTable::from_le_bytes(payload)?,
                &payload[DELTA_TABLE_BYTES..],
            ),
        };
        let table = self.table.insert(table);

        let pairs = data.chunks_exact(2);
        let mut out = Vec::with_capacity(pairs.len() * 4);
        let mut predictors = self.predictors;

        for pair in pairs {
            for (channel, &index) in pair.iter().enumerate() {
                let value = predictors[channel] + table.delta(index);
                if value.abs() > PREDICTOR_LIMIT {
                    self.predictors = predictors;
                    return Err(DecodeError::PredictorOverflow { channel, value });
                }
                predictors[channel] = value;
                out.extend_from_slice(&(value as i16).to_le_bytes());
            }
        }

        self.predictors = predictors;
        Ok(out)
    }

    fn reset(&mut self) {
        self.table = None;
        self.predictors = [0, 0];
    }
}

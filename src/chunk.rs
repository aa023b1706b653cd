//! Interleaved PCM block with metadata.

use std::sync::Arc;
use std::time::Duration;

use crate::ByteOrder;

/// One drained block of interleaved signed 16-bit PCM.
///
/// `PcmBlock` is the unit handed to sinks. The bytes are already in the
/// session's output byte order, ready to be written as-is.
///
/// Data is stored in an `Arc<Vec<u8>>` so blocks can be cloned cheaply
/// when fanned out.
///
/// # Example
///
/// ```
/// use stream_pcm::{ByteOrder, PcmBlock};
///
/// let data: Vec<u8> = [1i16, -1].iter().flat_map(|s| s.to_ne_bytes()).collect();
/// let block = PcmBlock::new(data, 2, 1, 0, ByteOrder::Native);
/// assert_eq!(block.samples(), vec![1, -1]);
/// ```
#[derive(Debug, Clone)]
pub struct PcmBlock {
    /// Encoded interleaved samples.
    pub data: Arc<Vec<u8>>,

    /// Number of interleaved channels.
    pub channels: u16,

    /// Number of frames (samples per channel).
    pub frames: usize,

    /// Zero-based index of this block within the session.
    pub sequence: u64,

    /// Byte order of `data`.
    pub byte_order: ByteOrder,
}

impl PcmBlock {
    /// Creates a new block from encoded bytes.
    pub fn new(
        data: Vec<u8>,
        channels: u16,
        frames: usize,
        sequence: u64,
        byte_order: ByteOrder,
    ) -> Self {
        Self {
            data: Arc::new(data),
            channels,
            frames,
            sequence,
            byte_order,
        }
    }

    /// Returns the encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Number of encoded bytes.
    pub fn len_bytes(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the block carries no samples.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of frames in this block.
    pub fn frame_count(&self) -> usize {
        self.frames
    }

    /// Decodes the block back into interleaved `i16` values.
    pub fn samples(&self) -> Vec<i16> {
        self.data
            .chunks_exact(2)
            .map(|pair| {
                let value = i16::from_ne_bytes([pair[0], pair[1]]);
                if self.byte_order.is_swapped() {
                    value.swap_bytes()
                } else {
                    value
                }
            })
            .collect()
    }

    /// Playback duration of this block at the given sample rate.
    pub fn duration(&self, sample_rate: u32) -> Duration {
        if sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames as f64 / f64::from(sample_rate))
    }
}

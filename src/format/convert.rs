//! Sample format conversion and channel interleaving.

use crate::{ByteOrder, StreamPcmError};

/// Scale between normalized float samples and 16-bit integers.
const I16_SCALE: f32 = 32768.0;

/// Converts an f32 sample to i16.
///
/// The sample is scaled by 32768 and truncated toward zero. No clamping is
/// applied: results outside the 16-bit range wrap, so `1.0` becomes
/// `-32768`. NaN converts to 0.
#[inline]
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample * I16_SCALE) as i32 as i16
}

/// Converts an i16 sample to f32 in [-1.0, 1.0).
#[inline]
pub fn i16_to_f32(sample: i16) -> f32 {
    f32::from(sample) / I16_SCALE
}

/// Converts per-channel blocks into one frame-major interleaved buffer.
///
/// `out` is cleared first. Every block must hold the same number of
/// samples as the first one.
pub fn interleave<B: AsRef<[f32]>>(
    blocks: &[B],
    out: &mut Vec<i16>,
) -> Result<(), StreamPcmError> {
    out.clear();
    let Some(first) = blocks.first() else {
        return Ok(());
    };
    let frames = first.as_ref().len();

    for (channel, block) in blocks.iter().enumerate() {
        let actual = block.as_ref().len();
        if actual != frames {
            return Err(StreamPcmError::BlockLengthMismatch {
                channel,
                expected: frames,
                actual,
            });
        }
    }

    out.reserve(frames * blocks.len());
    for frame in 0..frames {
        out.extend(blocks.iter().map(|block| f32_to_i16(block.as_ref()[frame])));
    }
    Ok(())
}

/// Swaps the two bytes of every 16-bit value in place.
///
/// Applying it twice restores the original buffer.
pub fn swap_bytes(buf: &mut [u8]) -> Result<(), StreamPcmError> {
    if buf.len() % 2 != 0 {
        return Err(StreamPcmError::OddByteCount { len: buf.len() });
    }
    for pair in buf.chunks_exact_mut(2) {
        pair.swap(0, 1);
    }
    Ok(())
}

/// Stateless converter from channel blocks to encoded interleaved PCM.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleConverter {
    byte_order: ByteOrder,
}

impl SampleConverter {
    /// Creates a converter producing the given byte order.
    pub fn new(byte_order: ByteOrder) -> Self {
        Self { byte_order }
    }

    /// Byte order of the encoded output.
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Converts and interleaves `blocks`, returning encoded bytes.
    pub fn convert<B: AsRef<[f32]>>(&self, blocks: &[B]) -> Result<Vec<u8>, StreamPcmError> {
        let mut samples = Vec::new();
        interleave(blocks, &mut samples)?;
        self.encode(&samples)
    }

    /// Encodes interleaved samples in host order, swapping if configured.
    pub fn encode(&self, samples: &[i16]) -> Result<Vec<u8>, StreamPcmError> {
        let mut bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_ne_bytes()).collect();
        if self.byte_order.is_swapped() {
            swap_bytes(&mut bytes)?;
        }
        Ok(bytes)
    }
}

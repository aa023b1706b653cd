//! Per-channel ring buffers between the realtime thread and the drain loop.

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::HeapRb;

use crate::StreamPcmError;

/// Size of one raw sample in bytes.
pub const SAMPLE_BYTES: usize = std::mem::size_of::<f32>();

/// Consumer side of a channel buffer, as seen by the drain loop.
///
/// Implemented by [`ChannelConsumer`]; tests substitute readers that
/// misbehave.
pub trait ChannelReader: Send {
    /// Bytes available to read right now.
    fn read_space(&self) -> usize;

    /// Moves up to `out.len()` samples into `out`, returning how many were
    /// moved. Never blocks.
    fn read(&mut self, out: &mut [f32]) -> usize;
}

/// Producer half of a channel buffer. Owned by the realtime callback.
pub struct ChannelProducer {
    inner: ringbuf::HeapProd<f32>,
}

impl ChannelProducer {
    /// Free space in bytes.
    pub fn write_space(&self) -> usize {
        self.inner.vacant_len() * SAMPLE_BYTES
    }

    /// Bytes written but not yet drained.
    pub fn buffered(&self) -> usize {
        self.inner.occupied_len() * SAMPLE_BYTES
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.inner.capacity().get() * SAMPLE_BYTES
    }

    /// Appends all of `samples`, or nothing.
    ///
    /// Returns `false` without writing if the free space is smaller than
    /// the request. Never blocks and never allocates.
    pub fn write(&mut self, samples: &[f32]) -> bool {
        if self.inner.vacant_len() < samples.len() {
            return false;
        }
        self.inner.push_slice(samples) == samples.len()
    }
}

/// Consumer half of a channel buffer. Owned by the drain loop.
pub struct ChannelConsumer {
    inner: ringbuf::HeapCons<f32>,
}

impl std::fmt::Debug for ChannelProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelProducer").finish_non_exhaustive()
    }
}

impl std::fmt::Debug for ChannelConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelConsumer").finish_non_exhaustive()
    }
}

impl ChannelReader for ChannelConsumer {
    fn read_space(&self) -> usize {
        self.inner.occupied_len() * SAMPLE_BYTES
    }

    fn read(&mut self, out: &mut [f32]) -> usize {
        self.inner.pop_slice(out)
    }
}

/// Creates a channel buffer holding `capacity_bytes` of raw samples.
///
/// The capacity is rounded down to whole samples and never changes.
/// Returns the producer (for the realtime callback) and the consumer (for
/// the drain loop), or [`StreamPcmError::BufferAllocation`] if the memory
/// cannot be reserved.
pub fn channel_buffer(
    capacity_bytes: usize,
) -> Result<(ChannelProducer, ChannelConsumer), StreamPcmError> {
    let samples = (capacity_bytes / SAMPLE_BYTES).max(1);
    let rb = HeapRb::<f32>::try_new(samples).map_err(|_| StreamPcmError::BufferAllocation {
        bytes: capacity_bytes,
    })?;
    let (producer, consumer) = rb.split();
    Ok((
        ChannelProducer { inner: producer },
        ChannelConsumer { inner: consumer },
    ))
}

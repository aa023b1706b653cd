//! Capture producer - runs inside the audio server's realtime callback.
//!
//! The producer copies each cycle's per-port samples into the channel
//! buffers. It runs under the server's deadline, so it:
//! - never blocks, locks or sleeps
//! - never allocates
//! - never logs or performs I/O
//!
//! Faults are returned as [`CaptureFault`] values and published by the
//! backend through the [`LifecycleController`].

use std::sync::Arc;

use crate::lifecycle::LifecycleController;
use crate::pipeline::ring_buffer::{ChannelProducer, SAMPLE_BYTES};
use crate::CaptureFault;

/// Writes realtime input into the per-channel buffers.
pub struct CaptureProducer {
    channels: Vec<ChannelProducer>,
    controller: Arc<LifecycleController>,
}

impl CaptureProducer {
    /// Creates a producer over the given channel buffers, in port order.
    pub fn new(channels: Vec<ChannelProducer>, controller: Arc<LifecycleController>) -> Self {
        Self {
            channels,
            controller,
        }
    }

    /// Number of channels this producer feeds.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// The controller gating this producer.
    pub fn controller(&self) -> &Arc<LifecycleController> {
        &self.controller
    }

    /// Returns `true` when every channel buffer has been drained empty.
    pub fn is_drained(&self) -> bool {
        self.channels.iter().all(|channel| channel.buffered() == 0)
    }

    /// Handles one processing cycle of `frames` frames.
    ///
    /// `input` maps a channel index to the server's buffer for that port.
    /// Until the controller is ready this is a no-op. Free space and input
    /// length of every channel are checked before any channel is written,
    /// so a cycle is either written to all channels or to none.
    pub fn on_audio_ready<'a, F>(
        &mut self,
        frames: usize,
        mut input: F,
    ) -> Result<(), CaptureFault>
    where
        F: FnMut(usize) -> &'a [f32],
    {
        if !self.controller.is_ready() {
            return Ok(());
        }

        let needed = frames * SAMPLE_BYTES;
        for (channel, buffer) in self.channels.iter().enumerate() {
            let free = buffer.write_space();
            if free < needed {
                return Err(CaptureFault::Overrun {
                    channel,
                    free,
                    needed,
                });
            }
            let available = input(channel).len();
            if available < frames {
                return Err(CaptureFault::ShortInput {
                    channel,
                    available,
                    frames,
                });
            }
        }

        for (channel, buffer) in self.channels.iter_mut().enumerate() {
            let samples = input(channel);
            let Some(samples) = samples.get(..frames) else {
                return Err(CaptureFault::ShortInput {
                    channel,
                    available: samples.len(),
                    frames,
                });
            };
            if !buffer.write(samples) {
                return Err(CaptureFault::Overrun {
                    channel,
                    free: buffer.write_space(),
                    needed,
                });
            }
        }

        Ok(())
    }
}

//! Audio pipeline components.
//!
//! The pipeline moves samples from the audio server to the sink:
//!
//! ```text
//! Server RT Thread → Capture Producer → Channel Buffers → Drain Loop → Sink
//! ```
//!
//! - **Channel Buffers**: one lock-free SPSC queue per channel
//! - **Capture Producer**: copies each cycle into the buffers, never blocks
//! - **Drain Loop**: waits for whole blocks, interleaves, writes to the sink
//!
//! Every cycle writes the same number of frames to every channel, so the
//! buffers stay frame-aligned and the drain loop never needs to resync.

mod capture;
mod drain;
mod ring_buffer;

pub use capture::CaptureProducer;
pub use drain::{DrainLoop, SessionStats};
pub use ring_buffer::{
    channel_buffer, ChannelConsumer, ChannelProducer, ChannelReader, SAMPLE_BYTES,
};

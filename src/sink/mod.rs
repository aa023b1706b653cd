//! Output destinations for the converted stream.
//!
//! - [`WriterSink`]: raw bytes to any `AsyncWrite` (stdout by default,
//!   or a file or socket)
//! - [`ChannelSink`]: framed blocks to an in-process receiver

mod channel;
mod writer;

pub use channel::ChannelSink;
pub use writer::WriterSink;

use crate::{PcmBlock, SinkError};
use async_trait::async_trait;

/// Where the interleaved stream goes.
///
/// The drain loop calls `write` once per block, in sequence order, and
/// never concurrently. A sink either takes the whole block or fails; there
/// is no partial success and no retry.
///
/// - `on_start` runs before any port is connected, so failing there
///   leaves the audio graph untouched
/// - `on_stop` runs only when the server shut the session down; after a
///   fatal error the sink is simply dropped
///
/// # Example
///
/// ```
/// use stream_pcm::{PcmBlock, Sink, SinkError};
/// use async_trait::async_trait;
///
/// struct FrameCounter;
///
/// #[async_trait]
/// impl Sink for FrameCounter {
///     fn name(&self) -> &str {
///         "frame-counter"
///     }
///
///     async fn write(&self, block: &PcmBlock) -> Result<(), SinkError> {
///         eprintln!("block {}: {} frames", block.sequence, block.frames);
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Sink: Send + Sync {
    /// Name used in logs and in [`StreamPcmError::SinkWrite`](crate::StreamPcmError::SinkWrite).
    fn name(&self) -> &str;

    /// Prepares the destination. Does nothing by default.
    async fn on_start(&self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Consumes one block in full.
    async fn write(&self, block: &PcmBlock) -> Result<(), SinkError>;

    /// Flushes and releases the destination. Does nothing by default.
    async fn on_stop(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

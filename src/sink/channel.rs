//! In-process sink handing whole blocks to a tokio mpsc receiver.

use crate::sink::Sink;
use crate::{PcmBlock, SinkError};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Forwards every [`PcmBlock`] to a bounded mpsc channel.
///
/// For consumers living in the same process (encoders, meters) that want
/// framed blocks with their sequence numbers instead of a raw byte pipe.
/// When the channel is full the drain loop waits for room, which counts
/// against the producer's buffer headroom like any slow sink.
///
/// # Example
///
/// ```
/// use stream_pcm::ChannelSink;
///
/// let (sink, mut blocks) = ChannelSink::pair(32);
/// ```
pub struct ChannelSink {
    name: String,
    tx: mpsc::Sender<PcmBlock>,
}

impl ChannelSink {
    /// Wraps an existing sender.
    pub fn new(tx: mpsc::Sender<PcmBlock>) -> Self {
        Self {
            name: "channel".to_string(),
            tx,
        }
    }

    /// Creates a sink and the receiver for its blocks, holding at most
    /// `capacity` blocks in flight.
    pub fn pair(capacity: usize) -> (Self, mpsc::Receiver<PcmBlock>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    /// Renames the sink for log and error messages.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns `true` once the receiver has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[async_trait]
impl Sink for ChannelSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&self, block: &PcmBlock) -> Result<(), SinkError> {
        if self.tx.send(block.clone()).await.is_err() {
            tracing::debug!(
                "ChannelSink {}: receiver gone at block #{}",
                self.name,
                block.sequence
            );
            return Err(SinkError::ChannelClosed);
        }
        Ok(())
    }
}

//! Drain loop - reads blocks from the channel buffers, converts, writes.
//!
//! The drain loop is the consumer side of the pipeline and runs on the
//! main thread:
//! 1. Waits, by polling with a fixed sleep, until each channel holds a block
//! 2. Drains exactly one block from every channel
//! 3. Interleaves and encodes the blocks
//! 4. Writes the result to the sink
//!
//! The producer never waits for the drain loop. If the drain loop falls
//! behind far enough, the producer faults and the fault surfaces here.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use crate::format::SampleConverter;
use crate::lifecycle::LifecycleController;
use crate::pipeline::ring_buffer::{ChannelReader, SAMPLE_BYTES};
use crate::sink::Sink;
use crate::{PcmBlock, StreamConfig, StreamPcmError, MAX_CHANNELS};

/// Blocks between progress log lines.
const PROGRESS_LOG_INTERVAL: u64 = 1000;

/// Totals written to the sink during a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Blocks handed to the sink.
    pub blocks_written: u64,
    /// Frames handed to the sink, summed over blocks.
    pub frames_written: u64,
    /// Bytes handed to the sink.
    pub bytes_written: u64,
}

/// Consumer loop draining every channel buffer into the sink.
pub struct DrainLoop<R> {
    readers: Vec<R>,
    blocks: Vec<Vec<f32>>,
    converter: SampleConverter,
    sink: Arc<dyn Sink>,
    controller: Arc<LifecycleController>,
    block_frames: usize,
    poll_interval: Duration,
    stats: SessionStats,
}

impl<R: ChannelReader> DrainLoop<R> {
    /// Creates a drain loop over `readers`, one per channel in port order.
    pub fn new(
        readers: Vec<R>,
        config: &StreamConfig,
        sink: Arc<dyn Sink>,
        controller: Arc<LifecycleController>,
    ) -> Self {
        let blocks = readers
            .iter()
            .map(|_| vec![0.0f32; config.block_frames])
            .collect();

        Self {
            readers,
            blocks,
            converter: SampleConverter::new(config.byte_order),
            sink,
            controller,
            block_frames: config.block_frames,
            poll_interval: config.poll_interval,
            stats: SessionStats::default(),
        }
    }

    /// Counters for everything written so far.
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Drains blocks until a fatal condition occurs.
    ///
    /// Never returns `Ok`; the session ends it by dropping the future on
    /// shutdown.
    pub async fn run(&mut self) -> Result<Infallible, StreamPcmError> {
        loop {
            self.drain_block().await?;
        }
    }

    /// Drains exactly `count` blocks.
    pub async fn drain_blocks(&mut self, count: u64) -> Result<(), StreamPcmError> {
        for _ in 0..count {
            self.drain_block().await?;
        }
        Ok(())
    }

    /// Waits for, drains, converts and writes one block.
    pub async fn drain_block(&mut self) -> Result<(), StreamPcmError> {
        self.check_fault()?;

        let expected = self.block_frames * SAMPLE_BYTES;
        for channel in 0..self.readers.len() {
            self.wait_for_block(channel).await?;

            let read = self.readers[channel].read(&mut self.blocks[channel]) * SAMPLE_BYTES;
            if read != expected {
                return Err(StreamPcmError::ShortRead {
                    channel,
                    read,
                    expected,
                });
            }
        }

        let channels =
            u16::try_from(self.readers.len()).map_err(|_| StreamPcmError::TooManyPorts {
                count: self.readers.len(),
                max: MAX_CHANNELS,
            })?;
        let data = self.converter.convert(&self.blocks)?;
        let block = PcmBlock::new(
            data,
            channels,
            self.block_frames,
            self.stats.blocks_written,
            self.converter.byte_order(),
        );

        self.sink
            .write(&block)
            .await
            .map_err(|source| StreamPcmError::SinkWrite {
                sink_name: self.sink.name().to_string(),
                source,
            })?;

        self.record(&block);
        Ok(())
    }

    /// Polls `channel` until a whole block is available.
    async fn wait_for_block(&self, channel: usize) -> Result<(), StreamPcmError> {
        let needed = self.block_frames * SAMPLE_BYTES;
        while self.readers[channel].read_space() < needed {
            self.check_fault()?;
            tokio::time::sleep(self.poll_interval).await;
        }
        Ok(())
    }

    fn check_fault(&self) -> Result<(), StreamPcmError> {
        match self.controller.fault() {
            Some(fault) => Err(fault.into()),
            None => Ok(()),
        }
    }

    fn record(&mut self, block: &PcmBlock) {
        self.stats.blocks_written += 1;
        self.stats.frames_written += block.frames as u64;
        self.stats.bytes_written += block.len_bytes() as u64;

        if self.stats.blocks_written % PROGRESS_LOG_INTERVAL == 0 {
            tracing::debug!(
                "DrainLoop: wrote block #{}, {} frames total",
                self.stats.blocks_written,
                self.stats.frames_written
            );
        }
    }
}

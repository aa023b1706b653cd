//! Integration tests for stream-pcm.
//!
//! These drive whole sessions through the mock server. Tests that need a
//! running JACK server live next to the JACK backend and are `#[ignore]`d.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use stream_pcm::format::f32_to_i16;
use stream_pcm::source::test_signal;
use stream_pcm::{
    ByteOrder, LifecycleController, LifecycleState, MockServer, PcmBlock, Sink, SinkError,
    StreamConfig, StreamPcm, StreamPcmError,
};

const SESSION_TIMEOUT: Duration = Duration::from_secs(30);

/// A test sink that keeps every byte it is given.
///
/// Writes complete without yielding, so a block read by the drain loop is
/// always recorded before a shutdown can be observed.
struct CollectingSink {
    bytes: Mutex<Vec<u8>>,
    blocks: AtomicU64,
}

impl CollectingSink {
    fn new() -> Self {
        Self {
            bytes: Mutex::new(Vec::new()),
            blocks: AtomicU64::new(0),
        }
    }

    fn bytes(&self) -> Vec<u8> {
        self.bytes.lock().unwrap().clone()
    }

    fn samples(&self) -> Vec<i16> {
        self.bytes()
            .chunks_exact(2)
            .map(|pair| i16::from_ne_bytes([pair[0], pair[1]]))
            .collect()
    }
}

#[async_trait]
impl Sink for CollectingSink {
    fn name(&self) -> &str {
        "collecting"
    }

    async fn write(&self, block: &PcmBlock) -> Result<(), SinkError> {
        self.bytes.lock().unwrap().extend_from_slice(block.as_bytes());
        self.blocks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A sink that takes far longer per block than the server's cycle.
struct SlowSink;

#[async_trait]
impl Sink for SlowSink {
    fn name(&self) -> &str {
        "slow"
    }

    async fn write(&self, _block: &PcmBlock) -> Result<(), SinkError> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(())
    }
}

fn config(channels: usize) -> StreamConfig {
    StreamConfig {
        client_name: Some("stream-pcm-test".to_string()),
        source_ports: (1..=channels)
            .map(|i| format!("system:capture_{i}"))
            .collect(),
        verbose: false,
        ..Default::default()
    }
}

fn expected_samples(channels: usize, frames: u64) -> Vec<i16> {
    (0..frames)
        .flat_map(|frame| (0..channels).map(move |ch| f32_to_i16(test_signal(ch, frame))))
        .collect()
}

#[tokio::test]
async fn test_thousand_cycles_stereo_end_to_end() {
    let sink = Arc::new(CollectingSink::new());
    let server = MockServer::new()
        .cycles(1000)
        .frames_per_cycle(128)
        .shutdown_when_drained(true);

    let stats = tokio::time::timeout(
        SESSION_TIMEOUT,
        StreamPcm::builder()
            .config(config(2))
            .backend(server)
            .shared_sink(sink.clone())
            .run(),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(stats.blocks_written, 1000);
    assert_eq!(stats.frames_written, 128_000);
    assert_eq!(stats.bytes_written, 512_000);

    let samples = sink.samples();
    assert_eq!(samples.len(), 256_000);
    assert_eq!(samples, expected_samples(2, 128_000));
}

#[tokio::test]
async fn test_cycles_not_aligned_to_blocks() {
    // 100-frame cycles drained as 128-frame blocks; 32 cycles = 25 blocks
    let sink = Arc::new(CollectingSink::new());
    let server = MockServer::new()
        .cycles(32)
        .frames_per_cycle(100)
        .cycle_interval(Duration::from_micros(100))
        .shutdown_when_drained(true);

    let stats = tokio::time::timeout(
        SESSION_TIMEOUT,
        StreamPcm::builder()
            .config(config(3))
            .backend(server)
            .shared_sink(sink.clone())
            .run(),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(stats.blocks_written, 25);
    assert_eq!(stats.frames_written, 3200);
    assert_eq!(sink.samples(), expected_samples(3, 3200));
}

#[tokio::test]
async fn test_swapped_byte_order_end_to_end() {
    let sink = Arc::new(CollectingSink::new());
    let server = MockServer::new()
        .cycles(8)
        .frames_per_cycle(64)
        .shutdown_when_drained(true);
    let config = StreamConfig {
        byte_order: ByteOrder::Swapped,
        ..config(2)
    };

    tokio::time::timeout(
        SESSION_TIMEOUT,
        StreamPcm::builder()
            .config(config)
            .backend(server)
            .shared_sink(sink.clone())
            .run(),
    )
    .await
    .unwrap()
    .unwrap();

    let expected: Vec<u8> = expected_samples(2, 512)
        .into_iter()
        .flat_map(|s| s.swap_bytes().to_ne_bytes())
        .collect();
    assert_eq!(sink.bytes(), expected);
}

#[tokio::test]
async fn test_custom_generator_values_convert_without_clamping() {
    let sink = Arc::new(CollectingSink::new());
    let server = MockServer::new()
        .cycles(1)
        .frames_per_cycle(4)
        .generator(|channel, frame| match (channel, frame) {
            (0, 0) => 0.5,
            (0, 1) => -0.5,
            (0, 2) => 0.25,
            (0, 3) => -0.25,
            (1, 0) => 1.0,
            (1, 1) => 0.0,
            (1, 2) => -1.0,
            _ => 0.5,
        })
        .shutdown_when_drained(true);
    let config = StreamConfig {
        block_frames: 4,
        ..config(2)
    };

    tokio::time::timeout(
        SESSION_TIMEOUT,
        StreamPcm::builder()
            .config(config)
            .backend(server)
            .shared_sink(sink.clone())
            .run(),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(
        sink.samples(),
        vec![16384, -32768, -16384, 0, 8192, -32768, -8192, 16384]
    );
}

#[tokio::test]
async fn test_slow_sink_overrun_is_fatal() {
    let controller = Arc::new(LifecycleController::new(false));
    let server = MockServer::new().frames_per_cycle(256);
    let config = StreamConfig {
        buffer_bytes: 1024,
        ..config(2)
    };

    let err = tokio::time::timeout(
        SESSION_TIMEOUT,
        StreamPcm::builder()
            .config(config)
            .backend(server)
            .sink(SlowSink)
            .controller(Arc::clone(&controller))
            .run(),
    )
    .await
    .unwrap()
    .unwrap_err();

    assert!(matches!(err, StreamPcmError::BufferOverrun { .. }));
    assert!(err.is_desync());
    assert_eq!(controller.state(), LifecycleState::Terminated);
}

#[tokio::test]
async fn test_buffer_smaller_than_block_rejected() {
    let config = StreamConfig {
        buffer_bytes: 256,
        ..config(1)
    };

    let err = StreamPcm::builder()
        .config(config)
        .backend(MockServer::new())
        .sink(CollectingSink::new())
        .run()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StreamPcmError::BufferTooSmall {
            capacity: 256,
            block_bytes: 512
        }
    ));
    assert!(err.is_config_error());
}

#[tokio::test]
async fn test_unallocatable_buffer_fails_setup() {
    let controller = Arc::new(LifecycleController::new(false));
    let config = StreamConfig {
        buffer_bytes: usize::MAX,
        ..config(2)
    };

    let err = StreamPcm::builder()
        .config(config)
        .backend(MockServer::new())
        .sink(CollectingSink::new())
        .controller(Arc::clone(&controller))
        .run()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StreamPcmError::BufferAllocation { bytes: usize::MAX }
    ));
    assert!(!err.is_config_error());
    assert_eq!(controller.state(), LifecycleState::Terminated);
}

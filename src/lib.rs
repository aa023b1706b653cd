//! # stream-pcm
//!
//! **Note:** This crate is under active development. The API may change before 1.0.
//!
//! Lossless capture of JACK audio ports as interleaved 16-bit PCM.
//!
//! `stream-pcm` registers one input port per channel with a running JACK
//! server, connects the requested source ports, and streams every captured
//! frame to a byte sink (standard output by default) as raw interleaved
//! signed 16-bit samples, with no headers.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stream_pcm::{JackBackend, StreamConfig, StreamPcm, WriterSink};
//!
//! let config = StreamConfig {
//!     source_ports: vec!["system:capture_1".into(), "system:capture_2".into()],
//!     ..Default::default()
//! };
//! let backend = JackBackend::open(&config.resolved_client_name(), config.verbose)?;
//!
//! // Runs until the JACK server shuts down
//! let stats = StreamPcm::builder()
//!     .config(config)
//!     .backend(backend)
//!     .sink(WriterSink::stdout())
//!     .run()
//!     .await?;
//! ```
//!
//! ## Architecture
//!
//! The crate maintains a strict thread boundary:
//!
//! - **JACK Thread**: realtime process callback that never blocks, allocates or logs
//! - **Channel Buffers**: one lock-free SPSC queue per channel
//! - **Main Thread**: async drain loop that converts and writes whole blocks
//!
//! The producer never waits. If the consumer falls far enough behind that a
//! buffer cannot take a whole cycle, the session fails rather than drop audio.

#![warn(missing_docs)]
// Audio code requires intentional numeric casts between sample formats
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_lossless
)]
// unwrap/expect allowed in tests only
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]
// These doc lints are too strict for internal implementation details
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]

mod chunk;
mod config;
mod error;
pub mod format;
mod lifecycle;
pub mod pipeline;
mod session;
mod sink;
pub mod source;

pub use chunk::PcmBlock;
pub use config::{
    parse_buffer_size, ByteOrder, StreamConfig, DEFAULT_BLOCK_FRAMES, DEFAULT_BUFFER_BYTES,
    DEFAULT_POLL_INTERVAL, MAX_CHANNELS, MAX_CLIENT_NAME_LEN,
};
pub use error::{CaptureFault, SinkError, StreamPcmError};
pub use lifecycle::{LifecycleController, LifecycleState};
pub use pipeline::{
    channel_buffer, CaptureProducer, ChannelConsumer, ChannelProducer, ChannelReader, DrainLoop,
    SessionStats,
};
pub use session::{StreamPcm, StreamPcmBuilder};
pub use sink::{ChannelSink, Sink, WriterSink};
#[cfg(feature = "jack")]
pub use source::JackBackend;
pub use source::{CaptureBackend, CaptureStream, MockServer};

//! Error types for stream-pcm.
//!
//! Every error in this crate is fatal. The pipeline has no recovery layer:
//! once real-time guarantees are broken the stream is stopped loudly
//! instead of emitting audio with holes in it.
//!
//! - [`StreamPcmError`]: configuration, setup and runtime failures
//! - [`SinkError`]: failures inside a [`Sink`](crate::Sink), wrapped by
//!   [`StreamPcmError::SinkWrite`] and [`StreamPcmError::SinkStartFailed`]
//! - [`CaptureFault`]: allocation-free fault raised on the realtime thread

/// Fatal errors that stop a capture session.
#[derive(Debug, thiserror::Error)]
pub enum StreamPcmError {
    /// No source ports were given to connect to.
    #[error("at least one port to connect to must be specified")]
    NoSourcePorts,

    /// The buffer size string could not be parsed.
    #[error("invalid buffer size: {value}")]
    InvalidBufferSize {
        /// The rejected input.
        value: String,
    },

    /// The per-channel buffer cannot hold a single block.
    #[error("buffer of {capacity} bytes cannot hold a block of {block_bytes} bytes")]
    BufferTooSmall {
        /// Configured capacity in bytes.
        capacity: usize,
        /// Bytes needed for one block.
        block_bytes: usize,
    },

    /// The block size is zero, or too large to address in bytes.
    #[error("block size must be at least one frame and fit in memory")]
    InvalidBlockSize,

    /// More source ports were given than a block can describe.
    #[error("{count} source ports given, at most {max} are supported")]
    TooManyPorts {
        /// Number of source ports given.
        count: usize,
        /// Largest supported channel count.
        max: usize,
    },

    /// The audio server refused to register the client.
    #[error("failed to register client '{name}': {reason}")]
    ClientRegistration {
        /// Requested client name.
        name: String,
        /// Why registration failed.
        reason: String,
    },

    /// An input port could not be registered.
    #[error("failed to register port {port}: {reason}")]
    PortRegistration {
        /// Short name of the port.
        port: String,
        /// Why registration failed.
        reason: String,
    },

    /// A channel buffer could not be allocated.
    #[error("failed to create ringbuffer of {bytes} bytes")]
    BufferAllocation {
        /// Requested capacity in bytes.
        bytes: usize,
    },

    /// The audio graph could not be activated.
    #[error("failed to activate client: {reason}")]
    Activation {
        /// Why activation failed.
        reason: String,
    },

    /// A source port could not be connected to its capture port.
    #[error("failed to connect to input port {source_port}: {reason}")]
    Connection {
        /// External port we tried to connect from.
        source_port: String,
        /// Why the connection failed.
        reason: String,
    },

    /// The number of source ports differs from the registered capture ports.
    #[error("{sources} source ports given for {ports} capture ports")]
    PortCountMismatch {
        /// Number of source port names.
        sources: usize,
        /// Number of registered capture ports.
        ports: usize,
    },

    /// The output sink failed to start.
    #[error("sink '{sink_name}' failed to start: {source}")]
    SinkStartFailed {
        /// Name of the sink.
        sink_name: String,
        /// Underlying sink error.
        #[source]
        source: SinkError,
    },

    /// The producer found less free space than one cycle needs.
    #[error("ring buffer {channel} has only {free} bytes of free space, attempted to write {requested} bytes")]
    BufferOverrun {
        /// Channel index.
        channel: usize,
        /// Free bytes at the time of the write.
        free: usize,
        /// Bytes the cycle needed.
        requested: usize,
    },

    /// The server handed over fewer samples than the cycle's frame count.
    #[error("port {channel} delivered {available} samples for a {frames}-frame cycle")]
    ShortInput {
        /// Channel index.
        channel: usize,
        /// Samples in the server buffer.
        available: usize,
        /// Frames in the cycle.
        frames: usize,
    },

    /// A channel buffer returned fewer bytes than it promised.
    #[error("only {read} bytes read from ring buffer {channel}, should be {expected}")]
    ShortRead {
        /// Channel index.
        channel: usize,
        /// Bytes actually read.
        read: usize,
        /// Bytes requested.
        expected: usize,
    },

    /// Channel blocks handed to the converter had different lengths.
    #[error("channel {channel} block has {actual} samples, expected {expected}")]
    BlockLengthMismatch {
        /// Channel index.
        channel: usize,
        /// Samples expected (length of channel 0).
        expected: usize,
        /// Samples found.
        actual: usize,
    },

    /// A byte swap was requested on a buffer that is not whole 16-bit values.
    #[error("cannot swap byte order of {len} bytes (odd length)")]
    OddByteCount {
        /// Buffer length in bytes.
        len: usize,
    },

    /// Writing a block to the sink failed.
    #[error("error writing to sink '{sink_name}': {source}")]
    SinkWrite {
        /// Name of the sink.
        sink_name: String,
        /// Underlying sink error.
        #[source]
        source: SinkError,
    },

    /// An error from the audio server library.
    #[error("audio backend error: {0}")]
    Backend(String),
}

impl StreamPcmError {
    /// Returns `true` for errors detected before the pipeline starts.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::NoSourcePorts
                | Self::InvalidBufferSize { .. }
                | Self::BufferTooSmall { .. }
                | Self::InvalidBlockSize
                | Self::TooManyPorts { .. }
        )
    }

    /// Returns `true` for errors that mean producer and consumer lost sync.
    pub fn is_desync(&self) -> bool {
        matches!(
            self,
            Self::BufferOverrun { .. }
                | Self::ShortInput { .. }
                | Self::ShortRead { .. }
                | Self::BlockLengthMismatch { .. }
                | Self::SinkWrite { .. }
        )
    }
}

/// Fault raised by the capture producer on the realtime thread.
///
/// Holds plain integers only so it can be built, copied and published
/// without touching the allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureFault {
    /// A channel buffer had less free space than the cycle needs.
    Overrun {
        /// Channel index.
        channel: usize,
        /// Free bytes.
        free: usize,
        /// Bytes needed.
        needed: usize,
    },
    /// A port buffer held fewer samples than the cycle's frame count.
    ShortInput {
        /// Channel index.
        channel: usize,
        /// Samples available.
        available: usize,
        /// Frames in the cycle.
        frames: usize,
    },
}

impl From<CaptureFault> for StreamPcmError {
    fn from(fault: CaptureFault) -> Self {
        match fault {
            CaptureFault::Overrun {
                channel,
                free,
                needed,
            } => Self::BufferOverrun {
                channel,
                free,
                requested: needed,
            },
            CaptureFault::ShortInput {
                channel,
                available,
                frames,
            } => Self::ShortInput {
                channel,
                available,
                frames,
            },
        }
    }
}

/// Errors that can occur within a [`Sink`](crate::Sink) implementation.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The destination accepted fewer bytes than the block holds.
    #[error("short write: {written} of {expected} bytes")]
    ShortWrite {
        /// Bytes accepted before the destination stopped.
        written: usize,
        /// Bytes in the block.
        expected: usize,
    },

    /// I/O error from the destination.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The receiving channel was closed.
    #[error("channel closed")]
    ChannelClosed,

    /// Custom error for user-implemented sinks.
    #[error("{0}")]
    Custom(String),
}

impl SinkError {
    /// Creates a custom sink error with the given message.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_limits_display() {
        let err = StreamPcmError::TooManyPorts {
            count: 70_000,
            max: 65_535,
        };
        assert_eq!(
            err.to_string(),
            "70000 source ports given, at most 65535 are supported"
        );
        let err = StreamPcmError::BufferAllocation { bytes: 1024 };
        assert_eq!(err.to_string(), "failed to create ringbuffer of 1024 bytes");
    }

    #[test]
    fn test_overrun_display() {
        let err = StreamPcmError::BufferOverrun {
            channel: 1,
            free: 256,
            requested: 512,
        };
        assert_eq!(
            err.to_string(),
            "ring buffer 1 has only 256 bytes of free space, attempted to write 512 bytes"
        );
    }

    #[test]
    fn test_capture_fault_conversion() {
        let err: StreamPcmError = CaptureFault::Overrun {
            channel: 0,
            free: 4,
            needed: 8,
        }
        .into();
        assert!(matches!(
            err,
            StreamPcmError::BufferOverrun {
                channel: 0,
                free: 4,
                requested: 8
            }
        ));
        assert!(err.is_desync());

        let err: StreamPcmError = CaptureFault::ShortInput {
            channel: 2,
            available: 10,
            frames: 64,
        }
        .into();
        assert!(matches!(err, StreamPcmError::ShortInput { channel: 2, .. }));
    }

    #[test]
    fn test_error_classification() {
        assert!(StreamPcmError::NoSourcePorts.is_config_error());
        assert!(!StreamPcmError::NoSourcePorts.is_desync());
        let short = StreamPcmError::ShortRead {
            channel: 0,
            read: 4,
            expected: 512,
        };
        assert!(short.is_desync());
        assert!(!short.is_config_error());
    }

    #[test]
    fn test_sink_error_wraps_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err = SinkError::from(io_err);
        assert!(err.to_string().contains("pipe closed"));
    }

    #[test]
    fn test_sink_error_custom() {
        let err = SinkError::custom("something went wrong");
        assert_eq!(err.to_string(), "something went wrong");
    }
}

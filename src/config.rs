//! Configuration types for capture sessions.

use std::time::Duration;

use crate::StreamPcmError;

/// Default per-channel ring buffer capacity (1 MiB).
pub const DEFAULT_BUFFER_BYTES: usize = 1_048_576;

/// Default number of frames drained from each channel per block.
pub const DEFAULT_BLOCK_FRAMES: usize = 128;

/// Default sleep between polls while the drain loop waits for data.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Longest client name JACK accepts, excluding the terminating NUL.
pub const MAX_CLIENT_NAME_LEN: usize = 63;

/// Most source ports a session accepts; blocks record their channel count
/// as `u16`.
pub const MAX_CHANNELS: usize = u16::MAX as usize;

/// Prefix of the generated client name.
const CLIENT_NAME_PREFIX: &str = "stream-pcm";

/// Byte order of the 16-bit output samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    /// Host byte order.
    #[default]
    Native,
    /// The two bytes of every sample swapped relative to host order.
    Swapped,
}

impl ByteOrder {
    /// Maps the command-line swap flag onto a byte order.
    #[must_use]
    pub fn from_swap(swap: bool) -> Self {
        if swap {
            Self::Swapped
        } else {
            Self::Native
        }
    }

    /// Returns `true` if samples are byte-swapped.
    #[must_use]
    pub fn is_swapped(self) -> bool {
        self == Self::Swapped
    }
}

/// Configuration for a capture session.
///
/// Use [`StreamConfig::default()`] and override what you need.
///
/// # Example
///
/// ```
/// use stream_pcm::{ByteOrder, StreamConfig};
///
/// let config = StreamConfig {
///     source_ports: vec!["system:capture_1".into(), "system:capture_2".into()],
///     byte_order: ByteOrder::Swapped,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Client name to register with the audio server.
    ///
    /// `None` generates `stream-pcm-<pid>`.
    pub client_name: Option<String>,

    /// Capacity of each channel's ring buffer in bytes.
    ///
    /// Default: 1 MiB
    pub buffer_bytes: usize,

    /// Frames drained from every channel per block.
    ///
    /// Default: 128
    pub block_frames: usize,

    /// Sleep between polls while waiting for a full block.
    ///
    /// Default: 1ms
    pub poll_interval: Duration,

    /// External ports to capture, in output channel order.
    pub source_ports: Vec<String>,

    /// Byte order of the output samples.
    pub byte_order: ByteOrder,

    /// Emit progress diagnostics.
    ///
    /// Default: true
    pub verbose: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            client_name: None,
            buffer_bytes: DEFAULT_BUFFER_BYTES,
            block_frames: DEFAULT_BLOCK_FRAMES,
            poll_interval: DEFAULT_POLL_INTERVAL,
            source_ports: Vec::new(),
            byte_order: ByteOrder::Native,
            verbose: true,
        }
    }
}

impl StreamConfig {
    /// Number of output channels.
    pub fn channels(&self) -> usize {
        self.source_ports.len()
    }

    /// Bytes of raw float data in one block of one channel.
    ///
    /// `None` if the block is too large to address.
    pub fn block_bytes(&self) -> Option<usize> {
        self.block_frames.checked_mul(std::mem::size_of::<f32>())
    }

    /// Resolves the client name, generating one from the process id if unset.
    ///
    /// The result is truncated to [`MAX_CLIENT_NAME_LEN`] bytes.
    pub fn resolved_client_name(&self) -> String {
        let name = match &self.client_name {
            Some(name) => name.clone(),
            None => format!("{CLIENT_NAME_PREFIX}-{}", std::process::id()),
        };
        truncate_client_name(name)
    }

    /// Checks the configuration before any resources are allocated.
    pub fn validate(&self) -> Result<(), StreamPcmError> {
        if self.source_ports.is_empty() {
            return Err(StreamPcmError::NoSourcePorts);
        }
        if self.source_ports.len() > MAX_CHANNELS {
            return Err(StreamPcmError::TooManyPorts {
                count: self.source_ports.len(),
                max: MAX_CHANNELS,
            });
        }
        let block_bytes = match self.block_bytes() {
            Some(bytes) if self.block_frames > 0 => bytes,
            _ => return Err(StreamPcmError::InvalidBlockSize),
        };
        if self.buffer_bytes < block_bytes {
            return Err(StreamPcmError::BufferTooSmall {
                capacity: self.buffer_bytes,
                block_bytes,
            });
        }
        Ok(())
    }
}

/// Parses a buffer size with an optional `k`/`K` or `m`/`M` suffix.
///
/// ```
/// use stream_pcm::parse_buffer_size;
///
/// assert_eq!(parse_buffer_size("4096").unwrap(), 4096);
/// assert_eq!(parse_buffer_size("64k").unwrap(), 65_536);
/// assert_eq!(parse_buffer_size("2M").unwrap(), 2_097_152);
/// ```
pub fn parse_buffer_size(input: &str) -> Result<usize, StreamPcmError> {
    let invalid = || StreamPcmError::InvalidBufferSize {
        value: input.to_string(),
    };

    let trimmed = input.trim();
    let (digits, multiplier) = match trimmed.char_indices().last() {
        Some((idx, 'k' | 'K')) => (&trimmed[..idx], 1024),
        Some((idx, 'm' | 'M')) => (&trimmed[..idx], 1_048_576),
        Some(_) => (trimmed, 1),
        None => return Err(invalid()),
    };

    let value: usize = digits.parse().map_err(|_| invalid())?;
    let bytes = value.checked_mul(multiplier).ok_or_else(invalid)?;
    if bytes == 0 {
        return Err(invalid());
    }
    Ok(bytes)
}

fn truncate_client_name(mut name: String) -> String {
    if name.len() > MAX_CLIENT_NAME_LEN {
        let mut end = MAX_CLIENT_NAME_LEN;
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        name.truncate(end);
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_ports(n: usize) -> StreamConfig {
        StreamConfig {
            source_ports: (1..=n).map(|i| format!("system:capture_{i}")).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_stream_config_defaults() {
        let config = StreamConfig::default();
        assert_eq!(config.buffer_bytes, 1_048_576);
        assert_eq!(config.block_frames, 128);
        assert_eq!(config.block_bytes(), Some(512));
        assert_eq!(config.poll_interval, Duration::from_millis(1));
        assert_eq!(config.byte_order, ByteOrder::Native);
        assert!(config.verbose);
        assert!(config.source_ports.is_empty());
    }

    #[test]
    fn test_validate_requires_ports() {
        let config = StreamConfig::default();
        assert!(matches!(
            config.validate(),
            Err(StreamPcmError::NoSourcePorts)
        ));
        assert!(config_with_ports(2).validate().is_ok());
    }

    #[test]
    fn test_validate_buffer_holds_one_block() {
        let config = StreamConfig {
            buffer_bytes: 511,
            ..config_with_ports(1)
        };
        assert!(matches!(
            config.validate(),
            Err(StreamPcmError::BufferTooSmall {
                capacity: 511,
                block_bytes: 512
            })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_block() {
        let config = StreamConfig {
            block_frames: 0,
            ..config_with_ports(1)
        };
        assert!(matches!(
            config.validate(),
            Err(StreamPcmError::InvalidBlockSize)
        ));
    }

    #[test]
    fn test_validate_rejects_unaddressable_block() {
        let config = StreamConfig {
            block_frames: usize::MAX / 2,
            ..config_with_ports(1)
        };
        assert_eq!(config.block_bytes(), None);
        assert!(matches!(
            config.validate(),
            Err(StreamPcmError::InvalidBlockSize)
        ));
    }

    #[test]
    fn test_validate_caps_channel_count() {
        assert!(config_with_ports(MAX_CHANNELS).validate().is_ok());

        let err = config_with_ports(MAX_CHANNELS + 1).validate().unwrap_err();
        assert!(matches!(
            err,
            StreamPcmError::TooManyPorts {
                count: 65_536,
                max: 65_535
            }
        ));
        assert!(err.is_config_error());
    }

    #[test]
    fn test_byte_order_from_swap() {
        assert_eq!(ByteOrder::from_swap(false), ByteOrder::Native);
        assert_eq!(ByteOrder::from_swap(true), ByteOrder::Swapped);
        assert!(ByteOrder::Swapped.is_swapped());
    }

    #[test]
    fn test_parse_buffer_size_suffixes() {
        assert_eq!(parse_buffer_size("1024").unwrap(), 1024);
        assert_eq!(parse_buffer_size("8k").unwrap(), 8192);
        assert_eq!(parse_buffer_size("8K").unwrap(), 8192);
        assert_eq!(parse_buffer_size("1m").unwrap(), 1_048_576);
        assert_eq!(parse_buffer_size("3M").unwrap(), 3 * 1_048_576);
    }

    #[test]
    fn test_parse_buffer_size_rejects_garbage() {
        for input in ["", "k", "abc", "12x", "0", "0k", "-5", "1.5M"] {
            assert!(
                matches!(
                    parse_buffer_size(input),
                    Err(StreamPcmError::InvalidBufferSize { .. })
                ),
                "accepted {input:?}"
            );
        }
    }

    #[test]
    fn test_generated_client_name() {
        let name = StreamConfig::default().resolved_client_name();
        assert_eq!(name, format!("stream-pcm-{}", std::process::id()));
    }

    #[test]
    fn test_client_name_truncated() {
        let config = StreamConfig {
            client_name: Some("é".repeat(40)),
            ..Default::default()
        };
        let name = config.resolved_client_name();
        assert!(name.len() <= MAX_CLIENT_NAME_LEN);
        assert_eq!(name, "é".repeat(31));
    }
}

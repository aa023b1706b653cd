//! Raw byte-stream sink over any `AsyncWrite`.

use crate::sink::Sink;
use crate::{PcmBlock, SinkError};
use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

/// A sink that appends each block's bytes to a writer.
///
/// The output is a contiguous, unframed stream: no headers, no padding.
/// A writer that stops accepting bytes mid-block is reported as
/// [`SinkError::ShortWrite`].
///
/// # Example
///
/// ```no_run
/// use stream_pcm::WriterSink;
///
/// let sink = WriterSink::stdout();
/// // Use with the StreamPcm builder...
/// ```
pub struct WriterSink<W> {
    name: String,
    writer: Mutex<W>,
}

impl WriterSink<tokio::io::Stdout> {
    /// Creates a sink writing to standard output.
    pub fn stdout() -> Self {
        Self::new("stdout", tokio::io::stdout())
    }
}

impl<W> WriterSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Creates a sink over `writer`.
    pub fn new(name: impl Into<String>, writer: W) -> Self {
        Self {
            name: name.into(),
            writer: Mutex::new(writer),
        }
    }

    /// Consumes the sink, returning the writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W> Sink for WriterSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&self, block: &PcmBlock) -> Result<(), SinkError> {
        let data = block.as_bytes();
        let mut writer = self.writer.lock().await;

        let mut written = 0;
        while written < data.len() {
            let n = writer.write(&data[written..]).await?;
            if n == 0 {
                return Err(SinkError::ShortWrite {
                    written,
                    expected: data.len(),
                });
            }
            written += n;
        }
        writer.flush().await?;

        tracing::trace!(
            "WriterSink {}: wrote block #{} ({} bytes)",
            self.name,
            block.sequence,
            written
        );
        Ok(())
    }

    async fn on_stop(&self) -> Result<(), SinkError> {
        self.writer.lock().await.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ByteOrder;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// Accepts a fixed number of bytes, then reports zero-length writes.
    struct LimitedWriter {
        remaining: usize,
        data: Vec<u8>,
    }

    impl AsyncWrite for LimitedWriter {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            let n = buf.len().min(self.remaining).min(3);
            self.remaining -= n;
            self.data.extend_from_slice(&buf[..n]);
            Poll::Ready(Ok(n))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn block(bytes: Vec<u8>, sequence: u64) -> PcmBlock {
        let frames = bytes.len() / 2;
        PcmBlock::new(bytes, 1, frames, sequence, ByteOrder::Native)
    }

    #[tokio::test]
    async fn test_blocks_are_appended_in_order() {
        let sink = WriterSink::new("memory", Vec::<u8>::new());
        sink.write(&block(vec![1, 2, 3, 4], 0)).await.unwrap();
        sink.write(&block(vec![5, 6], 1)).await.unwrap();
        sink.on_stop().await.unwrap();

        assert_eq!(sink.into_inner(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn test_partial_writes_are_completed() {
        // LimitedWriter takes at most 3 bytes per call
        let sink = WriterSink::new(
            "limited",
            LimitedWriter {
                remaining: 100,
                data: Vec::new(),
            },
        );
        sink.write(&block((0..10).collect(), 0)).await.unwrap();
        assert_eq!(sink.into_inner().data, (0..10).collect::<Vec<u8>>());
    }

    #[tokio::test]
    async fn test_short_write_is_reported() {
        let sink = WriterSink::new(
            "limited",
            LimitedWriter {
                remaining: 5,
                data: Vec::new(),
            },
        );
        let err = sink.write(&block(vec![0; 8], 0)).await.unwrap_err();
        assert!(matches!(
            err,
            SinkError::ShortWrite {
                written: 5,
                expected: 8
            }
        ));
    }

    #[tokio::test]
    async fn test_file_destination() {
        use tempfile::tempdir;

        let dir = tempdir().unwrap();
        let path = dir.path().join("capture.pcm");
        let file = tokio::fs::File::create(&path).await.unwrap();

        let sink = WriterSink::new("file", file);
        sink.on_start().await.unwrap();
        sink.write(&block(vec![9; 512], 0)).await.unwrap();
        sink.write(&block(vec![8; 512], 1)).await.unwrap();
        sink.on_stop().await.unwrap();
        drop(sink);

        let data = std::fs::read(&path).unwrap();
        assert_eq!(data.len(), 1024);
        assert!(data[..512].iter().all(|&b| b == 9));
        assert!(data[512..].iter().all(|&b| b == 8));
    }

    #[tokio::test]
    async fn test_stdout_sink_name() {
        let sink = WriterSink::stdout();
        assert_eq!(sink.name(), "stdout");
    }
}

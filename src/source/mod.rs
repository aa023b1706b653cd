//! Capture backends: the audio servers that drive the capture producer.
//!
//! A backend owns the connection to the audio graph. The session calls it
//! in lifecycle order:
//!
//! 1. [`CaptureBackend::register`] while `Initializing`, once per run
//! 2. [`CaptureBackend::start`] while `Connecting`, which activates the
//!    graph and connects the source ports
//!
//! The backend's realtime thread calls
//! [`CaptureProducer::on_audio_ready`](crate::CaptureProducer::on_audio_ready)
//! every cycle. Faults it returns are published with
//! [`LifecycleController::report_fault`](crate::LifecycleController::report_fault).

#[cfg(feature = "jack")]
mod jack_backend;
mod mock;

#[cfg(feature = "jack")]
pub use jack_backend::JackBackend;
pub use mock::{test_signal, MockServer, SampleGenerator};

use std::any::Any;
use std::sync::Arc;

use crate::{CaptureProducer, LifecycleController, StreamPcmError};

/// An audio server able to feed a [`CaptureProducer`].
pub trait CaptureBackend: Send {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Sample rate of the audio graph in Hz. Informational only.
    fn sample_rate(&self) -> u32;

    /// Registers one input port per channel, named `1..=channels`.
    fn register(&mut self, channels: usize) -> Result<(), StreamPcmError>;

    /// Activates the graph and connects `sources[i]` to port `i + 1`.
    ///
    /// The returned stream keeps the backend running until dropped.
    fn start(
        self: Box<Self>,
        producer: CaptureProducer,
        controller: Arc<LifecycleController>,
        sources: &[String],
    ) -> Result<CaptureStream, StreamPcmError>;
}

/// A running capture backend.
///
/// Capture continues while this struct is held. When dropped, the backend
/// is deactivated and its resources are released.
#[must_use]
pub struct CaptureStream {
    _guard: Box<dyn Any>,
}

impl CaptureStream {
    /// Wraps a backend-specific guard.
    pub fn new<G: Any>(guard: G) -> Self {
        Self {
            _guard: Box::new(guard),
        }
    }
}

impl std::fmt::Debug for CaptureStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureStream").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_capture_stream_releases_guard_on_drop() {
        let dropped = Arc::new(AtomicBool::new(false));
        let stream = CaptureStream::new(DropFlag(Arc::clone(&dropped)));
        assert!(!dropped.load(Ordering::SeqCst));

        drop(stream);
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[test]
    fn test_backend_is_object_safe() {
        let backend: Box<dyn CaptureBackend> = Box::new(MockServer::new());
        assert_eq!(backend.name(), "mock");
    }
}

//! Mock audio server for testing without a running JACK server.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::{CaptureBackend, CaptureStream};
use crate::{CaptureProducer, LifecycleController, StreamPcmError};

/// Produces the sample for `(channel, absolute frame index)`.
pub type SampleGenerator = Arc<dyn Fn(usize, u64) -> f32 + Send + Sync>;

const DEFAULT_SAMPLE_RATE: u32 = 48_000;
const DEFAULT_FRAMES: usize = 128;
const IDLE_POLL: Duration = Duration::from_micros(200);

/// Deterministic test signal: a per-channel sawtooth in `[-1, 1)`.
///
/// Every value is a multiple of 1/256, so it converts to 16 bits exactly.
pub fn test_signal(channel: usize, frame: u64) -> f32 {
    let phase = (frame + channel as u64 * 37) % 512;
    phase as f32 / 256.0 - 1.0
}

/// A fake audio server that drives the capture producer from a thread.
///
/// The server waits until the session marks itself ready, then runs its
/// cycles back to back (or paced by [`cycle_interval`](Self::cycle_interval)),
/// calling the producer the way a realtime callback would.
///
/// # Example
///
/// ```
/// use stream_pcm::MockServer;
/// use std::time::Duration;
///
/// let server = MockServer::new()
///     .cycles(1000)
///     .frames_per_cycle(128)
///     .cycle_interval(Duration::from_micros(50))
///     .shutdown_when_drained(true);
/// ```
pub struct MockServer {
    sample_rate: u32,
    frames: usize,
    cycles: Option<u64>,
    cycle_interval: Option<Duration>,
    shutdown_when_drained: bool,
    generator: SampleGenerator,
    unavailable: Vec<String>,
    channels: Option<usize>,
}

impl MockServer {
    /// Creates a server running forever at 48 kHz, 128 frames per cycle,
    /// producing [`test_signal`].
    pub fn new() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            frames: DEFAULT_FRAMES,
            cycles: None,
            cycle_interval: None,
            shutdown_when_drained: false,
            generator: Arc::new(test_signal),
            unavailable: Vec::new(),
            channels: None,
        }
    }

    /// Sets the reported sample rate.
    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Sets the frames delivered per cycle.
    pub fn frames_per_cycle(mut self, frames: usize) -> Self {
        self.frames = frames;
        self
    }

    /// Stops producing after `cycles` cycles.
    pub fn cycles(mut self, cycles: u64) -> Self {
        self.cycles = Some(cycles);
        self
    }

    /// Sleeps between cycles.
    pub fn cycle_interval(mut self, interval: Duration) -> Self {
        self.cycle_interval = Some(interval);
        self
    }

    /// Sends a server shutdown once every cycle has been produced and
    /// drained.
    pub fn shutdown_when_drained(mut self, enabled: bool) -> Self {
        self.shutdown_when_drained = enabled;
        self
    }

    /// Replaces the sample generator.
    pub fn generator<F>(mut self, generator: F) -> Self
    where
        F: Fn(usize, u64) -> f32 + Send + Sync + 'static,
    {
        self.generator = Arc::new(generator);
        self
    }

    /// Makes connecting from `port` fail.
    pub fn unavailable_port(mut self, port: impl Into<String>) -> Self {
        self.unavailable.push(port.into());
        self
    }

    /// Number of registered ports, once [`register`](CaptureBackend::register)
    /// has run.
    pub fn registered_channels(&self) -> Option<usize> {
        self.channels
    }
}

impl Default for MockServer {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureBackend for MockServer {
    fn name(&self) -> &str {
        "mock"
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn register(&mut self, channels: usize) -> Result<(), StreamPcmError> {
        if channels == 0 {
            return Err(StreamPcmError::PortRegistration {
                port: "1".to_string(),
                reason: "no channels requested".to_string(),
            });
        }
        self.channels = Some(channels);
        Ok(())
    }

    fn start(
        self: Box<Self>,
        producer: CaptureProducer,
        controller: Arc<LifecycleController>,
        sources: &[String],
    ) -> Result<CaptureStream, StreamPcmError> {
        let ports = self.channels.ok_or_else(|| {
            StreamPcmError::Backend("mock server started before registering ports".to_string())
        })?;
        if sources.len() != ports || producer.channel_count() != ports {
            return Err(StreamPcmError::PortCountMismatch {
                sources: sources.len(),
                ports,
            });
        }

        for (index, source) in sources.iter().enumerate() {
            if self.unavailable.contains(source) {
                return Err(StreamPcmError::Connection {
                    source_port: source.clone(),
                    reason: "no such port".to_string(),
                });
            }
            if controller.is_verbose() {
                tracing::info!("Connected {} to mock:{}", source, index + 1);
            }
        }

        let stop = Arc::new(AtomicBool::new(false));
        let cycle = MockCycle {
            frames: self.frames,
            cycles: self.cycles,
            interval: self.cycle_interval,
            shutdown_when_drained: self.shutdown_when_drained,
            generator: self.generator,
            stop: Arc::clone(&stop),
        };

        let thread = thread::Builder::new()
            .name("mock-server".to_string())
            .spawn(move || cycle.run(producer, &controller))
            .map_err(|e| StreamPcmError::Activation {
                reason: e.to_string(),
            })?;

        Ok(CaptureStream::new(MockGuard {
            stop,
            thread: Some(thread),
        }))
    }
}

/// State moved onto the mock server thread.
struct MockCycle {
    frames: usize,
    cycles: Option<u64>,
    interval: Option<Duration>,
    shutdown_when_drained: bool,
    generator: SampleGenerator,
    stop: Arc<AtomicBool>,
}

impl MockCycle {
    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    fn run(self, mut producer: CaptureProducer, controller: &LifecycleController) {
        // Cycles before readiness would be discarded by the producer
        while !controller.is_ready() {
            if self.stopped() {
                return;
            }
            thread::sleep(IDLE_POLL);
        }

        let mut buffers = vec![vec![0.0f32; self.frames]; producer.channel_count()];
        let mut cycle = 0u64;
        while self.cycles.map_or(true, |limit| cycle < limit) {
            if self.stopped() {
                return;
            }

            let base = cycle * self.frames as u64;
            for (channel, buffer) in buffers.iter_mut().enumerate() {
                for (offset, sample) in buffer.iter_mut().enumerate() {
                    *sample = (self.generator)(channel, base + offset as u64);
                }
            }

            if let Err(fault) = producer.on_audio_ready(self.frames, |c| buffers[c].as_slice()) {
                controller.report_fault(fault);
                return;
            }

            cycle += 1;
            if let Some(interval) = self.interval {
                thread::sleep(interval);
            }
        }

        if !self.shutdown_when_drained {
            return;
        }
        while !producer.is_drained() {
            if self.stopped() || controller.fault().is_some() {
                return;
            }
            thread::sleep(IDLE_POLL);
        }
        if controller.is_verbose() {
            tracing::info!("Mock server shutting down after {} cycles", cycle);
        }
        controller.request_shutdown();
    }
}

/// Stops and joins the mock server thread on drop.
struct MockGuard {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Drop for MockGuard {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Mock server thread panicked");
            }
        }
    }
}

//! Capture session: wires a backend, the channel buffers and a sink, then
//! drives the lifecycle to completion.

use std::sync::Arc;

use crate::pipeline::{channel_buffer, CaptureProducer, DrainLoop, SessionStats};
use crate::sink::{Sink, WriterSink};
use crate::source::CaptureBackend;
use crate::{LifecycleController, StreamConfig, StreamPcmError};

/// Entry point for building a capture session.
///
/// # Example
///
#[cfg_attr(feature = "jack", doc = "```no_run")]
#[cfg_attr(not(feature = "jack"), doc = "```ignore")]
/// use stream_pcm::{JackBackend, StreamConfig, StreamPcm, WriterSink};
///
/// # async fn example() -> Result<(), stream_pcm::StreamPcmError> {
/// let config = StreamConfig {
///     source_ports: vec!["system:capture_1".into(), "system:capture_2".into()],
///     ..Default::default()
/// };
/// let backend = JackBackend::open(&config.resolved_client_name(), config.verbose)?;
///
/// let stats = StreamPcm::builder()
///     .config(config)
///     .backend(backend)
///     .sink(WriterSink::stdout())
///     .run()
///     .await?;
/// eprintln!("wrote {} frames", stats.frames_written);
/// # Ok(())
/// # }
/// ```
pub struct StreamPcm;

impl StreamPcm {
    /// Creates a new builder.
    pub fn builder() -> StreamPcmBuilder {
        StreamPcmBuilder::new()
    }
}

/// Builder for a capture session.
#[must_use]
pub struct StreamPcmBuilder {
    config: StreamConfig,
    backend: Option<Box<dyn CaptureBackend>>,
    sink: Option<Arc<dyn Sink>>,
    controller: Option<Arc<LifecycleController>>,
}

impl StreamPcmBuilder {
    fn new() -> Self {
        Self {
            config: StreamConfig::default(),
            backend: None,
            sink: None,
            controller: None,
        }
    }

    /// Sets the session configuration.
    pub fn config(mut self, config: StreamConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the audio server to capture from.
    pub fn backend(mut self, backend: impl CaptureBackend + 'static) -> Self {
        self.backend = Some(Box::new(backend));
        self
    }

    /// Sets the output sink. Defaults to standard output.
    pub fn sink(mut self, sink: impl Sink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Sets an output sink the caller keeps a handle to.
    pub fn shared_sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Uses an existing controller, e.g. to request shutdown from outside.
    ///
    /// By default a new controller is created from the config's verbosity.
    pub fn controller(mut self, controller: Arc<LifecycleController>) -> Self {
        self.controller = Some(controller);
        self
    }

    /// Runs the session until the server shuts down or a fatal error occurs.
    ///
    /// Returns the totals written on server shutdown. Every other way out
    /// is an error.
    pub async fn run(self) -> Result<SessionStats, StreamPcmError> {
        let controller = self
            .controller
            .unwrap_or_else(|| Arc::new(LifecycleController::new(self.config.verbose)));
        let sink = self
            .sink
            .unwrap_or_else(|| Arc::new(WriterSink::stdout()));

        let result = match self.backend {
            Some(backend) => run_session(&self.config, backend, sink, &controller).await,
            None => Err(StreamPcmError::Backend(
                "no capture backend configured".to_string(),
            )),
        };

        controller.terminate();
        result
    }
}

async fn run_session(
    config: &StreamConfig,
    mut backend: Box<dyn CaptureBackend>,
    sink: Arc<dyn Sink>,
    controller: &Arc<LifecycleController>,
) -> Result<SessionStats, StreamPcmError> {
    config.validate()?;
    let verbose = controller.is_verbose();
    if verbose {
        tracing::info!("Ringbuffer size is {} bytes", config.buffer_bytes);
    }

    sink.on_start()
        .await
        .map_err(|source| StreamPcmError::SinkStartFailed {
            sink_name: sink.name().to_string(),
            source,
        })?;

    let (producers, consumers): (Vec<_>, Vec<_>) = (0..config.channels())
        .map(|_| channel_buffer(config.buffer_bytes))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .unzip();

    backend.register(config.channels())?;
    let backend_name = backend.name().to_string();
    tracing::debug!(
        "Capturing {} channels from {} at {} Hz",
        config.channels(),
        backend_name,
        backend.sample_rate()
    );

    controller.begin_connecting();
    let producer = CaptureProducer::new(producers, Arc::clone(controller));
    // Dropping the stream deactivates the backend
    let _stream = backend.start(producer, Arc::clone(controller), &config.source_ports)?;

    controller.mark_ready();
    controller.begin_running();

    let mut drain = DrainLoop::new(consumers, config, Arc::clone(&sink), Arc::clone(controller));
    tokio::select! {
        result = drain.run() => match result {
            Ok(never) => match never {},
            Err(e) => return Err(e),
        },
        () = controller.wait_for_shutdown() => {}
    }

    // A fault that raced the shutdown still fails the run
    if let Some(fault) = controller.fault() {
        return Err(fault.into());
    }

    if verbose {
        tracing::info!(
            "{} quitting because {} is shutting down",
            config.resolved_client_name(),
            backend_name
        );
    }

    sink.on_stop()
        .await
        .map_err(|source| StreamPcmError::SinkWrite {
            sink_name: sink.name().to_string(),
            source,
        })?;

    Ok(drain.stats())
}

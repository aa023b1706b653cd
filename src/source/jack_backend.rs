//! JACK capture backend.
//!
//! Registers one input port per channel and feeds the capture producer
//! from JACK's process callback. Connections are made from the requested
//! source ports to our own ports after activation.

use std::sync::Arc;

use jack::{
    AsyncClient, AudioIn, Client, ClientOptions, ClientStatus, Control, NotificationHandler, Port,
    ProcessHandler, ProcessScope,
};

use super::{CaptureBackend, CaptureStream};
use crate::{CaptureProducer, LifecycleController, StreamPcmError};

/// A JACK client capturing from external ports.
///
/// The client is opened with `NO_START_SERVER`: a JACK server must already
/// be running.
///
/// # Example
///
/// ```no_run
/// use stream_pcm::JackBackend;
///
/// let backend = JackBackend::open("stream-pcm", true)?;
/// # Ok::<(), stream_pcm::StreamPcmError>(())
/// ```
pub struct JackBackend {
    client: Client,
    ports: Vec<Port<AudioIn>>,
    verbose: bool,
}

impl JackBackend {
    /// Opens a client named `client_name` on the running JACK server.
    ///
    /// # Errors
    ///
    /// Returns `ClientRegistration` if no server is running or the name is
    /// refused.
    pub fn open(client_name: &str, verbose: bool) -> Result<Self, StreamPcmError> {
        let (client, status) = Client::new(client_name, ClientOptions::NO_START_SERVER)
            .map_err(|e| StreamPcmError::ClientRegistration {
                name: client_name.to_string(),
                reason: e.to_string(),
            })?;

        tracing::debug!("JACK client status: {:?}", status);
        if verbose {
            tracing::info!("JACK client registered as '{}'", client.name());
            tracing::info!("Sample rate is {} Hz", client.sample_rate());
        }

        Ok(Self {
            client,
            ports: Vec::new(),
            verbose,
        })
    }

    /// The name the server assigned to this client.
    pub fn client_name(&self) -> &str {
        self.client.name()
    }
}

impl CaptureBackend for JackBackend {
    fn name(&self) -> &str {
        "jack"
    }

    fn sample_rate(&self) -> u32 {
        self.client.sample_rate()
    }

    fn register(&mut self, channels: usize) -> Result<(), StreamPcmError> {
        for index in 1..=channels {
            let short_name = index.to_string();
            let port = self
                .client
                .register_port(&short_name, AudioIn::default())
                .map_err(|e| StreamPcmError::PortRegistration {
                    port: short_name.clone(),
                    reason: e.to_string(),
                })?;

            if self.verbose {
                let full_name = port.name().unwrap_or(short_name);
                tracing::info!("Port {} registered", full_name);
            }
            self.ports.push(port);
        }
        Ok(())
    }

    fn start(
        self: Box<Self>,
        producer: CaptureProducer,
        controller: Arc<LifecycleController>,
        sources: &[String],
    ) -> Result<CaptureStream, StreamPcmError> {
        let JackBackend {
            client,
            ports,
            verbose,
        } = *self;

        if sources.len() != ports.len() || producer.channel_count() != ports.len() {
            return Err(StreamPcmError::PortCountMismatch {
                sources: sources.len(),
                ports: ports.len(),
            });
        }

        let destinations = ports
            .iter()
            .map(|port| port.name())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StreamPcmError::Backend(e.to_string()))?;

        let active = client
            .activate_async(
                ShutdownHandler { controller },
                CaptureHandler { producer, ports },
            )
            .map_err(|e| StreamPcmError::Activation {
                reason: e.to_string(),
            })?;

        connect_sources(&active, sources, &destinations, verbose)?;
        Ok(CaptureStream::new(active))
    }
}

fn connect_sources(
    active: &AsyncClient<ShutdownHandler, CaptureHandler>,
    sources: &[String],
    destinations: &[String],
    verbose: bool,
) -> Result<(), StreamPcmError> {
    for (source, destination) in sources.iter().zip(destinations) {
        active
            .as_client()
            .connect_ports_by_name(source, destination)
            .map_err(|e| StreamPcmError::Connection {
                source_port: source.clone(),
                reason: e.to_string(),
            })?;

        if verbose {
            tracing::info!("Connected {} to {}", source, destination);
        }
    }
    Ok(())
}

/// Realtime process callback.
struct CaptureHandler {
    producer: CaptureProducer,
    ports: Vec<Port<AudioIn>>,
}

impl ProcessHandler for CaptureHandler {
    fn process(&mut self, _: &Client, ps: &ProcessScope) -> Control {
        let ports = &self.ports;
        let frames = ps.n_frames() as usize;

        match self
            .producer
            .on_audio_ready(frames, |channel| ports[channel].as_slice(ps))
        {
            Ok(()) => Control::Continue,
            Err(fault) => {
                self.producer.controller().report_fault(fault);
                Control::Quit
            }
        }
    }
}

/// Forwards the server's shutdown notification to the controller.
///
/// Runs on a JACK thread; the session does the logging.
struct ShutdownHandler {
    controller: Arc<LifecycleController>,
}

#[allow(unsafe_code)] // NotificationHandler::shutdown is declared unsafe by the jack crate
impl NotificationHandler for ShutdownHandler {
    unsafe fn shutdown(&mut self, _status: ClientStatus, _reason: &str) {
        self.controller.request_shutdown();
    }
}

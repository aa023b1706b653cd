//! stream-pcm - capture JACK ports and write interleaved 16-bit PCM to stdout
//!
//! Registers one input port per source, connects the sources in order and
//! streams raw, headerless samples until the JACK server shuts down.
//! Diagnostics go to stderr.

use std::process::ExitCode;

use clap::Parser;
use stream_pcm::{
    parse_buffer_size, ByteOrder, JackBackend, SessionStats, StreamConfig, StreamPcm,
    StreamPcmError, WriterSink, DEFAULT_BLOCK_FRAMES,
};
use tracing::{debug, error, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "stream-pcm", version)]
#[command(about = "Stream JACK ports to stdout as interleaved 16-bit PCM", long_about = None)]
struct Args {
    /// Name for this JACK client (default stream-pcm-PID)
    #[arg(short, long)]
    name: Option<String>,

    /// Ring buffer size in bytes per port (k or M suffix accepted)
    #[arg(short, long, default_value = "1M", value_parser = parse_buffer_size)]
    buffer_size: usize,

    /// Frames per channel drained and written per block
    #[arg(long, default_value_t = DEFAULT_BLOCK_FRAMES)]
    block_frames: usize,

    /// Swap the byte order of every output sample
    #[arg(short = 'x', long)]
    swap_bytes: bool,

    /// Don't display progress information
    #[arg(short, long)]
    quiet: bool,

    /// JACK ports to capture, in output channel order
    ports: Vec<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.quiet { Level::WARN } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install logger: {e}");
    }

    let config = StreamConfig {
        client_name: args.name,
        buffer_bytes: args.buffer_size,
        block_frames: args.block_frames,
        source_ports: args.ports,
        byte_order: ByteOrder::from_swap(args.swap_bytes),
        verbose: !args.quiet,
        ..Default::default()
    };

    match run(config).await {
        Ok(stats) => {
            debug!(
                "Wrote {} blocks, {} frames, {} bytes",
                stats.blocks_written, stats.frames_written, stats.bytes_written
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: StreamConfig) -> Result<SessionStats, StreamPcmError> {
    // Reject bad arguments before touching the server
    config.validate()?;
    let backend = JackBackend::open(&config.resolved_client_name(), config.verbose)?;

    StreamPcm::builder()
        .config(config)
        .backend(backend)
        .sink(WriterSink::stdout())
        .run()
        .await
}

//! Mock capture example.
//!
//! Streams a stereo sine pair from the built-in mock server into a raw PCM
//! file, without needing a JACK server.
//!
//! Run with: cargo run --example mock_capture -- [OUTPUT]
//!
//! Play back with: aplay -f S16_LE -c 2 -r 48000 capture.pcm

use std::time::Duration;

use stream_pcm::{MockServer, StreamConfig, StreamPcm, WriterSink};

const SAMPLE_RATE: u32 = 48_000;
const FRAMES_PER_CYCLE: usize = 256;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "capture.pcm".to_string());
    let file = tokio::fs::File::create(&path).await?;

    // Two seconds of audio, paced like a real server
    let cycles = u64::from(SAMPLE_RATE) * 2 / FRAMES_PER_CYCLE as u64;
    let server = MockServer::new()
        .sample_rate(SAMPLE_RATE)
        .frames_per_cycle(FRAMES_PER_CYCLE)
        .cycles(cycles)
        .cycle_interval(Duration::from_micros(
            1_000_000 * FRAMES_PER_CYCLE as u64 / u64::from(SAMPLE_RATE),
        ))
        .generator(|channel, frame| {
            let freq = if channel == 0 { 440.0 } else { 660.0 };
            let t = frame as f32 / SAMPLE_RATE as f32;
            0.5 * (2.0 * std::f32::consts::PI * freq * t).sin()
        })
        .shutdown_when_drained(true);

    let config = StreamConfig {
        client_name: Some("mock-capture".to_string()),
        source_ports: vec!["system:capture_1".into(), "system:capture_2".into()],
        verbose: true,
        ..Default::default()
    };

    println!("Capturing to {path}...");
    let stats = StreamPcm::builder()
        .config(config)
        .backend(server)
        .sink(WriterSink::new(path.clone(), file))
        .run()
        .await?;

    println!(
        "Done: {} blocks, {} frames, {} bytes",
        stats.blocks_written, stats.frames_written, stats.bytes_written
    );
    Ok(())
}

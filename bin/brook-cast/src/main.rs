use std::path::PathBuf;

use brook_sim::{LinkConfig, ScenarioConfig};
use brook_stream::StreamConfig;
use clap::Parser;
use log::info;

#[derive(Parser)]
#[command(about = "Streams a coded video trace across a simulated lossy link")]
struct Cli {
    /// Trace file (frameId packetId payloadSize txTimeSeconds layerId per
    /// line); the built-in two-frame clip when omitted.
    #[arg(long)] trace: Option<PathBuf>,
    #[arg(long, default_value_t = 1400)] mtu: usize,
    /// Redundancy fraction, e.g. 0.5 sends 50% extra coded packets.
    #[arg(long, default_value_t = 0.5)] overhead: f64,
    #[arg(long, default_value_t = 60.0)] frame_rate: f64,
    #[arg(long, default_value_t = 600)] total_frames: u32,
    /// Channel drop probability in [0, 1].
    #[arg(long, default_value_t = 0.05)] loss: f64,
    #[arg(long, default_value_t = 2000)] latency_us: u64,
    #[arg(long, default_value_t = 500)] jitter_us: u64,
    /// Loss window bitmap size; multiple of 8 within 8..=256.
    #[arg(long, default_value_t = 32)] window: u16,
    /// Abandon a generation after this long without an arrival.
    #[arg(long, default_value_t = 250)] abandon_ms: u64,
    /// Virtual stream time in seconds.
    #[arg(long, default_value_t = 2.0)] duration: f64,
    /// Run seed; drawn from the OS when omitted.
    #[arg(long)] seed: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    info!(">>> BROOK CAST: RLNC video stream over a lossy link <<<");

    let trace = match &cli.trace {
        Some(path) => brook_sim::load_trace(path)?,
        None => brook_core::default_trace(),
    };
    let seed = cli.seed.unwrap_or_else(rand::random);
    info!("trace: {} entries, seed {}", trace.len(), seed);

    let config = ScenarioConfig {
        stream: StreamConfig {
            mtu: cli.mtu,
            overhead: cli.overhead,
            frame_rate: cli.frame_rate,
            total_frames: cli.total_frames,
        },
        link: LinkConfig {
            loss: cli.loss,
            latency_us: cli.latency_us,
            jitter_us: cli.jitter_us,
        },
        loss_window: cli.window,
        abandon_after_us: cli.abandon_ms * 1_000,
        max_in_flight: 8,
        duration_us: (cli.duration * 1_000_000.0) as u64,
        seed,
    };

    let report = brook_sim::run_scenario(config, trace)?;
    println!("{}", report);
    Ok(())
}

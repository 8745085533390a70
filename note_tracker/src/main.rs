//! note_tracker: runs the note detector against a camera (or a folder of frames) and
//! publishes one steering value per cycle in which a note is visible.

mod publisher;
mod sources;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::info;
use note_vision::config::TUNED_CLUSTERS;
use note_vision::{CycleDriver, FrameSource, NotePipeline, PipelineConfig, TelemetryPublisher};
use publisher::{LogPublisher, UdpPublisher};
use sources::{ImageDirSource, Primed};
use std::path::PathBuf;

/// How many reads to try before giving up on learning the frame geometry.
const FIRST_FRAME_ATTEMPTS: usize = 30;

#[derive(Parser, Debug)]
#[command(name = "note_tracker")]
#[command(about = "Detect orange notes in camera frames and publish a steering value")]
#[command(version)]
struct Cli {
    /// JSON pipeline config. Missing fields take their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Replay the images in this directory instead of opening a camera.
    #[arg(long)]
    frames: Option<PathBuf>,

    /// Restart the image directory from the top when it runs out.
    #[arg(long = "loop", requires = "frames")]
    looping: bool,

    /// Index of the capture device.
    #[cfg(feature = "camera")]
    #[arg(long, default_value_t = 0)]
    camera: i32,

    /// Switch colour quantization on with the tuned cluster count, unless the config
    /// already sets one.
    #[arg(long)]
    quantize: bool,

    /// Stop after this many cycles. Runs until interrupted when omitted.
    #[arg(long)]
    cycles: Option<u64>,

    /// host:port of the UDP telemetry listener. Values are logged when omitted.
    #[arg(long)]
    telemetry: Option<String>,

    /// Print the effective config as JSON and exit.
    #[arg(long)]
    print_config: bool,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let env = env_logger::Env::default().default_filter_or(cli.log_level.as_str());
    env_logger::Builder::from_env(env).init();

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load_json(path)
            .with_context(|| format!("loading pipeline config from {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if cli.quantize && !config.quantization.enabled() {
        config.quantization.clusters = TUNED_CLUSTERS;
    }
    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let source = open_source(&cli)?;
    let source = Primed::new(source, FIRST_FRAME_ATTEMPTS).context("reading the first frame")?;
    let Some((width, height)) = source.dimensions() else {
        bail!("frame source produced no geometry");
    };

    let pipeline =
        NotePipeline::new(config, width, height).context("building the note pipeline")?;
    let publisher: Box<dyn TelemetryPublisher> = match &cli.telemetry {
        Some(addr) => Box::new(
            UdpPublisher::connect(addr.as_str())
                .with_context(|| format!("opening telemetry socket to {addr}"))?,
        ),
        None => Box::new(LogPublisher),
    };

    let mut driver = CycleDriver::new(pipeline, source, publisher);
    let stats = driver.run(cli.cycles)?;
    info!("done after {} cycles ({} published)", stats.cycles, stats.published);
    Ok(())
}

fn open_source(cli: &Cli) -> Result<Box<dyn FrameSource>> {
    if let Some(dir) = &cli.frames {
        let source = ImageDirSource::open(dir, cli.looping)
            .with_context(|| format!("listing frames in {}", dir.display()))?;
        if source.is_empty() {
            bail!("no images found in {}", dir.display());
        }
        return Ok(Box::new(source));
    }
    open_camera(cli)
}

#[cfg(feature = "camera")]
fn open_camera(cli: &Cli) -> Result<Box<dyn FrameSource>> {
    let camera = sources::CameraSource::open(cli.camera)
        .with_context(|| format!("opening camera {}", cli.camera))?;
    Ok(Box::new(camera))
}

#[cfg(not(feature = "camera"))]
fn open_camera(_cli: &Cli) -> Result<Box<dyn FrameSource>> {
    bail!("built without the `camera` feature; pass --frames <dir> to replay images")
}

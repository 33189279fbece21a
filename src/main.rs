use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use pantilt_rs::acquisition::spawn_acquisition;
use pantilt_rs::actuator;
use pantilt_rs::config::ActuatorKind;
use pantilt_rs::logging::init_logging;
use pantilt_rs::sim::{BrightBlobLocator, SyntheticSource};
use pantilt_rs::{Config, FrameChannel, StopSignal, TrackingLoop};

/// Point a pan/tilt mount at the target seen by the camera.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// TOML configuration file; built-in defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Never touch PWM hardware, only log the commanded angles
    #[arg(long)]
    simulate: bool,

    /// Log every iteration
    #[arg(short, long)]
    verbose: bool,
}

// Usage:
//  Frames: acquisition thread → FrameChannel (latest frame only)
//  Loop:   take frame → locate target → pan/tilt controllers → servos
//  Every ~1s: FPS | target center | Pan: p Tilt: t
fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("invalid configuration in {}", path.display()))?,
        None => Config::default(),
    };
    if args.simulate {
        config.actuator.kind = ActuatorKind::Simulated;
    }

    info!("Starting pan/tilt tracker...");
    info!(
        "  Camera: {}x{} @ {} fps, setpoint {}",
        config.camera.width,
        config.camera.height,
        config.camera.fps,
        config.camera.center()
    );
    info!(
        "  Pan:  [{}, {}]°, dead zone {}px, gain {}, sign {:?}",
        config.pan.min_angle,
        config.pan.max_angle,
        config.pan.dead_zone_px,
        config.pan.gain,
        config.pan.sign_convention
    );
    info!(
        "  Tilt: [{}, {}]°, dead zone {}px, gain {}, sign {:?}",
        config.tilt.min_angle,
        config.tilt.max_angle,
        config.tilt.dead_zone_px,
        config.tilt.gain,
        config.tilt.sign_convention
    );

    let stop = StopSignal::new();
    let handler_stop = stop.clone();
    ctrlc::set_handler(move || handler_stop.request_stop())
        .context("failed to install Ctrl+C handler")?;

    let actuator = actuator::connect(&config.actuator).context("failed to open actuator")?;

    // No camera collaborator is wired in yet: drive the loop from the
    // synthetic scene and the brightness locator.
    let channel = Arc::new(FrameChannel::new());
    let source = SyntheticSource::new(config.camera.width, config.camera.height, config.camera.fps);
    let acquisition = spawn_acquisition(
        source,
        Arc::clone(&channel),
        stop.clone(),
        config.tracking.max_acquisition_failures,
    )
    .context("failed to start acquisition thread")?;

    let locator = BrightBlobLocator::new(config.detection.confidence_threshold);
    let mut tracking = TrackingLoop::new(&config, channel, locator, actuator)?;

    tracking.home();
    tracking.run(&stop);

    // Loop may have ended on its own; make sure acquisition follows.
    stop.request_stop();
    match acquisition.join() {
        Ok(exit) => info!("Acquisition finished: {:?}", exit),
        Err(_) => warn!("Acquisition thread panicked"),
    }

    info!("Shutdown complete");
    Ok(())
}

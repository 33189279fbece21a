use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use pantilt_rs::actuator;
use pantilt_rs::logging::init_logging;
use pantilt_rs::{ActuatorPort, Axis, Config};

/// Sweep each servo through its range to check wiring and direction.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// TOML configuration file; built-in defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// How long to hold each position (milliseconds)
    #[arg(long, default_value = "1500")]
    dwell_ms: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(false);

    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("invalid configuration in {}", path.display()))?,
        None => Config::default(),
    };
    let dwell = Duration::from_millis(args.dwell_ms);

    println!("╔══════════════════════════════════════════════════════╗");
    println!("║     Pan/Tilt Servo Calibration                       ║");
    println!("╚══════════════════════════════════════════════════════╝\n");

    println!("Instructions:");
    println!("1. Keep hands clear of the mount");
    println!("2. Each axis moves: home → min → home → max → home");
    println!("3. Watch which way the CAMERA VIEW moves as the angle INCREASES");
    println!("4. Pan:  view moves RIGHT as angle increases → sign_convention = -1, else 1");
    println!("5. Tilt: view moves DOWN as angle increases  → sign_convention = -1, else 1\n");

    let mut port = actuator::connect(&config.actuator).context("failed to open actuator")?;
    println!("Actuator: {}\n", port.name());

    println!("Starting in 3 seconds...\n");
    thread::sleep(Duration::from_secs(3));

    println!("{:^6} | {:^10} | {:^10}", "Axis", "Step", "Angle");
    println!("{:-<6}-+-{:-<10}-+-{:-<10}", "", "", "");

    for axis in [Axis::Pan, Axis::Tilt] {
        let axis_config = config.axis(axis);
        let sweep = [
            ("home", axis_config.home_angle),
            ("min", axis_config.min_angle),
            ("home", axis_config.home_angle),
            ("max", axis_config.max_angle),
            ("home", axis_config.home_angle),
        ];

        for (step, angle) in sweep {
            println!("{:^6} | {:^10} | {:>8.1}°", axis.to_string(), step, angle);
            if let Err(e) = port.set_angle(axis, angle) {
                println!("  ✗ command failed: {}", e);
            }
            thread::sleep(dwell);
        }
    }

    println!("\nDone. Record the sign_convention values in your config file:");
    println!("  [pan]\n  sign_convention = <1 or -1>\n");
    println!("  [tilt]\n  sign_convention = <1 or -1>");
    Ok(())
}

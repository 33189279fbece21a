use std::fmt;
use std::time::Instant;

use tracing::info;

use crate::target::PixelPoint;

/// Snapshot of the loop, rebuilt every iteration.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LoopTelemetry {
    pub frames_per_second: f64,
    pub last_target_center: Option<PixelPoint>,
    pub pan_angle: f64,
    pub tilt_angle: f64,
    /// Frames overwritten in the channel before the loop could take them.
    pub frames_dropped: u64,
}

impl fmt::Display for LoopTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FPS: {:.0}", self.frames_per_second)?;
        match self.last_target_center {
            Some(center) => write!(f, " | target {}", center)?,
            None => write!(f, " | no target")?,
        }
        write!(
            f,
            " | Pan: {} Tilt: {} | dropped {}",
            self.pan_angle as i32, self.tilt_angle as i32, self.frames_dropped
        )
    }
}

/// Instantaneous rate from the gap between consecutive iteration starts.
#[derive(Debug, Default)]
pub struct FpsMeter {
    previous: Option<Instant>,
}

impl FpsMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an iteration start. Returns 0 until two ticks have been seen.
    pub fn tick(&mut self, now: Instant) -> f64 {
        let fps = match self.previous {
            Some(previous) => {
                let elapsed = now.saturating_duration_since(previous).as_secs_f64();
                if elapsed > 0.0 { 1.0 / elapsed } else { 0.0 }
            }
            None => 0.0,
        };
        self.previous = Some(now);
        fps
    }
}

/// Decides when to publish telemetry: every N iterations, N being the
/// measured rate, which works out to roughly once per second.
#[derive(Debug, Default)]
pub struct StatusCadence {
    since_report: u64,
}

impl StatusCadence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn should_report(&mut self, frames_per_second: f64) -> bool {
        let every = if frames_per_second.is_finite() && frames_per_second >= 1.0 {
            frames_per_second.round() as u64
        } else {
            1
        };

        self.since_report += 1;
        if self.since_report >= every {
            self.since_report = 0;
            true
        } else {
            false
        }
    }
}

/// Receives periodic telemetry. The format is up to the sink.
pub trait TelemetrySink {
    fn report(&mut self, telemetry: &LoopTelemetry);
}

impl<F: FnMut(&LoopTelemetry)> TelemetrySink for F {
    fn report(&mut self, telemetry: &LoopTelemetry) {
        self(telemetry)
    }
}

/// Writes telemetry to the log at info level.
#[derive(Debug, Default)]
pub struct LogSink;

impl TelemetrySink for LogSink {
    fn report(&mut self, telemetry: &LoopTelemetry) {
        info!("{}", telemetry);
    }
}

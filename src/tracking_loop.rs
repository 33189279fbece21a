use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::actuator::ActuatorPort;
use crate::axis::{Axis, AxisController, AxisStep};
use crate::config::Config;
use crate::error::ConfigError;
use crate::frame_channel::FrameChannel;
use crate::stop::StopSignal;
use crate::target::{PixelPoint, TargetLocator};
use crate::telemetry::{FpsMeter, LogSink, LoopTelemetry, StatusCadence, TelemetrySink};

/// What a single iteration did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Iteration {
    /// The channel was empty.
    NoFrame,
    /// A frame was processed but nothing was found (or the locator failed).
    NoTarget,
    /// The primary target was followed.
    Tracked {
        center: PixelPoint,
        pan: AxisStep,
        tilt: AxisStep,
    },
}

/// Running counters, logged when the loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub iterations: u64,
    pub frames: u64,
    pub tracked: u64,
    pub locator_failures: u64,
    pub actuator_failures: u64,
}

/// Pulls frames, finds the target and steers the mount toward it.
///
/// Single-threaded: each iteration finishes its locator call and both
/// actuator commands before the next begins.
pub struct TrackingLoop<L, A> {
    channel: Arc<FrameChannel>,
    locator: L,
    actuator: A,
    pan: AxisController,
    tilt: AxisController,
    setpoint: PixelPoint,
    fps: FpsMeter,
    cadence: StatusCadence,
    telemetry: LoopTelemetry,
    sink: Box<dyn TelemetrySink>,
    stats: LoopStats,
    stall_timeout: Duration,
    idle_backoff: Duration,
    idle_report_interval: Duration,
    last_frame_at: Instant,
    last_report_at: Instant,
    stalled: bool,
}

impl<L, A> TrackingLoop<L, A>
where
    L: TargetLocator,
    A: ActuatorPort,
{
    pub fn new(
        config: &Config,
        channel: Arc<FrameChannel>,
        locator: L,
        actuator: A,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let pan = AxisController::new(Axis::Pan, config.pan)?;
        let tilt = AxisController::new(Axis::Tilt, config.tilt)?;
        let telemetry = LoopTelemetry {
            pan_angle: pan.commanded_angle(),
            tilt_angle: tilt.commanded_angle(),
            ..LoopTelemetry::default()
        };

        Ok(Self {
            channel,
            locator,
            actuator,
            pan,
            tilt,
            setpoint: config.camera.center(),
            fps: FpsMeter::new(),
            cadence: StatusCadence::new(),
            telemetry,
            sink: Box::new(LogSink),
            stats: LoopStats::default(),
            stall_timeout: config.tracking.stall_timeout(),
            idle_backoff: config.tracking.idle_backoff(),
            idle_report_interval: config.tracking.idle_report_interval(),
            last_frame_at: Instant::now(),
            last_report_at: Instant::now(),
            stalled: false,
        })
    }

    /// Replace the default log sink.
    pub fn with_sink(mut self, sink: impl TelemetrySink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn setpoint(&self) -> PixelPoint {
        self.setpoint
    }

    pub fn commanded_angle(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Pan => self.pan.commanded_angle(),
            Axis::Tilt => self.tilt.commanded_angle(),
        }
    }

    pub fn telemetry(&self) -> &LoopTelemetry {
        &self.telemetry
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn is_stalled(&self) -> bool {
        self.stalled
    }

    /// Drive both axes to their current (home) angle.
    pub fn home(&mut self) {
        info!(
            "Homing mount to pan {:.1}°, tilt {:.1}° via {} actuator",
            self.pan.commanded_angle(),
            self.tilt.commanded_angle(),
            self.actuator.name()
        );
        self.command_both();
    }

    /// Run one iteration. Never blocks except inside the locator.
    pub fn step(&mut self) -> Iteration {
        let started = Instant::now();
        self.stats.iterations += 1;

        let Some(frame) = self.channel.take() else {
            self.telemetry.last_target_center = None;
            self.check_stall(started);
            self.report_idle(started);
            return Iteration::NoFrame;
        };

        if self.stalled {
            info!("Frames resumed with {}", frame);
            self.stalled = false;
        }
        self.last_frame_at = started;
        self.stats.frames += 1;

        let targets = match self.locator.locate(&frame) {
            Ok(targets) => targets,
            Err(e) => {
                // One bad frame is not worth stopping for.
                warn!("Locator failed on {}: {}", frame, e);
                self.stats.locator_failures += 1;
                Vec::new()
            }
        };

        let outcome = match targets.first() {
            Some(primary) => {
                let center = primary.center;
                let pan = self.pan.update(center.x, self.setpoint.x);
                let tilt = self.tilt.update(center.y, self.setpoint.y);
                self.command_both();
                self.stats.tracked += 1;
                Iteration::Tracked { center, pan, tilt }
            }
            // Hold position rather than re-centering.
            None => Iteration::NoTarget,
        };

        self.update_telemetry(started, &outcome);
        outcome
    }

    /// Iterate until `stop` is raised. Sleeps briefly when no frame is waiting.
    pub fn run(&mut self, stop: &StopSignal) -> LoopStats {
        info!(
            "Tracking loop started, setpoint {} (Ctrl+C to stop)",
            self.setpoint
        );

        while !stop.is_stop_requested() {
            if self.step() == Iteration::NoFrame {
                thread::sleep(self.idle_backoff);
            }
        }

        let stats = self.stats;
        info!(
            "Loop stopped: {} frames, {} tracked, {} dropped, failures: {} locator, {} actuator",
            stats.frames,
            stats.tracked,
            self.channel.frames_dropped(),
            stats.locator_failures,
            stats.actuator_failures
        );
        stats
    }

    fn command_both(&mut self) {
        for axis in [Axis::Pan, Axis::Tilt] {
            let degrees = self.commanded_angle(axis);
            if let Err(e) = self.actuator.set_angle(axis, degrees) {
                // The controller keeps its angle; only the physical move was lost.
                warn!("Failed to move {} to {:.1}°: {}", axis, degrees, e);
                self.stats.actuator_failures += 1;
            }
        }
    }

    fn check_stall(&mut self, now: Instant) {
        if self.stalled {
            return;
        }
        let waited = now.saturating_duration_since(self.last_frame_at);
        if waited >= self.stall_timeout {
            warn!(
                "No new frame for {:.1}s, acquisition may have stalled",
                waited.as_secs_f64()
            );
            self.stalled = true;
        }
    }

    fn update_telemetry(&mut self, started: Instant, outcome: &Iteration) {
        let frames_per_second = self.fps.tick(started);

        self.telemetry = LoopTelemetry {
            frames_per_second,
            last_target_center: match outcome {
                Iteration::Tracked { center, .. } => Some(*center),
                _ => None,
            },
            pan_angle: self.pan.commanded_angle(),
            tilt_angle: self.tilt.commanded_angle(),
            frames_dropped: self.channel.frames_dropped(),
        };

        debug!("{}", self.telemetry);

        if self.cadence.should_report(frames_per_second) {
            self.publish(started);
        }
    }

    /// Keep telemetry flowing while the camera is silent.
    fn report_idle(&mut self, now: Instant) {
        let quiet_since = self.last_frame_at.max(self.last_report_at);
        if now.saturating_duration_since(quiet_since) < self.idle_report_interval {
            return;
        }

        self.telemetry.frames_per_second = 0.0;
        self.telemetry.frames_dropped = self.channel.frames_dropped();
        self.publish(now);
    }

    fn publish(&mut self, now: Instant) {
        self.last_report_at = now;
        self.sink.report(&self.telemetry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ActuatorError, LocatorError};
    use crate::frame::Frame;
    use crate::target::{BoundingBox, TargetCandidate};
    use approx::assert_relative_eq;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    // region: TEST_DOUBLES
    #[derive(Default)]
    struct ScriptedLocator {
        script: VecDeque<Result<Vec<TargetCandidate>, LocatorError>>,
        calls: usize,
    }

    impl ScriptedLocator {
        fn push_target(&mut self, x: i32, y: i32) {
            let bbox = BoundingBox::new(x - 10, y - 10, 20, 20);
            self.script
                .push_back(Ok(vec![TargetCandidate::from_bounding_box(0, bbox, 0.9)]));
        }

        fn push_none(&mut self) {
            self.script.push_back(Ok(Vec::new()));
        }

        fn push_error(&mut self) {
            self.script
                .push_back(Err(LocatorError::Detector("model crashed".into())));
        }
    }

    impl TargetLocator for ScriptedLocator {
        fn locate(&mut self, _frame: &Frame) -> Result<Vec<TargetCandidate>, LocatorError> {
            self.calls += 1;
            self.script.pop_front().unwrap_or(Ok(Vec::new()))
        }
    }

    #[derive(Default)]
    struct RecordingActuator {
        commands: Vec<(Axis, f64)>,
        fail: bool,
    }

    impl ActuatorPort for RecordingActuator {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn set_angle(&mut self, axis: Axis, degrees: f64) -> Result<(), ActuatorError> {
            if self.fail {
                return Err(ActuatorError::InvalidPin(0));
            }
            self.commands.push((axis, degrees));
            Ok(())
        }
    }
    // endregion: TEST_DOUBLES

    /// 320x240 camera, so the setpoint is (160, 120).
    fn test_config() -> Config {
        let mut config = Config::default();
        config.camera.width = 320;
        config.camera.height = 240;
        config
    }

    fn build(
        config: &Config,
        locator: ScriptedLocator,
    ) -> (
        TrackingLoop<ScriptedLocator, RecordingActuator>,
        Arc<FrameChannel>,
    ) {
        let channel = Arc::new(FrameChannel::new());
        let tracking = TrackingLoop::new(
            config,
            Arc::clone(&channel),
            locator,
            RecordingActuator::default(),
        )
        .unwrap();
        (tracking, channel)
    }

    fn put_frame(channel: &FrameChannel, sequence: u64) {
        channel.put(Frame::filled(sequence, 320, 240, 0));
    }

    #[test]
    fn test_target_right_of_center_moves_pan() {
        let mut locator = ScriptedLocator::default();
        locator.push_target(200, 120);
        let (mut tracking, channel) = build(&test_config(), locator);
        assert_eq!(tracking.setpoint(), PixelPoint::new(160, 120));

        put_frame(&channel, 1);
        let outcome = tracking.step();

        assert_eq!(
            outcome,
            Iteration::Tracked {
                center: PixelPoint::new(200, 120),
                pan: AxisStep::Tracking(94.0),
                tilt: AxisStep::Idle,
            }
        );
        assert_relative_eq!(tracking.commanded_angle(Axis::Pan), 94.0, epsilon = 1e-9);
        assert_eq!(tracking.commanded_angle(Axis::Tilt), 90.0);
        assert_eq!(
            tracking.actuator().commands,
            vec![(Axis::Pan, 94.0), (Axis::Tilt, 90.0)]
        );
        assert_eq!(
            tracking.telemetry().last_target_center,
            Some(PixelPoint::new(200, 120))
        );
    }

    #[test]
    fn test_target_inside_dead_zone_holds_angles() {
        let mut locator = ScriptedLocator::default();
        locator.push_target(170, 120);
        let (mut tracking, channel) = build(&test_config(), locator);

        put_frame(&channel, 1);
        let outcome = tracking.step();

        assert!(matches!(
            outcome,
            Iteration::Tracked {
                pan: AxisStep::Idle,
                tilt: AxisStep::Idle,
                ..
            }
        ));
        assert_eq!(tracking.commanded_angle(Axis::Pan), 90.0);
        assert_eq!(tracking.commanded_angle(Axis::Tilt), 90.0);
    }

    #[test]
    fn test_no_target_sends_no_commands() {
        let mut locator = ScriptedLocator::default();
        locator.push_target(260, 200);
        for _ in 0..5 {
            locator.push_none();
        }
        let (mut tracking, channel) = build(&test_config(), locator);

        put_frame(&channel, 0);
        tracking.step();
        let pan = tracking.commanded_angle(Axis::Pan);
        let tilt = tracking.commanded_angle(Axis::Tilt);
        let sent = tracking.actuator().commands.len();

        for sequence in 1..=5 {
            put_frame(&channel, sequence);
            assert_eq!(tracking.step(), Iteration::NoTarget);
        }

        assert_eq!(tracking.commanded_angle(Axis::Pan), pan);
        assert_eq!(tracking.commanded_angle(Axis::Tilt), tilt);
        assert_eq!(tracking.actuator().commands.len(), sent);
        assert_eq!(tracking.telemetry().last_target_center, None);
    }

    #[test]
    fn test_pan_clamps_at_max_angle() {
        let mut config = test_config();
        config.pan.home_angle = 178.0;
        let mut locator = ScriptedLocator::default();
        locator.push_target(230, 120);
        let (mut tracking, channel) = build(&config, locator);

        put_frame(&channel, 1);
        tracking.step();

        assert_eq!(tracking.commanded_angle(Axis::Pan), 180.0);
    }

    #[test]
    fn test_locator_error_is_treated_as_no_target() {
        let mut locator = ScriptedLocator::default();
        locator.push_error();
        locator.push_target(200, 120);
        let (mut tracking, channel) = build(&test_config(), locator);

        put_frame(&channel, 1);
        assert_eq!(tracking.step(), Iteration::NoTarget);
        assert!(tracking.actuator().commands.is_empty());
        assert_eq!(tracking.stats().locator_failures, 1);

        put_frame(&channel, 2);
        assert!(matches!(tracking.step(), Iteration::Tracked { .. }));
        assert_relative_eq!(tracking.commanded_angle(Axis::Pan), 94.0, epsilon = 1e-9);
    }

    #[test]
    fn test_empty_channel_skips_locator() {
        let (mut tracking, _channel) = build(&test_config(), ScriptedLocator::default());

        assert_eq!(tracking.step(), Iteration::NoFrame);
        assert_eq!(tracking.step(), Iteration::NoFrame);

        assert_eq!(tracking.stats().iterations, 2);
        assert_eq!(tracking.stats().frames, 0);
        assert_eq!(tracking.locator.calls, 0);
        assert!(tracking.actuator().commands.is_empty());
    }

    #[test]
    fn test_telemetry_continues_without_frames() {
        let mut config = test_config();
        config.tracking.idle_report_ms = 0;
        let mut locator = ScriptedLocator::default();
        locator.push_target(200, 120);
        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink_reports = Arc::clone(&reports);

        let (tracking, channel) = build(&config, locator);
        let mut tracking = tracking.with_sink(move |t: &LoopTelemetry| {
            sink_reports.lock().unwrap().push(*t);
        });

        put_frame(&channel, 1);
        tracking.step();
        assert_eq!(tracking.step(), Iteration::NoFrame);
        assert_eq!(tracking.step(), Iteration::NoFrame);

        let reports = reports.lock().unwrap();
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].last_target_center, Some(PixelPoint::new(200, 120)));
        for idle in &reports[1..] {
            assert_eq!(idle.last_target_center, None);
            assert_eq!(idle.frames_per_second, 0.0);
            assert_relative_eq!(idle.pan_angle, 94.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_idle_report_waits_for_interval() {
        let reports = Arc::new(Mutex::new(0usize));
        let sink_reports = Arc::clone(&reports);

        let (tracking, _channel) = build(&test_config(), ScriptedLocator::default());
        let mut tracking = tracking.with_sink(move |_: &LoopTelemetry| {
            *sink_reports.lock().unwrap() += 1;
        });

        for _ in 0..10 {
            assert_eq!(tracking.step(), Iteration::NoFrame);
        }
        assert_eq!(*reports.lock().unwrap(), 0);
    }

    #[test]
    fn test_each_frame_is_processed_once() {
        let mut locator = ScriptedLocator::default();
        locator.push_target(200, 120);
        locator.push_target(200, 120);
        let (mut tracking, channel) = build(&test_config(), locator);

        put_frame(&channel, 1);
        tracking.step();
        assert_eq!(tracking.step(), Iteration::NoFrame);
        assert_relative_eq!(tracking.commanded_angle(Axis::Pan), 94.0, epsilon = 1e-9);
    }

    #[test]
    fn test_actuator_failure_keeps_controller_state() {
        let mut locator = ScriptedLocator::default();
        locator.push_target(200, 120);
        locator.push_target(200, 120);
        let (mut tracking, channel) = build(&test_config(), locator);
        tracking.actuator.fail = true;

        put_frame(&channel, 1);
        tracking.step();
        assert_relative_eq!(tracking.commanded_angle(Axis::Pan), 94.0, epsilon = 1e-9);
        assert_eq!(tracking.stats().actuator_failures, 2);

        // Next frame still runs.
        tracking.actuator.fail = false;
        put_frame(&channel, 2);
        tracking.step();
        assert_relative_eq!(tracking.commanded_angle(Axis::Pan), 98.0, epsilon = 1e-9);
        assert_eq!(tracking.actuator().commands.len(), 2);
    }

    #[test]
    fn test_repeated_dead_zone_target_does_not_drift() {
        let mut locator = ScriptedLocator::default();
        for _ in 0..200 {
            locator.push_target(185, 140);
        }
        let (mut tracking, channel) = build(&test_config(), locator);

        for sequence in 0..200 {
            put_frame(&channel, sequence);
            tracking.step();
        }

        assert_eq!(tracking.commanded_angle(Axis::Pan), 90.0);
        assert_eq!(tracking.commanded_angle(Axis::Tilt), 90.0);
    }

    #[test]
    fn test_first_candidate_is_primary() {
        let mut locator = ScriptedLocator::default();
        locator.script.push_back(Ok(vec![
            TargetCandidate::from_bounding_box(0, BoundingBox::new(30, 110, 20, 20), 0.6),
            TargetCandidate::from_bounding_box(1, BoundingBox::new(250, 110, 20, 20), 0.99),
        ]));
        let (mut tracking, channel) = build(&test_config(), locator);

        put_frame(&channel, 1);
        let outcome = tracking.step();

        assert!(matches!(
            outcome,
            Iteration::Tracked { center, .. } if center == PixelPoint::new(40, 120)
        ));
        // Target left of center with pan sign -1 turns the angle down.
        assert!(tracking.commanded_angle(Axis::Pan) < 90.0);
    }

    #[test]
    fn test_stall_detection_and_recovery() {
        let mut config = test_config();
        config.tracking.stall_timeout_ms = 0;
        let (mut tracking, channel) = build(&config, ScriptedLocator::default());

        assert!(!tracking.is_stalled());
        tracking.step();
        assert!(tracking.is_stalled());

        put_frame(&channel, 1);
        tracking.step();
        assert!(!tracking.is_stalled());
    }

    #[test]
    fn test_home_commands_home_angles() {
        let mut config = test_config();
        config.tilt.home_angle = 45.0;
        let (mut tracking, _channel) = build(&config, ScriptedLocator::default());

        tracking.home();

        assert_eq!(
            tracking.actuator().commands,
            vec![(Axis::Pan, 90.0), (Axis::Tilt, 45.0)]
        );
    }

    #[test]
    fn test_run_stops_on_signal() {
        let mut locator = ScriptedLocator::default();
        locator.push_target(200, 120);
        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink_reports = Arc::clone(&reports);

        let (tracking, channel) = build(&test_config(), locator);
        let mut tracking = tracking.with_sink(move |t: &LoopTelemetry| {
            sink_reports.lock().unwrap().push(*t);
        });
        put_frame(&channel, 1);

        let stop = StopSignal::new();
        let stopper = stop.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            stopper.request_stop();
        });

        let stats = tracking.run(&stop);
        handle.join().unwrap();

        assert_eq!(stats.frames, 1);
        assert_eq!(stats.tracked, 1);
        assert!(stats.iterations >= 1);
        // The first processed frame has no rate yet, so it is reported.
        assert_eq!(reports.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = test_config();
        config.tilt.gain = 0.0;
        let result = TrackingLoop::new(
            &config,
            Arc::new(FrameChannel::new()),
            ScriptedLocator::default(),
            RecordingActuator::default(),
        );
        assert!(matches!(result, Err(ConfigError::Gain { axis: Axis::Tilt, .. })));
    }
}

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::axis::{Axis, AxisConfig};
use crate::error::ConfigError;
use crate::target::PixelPoint;

// ** CAMERA CONFIGURATION ** //

/// Capture resolution. Lower is faster on a Pi.
pub const CAMERA_WIDTH: u32 = 640;
pub const CAMERA_HEIGHT: u32 = 480;
pub const CAMERA_FPS: f64 = 30.0;

// ** DETECTION CONFIGURATION ** //

/// Minimum detector score, handed to the locator untouched.
pub const DETECTION_CONFIDENCE: f32 = 0.5;

//  ** SERVO CONFIGURATION ** //

/// GPIO PWM pins for servo control.
/// Hardware PWM is available on:
/// - GPIO 12 (PWM0)
/// - GPIO 13 (PWM1)
/// - GPIO 18 (PWM0)
/// - GPIO 19 (PWM1)
pub const PAN_PWM_PIN: u8 = 12;
pub const TILT_PWM_PIN: u8 = 13;
/// Hobby servo pulse width range (microseconds) covering the full 0-180° sweep.
pub const SERVO_MIN_PULSE_US: f64 = 500.0;
pub const SERVO_MAX_PULSE_US: f64 = 2500.0;
/// Standard servo PWM frequency (Hz)
pub const SERVO_FREQUENCY_HZ: f64 = 50.0;
/// Mechanical sweep covered by the pulse range (degrees)
pub const SERVO_RANGE_DEG: f64 = 180.0;

// ** LOOP CONFIGURATION ** //

pub const STALL_TIMEOUT_MS: u64 = 2000;
pub const IDLE_BACKOFF_MS: u64 = 2;
pub const MAX_ACQUISITION_FAILURES: u32 = 10;
/// Telemetry interval while no frames arrive
pub const IDLE_REPORT_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraConfig {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: CAMERA_WIDTH,
            height: CAMERA_HEIGHT,
            fps: CAMERA_FPS,
        }
    }
}

impl CameraConfig {
    /// The fixed setpoint: center of the image.
    pub fn center(&self) -> PixelPoint {
        PixelPoint::new((self.width / 2) as i32, (self.height / 2) as i32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectionConfig {
    pub confidence_threshold: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DETECTION_CONFIDENCE,
        }
    }
}

/// Which `ActuatorPort` implementation to start with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActuatorKind {
    /// Hardware servos, falling back to simulation when PWM is unavailable.
    #[default]
    Auto,
    Servo,
    Simulated,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ActuatorConfig {
    pub kind: ActuatorKind,
    pub pan_pin: u8,
    pub tilt_pin: u8,
    pub min_pulse_us: f64,
    pub max_pulse_us: f64,
    pub frequency_hz: f64,
    /// Servo angle reached at `max_pulse_us`; `min_pulse_us` is 0°.
    pub range_deg: f64,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            kind: ActuatorKind::Auto,
            pan_pin: PAN_PWM_PIN,
            tilt_pin: TILT_PWM_PIN,
            min_pulse_us: SERVO_MIN_PULSE_US,
            max_pulse_us: SERVO_MAX_PULSE_US,
            frequency_hz: SERVO_FREQUENCY_HZ,
            range_deg: SERVO_RANGE_DEG,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackingConfig {
    /// No fresh frame for this long is reported as a stall.
    pub stall_timeout_ms: u64,
    /// Sleep between polls when the frame channel is empty.
    pub idle_backoff_ms: u64,
    /// Consecutive source errors before acquisition gives up.
    pub max_acquisition_failures: u32,
    /// How often telemetry is still published while the channel stays empty.
    pub idle_report_ms: u64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            stall_timeout_ms: STALL_TIMEOUT_MS,
            idle_backoff_ms: IDLE_BACKOFF_MS,
            max_acquisition_failures: MAX_ACQUISITION_FAILURES,
            idle_report_ms: IDLE_REPORT_MS,
        }
    }
}

impl TrackingConfig {
    pub fn stall_timeout(&self) -> Duration {
        Duration::from_millis(self.stall_timeout_ms)
    }

    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }

    pub fn idle_report_interval(&self) -> Duration {
        Duration::from_millis(self.idle_report_ms)
    }
}

/// Complete deployment configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub camera: CameraConfig,
    pub pan: AxisConfig,
    pub tilt: AxisConfig,
    pub detection: DetectionConfig,
    pub actuator: ActuatorConfig,
    pub tracking: TrackingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            pan: AxisConfig::default_for(Axis::Pan),
            tilt: AxisConfig::default_for(Axis::Tilt),
            detection: DetectionConfig::default(),
            actuator: ActuatorConfig::default(),
            tracking: TrackingConfig::default(),
        }
    }
}

impl Config {
    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Parse and validate TOML text. Missing fields keep their defaults.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn axis(&self, axis: Axis) -> &AxisConfig {
        match axis {
            Axis::Pan => &self.pan,
            Axis::Tilt => &self.tilt,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let camera = &self.camera;
        if camera.width == 0 || camera.height == 0 {
            return Err(ConfigError::Resolution {
                width: camera.width,
                height: camera.height,
            });
        }
        if !camera.fps.is_finite() || camera.fps <= 0.0 {
            return Err(ConfigError::Fps(camera.fps));
        }

        self.pan.validate(Axis::Pan)?;
        self.tilt.validate(Axis::Tilt)?;

        let threshold = self.detection.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Confidence(threshold));
        }

        let actuator = &self.actuator;
        if actuator.min_pulse_us.is_nan()
            || actuator.max_pulse_us.is_nan()
            || actuator.min_pulse_us >= actuator.max_pulse_us
        {
            return Err(ConfigError::PulseRange {
                min_us: actuator.min_pulse_us,
                max_us: actuator.max_pulse_us,
            });
        }
        if !actuator.frequency_hz.is_finite() || actuator.frequency_hz <= 0.0 {
            return Err(ConfigError::Frequency(actuator.frequency_hz));
        }
        if !actuator.range_deg.is_finite() || actuator.range_deg <= 0.0 {
            return Err(ConfigError::ServoRange(actuator.range_deg));
        }

        // Angles outside the pulse mapping would all land on one end stop.
        for axis in [Axis::Pan, Axis::Tilt] {
            let limits = self.axis(axis);
            if limits.min_angle < 0.0 || limits.max_angle > actuator.range_deg {
                return Err(ConfigError::AxisBeyondServo {
                    axis,
                    min: limits.min_angle,
                    max: limits.max_angle,
                    servo_range: actuator.range_deg,
                });
            }
        }

        Ok(())
    }
}

use std::path::PathBuf;

use thiserror::Error;

use crate::axis::Axis;

/// Invalid deployment configuration. Only ever raised at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{axis}: min_angle {min} is greater than max_angle {max}")]
    AngleRange { axis: Axis, min: f64, max: f64 },

    #[error("{axis}: home_angle {home} is outside [{min}, {max}]")]
    HomeOutOfRange {
        axis: Axis,
        home: f64,
        min: f64,
        max: f64,
    },

    #[error("{axis}: gain must be positive and finite, got {gain}")]
    Gain { axis: Axis, gain: f64 },

    #[error("camera resolution must be non-zero, got {width}x{height}")]
    Resolution { width: u32, height: u32 },

    #[error("camera fps must be positive, got {0}")]
    Fps(f64),

    #[error("pulse range [{min_us}, {max_us}] us is empty")]
    PulseRange { min_us: f64, max_us: f64 },

    #[error("PWM frequency must be positive, got {0} Hz")]
    Frequency(f64),

    #[error("servo range must be positive, got {0} degrees")]
    ServoRange(f64),

    #[error("{axis}: angle range [{min}, {max}] exceeds the servo's [0, {servo_range}] degrees")]
    AxisBeyondServo {
        axis: Axis,
        min: f64,
        max: f64,
        servo_range: f64,
    },

    #[error("confidence threshold {0} is outside [0, 1]")]
    Confidence(f32),
}

/// A frame source failed to deliver a frame.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("capture device error: {0}")]
    Device(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The detector failed on a single frame.
#[derive(Debug, Error)]
pub enum LocatorError {
    #[error("frame {width}x{height} has {actual} bytes, expected {expected}")]
    MalformedFrame {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("detector failed: {0}")]
    Detector(String),
}

/// A command could not be applied to the physical actuator.
#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("invalid PWM pin {0}, use 12, 13, 18 or 19")]
    InvalidPin(u8),

    #[error("pan and tilt share PWM channel {0:?}")]
    SharedChannel(rppal::pwm::Channel),

    #[error("PWM driver error: {0}")]
    Pwm(#[from] rppal::pwm::Error),
}

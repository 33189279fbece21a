use std::fmt;

use serde::Deserialize;

use crate::error::ConfigError;

/// The two degrees of freedom of the mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Pan,
    Tilt,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Pan => write!(f, "pan"),
            Axis::Tilt => write!(f, "tilt"),
        }
    }
}

/// Maps increasing pixel coordinate to increasing (+1) or decreasing (-1)
/// actuator angle. Depends on how the servo is mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "i8")]
pub enum SignConvention {
    Positive,
    Negative,
}

impl SignConvention {
    pub fn as_f64(self) -> f64 {
        match self {
            SignConvention::Positive => 1.0,
            SignConvention::Negative => -1.0,
        }
    }
}

impl TryFrom<i8> for SignConvention {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(SignConvention::Positive),
            -1 => Ok(SignConvention::Negative),
            other => Err(format!("sign_convention must be 1 or -1, got {}", other)),
        }
    }
}

/// Per-axis controller parameters.
///
/// `sign_convention` has no default when an axis section is given: it is a
/// property of the physical mount and must be stated.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AxisConfig {
    #[serde(default = "default_min_angle")]
    pub min_angle: f64,
    #[serde(default = "default_max_angle")]
    pub max_angle: f64,
    /// Angle the axis is driven to at startup.
    #[serde(default = "default_home_angle")]
    pub home_angle: f64,
    /// Pixel margin around the setpoint where no movement occurs (inclusive).
    #[serde(default = "default_dead_zone_px")]
    pub dead_zone_px: u32,
    /// Proportional gain, degrees per pixel of error.
    #[serde(default = "default_gain")]
    pub gain: f64,
    pub sign_convention: SignConvention,
}

fn default_min_angle() -> f64 {
    0.0
}

fn default_max_angle() -> f64 {
    180.0
}

fn default_home_angle() -> f64 {
    90.0
}

fn default_dead_zone_px() -> u32 {
    30
}

fn default_gain() -> f64 {
    0.1
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            min_angle: default_min_angle(),
            max_angle: default_max_angle(),
            home_angle: default_home_angle(),
            dead_zone_px: default_dead_zone_px(),
            gain: default_gain(),
            sign_convention: SignConvention::Positive,
        }
    }
}

impl AxisConfig {
    /// Default parameters for the given axis of the reference mount.
    pub fn default_for(axis: Axis) -> Self {
        let sign_convention = match axis {
            Axis::Pan => SignConvention::Negative,
            Axis::Tilt => SignConvention::Positive,
        };
        Self {
            sign_convention,
            ..Self::default()
        }
    }

    pub fn validate(&self, axis: Axis) -> Result<(), ConfigError> {
        if self.min_angle.is_nan() || self.max_angle.is_nan() || self.min_angle > self.max_angle {
            return Err(ConfigError::AngleRange {
                axis,
                min: self.min_angle,
                max: self.max_angle,
            });
        }
        if !(self.min_angle..=self.max_angle).contains(&self.home_angle) {
            return Err(ConfigError::HomeOutOfRange {
                axis,
                home: self.home_angle,
                min: self.min_angle,
                max: self.max_angle,
            });
        }
        if !self.gain.is_finite() || self.gain <= 0.0 {
            return Err(ConfigError::Gain {
                axis,
                gain: self.gain,
            });
        }
        Ok(())
    }
}

/// Outcome of one controller evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AxisStep {
    /// Error inside the dead zone (or no target); angle held.
    Idle,
    /// Angle updated to the contained value.
    Tracking(f64),
}

/// Proportional-only position controller for a single axis.
///
/// The commanded angle is the only state carried between frames and is kept
/// within `[min_angle, max_angle]` at all times.
#[derive(Debug, Clone)]
pub struct AxisController {
    axis: Axis,
    config: AxisConfig,
    commanded_angle: f64,
}

impl AxisController {
    /// Build a controller starting at the configured home angle.
    pub fn new(axis: Axis, config: AxisConfig) -> Result<Self, ConfigError> {
        config.validate(axis)?;
        Ok(Self {
            axis,
            config,
            commanded_angle: config.home_angle,
        })
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn config(&self) -> &AxisConfig {
        &self.config
    }

    pub fn commanded_angle(&self) -> f64 {
        self.commanded_angle
    }

    /// Run one control step for a measured pixel coordinate against the
    /// setpoint coordinate on this axis.
    pub fn update(&mut self, measured: i32, setpoint: i32) -> AxisStep {
        let error = i64::from(measured) - i64::from(setpoint);

        if error.unsigned_abs() <= u64::from(self.config.dead_zone_px) {
            return AxisStep::Idle;
        }

        let correction = self.config.sign_convention.as_f64() * error as f64 * self.config.gain;
        self.commanded_angle = (self.commanded_angle - correction)
            .clamp(self.config.min_angle, self.config.max_angle);

        debug_assert!(
            (self.config.min_angle..=self.config.max_angle).contains(&self.commanded_angle),
            "{} angle escaped its range",
            self.axis
        );

        AxisStep::Tracking(self.commanded_angle)
    }
}

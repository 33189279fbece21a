use tracing::{debug, info, warn};

use crate::axis::Axis;
use crate::config::{ActuatorConfig, ActuatorKind};
use crate::error::ActuatorError;
use crate::servo::ServoActuator;

/// Accepts commanded angles for the mount.
///
/// Angles arrive already clamped by the controller. Implementations may clamp
/// again but must never flip direction. A failed command is reported to the
/// caller and otherwise forgotten.
pub trait ActuatorPort {
    /// Short label for logs.
    fn name(&self) -> &'static str;

    fn set_angle(&mut self, axis: Axis, degrees: f64) -> Result<(), ActuatorError>;
}

impl<P: ActuatorPort + ?Sized> ActuatorPort for Box<P> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn set_angle(&mut self, axis: Axis, degrees: f64) -> Result<(), ActuatorError> {
        (**self).set_angle(axis, degrees)
    }
}

/// Stands in for servos on machines without PWM hardware. Remembers the
/// last commanded angle per axis and logs each command.
#[derive(Debug, Default)]
pub struct SimulatedActuator {
    pan: Option<f64>,
    tilt: Option<f64>,
    commands: u64,
}

impl SimulatedActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last angle sent to `axis`, if any.
    pub fn angle(&self, axis: Axis) -> Option<f64> {
        match axis {
            Axis::Pan => self.pan,
            Axis::Tilt => self.tilt,
        }
    }

    pub fn commands(&self) -> u64 {
        self.commands
    }
}

impl ActuatorPort for SimulatedActuator {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn set_angle(&mut self, axis: Axis, degrees: f64) -> Result<(), ActuatorError> {
        debug!("[Simulated servo] {} -> {:.1}°", axis, degrees);
        match axis {
            Axis::Pan => self.pan = Some(degrees),
            Axis::Tilt => self.tilt = Some(degrees),
        }
        self.commands += 1;
        Ok(())
    }
}

/// Pick the actuator implementation for this host.
///
/// `Auto` prefers the hardware servos and falls back to simulation when
/// they cannot be opened; `Servo` makes that a hard error.
pub fn connect(config: &ActuatorConfig) -> Result<Box<dyn ActuatorPort>, ActuatorError> {
    match config.kind {
        ActuatorKind::Simulated => {
            info!("Using simulated actuator");
            Ok(Box::new(SimulatedActuator::new()))
        }
        ActuatorKind::Servo => Ok(Box::new(ServoActuator::new(config)?)),
        ActuatorKind::Auto => match ServoActuator::new(config) {
            Ok(servo) => Ok(Box::new(servo)),
            Err(e) => {
                warn!("Servo hardware unavailable ({}), commands will be simulated", e);
                Ok(Box::new(SimulatedActuator::new()))
            }
        },
    }
}

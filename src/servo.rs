use tracing::{debug, info};

use crate::actuator::ActuatorPort;
use crate::axis::Axis;
use crate::config::ActuatorConfig;
use crate::error::ActuatorError;

use rppal::pwm::{Channel, Polarity};

// Use rppal in production
#[cfg(not(test))]
use rppal::pwm::Pwm;

// Mock PWM for testing
#[cfg(test)]
use crate::mocks::mock_pwm::Pwm;

/// Map a GPIO pin to its hardware PWM channel.
/// Hardware PWM is available on:
/// - GPIO 12 / 18 (PWM0)
/// - GPIO 13 / 19 (PWM1)
pub fn pwm_channel(pin: u8) -> Result<Channel, ActuatorError> {
    match pin {
        12 | 18 => Ok(Channel::Pwm0),
        13 | 19 => Ok(Channel::Pwm1),
        _ => Err(ActuatorError::InvalidPin(pin)),
    }
}

/// Pulse width for a servo angle, linear over `[0, range_deg]`.
///
/// Axis limits are validated to lie inside that range at startup, so the
/// clamp only guards against out-of-range direct calls. Direction is never
/// changed here.
pub fn angle_to_pulse_us(config: &ActuatorConfig, degrees: f64) -> f64 {
    let clamped = degrees.clamp(0.0, config.range_deg);
    let span_us = config.max_pulse_us - config.min_pulse_us;
    config.min_pulse_us + (clamped / config.range_deg) * span_us
}

/// One hobby servo on a hardware PWM channel.
struct Servo {
    pwm: Pwm,
    pin: u8,
    period_us: f64,
    enabled: bool,
}

impl Servo {
    fn open(pin: u8, config: &ActuatorConfig) -> Result<Self, ActuatorError> {
        let channel = pwm_channel(pin)?;

        // Start disabled until the first command arrives so the servo does
        // not twitch to an arbitrary duty cycle on power-up.
        let pwm = Pwm::with_frequency(channel, config.frequency_hz, 0.0, Polarity::Normal, false)?;

        Ok(Self {
            pwm,
            pin,
            period_us: 1_000_000.0 / config.frequency_hz,
            enabled: false,
        })
    }

    fn set_pulse_width_us(&mut self, pulse_us: f64) -> Result<(), ActuatorError> {
        let duty_cycle = (pulse_us / self.period_us).clamp(0.0, 1.0);
        self.pwm.set_duty_cycle(duty_cycle)?;
        if !self.enabled {
            self.pwm.enable()?;
            self.enabled = true;
        }
        Ok(())
    }

    fn disable(&mut self) -> Result<(), ActuatorError> {
        self.pwm.disable()?;
        self.enabled = false;
        Ok(())
    }
}

/// Pan/tilt servos driven from the Raspberry Pi hardware PWM peripheral.
pub struct ServoActuator {
    config: ActuatorConfig,
    pan: Servo,
    tilt: Servo,
}

impl ServoActuator {
    /// Open both PWM channels. Fails when the pins are not PWM capable, share
    /// a channel, or the PWM peripheral is unavailable (non-Pi host).
    pub fn new(config: &ActuatorConfig) -> Result<Self, ActuatorError> {
        let pan_channel = pwm_channel(config.pan_pin)?;
        let tilt_channel = pwm_channel(config.tilt_pin)?;
        if pan_channel == tilt_channel {
            return Err(ActuatorError::SharedChannel(pan_channel));
        }

        let pan = Servo::open(config.pan_pin, config)?;
        let tilt = Servo::open(config.tilt_pin, config)?;

        info!(
            "Servos ready: pan on GPIO {}, tilt on GPIO {} ({} Hz, {}-{} us)",
            config.pan_pin,
            config.tilt_pin,
            config.frequency_hz,
            config.min_pulse_us,
            config.max_pulse_us
        );

        Ok(Self {
            config: *config,
            pan,
            tilt,
        })
    }

    fn servo(&mut self, axis: Axis) -> &mut Servo {
        match axis {
            Axis::Pan => &mut self.pan,
            Axis::Tilt => &mut self.tilt,
        }
    }

    /// Stop driving both servos.
    pub fn disable(&mut self) -> Result<(), ActuatorError> {
        self.pan.disable()?;
        self.tilt.disable()
    }
}

impl ActuatorPort for ServoActuator {
    fn name(&self) -> &'static str {
        "servo"
    }

    fn set_angle(&mut self, axis: Axis, degrees: f64) -> Result<(), ActuatorError> {
        let pulse_us = angle_to_pulse_us(&self.config, degrees);
        let servo = self.servo(axis);
        debug!("{} servo (GPIO {}) -> {:.1}° ({:.0} us)", axis, servo.pin, degrees, pulse_us);
        servo.set_pulse_width_us(pulse_us)
    }
}

impl Drop for ServoActuator {
    fn drop(&mut self) {
        // Ensure PWM is disabled when dropped
        let _ = self.disable();
    }
}

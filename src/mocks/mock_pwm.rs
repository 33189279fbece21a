// This file is only compiled during tests

use std::cell::RefCell;
use std::collections::HashMap;

use rppal::pwm::{Channel, Error, Polarity};

#[derive(Debug, Clone, Copy)]
struct MockChannel {
    duty_cycle: f64,
    enabled: bool,
}

thread_local! {
    static MOCK_PWM: RefCell<HashMap<String, MockChannel>> = RefCell::new(HashMap::new());
}

fn key(channel: Channel) -> String {
    format!("{:?}", channel)
}

/// Stand-in for `rppal::pwm::Pwm` with the same constructor and setters.
pub struct Pwm {
    channel: Channel,
}

impl Pwm {
    pub fn with_frequency(
        channel: Channel,
        _frequency: f64,
        duty_cycle: f64,
        _polarity: Polarity,
        enabled: bool,
    ) -> Result<Self, Error> {
        MOCK_PWM.with(|pwm| {
            pwm.borrow_mut().insert(
                key(channel),
                MockChannel {
                    duty_cycle,
                    enabled,
                },
            );
        });
        Ok(Pwm { channel })
    }

    pub fn set_duty_cycle(&self, duty_cycle: f64) -> Result<(), Error> {
        MOCK_PWM.with(|pwm| {
            if let Some(state) = pwm.borrow_mut().get_mut(&key(self.channel)) {
                state.duty_cycle = duty_cycle;
            }
        });
        Ok(())
    }

    pub fn enable(&self) -> Result<(), Error> {
        MOCK_PWM.with(|pwm| {
            if let Some(state) = pwm.borrow_mut().get_mut(&key(self.channel)) {
                state.enabled = true;
            }
        });
        Ok(())
    }

    pub fn disable(&self) -> Result<(), Error> {
        MOCK_PWM.with(|pwm| {
            if let Some(state) = pwm.borrow_mut().get_mut(&key(self.channel)) {
                state.enabled = false;
            }
        });
        Ok(())
    }
}

// Test helper
pub fn get_mock_duty_cycle(channel: Channel) -> Option<f64> {
    MOCK_PWM.with(|pwm| pwm.borrow().get(&key(channel)).map(|s| s.duty_cycle))
}

// Test helper
pub fn is_mock_enabled(channel: Channel) -> bool {
    MOCK_PWM.with(|pwm| pwm.borrow().get(&key(channel)).is_some_and(|s| s.enabled))
}

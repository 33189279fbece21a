pub mod acquisition;
pub mod actuator;
pub mod axis;
pub mod config;
pub mod error;
pub mod frame;
pub mod frame_channel;
pub mod logging;
pub mod servo;
pub mod sim;
pub mod stop;
pub mod target;
pub mod telemetry;
pub mod tracking_loop;

// Re-export commonly used types
pub use actuator::ActuatorPort;
pub use axis::{Axis, AxisController};
pub use config::Config;
pub use frame::Frame;
pub use frame_channel::FrameChannel;
pub use stop::StopSignal;
pub use target::{TargetCandidate, TargetLocator};
pub use tracking_loop::TrackingLoop;

#[cfg(test)]
pub(crate) mod mocks;

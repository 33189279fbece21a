use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{info, warn};

use crate::error::AcquisitionError;
use crate::frame::Frame;
use crate::frame_channel::FrameChannel;
use crate::stop::StopSignal;

/// Anything that produces frames: a camera, a video file, a synthetic scene.
///
/// `next_frame` may block until the device delivers. `Ok(None)` means the
/// stream has ended for good.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Option<Frame>, AcquisitionError>;
}

/// How the acquisition thread finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionExit {
    Stopped,
    EndOfStream,
    /// Too many consecutive errors; shutdown was requested.
    Failed,
}

/// Pump `source` into `channel` on the calling thread until stopped.
///
/// Single errors are logged and retried. After `max_failures` in a row the
/// source is considered lost and `stop` is raised so the loop winds down.
pub fn run_acquisition<S: FrameSource>(
    mut source: S,
    channel: &FrameChannel,
    stop: &StopSignal,
    max_failures: u32,
) -> AcquisitionExit {
    let mut consecutive_failures = 0u32;

    while !stop.is_stop_requested() {
        match source.next_frame() {
            Ok(Some(frame)) => {
                consecutive_failures = 0;
                channel.put(frame);
            }
            Ok(None) => {
                info!("Frame source ended after {} frames", channel.frames_put());
                return AcquisitionExit::EndOfStream;
            }
            Err(e) => {
                consecutive_failures += 1;
                warn!(
                    "Acquisition error ({}/{}): {}",
                    consecutive_failures, max_failures, e
                );
                if consecutive_failures >= max_failures {
                    warn!("Frame source lost, requesting shutdown");
                    stop.request_stop();
                    return AcquisitionExit::Failed;
                }
            }
        }
    }

    AcquisitionExit::Stopped
}

/// Run [`run_acquisition`] on a dedicated thread.
pub fn spawn_acquisition<S>(
    source: S,
    channel: Arc<FrameChannel>,
    stop: StopSignal,
    max_failures: u32,
) -> std::io::Result<JoinHandle<AcquisitionExit>>
where
    S: FrameSource + 'static,
{
    thread::Builder::new()
        .name("acquisition".into())
        .spawn(move || run_acquisition(source, &channel, &stop, max_failures))
}

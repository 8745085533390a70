// THEORY:
// The pipeline is pure computation. Everything that touches hardware or the network
// sits behind one of these two traits, so the cycle driver can be exercised with
// in-memory fakes and the binary can swap a live camera for a folder of images.

use crate::core_modules::segmenter::Frame;
use crate::error::VisionError;

/// Supplies one colour frame per call.
///
/// Implementations may block until a frame is available. Returning
/// `VisionError::NoFrame` skips the cycle; the driver never retries.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Frame, VisionError>;
}

/// Receives the steering value once per cycle in which a note was found.
///
/// Cycles without a note make no call at all; the silence is the "no target" signal.
pub trait TelemetryPublisher {
    fn publish(&mut self, steering: f64) -> Result<(), VisionError>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Frame, VisionError> {
        (**self).next_frame()
    }
}

impl<P: TelemetryPublisher + ?Sized> TelemetryPublisher for Box<P> {
    fn publish(&mut self, steering: f64) -> Result<(), VisionError> {
        (**self).publish(steering)
    }
}

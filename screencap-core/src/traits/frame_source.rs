use crate::models::capture_models::{CaptureSource, Frame};
use crate::models::error::CaptureError;

/// A live video feed opened from a capture source.
///
/// Implemented by platform backends (desktop duplication, screencopy,
/// window capture). The session polls rather than registering callbacks;
/// feeds that deliver frames asynchronously should buffer the latest frame
/// internally.
pub trait FrameSource: Send {
    /// Identity and native resolution of the underlying source.
    fn descriptor(&self) -> CaptureSource;

    /// Current native pixel dimensions of the feed.
    ///
    /// Returns `(0, 0)` until the device has finished negotiating; the
    /// compositor's readiness gate polls this before the first crop.
    fn dimensions(&self) -> (u32, u32);

    /// Fetch the next full-resolution frame, if one is available.
    ///
    /// `Ok(None)` means no new frame since the last call; the scheduler
    /// simply skips the tick. Errors count toward the session's
    /// consecutive-failure bound.
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError>;

    /// Release the feed. Called exactly once at session end.
    fn stop(&mut self);
}

/// Enumerates capturable sources. External collaborator; the core only ever
/// asks for the primary screen source.
pub trait SourceEnumerator {
    type Source: FrameSource;

    /// Open a feed for the primary screen source.
    fn open_primary(&mut self) -> Result<Self::Source, CaptureError>;
}

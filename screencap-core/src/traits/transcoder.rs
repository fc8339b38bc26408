use std::path::Path;

use crate::models::error::CaptureError;

/// One-shot conversion of an intermediate capture file into the final
/// deliverable format.
///
/// The intermediate's stream parameters travel in its container header, so
/// implementations need only the two paths. On success the intermediate
/// file must be deleted; on failure it is left in place and the error
/// reported; there is no mid-stream resumption, a retry is a whole new
/// invocation.
pub trait Transcoder: Send {
    fn transcode(&mut self, intermediate: &Path, destination: &Path) -> Result<(), CaptureError>;
}

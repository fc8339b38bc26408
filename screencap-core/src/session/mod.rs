//! Session orchestration: the recording controller and the one-shot
//! screenshot path.

pub mod recording;
pub mod screenshot;

use std::sync::Arc;

use crate::traits::session_delegate::SessionDelegate;

pub use recording::RecordingSession;
pub use screenshot::{capture_screenshot, ScreenshotOutcome};

/// Fire a delegate notification if a delegate is attached.
pub(crate) fn delegate_notify<F>(delegate: &Option<Arc<dyn SessionDelegate>>, notify: F)
where
    F: FnOnce(&dyn SessionDelegate),
{
    if let Some(delegate) = delegate {
        notify(delegate.as_ref());
    }
}

use super::error::CaptureError;

/// Recording session state machine.
///
/// State transitions:
/// ```text
/// idle → selecting → initializing → recording ↔ paused
///                                       ↓          ↓
///                                     finalizing → idle
/// ```
/// Any non-idle state can branch to `Aborted`, which behaves like idle for
/// admission purposes but carries the failure that ended the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    /// Blocked on the external region-pick collaborator.
    Selecting,
    /// Acquiring the capture source and opening the stream writer.
    Initializing,
    Recording { duration_secs: f64 },
    Paused { duration_secs: f64 },
    /// Draining writes, closing the temp file, running the transcode.
    Finalizing,
    Aborted(CaptureError),
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle | Self::Aborted(_))
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording { .. })
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, Self::Paused { .. })
    }

    /// A session exists and holds resources in these states.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Initializing | Self::Recording { .. } | Self::Paused { .. } | Self::Finalizing
        )
    }

    /// Returns the recorded duration if the state tracks it.
    pub fn duration(&self) -> Option<f64> {
        match self {
            Self::Recording { duration_secs } | Self::Paused { duration_secs } => {
                Some(*duration_secs)
            }
            _ => None,
        }
    }
}

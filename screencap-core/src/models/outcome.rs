use std::path::PathBuf;

/// Result of a start request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// The session is recording.
    Started,
    /// The user dismissed the region selector; no session was created and
    /// no temp file exists.
    SelectionCancelled,
}

/// Terminal result of a recording or screenshot session.
///
/// Callers must treat the three variants differently; there is no silent
/// fallback from `Cancelled` or `Empty` to success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Final artifact written at this path.
    Saved(PathBuf),
    /// The user declined the save prompt (or no data was ever captured);
    /// the intermediate file has been removed.
    Cancelled,
    /// The capture produced zero bytes; no transcode was attempted.
    Empty,
}

impl SessionOutcome {
    pub fn artifact_path(&self) -> Option<&PathBuf> {
        match self {
            Self::Saved(path) => Some(path),
            _ => None,
        }
    }
}

use std::path::PathBuf;

use crate::models::capture_models::RegionSpec;

/// External region-pick collaborator (overlay window, portal dialog, ...).
///
/// Blocks until the user confirms or dismisses. `None` means cancelled:
/// the session reports cancellation and creates nothing.
pub trait RegionSelector: Send {
    fn select_region(&mut self) -> Option<RegionSpec>;
}

/// External save-path prompt.
///
/// Given a suggested file name (with extension), returns the chosen path
/// or `None` if the user cancelled.
pub trait SavePrompt: Send {
    fn pick_save_path(&mut self, suggested_name: &str) -> Option<PathBuf>;
}

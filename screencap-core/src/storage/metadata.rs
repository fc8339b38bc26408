use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::error::CaptureError;

/// Metadata written as a JSON sidecar next to a finished artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub created_at: String,
    pub file_path: String,
    pub duration_secs: f64,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub audio_inputs: usize,
    pub checksum: String,
}

impl RecordingMetadata {
    pub fn new(
        artifact: &Path,
        duration_secs: f64,
        width: u32,
        height: u32,
        fps: u32,
        audio_inputs: usize,
    ) -> Result<Self, CaptureError> {
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            file_path: artifact.to_string_lossy().into_owned(),
            duration_secs,
            width,
            height,
            fps,
            audio_inputs,
            checksum: sha256_file(artifact)?,
        })
    }
}

/// Write `{artifact}.metadata.json` alongside the artifact.
pub fn write_metadata(metadata: &RecordingMetadata, artifact: &Path) -> Result<(), CaptureError> {
    let metadata_path = artifact.with_extension("metadata.json");
    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| CaptureError::StorageError(format!("failed to serialize metadata: {e}")))?;
    fs::write(&metadata_path, json)
        .map_err(|e| CaptureError::StorageError(format!("failed to write metadata: {e}")))?;
    Ok(())
}

/// Read metadata from an artifact's JSON sidecar.
pub fn read_metadata(artifact: &Path) -> Result<RecordingMetadata, CaptureError> {
    let metadata_path = artifact.with_extension("metadata.json");
    let json = fs::read_to_string(&metadata_path)
        .map_err(|e| CaptureError::StorageError(format!("failed to read metadata: {e}")))?;
    serde_json::from_str(&json)
        .map_err(|e| CaptureError::StorageError(format!("failed to parse metadata: {e}")))
}

/// SHA-256 hex digest of a file.
pub fn sha256_file(path: &Path) -> Result<String, CaptureError> {
    let data = fs::read(path)
        .map_err(|e| CaptureError::StorageError(format!("failed to read file for checksum: {e}")))?;
    let digest = Sha256::digest(&data);
    Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
}

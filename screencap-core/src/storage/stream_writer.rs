use std::fs::{self, File};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::models::capture_models::Chunk;
use crate::models::error::CaptureError;
use crate::storage::container::{self, ContainerHeader};

/// What the temp file held when the writer was closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    /// File is gone; treated as cancellation, not an error.
    NoData,
    /// File exists but zero payload bytes were written. Downstream must
    /// not attempt to transcode it.
    Empty,
    /// Payload bytes on disk, ready for transcode.
    Written { payload_bytes: u64 },
}

/// Streaming writer for the intermediate capture file.
///
/// Open writes the container header; close patches the payload size and
/// flushes before returning, so file-size checks made afterwards can be
/// trusted. Appends arriving after close or abort are dropped silently;
/// the producer is expected to stop scheduling first, but a late write
/// must not crash.
pub struct StreamWriter {
    file_path: PathBuf,
    file: Option<BufWriter<File>>,
    payload_bytes: u64,
    is_open: bool,
}

impl StreamWriter {
    pub fn new(file_path: PathBuf) -> Self {
        Self {
            file_path,
            file: None,
            payload_bytes: 0,
            is_open: false,
        }
    }

    /// Create the file and write the container header.
    ///
    /// Fails loudly if the path cannot be created.
    pub fn open(&mut self, header: &ContainerHeader) -> Result<(), CaptureError> {
        if self.is_open {
            return Ok(());
        }

        let file = File::create(&self.file_path).map_err(|e| {
            CaptureError::StorageError(format!(
                "failed to create {}: {e}",
                self.file_path.display()
            ))
        })?;
        let mut file = BufWriter::new(file);
        file.write_all(&container::generate_header(header))
            .map_err(|e| CaptureError::StorageError(format!("header write failed: {e}")))?;

        self.file = Some(file);
        self.payload_bytes = 0;
        self.is_open = true;
        Ok(())
    }

    /// Append one chunk in arrival order. Chunks are never reordered,
    /// split, or merged.
    pub fn append(&mut self, chunk: &Chunk) -> Result<(), CaptureError> {
        let Some(file) = self.file.as_mut() else {
            log::debug!("dropping {} byte chunk after close", chunk.data.len());
            return Ok(());
        };

        let record = container::frame_record(chunk.kind, &chunk.data);
        file.write_all(&record)
            .map_err(|e| CaptureError::StorageError(format!("chunk write failed: {e}")))?;
        self.payload_bytes += record.len() as u64;
        Ok(())
    }

    /// Flush, patch the header payload size, and close the handle.
    ///
    /// Returns only after the file is fully on disk, then validates what
    /// was written.
    pub fn close(&mut self) -> Result<CloseOutcome, CaptureError> {
        if let Some(writer) = self.file.take() {
            let mut file = writer
                .into_inner()
                .map_err(|e| CaptureError::StorageError(format!("flush failed: {e}")))?;
            file.seek(SeekFrom::Start(container::PAYLOAD_SIZE_OFFSET))
                .map_err(|e| CaptureError::StorageError(e.to_string()))?;
            file.write_all(&self.payload_bytes.to_le_bytes())
                .map_err(|e| CaptureError::StorageError(e.to_string()))?;
            file.flush()
                .map_err(|e| CaptureError::StorageError(e.to_string()))?;
        }
        self.is_open = false;

        if !self.file_path.exists() {
            return Ok(CloseOutcome::NoData);
        }
        if self.payload_bytes == 0 {
            return Ok(CloseOutcome::Empty);
        }
        Ok(CloseOutcome::Written {
            payload_bytes: self.payload_bytes,
        })
    }

    /// Best-effort removal of the temp file. Delete failures are
    /// swallowed; a stale temp file is acceptable garbage.
    pub fn abort(&mut self) {
        self.file = None;
        self.is_open = false;
        if let Err(e) = fs::remove_file(&self.file_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!(
                    "failed to remove temp file {}: {e}",
                    self.file_path.display()
                );
            }
        }
    }

    /// Payload bytes appended so far (record framing included, header
    /// excluded).
    pub fn payload_bytes(&self) -> u64 {
        self.payload_bytes
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

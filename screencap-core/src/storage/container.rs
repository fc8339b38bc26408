//! Intermediate capture container.
//!
//! The raw capture is streamed to a single append-only file: a fixed
//! 32-byte header followed by tagged records in arrival order. No index,
//! no seeking; the transcode stage reads it front to back once.
//!
//! ```text
//! [0-3]    "SCAP"
//! [4-5]    version (1)
//! [6-7]    audio channels
//! [8-11]   frame width (device pixels)
//! [12-15]  frame height
//! [16-19]  frames per second
//! [20-23]  audio sample rate
//! [24-31]  payload size in bytes (placeholder: patched on close)
//!
//! record:  [1-byte tag 'V' | 'A'] [4-byte LE payload length] [payload]
//! ```
//!
//! Video payloads are tightly packed RGBA frames of the header dimensions;
//! audio payloads are interleaved 16-bit LE PCM at the header rate. All
//! integers are little-endian.

use std::io::Read;

use crate::models::capture_models::ChunkKind;
use crate::models::error::CaptureError;

/// Size of the fixed container header in bytes.
pub const HEADER_SIZE: usize = 32;

/// Byte offset of the payload-size field, for patch-on-close.
pub const PAYLOAD_SIZE_OFFSET: u64 = 24;

pub const MAGIC: &[u8; 4] = b"SCAP";
pub const VERSION: u16 = 1;

const TAG_VIDEO: u8 = b'V';
const TAG_AUDIO: u8 = b'A';

/// Stream parameters recorded in the container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Generate the 32-byte header with a zero payload-size placeholder.
pub fn generate_header(header: &ContainerHeader) -> [u8; HEADER_SIZE] {
    let mut bytes = [0u8; HEADER_SIZE];
    bytes[0..4].copy_from_slice(MAGIC);
    bytes[4..6].copy_from_slice(&VERSION.to_le_bytes());
    bytes[6..8].copy_from_slice(&header.channels.to_le_bytes());
    bytes[8..12].copy_from_slice(&header.width.to_le_bytes());
    bytes[12..16].copy_from_slice(&header.height.to_le_bytes());
    bytes[16..20].copy_from_slice(&header.fps.to_le_bytes());
    bytes[20..24].copy_from_slice(&header.sample_rate.to_le_bytes());
    // [24..32] payload size, patched on close
    bytes
}

/// Parse and validate a container header.
pub fn parse_header(bytes: &[u8]) -> Result<(ContainerHeader, u64), CaptureError> {
    if bytes.len() < HEADER_SIZE {
        return Err(CaptureError::StorageError("truncated container header".into()));
    }
    if &bytes[0..4] != MAGIC {
        return Err(CaptureError::StorageError("not a capture container".into()));
    }
    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != VERSION {
        return Err(CaptureError::StorageError(format!(
            "unsupported container version: {version}"
        )));
    }

    let header = ContainerHeader {
        channels: u16::from_le_bytes([bytes[6], bytes[7]]),
        width: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
        height: u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
        fps: u32::from_le_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]),
        sample_rate: u32::from_le_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]),
    };
    let mut size_bytes = [0u8; 8];
    size_bytes.copy_from_slice(&bytes[24..32]);
    let payload_size = u64::from_le_bytes(size_bytes);
    Ok((header, payload_size))
}

/// Frame one record: tag byte, length prefix, payload.
pub fn frame_record(kind: ChunkKind, payload: &[u8]) -> Vec<u8> {
    let tag = match kind {
        ChunkKind::Video => TAG_VIDEO,
        ChunkKind::Audio => TAG_AUDIO,
    };
    let mut record = Vec::with_capacity(5 + payload.len());
    record.push(tag);
    record.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    record.extend_from_slice(payload);
    record
}

/// Read the next record, or `None` at clean end of stream.
pub fn read_record<R: Read>(reader: &mut R) -> Result<Option<(ChunkKind, Vec<u8>)>, CaptureError> {
    let mut tag = [0u8; 1];
    match reader.read_exact(&mut tag) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(CaptureError::StorageError(format!("record read failed: {e}"))),
    }

    let kind = match tag[0] {
        TAG_VIDEO => ChunkKind::Video,
        TAG_AUDIO => ChunkKind::Audio,
        other => {
            return Err(CaptureError::StorageError(format!(
                "unknown record tag: 0x{other:02x}"
            )))
        }
    };

    let mut len_bytes = [0u8; 4];
    reader
        .read_exact(&mut len_bytes)
        .map_err(|e| CaptureError::StorageError(format!("record length read failed: {e}")))?;
    let len = u32::from_le_bytes(len_bytes) as usize;

    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .map_err(|e| CaptureError::StorageError(format!("record payload read failed: {e}")))?;
    Ok(Some((kind, payload)))
}

use serde::{Deserialize, Serialize};

/// Opaque reference to a capturable screen/window source and its native
/// pixel resolution. Obtained once per session from a `SourceEnumerator`
/// and discarded at session end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSource {
    pub id: String,
    pub native_width: u32,
    pub native_height: u32,
}

/// User-selected crop rectangle in *logical* (UI) coordinates, plus the
/// logical screen size at selection time. The capture feed's pixel
/// dimensions are not necessarily equal to these; device-pixel scaling is
/// resolved by the compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionSpec {
    pub origin_x: i32,
    pub origin_y: i32,
    pub width: u32,
    pub height: u32,
    pub screen_width: u32,
    pub screen_height: u32,
}

/// A single RGBA8 frame buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA, `width * height * 4` bytes.
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), (width * height * 4) as usize);
        Self {
            width,
            height,
            data,
        }
    }

    /// An all-zero (transparent black) frame of the given size.
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; (width * height * 4) as usize],
        }
    }
}

/// Payload discriminator for intermediate-file records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    Video,
    Audio,
}

/// An immutable binary buffer handed to the stream writer. Ordering is
/// implied by arrival; chunks are never reordered, split, or merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub kind: ChunkKind,
    pub data: Vec<u8>,
}

impl Chunk {
    pub fn video(data: Vec<u8>) -> Self {
        Self {
            kind: ChunkKind::Video,
            data,
        }
    }

    pub fn audio(data: Vec<u8>) -> Self {
        Self {
            kind: ChunkKind::Audio,
            data,
        }
    }
}

/// Counters for debugging capture sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionDiagnostics {
    pub frames_composited: u64,
    pub frames_skipped: u64,
    pub audio_blocks: u64,
    pub bytes_written: u64,
    pub capture_errors: u64,
}

//! # screencap-core
//!
//! Platform-agnostic screen recording core library.
//!
//! Provides region compositing, audio mixing, incremental stream writing,
//! session orchestration, and external-encoder transcoding. Platform
//! backends implement the `FrameSource` and `AudioProvider` traits and
//! plug into the generic `RecordingSession`; UI shells supply the
//! `RegionSelector` and `SavePrompt` collaborators.
//!
//! ## Architecture
//!
//! ```text
//! screencap-core (this crate)
//! ├── traits/       ← FrameSource, AudioProvider, RegionSelector, SavePrompt, Transcoder
//! ├── models/       ← CaptureError, SessionState, SessionConfig, RegionSpec, outcomes
//! ├── processing/   ← FrameCompositor (crop math), MixBus (audio mixing)
//! ├── session/      ← RecordingSession (generic orchestrator), screenshot path
//! ├── storage/      ← StreamWriter (intermediate container), metadata sidecar
//! └── transcode/    ← FfmpegTranscoder, encoder profiles
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;
pub mod transcode;

// Re-export key types at crate root for convenience.
pub use models::capture_models::{CaptureSource, Chunk, ChunkKind, Frame, RegionSpec, SessionDiagnostics};
pub use models::config::{CaptureMode, ScreenshotOptions, SessionConfig};
pub use models::error::CaptureError;
pub use models::outcome::{SessionOutcome, StartOutcome};
pub use models::state::SessionState;
pub use processing::compositor::{FrameCompositor, PixelCrop};
pub use processing::mix_bus::MixBus;
pub use session::recording::RecordingSession;
pub use session::screenshot::{capture_screenshot, ScreenshotOutcome};
pub use storage::metadata::RecordingMetadata;
pub use storage::stream_writer::{CloseOutcome, StreamWriter};
pub use traits::audio_provider::{AudioBufferCallback, AudioProvider};
pub use traits::collaborators::{RegionSelector, SavePrompt};
pub use traits::frame_source::{FrameSource, SourceEnumerator};
pub use traits::session_delegate::SessionDelegate;
pub use traits::transcoder::Transcoder;
pub use transcode::{EncoderProfile, FfmpegTranscoder};

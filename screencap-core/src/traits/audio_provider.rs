use std::sync::Arc;

use crate::models::error::CaptureError;

/// Callback invoked when an audio buffer is available.
///
/// Parameters:
/// - `samples`: Interleaved f32 samples.
/// - `sample_rate`: The actual sample rate of the delivered audio.
/// - `channels`: Number of channels (1 = mono, 2 = stereo interleaved).
pub type AudioBufferCallback = Arc<dyn Fn(&[f32], u32, u16) + Send + Sync + 'static>;

/// Interface for live audio capture sources (microphone, system loopback).
///
/// Acquisition failure is non-fatal to a session: `start` returning an
/// error only removes this input from the mix bus.
pub trait AudioProvider: Send {
    /// Whether this source is currently available.
    fn is_available(&self) -> bool;

    /// Start capturing, delivering buffers via `callback`.
    ///
    /// The callback fires on a dedicated audio thread, so keep processing
    /// minimal.
    fn start(&mut self, callback: AudioBufferCallback) -> Result<(), CaptureError>;

    /// Stop capturing and release the device handle.
    fn stop(&mut self);
}

use std::path::PathBuf;
use std::time::Duration;

/// Whether a session records the full source or a user-selected sub-region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureMode {
    #[default]
    FullScreen,
    Region,
}

/// Configuration for a recording session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Full-source or region-bounded capture.
    pub mode: CaptureMode,

    /// Target frame rate for the composited stream (default: 30).
    pub target_fps: u32,

    /// Target sample rate for the mixed audio track in Hz (default: 48000).
    pub sample_rate: u32,

    /// Request the microphone input (default: true). Acquisition failure
    /// is non-fatal.
    pub enable_mic: bool,

    /// Request the system/loopback input (default: true). Acquisition
    /// failure is non-fatal.
    pub enable_system_audio: bool,

    /// Directory for the intermediate capture file (default: OS temp dir).
    pub temp_dir: PathBuf,
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.target_fps == 0 || self.target_fps > 240 {
            return Err(format!("unsupported frame rate: {}", self.target_fps));
        }
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        Ok(())
    }

    /// Interval between compositor scheduling ticks.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_fps as f64)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: CaptureMode::FullScreen,
            target_fps: 30,
            sample_rate: 48000,
            enable_mic: true,
            enable_system_audio: true,
            temp_dir: std::env::temp_dir(),
        }
    }
}

/// Options for the single-frame screenshot path.
#[derive(Debug, Clone)]
pub struct ScreenshotOptions {
    /// Prompt for a region before grabbing the frame.
    pub mode: CaptureMode,

    /// Wait after the feed reports dimensions so the image settles
    /// (default: 1s, matching interactive capture behavior).
    pub settle_delay: Duration,
}

impl Default for ScreenshotOptions {
    fn default() -> Self {
        Self {
            mode: CaptureMode::FullScreen,
            settle_delay: Duration::from_secs(1),
        }
    }
}

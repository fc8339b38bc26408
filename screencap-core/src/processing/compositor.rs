use std::time::Duration;

use crate::models::capture_models::{Frame, RegionSpec};
use crate::models::error::CaptureError;
use crate::traits::frame_source::FrameSource;

/// Interval between readiness-gate polls of the capture feed.
pub const READY_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Maximum readiness-gate polls before the source is declared failed.
pub const READY_POLL_ATTEMPTS: u32 = 50;

/// Minimum crop dimension in device pixels. A degenerate region is clamped
/// up to this instead of producing an empty frame buffer.
pub const MIN_CROP_DIM: u32 = 2;

/// A crop rectangle in the feed's device-pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelCrop {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelCrop {
    /// Map a logical region into the feed's pixel resolution.
    ///
    /// The feed dimensions are not necessarily the logical screen
    /// dimensions recorded at selection time (device-pixel scaling), so
    /// each axis is scaled by `stream / reference`. Origins are floored;
    /// sizes are floored and clamped to [`MIN_CROP_DIM`].
    pub fn from_region(region: &RegionSpec, stream_w: u32, stream_h: u32) -> Self {
        let scale_x = stream_w as f64 / region.screen_width as f64;
        let scale_y = stream_h as f64 / region.screen_height as f64;

        Self {
            x: (region.origin_x as f64 * scale_x).floor().max(0.0) as u32,
            y: (region.origin_y as f64 * scale_y).floor().max(0.0) as u32,
            width: ((region.width as f64 * scale_x).floor() as u32).max(MIN_CROP_DIM),
            height: ((region.height as f64 * scale_y).floor() as u32).max(MIN_CROP_DIM),
        }
    }
}

/// Produces the cropped frame stream fed downstream.
///
/// With a crop configured, every composed frame is a fixed-size
/// `width x height` buffer copied from the source sub-rectangle; source
/// pixels outside the feed stay zero. Without one, composition is a
/// pass-through of the full native frame.
#[derive(Debug, Clone)]
pub struct FrameCompositor {
    crop: Option<PixelCrop>,
}

impl FrameCompositor {
    /// Compositor for a region session. Requires the feed to have passed
    /// the readiness gate so `stream_w`/`stream_h` are real.
    pub fn cropped(region: &RegionSpec, stream_w: u32, stream_h: u32) -> Self {
        Self {
            crop: Some(PixelCrop::from_region(region, stream_w, stream_h)),
        }
    }

    /// Pass-through compositor for full-source capture.
    pub fn passthrough() -> Self {
        Self { crop: None }
    }

    pub fn crop(&self) -> Option<PixelCrop> {
        self.crop
    }

    /// Output buffer dimensions for a feed of the given native size.
    pub fn output_dimensions(&self, stream_w: u32, stream_h: u32) -> (u32, u32) {
        match self.crop {
            Some(crop) => (crop.width, crop.height),
            None => (stream_w, stream_h),
        }
    }

    /// Draw one frame into the output buffer.
    pub fn compose(&self, source: &Frame) -> Frame {
        let Some(crop) = self.crop else {
            return source.clone();
        };

        let mut out = Frame::blank(crop.width, crop.height);
        let src_stride = (source.width * 4) as usize;
        let dst_stride = (crop.width * 4) as usize;

        for row in 0..crop.height {
            let src_y = crop.y + row;
            if src_y >= source.height {
                break;
            }
            let copy_px = crop.width.min(source.width.saturating_sub(crop.x));
            if copy_px == 0 {
                continue;
            }
            let src_off = src_y as usize * src_stride + (crop.x * 4) as usize;
            let dst_off = row as usize * dst_stride;
            let len = (copy_px * 4) as usize;
            out.data[dst_off..dst_off + len]
                .copy_from_slice(&source.data[src_off..src_off + len]);
        }
        out
    }
}

/// Block until the feed reports non-zero native dimensions.
///
/// Asynchronous device readiness is handled as an explicit bounded retry:
/// poll every `interval`, at most `max_attempts` times. Exhausting the
/// bound is a capture-source failure, never a silent zero-size output.
pub fn wait_for_dimensions<S: FrameSource>(
    source: &S,
    interval: Duration,
    max_attempts: u32,
) -> Result<(u32, u32), CaptureError> {
    for attempt in 0..max_attempts {
        let (w, h) = source.dimensions();
        if w > 0 && h > 0 {
            if attempt > 0 {
                log::debug!("feed ready after {} polls: {}x{}", attempt + 1, w, h);
            }
            return Ok((w, h));
        }
        std::thread::sleep(interval);
    }
    log::error!(
        "capture feed never reported dimensions after {} polls",
        max_attempts
    );
    Err(CaptureError::SourceNotReady)
}

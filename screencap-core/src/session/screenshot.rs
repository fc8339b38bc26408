use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use crate::models::capture_models::Frame;
use crate::models::config::{CaptureMode, ScreenshotOptions};
use crate::models::error::CaptureError;
use crate::processing::compositor::{
    wait_for_dimensions, FrameCompositor, READY_POLL_ATTEMPTS, READY_POLL_INTERVAL,
};
use crate::traits::collaborators::{RegionSelector, SavePrompt};
use crate::traits::frame_source::{FrameSource, SourceEnumerator};

/// Terminal outcome of a screenshot request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenshotOutcome {
    Saved(PathBuf),
    Cancelled,
}

/// Grab a single frame, crop it per the selected region, and save it as a
/// PNG at a user-chosen path.
///
/// Shares the recording path's crop math and readiness gate but never
/// creates a session: one frame in, one file out. The settle delay runs
/// after the feed passes the readiness gate so the picture has settled
/// before the grab.
pub fn capture_screenshot<E: SourceEnumerator>(
    enumerator: &mut E,
    selector: &mut dyn RegionSelector,
    save_prompt: &mut dyn SavePrompt,
    options: &ScreenshotOptions,
) -> Result<ScreenshotOutcome, CaptureError> {
    let region = if options.mode == CaptureMode::Region {
        match selector.select_region() {
            Some(region) => Some(region),
            None => {
                log::info!("screenshot region selection cancelled");
                return Ok(ScreenshotOutcome::Cancelled);
            }
        }
    } else {
        None
    };

    let mut source = enumerator.open_primary()?;
    let frame = match grab_one_frame(&mut source, options.settle_delay) {
        Ok(frame) => {
            source.stop();
            frame
        }
        Err(e) => {
            source.stop();
            return Err(e);
        }
    };

    let compositor = match region {
        Some(ref region) => FrameCompositor::cropped(region, frame.width, frame.height),
        None => FrameCompositor::passthrough(),
    };
    let composed = compositor.compose(&frame);

    let suggested = format!("screenshot-{}.png", chrono::Utc::now().timestamp_millis());
    let Some(destination) = save_prompt.pick_save_path(&suggested) else {
        log::info!("screenshot save prompt cancelled");
        return Ok(ScreenshotOutcome::Cancelled);
    };

    encode_png(&composed, &destination)?;
    log::info!(
        "screenshot saved: {} ({}x{})",
        destination.display(),
        composed.width,
        composed.height
    );
    Ok(ScreenshotOutcome::Saved(destination))
}

/// Wait out the readiness gate and the settle delay, then poll until the
/// feed delivers a frame.
fn grab_one_frame<S: FrameSource>(
    source: &mut S,
    settle_delay: Duration,
) -> Result<Frame, CaptureError> {
    wait_for_dimensions(source, READY_POLL_INTERVAL, READY_POLL_ATTEMPTS)?;
    if !settle_delay.is_zero() {
        thread::sleep(settle_delay);
    }
    for _ in 0..READY_POLL_ATTEMPTS {
        if let Some(frame) = source.next_frame()? {
            return Ok(frame);
        }
        thread::sleep(READY_POLL_INTERVAL);
    }
    Err(CaptureError::SourceNotReady)
}

fn encode_png(frame: &Frame, destination: &std::path::Path) -> Result<(), CaptureError> {
    let image =
        image::RgbaImage::from_raw(frame.width, frame.height, frame.data.clone()).ok_or_else(
            || CaptureError::EncodingFailed("frame buffer does not match dimensions".into()),
        )?;
    image
        .save_with_format(destination, image::ImageFormat::Png)
        .map_err(|e| CaptureError::EncodingFailed(format!("png encode failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::capture_models::{CaptureSource, RegionSpec};
    use std::fs;

    struct SolidSource {
        width: u32,
        height: u32,
    }

    impl FrameSource for SolidSource {
        fn descriptor(&self) -> CaptureSource {
            CaptureSource {
                id: "solid".into(),
                native_width: self.width,
                native_height: self.height,
            }
        }

        fn dimensions(&self) -> (u32, u32) {
            (self.width, self.height)
        }

        fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
            let data = vec![0xff; (self.width * self.height * 4) as usize];
            Ok(Some(Frame::new(self.width, self.height, data)))
        }

        fn stop(&mut self) {}
    }

    struct SolidEnumerator {
        width: u32,
        height: u32,
    }

    impl SourceEnumerator for SolidEnumerator {
        type Source = SolidSource;

        fn open_primary(&mut self) -> Result<SolidSource, CaptureError> {
            Ok(SolidSource {
                width: self.width,
                height: self.height,
            })
        }
    }

    struct FixedSelector(Option<RegionSpec>);

    impl RegionSelector for FixedSelector {
        fn select_region(&mut self) -> Option<RegionSpec> {
            self.0
        }
    }

    struct FixedPrompt(Option<PathBuf>);

    impl SavePrompt for FixedPrompt {
        fn pick_save_path(&mut self, _suggested_name: &str) -> Option<PathBuf> {
            self.0.clone()
        }
    }

    fn temp_png() -> PathBuf {
        std::env::temp_dir().join(format!("screencap-shot-{}.png", uuid::Uuid::new_v4()))
    }

    fn instant_options(mode: CaptureMode) -> ScreenshotOptions {
        ScreenshotOptions {
            mode,
            settle_delay: Duration::ZERO,
        }
    }

    #[test]
    fn full_screen_screenshot_saves_png() {
        let path = temp_png();
        let outcome = capture_screenshot(
            &mut SolidEnumerator {
                width: 64,
                height: 48,
            },
            &mut FixedSelector(None),
            &mut FixedPrompt(Some(path.clone())),
            &instant_options(CaptureMode::FullScreen),
        )
        .unwrap();

        assert_eq!(outcome, ScreenshotOutcome::Saved(path.clone()));
        assert_eq!(image::image_dimensions(&path).unwrap(), (64, 48));
        fs::remove_file(&path).ok();
    }

    #[test]
    fn region_screenshot_is_cropped() {
        let path = temp_png();
        let region = RegionSpec {
            origin_x: 10,
            origin_y: 10,
            width: 20,
            height: 15,
            screen_width: 100,
            screen_height: 80,
        };
        let outcome = capture_screenshot(
            // 2x HiDPI stream over a 100x80 logical screen.
            &mut SolidEnumerator {
                width: 200,
                height: 160,
            },
            &mut FixedSelector(Some(region)),
            &mut FixedPrompt(Some(path.clone())),
            &instant_options(CaptureMode::Region),
        )
        .unwrap();

        assert_eq!(outcome, ScreenshotOutcome::Saved(path.clone()));
        assert_eq!(image::image_dimensions(&path).unwrap(), (40, 30));
        fs::remove_file(&path).ok();
    }

    #[test]
    fn settle_delay_runs_after_source_opens() {
        use parking_lot::Mutex;
        use std::sync::Arc;
        use std::time::Instant;

        struct StampedSource {
            first_poll_at: Arc<Mutex<Option<Instant>>>,
        }

        impl FrameSource for StampedSource {
            fn descriptor(&self) -> CaptureSource {
                CaptureSource {
                    id: "stamped".into(),
                    native_width: 8,
                    native_height: 8,
                }
            }

            fn dimensions(&self) -> (u32, u32) {
                (8, 8)
            }

            fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
                let mut stamp = self.first_poll_at.lock();
                if stamp.is_none() {
                    *stamp = Some(Instant::now());
                }
                Ok(Some(Frame::blank(8, 8)))
            }

            fn stop(&mut self) {}
        }

        struct StampedEnumerator {
            opened_at: Arc<Mutex<Option<Instant>>>,
            first_poll_at: Arc<Mutex<Option<Instant>>>,
        }

        impl SourceEnumerator for StampedEnumerator {
            type Source = StampedSource;

            fn open_primary(&mut self) -> Result<StampedSource, CaptureError> {
                *self.opened_at.lock() = Some(Instant::now());
                Ok(StampedSource {
                    first_poll_at: Arc::clone(&self.first_poll_at),
                })
            }
        }

        let opened_at = Arc::new(Mutex::new(None));
        let first_poll_at = Arc::new(Mutex::new(None));
        let path = temp_png();
        let options = ScreenshotOptions {
            mode: CaptureMode::FullScreen,
            settle_delay: Duration::from_millis(50),
        };

        let outcome = capture_screenshot(
            &mut StampedEnumerator {
                opened_at: Arc::clone(&opened_at),
                first_poll_at: Arc::clone(&first_poll_at),
            },
            &mut FixedSelector(None),
            &mut FixedPrompt(Some(path.clone())),
            &options,
        )
        .unwrap();
        assert_eq!(outcome, ScreenshotOutcome::Saved(path.clone()));

        let opened = opened_at.lock().unwrap();
        let polled = first_poll_at.lock().unwrap();
        assert!(
            polled.duration_since(opened) >= Duration::from_millis(50),
            "frame grabbed before the settle delay elapsed"
        );

        fs::remove_file(&path).ok();
    }

    #[test]
    fn cancelled_selection_writes_nothing() {
        let path = temp_png();
        let outcome = capture_screenshot(
            &mut SolidEnumerator {
                width: 64,
                height: 48,
            },
            &mut FixedSelector(None),
            &mut FixedPrompt(Some(path.clone())),
            &instant_options(CaptureMode::Region),
        )
        .unwrap();

        assert_eq!(outcome, ScreenshotOutcome::Cancelled);
        assert!(!path.exists());
    }

    #[test]
    fn cancelled_prompt_writes_nothing() {
        let outcome = capture_screenshot(
            &mut SolidEnumerator {
                width: 64,
                height: 48,
            },
            &mut FixedSelector(None),
            &mut FixedPrompt(None),
            &instant_options(CaptureMode::FullScreen),
        )
        .unwrap();

        assert_eq!(outcome, ScreenshotOutcome::Cancelled);
    }
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::models::capture_models::{Chunk, RegionSpec, SessionDiagnostics};
use crate::models::config::{CaptureMode, SessionConfig};
use crate::models::error::CaptureError;
use crate::models::outcome::{SessionOutcome, StartOutcome};
use crate::models::state::SessionState;
use crate::processing::compositor::{
    wait_for_dimensions, FrameCompositor, READY_POLL_ATTEMPTS, READY_POLL_INTERVAL,
};
use crate::processing::mix_bus::{to_int16_pcm, MixBus};
use crate::session::delegate_notify;
use crate::storage::container::ContainerHeader;
use crate::storage::metadata::{self, RecordingMetadata};
use crate::storage::stream_writer::{CloseOutcome, StreamWriter};
use crate::traits::audio_provider::AudioProvider;
use crate::traits::collaborators::{RegionSelector, SavePrompt};
use crate::traits::frame_source::{FrameSource, SourceEnumerator};
use crate::traits::session_delegate::SessionDelegate;
use crate::traits::transcoder::Transcoder;

/// Consecutive frame-read failures tolerated before the pipeline declares
/// the capture source dead.
const MAX_CONSECUTIVE_FAILURES: u32 = 10;

/// Internal mutable session state, shared with the pipeline thread.
struct SharedState {
    state: SessionState,
    diagnostics: SessionDiagnostics,
    /// Set by the pipeline thread when it dies; surfaced by `stop`.
    pipeline_failure: Option<CaptureError>,
    capture_start: Option<Instant>,
    paused_duration: Duration,
    last_pause_time: Option<Instant>,
}

impl SharedState {
    fn new() -> Self {
        Self {
            state: SessionState::Idle,
            diagnostics: SessionDiagnostics::default(),
            pipeline_failure: None,
            capture_start: None,
            paused_duration: Duration::ZERO,
            last_pause_time: None,
        }
    }

    /// Recorded duration, paused time excluded.
    fn elapsed_duration(&self) -> f64 {
        let Some(start) = self.capture_start else {
            return 0.0;
        };
        let mut paused = self.paused_duration;
        if let Some(pause_start) = self.last_pause_time {
            paused += pause_start.elapsed();
        }
        (start.elapsed().saturating_sub(paused)).as_secs_f64()
    }
}

/// Per-session bookkeeping held only while a session is active.
struct ActiveSession {
    region: Option<RegionSpec>,
    temp_file_path: std::path::PathBuf,
    header: ContainerHeader,
    audio_inputs: usize,
    bus: Arc<Mutex<MixBus>>,
}

/// The capture-composite-stream-transcode controller.
///
/// Owns one `CaptureSession` at a time and drives it from request to
/// finished artifact:
///
/// ```text
/// idle → selecting → initializing → recording ↔ paused → finalizing → idle
/// ```
///
/// Region selection, source enumeration, save prompting, and the final
/// encode are external collaborators injected at construction. Exactly one
/// session may be active; a start request while one is running is rejected
/// without touching it.
pub struct RecordingSession<E, M, S>
where
    E: SourceEnumerator,
    E::Source: 'static,
    M: AudioProvider,
    S: AudioProvider,
{
    enumerator: E,
    mic: M,
    system: S,
    selector: Box<dyn RegionSelector>,
    save_prompt: Box<dyn SavePrompt>,
    transcoder: Box<dyn Transcoder>,
    config: SessionConfig,
    delegate: Option<Arc<dyn SessionDelegate>>,

    shared: Arc<Mutex<SharedState>>,
    writer: Arc<Mutex<Option<StreamWriter>>>,
    pipeline_running: Arc<AtomicBool>,
    pipeline_handle: Option<thread::JoinHandle<()>>,
    active: Option<ActiveSession>,
}

impl<E, M, S> RecordingSession<E, M, S>
where
    E: SourceEnumerator,
    E::Source: 'static,
    M: AudioProvider,
    S: AudioProvider,
{
    pub fn new(
        enumerator: E,
        mic: M,
        system: S,
        selector: Box<dyn RegionSelector>,
        save_prompt: Box<dyn SavePrompt>,
        transcoder: Box<dyn Transcoder>,
        config: SessionConfig,
    ) -> Self {
        Self {
            enumerator,
            mic,
            system,
            selector,
            save_prompt,
            transcoder,
            config,
            delegate: None,
            shared: Arc::new(Mutex::new(SharedState::new())),
            writer: Arc::new(Mutex::new(None)),
            pipeline_running: Arc::new(AtomicBool::new(false)),
            pipeline_handle: None,
            active: None,
        }
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn SessionDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn state(&self) -> SessionState {
        self.shared.lock().state.clone()
    }

    pub fn diagnostics(&self) -> SessionDiagnostics {
        self.shared.lock().diagnostics
    }

    /// Payload bytes persisted to the intermediate file so far.
    pub fn bytes_written(&self) -> u64 {
        self.writer
            .lock()
            .as_ref()
            .map(|w| w.payload_bytes())
            .unwrap_or(0)
    }

    /// Start a recording session.
    ///
    /// For region sessions this blocks on the external region selector
    /// first; a dismissed selector returns
    /// [`StartOutcome::SelectionCancelled`] with no session created and no
    /// temp file on disk. Collaborators handle their own mid-dialog
    /// cancellation; nothing here holds resources until `Initializing`.
    pub fn start(&mut self) -> Result<StartOutcome, CaptureError> {
        self.config
            .validate()
            .map_err(CaptureError::ConfigurationFailed)?;

        {
            let s = self.shared.lock();
            if s.state.is_active() || matches!(s.state, SessionState::Selecting) {
                return Err(CaptureError::SessionActive);
            }
        }

        // Region pick happens before any resource is acquired.
        let region = if self.config.mode == CaptureMode::Region {
            self.set_state(SessionState::Selecting);
            match self.selector.select_region() {
                Some(region) => Some(region),
                None => {
                    log::info!("region selection cancelled");
                    self.set_state(SessionState::Idle);
                    return Ok(StartOutcome::SelectionCancelled);
                }
            }
        } else {
            None
        };

        self.set_state(SessionState::Initializing);

        let mut source = match self.enumerator.open_primary() {
            Ok(source) => source,
            Err(e) => return Err(self.abort_start(e)),
        };

        // The feed reports (0, 0) until device negotiation finishes.
        let (stream_w, stream_h) =
            match wait_for_dimensions(&source, READY_POLL_INTERVAL, READY_POLL_ATTEMPTS) {
                Ok(dims) => dims,
                Err(e) => {
                    source.stop();
                    return Err(self.abort_start(e));
                }
            };

        let compositor = match region {
            Some(ref region) => FrameCompositor::cropped(region, stream_w, stream_h),
            None => FrameCompositor::passthrough(),
        };
        let (out_w, out_h) = compositor.output_dimensions(stream_w, stream_h);
        let header = ContainerHeader {
            width: out_w,
            height: out_h,
            fps: self.config.target_fps,
            sample_rate: self.config.sample_rate,
            channels: 2,
        };

        let temp_file_path = self.config.temp_dir.join(format!(
            "temp-rec-{}.scap",
            chrono::Utc::now().timestamp_millis()
        ));
        let mut writer = StreamWriter::new(temp_file_path.clone());
        if let Err(e) = writer.open(&header) {
            source.stop();
            return Err(self.abort_start(e));
        }
        *self.writer.lock() = Some(writer);

        // Each audio source is independently optional; the bus keeps
        // whatever connected, down to zero.
        let mut bus = MixBus::new(self.config.sample_rate);
        if self.config.enable_mic {
            bus.connect(&mut self.mic, "microphone");
        }
        if self.config.enable_system_audio {
            bus.connect(&mut self.system, "system audio");
        }
        let audio_inputs = bus.input_count();
        let bus = Arc::new(Mutex::new(bus));

        self.active = Some(ActiveSession {
            region,
            temp_file_path,
            header,
            audio_inputs,
            bus: Arc::clone(&bus),
        });

        {
            let mut s = self.shared.lock();
            s.diagnostics = SessionDiagnostics::default();
            s.pipeline_failure = None;
            s.capture_start = Some(Instant::now());
            s.paused_duration = Duration::ZERO;
            s.last_pause_time = None;
        }
        self.set_state(SessionState::Recording { duration_secs: 0.0 });
        self.spawn_pipeline(source, compositor, bus);

        log::info!(
            "recording started: {}x{} @ {} fps, {} audio input(s)",
            out_w,
            out_h,
            self.config.target_fps,
            audio_inputs
        );
        Ok(StartOutcome::Started)
    }

    /// Pause frame production and audio flow. The temp file stays open.
    /// A no-op unless currently recording.
    pub fn pause(&mut self) {
        let paused = {
            let mut s = self.shared.lock();
            match s.state {
                SessionState::Recording { duration_secs } => {
                    s.last_pause_time = Some(Instant::now());
                    Some(duration_secs)
                }
                _ => None,
            }
        };
        if let Some(duration_secs) = paused {
            // Audio callbacks keep firing on the provider threads; the bus
            // drops their buffers until resume.
            if let Some(active) = &self.active {
                active.bus.lock().set_suspended(true);
            }
            self.set_state(SessionState::Paused { duration_secs });
        }
    }

    /// Resume frame production without reopening the file. A no-op unless
    /// currently paused.
    pub fn resume(&mut self) {
        let resumed = {
            let mut s = self.shared.lock();
            match s.state {
                SessionState::Paused { duration_secs } => {
                    if let Some(pause_start) = s.last_pause_time.take() {
                        s.paused_duration += pause_start.elapsed();
                    }
                    Some(duration_secs)
                }
                _ => None,
            }
        };
        if let Some(duration_secs) = resumed {
            if let Some(active) = &self.active {
                active.bus.lock().set_suspended(false);
            }
            self.set_state(SessionState::Recording { duration_secs });
        }
    }

    /// Stop the session and produce its terminal outcome.
    ///
    /// Finalization order is fixed: frame scheduling stops (and the feed
    /// is released), audio sources are stopped and the bus drained, the
    /// writer is flushed and closed. Only then is the size check trusted
    /// and the save-prompt/transcode decision made.
    pub fn stop(&mut self) -> Result<SessionOutcome, CaptureError> {
        {
            let s = self.shared.lock();
            if !s.state.is_recording() && !s.state.is_paused() {
                return Err(CaptureError::InvalidState(
                    "can only stop while recording or paused".into(),
                ));
            }
        }
        self.set_state(SessionState::Finalizing);

        // (a) stop frame scheduling; the pipeline thread releases the feed.
        self.pipeline_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.pipeline_handle.take() {
            let _ = handle.join();
        }

        // (b) stop and release audio sources before reading bus leftovers.
        self.mic.stop();
        self.system.stop();

        let active = self
            .active
            .take()
            .ok_or_else(|| CaptureError::InvalidState("no active session".into()))?;

        let pipeline_failure = self.shared.lock().pipeline_failure.take();
        if let Some(failure) = pipeline_failure {
            if let Some(mut writer) = self.writer.lock().take() {
                writer.abort();
            }
            return Err(self.finish_aborted(failure));
        }

        // Drain whatever the audio callbacks delivered after the last tick.
        let leftover = {
            let mut bus = active.bus.lock();
            let frames = bus.pending().div_ceil(2);
            bus.drain(frames)
        };
        if !leftover.is_empty() {
            let chunk = Chunk::audio(to_int16_pcm(&leftover));
            if let Some(writer) = self.writer.lock().as_mut() {
                if let Err(e) = writer.append(&chunk) {
                    log::warn!("failed to flush trailing audio: {e}");
                }
            }
        }

        // (c) flush-then-close; only a confirmed close makes the size
        // check trustworthy.
        let close_outcome = {
            let mut guard = self.writer.lock();
            match guard.as_mut() {
                Some(writer) => match writer.close() {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        if let Some(mut w) = guard.take() {
                            w.abort();
                        }
                        drop(guard);
                        return Err(self.finish_aborted(e));
                    }
                },
                None => CloseOutcome::NoData,
            }
        };

        match close_outcome {
            CloseOutcome::NoData => {
                self.writer.lock().take();
                self.finish_with(SessionOutcome::Cancelled)
            }
            CloseOutcome::Empty => {
                log::warn!("capture produced no data");
                if let Some(mut writer) = self.writer.lock().take() {
                    writer.abort();
                }
                self.finish_with(SessionOutcome::Empty)
            }
            CloseOutcome::Written { payload_bytes } => {
                log::info!("capture closed with {payload_bytes} payload bytes");
                self.finalize_artifact(active)
            }
        }
    }

    /// Save-prompt + transcode step for a non-empty capture.
    fn finalize_artifact(&mut self, active: ActiveSession) -> Result<SessionOutcome, CaptureError> {
        let suggested = format!("recording-{}.mp4", chrono::Utc::now().timestamp_millis());
        let Some(destination) = self.save_prompt.pick_save_path(&suggested) else {
            log::info!("save prompt cancelled, discarding capture");
            if let Some(mut writer) = self.writer.lock().take() {
                writer.abort();
            }
            return self.finish_with(SessionOutcome::Cancelled);
        };

        let duration_secs = self.shared.lock().elapsed_duration();
        match self
            .transcoder
            .transcode(&active.temp_file_path, &destination)
        {
            Ok(()) => {
                self.writer.lock().take();
                match RecordingMetadata::new(
                    &destination,
                    duration_secs,
                    active.header.width,
                    active.header.height,
                    active.header.fps,
                    active.audio_inputs,
                ) {
                    Ok(meta) => {
                        if let Err(e) = metadata::write_metadata(&meta, &destination) {
                            log::warn!("metadata sidecar not written: {e}");
                        }
                    }
                    Err(e) => log::warn!("metadata not computed: {e}"),
                }
                if active.region.is_some() {
                    log::debug!("region session saved at {}x{}", active.header.width, active.header.height);
                }
                self.finish_with(SessionOutcome::Saved(destination))
            }
            Err(e) => {
                // Intermediate stays on disk; a retry is a whole new
                // invocation over a fresh session.
                self.writer.lock().take();
                Err(self.finish_aborted(e))
            }
        }
    }

    fn finish_with(&mut self, outcome: SessionOutcome) -> Result<SessionOutcome, CaptureError> {
        {
            let mut s = self.shared.lock();
            s.capture_start = None;
            s.last_pause_time = None;
        }
        self.set_state(SessionState::Idle);
        delegate_notify(&self.delegate, |d| d.on_session_finished(&outcome));
        Ok(outcome)
    }

    fn finish_aborted(&mut self, error: CaptureError) -> CaptureError {
        log::error!("session aborted: {error}");
        {
            let mut s = self.shared.lock();
            s.capture_start = None;
            s.last_pause_time = None;
        }
        self.set_state(SessionState::Aborted(error.clone()));
        delegate_notify(&self.delegate, |d| d.on_error(&error));
        error
    }

    /// Abort during `Initializing`: no state is retained.
    fn abort_start(&mut self, error: CaptureError) -> CaptureError {
        if let Some(mut writer) = self.writer.lock().take() {
            writer.abort();
        }
        self.active = None;
        self.finish_aborted(error)
    }

    fn set_state(&self, new_state: SessionState) {
        self.shared.lock().state = new_state.clone();
        delegate_notify(&self.delegate, |d| d.on_state_changed(&new_state));
    }

    /// Spawn the per-session pipeline thread: one scheduling tick per
    /// frame interval while recording; paused ticks do nothing.
    fn spawn_pipeline(
        &mut self,
        mut source: E::Source,
        compositor: FrameCompositor,
        bus: Arc<Mutex<MixBus>>,
    ) {
        self.pipeline_running.store(true, Ordering::SeqCst);

        let running = Arc::clone(&self.pipeline_running);
        let shared = Arc::clone(&self.shared);
        let writer = Arc::clone(&self.writer);
        let interval = self.config.frame_interval();
        let frames_per_tick =
            (self.config.sample_rate as usize / self.config.target_fps as usize).max(1);

        let handle = thread::spawn(move || {
            let mut consecutive_errors = 0u32;

            while running.load(Ordering::SeqCst) {
                let tick_start = Instant::now();

                let is_recording = shared.lock().state.is_recording();
                if is_recording {
                    match source.next_frame() {
                        Ok(Some(frame)) => {
                            consecutive_errors = 0;
                            let composed = compositor.compose(&frame);
                            let chunk = Chunk::video(composed.data);
                            if let Err(e) = append_chunk(&writer, &shared, &chunk) {
                                shared.lock().pipeline_failure = Some(e);
                                break;
                            }
                            shared.lock().diagnostics.frames_composited += 1;
                        }
                        Ok(None) => {
                            shared.lock().diagnostics.frames_skipped += 1;
                        }
                        Err(e) => {
                            consecutive_errors += 1;
                            let mut s = shared.lock();
                            s.diagnostics.capture_errors += 1;
                            drop(s);
                            log::error!(
                                "frame capture failed ({consecutive_errors} consecutive): {e}"
                            );
                            if consecutive_errors >= MAX_CONSECUTIVE_FAILURES {
                                shared.lock().pipeline_failure =
                                    Some(CaptureError::SourceUnavailable(format!(
                                        "{MAX_CONSECUTIVE_FAILURES} consecutive read failures: {e}"
                                    )));
                                break;
                            }
                        }
                    }

                    let mixed = bus.lock().drain(frames_per_tick);
                    if !mixed.is_empty() {
                        let chunk = Chunk::audio(to_int16_pcm(&mixed));
                        if let Err(e) = append_chunk(&writer, &shared, &chunk) {
                            shared.lock().pipeline_failure = Some(e);
                            break;
                        }
                        shared.lock().diagnostics.audio_blocks += 1;
                    }

                    let mut s = shared.lock();
                    let duration_secs = s.elapsed_duration();
                    if s.state.is_recording() {
                        s.state = SessionState::Recording { duration_secs };
                    }
                }

                let elapsed = tick_start.elapsed();
                if elapsed < interval {
                    thread::sleep(interval - elapsed);
                }
            }

            source.stop();
        });

        self.pipeline_handle = Some(handle);
    }
}

/// Append one chunk and account for it; storage failures are returned for
/// the pipeline to record as fatal.
fn append_chunk(
    writer: &Mutex<Option<StreamWriter>>,
    shared: &Mutex<SharedState>,
    chunk: &Chunk,
) -> Result<(), CaptureError> {
    let mut guard = writer.lock();
    let Some(w) = guard.as_mut() else {
        // Writer already closed; producer is winding down.
        return Ok(());
    };
    w.append(chunk)?;
    let payload = w.payload_bytes();
    drop(guard);
    shared.lock().diagnostics.bytes_written = payload;
    Ok(())
}

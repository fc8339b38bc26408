use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::traits::audio_provider::{AudioBufferCallback, AudioProvider};

/// Unbounded-ish FIFO of interleaved stereo samples for one bus input.
///
/// Overflow drops the oldest samples so a stalled consumer cannot grow the
/// queue without bound.
#[derive(Debug)]
struct SampleQueue {
    samples: std::collections::VecDeque<f32>,
    capacity: usize,
}

impl SampleQueue {
    fn new(capacity: usize) -> Self {
        Self {
            samples: std::collections::VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, samples: &[f32]) {
        let overflow = (self.samples.len() + samples.len()).saturating_sub(self.capacity);
        if overflow > 0 {
            self.samples.drain(..overflow.min(self.samples.len()));
        }
        self.samples.extend(samples.iter().copied());
    }

    fn pop(&mut self, count: usize) -> Vec<f32> {
        let n = count.min(self.samples.len());
        self.samples.drain(..n).collect()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

/// Shared mixing destination for zero to two live audio sources.
///
/// Each source is connected independently; a failed connection simply
/// leaves the bus with fewer inputs, down to zero. Inputs are resampled to
/// the bus rate and widened to interleaved stereo at the edge, so draining
/// is a commutative per-sample sum; no input has priority.
pub struct MixBus {
    sample_rate: u32,
    inputs: Vec<Arc<Mutex<SampleQueue>>>,
    suspended: Arc<AtomicBool>,
}

impl MixBus {
    /// Five seconds of interleaved stereo per input before overflow.
    const QUEUE_SECONDS: usize = 5;

    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            inputs: Vec::new(),
            suspended: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Gate the input callbacks. While suspended, buffers delivered by
    /// provider callbacks are dropped instead of queued, so a paused
    /// session accumulates no audio.
    pub fn set_suspended(&self, suspended: bool) {
        self.suspended.store(suspended, Ordering::SeqCst);
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of sources currently feeding the bus.
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Try to connect a provider to the bus.
    ///
    /// Returns whether the connection succeeded. Failure is logged and
    /// absorbed; the session keeps whatever inputs it got.
    pub fn connect<P: AudioProvider>(&mut self, provider: &mut P, label: &str) -> bool {
        if !provider.is_available() {
            log::warn!("audio source '{label}' not available, continuing without it");
            return false;
        }

        let queue = Arc::new(Mutex::new(SampleQueue::new(
            self.sample_rate as usize * 2 * Self::QUEUE_SECONDS,
        )));
        let callback = self.input_callback(Arc::clone(&queue));

        match provider.start(callback) {
            Ok(()) => {
                self.inputs.push(queue);
                log::info!("audio source '{label}' connected to mix bus");
                true
            }
            Err(e) => {
                log::warn!("audio source '{label}' failed to start ({e}), continuing without it");
                false
            }
        }
    }

    /// Build the provider callback: resample to the bus rate, widen to
    /// interleaved stereo, enqueue.
    fn input_callback(&self, queue: Arc<Mutex<SampleQueue>>) -> AudioBufferCallback {
        let target_rate = self.sample_rate;
        let suspended = Arc::clone(&self.suspended);
        Arc::new(move |samples: &[f32], sample_rate: u32, channels: u16| {
            if suspended.load(Ordering::SeqCst) {
                return;
            }
            let stereo = match channels {
                0 => return,
                1 => {
                    let mono = resample(samples, sample_rate, target_rate);
                    interleave(&mono, &mono)
                }
                _ => resample_stereo(samples, sample_rate, target_rate),
            };
            queue.lock().push(&stereo);
        })
    }

    /// Mix and remove up to `frames` stereo frames from every input.
    ///
    /// Returns interleaved stereo, sized to the fullest input (shorter
    /// inputs are zero-padded). Empty when no input has pending samples;
    /// a session with zero usable sources simply never produces audio.
    pub fn drain(&mut self, frames: usize) -> Vec<f32> {
        let want = frames * 2;
        let mut mixed: Vec<f32> = Vec::new();
        for queue in &self.inputs {
            let chunk = queue.lock().pop(want);
            if chunk.len() > mixed.len() {
                mixed.resize(chunk.len(), 0.0);
            }
            for (acc, s) in mixed.iter_mut().zip(chunk.iter()) {
                *acc += s;
            }
        }
        mixed
    }

    /// Samples pending across all inputs.
    pub fn pending(&self) -> usize {
        self.inputs.iter().map(|q| q.lock().len()).sum()
    }
}

/// Linear-interpolation resampling for mono audio.
pub fn resample(samples: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if source_rate == target_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = target_rate as f64 / source_rate as f64;
    let output_count = (samples.len() as f64 * ratio) as usize;
    let mut output = vec![0.0f32; output_count];
    for (i, sample) in output.iter_mut().enumerate() {
        let source_index = i as f64 / ratio;
        let index = source_index as usize;
        let fraction = (source_index - index as f64) as f32;

        if index + 1 < samples.len() {
            *sample = samples[index] * (1.0 - fraction) + samples[index + 1] * fraction;
        } else if index < samples.len() {
            *sample = samples[index];
        }
    }
    output
}

/// Linear-interpolation resampling for interleaved stereo audio.
pub fn resample_stereo(samples: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if source_rate == target_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let frame_count = samples.len() / 2;
    let ratio = target_rate as f64 / source_rate as f64;
    let output_frames = (frame_count as f64 * ratio) as usize;
    let mut output = vec![0.0f32; output_frames * 2];
    for i in 0..output_frames {
        let source_index = i as f64 / ratio;
        let index = source_index as usize;
        let fraction = (source_index - index as f64) as f32;

        for ch in 0..2usize {
            if index + 1 < frame_count {
                output[i * 2 + ch] = samples[index * 2 + ch] * (1.0 - fraction)
                    + samples[(index + 1) * 2 + ch] * fraction;
            } else if index < frame_count {
                output[i * 2 + ch] = samples[index * 2 + ch];
            }
        }
    }
    output
}

/// Interleave two mono channels into stereo `[L0, R0, L1, R1, ...]`.
pub fn interleave(left: &[f32], right: &[f32]) -> Vec<f32> {
    let frame_count = left.len().max(right.len());
    let mut stereo = vec![0.0f32; frame_count * 2];
    for i in 0..frame_count {
        stereo[i * 2] = left.get(i).copied().unwrap_or(0.0);
        stereo[i * 2 + 1] = right.get(i).copied().unwrap_or(0.0);
    }
    stereo
}

/// Convert f32 samples `[-1.0, 1.0]` to 16-bit little-endian PCM.
///
/// Clamps out-of-range values. Output length = `samples.len() * 2` bytes.
pub fn to_int16_pcm(samples: &[f32]) -> Vec<u8> {
    let mut data = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        let value = (clamped * i16::MAX as f32) as i16;
        data.extend_from_slice(&value.to_le_bytes());
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::error::CaptureError;
    use approx::assert_relative_eq;

    /// Provider that synchronously pushes one fixed buffer on start.
    struct OneShotProvider {
        samples: Vec<f32>,
        sample_rate: u32,
        channels: u16,
        available: bool,
        stopped: bool,
    }

    impl OneShotProvider {
        fn stereo(samples: Vec<f32>) -> Self {
            Self {
                samples,
                sample_rate: 48000,
                channels: 2,
                available: true,
                stopped: false,
            }
        }
    }

    impl AudioProvider for OneShotProvider {
        fn is_available(&self) -> bool {
            self.available
        }

        fn start(&mut self, callback: AudioBufferCallback) -> Result<(), CaptureError> {
            callback(&self.samples, self.sample_rate, self.channels);
            Ok(())
        }

        fn stop(&mut self) {
            self.stopped = true;
        }
    }

    struct DeniedProvider;

    impl AudioProvider for DeniedProvider {
        fn is_available(&self) -> bool {
            true
        }

        fn start(&mut self, _callback: AudioBufferCallback) -> Result<(), CaptureError> {
            Err(CaptureError::SourceUnavailable("permission denied".into()))
        }

        fn stop(&mut self) {}
    }

    #[test]
    fn two_inputs_sum_commutatively() {
        let a = vec![0.1, 0.2, 0.3, 0.4];
        let b = vec![0.4, 0.3, 0.2, 0.1];

        let mix_ab = {
            let mut bus = MixBus::new(48000);
            bus.connect(&mut OneShotProvider::stereo(a.clone()), "a");
            bus.connect(&mut OneShotProvider::stereo(b.clone()), "b");
            bus.drain(2)
        };
        let mix_ba = {
            let mut bus = MixBus::new(48000);
            bus.connect(&mut OneShotProvider::stereo(b), "b");
            bus.connect(&mut OneShotProvider::stereo(a), "a");
            bus.drain(2)
        };

        assert_eq!(mix_ab.len(), 4);
        for (x, y) in mix_ab.iter().zip(mix_ba.iter()) {
            assert_relative_eq!(*x, *y);
        }
        assert_relative_eq!(mix_ab[0], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn failed_source_degrades_to_fewer_inputs() {
        let mut bus = MixBus::new(48000);
        assert!(!bus.connect(&mut DeniedProvider, "mic"));
        assert!(bus.connect(&mut OneShotProvider::stereo(vec![0.5, 0.5]), "system"));
        assert_eq!(bus.input_count(), 1);
        assert_eq!(bus.drain(1), vec![0.5, 0.5]);
    }

    #[test]
    fn zero_sources_yield_silence() {
        let mut bus = MixBus::new(48000);
        assert_eq!(bus.input_count(), 0);
        assert!(bus.drain(128).is_empty());
    }

    #[test]
    fn unequal_inputs_zero_padded() {
        let mut bus = MixBus::new(48000);
        bus.connect(&mut OneShotProvider::stereo(vec![0.1, 0.1, 0.1, 0.1]), "a");
        bus.connect(&mut OneShotProvider::stereo(vec![0.2, 0.2]), "b");

        let mixed = bus.drain(2);
        assert_eq!(mixed.len(), 4);
        assert_relative_eq!(mixed[0], 0.3, epsilon = 1e-6);
        assert_relative_eq!(mixed[2], 0.1, epsilon = 1e-6);
    }

    #[test]
    fn mono_input_widened_to_stereo() {
        let mut provider = OneShotProvider {
            samples: vec![0.25, 0.75],
            sample_rate: 48000,
            channels: 1,
            available: true,
            stopped: false,
        };
        let mut bus = MixBus::new(48000);
        bus.connect(&mut provider, "mic");

        assert_eq!(bus.drain(2), vec![0.25, 0.25, 0.75, 0.75]);
    }

    #[test]
    fn input_resampled_to_bus_rate() {
        let mut provider = OneShotProvider {
            samples: vec![0.0, 0.0, 1.0, 1.0], // 2 stereo frames at 24k
            sample_rate: 24000,
            channels: 2,
            available: true,
            stopped: false,
        };
        let mut bus = MixBus::new(48000);
        bus.connect(&mut provider, "mic");

        // 2 frames at 24kHz become 4 at 48kHz.
        let mixed = bus.drain(8);
        assert_eq!(mixed.len(), 8);
        assert_relative_eq!(mixed[2], 0.5, epsilon = 0.1); // interpolated midpoint
    }

    #[test]
    fn suspended_bus_drops_delivered_buffers() {
        struct RemoteProvider(Arc<Mutex<Option<AudioBufferCallback>>>);

        impl AudioProvider for RemoteProvider {
            fn is_available(&self) -> bool {
                true
            }

            fn start(&mut self, callback: AudioBufferCallback) -> Result<(), CaptureError> {
                *self.0.lock() = Some(callback);
                Ok(())
            }

            fn stop(&mut self) {}
        }

        let slot: Arc<Mutex<Option<AudioBufferCallback>>> = Arc::new(Mutex::new(None));
        let mut bus = MixBus::new(48000);
        bus.connect(&mut RemoteProvider(Arc::clone(&slot)), "mic");
        let callback = slot.lock().clone().unwrap();

        bus.set_suspended(true);
        callback(&[0.5, 0.5], 48000, 2);
        assert_eq!(bus.pending(), 0);

        bus.set_suspended(false);
        callback(&[0.5, 0.5], 48000, 2);
        assert_eq!(bus.pending(), 2);
    }

    #[test]
    fn queue_overflow_drops_oldest() {
        let mut q = SampleQueue::new(4);
        q.push(&[1.0, 2.0, 3.0, 4.0]);
        q.push(&[5.0, 6.0]);
        assert_eq!(q.pop(4), vec![3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn pcm_conversion_clamps() {
        let pcm = to_int16_pcm(&[0.0, 1.0, -1.0, 2.0]);
        assert_eq!(pcm.len(), 8);
        assert_eq!(i16::from_le_bytes([pcm[0], pcm[1]]), 0);
        assert_eq!(i16::from_le_bytes([pcm[2], pcm[3]]), i16::MAX);
        assert_eq!(i16::from_le_bytes([pcm[4], pcm[5]]), -i16::MAX);
        assert_eq!(i16::from_le_bytes([pcm[6], pcm[7]]), i16::MAX);
    }

    #[test]
    fn resample_passthrough_at_same_rate() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(resample(&samples, 48000, 48000), samples);
    }
}

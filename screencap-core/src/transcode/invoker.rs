use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::models::capture_models::ChunkKind;
use crate::models::error::CaptureError;
use crate::storage::container::{self, ContainerHeader, HEADER_SIZE};
use crate::traits::transcoder::Transcoder;
use crate::transcode::profile::{build_ffmpeg_args, EncoderProfile};

/// The intermediate container split into the raw streams ffmpeg consumes.
#[derive(Debug)]
pub struct DemuxedStreams {
    pub header: ContainerHeader,
    pub video_path: PathBuf,
    /// Absent when the capture had no usable audio source.
    pub audio_path: Option<PathBuf>,
}

impl DemuxedStreams {
    /// Remove the demuxed scratch files.
    pub fn cleanup(&self) {
        fs::remove_file(&self.video_path).ok();
        if let Some(ref audio) = self.audio_path {
            fs::remove_file(audio).ok();
        }
    }
}

/// Split an intermediate capture file into sibling `.video.raw` and
/// `.audio.pcm` files, preserving record order within each stream.
pub fn demux_streams(intermediate: &Path) -> Result<DemuxedStreams, CaptureError> {
    let file = File::open(intermediate).map_err(|e| {
        CaptureError::StorageError(format!("failed to open {}: {e}", intermediate.display()))
    })?;
    let mut reader = BufReader::new(file);

    let mut header_bytes = [0u8; HEADER_SIZE];
    reader
        .read_exact(&mut header_bytes)
        .map_err(|e| CaptureError::StorageError(format!("header read failed: {e}")))?;
    let (header, _) = container::parse_header(&header_bytes)?;

    let video_path = intermediate.with_extension("video.raw");
    let audio_path = intermediate.with_extension("audio.pcm");

    let mut video = BufWriter::new(File::create(&video_path).map_err(|e| {
        CaptureError::StorageError(format!("failed to create video stream: {e}"))
    })?);
    let mut audio = BufWriter::new(File::create(&audio_path).map_err(|e| {
        CaptureError::StorageError(format!("failed to create audio stream: {e}"))
    })?);

    let mut audio_bytes = 0u64;
    while let Some((kind, payload)) = container::read_record(&mut reader)? {
        match kind {
            ChunkKind::Video => video
                .write_all(&payload)
                .map_err(|e| CaptureError::StorageError(format!("video demux failed: {e}")))?,
            ChunkKind::Audio => {
                audio
                    .write_all(&payload)
                    .map_err(|e| CaptureError::StorageError(format!("audio demux failed: {e}")))?;
                audio_bytes += payload.len() as u64;
            }
        }
    }
    video
        .flush()
        .map_err(|e| CaptureError::StorageError(e.to_string()))?;
    audio
        .flush()
        .map_err(|e| CaptureError::StorageError(e.to_string()))?;

    // An audio-less capture feeds ffmpeg a single input.
    let audio_path = if audio_bytes > 0 {
        Some(audio_path)
    } else {
        fs::remove_file(&audio_path).ok();
        None
    };

    Ok(DemuxedStreams {
        header,
        video_path,
        audio_path,
    })
}

/// Runs the external `ffmpeg` encoder over a finished intermediate file.
pub struct FfmpegTranscoder {
    ffmpeg_path: PathBuf,
    profile: EncoderProfile,
}

impl FfmpegTranscoder {
    pub fn new() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            profile: EncoderProfile::for_platform(),
        }
    }

    /// Use a specific ffmpeg binary (bundled sidecar, custom install).
    pub fn with_binary(ffmpeg_path: PathBuf) -> Self {
        Self {
            ffmpeg_path,
            profile: EncoderProfile::for_platform(),
        }
    }

    pub fn with_profile(mut self, profile: EncoderProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Whether the configured ffmpeg binary can be executed.
    pub fn is_available(&self) -> bool {
        Command::new(&self.ffmpeg_path)
            .arg("-version")
            .output()
            .is_ok()
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcoder for FfmpegTranscoder {
    fn transcode(&mut self, intermediate: &Path, destination: &Path) -> Result<(), CaptureError> {
        let streams = demux_streams(intermediate)?;

        let args = build_ffmpeg_args(
            self.profile,
            &streams.header,
            &streams.video_path,
            streams.audio_path.as_deref(),
            destination,
        );
        log::info!(
            "invoking {} with args: {:?}",
            self.ffmpeg_path.display(),
            args
        );

        let output = Command::new(&self.ffmpeg_path).args(&args).output();
        streams.cleanup();

        let output = output.map_err(|e| {
            CaptureError::TranscodeFailed(format!(
                "failed to run {}: {e}",
                self.ffmpeg_path.display()
            ))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: String = stderr
                .lines()
                .rev()
                .take(5)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect::<Vec<_>>()
                .join("\n");
            log::error!("ffmpeg exited with {}: {tail}", output.status);
            // Intermediate is left in place so a retry can start over.
            return Err(CaptureError::TranscodeFailed(format!(
                "encoder exited with {}",
                output.status
            )));
        }

        if let Err(e) = fs::remove_file(intermediate) {
            log::warn!(
                "failed to remove intermediate {}: {e}",
                intermediate.display()
            );
        }
        log::info!("transcode finished: {}", destination.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::capture_models::Chunk;
    use crate::storage::stream_writer::StreamWriter;

    fn header() -> ContainerHeader {
        ContainerHeader {
            width: 2,
            height: 2,
            fps: 30,
            sample_rate: 48000,
            channels: 2,
        }
    }

    fn write_intermediate(name: &str, chunks: &[Chunk]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("screencap_demux_test_{name}.scap"));
        let mut writer = StreamWriter::new(path.clone());
        writer.open(&header()).unwrap();
        for chunk in chunks {
            writer.append(chunk).unwrap();
        }
        writer.close().unwrap();
        path
    }

    #[test]
    fn demux_splits_streams_in_order() {
        let path = write_intermediate(
            "split",
            &[
                Chunk::video(vec![1; 16]),
                Chunk::audio(vec![2; 4]),
                Chunk::video(vec![3; 16]),
                Chunk::audio(vec![4; 4]),
            ],
        );

        let streams = demux_streams(&path).unwrap();
        assert_eq!(streams.header, header());

        let video = fs::read(&streams.video_path).unwrap();
        assert_eq!(video.len(), 32);
        assert_eq!(&video[..16], &[1u8; 16][..]);
        assert_eq!(&video[16..], &[3u8; 16][..]);

        let audio = fs::read(streams.audio_path.as_ref().unwrap()).unwrap();
        assert_eq!(audio, [vec![2u8; 4], vec![4u8; 4]].concat());

        streams.cleanup();
        assert!(!streams.video_path.exists());
        fs::remove_file(&path).ok();
    }

    #[test]
    fn demux_without_audio_records_yields_video_only() {
        let path = write_intermediate("noaudio", &[Chunk::video(vec![9; 16])]);

        let streams = demux_streams(&path).unwrap();
        assert!(streams.audio_path.is_none());
        assert!(streams.video_path.exists());

        streams.cleanup();
        fs::remove_file(&path).ok();
    }

    #[test]
    fn demux_missing_file_is_storage_error() {
        let missing = std::env::temp_dir().join("screencap_demux_missing.scap");
        assert!(matches!(
            demux_streams(&missing),
            Err(CaptureError::StorageError(_))
        ));
    }
}

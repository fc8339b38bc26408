use std::path::Path;

use crate::storage::container::ContainerHeader;

/// Platform-appropriate codec parameters for the external encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderProfile {
    /// Hardware-accelerated H.264 (macOS VideoToolbox), fixed high bitrate.
    VideoToolbox,
    /// Software H.264 with speed/quality trade-off flags.
    X264,
}

impl EncoderProfile {
    /// The profile for the current platform family.
    pub fn for_platform() -> Self {
        if cfg!(target_os = "macos") {
            Self::VideoToolbox
        } else {
            Self::X264
        }
    }

    pub fn codec(&self) -> &'static str {
        match self {
            Self::VideoToolbox => "h264_videotoolbox",
            Self::X264 => "libx264",
        }
    }

    fn output_flags(&self) -> &'static [&'static str] {
        match self {
            Self::VideoToolbox => &["-b:v", "20000k"],
            Self::X264 => &["-preset", "ultrafast", "-crf", "23", "-pix_fmt", "yuv420p"],
        }
    }
}

/// Build the full ffmpeg argument list for one transcode invocation.
///
/// The video input is a raw RGBA stream of the container's dimensions and
/// rate; the audio input, when present, is interleaved 16-bit PCM at the
/// container's sample rate.
pub fn build_ffmpeg_args(
    profile: EncoderProfile,
    header: &ContainerHeader,
    video_path: &Path,
    audio_path: Option<&Path>,
    destination: &Path,
) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-y".into(),
        "-f".into(),
        "rawvideo".into(),
        "-pix_fmt".into(),
        "rgba".into(),
        "-s".into(),
        format!("{}x{}", header.width, header.height),
        "-r".into(),
        header.fps.to_string(),
        "-i".into(),
        video_path.to_string_lossy().into_owned(),
    ];

    if let Some(audio) = audio_path {
        args.extend([
            "-f".into(),
            "s16le".into(),
            "-ar".into(),
            header.sample_rate.to_string(),
            "-ac".into(),
            header.channels.to_string(),
            "-i".into(),
            audio.to_string_lossy().into_owned(),
        ]);
    }

    args.extend(["-c:v".into(), profile.codec().into()]);
    args.extend(profile.output_flags().iter().map(|s| (*s).to_string()));

    if audio_path.is_some() {
        args.extend(["-c:a".into(), "aac".into(), "-shortest".into()]);
    }

    args.push(destination.to_string_lossy().into_owned());
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn header() -> ContainerHeader {
        ContainerHeader {
            width: 800,
            height: 600,
            fps: 30,
            sample_rate: 48000,
            channels: 2,
        }
    }

    #[test]
    fn platform_profile_codec() {
        let profile = EncoderProfile::for_platform();
        if cfg!(target_os = "macos") {
            assert_eq!(profile.codec(), "h264_videotoolbox");
        } else {
            assert_eq!(profile.codec(), "libx264");
        }
    }

    #[test]
    fn video_only_args() {
        let args = build_ffmpeg_args(
            EncoderProfile::X264,
            &header(),
            &PathBuf::from("/tmp/v.raw"),
            None,
            &PathBuf::from("/tmp/out.mp4"),
        );

        assert_eq!(
            args,
            vec![
                "-y", "-f", "rawvideo", "-pix_fmt", "rgba", "-s", "800x600", "-r", "30", "-i",
                "/tmp/v.raw", "-c:v", "libx264", "-preset", "ultrafast", "-crf", "23", "-pix_fmt",
                "yuv420p", "/tmp/out.mp4",
            ]
        );
    }

    #[test]
    fn audio_input_adds_pcm_stream() {
        let args = build_ffmpeg_args(
            EncoderProfile::VideoToolbox,
            &header(),
            &PathBuf::from("/tmp/v.raw"),
            Some(&PathBuf::from("/tmp/a.pcm")),
            &PathBuf::from("/tmp/out.mp4"),
        );

        let joined = args.join(" ");
        assert!(joined.contains("-f s16le -ar 48000 -ac 2 -i /tmp/a.pcm"));
        assert!(joined.contains("-c:v h264_videotoolbox -b:v 20000k"));
        assert!(joined.contains("-c:a aac -shortest"));
        assert_eq!(args.last().unwrap(), "/tmp/out.mp4");
    }
}

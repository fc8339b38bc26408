pub mod invoker;
pub mod profile;

pub use invoker::{demux_streams, DemuxedStreams, FfmpegTranscoder};
pub use profile::EncoderProfile;

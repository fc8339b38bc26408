pub mod audio_provider;
pub mod collaborators;
pub mod frame_source;
pub mod session_delegate;
pub mod transcoder;

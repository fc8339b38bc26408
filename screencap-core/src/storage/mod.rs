pub mod container;
pub mod metadata;
pub mod stream_writer;

//! Splits a file into chunks, encodes them and posts them concurrently.

pub mod encoder;
pub mod splitter;
pub mod uploader;

pub use splitter::ChunkRange;
pub use uploader::{UploadReport, Uploader};

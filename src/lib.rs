//! `chunked-upload` is a crate to upload a file to an HTTP endpoint as a series of fixed-size chunks.
//!
//! The file is split into `ceil(size / chunk_size)` byte ranges. Every range is encoded as a
//! base64 data URL and posted as a multipart form with these fields:
//! * `data`: the data URL of the chunk bytes.
//! * `fileName`, `fileType`: name and MIME type of the original file.
//! * `chunksCount`: the total number of chunks.
//! * `fileNum`: the zero-based index of the chunk.
//!
//! The server answers every chunk with a JSON object; `{"complete": true}` tells the client
//! that the transfer is finished.
//!
//! ## Example
//!
//! To upload a single file:
//! ```rust,no_run
//! # async fn run() -> Result<(), chunked_upload::helper::Error> {
//! use chunked_upload::settings::Overrides;
//!
//! let report = chunked_upload::helper::upload(
//!     "the/path/to/my_file",  // the file path
//!     Overrides {
//!         upload_url: Some("https://example.com/accept".to_owned()),  // the endpoint
//!         chunk_size: Some(120_000),  // bytes per chunk
//!         ..Default::default()
//!     },
//! )
//! .await?;
//! println!("{}/{} chunks acknowledged", report.acknowledged.len(), report.total);
//! # Ok(())
//! # }
//! ```
//!
//! To bind the upload to a trigger, the way a button click starts it:
//! ```rust,no_run
//! # async fn run() {
//! use chunked_upload::{api::HttpTransport, client::Upload, file::PathPicker, settings::Overrides, trigger::TriggerBoard};
//! use std::sync::Arc;
//!
//! let picker = PathPicker::new().select("file", "the/path/to/my_file");
//! let upload = Upload::new(Arc::new(picker), Arc::new(HttpTransport::new()));
//! upload
//!     .defaults(Overrides {
//!         upload_url: Some("https://example.com/accept".to_owned()),
//!         ..Default::default()
//!     })
//!     .on_complete(|| println!("done"));
//!
//! let board = TriggerBoard::new();
//! upload.attach(&board, "file-upload");
//! for handle in board.activate("file-upload") {
//!     let _ = handle.await;
//! }
//! # }
//! ```

pub mod api;
pub mod client;
pub mod file;
pub mod helper;
pub mod settings;
pub mod trigger;
pub mod upload;

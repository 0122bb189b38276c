//! Upload options with their defaults and override rules.
//!
//! A [`Settings`] value always carries every option. Overrides only replace the keys they
//! name, and keys the crate doesn't know are ignored when overrides come from JSON.

use serde::Deserialize;
use std::{
    fmt, fs, io,
    path::Path,
    sync::{Arc, Mutex},
};
use thiserror::Error;

pub const DEFAULT_UPLOAD_URL: &str = "upload.php";
pub const DEFAULT_FILE_ID: &str = "file";
pub const DEFAULT_CHUNK_SIZE: u64 = 100_000;
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0:?}")]
    IoError(#[from] io::Error),
    #[error("Serde JSON parsing error: {0:?}")]
    SerdeJSONError(#[from] serde_json::Error),
}

/// Called once the upload is considered finished, see [`CompletionPolicy`].
pub type CompleteListener = Arc<dyn Fn() + Send + Sync + 'static>;

/// Called after every acknowledged chunk with `(file name, chunk index, acknowledged, total)`.
pub type ProgressListener = Arc<Mutex<dyn FnMut(Arc<String>, u64, u64, u64) + Send + Sync + 'static>>;

/// Decides when the completion listener fires. It fires at most once per upload either way.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompletionPolicy {
    /// On the first response carrying `"complete": true`, whatever chunk it answers.
    #[default]
    ServerFlag,
    /// When every chunk index has been acknowledged by the server.
    AllAcknowledged,
}

#[derive(Clone)]
pub struct Settings {
    pub upload_url: String,
    pub file_id: String,
    pub chunk_size: u64,
    /// Chunk requests allowed in flight at once. `0` dispatches all chunks at once.
    pub max_concurrent: usize,
    pub completion: CompletionPolicy,
    pub on_complete: CompleteListener,
    pub progress_listener: Option<ProgressListener>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            upload_url: DEFAULT_UPLOAD_URL.to_owned(),
            file_id: DEFAULT_FILE_ID.to_owned(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            completion: CompletionPolicy::default(),
            on_complete: Arc::new(|| tracing::info!("upload complete")),
            progress_listener: None,
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("upload_url", &self.upload_url)
            .field("file_id", &self.file_id)
            .field("chunk_size", &self.chunk_size)
            .field("max_concurrent", &self.max_concurrent)
            .field("completion", &self.completion)
            .field("progress_listener", &self.progress_listener.is_some())
            .finish()
    }
}

impl Settings {
    /// Replaces every option present in `overrides`. Values are stored as given, a zero
    /// chunk size included; it is rejected later when the file is split.
    pub fn defaults(&mut self, overrides: Overrides) -> &mut Self {
        let Overrides {
            upload_url,
            file_id,
            chunk_size,
            max_concurrent,
            completion,
        } = overrides;

        if let Some(v) = upload_url {
            self.upload_url = v;
        }
        if let Some(v) = file_id {
            self.file_id = v;
        }
        if let Some(v) = chunk_size {
            self.chunk_size = v;
        }
        if let Some(v) = max_concurrent {
            self.max_concurrent = v;
        }
        if let Some(v) = completion {
            self.completion = v;
        }
        self
    }

    pub fn on_complete(&mut self, f: impl Fn() + Send + Sync + 'static) -> &mut Self {
        self.on_complete = Arc::new(f);
        self
    }

    pub fn on_progress(
        &mut self,
        f: impl FnMut(Arc<String>, u64, u64, u64) + Send + Sync + 'static,
    ) -> &mut Self {
        self.progress_listener = Some(Arc::new(Mutex::new(f)));
        self
    }
}

/// The serializable subset of [`Settings`]. Unset fields leave the current value alone.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Overrides {
    pub upload_url: Option<String>,
    pub file_id: Option<String>,
    pub chunk_size: Option<u64>,
    pub max_concurrent: Option<usize>,
    pub completion: Option<CompletionPolicy>,
}

impl Overrides {
    pub fn from_json_str(s: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}

use crate::{
    api::Transport,
    file::FilePicker,
    settings::{Overrides, Settings},
    trigger::TriggerBoard,
    upload::{uploader, UploadReport, Uploader},
};
use futures::FutureExt;
use std::{
    io,
    sync::{Arc, RwLock},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Please choose a file. Nothing is selected in input `{0}`")]
    NoFileSelected(String),
    #[error("IO error")]
    IoError(#[from] io::Error),
    #[error("Upload error: {0}")]
    UploadError(#[from] uploader::Error),
}

/// Uploads the file selected in the configured input.
///
/// The settings can be changed at any time. Every run works on a snapshot taken when it
/// starts, so in-flight chunks keep the settings they were dispatched with.
pub struct Upload {
    settings: Arc<RwLock<Settings>>,
    picker: Arc<dyn FilePicker>,
    transport: Arc<dyn Transport>,
}

impl Upload {
    pub fn new(picker: Arc<dyn FilePicker>, transport: Arc<dyn Transport>) -> Self {
        Upload {
            settings: Arc::new(RwLock::new(Settings::default())),
            picker,
            transport,
        }
    }

    pub fn defaults(&self, overrides: Overrides) -> &Self {
        self.settings
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .defaults(overrides);
        self
    }

    pub fn on_complete(&self, f: impl Fn() + Send + Sync + 'static) -> &Self {
        self.settings
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .on_complete(f);
        self
    }

    pub fn on_progress(
        &self,
        f: impl FnMut(Arc<String>, u64, u64, u64) + Send + Sync + 'static,
    ) -> &Self {
        self.settings
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .on_progress(f);
        self
    }

    /// A copy of the current settings.
    pub fn settings(&self) -> Settings {
        self.settings
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Uploads the first file selected in the `file_id` input.
    ///
    /// Returns `Ok(None)` without doing anything when the picker can't read files, and
    /// [`Error::NoFileSelected`] when the input is empty. Nothing is shared between runs, so
    /// running twice uploads the file twice.
    pub async fn run(&self) -> Result<Option<UploadReport>, Error> {
        run_once(
            self.settings.clone(),
            self.picker.clone(),
            self.transport.clone(),
        )
        .await
    }

    /// Starts a run every time `selector` is activated on `board`.
    pub fn attach(&self, board: &TriggerBoard, selector: &str) {
        let settings = self.settings.clone();
        let picker = self.picker.clone();
        let transport = self.transport.clone();

        board.register(selector, move || {
            run_once(settings.clone(), picker.clone(), transport.clone())
                .map(|result| {
                    if let Err(e) = result {
                        tracing::warn!(error = %e, "upload not started");
                    }
                })
                .boxed()
        });
    }
}

async fn run_once(
    settings: Arc<RwLock<Settings>>,
    picker: Arc<dyn FilePicker>,
    transport: Arc<dyn Transport>,
) -> Result<Option<UploadReport>, Error> {
    if !picker.is_supported() {
        tracing::debug!("file reading is not supported, skipping upload");
        return Ok(None);
    }

    let snapshot = Arc::new(settings.read().unwrap_or_else(|e| e.into_inner()).clone());

    let file = picker
        .selected_files(&snapshot.file_id)?
        .into_iter()
        .next()
        .ok_or_else(|| Error::NoFileSelected(snapshot.file_id.clone()))?;

    let report = Uploader::new(snapshot, transport).upload_file(file).await?;
    Ok(Some(report))
}

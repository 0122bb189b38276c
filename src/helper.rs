//! One-call uploads of files on disk.

use crate::{
    api::{HttpTransport, Transport},
    file::DiskFile,
    settings::{Overrides, Settings},
    upload::{uploader, UploadReport, Uploader},
};
use std::{io, path::Path, sync::Arc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error")]
    IoError(#[from] io::Error),
    #[error("Upload error: {0}")]
    UploadError(#[from] uploader::Error),
}

/// Uploads the file at `path` over HTTP with the default settings plus `overrides`.
pub async fn upload(path: impl AsRef<Path>, overrides: Overrides) -> Result<UploadReport, Error> {
    let mut settings = Settings::default();
    settings.defaults(overrides);
    upload_with(path, settings, Arc::new(HttpTransport::new())).await
}

pub async fn upload_with(
    path: impl AsRef<Path>,
    settings: Settings,
    transport: Arc<dyn Transport>,
) -> Result<UploadReport, Error> {
    let file = DiskFile::open(path)?;
    let report = Uploader::new(Arc::new(settings), transport)
        .upload_file(Arc::new(file))
        .await?;
    Ok(report)
}

use super::{encoder, splitter};
use crate::{
    api::{self, ChunkForm, ChunkResponse, Transport},
    file::FileHandle,
    settings::{CompletionPolicy, Settings},
};
use futures::future::select_all;
use std::{
    collections::{BTreeMap, BTreeSet},
    io, mem,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};
use thiserror::Error;
use tokio::task::{JoinError, JoinHandle};

#[derive(Error, Debug)]
pub enum Error {
    #[error("Chunk splitting error: {0}")]
    SplitError(#[from] splitter::Error),
}

/// Why a single chunk didn't make it. Chunk failures are recorded, never retried.
#[derive(Error, Debug)]
pub enum ChunkError {
    #[error("IO error while reading chunk: {0:?}")]
    IoError(#[from] io::Error),
    #[error("Tokio task join error: {0}")]
    JoinError(#[from] JoinError),
    #[error("Upload error: {0}")]
    ApiError(#[from] api::Error),
}

/// Per-index bookkeeping of one upload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub file_name: String,
    pub total: u64,
    pub acknowledged: BTreeSet<u64>,
    /// Failed chunk indices with the reason.
    pub failed: BTreeMap<u64, String>,
    /// Whether any response carried `"complete": true`.
    pub server_complete: bool,
}

impl UploadReport {
    /// Every chunk index was acknowledged by the server.
    pub fn is_complete(&self) -> bool {
        self.acknowledged.len() as u64 == self.total
    }

    pub fn missing(&self) -> Vec<u64> {
        (0..self.total)
            .filter(|i| !self.acknowledged.contains(i))
            .collect()
    }
}

struct Progress {
    name: Arc<String>,
    total: u64,
    acknowledged: Mutex<BTreeSet<u64>>,
    server_complete: AtomicBool,
    notified: AtomicBool,
}

impl Progress {
    fn acknowledge(&self, settings: &Settings, index: u64, response: &ChunkResponse) {
        let acknowledged = {
            let mut set = self.acknowledged.lock().unwrap_or_else(|e| e.into_inner());
            set.insert(index);
            set.len() as u64
        };
        if response.complete {
            self.server_complete.store(true, Ordering::SeqCst);
        }

        tracing::debug!(
            file = %self.name,
            chunk = index,
            acknowledged,
            total = self.total,
            complete = response.complete,
            "chunk acknowledged"
        );

        if let Some(pl) = settings.progress_listener.as_ref() {
            if let Ok(mut f) = pl.lock() {
                f(self.name.clone(), index, acknowledged, self.total);
            }
        }

        let done = match settings.completion {
            CompletionPolicy::ServerFlag => response.complete,
            CompletionPolicy::AllAcknowledged => acknowledged == self.total,
        };
        if done && !self.notified.swap(true, Ordering::SeqCst) {
            tracing::info!(file = %self.name, chunk = index, total = self.total, "upload finished");
            (settings.on_complete)();
        }
    }
}

/// Uploads files chunk by chunk with a fixed snapshot of [`Settings`].
#[derive(Clone)]
pub struct Uploader {
    settings: Arc<Settings>,
    transport: Arc<dyn Transport>,
}

impl Uploader {
    pub fn new(settings: Arc<Settings>, transport: Arc<dyn Transport>) -> Self {
        Uploader {
            settings,
            transport,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Posts every chunk of `file` and waits until each request has either been answered or
    /// failed. At most `max_concurrent` chunks are in flight unless it is `0`.
    ///
    /// Chunk failures don't fail the upload, they end up in [`UploadReport::failed`].
    pub async fn upload_file(&self, file: Arc<dyn FileHandle>) -> Result<UploadReport, Error> {
        let size = file.size();
        let splitter = splitter::Splitter::new(size, self.settings.chunk_size)?;
        let total = splitter.total();

        let progress = Arc::new(Progress {
            name: Arc::new(file.name().to_owned()),
            total,
            acknowledged: Mutex::new(BTreeSet::new()),
            server_complete: AtomicBool::new(false),
            notified: AtomicBool::new(false),
        });

        tracing::info!(
            file = %progress.name,
            size,
            chunk_size = self.settings.chunk_size,
            chunks = total,
            url = %self.settings.upload_url,
            "starting upload"
        );

        let max_concurrent = self.settings.max_concurrent;
        let mut tasks: Vec<JoinHandle<Result<(), ChunkError>>> = vec![];
        // chunk index of each task, kept in step with `tasks`
        let mut indices: Vec<u64> = vec![];
        let mut failed = BTreeMap::new();

        for range in splitter {
            if max_concurrent > 0 && tasks.len() >= max_concurrent {
                let (result, pos, remnant) = select_all(mem::take(&mut tasks)).await;
                tasks = remnant;
                // `select_all` removes the finished future with `swap_remove`
                let index = indices.swap_remove(pos);
                Self::record(&progress, &mut failed, index, result);
            }

            indices.push(range.index);
            tasks.push(tokio::spawn(Self::upload_chunk(
                self.settings.clone(),
                self.transport.clone(),
                file.clone(),
                range,
                progress.clone(),
            )));
        }

        for (index, task) in indices.into_iter().zip(tasks) {
            Self::record(&progress, &mut failed, index, task.await);
        }

        let acknowledged = progress
            .acknowledged
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        Ok(UploadReport {
            file_name: progress.name.to_string(),
            total,
            acknowledged,
            failed,
            server_complete: progress.server_complete.load(Ordering::SeqCst),
        })
    }

    fn record(
        progress: &Progress,
        failed: &mut BTreeMap<u64, String>,
        index: u64,
        result: Result<Result<(), ChunkError>, JoinError>,
    ) {
        // a panicking listener fails only the chunk whose task ran it
        if let Err(e) = result.map_err(ChunkError::from).and_then(|x| x) {
            tracing::warn!(file = %progress.name, chunk = index, error = %e, "chunk upload failed");
            failed.insert(index, e.to_string());
        }
    }

    async fn upload_chunk(
        settings: Arc<Settings>,
        transport: Arc<dyn Transport>,
        file: Arc<dyn FileHandle>,
        range: splitter::ChunkRange,
        progress: Arc<Progress>,
    ) -> Result<(), ChunkError> {
        let index = range.index;

        let reader = file.clone();
        let bytes =
            tokio::task::spawn_blocking(move || reader.read_range(range.start, range.stop))
                .await??;

        let form = ChunkForm {
            data: encoder::to_data_url(&bytes),
            file_name: file.name().to_owned(),
            file_type: file.mime_type().to_owned(),
            chunks_count: range.count,
            file_num: index,
        };

        tracing::debug!(
            file = %progress.name,
            chunk = index,
            start = range.start,
            len = bytes.len(),
            "posting chunk"
        );
        let response = transport.post(&settings.upload_url, form).await?;
        progress.acknowledge(&settings, index, &response);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::MemoryFile;
    use futures::{future::BoxFuture, FutureExt};
    use std::sync::atomic::AtomicUsize;

    /// Acknowledges every chunk but those in `fail`; only `complete_on` gets the completion flag.
    struct Scripted {
        fail: Vec<u64>,
        complete_on: Option<u64>,
        forms: Mutex<Vec<ChunkForm>>,
    }

    impl Scripted {
        fn new(fail: Vec<u64>, complete_on: Option<u64>) -> Arc<Self> {
            Arc::new(Scripted {
                fail,
                complete_on,
                forms: Mutex::new(vec![]),
            })
        }
    }

    impl Transport for Scripted {
        fn post(&self, _url: &str, form: ChunkForm) -> BoxFuture<'static, Result<ChunkResponse, api::Error>> {
            let index = form.file_num;
            self.forms.lock().unwrap().push(form);

            let result = if self.fail.contains(&index) {
                Err(api::Error::StatusError(500, "boom".to_owned()))
            } else {
                Ok(ChunkResponse {
                    complete: self.complete_on == Some(index),
                })
            };
            async move { result }.boxed()
        }
    }

    fn settings(chunk_size: u64, completion: CompletionPolicy, calls: Arc<AtomicUsize>) -> Arc<Settings> {
        let mut settings = Settings::default();
        settings.chunk_size = chunk_size;
        settings.completion = completion;
        settings.on_complete(move || {
            calls.fetch_add(1, Ordering::SeqCst);
        });
        Arc::new(settings)
    }

    fn file(len: usize) -> Arc<dyn FileHandle> {
        Arc::new(MemoryFile::new(
            "data.bin",
            "application/x-test",
            (0..len).map(|i| (i % 251) as u8).collect(),
        ))
    }

    #[tokio::test]
    async fn failed_chunks_are_reported_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let transport = Scripted::new(vec![1, 3], None);
        let uploader = Uploader::new(
            settings(10, CompletionPolicy::AllAcknowledged, calls.clone()),
            transport.clone(),
        );

        let report = uploader.upload_file(file(45)).await.unwrap();
        assert_eq!(report.total, 5);
        assert_eq!(transport.forms.lock().unwrap().len(), 5);
        assert_eq!(report.acknowledged, BTreeSet::from([0, 2, 4]));
        assert_eq!(report.failed.keys().copied().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(report.missing(), vec![1, 3]);
        assert!(!report.is_complete());
        assert!(!report.server_complete);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn all_acknowledged_policy_ignores_server_flag() {
        let calls = Arc::new(AtomicUsize::new(0));
        let transport = Scripted::new(vec![2], Some(0));
        let uploader = Uploader::new(
            settings(10, CompletionPolicy::AllAcknowledged, calls.clone()),
            transport,
        );

        let report = uploader.upload_file(file(30)).await.unwrap();
        assert!(report.server_complete);
        assert!(!report.is_complete());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn all_acknowledged_policy_fires_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let uploader = Uploader::new(
            settings(7, CompletionPolicy::AllAcknowledged, calls.clone()),
            Scripted::new(vec![], None),
        );

        let report = uploader.upload_file(file(50)).await.unwrap();
        assert_eq!(report.total, 8);
        assert!(report.is_complete());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn payload_carries_clamped_bytes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let transport = Scripted::new(vec![], None);
        let uploader = Uploader::new(
            settings(4, CompletionPolicy::ServerFlag, calls),
            transport.clone(),
        );

        uploader.upload_file(file(10)).await.unwrap();

        let mut forms = transport.forms.lock().unwrap().clone();
        forms.sort_by_key(|f| f.file_num);
        assert_eq!(forms.len(), 3);

        let mut joined = vec![];
        for form in &forms {
            assert_eq!(form.chunks_count, 3);
            assert_eq!(form.file_name, "data.bin");
            assert_eq!(form.file_type, "application/x-test");
            joined.extend(encoder::from_data_url(&form.data).unwrap());
        }
        assert_eq!(encoder::from_data_url(&forms[2].data).unwrap().len(), 2);
        assert_eq!(joined, (0..10u8).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn panicking_listener_fails_only_its_chunk() {
        let transport = Scripted::new(vec![], Some(4));
        let mut settings = Settings::default();
        settings.chunk_size = 10;
        settings.max_concurrent = 3;
        settings.on_complete(|| panic!("listener blew up"));
        let uploader = Uploader::new(Arc::new(settings), transport.clone());

        let report = uploader.upload_file(file(100)).await.unwrap();
        assert_eq!(transport.forms.lock().unwrap().len(), 10);
        assert_eq!(report.total, 10);
        assert_eq!(report.acknowledged.len(), 10);
        assert!(report.server_complete);
        assert_eq!(report.failed.keys().copied().collect::<Vec<_>>(), vec![4]);
        assert!(report.failed[&4].contains("join error"));
    }

    #[tokio::test]
    async fn zero_chunk_size_is_rejected() {
        let calls = Arc::new(AtomicUsize::new(0));
        let transport = Scripted::new(vec![], None);
        let uploader = Uploader::new(
            settings(0, CompletionPolicy::ServerFlag, calls),
            transport.clone(),
        );

        let result = uploader.upload_file(file(10)).await;
        assert!(matches!(
            result,
            Err(Error::SplitError(splitter::Error::InvalidChunkSize))
        ));
        assert!(transport.forms.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_file_posts_nothing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let transport = Scripted::new(vec![], None);
        let uploader = Uploader::new(
            settings(10, CompletionPolicy::AllAcknowledged, calls.clone()),
            transport.clone(),
        );

        let report = uploader.upload_file(file(0)).await.unwrap();
        assert_eq!(report.total, 0);
        assert!(report.is_complete());
        assert!(transport.forms.lock().unwrap().is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}

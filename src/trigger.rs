//! Named triggers that start work when activated, the way a click starts a form upload.

use futures::future::BoxFuture;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use tokio::task::JoinHandle;

pub type Handler = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync + 'static>;

#[derive(Default)]
pub struct TriggerBoard {
    handlers: Mutex<HashMap<String, Vec<Handler>>>,
}

impl TriggerBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `handler` to `selector`. Registering the same handler twice runs it twice.
    pub fn register(
        &self,
        selector: impl Into<String>,
        handler: impl Fn() -> BoxFuture<'static, ()> + Send + Sync + 'static,
    ) {
        self.handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(selector.into())
            .or_default()
            .push(Arc::new(handler));
    }

    pub fn handlers(&self, selector: &str) -> usize {
        self.handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(selector)
            .map_or(0, |x| x.len())
    }

    /// Spawns every handler registered under `selector` on the current tokio runtime.
    /// Unknown selectors spawn nothing.
    pub fn activate(&self, selector: &str) -> Vec<JoinHandle<()>> {
        let handlers = self
            .handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(selector)
            .cloned()
            .unwrap_or_default();

        tracing::debug!(selector, handlers = handlers.len(), "trigger activated");
        handlers.iter().map(|h| tokio::spawn(h())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn activation_runs_each_registration() {
        let board = TriggerBoard::new();
        let hits = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let hits = hits.clone();
            board.register("file-upload", move || {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                }
                .boxed()
            });
        }
        assert_eq!(board.handlers("file-upload"), 2);

        for handle in board.activate("file-upload") {
            handle.await.unwrap();
        }
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        assert!(board.activate("missing").is_empty());
        assert_eq!(board.handlers("missing"), 0);
    }
}

//! Debounced autosave. Each edit restarts the countdown; only the last edit
//! of a burst produces a version.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::{sync::Mutex, task::JoinHandle, time};
use tracing::debug;

use crate::document::DocumentState;

pub struct Autosaver {
    document: Arc<Mutex<DocumentState>>,
    delay: Duration,
    epoch: Arc<AtomicU64>,
    pending: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Autosaver {
    pub fn new(document: Arc<Mutex<DocumentState>>, delay: Duration) -> Self {
        Self {
            document,
            delay,
            epoch: Arc::new(AtomicU64::new(0)),
            pending: std::sync::Mutex::new(None),
        }
    }

    /// Restarts the countdown after an edit.
    pub fn schedule(&self) {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let task = tokio::spawn(save_after(
            Arc::clone(&self.document),
            Arc::clone(&self.epoch),
            epoch,
            self.delay,
        ));
        self.replace_pending(Some(task));
    }

    pub fn cancel(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.replace_pending(None);
    }

    fn replace_pending(&self, task: Option<JoinHandle<()>>) {
        let previous = {
            let mut guard = self
                .pending
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            std::mem::replace(&mut *guard, task)
        };
        if let Some(previous) = previous {
            previous.abort();
        }
    }
}

impl Drop for Autosaver {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn save_after(
    document: Arc<Mutex<DocumentState>>,
    current: Arc<AtomicU64>,
    epoch: u64,
    delay: Duration,
) {
    time::sleep(delay).await;

    let mut doc = document.lock().await;
    if current.load(Ordering::SeqCst) != epoch {
        return;
    }
    if !doc.has_unsaved_changes() {
        debug!("autosave: content unchanged, skipping");
        return;
    }
    let version = doc.save_version(None);
    debug!(version = %version.id, "autosave: version saved");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Author;

    fn document(content: &str) -> Arc<Mutex<DocumentState>> {
        Arc::new(Mutex::new(DocumentState::new(
            content,
            Author::new("Mike (Dev)", "avatar://mike"),
        )))
    }

    #[tokio::test(start_paused = true)]
    async fn saves_once_after_a_burst_of_edits() {
        let doc = document("start");
        let autosaver = Autosaver::new(Arc::clone(&doc), Duration::from_secs(5));

        for text in ["s", "st", "sta", "stab"] {
            doc.lock().await.set_content(text);
            autosaver.schedule();
            time::sleep(Duration::from_secs(2)).await;
        }
        assert_eq!(doc.lock().await.versions().len(), 1);

        time::sleep(Duration::from_secs(4)).await;
        let doc = doc.lock().await;
        assert_eq!(doc.versions().len(), 2);
        assert_eq!(doc.latest().map(|v| v.content.as_str()), Some("stab"));
    }

    #[tokio::test(start_paused = true)]
    async fn skips_when_content_matches_latest_version() {
        let doc = document("same");
        let autosaver = Autosaver::new(Arc::clone(&doc), Duration::from_secs(5));
        autosaver.schedule();
        time::sleep(Duration::from_secs(6)).await;
        assert_eq!(doc.lock().await.versions().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending_save() {
        let doc = document("start");
        let autosaver = Autosaver::new(Arc::clone(&doc), Duration::from_secs(5));
        doc.lock().await.set_content("edited");
        autosaver.schedule();
        autosaver.cancel();
        time::sleep(Duration::from_secs(6)).await;
        assert_eq!(doc.lock().await.versions().len(), 1);
    }
}

use std::time::Duration;

use chrono::Utc;
use log::warn;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::db::models::PatientDraft;
use crate::db::Database;
use crate::events::{CoreEvent, EventBus};

/// Debounced writer for the intake form. Each edit supersedes the pending
/// write, so the draft lands once the user pauses instead of on every
/// keystroke.
pub struct DraftAutosaver {
    pending: Mutex<Option<JoinHandle<()>>>,
    delay: Duration,
    db: Database,
    events: EventBus,
}

impl DraftAutosaver {
    pub fn new(db: Database, events: EventBus, delay: Duration) -> Self {
        Self {
            pending: Mutex::new(None),
            delay,
            db,
            events,
        }
    }

    pub async fn schedule(&self, draft: PatientDraft) {
        let mut pending = self.pending.lock().await;
        if let Some(handle) = pending.take() {
            handle.abort();
        }

        let db = self.db.clone();
        let events = self.events.clone();
        let delay = self.delay;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match db.save_draft(&draft).await {
                Ok(()) => events.emit(CoreEvent::DraftSaved {
                    saved_at: Utc::now(),
                }),
                Err(err) => warn!("Draft autosave failed: {err}"),
            }
        }));
    }

    /// Drops the pending write, if any. Called when the draft stops
    /// mattering, at submission and when leaving the form.
    pub async fn cancel_pending(&self) {
        if let Some(handle) = self.pending.lock().await.take() {
            handle.abort();
        }
    }
}

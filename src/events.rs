use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::analysis::WorkflowStage;
use crate::capture::CaptureState;
use crate::db::models::ChatMessage;

const DEFAULT_CAPACITY: usize = 64;

/// Notifications the core pushes to whatever shell is embedding it.
///
/// Emission is fire-and-forget: a shell that is not listening loses
/// events without affecting core behavior.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CoreEvent {
    StageChanged { stage: WorkflowStage },
    DraftSaved { saved_at: DateTime<Utc> },
    CaptureStateChanged { state: CaptureState },
    PhotoCaptured { name: String },
    VideoCaptured { name: String, duration_secs: u64 },
    CaptureFailed { message: String },
    MediaListChanged { count: usize },
    AnalysisCompleted { record_id: String },
    AnalysisFailed { message: String },
    DiagramReady,
    MessageAppended { message: ChatMessage },
    HistoryChanged,
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoreEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: CoreEvent) {
        // Send only fails when nobody is subscribed, which is fine.
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

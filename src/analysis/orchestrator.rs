use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::{bail, Result};
use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::{
    chat::ConversationController,
    db::models::{AnalysisResult, ConsultationRecord, PatientData, PatientDraft},
    db::Database,
    device::{Connectivity, Haptics, Narrator},
    events::{CoreEvent, EventBus},
    history::{generate_share_code, HistoryLedger},
    inference::{analysis_fingerprint, diagram_fingerprint, AnalysisRequest, InferenceService},
    language::Language,
    media::MediaTray,
    session::{
        SessionStore, ANALYSIS_RESULT_KEY, CURRENT_RECORD_KEY, DIAGRAM_KEY, PATIENT_DATA_KEY,
    },
};

use super::autosave::DraftAutosaver;

/// How long the success screen stays up before the report is revealed.
pub const SUCCESS_DISPLAY: Duration = Duration::from_millis(2500);

const OFFLINE_MESSAGE: &str = "You are offline. Connect to the internet to analyze.";
const ANALYSIS_FAILURE_MESSAGE: &str = "Analysis failed. Try again.";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum WorkflowStage {
    Input,
    Analyzing,
    Success,
    Results,
}

impl Default for WorkflowStage {
    fn default() -> Self {
        WorkflowStage::Input
    }
}

struct OrchestratorInner {
    stage: Mutex<WorkflowStage>,
    draft: Mutex<PatientDraft>,
    current: Mutex<Option<ConsultationRecord>>,
    reveal: Mutex<Option<JoinHandle<()>>>,
    autosaver: DraftAutosaver,
    db: Database,
    session: SessionStore,
    tray: MediaTray,
    history: HistoryLedger,
    chat: ConversationController,
    service: Arc<dyn InferenceService>,
    connectivity: Arc<dyn Connectivity>,
    narrator: Arc<dyn Narrator>,
    haptics: Arc<dyn Haptics>,
    language: Arc<RwLock<Language>>,
    events: EventBus,
    success_display: Duration,
}

/// Walks a consultation through input, analysis and results. One
/// submission at a time; every stage change goes out on the event bus.
#[derive(Clone)]
pub struct AnalysisOrchestrator {
    inner: Arc<OrchestratorInner>,
}

impl AnalysisOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Database,
        session: SessionStore,
        tray: MediaTray,
        history: HistoryLedger,
        chat: ConversationController,
        service: Arc<dyn InferenceService>,
        connectivity: Arc<dyn Connectivity>,
        narrator: Arc<dyn Narrator>,
        haptics: Arc<dyn Haptics>,
        language: Arc<RwLock<Language>>,
        events: EventBus,
        success_display: Duration,
        autosave_delay: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(OrchestratorInner {
                stage: Mutex::new(WorkflowStage::Input),
                draft: Mutex::new(PatientDraft::default()),
                current: Mutex::new(None),
                reveal: Mutex::new(None),
                autosaver: DraftAutosaver::new(db.clone(), events.clone(), autosave_delay),
                db,
                session,
                tray,
                history,
                chat,
                service,
                connectivity,
                narrator,
                haptics,
                language,
                events,
                success_display,
            }),
        }
    }

    pub async fn stage(&self) -> WorkflowStage {
        *self.inner.stage.lock().await
    }

    pub async fn draft(&self) -> PatientDraft {
        self.inner.draft.lock().await.clone()
    }

    pub async fn current_record(&self) -> Option<ConsultationRecord> {
        self.inner.current.lock().await.clone()
    }

    pub fn diagram(&self) -> Option<String> {
        self.inner.session.get(DIAGRAM_KEY)
    }

    /// Applies an edit to the intake form. While the form is on screen
    /// the edit also schedules a debounced draft write; in any other
    /// stage the draft is left alone on disk.
    pub async fn update_draft<F>(&self, mutate: F) -> PatientDraft
    where
        F: FnOnce(&mut PatientDraft),
    {
        let snapshot = {
            let mut draft = self.inner.draft.lock().await;
            mutate(&mut draft);
            draft.updated_at = Utc::now();
            draft.clone()
        };

        if *self.inner.stage.lock().await == WorkflowStage::Input {
            self.inner.autosaver.schedule(snapshot.clone()).await;
        }
        snapshot
    }

    /// Brings back whatever an earlier run left behind: the saved intake
    /// draft, and the results handoff if the app went down past the
    /// analysis. Every restore failure is survivable.
    pub async fn restore(&self) {
        match self.inner.db.load_draft().await {
            Ok(Some(draft)) => *self.inner.draft.lock().await = draft,
            Ok(None) => {}
            Err(err) => warn!("Could not restore the intake draft: {err}"),
        }

        let analysis = self
            .inner
            .session
            .get_json::<AnalysisResult>(ANALYSIS_RESULT_KEY);
        let patient = self.inner.session.get_json::<PatientData>(PATIENT_DATA_KEY);

        if let (Some(analysis), Some(_patient)) = (analysis, patient) {
            if let Some(record) = self
                .inner
                .session
                .get_json::<ConsultationRecord>(CURRENT_RECORD_KEY)
            {
                *self.inner.current.lock().await = Some(record);
            }
            self.inner.chat.set_context(&analysis).await;
            *self.inner.stage.lock().await = WorkflowStage::Results;
            self.emit_stage(WorkflowStage::Results);
        }
    }

    /// Runs the full submission: connectivity gate, cache lookup, the
    /// model call, then record keeping and the staged reveal. There is no
    /// automatic retry anywhere in here; a failure lands back on the form
    /// and the user decides when to try again.
    pub async fn analyze(&self) -> Result<ConsultationRecord> {
        {
            let stage = self.inner.stage.lock().await;
            if *stage != WorkflowStage::Input {
                bail!("analysis can only start from the input stage");
            }
        }

        if !self.inner.connectivity.is_online() {
            self.inner.events.emit(CoreEvent::AnalysisFailed {
                message: OFFLINE_MESSAGE.to_string(),
            });
            bail!("offline: analysis needs a connection");
        }

        let draft = self.inner.draft.lock().await.clone();
        let assets = self.inner.tray.assets().await;
        let previews = self.inner.tray.previews().await;
        if draft.is_empty() && assets.is_empty() && previews.is_empty() {
            bail!("describe the problem or attach a photo first");
        }

        self.inner.haptics.pulse();
        self.set_stage(WorkflowStage::Analyzing).await;

        // The submission is final from here: the debounced write is
        // dropped and the stored draft cleared.
        self.inner.autosaver.cancel_pending().await;
        if let Err(err) = self.inner.db.clear_draft().await {
            warn!("Could not clear the stored draft: {err}");
        }

        let language = *self.inner.language.read().unwrap();
        let fingerprint = analysis_fingerprint(language, &draft.symptoms, &assets);

        let cached = match self
            .inner
            .db
            .cache_get_json::<AnalysisResult>(&fingerprint)
            .await
        {
            Ok(hit) => hit,
            Err(err) => {
                warn!("Cache lookup failed, going to the network: {err}");
                None
            }
        };

        let analysis = match cached {
            Some(analysis) => {
                info!("Analysis served from cache");
                analysis
            }
            None => {
                let request = AnalysisRequest::new(
                    draft.symptoms.clone(),
                    draft.metadata_line(),
                    language,
                    &assets,
                );
                match self.inner.service.analyze(&request).await {
                    Ok(analysis) => {
                        if let Err(err) =
                            self.inner.db.cache_put_json(&fingerprint, &analysis).await
                        {
                            warn!("Could not cache the analysis result: {err}");
                        }
                        analysis
                    }
                    Err(err) => {
                        self.set_stage(WorkflowStage::Input).await;
                        self.inner.events.emit(CoreEvent::AnalysisFailed {
                            message: ANALYSIS_FAILURE_MESSAGE.to_string(),
                        });
                        return Err(err.into());
                    }
                }
            }
        };

        let completed_at = Utc::now();
        let record = ConsultationRecord {
            id: completed_at.timestamp_millis().to_string(),
            date: completed_at,
            patient_data: PatientData {
                symptoms: draft.symptoms.clone(),
                duration: draft.duration.as_str().to_string(),
                pain_level: draft.pain_level,
                other_symptoms: draft.other_symptoms.clone(),
                media: previews,
                timestamp: Some(completed_at),
            },
            analysis_result: analysis.clone(),
            share_code: Some(generate_share_code()),
            doctor_notes: Vec::new(),
        };

        if let Err(err) = self.inner.history.save(&record).await {
            warn!("Could not save the consultation to history: {err}");
        }

        self.store_handoff(&record);
        self.inner.chat.seed_from_analysis(&analysis).await;
        self.inner
            .narrator
            .speak(&analysis.overall_explanation, language.speech_code());
        self.spawn_diagram_task(&analysis);

        *self.inner.current.lock().await = Some(record.clone());
        self.set_stage(WorkflowStage::Success).await;
        self.inner.events.emit(CoreEvent::AnalysisCompleted {
            record_id: record.id.clone(),
        });
        self.schedule_reveal().await;

        Ok(record)
    }

    /// Returns to a blank form. Only valid from the results stage; that
    /// is the single backward edge the workflow has.
    pub async fn start_over(&self) -> Result<()> {
        {
            let mut stage = self.inner.stage.lock().await;
            if *stage != WorkflowStage::Results {
                bail!("a new consultation can only start from the results stage");
            }
            *stage = WorkflowStage::Input;
        }

        if let Some(handle) = self.inner.reveal.lock().await.take() {
            handle.abort();
        }

        *self.inner.current.lock().await = None;
        *self.inner.draft.lock().await = PatientDraft::default();
        self.inner.chat.clear().await;
        self.inner.session.remove(PATIENT_DATA_KEY);
        self.inner.session.remove(ANALYSIS_RESULT_KEY);
        self.inner.session.remove(CURRENT_RECORD_KEY);
        self.inner.session.remove(DIAGRAM_KEY);

        self.emit_stage(WorkflowStage::Input);
        Ok(())
    }

    /// Reopens a past consultation. The workflow jumps straight to the
    /// results stage; nothing is re-analyzed and no success screen runs.
    pub async fn load_record(&self, record: ConsultationRecord) {
        if let Some(handle) = self.inner.reveal.lock().await.take() {
            handle.abort();
        }

        self.store_handoff(&record);
        self.inner
            .chat
            .seed_from_analysis(&record.analysis_result)
            .await;
        *self.inner.current.lock().await = Some(record);
        self.set_stage(WorkflowStage::Results).await;
    }

    async fn set_stage(&self, stage: WorkflowStage) {
        *self.inner.stage.lock().await = stage;
        self.emit_stage(stage);
    }

    fn emit_stage(&self, stage: WorkflowStage) {
        self.inner.events.emit(CoreEvent::StageChanged { stage });
    }

    fn store_handoff(&self, record: &ConsultationRecord) {
        // The results view survives a reload through these three keys.
        // A quota failure only costs that survival.
        if let Err(err) = self
            .inner
            .session
            .put_json(PATIENT_DATA_KEY, &record.patient_data)
        {
            warn!("Could not stash patient data: {err}");
        }
        if let Err(err) = self
            .inner
            .session
            .put_json(ANALYSIS_RESULT_KEY, &record.analysis_result)
        {
            warn!("Could not stash the analysis result: {err}");
        }
        if let Err(err) = self.inner.session.put_json(CURRENT_RECORD_KEY, record) {
            warn!("Could not stash the consultation record: {err}");
        }
    }

    /// Fetches the explanatory diagram off the critical path. Failures
    /// are logged and swallowed; the report simply renders without one.
    fn spawn_diagram_task(&self, analysis: &AnalysisResult) {
        let Some(query) = analysis.visual_diagram_query.clone() else {
            return;
        };

        let db = self.inner.db.clone();
        let service = self.inner.service.clone();
        let session = self.inner.session.clone();
        let events = self.inner.events.clone();

        tokio::spawn(async move {
            let key = diagram_fingerprint(&query);
            let cached = match db.cache_get(&key).await {
                Ok(hit) => hit,
                Err(err) => {
                    warn!("Diagram cache lookup failed: {err}");
                    None
                }
            };

            let diagram = match cached {
                Some(data_url) => Some(data_url),
                None => match service.generate_diagram(&query).await {
                    Ok(Some(data_url)) => {
                        if let Err(err) = db.cache_put(&key, &data_url).await {
                            warn!("Could not cache the diagram: {err}");
                        }
                        Some(data_url)
                    }
                    Ok(None) => None,
                    Err(err) => {
                        warn!("Diagram generation failed: {err}");
                        None
                    }
                },
            };

            if let Some(data_url) = diagram {
                if let Err(err) = session.put(DIAGRAM_KEY, data_url) {
                    warn!("Could not stash the diagram: {err}");
                }
                events.emit(CoreEvent::DiagramReady);
            }
        });
    }

    /// Holds the success screen for a fixed beat, then reveals results.
    /// The delay is not configurable by the caller; tests shorten it
    /// through the core config instead.
    async fn schedule_reveal(&self) {
        let mut reveal = self.inner.reveal.lock().await;
        if let Some(handle) = reveal.take() {
            handle.abort();
        }

        let inner = self.inner.clone();
        let delay = self.inner.success_display;
        *reveal = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut stage = inner.stage.lock().await;
                if *stage != WorkflowStage::Success {
                    return;
                }
                *stage = WorkflowStage::Results;
            }
            inner.events.emit(CoreEvent::StageChanged {
                stage: WorkflowStage::Results,
            });
        }));
    }
}

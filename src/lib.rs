pub mod analysis;
pub mod capture;
pub mod chat;
pub mod db;
pub mod device;
pub mod events;
pub mod findings;
pub mod history;
pub mod inference;
pub mod language;
pub mod media;
pub mod session;
mod utils;

use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::Result;
use log::warn;
use tokio::sync::broadcast;

use analysis::{AnalysisOrchestrator, SUCCESS_DISPLAY};
use capture::CaptureController;
use chat::ConversationController;
use db::Database;
use device::{
    AlwaysOnline, CameraDevice, Connectivity, Haptics, Narrator, NoCamera, NoHaptics,
    SilentNarrator,
};
use events::{CoreEvent, EventBus};
use history::HistoryLedger;
use inference::InferenceService;
use language::Language;
use media::MediaTray;
use session::SessionStore;

/// Construction-time settings for [`AppCore`]. The timing knobs exist so
/// tests can run the debounce, the success beat and the recording tick
/// in milliseconds instead of real time.
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub language: Language,
    /// An existing store to adopt, which is how a shell reload is
    /// simulated: same session, fresh core. `None` starts empty.
    pub session: Option<SessionStore>,
    pub capture_tick: Duration,
    pub success_display: Duration,
    pub autosave_delay: Duration,
}

impl CoreConfig {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            language: Language::default(),
            session: None,
            capture_tick: Duration::from_secs(1),
            success_display: SUCCESS_DISPLAY,
            autosave_delay: Duration::from_secs(1),
        }
    }
}

/// The device integrations a shell plugs in. Every default is an inert
/// stand-in, so a headless core runs without any of them.
#[derive(Clone)]
pub struct DeviceSuite {
    pub camera: Arc<dyn CameraDevice>,
    pub connectivity: Arc<dyn Connectivity>,
    pub narrator: Arc<dyn Narrator>,
    pub haptics: Arc<dyn Haptics>,
}

impl Default for DeviceSuite {
    fn default() -> Self {
        Self {
            camera: Arc::new(NoCamera),
            connectivity: Arc::new(AlwaysOnline),
            narrator: Arc::new(SilentNarrator),
            haptics: Arc::new(NoHaptics),
        }
    }
}

/// The assembled core: every controller wired to the same database,
/// session store and event bus. A shell builds one of these at startup
/// and drives it for the life of the process.
pub struct AppCore {
    pub db: Database,
    pub session: SessionStore,
    pub events: EventBus,
    pub tray: MediaTray,
    pub capture: CaptureController,
    pub orchestrator: AnalysisOrchestrator,
    pub chat: ConversationController,
    pub history: HistoryLedger,
    language: Arc<RwLock<Language>>,
}

impl AppCore {
    pub async fn new(
        config: CoreConfig,
        devices: DeviceSuite,
        service: Arc<dyn InferenceService>,
    ) -> Result<Self> {
        let db = Database::new(config.db_path)?;
        let session = config.session.unwrap_or_default();
        let events = EventBus::new();
        let language = Arc::new(RwLock::new(config.language));

        let tray = MediaTray::new(session.clone(), events.clone());
        let capture = CaptureController::new(
            devices.camera.clone(),
            tray.clone(),
            devices.haptics.clone(),
            events.clone(),
        )
        .with_tick_interval(config.capture_tick);

        let history = HistoryLedger::new(db.clone(), service.clone(), events.clone());
        let chat = ConversationController::new(
            service.clone(),
            session.clone(),
            devices.narrator.clone(),
            devices.haptics.clone(),
            language.clone(),
            events.clone(),
        );
        let orchestrator = AnalysisOrchestrator::new(
            db.clone(),
            session.clone(),
            tray.clone(),
            history.clone(),
            chat.clone(),
            service,
            devices.connectivity.clone(),
            devices.narrator.clone(),
            devices.haptics.clone(),
            language.clone(),
            events.clone(),
            config.success_display,
            config.autosave_delay,
        );

        let core = Self {
            db,
            session,
            events,
            tray,
            capture,
            orchestrator,
            chat,
            history,
            language,
        };
        core.restore().await;
        Ok(core)
    }

    /// Picks every flow back up where the previous run left it. Each
    /// restore tolerates its own failure; a corrupt leftover never keeps
    /// the core from starting.
    async fn restore(&self) {
        match self.db.language().await {
            Ok(Some(language)) => *self.language.write().unwrap() = language,
            Ok(None) => {}
            Err(err) => warn!("Could not restore the language choice: {err}"),
        }

        self.tray.restore().await;
        self.chat.restore().await;
        self.orchestrator.restore().await;
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoreEvent> {
        self.events.subscribe()
    }

    pub fn language(&self) -> Language {
        *self.language.read().unwrap()
    }

    /// Switches the interface language and remembers the choice.
    pub async fn set_language(&self, language: Language) {
        *self.language.write().unwrap() = language;
        if let Err(err) = self.db.set_language(language).await {
            warn!("Could not persist the language choice: {err}");
        }
    }
}

/// Initializes logging (reads the RUST_LOG env var).
pub fn init_logging() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
}

//! Shared test infrastructure: scripted device and gateway fakes plus a
//! fully wired core with millisecond timings.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::broadcast;

use sehat::db::models::{AnalysisResult, BoundingBox, Diagnosis, FindingSeverity, Urgency};
use sehat::device::{
    CameraDevice, CameraStream, Connectivity, DeviceError, Haptics, Narrator, RawFrame,
    StreamConstraints,
};
use sehat::events::CoreEvent;
use sehat::inference::{AnalysisRequest, ChatTurn, InferenceError, InferenceService, MediaPart};
use sehat::language::Language;
use sehat::session::SessionStore;
use sehat::{AppCore, CoreConfig, DeviceSuite};

/// A camera whose streams count their own teardowns, so tests can assert
/// the stream was stopped exactly once.
pub struct FakeCamera {
    stops: Arc<AtomicUsize>,
    opens: AtomicUsize,
    fail_open: AtomicBool,
}

impl FakeCamera {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            stops: Arc::new(AtomicUsize::new(0)),
            opens: AtomicUsize::new(0),
            fail_open: AtomicBool::new(false),
        })
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::SeqCst);
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Total `stop_tracks` calls across every stream this camera opened.
    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CameraDevice for FakeCamera {
    async fn open_stream(
        &self,
        _constraints: StreamConstraints,
    ) -> Result<Box<dyn CameraStream>, DeviceError> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(DeviceError::PermissionDenied("scripted denial".to_string()));
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeStream {
            stops: self.stops.clone(),
        }))
    }
}

struct FakeStream {
    stops: Arc<AtomicUsize>,
}

#[async_trait]
impl CameraStream for FakeStream {
    async fn grab_frame(&self) -> Result<RawFrame, DeviceError> {
        // 2x2 RGB frame, enough for the photo encoder.
        Ok(RawFrame {
            width: 2,
            height: 2,
            pixels: vec![128; 12],
        })
    }

    async fn next_chunk(&self) -> Result<Vec<u8>, DeviceError> {
        Ok(vec![0xAB; 16])
    }

    fn stop_tracks(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Scripted gateway. Counts calls, captures the history it was handed,
/// and fails on demand.
pub struct FakeInference {
    analyze_calls: AtomicUsize,
    chat_calls: AtomicUsize,
    diagram_calls: AtomicUsize,
    analyze_ok: AtomicBool,
    chat_ok: AtomicBool,
    prescription_ok: AtomicBool,
    chat_delay: Mutex<Duration>,
    diagram: Mutex<Option<String>>,
    last_chat_history: Mutex<Vec<ChatTurn>>,
}

impl FakeInference {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            analyze_calls: AtomicUsize::new(0),
            chat_calls: AtomicUsize::new(0),
            diagram_calls: AtomicUsize::new(0),
            analyze_ok: AtomicBool::new(true),
            chat_ok: AtomicBool::new(true),
            prescription_ok: AtomicBool::new(true),
            chat_delay: Mutex::new(Duration::ZERO),
            diagram: Mutex::new(None),
            last_chat_history: Mutex::new(Vec::new()),
        })
    }

    pub fn set_analyze_ok(&self, ok: bool) {
        self.analyze_ok.store(ok, Ordering::SeqCst);
    }

    pub fn set_chat_ok(&self, ok: bool) {
        self.chat_ok.store(ok, Ordering::SeqCst);
    }

    pub fn set_prescription_ok(&self, ok: bool) {
        self.prescription_ok.store(ok, Ordering::SeqCst);
    }

    pub fn set_chat_delay(&self, delay: Duration) {
        *self.chat_delay.lock().unwrap() = delay;
    }

    pub fn set_diagram(&self, diagram: Option<&str>) {
        *self.diagram.lock().unwrap() = diagram.map(str::to_string);
    }

    pub fn analyze_count(&self) -> usize {
        self.analyze_calls.load(Ordering::SeqCst)
    }

    pub fn chat_count(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }

    pub fn diagram_count(&self) -> usize {
        self.diagram_calls.load(Ordering::SeqCst)
    }

    /// The history slice passed to the most recent chat call. The prompt
    /// message itself travels separately and is not part of this.
    pub fn last_chat_history(&self) -> Vec<ChatTurn> {
        self.last_chat_history.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceService for FakeInference {
    async fn analyze(&self, _request: &AnalysisRequest) -> Result<AnalysisResult, InferenceError> {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        if self.analyze_ok.load(Ordering::SeqCst) {
            Ok(sample_analysis())
        } else {
            Err(InferenceError::Transport("scripted failure".to_string()))
        }
    }

    async fn chat(
        &self,
        history: &[ChatTurn],
        message: &str,
        _language: Language,
    ) -> Result<String, InferenceError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_chat_history.lock().unwrap() = history.to_vec();

        let delay = *self.chat_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.chat_ok.load(Ordering::SeqCst) {
            Ok(format!("Echo: {message}"))
        } else {
            Err(InferenceError::Transport("scripted failure".to_string()))
        }
    }

    async fn generate_diagram(&self, _prompt: &str) -> Result<Option<String>, InferenceError> {
        self.diagram_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.diagram.lock().unwrap().clone())
    }

    async fn transcribe_prescription(&self, _image: &MediaPart) -> Result<String, InferenceError> {
        if self.prescription_ok.load(Ordering::SeqCst) {
            Ok("Paracetamol 500mg twice daily".to_string())
        } else {
            Err(InferenceError::Transport("scripted failure".to_string()))
        }
    }
}

pub struct FakeConnectivity {
    online: AtomicBool,
}

impl FakeConnectivity {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            online: AtomicBool::new(true),
        })
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

impl Connectivity for FakeConnectivity {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

/// Records every utterance instead of speaking it.
pub struct SpeechLog {
    spoken: Mutex<Vec<(String, String)>>,
}

impl SpeechLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            spoken: Mutex::new(Vec::new()),
        })
    }

    pub fn utterances(&self) -> Vec<(String, String)> {
        self.spoken.lock().unwrap().clone()
    }
}

impl Narrator for SpeechLog {
    fn speak(&self, text: &str, lang_code: &str) {
        self.spoken
            .lock()
            .unwrap()
            .push((text.to_string(), lang_code.to_string()));
    }
}

pub struct PulseCounter {
    pulses: AtomicUsize,
}

impl PulseCounter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            pulses: AtomicUsize::new(0),
        })
    }

    pub fn count(&self) -> usize {
        self.pulses.load(Ordering::SeqCst)
    }
}

impl Haptics for PulseCounter {
    fn pulse(&self) {
        self.pulses.fetch_add(1, Ordering::SeqCst);
    }
}

/// A plausible gateway response: one finding, one diagnosis, a diagram
/// prompt for the background fetch.
pub fn sample_analysis() -> AnalysisResult {
    AnalysisResult {
        bounding_boxes: vec![BoundingBox {
            ymin: 100.0,
            xmin: 100.0,
            ymax: 400.0,
            xmax: 500.0,
            label: "Localized rash".to_string(),
            confidence: 91.0,
            severity: FindingSeverity::Moderate,
        }],
        diagnoses: vec![Diagnosis {
            name: "Contact Dermatitis".to_string(),
            local_name: "Contact Dermatitis".to_string(),
            explanation: "Irritation where the skin touched an allergen.".to_string(),
            recommendation: "Keep the area clean and dry.".to_string(),
            likelihood: 78.0,
            urgency: Urgency::NonUrgent,
            pronunciation: None,
        }],
        overall_explanation: "The skin shows an irritated patch consistent with contact dermatitis."
            .to_string(),
        recommended_tests: vec!["Patch test".to_string()],
        visual_diagram_query: Some("skin cross-section showing dermatitis".to_string()),
        ..Default::default()
    }
}

/// A wired core plus handles to every fake behind it. Timings are cut to
/// milliseconds so stage delays and debounces resolve inside a test.
pub struct TestCore {
    pub core: AppCore,
    pub camera: Arc<FakeCamera>,
    pub service: Arc<FakeInference>,
    pub connectivity: Arc<FakeConnectivity>,
    pub narrator: Arc<SpeechLog>,
    pub haptics: Arc<PulseCounter>,
    pub dir: TempDir,
}

pub const TEST_SUCCESS_DISPLAY: Duration = Duration::from_millis(40);
pub const TEST_AUTOSAVE_DELAY: Duration = Duration::from_millis(25);
pub const TEST_CAPTURE_TICK: Duration = Duration::from_millis(5);

pub async fn boot() -> TestCore {
    let dir = TempDir::new().expect("create temp dir");
    boot_at(dir, None).await
}

/// Builds a core over an existing directory (and optionally an existing
/// session store), which is how restart and reload scenarios are staged.
pub async fn boot_at(dir: TempDir, session: Option<SessionStore>) -> TestCore {
    let camera = FakeCamera::new();
    let service = FakeInference::new();
    let connectivity = FakeConnectivity::new();
    let narrator = SpeechLog::new();
    let haptics = PulseCounter::new();

    let mut config = CoreConfig::new(dir.path().join("core.db"));
    config.session = session;
    config.capture_tick = TEST_CAPTURE_TICK;
    config.success_display = TEST_SUCCESS_DISPLAY;
    config.autosave_delay = TEST_AUTOSAVE_DELAY;

    let devices = DeviceSuite {
        camera: camera.clone(),
        connectivity: connectivity.clone(),
        narrator: narrator.clone(),
        haptics: haptics.clone(),
    };

    let core = AppCore::new(config, devices, service.clone())
        .await
        .expect("boot core");

    TestCore {
        core,
        camera,
        service,
        connectivity,
        narrator,
        haptics,
        dir,
    }
}

/// Waits until the bus delivers an event the predicate accepts. Lagged
/// receivers skip ahead; a bus that closes or stays silent fails the test.
pub async fn wait_for_event<F>(
    rx: &mut broadcast::Receiver<CoreEvent>,
    mut accept: F,
) -> CoreEvent
where
    F: FnMut(&CoreEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(3), async {
        loop {
            match rx.recv().await {
                Ok(event) if accept(&event) => return event,
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => panic!("event bus closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Everything currently buffered, without blocking.
pub fn drain_events(rx: &mut broadcast::Receiver<CoreEvent>) -> Vec<CoreEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

use std::{io::Cursor, sync::Arc, time::Duration};

use anyhow::{anyhow, Result};
use chrono::Utc;
use image::{codecs::jpeg::JpegEncoder, DynamicImage, RgbImage};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::{
    device::{CameraDevice, CameraStream, Haptics, RawFrame, StreamConstraints},
    events::{CoreEvent, EventBus},
    media::{MediaAsset, MediaTray},
};

use super::recorder::{self, RecorderTask};
use super::state::{CaptureMode, CapturePhase, CaptureState};

const PHOTO_JPEG_QUALITY: u8 = 90;
const DEVICE_FAILURE_MESSAGE: &str = "Camera unavailable. Check permissions and try again.";

/// Drives a capture session from device request to a finished asset in
/// the tray. One session at a time; the stream handle lives in a shared
/// slot and is taken out exactly once on every path that leaves `Live`.
#[derive(Clone)]
pub struct CaptureController {
    state: Arc<Mutex<CaptureState>>,
    stream: Arc<Mutex<Option<Box<dyn CameraStream>>>>,
    chunks: Arc<Mutex<Vec<Vec<u8>>>>,
    recorder: Arc<Mutex<Option<RecorderTask>>>,
    camera: Arc<dyn CameraDevice>,
    tray: MediaTray,
    haptics: Arc<dyn Haptics>,
    events: EventBus,
    tick_interval: Duration,
}

impl CaptureController {
    pub fn new(
        camera: Arc<dyn CameraDevice>,
        tray: MediaTray,
        haptics: Arc<dyn Haptics>,
        events: EventBus,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(CaptureState::new())),
            stream: Arc::new(Mutex::new(None)),
            chunks: Arc::new(Mutex::new(Vec::new())),
            recorder: Arc::new(Mutex::new(None)),
            camera,
            tray,
            haptics,
            events,
            tick_interval: Duration::from_secs(1),
        }
    }

    /// Shortens the recording tick. Tests use this to hit the length cap
    /// without waiting a real minute.
    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub async fn get_state(&self) -> CaptureState {
        self.state.lock().await.clone()
    }

    pub async fn start(&self, mode: CaptureMode) -> Result<CaptureState> {
        {
            let mut state = self.state.lock().await;
            if state.phase != CapturePhase::Idle {
                return Err(anyhow!("capture already active"));
            }
            state.begin_request(mode);
        }
        self.emit_state_changed().await;

        let constraints = match mode {
            CaptureMode::Photo => StreamConstraints::photo(),
            CaptureMode::Video => StreamConstraints::video(),
        };

        let live = match self.camera.open_stream(constraints).await {
            Ok(stream) => stream,
            Err(err) => {
                self.state.lock().await.reset();
                self.emit_state_changed().await;
                self.events.emit(CoreEvent::CaptureFailed {
                    message: DEVICE_FAILURE_MESSAGE.to_string(),
                });
                return Err(anyhow!("failed to open capture stream: {err}"));
            }
        };

        *self.stream.lock().await = Some(live);
        self.state.lock().await.go_live(Utc::now());

        if mode == CaptureMode::Video {
            self.chunks.lock().await.clear();
            self.spawn_recorder().await;
        }

        self.emit_state_changed().await;
        Ok(self.get_state().await)
    }

    /// Grabs one frame, tears the stream down, and hands the encoded
    /// photo to the tray. The stream stops before the frame is even
    /// inspected, so a bad frame cannot leave the camera running.
    pub async fn capture_photo(&self) -> Result<MediaAsset> {
        {
            let state = self.state.lock().await;
            if !state.is_live_in(CaptureMode::Photo) {
                return Err(anyhow!("no live photo session"));
            }
        }

        let live = self
            .stream
            .lock()
            .await
            .take()
            .ok_or_else(|| anyhow!("capture stream missing"))?;

        let frame = live.grab_frame().await;
        live.stop_tracks();

        self.state.lock().await.reset();
        self.emit_state_changed().await;

        let frame = match frame {
            Ok(frame) => frame,
            Err(err) => {
                self.events.emit(CoreEvent::CaptureFailed {
                    message: DEVICE_FAILURE_MESSAGE.to_string(),
                });
                return Err(anyhow!("failed to grab frame: {err}"));
            }
        };

        let jpeg = encode_frame_jpeg(&frame)?;
        let name = format!("capture-{}.jpg", Utc::now().timestamp_millis());
        let asset = self.tray.add_file(&name, "image/jpeg", jpeg).await;

        self.haptics.pulse();
        self.events.emit(CoreEvent::PhotoCaptured {
            name: asset.name.clone(),
        });

        Ok(asset)
    }

    pub async fn stop_video(&self) -> Result<MediaAsset> {
        {
            let state = self.state.lock().await;
            if !state.is_live_in(CaptureMode::Video) {
                return Err(anyhow!("no active recording"));
            }
        }

        self.cancel_recorder().await;
        recorder::finalize_recording(
            &self.state,
            &self.stream,
            &self.chunks,
            &self.tray,
            &self.events,
            &self.haptics,
        )
        .await
    }

    /// Abandons the session without producing an asset. Calling this
    /// while idle is a no-op.
    pub async fn cancel(&self) -> Result<()> {
        {
            let state = self.state.lock().await;
            if state.phase == CapturePhase::Idle {
                return Ok(());
            }
        }

        self.cancel_recorder().await;
        if let Some(live) = self.stream.lock().await.take() {
            live.stop_tracks();
        }
        self.chunks.lock().await.clear();
        self.state.lock().await.reset();
        self.emit_state_changed().await;
        Ok(())
    }

    async fn spawn_recorder(&self) {
        let mut guard = self.recorder.lock().await;
        if let Some(task) = guard.take() {
            task.cancel_token.cancel();
            task.handle.abort();
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(recorder::recording_loop(
            self.state.clone(),
            self.stream.clone(),
            self.chunks.clone(),
            self.tray.clone(),
            self.events.clone(),
            self.haptics.clone(),
            cancel_token.clone(),
            self.tick_interval,
        ));

        *guard = Some(RecorderTask {
            handle,
            cancel_token,
        });
    }

    async fn cancel_recorder(&self) {
        if let Some(task) = self.recorder.lock().await.take() {
            task.cancel_token.cancel();
            let _ = task.handle.await;
        }
    }

    async fn emit_state_changed(&self) {
        self.events.emit(CoreEvent::CaptureStateChanged {
            state: self.state.lock().await.clone(),
        });
    }
}

fn encode_frame_jpeg(frame: &RawFrame) -> Result<Vec<u8>> {
    let image = RgbImage::from_raw(frame.width, frame.height, frame.pixels.clone())
        .ok_or_else(|| anyhow!("frame buffer does not match its reported dimensions"))?;

    let mut out = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut out, PHOTO_JPEG_QUALITY);
    DynamicImage::ImageRgb8(image).write_with_encoder(encoder)?;
    Ok(out.into_inner())
}

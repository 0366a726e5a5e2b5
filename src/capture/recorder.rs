use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{
    device::{CameraStream, Haptics},
    events::{CoreEvent, EventBus},
    media::{MediaAsset, MediaTray},
};

use super::state::{CapturePhase, CaptureState};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = false;

// Import the logging macros (exported at crate root)
use crate::{log_error, log_info, log_warn};

/// Recording stops on its own once it reaches this length.
pub const VIDEO_CAP_SECS: u64 = 60;

const VIDEO_MIME: &str = "video/webm";

pub(super) struct RecorderTask {
    pub(super) handle: JoinHandle<()>,
    pub(super) cancel_token: CancellationToken,
}

/// Drains the live stream once per tick while a recording runs. The loop
/// owns nothing; every handle it touches is shared with the controller so
/// a user-initiated stop and the length cap converge on the same state.
#[allow(clippy::too_many_arguments)]
pub(super) async fn recording_loop(
    state: Arc<Mutex<CaptureState>>,
    stream: Arc<Mutex<Option<Box<dyn CameraStream>>>>,
    chunks: Arc<Mutex<Vec<Vec<u8>>>>,
    tray: MediaTray,
    events: EventBus,
    haptics: Arc<dyn Haptics>,
    cancel_token: CancellationToken,
    tick_interval: Duration,
) {
    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The interval fires immediately; that tick stands for a second that
    // has not passed yet.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let snapshot = {
                    let mut guard = state.lock().await;
                    if guard.phase != CapturePhase::Live {
                        break;
                    }
                    guard.elapsed_secs += 1;
                    guard.clone()
                };

                let chunk = {
                    let guard = stream.lock().await;
                    match guard.as_ref() {
                        Some(live) => live.next_chunk().await,
                        None => break,
                    }
                };

                match chunk {
                    Ok(chunk) => chunks.lock().await.push(chunk),
                    Err(err) => log_warn!("chunk read failed at {}s: {err}", snapshot.elapsed_secs),
                }

                events.emit(CoreEvent::CaptureStateChanged {
                    state: snapshot.clone(),
                });

                if snapshot.elapsed_secs >= VIDEO_CAP_SECS {
                    log_info!("recording reached the {VIDEO_CAP_SECS}s cap, stopping");
                    if let Err(err) =
                        finalize_recording(&state, &stream, &chunks, &tray, &events, &haptics).await
                    {
                        log_error!("failed to finalize capped recording: {err:?}");
                    }
                    break;
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("recording loop shutting down");
                break;
            }
        }
    }
}

/// Turns the accumulated chunks into a single clip and tears the stream
/// down. Taking the stream out of the shared slot decides who finalizes:
/// whichever of the stop command and the length cap gets here first wins,
/// and the stream is stopped exactly once.
pub(super) async fn finalize_recording(
    state: &Mutex<CaptureState>,
    stream: &Mutex<Option<Box<dyn CameraStream>>>,
    chunks: &Mutex<Vec<Vec<u8>>>,
    tray: &MediaTray,
    events: &EventBus,
    haptics: &Arc<dyn Haptics>,
) -> Result<MediaAsset> {
    let Some(live) = stream.lock().await.take() else {
        return Err(anyhow!("no active recording"));
    };
    live.stop_tracks();

    let duration_secs = {
        let mut guard = state.lock().await;
        let elapsed = guard.elapsed_secs;
        guard.reset();
        elapsed
    };

    let parts = std::mem::take(&mut *chunks.lock().await);
    let bytes: Vec<u8> = parts.concat();
    let name = format!("recording-{}.webm", Utc::now().timestamp_millis());
    let asset = MediaAsset::new(name.clone(), VIDEO_MIME.to_string(), bytes);

    tray.add_asset(asset.clone()).await;
    haptics.pulse();

    events.emit(CoreEvent::CaptureStateChanged {
        state: state.lock().await.clone(),
    });
    events.emit(CoreEvent::VideoCaptured {
        name,
        duration_secs,
    });

    Ok(asset)
}

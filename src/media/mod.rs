use std::sync::Arc;

use base64::Engine;
use log::warn;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::events::{CoreEvent, EventBus};
use crate::session::{SessionStore, MEDIA_PREVIEWS_KEY};

pub mod normalizer;

pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

pub fn is_video(mime: &str) -> bool {
    mime.starts_with("video/")
}

/// A captured or picked file while it is still in memory. The raw bytes
/// only exist for the lifetime of the intake flow; anything that outlives
/// it is persisted as a [`MediaPreview`].
#[derive(Debug, Clone)]
pub struct MediaAsset {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
    pub preview: String,
}

impl MediaAsset {
    pub fn new(name: String, mime: String, bytes: Vec<u8>) -> Self {
        let preview = data_url(&mime, &bytes);
        Self {
            name,
            mime,
            bytes,
            preview,
        }
    }

    pub fn is_video(&self) -> bool {
        is_video(&self.mime)
    }

    pub fn to_preview(&self) -> MediaPreview {
        MediaPreview {
            name: self.name.clone(),
            mime: self.mime.clone(),
            preview: self.preview.clone(),
        }
    }
}

/// The durable face of an asset: a self-contained data URL plus metadata.
/// Raw device handles and blobs are never persisted, they would dangle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaPreview {
    pub name: String,
    pub mime: String,
    pub preview: String,
}

impl MediaPreview {
    pub fn is_video(&self) -> bool {
        is_video(&self.mime)
    }
}

struct TrayState {
    assets: Vec<MediaAsset>,
    previews: Vec<MediaPreview>,
}

struct TrayInner {
    state: Mutex<TrayState>,
    session: SessionStore,
    events: EventBus,
}

/// Shared list of the assets attached to the in-progress consultation.
/// Both the capture controller and the file-picker path feed it; the
/// orchestrator drains it when building a request. Previews are written to
/// the session store on every change so the list survives a view reload.
#[derive(Clone)]
pub struct MediaTray {
    inner: Arc<TrayInner>,
}

impl MediaTray {
    pub fn new(session: SessionStore, events: EventBus) -> Self {
        Self {
            inner: Arc::new(TrayInner {
                state: Mutex::new(TrayState {
                    assets: Vec::new(),
                    previews: Vec::new(),
                }),
                session,
                events,
            }),
        }
    }

    /// Restores previews from the session store. Asset bytes are gone
    /// after a reload; the restored list is display-only, which matches
    /// what a re-submitted analysis would actually have available.
    pub async fn restore(&self) {
        if let Some(previews) = self
            .inner
            .session
            .get_json::<Vec<MediaPreview>>(MEDIA_PREVIEWS_KEY)
        {
            let mut state = self.inner.state.lock().await;
            state.previews = previews;
        }
    }

    pub async fn add_asset(&self, asset: MediaAsset) {
        let count = {
            let mut state = self.inner.state.lock().await;
            state.previews.push(asset.to_preview());
            state.assets.push(asset);
            self.persist_previews(&state.previews);
            state.previews.len()
        };
        self.inner.events.emit(CoreEvent::MediaListChanged { count });
    }

    /// Runs the normalizer first. A file that cannot be decoded is
    /// attached as-is rather than rejected.
    pub async fn add_file(&self, name: &str, mime: &str, bytes: Vec<u8>) -> MediaAsset {
        let asset = match normalizer::normalize(name, mime, bytes.clone()) {
            Ok(normalized) => MediaAsset::new(normalized.name, normalized.mime, normalized.bytes),
            Err(err) => {
                warn!("Media normalization failed for '{name}', keeping original: {err}");
                MediaAsset::new(name.to_string(), mime.to_string(), bytes)
            }
        };
        self.add_asset(asset.clone()).await;
        asset
    }

    pub async fn remove(&self, index: usize) {
        let count = {
            let mut state = self.inner.state.lock().await;
            if index < state.assets.len() {
                state.assets.remove(index);
            }
            if index < state.previews.len() {
                state.previews.remove(index);
            }
            self.persist_previews(&state.previews);
            state.previews.len()
        };
        self.inner.events.emit(CoreEvent::MediaListChanged { count });
    }

    pub async fn clear(&self) {
        {
            let mut state = self.inner.state.lock().await;
            state.assets.clear();
            state.previews.clear();
        }
        self.inner.session.remove(MEDIA_PREVIEWS_KEY);
        self.inner.events.emit(CoreEvent::MediaListChanged { count: 0 });
    }

    pub async fn assets(&self) -> Vec<MediaAsset> {
        self.inner.state.lock().await.assets.clone()
    }

    pub async fn previews(&self) -> Vec<MediaPreview> {
        self.inner.state.lock().await.previews.clone()
    }

    pub async fn is_empty(&self) -> bool {
        let state = self.inner.state.lock().await;
        state.assets.is_empty() && state.previews.is_empty()
    }

    fn persist_previews(&self, previews: &[MediaPreview]) {
        // Large previews can blow the session quota. That only costs the
        // reload-survival of the list, so log and move on.
        if let Err(err) = self
            .inner
            .session
            .put_json(MEDIA_PREVIEWS_KEY, &previews.to_vec())
        {
            warn!("Could not persist media previews: {err}");
        }
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CaptureMode {
    Photo,
    Video,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CapturePhase {
    Idle,
    RequestingDevice,
    Live,
}

impl Default for CapturePhase {
    fn default() -> Self {
        CapturePhase::Idle
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureState {
    pub phase: CapturePhase,
    pub mode: Option<CaptureMode>,
    /// Seconds of video recorded so far. Stays 0 in photo mode.
    pub elapsed_secs: u64,
    pub started_at: Option<DateTime<Utc>>,
}

impl Default for CaptureState {
    fn default() -> Self {
        Self {
            phase: CapturePhase::Idle,
            mode: None,
            elapsed_secs: 0,
            started_at: None,
        }
    }
}

impl CaptureState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_request(&mut self, mode: CaptureMode) {
        *self = Self {
            phase: CapturePhase::RequestingDevice,
            mode: Some(mode),
            elapsed_secs: 0,
            started_at: None,
        };
    }

    pub fn go_live(&mut self, at: DateTime<Utc>) {
        self.phase = CapturePhase::Live;
        self.started_at = Some(at);
    }

    pub fn is_live_in(&self, mode: CaptureMode) -> bool {
        self.phase == CapturePhase::Live && self.mode == Some(mode)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

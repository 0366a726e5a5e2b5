use serde::{Deserialize, Serialize};

/// Result of the one-time onboarding permission walkthrough. Stored so the
/// walkthrough is skipped on later launches; actual device access is still
/// probed at capture time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PermissionState {
    pub camera: bool,
    pub microphone: bool,
    pub completed: bool,
}

impl Default for PermissionState {
    fn default() -> Self {
        Self {
            camera: false,
            microphone: false,
            completed: false,
        }
    }
}

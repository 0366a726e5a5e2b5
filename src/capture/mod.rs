pub mod controller;
mod recorder;
pub mod state;

pub use controller::CaptureController;
pub use recorder::VIDEO_CAP_SECS;
pub use state::{CaptureMode, CapturePhase, CaptureState};

//! Hardware-facing seams. The core never talks to a camera, speaker or
//! network probe directly; the embedding shell injects implementations of
//! these traits. Every default here is the capability-absent one, so a
//! headless embedding degrades to silent no-ops instead of crashing.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("no capture device available")]
    Unavailable,
    #[error("device access denied: {0}")]
    PermissionDenied(String),
    #[error("device stream failed: {0}")]
    Stream(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraFacing {
    Front,
    Rear,
}

#[derive(Debug, Clone, Copy)]
pub struct StreamConstraints {
    pub facing: CameraFacing,
    pub audio: bool,
}

impl StreamConstraints {
    pub fn photo() -> Self {
        Self {
            facing: CameraFacing::Rear,
            audio: false,
        }
    }

    pub fn video() -> Self {
        Self {
            facing: CameraFacing::Rear,
            audio: true,
        }
    }
}

/// One decoded still frame, tightly packed RGB8.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// A live device stream. The capture controller owns the boxed stream for
/// the duration of one session and is responsible for calling
/// `stop_tracks` exactly once on the way out.
#[async_trait]
pub trait CameraStream: Send + Sync {
    /// Current still frame, used by photo capture.
    async fn grab_frame(&self) -> Result<RawFrame, DeviceError>;

    /// Roughly one tick's worth of encoded video. The controller polls
    /// this once per second while recording.
    async fn next_chunk(&self) -> Result<Vec<u8>, DeviceError>;

    /// Releases the underlying device tracks.
    fn stop_tracks(&self);
}

#[async_trait]
pub trait CameraDevice: Send + Sync {
    fn is_available(&self) -> bool {
        true
    }

    async fn open_stream(
        &self,
        constraints: StreamConstraints,
    ) -> Result<Box<dyn CameraStream>, DeviceError>;
}

/// Text-to-speech output. `speak` is fire-and-forget: implementations
/// interrupt any ongoing utterance, dispatch, and never report back.
pub trait Narrator: Send + Sync {
    fn is_available(&self) -> bool {
        true
    }

    fn speak(&self, text: &str, lang_code: &str);
}

/// Short tactile confirmation on capture and send actions.
pub trait Haptics: Send + Sync {
    fn pulse(&self);
}

pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Capability-absent camera: reports unavailable and refuses to open.
pub struct NoCamera;

#[async_trait]
impl CameraDevice for NoCamera {
    fn is_available(&self) -> bool {
        false
    }

    async fn open_stream(
        &self,
        _constraints: StreamConstraints,
    ) -> Result<Box<dyn CameraStream>, DeviceError> {
        Err(DeviceError::Unavailable)
    }
}

pub struct SilentNarrator;

impl Narrator for SilentNarrator {
    fn is_available(&self) -> bool {
        false
    }

    fn speak(&self, _text: &str, _lang_code: &str) {}
}

pub struct NoHaptics;

impl Haptics for NoHaptics {
    fn pulse(&self) {}
}

pub struct AlwaysOnline;

impl Connectivity for AlwaysOnline {
    fn is_online(&self) -> bool {
        true
    }
}

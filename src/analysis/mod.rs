pub mod autosave;
pub mod orchestrator;

pub use autosave::DraftAutosaver;
pub use orchestrator::{AnalysisOrchestrator, WorkflowStage, SUCCESS_DISPLAY};

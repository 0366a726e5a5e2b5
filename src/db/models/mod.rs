pub mod analysis;
pub mod chat;
pub mod consultation;
pub mod draft;
pub mod prefs;

pub use analysis::{
    AnalysisResult, BoundingBox, ComparativeAnalysis, ConditionType, ConfidenceBreakdown,
    ConfidenceFactor, ConfidenceLevel, DecisionPath, DetailedVisualAnalysis, Diagnosis,
    Explainability, FactorImpact, FactorWeight, FindingSeverity, MotionMetric, MotionStatus,
    ProgressionAnalysis, TimelineSeverity, Urgency, VideoTimelineEvent,
};
pub use chat::{ChatMessage, Sender};
pub use consultation::{ConsultationRecord, DoctorNote, PatientData};
pub use draft::{PatientDraft, SymptomDuration, SYMPTOM_TAGS};
pub use prefs::PermissionState;

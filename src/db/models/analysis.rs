//! Analysis result models.
//!
//! This is the decoded shape of an inference response. Everything the
//! viewer, chat and history surfaces show comes from here, so the field
//! set is wide; only `bounding_boxes`, `diagnoses`, `overall_explanation`
//! and `recommended_tests` are guaranteed present after decoding.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FindingSeverity {
    High,
    Moderate,
    Healing,
}

/// A visual finding in the normalized 0-1000 coordinate space.
/// `ymin`/`xmin`/`ymax`/`xmax` are axis positions, not width/height.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub ymin: f64,
    pub xmin: f64,
    pub ymax: f64,
    pub xmax: f64,
    pub label: String,
    pub confidence: f64,
    pub severity: FindingSeverity,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Urgency {
    #[serde(rename = "URGENT")]
    Urgent,
    #[serde(rename = "NON-URGENT")]
    NonUrgent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnosis {
    pub name: String,
    pub local_name: String,
    pub explanation: String,
    pub recommendation: String,
    /// Likelihood in percent, 0-100.
    pub likelihood: f64,
    pub urgency: Urgency,
    pub pronunciation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionAnalysis {
    pub comparison_comment: String,
    pub improvement_percentage: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimelineSeverity {
    High,
    Moderate,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoTimelineEvent {
    pub time: String,
    pub description: String,
    pub severity: TimelineSeverity,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MotionStatus {
    Normal,
    Warning,
    Abnormal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotionMetric {
    pub name: String,
    pub value: f64,
    pub unit: String,
    pub status: MotionStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorWeight {
    pub factor: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FactorImpact {
    Positive,
    Negative,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceFactor {
    pub reason: String,
    pub impact: FactorImpact,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Explainability {
    pub factor_weights: Vec<FactorWeight>,
    pub image_focus_areas: Vec<String>,
    pub confidence_factors: Vec<ConfidenceFactor>,
    pub medical_references: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionPath {
    pub node: String,
    pub result: String,
    pub evidence: String,
    pub next: Option<Box<DecisionPath>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceBreakdown {
    pub score: f64,
    pub level: ConfidenceLevel,
    pub missing_data_impact: Vec<String>,
    pub improvement_suggestions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparativeAnalysis {
    pub similar_cases_count: u32,
    pub similar_cases_outcome: String,
    pub reference_guidelines: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConditionType {
    Skin,
    Wound,
    Eye,
    Oral,
    Musculoskeletal,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkinAttributes {
    pub tone: String,
    pub texture: String,
    pub pattern: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WoundAttributes {
    pub r#type: String,
    pub healing_stage: String,
    pub infection_risk: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EyeAttributes {
    pub redness: bool,
    pub discharge: bool,
    pub pupil_status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OralAttributes {
    pub tissue_health: String,
    pub abnormality: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedVisualAnalysis {
    pub detected_body_part: String,
    pub condition_type: ConditionType,
    /// Severity on a 1-10 scale.
    pub severity_score: f64,
    pub skin_attributes: Option<SkinAttributes>,
    pub wound_attributes: Option<WoundAttributes>,
    pub eye_attributes: Option<EyeAttributes>,
    pub oral_attributes: Option<OralAttributes>,
    pub symmetry_comparison: Option<String>,
    pub environmental_factors: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Empty when the condition has no visual findings; never missing.
    pub bounding_boxes: Vec<BoundingBox>,
    pub diagnoses: Vec<Diagnosis>,
    pub overall_explanation: String,
    pub home_remedies: Option<Vec<String>>,
    pub doctor_warning: Option<String>,
    pub recommended_tests: Vec<String>,
    pub estimated_area: Option<String>,
    pub progression_analysis: Option<ProgressionAnalysis>,
    pub visual_diagram_query: Option<String>,
    pub reasoning_chain: Option<Vec<String>>,
    pub video_timeline: Option<Vec<VideoTimelineEvent>>,
    pub motion_metrics: Option<Vec<MotionMetric>>,
    pub video_summary: Option<String>,
    pub explainability: Option<Explainability>,
    pub decision_tree: Option<DecisionPath>,
    pub confidence_breakdown: Option<ConfidenceBreakdown>,
    pub comparative_analysis: Option<ComparativeAnalysis>,
    pub visual_analysis: Option<DetailedVisualAnalysis>,
}

impl AnalysisResult {
    /// The first diagnosis is the primary one everywhere a single
    /// condition name is surfaced. The gateway orders by likelihood.
    pub fn primary_diagnosis(&self) -> Option<&Diagnosis> {
        self.diagnoses.first()
    }

    pub fn finding_labels(&self) -> Vec<String> {
        self.bounding_boxes
            .iter()
            .map(|b| b.label.clone())
            .collect()
    }
}

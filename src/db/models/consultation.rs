//! Consultation record models: one durable record per completed analysis.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AnalysisResult;
use crate::media::MediaPreview;

/// Snapshot of what the patient submitted, frozen at analysis time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientData {
    pub symptoms: String,
    pub duration: String,
    pub pain_level: u8,
    pub other_symptoms: Vec<String>,
    pub media: Vec<MediaPreview>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Appended by the doctor portal flow. Records are otherwise immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorNote {
    pub id: String,
    pub doctor_id: String,
    pub doctor_name: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub prescription_image: Option<String>,
    pub prescription_text: Option<String>,
}

impl DoctorNote {
    pub fn new(doctor_id: &str, doctor_name: &str, text: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            doctor_id: doctor_id.to_string(),
            doctor_name: doctor_name.to_string(),
            text: text.to_string(),
            created_at: Utc::now(),
            prescription_image: None,
            prescription_text: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationRecord {
    pub id: String,
    pub date: DateTime<Utc>,
    pub patient_data: PatientData,
    pub analysis_result: AnalysisResult,
    pub share_code: Option<String>,
    #[serde(default)]
    pub doctor_notes: Vec<DoctorNote>,
}

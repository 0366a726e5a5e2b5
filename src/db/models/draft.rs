//! The in-progress intake form. One draft exists at a time; it is
//! debounce-saved while the user types and discarded when an analysis is
//! dispatched.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tags offered by the intake form. The draft also accepts free-form tags
/// coming from speech input, so this list is a catalogue, not a constraint.
pub const SYMPTOM_TAGS: &[&str] = &[
    "Fever",
    "Cough",
    "Headache",
    "Nausea",
    "Dizziness",
    "Fatigue",
    "Rash",
    "Swelling",
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SymptomDuration {
    UnderOneDay,
    OneToThreeDays,
    FourToSevenDays,
    OverOneWeek,
}

impl Default for SymptomDuration {
    fn default() -> Self {
        SymptomDuration::UnderOneDay
    }
}

impl SymptomDuration {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymptomDuration::UnderOneDay => "Less than a day",
            SymptomDuration::OneToThreeDays => "1-3 days",
            SymptomDuration::FourToSevenDays => "4-7 days",
            SymptomDuration::OverOneWeek => "More than a week",
        }
    }

    pub fn from_str(value: &str) -> Result<Self> {
        match value {
            "Less than a day" => Ok(SymptomDuration::UnderOneDay),
            "1-3 days" => Ok(SymptomDuration::OneToThreeDays),
            "4-7 days" => Ok(SymptomDuration::FourToSevenDays),
            "More than a week" => Ok(SymptomDuration::OverOneWeek),
            _ => Err(anyhow!("unknown symptom duration '{value}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientDraft {
    pub symptoms: String,
    pub duration: SymptomDuration,
    pub pain_level: u8,
    pub other_symptoms: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl Default for PatientDraft {
    fn default() -> Self {
        Self {
            symptoms: String::new(),
            duration: SymptomDuration::default(),
            pain_level: 5,
            other_symptoms: Vec::new(),
            updated_at: Utc::now(),
        }
    }
}

impl PatientDraft {
    /// Set-style toggle: present tags are removed, absent tags appended.
    pub fn toggle_tag(&mut self, tag: &str) {
        if let Some(pos) = self.other_symptoms.iter().position(|t| t == tag) {
            self.other_symptoms.remove(pos);
        } else {
            self.other_symptoms.push(tag.to_string());
        }
    }

    pub fn set_pain_level(&mut self, level: u8) {
        self.pain_level = level.clamp(1, 10);
    }

    pub fn is_empty(&self) -> bool {
        self.symptoms.trim().is_empty()
    }

    /// Structured-context line sent alongside the free-text narrative.
    pub fn metadata_line(&self) -> String {
        format!(
            "Duration: {}, Pain: {}/10, Tags: {}",
            self.duration.as_str(),
            self.pain_level,
            self.other_symptoms.join(", ")
        )
    }
}

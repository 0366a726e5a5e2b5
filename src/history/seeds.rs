use chrono::{Duration, Utc};

use crate::db::models::{
    AnalysisResult, BoundingBox, ConsultationRecord, Diagnosis, FindingSeverity, PatientData,
    Urgency,
};

/// Demonstration consultations shown alongside the user's own history.
/// They give a first-run user something to open, and the doctor portal a
/// share code to try. Their ids live in the `demo-` namespace so a real
/// record can never collide with one by accident.
pub fn demo_records() -> Vec<ConsultationRecord> {
    vec![fever_case(), wound_case()]
}

fn fever_case() -> ConsultationRecord {
    ConsultationRecord {
        id: "demo-0001".to_string(),
        date: Utc::now() - Duration::days(12),
        patient_data: PatientData {
            symptoms: "High fever and body ache since last night".to_string(),
            duration: "1-3 days".to_string(),
            pain_level: 6,
            other_symptoms: vec!["Fever".to_string(), "Headache".to_string()],
            media: Vec::new(),
            timestamp: Some(Utc::now() - Duration::days(12)),
        },
        analysis_result: AnalysisResult {
            bounding_boxes: Vec::new(),
            diagnoses: vec![Diagnosis {
                name: "Viral Fever".to_string(),
                local_name: "Viral Fever".to_string(),
                explanation: "The pattern of sudden fever with body ache and headache, \
                              without localized findings, fits a common viral infection."
                    .to_string(),
                recommendation: "Rest, fluids, and paracetamol for fever. See a health \
                                 worker if the fever lasts beyond three days."
                    .to_string(),
                likelihood: 88.0,
                urgency: Urgency::NonUrgent,
                pronunciation: None,
            }],
            overall_explanation: "This looks like a routine viral fever. It usually \
                                  settles on its own within a few days with rest and \
                                  plenty of fluids."
                .to_string(),
            home_remedies: Some(vec![
                "Drink warm water and oral rehydration solution through the day".to_string(),
                "Sponge the forehead with a damp cloth if the fever climbs".to_string(),
            ]),
            recommended_tests: vec!["Malaria rapid test if fever persists".to_string()],
            ..Default::default()
        },
        share_code: Some("GH-2025-FUN".to_string()),
        doctor_notes: Vec::new(),
    }
}

fn wound_case() -> ConsultationRecord {
    ConsultationRecord {
        id: "demo-0002".to_string(),
        date: Utc::now() - Duration::days(45),
        patient_data: PatientData {
            symptoms: "Cut on the lower leg from farm work, now red and weeping".to_string(),
            duration: "4-7 days".to_string(),
            pain_level: 8,
            other_symptoms: vec!["Swelling".to_string()],
            media: Vec::new(),
            timestamp: Some(Utc::now() - Duration::days(45)),
        },
        analysis_result: AnalysisResult {
            bounding_boxes: vec![
                BoundingBox {
                    ymin: 320.0,
                    xmin: 210.0,
                    ymax: 610.0,
                    xmax: 540.0,
                    label: "Open wound".to_string(),
                    confidence: 93.0,
                    severity: FindingSeverity::High,
                },
                BoundingBox {
                    ymin: 250.0,
                    xmin: 150.0,
                    ymax: 700.0,
                    xmax: 640.0,
                    label: "Surrounding redness".to_string(),
                    confidence: 81.0,
                    severity: FindingSeverity::Moderate,
                },
            ],
            diagnoses: vec![Diagnosis {
                name: "Infected Laceration".to_string(),
                local_name: "Infected Laceration".to_string(),
                explanation: "The wound edges are inflamed and there is discharge, which \
                              points to a local infection rather than normal healing."
                    .to_string(),
                recommendation: "Visit a clinic today. The wound needs cleaning and \
                                 likely a course of antibiotics."
                    .to_string(),
                likelihood: 82.0,
                urgency: Urgency::Urgent,
                pronunciation: None,
            }],
            overall_explanation: "The cut has become infected and should be seen by a \
                                  health worker today. Keep it covered with a clean \
                                  cloth until then."
                .to_string(),
            doctor_warning: Some(
                "Seek care immediately if red streaks spread from the wound or fever \
                 develops."
                    .to_string(),
            ),
            recommended_tests: vec!["Wound swab culture".to_string()],
            estimated_area: Some("4cm x 3cm".to_string()),
            ..Default::default()
        },
        share_code: Some("GH-2025-KAV".to_string()),
        doctor_notes: Vec::new(),
    }
}

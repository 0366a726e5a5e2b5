use anyhow::Result;
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    helpers::{parse_datetime, parse_json},
    models::{PatientDraft, SymptomDuration},
    Database,
};

// Single-slot table: there is never more than one in-progress intake form.
const DRAFT_SLOT: &str = "current";

fn row_to_draft(row: &Row) -> Result<PatientDraft> {
    let duration: String = row.get("duration")?;
    let pain_level: i64 = row.get("pain_level")?;
    let other_symptoms: String = row.get("other_symptoms")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(PatientDraft {
        symptoms: row.get("symptoms")?,
        duration: SymptomDuration::from_str(&duration)?,
        pain_level: pain_level.clamp(1, 10) as u8,
        other_symptoms: parse_json(&other_symptoms, "other_symptoms")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    pub async fn save_draft(&self, draft: &PatientDraft) -> Result<()> {
        let record = draft.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO drafts (slot, symptoms, duration, pain_level, other_symptoms, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    DRAFT_SLOT,
                    record.symptoms,
                    record.duration.as_str(),
                    record.pain_level as i64,
                    serde_json::to_string(&record.other_symptoms)?,
                    record.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn load_draft(&self) -> Result<Option<PatientDraft>> {
        self.execute(|conn| {
            let draft = conn
                .query_row(
                    "SELECT symptoms, duration, pain_level, other_symptoms, updated_at
                     FROM drafts
                     WHERE slot = ?1",
                    params![DRAFT_SLOT],
                    |row| Ok(row_to_draft(row)),
                )
                .optional()?;
            draft.transpose()
        })
        .await
    }

    pub async fn clear_draft(&self) -> Result<()> {
        self.execute(|conn| {
            conn.execute("DELETE FROM drafts WHERE slot = ?1", params![DRAFT_SLOT])?;
            Ok(())
        })
        .await
    }
}

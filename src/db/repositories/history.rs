use std::collections::{HashMap, HashSet};

use anyhow::Result;
use chrono::Utc;
use rusqlite::{params, Row};

use crate::db::{
    helpers::{parse_datetime, parse_json},
    models::{ConsultationRecord, DoctorNote},
    Database,
};

fn row_to_record(row: &Row) -> Result<ConsultationRecord> {
    let date: String = row.get("date")?;
    let patient_json: String = row.get("patient_json")?;
    let analysis_json: String = row.get("analysis_json")?;

    Ok(ConsultationRecord {
        id: row.get("id")?,
        date: parse_datetime(&date, "date")?,
        patient_data: parse_json(&patient_json, "patient_json")?,
        analysis_result: parse_json(&analysis_json, "analysis_json")?,
        share_code: row.get("share_code")?,
        doctor_notes: Vec::new(),
    })
}

fn row_to_note(row: &Row) -> Result<DoctorNote> {
    let created_at: String = row.get("created_at")?;

    Ok(DoctorNote {
        id: row.get("id")?,
        doctor_id: row.get("doctor_id")?,
        doctor_name: row.get("doctor_name")?,
        text: row.get("body")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        prescription_image: row.get("prescription_image")?,
        prescription_text: row.get("prescription_text")?,
    })
}

impl Database {
    pub async fn insert_consultation(&self, record: &ConsultationRecord) -> Result<()> {
        let record = record.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO consultations (id, date, share_code, patient_json, analysis_json)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.id,
                    record.date.to_rfc3339(),
                    record.share_code,
                    serde_json::to_string(&record.patient_data)?,
                    serde_json::to_string(&record.analysis_result)?,
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// User records only, newest first, without notes attached. The ledger
    /// joins notes after merging in the seed records.
    pub async fn list_consultations(&self) -> Result<Vec<ConsultationRecord>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, date, share_code, patient_json, analysis_json
                 FROM consultations
                 ORDER BY date DESC",
            )?;

            let mut rows = stmt.query([])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(row_to_record(row)?);
            }
            Ok(records)
        })
        .await
    }

    pub async fn delete_consultation(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.execute(move |conn| {
            conn.execute("DELETE FROM consultations WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await
    }

    /// Idempotent: tombstoning an already-deleted identity is a no-op.
    pub async fn insert_tombstone(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO tombstones (id, deleted_at) VALUES (?1, ?2)",
                params![id, Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn list_tombstones(&self) -> Result<HashSet<String>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM tombstones")?;
            let mut rows = stmt.query([])?;
            let mut ids = HashSet::new();
            while let Some(row) = rows.next()? {
                ids.insert(row.get::<_, String>(0)?);
            }
            Ok(ids)
        })
        .await
    }

    pub async fn insert_doctor_note(&self, consultation_id: &str, note: &DoctorNote) -> Result<()> {
        let consultation_id = consultation_id.to_string();
        let note = note.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO doctor_notes (id, consultation_id, doctor_id, doctor_name, body, created_at, prescription_image, prescription_text)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    note.id,
                    consultation_id,
                    note.doctor_id,
                    note.doctor_name,
                    note.text,
                    note.created_at.to_rfc3339(),
                    note.prescription_image,
                    note.prescription_text,
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// All notes grouped by consultation id, oldest first within a record.
    /// Grouping covers seed identities too, which is why this is not a join
    /// against the consultations table.
    pub async fn list_doctor_notes(&self) -> Result<HashMap<String, Vec<DoctorNote>>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, consultation_id, doctor_id, doctor_name, body, created_at, prescription_image, prescription_text
                 FROM doctor_notes
                 ORDER BY created_at ASC",
            )?;

            let mut rows = stmt.query([])?;
            let mut grouped: HashMap<String, Vec<DoctorNote>> = HashMap::new();
            while let Some(row) = rows.next()? {
                let consultation_id: String = row.get("consultation_id")?;
                grouped
                    .entry(consultation_id)
                    .or_default()
                    .push(row_to_note(row)?);
            }
            Ok(grouped)
        })
        .await
    }
}

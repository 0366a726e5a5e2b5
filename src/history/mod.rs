use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::Utc;
use log::warn;
use rand::Rng;

use crate::{
    db::models::{ConsultationRecord, DoctorNote},
    db::Database,
    events::{CoreEvent, EventBus},
    inference::{InferenceService, MediaPart, PRESCRIPTION_FALLBACK_MESSAGE},
};

mod seeds;

pub use seeds::demo_records;

/// Past consultations as the user sees them: their own records merged
/// with the demonstration seeds, minus everything they have deleted.
#[derive(Clone)]
pub struct HistoryLedger {
    db: Database,
    service: Arc<dyn InferenceService>,
    events: EventBus,
}

impl HistoryLedger {
    pub fn new(db: Database, service: Arc<dyn InferenceService>, events: EventBus) -> Self {
        Self {
            db,
            service,
            events,
        }
    }

    /// Builds the merged view. Seeds go into the map first and user
    /// records after them, so on an id collision the user's record
    /// replaces the seed exactly once. Tombstoned ids drop out, doctor
    /// notes attach to whatever survives, and the list sorts newest
    /// first.
    pub async fn list(&self) -> Result<Vec<ConsultationRecord>> {
        let user_records = self.db.list_consultations().await?;
        let tombstones = self.db.list_tombstones().await?;
        let mut notes = self.db.list_doctor_notes().await?;

        let mut merged: HashMap<String, ConsultationRecord> = HashMap::new();
        for record in seeds::demo_records() {
            merged.insert(record.id.clone(), record);
        }
        for record in user_records {
            merged.insert(record.id.clone(), record);
        }

        let mut records: Vec<ConsultationRecord> = merged
            .into_values()
            .filter(|record| !tombstones.contains(&record.id))
            .map(|mut record| {
                if let Some(extra) = notes.remove(&record.id) {
                    record.doctor_notes.extend(extra);
                }
                record
            })
            .collect();

        records.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(records)
    }

    pub async fn save(&self, record: &ConsultationRecord) -> Result<()> {
        self.db.insert_consultation(record).await?;
        self.events.emit(CoreEvent::HistoryChanged);
        Ok(())
    }

    /// Soft delete. A tombstone keeps the id out of the merged view even
    /// when the underlying record is a seed that cannot be removed.
    /// Deleting an already-deleted id changes nothing.
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.db.insert_tombstone(id).await?;
        self.db.delete_consultation(id).await?;
        self.events.emit(CoreEvent::HistoryChanged);
        Ok(())
    }

    /// Looks a record up by the share code a patient reads out to their
    /// doctor. Codes are compared verbatim apart from surrounding
    /// whitespace.
    pub async fn find_by_share_code(&self, code: &str) -> Result<Option<ConsultationRecord>> {
        let code = code.trim();
        if code.is_empty() {
            return Ok(None);
        }
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|record| record.share_code.as_deref() == Some(code)))
    }

    pub async fn add_note(
        &self,
        record_id: &str,
        doctor_id: &str,
        doctor_name: &str,
        text: &str,
    ) -> Result<DoctorNote> {
        let text = text.trim();
        if text.is_empty() {
            bail!("cannot add an empty note");
        }

        let note = DoctorNote::new(doctor_id, doctor_name, text);
        self.db.insert_doctor_note(record_id, &note).await?;
        self.events.emit(CoreEvent::HistoryChanged);
        Ok(note)
    }

    /// Digitizes a prescription photo and appends the transcript to a
    /// note draft under the "[Rx]:" marker. A failed transcription
    /// degrades to a stock line so the doctor can keep typing.
    pub async fn append_prescription(&self, draft: &str, image: &MediaPart) -> String {
        let text = match self.service.transcribe_prescription(image).await {
            Ok(text) => text,
            Err(err) => {
                warn!("Prescription digitization failed: {err}");
                PRESCRIPTION_FALLBACK_MESSAGE.to_string()
            }
        };
        format!("{draft}\n[Rx]: {text}")
    }
}

/// Share codes look like `GH-2025-ABC`. They are assigned when a record
/// is created so that sharing still works when the link is down later.
pub fn generate_share_code() -> String {
    let mut rng = rand::thread_rng();
    let letters: String = (0..3).map(|_| rng.gen_range(b'A'..=b'Z') as char).collect();
    format!("GH-{}-{}", Utc::now().format("%Y"), letters)
}

//! The merged history view: seed precedence, tombstones, doctor notes,
//! share-code lookup and ordering.

mod helpers;

use chrono::{Duration, Utc};
use helpers::{boot, sample_analysis};
use sehat::db::models::{ConsultationRecord, PatientData};
use sehat::inference::MediaPart;

fn record(id: &str, days_ago: i64, share_code: Option<&str>) -> ConsultationRecord {
    ConsultationRecord {
        id: id.to_string(),
        date: Utc::now() - Duration::days(days_ago),
        patient_data: PatientData {
            symptoms: "burning sensation in both feet".to_string(),
            duration: "1-3 days".to_string(),
            pain_level: 4,
            other_symptoms: Vec::new(),
            media: Vec::new(),
            timestamp: None,
        },
        analysis_result: sample_analysis(),
        share_code: share_code.map(str::to_string),
        doctor_notes: Vec::new(),
    }
}

#[tokio::test]
async fn a_fresh_ledger_contains_only_the_demonstration_seeds() {
    let t = boot().await;

    let records = t.core.history.list().await.unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.id.starts_with("demo-")));
    // Newest first.
    assert_eq!(records[0].id, "demo-0001");
    assert_eq!(records[1].id, "demo-0002");
}

#[tokio::test]
async fn a_user_record_replaces_a_colliding_seed_exactly_once() {
    let t = boot().await;

    t.core
        .history
        .save(&record("demo-0001", 0, Some("GH-2025-AAA")))
        .await
        .unwrap();

    let records = t.core.history.list().await.unwrap();
    assert_eq!(records.len(), 2);

    let survivor = records.iter().find(|r| r.id == "demo-0001").unwrap();
    assert_eq!(survivor.patient_data.symptoms, "burning sensation in both feet");
    assert_eq!(survivor.share_code.as_deref(), Some("GH-2025-AAA"));
}

#[tokio::test]
async fn deleting_hides_seeds_and_records_alike() {
    let t = boot().await;
    t.core.history.save(&record("rec-1", 1, None)).await.unwrap();

    t.core.history.delete("demo-0002").await.unwrap();
    let records = t.core.history.list().await.unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.id != "demo-0002"));

    // Idempotent: deleting the same id again changes nothing.
    t.core.history.delete("demo-0002").await.unwrap();
    assert_eq!(t.core.history.list().await.unwrap().len(), 2);

    t.core.history.delete("rec-1").await.unwrap();
    t.core.history.delete("demo-0001").await.unwrap();
    assert!(t.core.history.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn a_deleted_seed_stays_deleted_across_restarts() {
    let t = boot().await;
    t.core.history.delete("demo-0001").await.unwrap();

    let dir = t.dir;
    drop(t.core);
    let t2 = helpers::boot_at(dir, None).await;

    let records = t2.core.history.list().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "demo-0002");
}

#[tokio::test]
async fn doctor_notes_attach_to_seed_records() {
    let t = boot().await;

    let note = t
        .core
        .history
        .add_note("demo-0001", "doc-7", "Dr. Mehta", "Switch to ibuprofen if fever persists.")
        .await
        .unwrap();
    assert_eq!(note.doctor_name, "Dr. Mehta");

    let records = t.core.history.list().await.unwrap();
    let seeded = records.iter().find(|r| r.id == "demo-0001").unwrap();
    assert_eq!(seeded.doctor_notes.len(), 1);
    assert_eq!(
        seeded.doctor_notes[0].text,
        "Switch to ibuprofen if fever persists."
    );

    // Blank notes are refused.
    assert!(t
        .core
        .history
        .add_note("demo-0001", "doc-7", "Dr. Mehta", "   ")
        .await
        .is_err());
}

#[tokio::test]
async fn share_codes_look_up_records_and_seeds() {
    let t = boot().await;
    t.core
        .history
        .save(&record("rec-9", 0, Some("GH-2025-XYZ")))
        .await
        .unwrap();

    let by_code = t
        .core
        .history
        .find_by_share_code("  GH-2025-XYZ  ")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_code.id, "rec-9");

    let seed = t
        .core
        .history
        .find_by_share_code("GH-2025-KAV")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(seed.id, "demo-0002");

    assert!(t
        .core
        .history
        .find_by_share_code("GH-2025-ZZZ")
        .await
        .unwrap()
        .is_none());
    assert!(t.core.history.find_by_share_code("").await.unwrap().is_none());
}

#[tokio::test]
async fn the_ledger_sorts_newest_first_across_sources() {
    let t = boot().await;
    t.core.history.save(&record("rec-old", 30, None)).await.unwrap();
    t.core.history.save(&record("rec-new", 0, None)).await.unwrap();

    let ids: Vec<String> = t
        .core
        .history
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec!["rec-new", "demo-0001", "rec-old", "demo-0002"]);
}

#[tokio::test]
async fn prescriptions_append_under_the_rx_marker() {
    let t = boot().await;
    let image = MediaPart {
        name: "rx.webp".to_string(),
        mime: "image/webp".to_string(),
        data: "AAAA".to_string(),
    };

    let appended = t
        .core
        .history
        .append_prescription("Take rest for two days.", &image)
        .await;
    assert_eq!(
        appended,
        "Take rest for two days.\n[Rx]: Paracetamol 500mg twice daily"
    );

    // A failed digitization degrades to the stock line.
    t.service.set_prescription_ok(false);
    let degraded = t.core.history.append_prescription("Note so far.", &image).await;
    assert_eq!(degraded, "Note so far.\n[Rx]: Failed to digitize prescription.");
}

//! The consultation workflow end to end: preconditions, cache behavior,
//! stage sequencing, persistence handoff, and recovery after a restart.

mod helpers;

use std::time::Duration;

use helpers::{boot, boot_at, drain_events, wait_for_event, TEST_SUCCESS_DISPLAY};
use sehat::analysis::WorkflowStage;
use sehat::db::models::Sender;
use sehat::events::CoreEvent;
use sehat::session::{ANALYSIS_RESULT_KEY, CURRENT_RECORD_KEY, DIAGRAM_KEY, PATIENT_DATA_KEY};

async fn wait_out_reveal() {
    tokio::time::sleep(TEST_SUCCESS_DISPLAY + Duration::from_millis(40)).await;
}

#[tokio::test]
async fn offline_submission_is_refused_outright() {
    let t = boot().await;
    t.connectivity.set_online(false);
    let mut rx = t.core.subscribe();

    t.core
        .orchestrator
        .update_draft(|d| d.symptoms = "fever since yesterday".to_string())
        .await;

    assert!(t.core.orchestrator.analyze().await.is_err());
    assert_eq!(t.core.orchestrator.stage().await, WorkflowStage::Input);
    assert_eq!(t.service.analyze_count(), 0);

    let event = wait_for_event(&mut rx, |e| matches!(e, CoreEvent::AnalysisFailed { .. })).await;
    let CoreEvent::AnalysisFailed { message } = event else {
        unreachable!()
    };
    assert_eq!(message, "You are offline. Connect to the internet to analyze.");

    // Nothing was recorded; only the two demonstration seeds exist.
    assert_eq!(t.core.history.list().await.unwrap().len(), 2);
}

#[tokio::test]
async fn an_empty_submission_never_leaves_the_form() {
    let t = boot().await;

    assert!(t.core.orchestrator.analyze().await.is_err());
    assert_eq!(t.core.orchestrator.stage().await, WorkflowStage::Input);
    assert_eq!(t.service.analyze_count(), 0);
}

#[tokio::test]
async fn a_successful_analysis_walks_all_the_stages() {
    let t = boot().await;
    t.service.set_diagram(Some("data:image/png;base64,AAAA"));
    let mut rx = t.core.subscribe();

    t.core
        .orchestrator
        .update_draft(|d| {
            d.symptoms = "itchy red patch on the forearm".to_string();
            d.set_pain_level(3);
            d.toggle_tag("Rash");
        })
        .await;

    let record = t.core.orchestrator.analyze().await.unwrap();
    assert_eq!(t.core.orchestrator.stage().await, WorkflowStage::Success);
    assert!(record.id.parse::<i64>().is_ok());
    assert!(record.share_code.is_some());
    assert_eq!(record.patient_data.pain_level, 3);

    wait_for_event(
        &mut rx,
        |e| matches!(e, CoreEvent::AnalysisCompleted { record_id } if *record_id == record.id),
    )
    .await;

    // History holds the record alongside the seeds, newest first.
    let history = t.core.history.list().await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].id, record.id);

    // The results handoff landed in the session store.
    assert!(t.core.session.get(PATIENT_DATA_KEY).is_some());
    assert!(t.core.session.get(ANALYSIS_RESULT_KEY).is_some());
    assert!(t.core.session.get(CURRENT_RECORD_KEY).is_some());

    // The chat opens with the explanation as the first assistant turn.
    let messages = t.core.chat.messages().await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].sender, Sender::Ai);
    assert_eq!(
        messages[0].text,
        record.analysis_result.overall_explanation
    );

    // Narration fired with the interface language's speech code.
    let spoken = t.narrator.utterances();
    assert_eq!(spoken.len(), 1);
    assert_eq!(spoken[0].1, "en-US");

    // The diagram fetch runs off the critical path and lands in session.
    wait_for_event(&mut rx, |e| matches!(e, CoreEvent::DiagramReady)).await;
    assert_eq!(t.core.orchestrator.diagram().as_deref(), Some("data:image/png;base64,AAAA"));
    assert_eq!(t.service.diagram_count(), 1);

    // After the fixed success beat the report reveals itself.
    wait_out_reveal().await;
    assert_eq!(t.core.orchestrator.stage().await, WorkflowStage::Results);
}

#[tokio::test]
async fn a_failed_analysis_returns_to_the_form_without_retrying() {
    let t = boot().await;
    t.service.set_analyze_ok(false);
    let mut rx = t.core.subscribe();

    t.core
        .orchestrator
        .update_draft(|d| d.symptoms = "persistent cough".to_string())
        .await;

    assert!(t.core.orchestrator.analyze().await.is_err());
    assert_eq!(t.service.analyze_count(), 1);
    assert_eq!(t.core.orchestrator.stage().await, WorkflowStage::Input);

    let event = wait_for_event(&mut rx, |e| matches!(e, CoreEvent::AnalysisFailed { .. })).await;
    let CoreEvent::AnalysisFailed { message } = event else {
        unreachable!()
    };
    assert_eq!(message, "Analysis failed. Try again.");

    // The form keeps its text; only the stored draft copy is gone.
    assert_eq!(t.core.orchestrator.draft().await.symptoms, "persistent cough");
    assert_eq!(t.core.history.list().await.unwrap().len(), 2);
}

#[tokio::test]
async fn a_repeat_submission_is_served_from_cache() {
    let t = boot().await;

    t.core
        .orchestrator
        .update_draft(|d| d.symptoms = "rash on the left arm".to_string())
        .await;
    t.core.orchestrator.analyze().await.unwrap();
    assert_eq!(t.service.analyze_count(), 1);

    wait_out_reveal().await;
    t.core.orchestrator.start_over().await.unwrap();

    t.core
        .orchestrator
        .update_draft(|d| d.symptoms = "rash on the left arm".to_string())
        .await;
    let record = t.core.orchestrator.analyze().await.unwrap();

    // Same language, narrative and media list: the gateway is not asked twice.
    assert_eq!(t.service.analyze_count(), 1);
    assert_eq!(t.core.orchestrator.stage().await, WorkflowStage::Success);

    // The cached answer still produces a fresh record.
    let history = t.core.history.list().await.unwrap();
    assert_eq!(history.len(), 4);
    assert_eq!(history[0].id, record.id);
}

#[tokio::test]
async fn starting_over_is_only_allowed_from_results() {
    let t = boot().await;

    t.core
        .orchestrator
        .update_draft(|d| d.symptoms = "swollen ankle".to_string())
        .await;
    t.core.orchestrator.analyze().await.unwrap();

    // Success is not far enough back.
    assert_eq!(t.core.orchestrator.stage().await, WorkflowStage::Success);
    assert!(t.core.orchestrator.start_over().await.is_err());

    wait_out_reveal().await;
    assert_eq!(t.core.orchestrator.stage().await, WorkflowStage::Results);
    t.core.orchestrator.start_over().await.unwrap();

    assert_eq!(t.core.orchestrator.stage().await, WorkflowStage::Input);
    assert!(t.core.orchestrator.draft().await.symptoms.is_empty());
    assert!(t.core.orchestrator.current_record().await.is_none());
    assert!(t.core.chat.messages().await.is_empty());
    assert!(t.core.session.get(PATIENT_DATA_KEY).is_none());
    assert!(t.core.session.get(ANALYSIS_RESULT_KEY).is_none());
    assert!(t.core.session.get(CURRENT_RECORD_KEY).is_none());
    assert!(t.core.session.get(DIAGRAM_KEY).is_none());
}

#[tokio::test]
async fn reopening_a_past_record_skips_analysis_and_the_success_beat() {
    let t = boot().await;

    let seeds = t.core.history.list().await.unwrap();
    let seed = seeds.last().unwrap().clone();

    t.core.orchestrator.load_record(seed.clone()).await;

    assert_eq!(t.core.orchestrator.stage().await, WorkflowStage::Results);
    assert_eq!(
        t.core.orchestrator.current_record().await.unwrap().id,
        seed.id
    );
    assert_eq!(t.service.analyze_count(), 0);

    // The chat restarts seeded from the reopened record.
    let messages = t.core.chat.messages().await;
    assert_eq!(messages.len(), 1);
    assert_eq!(
        messages[0].text,
        seed.analysis_result.overall_explanation
    );
}

#[tokio::test]
async fn draft_edits_debounce_into_a_single_save() {
    let t = boot().await;
    let mut rx = t.core.subscribe();

    t.core
        .orchestrator
        .update_draft(|d| d.symptoms = "h".to_string())
        .await;
    t.core
        .orchestrator
        .update_draft(|d| d.symptoms = "he".to_string())
        .await;
    t.core
        .orchestrator
        .update_draft(|d| d.symptoms = "headache".to_string())
        .await;

    wait_for_event(&mut rx, |e| matches!(e, CoreEvent::DraftSaved { .. })).await;
    tokio::time::sleep(Duration::from_millis(60)).await;

    let saves = drain_events(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, CoreEvent::DraftSaved { .. }))
        .count();
    assert_eq!(saves, 0, "only the final edit should have been written");

    let stored = t.core.db.load_draft().await.unwrap().unwrap();
    assert_eq!(stored.symptoms, "headache");
}

#[tokio::test]
async fn drafts_only_autosave_while_the_form_is_on_screen() {
    let t = boot().await;

    t.core
        .orchestrator
        .update_draft(|d| d.symptoms = "blurry vision".to_string())
        .await;
    t.core.orchestrator.analyze().await.unwrap();
    wait_out_reveal().await;

    // Results stage: edits no longer schedule writes.
    let mut rx = t.core.subscribe();
    t.core
        .orchestrator
        .update_draft(|d| d.symptoms = "something else".to_string())
        .await;
    tokio::time::sleep(Duration::from_millis(80)).await;

    let saves = drain_events(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, CoreEvent::DraftSaved { .. }))
        .count();
    assert_eq!(saves, 0);
    assert!(t.core.db.load_draft().await.unwrap().is_none());
}

#[tokio::test]
async fn a_reload_restores_the_results_view() {
    let t = boot().await;

    t.core
        .orchestrator
        .update_draft(|d| d.symptoms = "sore throat".to_string())
        .await;
    let record = t.core.orchestrator.analyze().await.unwrap();
    wait_out_reveal().await;

    // Same session store, fresh core: the shape of a page reload.
    let session = t.core.session.clone();
    let t2 = boot_at(t.dir, Some(session)).await;

    assert_eq!(t2.core.orchestrator.stage().await, WorkflowStage::Results);
    assert_eq!(
        t2.core.orchestrator.current_record().await.unwrap().id,
        record.id
    );
    assert_eq!(t2.core.chat.messages().await.len(), 1);
}

#[tokio::test]
async fn a_restart_restores_the_saved_draft() {
    let t = boot().await;

    t.core
        .orchestrator
        .update_draft(|d| {
            d.symptoms = "ringing in the ears".to_string();
            d.toggle_tag("Dizziness");
        })
        .await;
    tokio::time::sleep(Duration::from_millis(80)).await;

    let dir = t.dir;
    drop(t.core);
    let t2 = boot_at(dir, None).await;

    let draft = t2.core.orchestrator.draft().await;
    assert_eq!(draft.symptoms, "ringing in the ears");
    assert_eq!(draft.other_symptoms, vec!["Dizziness".to_string()]);
    assert_eq!(t2.core.orchestrator.stage().await, WorkflowStage::Input);
}

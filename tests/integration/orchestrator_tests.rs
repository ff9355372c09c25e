/*!
 * Orchestrator tests: completeness, ordering, worker bound, checkpoints,
 * cancellation, resume and fatal errors
 */

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lingobatch::app_config::JobConfig;
use lingobatch::document::{DocumentAdapter, Spreadsheet};
use lingobatch::errors::TranslationError;
use lingobatch::translation::{
    JobOrchestrator, JobOutcome, JobRequest, JobState, ProgressReporter, ProgressUpdate, TranslationClient,
    TranslationJob,
};

use crate::common::scripted_client::{Script, ScriptedClient};
use crate::common::{create_temp_dir, fast_job_config, sample_sheet};

fn orchestrator(client: &Arc<ScriptedClient>, config: JobConfig) -> JobOrchestrator {
    let client: Arc<dyn TranslationClient> = client.clone();
    JobOrchestrator::new(client, config).unwrap()
}

fn plan(document: Spreadsheet, targets: &[&str], config: &JobConfig) -> Arc<TranslationJob<Spreadsheet>> {
    let request = JobRequest::new("en", targets.iter().map(|t| t.to_string()).collect());
    Arc::new(TranslationJob::plan(document, &request, config).unwrap())
}

fn reporter() -> Arc<ProgressReporter> {
    Arc::new(ProgressReporter::new(10))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_run_withThreeLanguages_shouldFillEveryCellInOrder() {
    let dir = create_temp_dir().unwrap();
    let output = dir.path().join("out.csv");
    let client = Arc::new(ScriptedClient::echo().with_delay(Duration::from_millis(5)));
    let config = JobConfig { max_workers: 3, ..fast_job_config() };

    let job = plan(sample_sheet(25), &["fr", "de", "es"], &config);
    let summary = orchestrator(&client, config).run(&job, &output, &reporter()).await.unwrap();

    assert_eq!(summary.outcome, JobOutcome::Completed);
    assert_eq!(summary.total, 75);
    assert_eq!(summary.completed, 75);
    assert_eq!(summary.failed, 0);

    let saved = Spreadsheet::from_path(&output).unwrap();
    assert_eq!(saved.headers(), &["English", "fr", "de", "es"]);
    for row in 0..25 {
        for (column, language) in ["fr", "de", "es"].iter().enumerate() {
            let expected = format!("{}:row {}", language, row);
            assert_eq!(saved.read_cell(row, column + 1), Some(expected.as_str()));
        }
    }
}

#[tokio::test]
async fn test_run_with25RowsAndBatch10_shouldDispatchChunksSequentially() {
    let dir = create_temp_dir().unwrap();
    let output = dir.path().join("out.csv");
    let client = Arc::new(ScriptedClient::echo().with_delay(Duration::from_millis(10)));
    let config = fast_job_config();

    let job = plan(sample_sheet(25), &["fr"], &config);
    assert_eq!(job.chunk_count(), 3);
    orchestrator(&client, config).run(&job, &output, &reporter()).await.unwrap();

    let records = client.records();
    let sizes: Vec<usize> = records.iter().map(|r| r.texts.len()).collect();
    assert_eq!(sizes, vec![10, 10, 5]);
    assert_eq!(records[1].texts[0], "row 10");
    for pair in records.windows(2) {
        let previous_end = pair[0].finished.unwrap();
        assert!(pair[1].started >= previous_end, "next chunk started before the previous one resolved");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_run_shouldNeverExceedMaxWorkers() {
    let dir = create_temp_dir().unwrap();
    let output = dir.path().join("out.csv");
    let client = Arc::new(ScriptedClient::echo().with_delay(Duration::from_millis(30)));
    let config = JobConfig { max_workers: 2, ..fast_job_config() };

    let job = plan(sample_sheet(5), &["fr", "de", "es", "it", "pt", "nl"], &config);
    let summary = orchestrator(&client, config).run(&job, &output, &reporter()).await.unwrap();

    assert_eq!(summary.completed, 30);
    assert_eq!(client.call_count(), 6);
    assert!(client.max_in_flight() <= 2);
}

#[tokio::test]
async fn test_run_afterCompletion_shouldResumeWithoutCalls() {
    let dir = create_temp_dir().unwrap();
    let output = dir.path().join("out.csv");
    let config = fast_job_config();

    let first = Arc::new(ScriptedClient::echo());
    let job = plan(sample_sheet(25), &["fr"], &config);
    orchestrator(&first, config.clone()).run(&job, &output, &reporter()).await.unwrap();
    assert_eq!(first.call_count(), 3);

    let second = Arc::new(ScriptedClient::echo());
    let resumed = plan(Spreadsheet::from_path(&output).unwrap(), &["fr"], &config);
    assert_eq!(resumed.total(), 0);
    assert_eq!(resumed.already_translated(), 25);

    let summary = orchestrator(&second, config).run(&resumed, &output, &reporter()).await.unwrap();
    assert_eq!(summary.outcome, JobOutcome::Completed);
    assert_eq!(second.call_count(), 0);
    assert_eq!(std::fs::read_to_string(&output).unwrap().matches("fr:row").count(), 25);
}

#[tokio::test]
async fn test_run_withSaveInterval10_shouldCheckpointBeforeLaterChunks() {
    let dir = create_temp_dir().unwrap();
    let output = dir.path().join("out.csv");
    let client = Arc::new(ScriptedClient::echo());
    client.watch_file(output.clone());
    let config = JobConfig { save_interval: 10, ..fast_job_config() };

    let job = plan(sample_sheet(30), &["fr"], &config);
    orchestrator(&client, config).run(&job, &output, &reporter()).await.unwrap();

    let snapshots: Vec<usize> = client
        .records()
        .iter()
        .map(|r| r.file_snapshot.as_deref().map_or(0, |s| s.matches("fr:row").count()))
        .collect();
    assert_eq!(snapshots, vec![0, 10, 20]);
}

#[tokio::test]
async fn test_run_whenCancelled_shouldStopAtChunkBoundaryAndResume() {
    let dir = create_temp_dir().unwrap();
    let output = dir.path().join("out.csv");
    let config = JobConfig { max_workers: 1, ..fast_job_config() };

    let client = Arc::new(ScriptedClient::echo());
    let job = plan(sample_sheet(50), &["fr"], &config);
    client.cancel_after(2, job.cancellation_token());

    let summary = orchestrator(&client, config.clone()).run(&job, &output, &reporter()).await.unwrap();
    assert_eq!(summary.outcome, JobOutcome::Cancelled);
    assert_eq!(summary.completed, 20);
    assert_eq!(client.call_count(), 2);
    assert_eq!(job.state(), JobState::Cancelled);

    let resumed_client = Arc::new(ScriptedClient::echo());
    let resumed = plan(Spreadsheet::from_path(&output).unwrap(), &["fr"], &config);
    assert_eq!(resumed.total(), 30);
    assert_eq!(resumed.already_translated(), 20);

    let summary = orchestrator(&resumed_client, config).run(&resumed, &output, &reporter()).await.unwrap();
    assert_eq!(summary.outcome, JobOutcome::Completed);
    assert_eq!(resumed_client.call_count(), 3);
    assert_eq!(resumed_client.records()[0].texts[0], "row 20");
}

#[tokio::test]
async fn test_run_whenCancelledMidChunk_shouldLeaveQueuedLanguageEmpty() {
    let dir = create_temp_dir().unwrap();
    let output = dir.path().join("out.csv");
    let config = JobConfig { max_workers: 1, ..fast_job_config() };

    let client = Arc::new(ScriptedClient::echo());
    let job = plan(sample_sheet(5), &["fr", "de"], &config);
    client.cancel_after(1, job.cancellation_token());

    let summary = orchestrator(&client, config.clone()).run(&job, &output, &reporter()).await.unwrap();
    assert_eq!(summary.outcome, JobOutcome::Cancelled);
    assert_eq!(summary.completed, 5);
    assert_eq!(client.call_count(), 1);

    let content = std::fs::read_to_string(&output).unwrap();
    assert!(!content.contains("[cancelled]"));
    let saved = Spreadsheet::from_path(&output).unwrap();
    for row in 0..5 {
        let french = format!("fr:row {}", row);
        assert_eq!(saved.read_cell(row, 1), Some(french.as_str()));
        assert_eq!(saved.read_cell(row, 2), Some(""));
    }

    // The queued language is picked up again on resume
    let resumed = plan(saved, &["fr", "de"], &config);
    assert_eq!(resumed.total(), 5);
    assert_eq!(resumed.already_translated(), 5);
    assert_eq!(resumed.groups()[1].tasks.len(), 5);
}

#[tokio::test]
async fn test_run_whenCancelGraceElapses_shouldAbortInFlightUnits() {
    let dir = create_temp_dir().unwrap();
    let output = dir.path().join("out.csv");
    let client = Arc::new(ScriptedClient::echo().with_delay(Duration::from_secs(5)));
    let config = JobConfig { cancel_grace_secs: 0, ..fast_job_config() };

    let job = plan(sample_sheet(10), &["fr"], &config);
    let token = job.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
    });

    let started = Instant::now();
    let summary = orchestrator(&client, config).run(&job, &output, &reporter()).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(summary.outcome, JobOutcome::Cancelled);
    assert_eq!(summary.completed, 0);
    assert!(output.exists());
}

#[tokio::test]
async fn test_run_withUnauthorized_shouldAbortAfterOneCall() {
    let dir = create_temp_dir().unwrap();
    let output = dir.path().join("out.csv");
    let client = Arc::new(ScriptedClient::new(Script::Unauthorized));
    let config = fast_job_config();

    let job = plan(sample_sheet(30), &["fr"], &config);
    let result = orchestrator(&client, config).run(&job, &output, &reporter()).await;

    assert!(matches!(result, Err(TranslationError::Auth(_))));
    assert_eq!(client.call_count(), 1);
    assert_eq!(job.state(), JobState::Failed);
}

#[tokio::test]
async fn test_run_withInsufficientBalance_shouldAbortAsQuota() {
    let dir = create_temp_dir().unwrap();
    let output = dir.path().join("out.csv");
    let client = Arc::new(ScriptedClient::new(Script::InsufficientBalance));
    let config = fast_job_config();

    let job = plan(sample_sheet(30), &["fr"], &config);
    let result = orchestrator(&client, config).run(&job, &output, &reporter()).await;

    assert!(matches!(result, Err(TranslationError::Quota(_))));
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn test_run_withTwoTransientFailures_shouldWriteRealTranslations() {
    let dir = create_temp_dir().unwrap();
    let output = dir.path().join("out.csv");
    let client = Arc::new(ScriptedClient::new(Script::FailFirst(2)));
    let config = fast_job_config();

    let job = plan(sample_sheet(3), &["fr"], &config);
    let summary = orchestrator(&client, config).run(&job, &output, &reporter()).await.unwrap();

    assert_eq!(client.call_count(), 3);
    assert_eq!(summary.failed, 0);
    let saved = Spreadsheet::from_path(&output).unwrap();
    assert_eq!(saved.read_cell(2, 1), Some("fr:row 2"));
}

#[tokio::test]
async fn test_run_withRetriesExhausted_shouldWriteMarkers() {
    let dir = create_temp_dir().unwrap();
    let output = dir.path().join("out.csv");
    let client = Arc::new(ScriptedClient::new(Script::FailFirst(usize::MAX)));
    let config = JobConfig { max_retries: 1, ..fast_job_config() };

    let job = plan(sample_sheet(3), &["fr"], &config);
    let summary = orchestrator(&client, config).run(&job, &output, &reporter()).await.unwrap();

    assert_eq!(summary.outcome, JobOutcome::Completed);
    assert_eq!(client.call_count(), 2);
    assert_eq!(summary.failed, 3);
    let saved = Spreadsheet::from_path(&output).unwrap();
    assert_eq!(saved.read_cell(0, 1), Some("[translation-error]"));
}

#[tokio::test]
async fn test_run_shouldReportProgressAtIntervals() {
    let dir = create_temp_dir().unwrap();
    let output = dir.path().join("out.csv");
    let client = Arc::new(ScriptedClient::echo());
    let config = fast_job_config();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let reporter = Arc::new(ProgressReporter::with_callback(
        10,
        Arc::new(move |update: ProgressUpdate| sink.lock().push(update)),
    ));

    let job = plan(sample_sheet(25), &["fr"], &config);
    orchestrator(&client, config).run(&job, &output, &reporter).await.unwrap();

    let updates = seen.lock().clone();
    let currents: Vec<usize> = updates.iter().map(|u| u.current).collect();
    assert_eq!(currents, vec![10, 20, 25]);
    assert!(updates.last().unwrap().finished);
    assert!(updates.iter().all(|u| u.total == 25));
}

#[test]
fn test_plan_withRetranslateMarkers_shouldTreatMarkersAsPending() {
    let sheet = || {
        Spreadsheet::new(
            vec!["English".to_string(), "fr".to_string()],
            vec![
                vec!["Hello".to_string(), "[translation-error]".to_string()],
                vec!["Bye".to_string(), "Au revoir".to_string()],
            ],
        )
    };

    let keep = plan(sheet(), &["fr"], &fast_job_config());
    assert_eq!(keep.total(), 0);

    let config = JobConfig { retranslate_markers: true, ..fast_job_config() };
    let retry = plan(sheet(), &["fr"], &config);
    assert_eq!(retry.total(), 1);
    assert_eq!(retry.groups()[0].tasks[0].source_text, "Hello");
    assert_eq!(retry.sink().lock().read_cell(1, 1), Some("Au revoir"));
}

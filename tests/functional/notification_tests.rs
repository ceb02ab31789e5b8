//! Report delivery after successful jobs

use crate::common::{coordinator_with, fast_options, sample_data, FailingTransport, RecordingTransport};
use reconcyl::notify::Transport;
use reconcyl::{
    JobState, JobStore, MemoryJobStore, NotificationConfig, NotificationDispatcher, Pipeline,
    ReconError, ReportFormat,
};
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(10);

fn dispatcher(transport: Arc<dyn Transport>) -> Arc<NotificationDispatcher> {
    Arc::new(NotificationDispatcher::new(NotificationConfig::default(), transport).unwrap())
}

#[test]
fn test_successful_job_sends_report() {
    let transport = Arc::new(RecordingTransport::default());
    let jobs = coordinator_with(
        Arc::new(MemoryJobStore::new()),
        Arc::new(Pipeline::with_defaults().unwrap()),
        Some(dispatcher(transport.clone())),
        fast_options(1),
    );

    let id = jobs
        .submit(
            sample_data::SOURCE,
            sample_data::TARGET,
            ReportFormat::Delimited,
            Some("ops@example.com".to_string()),
        )
        .unwrap();
    assert_eq!(jobs.wait(&id, WAIT).unwrap().state(), JobState::Succeeded);

    // Shutdown waits for deliveries in flight
    drop(jobs);

    let messages = transport.messages();
    assert_eq!(messages.len(), 1);
    let message = &messages[0];
    assert_eq!(message.to, "ops@example.com");
    assert_eq!(message.from, "reconciliation@reconcyl.ng");
    assert_eq!(message.subject, "Reconciliation Report Completed");
    assert_eq!(message.attachment.filename, "reconciliation_report.csv");
    assert_eq!(message.attachment.mime_type, "text/csv");
    assert!(message.html_body.contains("Missing in Target"));
    assert!(message.html_body.contains("Dayo"));
}

#[test]
fn test_no_message_without_recipient() {
    let transport = Arc::new(RecordingTransport::default());
    let jobs = coordinator_with(
        Arc::new(MemoryJobStore::new()),
        Arc::new(Pipeline::with_defaults().unwrap()),
        Some(dispatcher(transport.clone())),
        fast_options(1),
    );

    let id = jobs.submit("id\n1\n", "id\n1\n", ReportFormat::Structured, None).unwrap();
    jobs.wait(&id, WAIT).unwrap();
    drop(jobs);

    assert!(transport.messages().is_empty());
}

#[test]
fn test_no_message_for_failed_job() {
    let transport = Arc::new(RecordingTransport::default());
    let jobs = coordinator_with(
        Arc::new(MemoryJobStore::new()),
        Arc::new(Pipeline::with_defaults().unwrap()),
        Some(dispatcher(transport.clone())),
        fast_options(1),
    );

    let id = jobs
        .submit("", "id\n1\n", ReportFormat::Structured, Some("ops@example.com".to_string()))
        .unwrap();
    assert_eq!(jobs.wait(&id, WAIT).unwrap().state(), JobState::Failed);
    drop(jobs);

    assert!(transport.messages().is_empty());
}

#[test]
fn test_delivery_failure_does_not_change_job_state() {
    let store = Arc::new(MemoryJobStore::new());
    let jobs = coordinator_with(
        store.clone(),
        Arc::new(Pipeline::with_defaults().unwrap()),
        Some(dispatcher(Arc::new(FailingTransport))),
        fast_options(1),
    );

    let id = jobs
        .submit("id\n1\n", "id\n1\n", ReportFormat::Markup, Some("ops@example.com".to_string()))
        .unwrap();
    assert_eq!(jobs.wait(&id, WAIT).unwrap().state(), JobState::Succeeded);
    drop(jobs);

    let record = store.get(&id).unwrap().unwrap();
    assert_eq!(record.state, JobState::Succeeded);
    assert!(record.failure.is_none());
}

#[test]
fn test_dispatch_reports_transport_errors() {
    let notifier = dispatcher(Arc::new(FailingTransport));
    let pipeline = Pipeline::with_defaults().unwrap();
    let result = pipeline.reconcile("id\n1\n", "id\n2\n").unwrap();
    let report = pipeline.renderer().render(&result, ReportFormat::Structured).unwrap();

    let err = notifier.dispatch("ops@example.com", &result, &report).unwrap_err();
    assert!(matches!(err, ReconError::Notification { .. }));
    assert!(err.to_string().contains("mail relay refused"));
}

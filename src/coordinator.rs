//! Asynchronous job execution and polling

use crate::engine::ReconciliationResult;
use crate::error::{ReconError, Result};
use crate::job::{JobFailure, JobId, JobRecord, JobState, JobStatus};
use crate::notify::{validate_recipient, NotificationDispatcher};
use crate::pipeline::JobRunner;
use crate::report::{RenderedReport, ReportFormat};
use crate::store::JobStore;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Worker pool settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobOptions {
    /// Number of worker threads consuming the queue
    pub workers: usize,
    /// Fail jobs that run longer than this
    pub timeout_ms: Option<u64>,
    /// Sleep between polls in [`JobCoordinator::wait`]
    pub poll_interval_ms: u64,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            workers: 2,
            timeout_ms: None,
            poll_interval_ms: 50,
        }
    }
}

impl JobOptions {
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(ReconError::config("jobs.workers must be greater than 0"));
        }
        if self.timeout_ms == Some(0) {
            return Err(ReconError::config("jobs.timeout_ms must be greater than 0"));
        }
        if self.poll_interval_ms == 0 {
            return Err(ReconError::config("jobs.poll_interval_ms must be greater than 0"));
        }
        Ok(())
    }
}

/// A reconciliation request as received from a client
#[derive(Debug, Clone, Default)]
pub struct SubmitRequest {
    pub source: String,
    pub target: String,
    /// `json`, `csv` or `html`, any case; defaults to `json`
    pub format: Option<String>,
    pub notify: Option<String>,
}

/// Queue entry handed to a worker
struct Task {
    id: JobId,
    source: String,
    target: String,
}

/// State shared by the coordinator and its workers
struct Shared {
    store: Arc<dyn JobStore>,
    runner: Arc<dyn JobRunner>,
    notifier: Option<Arc<NotificationDispatcher>>,
    timeout: Option<Duration>,
    /// Deliveries still in flight, joined on shutdown
    deliveries: Mutex<Vec<JoinHandle<()>>>,
}

/// Runs reconciliations in the background and answers status queries
pub struct JobCoordinator {
    shared: Arc<Shared>,
    options: JobOptions,
    sender: Option<Sender<Task>>,
    receiver: Arc<Mutex<Receiver<Task>>>,
    workers: Vec<JoinHandle<()>>,
}

impl JobCoordinator {
    /// Create a coordinator and start its workers
    pub fn new(
        store: Arc<dyn JobStore>,
        runner: Arc<dyn JobRunner>,
        notifier: Option<Arc<NotificationDispatcher>>,
        options: JobOptions,
    ) -> Result<Self> {
        let mut coordinator = Self::idle(store, runner, notifier, options);
        coordinator.start()?;
        Ok(coordinator)
    }

    /// Create a coordinator without workers. Submitted jobs stay `Pending`
    /// until [`start`](Self::start) is called.
    pub fn idle(
        store: Arc<dyn JobStore>,
        runner: Arc<dyn JobRunner>,
        notifier: Option<Arc<NotificationDispatcher>>,
        options: JobOptions,
    ) -> Self {
        let (sender, receiver) = mpsc::channel();
        let shared = Shared {
            store,
            runner,
            notifier,
            timeout: options.timeout_ms.map(Duration::from_millis),
            deliveries: Mutex::new(Vec::new()),
        };

        Self {
            shared: Arc::new(shared),
            options,
            sender: Some(sender),
            receiver: Arc::new(Mutex::new(receiver)),
            workers: Vec::new(),
        }
    }

    /// Spawn the worker threads. Does nothing if they are already running.
    pub fn start(&mut self) -> Result<()> {
        if !self.workers.is_empty() {
            return Ok(());
        }
        self.options.validate()?;

        for index in 0..self.options.workers {
            let shared = Arc::clone(&self.shared);
            let receiver = Arc::clone(&self.receiver);
            let handle = thread::Builder::new()
                .name(format!("reconcyl-worker-{}", index))
                .spawn(move || worker_loop(shared, receiver))?;
            self.workers.push(handle);
        }

        log::debug!("Started {} job workers", self.workers.len());
        Ok(())
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.shared.store
    }

    /// Enqueue a reconciliation and return its id immediately
    pub fn submit(
        &self,
        source: impl Into<String>,
        target: impl Into<String>,
        format: ReportFormat,
        notify: Option<String>,
    ) -> Result<JobId> {
        if let Some(recipient) = &notify {
            validate_recipient(recipient)?;
        }

        let record = JobRecord::new(format, notify);
        let id = record.id;
        self.shared.store.insert(record)?;

        let task = Task {
            id,
            source: source.into(),
            target: target.into(),
        };
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| ReconError::internal("job queue is closed"))?;
        sender
            .send(task)
            .map_err(|_| ReconError::internal("job queue is closed"))?;

        log::info!("Submitted job {} ({} report)", id, format);
        Ok(id)
    }

    /// Submit a client request; an unknown format is rejected before any job exists
    pub fn submit_request(&self, request: SubmitRequest) -> Result<JobId> {
        let format = request
            .format
            .as_deref()
            .map(ReportFormat::parse)
            .transpose()?
            .unwrap_or_default();
        self.submit(request.source, request.target, format, request.notify)
    }

    pub fn record(&self, id: &JobId) -> Result<JobRecord> {
        self.shared
            .store
            .get(id)?
            .ok_or_else(|| ReconError::not_found(id))
    }

    pub fn get_status(&self, id: &JobId) -> Result<JobStatus> {
        Ok(self.record(id)?.status())
    }

    /// Render the stored result of a succeeded job in `format`
    pub fn fetch_report(&self, id: &JobId, format: ReportFormat) -> Result<RenderedReport> {
        match self.get_status(id)? {
            JobStatus::Succeeded { result } => self.shared.runner.render(&result, format),
            other => Err(ReconError::NotReady {
                id: id.to_string(),
                state: other.state().to_string(),
            }),
        }
    }

    /// Remove a job that has not started yet. Returns false once it is running or done.
    pub fn cancel(&self, id: &JobId) -> Result<bool> {
        self.record(id)?;
        let removed = self.shared.store.remove_if(id, JobState::Pending)?;
        if removed {
            log::info!("Cancelled job {}", id);
        }
        Ok(removed)
    }

    /// Poll until the job is terminal or `timeout` elapses; returns the last status seen
    pub fn wait(&self, id: &JobId, timeout: Duration) -> Result<JobStatus> {
        let deadline = Instant::now() + timeout;
        let interval = Duration::from_millis(self.options.poll_interval_ms.max(1));
        loop {
            let status = self.get_status(id)?;
            if status.is_terminal() || Instant::now() >= deadline {
                return Ok(status);
            }
            thread::sleep(interval);
        }
    }

    pub fn list(&self) -> Result<Vec<JobRecord>> {
        self.shared.store.list()
    }
}

impl Drop for JobCoordinator {
    fn drop(&mut self) {
        // Closing the queue ends each worker's loop once it drains
        self.sender.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                log::error!("A job worker panicked during shutdown");
            }
        }

        let deliveries = match self.shared.deliveries.lock() {
            Ok(mut deliveries) => deliveries.drain(..).collect::<Vec<_>>(),
            Err(_) => Vec::new(),
        };
        for handle in deliveries {
            if handle.join().is_err() {
                log::error!("A notification thread panicked");
            }
        }
    }
}

fn worker_loop(shared: Arc<Shared>, receiver: Arc<Mutex<Receiver<Task>>>) {
    loop {
        let task = {
            let queue = match receiver.lock() {
                Ok(queue) => queue,
                Err(_) => {
                    log::error!("Job queue lock poisoned; worker exiting");
                    return;
                }
            };
            match queue.recv() {
                Ok(task) => task,
                Err(_) => return,
            }
        };
        process(&shared, task);
    }
}

fn process(shared: &Shared, task: Task) {
    let id = task.id;

    let pending = match shared.store.get(&id) {
        Ok(Some(record)) => record,
        Ok(None) => {
            log::info!("Job {} was cancelled before it started", id);
            return;
        }
        Err(e) => {
            log::error!("Cannot read job {}: {}", id, e);
            return;
        }
    };

    let running = pending.started();
    match shared.store.compare_and_swap(&id, JobState::Pending, running.clone()) {
        Ok(true) => log::info!("Job {} running", id),
        Ok(false) => {
            log::info!("Job {} is no longer pending; skipping", id);
            return;
        }
        Err(e) => {
            log::error!("Cannot start job {}: {}", id, e);
            return;
        }
    }

    match execute(shared, task, running.format) {
        Ok((result, report)) => {
            let done = running.succeeded(result.clone());
            match shared.store.compare_and_swap(&id, JobState::Running, done) {
                Ok(true) => {
                    log::info!("Job {} succeeded", id);
                    notify(shared, id, running.notify.clone(), result, report);
                }
                Ok(false) => log::warn!("Job {} changed state while running; result dropped", id),
                Err(e) => log::error!("Cannot record success of job {}: {}", id, e),
            }
        }
        Err(err) => {
            let failure = JobFailure::from(&err);
            log::log!(failure_level(&failure), "Job {} failed ({}): {}", id, failure.kind, failure.message);
            let failed = running.failed(failure);
            if let Err(e) = shared.store.compare_and_swap(&id, JobState::Running, failed) {
                log::error!("Cannot record failure of job {}: {}", id, e);
            }
        }
    }
}

/// Bad submitted data is the caller's problem; anything else is ours
fn failure_level(failure: &JobFailure) -> log::Level {
    if failure.kind.is_input_error() {
        log::Level::Warn
    } else {
        log::Level::Error
    }
}

/// Run the pipeline on its own thread so a panic or an overrun cannot take the worker down
fn execute(
    shared: &Shared,
    task: Task,
    format: ReportFormat,
) -> Result<(ReconciliationResult, RenderedReport)> {
    let (tx, rx) = mpsc::channel();
    let runner = Arc::clone(&shared.runner);
    let Task { id, source, target } = task;

    thread::Builder::new()
        .name(format!("reconcyl-job-{}", id))
        .spawn(move || {
            // The receiver is gone if the job already timed out
            let _ = tx.send(runner.run(&source, &target, format));
        })?;

    let panicked = || ReconError::internal("job execution panicked");
    match shared.timeout {
        Some(limit) => match rx.recv_timeout(limit) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => Err(ReconError::Timeout {
                limit_ms: limit.as_millis() as u64,
            }),
            Err(RecvTimeoutError::Disconnected) => Err(panicked()),
        },
        None => rx.recv().unwrap_or_else(|_| Err(panicked())),
    }
}

/// Send the report on a separate thread; the outcome is only logged
fn notify(
    shared: &Shared,
    id: JobId,
    recipient: Option<String>,
    result: ReconciliationResult,
    report: RenderedReport,
) {
    let Some(recipient) = recipient else {
        return;
    };
    let Some(dispatcher) = shared.notifier.clone() else {
        log::warn!("Job {} asked for a notification but no dispatcher is configured", id);
        return;
    };

    let spawned = thread::Builder::new()
        .name(format!("reconcyl-notify-{}", id))
        .spawn(move || match dispatcher.dispatch(&recipient, &result, &report) {
            Ok(()) => log::info!("Sent report for job {} to {}", id, recipient),
            Err(e) => log::warn!("Could not send report for job {} to {}: {}", id, recipient, e),
        });

    match spawned {
        Ok(handle) => {
            if let Ok(mut deliveries) = shared.deliveries.lock() {
                deliveries.retain(|h| !h.is_finished());
                deliveries.push(handle);
            }
        }
        Err(e) => log::warn!("Could not start notification for job {}: {}", id, e),
    }
}

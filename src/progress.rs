//! Progress reporting while waiting on a job

use crate::job::{JobId, JobState};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};

/// Spinner tracking one job's state
#[derive(Debug)]
pub struct JobProgress {
    spinner: Option<ProgressBar>,
    label: String,
    start_time: Instant,
}

impl JobProgress {
    /// Create a spinner for `id`
    pub fn new(id: &JobId) -> Self {
        let label = format!("Job {}", id);
        let spinner = create_spinner(&format!("{}: {}", label, JobState::Pending));
        Self {
            spinner: Some(spinner),
            label,
            start_time: Instant::now(),
        }
    }

    /// Spinner when output goes to a terminal, silent otherwise
    pub fn for_terminal(id: &JobId, is_terminal: bool) -> Self {
        if is_terminal {
            Self::new(id)
        } else {
            Self::new_minimal()
        }
    }

    /// Create a silent reporter (no spinner)
    pub fn new_minimal() -> Self {
        Self {
            spinner: None,
            label: String::new(),
            start_time: Instant::now(),
        }
    }

    pub fn update_state(&self, state: JobState) {
        if let Some(pb) = &self.spinner {
            pb.set_message(format!("{}: {}", self.label, state));
        }
    }

    /// Stop the spinner, leaving `message` on screen
    pub fn finish(&mut self, message: &str) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_with_message(message.to_string());
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl Drop for JobProgress {
    fn drop(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }
}

/// Create a spinner progress bar
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.green} [{elapsed}] {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

//! Command implementations for reconcyl CLI

use crate::cli::{Commands, OutputFormat};
use crate::config::ReconcylConfig;
use crate::coordinator::{JobCoordinator, SubmitRequest};
use crate::error::{ReconError, Result};
use crate::job::JobId;
use crate::notify::{LogTransport, NotificationDispatcher};
use crate::output::{JsonFormatter, PrettyPrinter};
use crate::pipeline::Pipeline;
use crate::progress::JobProgress;
use crate::report::{RenderedReport, ReportFormat};
use crate::store::FileJobStore;
use std::fs;
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Store directory used when `--store` is not given
pub const DEFAULT_STORE_DIR: &str = ".reconcyl";

/// Execute a command
pub fn execute_command(
    command: Commands,
    store_path: Option<&Path>,
    config_path: Option<&Path>,
) -> Result<()> {
    let store_root = resolve_store_root(store_path)?;

    match command {
        Commands::Init { force } => init_command(&store_root, force),
        Commands::Run {
            source,
            target,
            format,
            output,
            common_columns,
            drop_incomplete,
        } => {
            let mut config = load_config(&store_root, config_path)?;
            if common_columns {
                config.engine.column_policy = crate::engine::ColumnPolicy::Common;
            }
            if drop_incomplete {
                config.engine.drop_incomplete = true;
            }
            run_command(&config, &source, &target, &format, output.as_deref())
        }
        Commands::Submit {
            source,
            target,
            format,
            email,
            timeout_secs,
        } => {
            let mut config = load_config(&store_root, config_path)?;
            if let Some(secs) = timeout_secs {
                config.jobs.timeout_ms = Some(secs.saturating_mul(1000));
            }
            submit_command(&store_root, &config, &source, &target, &format, email)
        }
        Commands::Status { job_id, json } => {
            let config = load_config(&store_root, config_path)?;
            status_command(&store_root, &config, &job_id, json)
        }
        Commands::Fetch {
            job_id,
            format,
            output,
        } => {
            let config = load_config(&store_root, config_path)?;
            fetch_command(&store_root, &config, &job_id, &format, output.as_deref())
        }
        Commands::List { format } => {
            let config = load_config(&store_root, config_path)?;
            list_command(&store_root, &config, &format)
        }
        Commands::Cancel { job_id } => {
            let config = load_config(&store_root, config_path)?;
            cancel_command(&store_root, &config, &job_id)
        }
    }
}

fn resolve_store_root(store_path: Option<&Path>) -> Result<PathBuf> {
    match store_path {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(std::env::current_dir()?.join(DEFAULT_STORE_DIR)),
    }
}

/// Explicit `--config` must exist; the store's own config is optional
fn load_config(store_root: &Path, config_path: Option<&Path>) -> Result<ReconcylConfig> {
    match config_path {
        Some(path) => ReconcylConfig::load(path),
        None => {
            let default_path = FileJobStore::from_root(store_root.to_path_buf()).config_path();
            ReconcylConfig::load_or_default(Some(&default_path))
        }
    }
}

/// Open a store that `init` or `submit` has already created
fn existing_store(store_root: &Path) -> Result<FileJobStore> {
    let store = FileJobStore::from_root(store_root.to_path_buf());
    if !store.jobs_dir.is_dir() {
        return Err(ReconError::config(format!(
            "No job store at {}. Run 'reconcyl init' or submit a job first.",
            store_root.display()
        )));
    }
    Ok(store)
}

fn build_pipeline(config: &ReconcylConfig) -> Result<Pipeline> {
    Pipeline::new(config.loader.clone(), config.engine.clone())
}

fn build_notifier(config: &ReconcylConfig) -> Result<Option<Arc<NotificationDispatcher>>> {
    config
        .notification
        .clone()
        .map(|settings| NotificationDispatcher::new(settings, Arc::new(LogTransport)).map(Arc::new))
        .transpose()
}

/// Coordinator over an existing store that only reads and cancels
fn reader(store_root: &Path, config: &ReconcylConfig) -> Result<JobCoordinator> {
    let store = existing_store(store_root)?;
    Ok(JobCoordinator::idle(
        Arc::new(store),
        Arc::new(build_pipeline(config)?),
        None,
        config.jobs.clone(),
    ))
}

/// Explain why a requested report will not be sent, if it will not
fn undeliverable_warning(config: &ReconcylConfig, email: Option<&str>) -> Option<String> {
    match (email, &config.notification) {
        (Some(recipient), None) => Some(format!(
            "No notification settings configured; the report will not be sent to {}. \
             Add a \"notification\" section to the configuration or run 'reconcyl init --force'.",
            recipient
        )),
        _ => None,
    }
}

fn read_input(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| ReconError::invalid_input(format!("cannot read {}: {}", path.display(), e)))
}

fn parse_job_id(job_id: &str) -> Result<JobId> {
    JobId::from_str(job_id)
}

/// Write a report to `output`, or to stdout
fn emit_report(report: &RenderedReport, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            fs::write(path, &report.content)?;
            PrettyPrinter::print_report_written(report, path);
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&report.content)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Create the job store and its default configuration
fn init_command(store_root: &Path, force: bool) -> Result<()> {
    let store = FileJobStore::open(store_root)?;
    let config_path = store.config_path();

    if ReconcylConfig::write_default(&config_path, force)? {
        println!("✅ Initialized reconcyl store at: {}", store.root.display());
        println!("📝 Wrote default configuration to: {}", config_path.display());
    } else {
        println!("✅ Reconcyl store already initialized at: {}", store.root.display());
        println!("💡 Use --force to reset {}", config_path.display());
    }
    Ok(())
}

/// Reconcile two files synchronously
fn run_command(
    config: &ReconcylConfig,
    source: &Path,
    target: &Path,
    format: &str,
    output: Option<&Path>,
) -> Result<()> {
    let format = ReportFormat::parse(format)?;
    let source_raw = read_input(source)?;
    let target_raw = read_input(target)?;

    let pipeline = build_pipeline(config)?;
    let result = pipeline.reconcile(&source_raw, &target_raw)?;
    let report = pipeline.renderer().render(&result, format)?;

    let summary = result.summary();
    log::info!(
        "Reconciled {} against {}: {} missing in target, {} missing in source, {} matched",
        source.display(),
        target.display(),
        summary.source_only,
        summary.target_only,
        summary.matched
    );

    if output.is_some() {
        PrettyPrinter::print_summary(&result);
    }
    emit_report(&report, output)
}

/// Submit a job to the store and run it with this process's workers
fn submit_command(
    store_root: &Path,
    config: &ReconcylConfig,
    source: &Path,
    target: &Path,
    format: &str,
    email: Option<String>,
) -> Result<()> {
    if let Some(message) = undeliverable_warning(config, email.as_deref()) {
        log::warn!("{}", message);
        println!("⚠️ {}", message);
    }

    let request = SubmitRequest {
        source: read_input(source)?,
        target: read_input(target)?,
        format: Some(format.to_string()),
        notify: email,
    };

    let store = FileJobStore::open(store_root)?;
    let coordinator = JobCoordinator::new(
        Arc::new(store),
        Arc::new(build_pipeline(config)?),
        build_notifier(config)?,
        config.jobs.clone(),
    )?;

    let id = coordinator.submit_request(request)?;
    println!("🚀 Submitted job {}", id);

    let mut progress = JobProgress::for_terminal(&id, std::io::stderr().is_terminal());
    let interval = Duration::from_millis(config.jobs.poll_interval_ms.max(1));
    let mut last_state = None;
    let status = loop {
        let status = coordinator.get_status(&id)?;
        if last_state != Some(status.state()) {
            progress.update_state(status.state());
            last_state = Some(status.state());
        }
        if status.is_terminal() {
            break status;
        }
        thread::sleep(interval);
    };
    progress.finish(&format!(
        "Job {} {} after {:.1}s",
        id,
        status.state(),
        progress.elapsed().as_secs_f64()
    ));

    PrettyPrinter::print_job_status(&id, &status);
    Ok(())
}

fn status_command(store_root: &Path, config: &ReconcylConfig, job_id: &str, json: bool) -> Result<()> {
    let id = parse_job_id(job_id)?;
    let coordinator = reader(store_root, config)?;
    let status = coordinator.get_status(&id)?;

    if json {
        println!("{}", JsonFormatter::format_job_status(&id, &status)?);
    } else {
        PrettyPrinter::print_job_status(&id, &status);
    }
    Ok(())
}

fn fetch_command(
    store_root: &Path,
    config: &ReconcylConfig,
    job_id: &str,
    format: &str,
    output: Option<&Path>,
) -> Result<()> {
    let id = parse_job_id(job_id)?;
    let format = ReportFormat::parse(format)?;
    let coordinator = reader(store_root, config)?;
    let report = coordinator.fetch_report(&id, format)?;
    emit_report(&report, output)
}

fn list_command(store_root: &Path, config: &ReconcylConfig, format: &str) -> Result<()> {
    let output_format = OutputFormat::parse(format).map_err(ReconError::invalid_input)?;
    let coordinator = reader(store_root, config)?;
    let records = coordinator.list()?;

    match output_format {
        OutputFormat::Pretty => PrettyPrinter::print_job_list(&records),
        OutputFormat::Json => println!("{}", JsonFormatter::format_job_list(&records)?),
    }
    Ok(())
}

fn cancel_command(store_root: &Path, config: &ReconcylConfig, job_id: &str) -> Result<()> {
    let id = parse_job_id(job_id)?;
    let coordinator = reader(store_root, config)?;

    if coordinator.cancel(&id)? {
        println!("🗑️ Cancelled job {}", id);
    } else {
        let state = coordinator.get_status(&id)?.state();
        println!("⚠️ Job {} is already {}; it cannot be cancelled", id, state);
    }
    Ok(())
}

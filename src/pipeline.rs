//! Load, reconcile and render as one unit of work

use crate::engine::{EngineOptions, ReconciliationEngine, ReconciliationResult};
use crate::error::Result;
use crate::loader::{LoaderOptions, TableLoader};
use crate::report::{RenderedReport, ReportFormat, ReportRenderer};

/// The work a job performs. Implemented by [`Pipeline`]; tests substitute their own.
pub trait JobRunner: Send + Sync {
    /// Run every stage on raw inputs, rendering in `format`
    fn run(
        &self,
        source_raw: &str,
        target_raw: &str,
        format: ReportFormat,
    ) -> Result<(ReconciliationResult, RenderedReport)>;

    /// Render a stored result again, possibly in another format
    fn render(&self, result: &ReconciliationResult, format: ReportFormat) -> Result<RenderedReport>;
}

/// Loader, engine and renderer wired together
pub struct Pipeline {
    loader: TableLoader,
    engine: ReconciliationEngine,
    renderer: ReportRenderer,
}

impl Pipeline {
    pub fn new(loader: LoaderOptions, engine: EngineOptions) -> Result<Self> {
        Ok(Self {
            loader: TableLoader::new(loader)?,
            engine: ReconciliationEngine::new(engine),
            renderer: ReportRenderer::new()?,
        })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(LoaderOptions::default(), EngineOptions::default())
    }

    /// Load both inputs and reconcile them
    pub fn reconcile(&self, source_raw: &str, target_raw: &str) -> Result<ReconciliationResult> {
        let source = self.loader.load(source_raw)?;
        let target = self.loader.load(target_raw)?;
        self.engine.reconcile(&source, &target)
    }

    pub fn renderer(&self) -> &ReportRenderer {
        &self.renderer
    }
}

impl JobRunner for Pipeline {
    fn run(
        &self,
        source_raw: &str,
        target_raw: &str,
        format: ReportFormat,
    ) -> Result<(ReconciliationResult, RenderedReport)> {
        let result = self.reconcile(source_raw, target_raw)?;
        let report = self.renderer.render(&result, format)?;
        Ok((result, report))
    }

    fn render(&self, result: &ReconciliationResult, format: ReportFormat) -> Result<RenderedReport> {
        self.renderer.render(result, format)
    }
}

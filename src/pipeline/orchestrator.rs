//! One URL in, one canonical record (or one structured error) out.
//!
//! Idle → Classifying → Extracting → Transforming → [Reconciling] → Done, with
//! `Failed(reason)` reachable from every non-terminal state. Only extraction is
//! time-bounded (extractor preparation is not); reconciliation only happens for
//! persist runs.

use crate::apis::classifier::{classify_source, parse_source_url};
use crate::apis::factory::ExtractorRegistry;
use crate::app::ports::{CatalogPort, HttpClientPort};
use crate::common::constants::DEFAULT_EXTRACTION_TIMEOUT_SECS;
use crate::common::error::{Result, ScraperError};
use crate::common::types::{CanonicalBookFields, ReconciledEntityIds, SourceVariant};
use crate::config::AppConfig;
use crate::observability::metrics;
use crate::pipeline::processing::reconcile::EntityReconciler;
use crate::pipeline::processing::transform::transform;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason")]
pub enum PipelineState {
    Idle,
    Classifying,
    Extracting,
    Transforming,
    Reconciling,
    Done,
    /// Carries the error kind tag
    Failed(String),
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed(_))
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Failed(reason) => write!(f, "Failed({reason})"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Preview never touches the catalog; persist reconciles names into identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Preview,
    Persist,
}

/// State history of one run. Transitions only move forward.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    states: Vec<PipelineState>,
}

impl Default for PipelineRun {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineRun {
    pub fn new() -> Self {
        Self {
            states: vec![PipelineState::Idle],
        }
    }

    pub fn current(&self) -> &PipelineState {
        // Never empty: starts at Idle
        &self.states[self.states.len() - 1]
    }

    pub fn history(&self) -> &[PipelineState] {
        &self.states
    }

    fn advance(&mut self, next: PipelineState) {
        if self.current().is_terminal() {
            warn!("Ignoring transition to {} after {}", next, self.current());
            return;
        }
        debug!("Pipeline state: {} -> {}", self.current(), next);
        self.states.push(next);
    }

    fn fail(&mut self, error: &ScraperError) {
        self.advance(PipelineState::Failed(error.kind().to_string()));
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutcome {
    pub fields: CanonicalBookFields,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconciled: Option<ReconciledEntityIds>,
    pub states: Vec<PipelineState>,
}

/// Structured failure returned to callers in place of a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorEnvelope {
    pub fn from_error(error: &ScraperError) -> Self {
        Self {
            error: error.kind().to_string(),
            details: Some(error.to_string()),
        }
    }
}

impl From<&ScraperError> for ErrorEnvelope {
    fn from(error: &ScraperError) -> Self {
        Self::from_error(error)
    }
}

/// HTTP-style status for a failed run: caller mistakes are 400, everything else 500
pub fn status_code(error: &ScraperError) -> u16 {
    if error.is_client_error() {
        400
    } else {
        500
    }
}

pub struct Orchestrator {
    registry: ExtractorRegistry,
    reconciler: Option<EntityReconciler>,
    extraction_timeout: Duration,
    fallback_title: Option<String>,
}

impl Orchestrator {
    pub fn new(registry: ExtractorRegistry) -> Self {
        Self {
            registry,
            reconciler: None,
            extraction_timeout: Duration::from_secs(DEFAULT_EXTRACTION_TIMEOUT_SECS),
            fallback_title: None,
        }
    }

    pub fn from_config(
        config: &AppConfig,
        http: Arc<dyn HttpClientPort>,
        catalog: Option<Arc<dyn CatalogPort>>,
    ) -> Result<Self> {
        let mut orchestrator = Self::new(ExtractorRegistry::from_config(config, http)?)
            .with_extraction_timeout(config.pipeline.extraction_timeout())
            .with_fallback_title(config.pipeline.fallback_title.clone());
        if let Some(catalog) = catalog {
            orchestrator = orchestrator.with_catalog(catalog);
        }
        Ok(orchestrator)
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn CatalogPort>) -> Self {
        self.reconciler = Some(EntityReconciler::new(catalog));
        self
    }

    pub fn with_extraction_timeout(mut self, timeout: Duration) -> Self {
        self.extraction_timeout = timeout;
        self
    }

    /// Title substituted for untitled pages. Without one, untitled pages fail the run.
    pub fn with_fallback_title(mut self, title: Option<String>) -> Self {
        self.fallback_title = title.filter(|t| !t.trim().is_empty());
        self
    }

    pub async fn run(&self, url: &str, mode: RunMode) -> Result<PipelineOutcome> {
        let mut run = PipelineRun::new();
        self.execute(url, mode, &mut run).await
    }

    /// Drive one run, recording every state transition in `run`.
    #[instrument(skip(self, run))]
    pub async fn execute(&self, url: &str, mode: RunMode, run: &mut PipelineRun) -> Result<PipelineOutcome> {
        let mut source = SourceVariant::Unknown;
        match self.steps(url, mode, run, &mut source).await {
            Ok((fields, reconciled)) => {
                run.advance(PipelineState::Done);
                metrics::record_pipeline_run(source, "done");
                info!("Pipeline done for {} ({}): {:?}", url, source, fields.title);
                Ok(PipelineOutcome {
                    fields,
                    reconciled,
                    states: run.history().to_vec(),
                })
            }
            Err(e) => {
                run.fail(&e);
                metrics::record_pipeline_run(source, e.kind());
                warn!("Pipeline failed for {} in {:?}: {}", url, run.history(), e);
                Err(e)
            }
        }
    }

    async fn steps(
        &self,
        url: &str,
        mode: RunMode,
        run: &mut PipelineRun,
        source: &mut SourceVariant,
    ) -> Result<(CanonicalBookFields, Option<ReconciledEntityIds>)> {
        run.advance(PipelineState::Classifying);
        let parsed = parse_source_url(url)?;
        let url = parsed.as_str();
        *source = classify_source(url);
        if *source == SourceVariant::Unknown {
            return Err(ScraperError::UnsupportedSource(url.to_string()));
        }

        run.advance(PipelineState::Extracting);
        let extractor = self.registry.get(*source)?;
        // Dependency setup has its own bound and must not eat the extraction budget
        extractor.prepare().await?;
        let started = Instant::now();
        let extracted = tokio::time::timeout(self.extraction_timeout, extractor.extract(url)).await;
        metrics::record_extraction_duration(*source, started.elapsed().as_secs_f64());
        let mut raw = match extracted {
            Ok(result) => result?,
            Err(_) => {
                return Err(ScraperError::ExtractionTimeout {
                    url: url.to_string(),
                    secs: self.extraction_timeout.as_secs(),
                })
            }
        };

        run.advance(PipelineState::Transforming);
        if let Some(fallback) = &self.fallback_title {
            if raw.title.as_deref().map_or(true, |t| t.trim().is_empty()) {
                debug!("No title extracted, using fallback '{}'", fallback);
                raw.title = Some(fallback.clone());
            }
        }
        let fields = transform(raw, *source, url)?;

        let reconciled = match mode {
            RunMode::Preview => None,
            RunMode::Persist => {
                let reconciler = self.reconciler.as_ref().ok_or_else(|| {
                    ScraperError::Config("persist run requested but no catalog is configured".to_string())
                })?;
                run.advance(PipelineState::Reconciling);
                Some(reconciler.reconcile(&fields).await?)
            }
        };

        Ok((fields, reconciled))
    }
}

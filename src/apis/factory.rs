use crate::apis::dom::DomExtractor;
use crate::apis::fandom::FANDOM_PLAN;
use crate::apis::goodreads::{map_goodreads_payload, GOODREADS_PLAN};
use crate::apis::subprocess::SubprocessExtractor;
use crate::apis::Extractor;
use crate::app::ports::HttpClientPort;
use crate::common::error::{Result, ScraperError};
use crate::common::types::SourceVariant;
use crate::config::{AppConfig, GoodreadsMode};
use std::collections::HashMap;
use std::sync::Arc;

/// Build the extractor configured for one source variant
pub fn create_extractor(
    variant: SourceVariant,
    config: &AppConfig,
    http: Arc<dyn HttpClientPort>,
) -> Result<Arc<dyn Extractor>> {
    match variant {
        SourceVariant::Fandom => Ok(Arc::new(DomExtractor::new(
            SourceVariant::Fandom,
            http,
            &FANDOM_PLAN,
            config.http.user_agent.clone(),
        ))),
        SourceVariant::Goodreads => match config.goodreads.mode {
            GoodreadsMode::Subprocess => Ok(Arc::new(
                SubprocessExtractor::new(
                    SourceVariant::Goodreads,
                    config.goodreads.command.clone(),
                    config.goodreads.setup.clone(),
                    map_goodreads_payload,
                )
                .with_setup_timeout(config.goodreads.setup_timeout()),
            )),
            GoodreadsMode::Dom => Ok(Arc::new(DomExtractor::new(
                SourceVariant::Goodreads,
                http,
                &GOODREADS_PLAN,
                config.http.user_agent.clone(),
            ))),
        },
        SourceVariant::Unknown => Err(ScraperError::UnsupportedSource(
            "no extractor for unknown sources".to_string(),
        )),
    }
}

/// Variant → extractor dispatch table. Built once and shared across requests so that
/// per-extractor state (like one-time dependency setup) survives between runs.
#[derive(Clone, Default)]
pub struct ExtractorRegistry {
    extractors: HashMap<SourceVariant, Arc<dyn Extractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every supported source wired from configuration
    pub fn from_config(config: &AppConfig, http: Arc<dyn HttpClientPort>) -> Result<Self> {
        let mut registry = Self::new();
        for variant in [SourceVariant::Fandom, SourceVariant::Goodreads] {
            let extractor = create_extractor(variant, config, http.clone())?;
            registry = registry.with_extractor(extractor);
        }
        Ok(registry)
    }

    /// Register (or replace) the extractor for `extractor.source()`
    pub fn with_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractors.insert(extractor.source(), extractor);
        self
    }

    pub fn get(&self, variant: SourceVariant) -> Result<Arc<dyn Extractor>> {
        self.extractors.get(&variant).cloned().ok_or_else(|| {
            ScraperError::UnsupportedSource(format!("no extractor registered for {variant}"))
        })
    }
}

use crate::common::constants::{
    BROWSER_USER_AGENT, DEFAULT_EXTRACTION_TIMEOUT_SECS, DEFAULT_GOODREADS_COMMAND,
    DEFAULT_SETUP_TIMEOUT_SECS,
};
use crate::common::error::{Result, ScraperError};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const CONFIG_PATH_ENV: &str = "BOOK_SCRAPER_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub pipeline: PipelineConfig,
    pub goodreads: GoodreadsConfig,
    pub catalog: CatalogConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub connect_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: BROWSER_USER_AGENT.to_string(),
            connect_timeout_secs: 10,
        }
    }
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub extraction_timeout_secs: u64,
    /// When set, untitled pages get this title instead of failing the run
    pub fallback_title: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            extraction_timeout_secs: DEFAULT_EXTRACTION_TIMEOUT_SECS,
            fallback_title: None,
        }
    }
}

impl PipelineConfig {
    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction_timeout_secs)
    }
}

/// How Goodreads pages get extracted. The out-of-process extractor is not bundled,
/// so it is opt-in: set `mode = "subprocess"` along with `command` (and `setup`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoodreadsMode {
    Subprocess,
    #[default]
    Dom,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// "python3 scraper.py" -> program + args
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let program = parts.next()?.to_string();
        Some(Self {
            program,
            args: parts.map(str::to_string).collect(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GoodreadsConfig {
    pub mode: GoodreadsMode,
    /// Invoked as `<program> <args...> <url>`
    pub command: CommandSpec,
    /// Installs the extractor's own dependencies before first use
    pub setup: Option<CommandSpec>,
    pub setup_timeout_secs: u64,
}

impl Default for GoodreadsConfig {
    fn default() -> Self {
        Self {
            mode: GoodreadsMode::default(),
            command: CommandSpec::new(DEFAULT_GOODREADS_COMMAND, &[]),
            setup: None,
            setup_timeout_secs: DEFAULT_SETUP_TIMEOUT_SECS,
        }
    }
}

impl GoodreadsConfig {
    pub fn setup_timeout(&self) -> Duration {
        Duration::from_secs(self.setup_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// SQLite file backing the catalog; in-memory when absent
    pub sqlite_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: "logs".to_string(),
        }
    }
}

impl AppConfig {
    /// Load `.env`, then the TOML file named by `BOOK_SCRAPER_CONFIG` (default `config.toml`),
    /// then apply `BOOK_SCRAPER_*` overrides. A missing file yields defaults.
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();
        let config_path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::load_from_path(Path::new(&config_path))?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let config_content = fs::read_to_string(path).map_err(|e| {
            ScraperError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        info!("Loaded configuration from {}", path.display());
        Self::from_toml_str(&config_content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secs) = lookup("BOOK_SCRAPER_EXTRACTION_TIMEOUT_SECS") {
            self.pipeline.extraction_timeout_secs = secs.trim().parse().map_err(|_| {
                ScraperError::Config(format!("BOOK_SCRAPER_EXTRACTION_TIMEOUT_SECS is not a number: {secs}"))
            })?;
        }
        if let Some(title) = lookup("BOOK_SCRAPER_FALLBACK_TITLE") {
            self.pipeline.fallback_title = Some(title).filter(|t| !t.trim().is_empty());
        }
        if let Some(mode) = lookup("BOOK_SCRAPER_GOODREADS_MODE") {
            self.goodreads.mode = match mode.trim().to_ascii_lowercase().as_str() {
                "dom" => GoodreadsMode::Dom,
                "subprocess" => GoodreadsMode::Subprocess,
                other => {
                    return Err(ScraperError::Config(format!(
                        "BOOK_SCRAPER_GOODREADS_MODE must be 'dom' or 'subprocess', got '{other}'"
                    )))
                }
            };
        }
        if let Some(line) = lookup("BOOK_SCRAPER_GOODREADS_COMMAND") {
            self.goodreads.command = CommandSpec::from_command_line(&line).ok_or_else(|| {
                ScraperError::Config("BOOK_SCRAPER_GOODREADS_COMMAND is empty".to_string())
            })?;
        }
        if let Some(path) = lookup("BOOK_SCRAPER_CATALOG_PATH") {
            self.catalog.sqlite_path = Some(PathBuf::from(path));
        }
        if let Some(port) = lookup("BOOK_SCRAPER_PORT") {
            self.server.port = port.trim().parse().map_err(|_| {
                ScraperError::Config(format!("BOOK_SCRAPER_PORT is not a port number: {port}"))
            })?;
        }
        Ok(())
    }
}

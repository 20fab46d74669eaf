use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

/// Simulation settings loaded from a YAML file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SimulationConfig {
    pub run_id: String,
    pub decks: DeckConfig,
    pub outputs: OutputsConfig,
    #[serde(default)]
    pub aggregation: AggregationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut cfg: SimulationConfig =
            serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(cfg)
    }

    /// Check every field and normalize the logging level. Performs no I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        check_run_id(&self.run_id)?;
        self.decks.check()?;
        self.outputs.check(&self.run_id)?;
        if self.logging.tracing_level.trim().is_empty() {
            self.logging.tracing_level = LoggingConfig::DEFAULT_LEVEL.to_string();
        }
        Ok(())
    }

    /// Expand `{run_id}` placeholders into concrete output paths.
    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        let expand = |template: &str| expand_run_id(&self.run_id, template);
        ResolvedOutputs {
            jsonl: expand(&self.outputs.jsonl),
            data_dir: expand(&self.outputs.data_dir),
            summary_md: expand(&self.outputs.summary_md),
            plots_dir: expand(&self.outputs.plots_dir),
        }
    }
}

/// How many decks to shuffle and how their results are persisted.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DeckConfig {
    pub seed: Option<u64>,
    pub count: usize,
    /// Decks accumulated into each persisted batch record; zero persists
    /// every deck on its own.
    #[serde(default)]
    pub batch_size: usize,
}

impl DeckConfig {
    fn check(&self) -> Result<(), ValidationError> {
        if self.count == 0 {
            return Err(ValidationError::field(
                "decks.count",
                "at least one deck is required",
            ));
        }
        if self.batch_size > self.count {
            return Err(ValidationError::field(
                "decks.batch_size",
                format!(
                    "a batch of {} cannot be filled by {} decks",
                    self.batch_size, self.count
                ),
            ));
        }
        Ok(())
    }
}

/// Locations for the run's artifacts. Every path may carry a `{run_id}`
/// placeholder.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutputsConfig {
    pub jsonl: String,
    pub data_dir: String,
    pub summary_md: String,
    pub plots_dir: String,
}

impl OutputsConfig {
    fn check(&self, run_id: &str) -> Result<(), ValidationError> {
        let fields = [
            ("outputs.jsonl", self.jsonl.as_str()),
            ("outputs.data_dir", self.data_dir.as_str()),
            ("outputs.summary_md", self.summary_md.as_str()),
            ("outputs.plots_dir", self.plots_dir.as_str()),
        ];
        for (field, template) in fields {
            if template.trim().is_empty() {
                return Err(ValidationError::field(field, "a path is required"));
            }
            if expand_run_id(run_id, template).components().next().is_none() {
                return Err(ValidationError::field(field, "path resolves to nothing"));
            }
        }
        Ok(())
    }
}

/// Aggregation configuration block.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AggregationConfig {
    /// Report per-game averages instead of raw sums.
    #[serde(default = "default_average")]
    pub average: bool,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            average: default_average(),
        }
    }
}

fn default_average() -> bool {
    true
}

/// Structured logging stays off unless the config asks for it.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "LoggingConfig::default_level")]
    pub tracing_level: String,
}

impl LoggingConfig {
    pub const DEFAULT_LEVEL: &'static str = "info";

    fn default_level() -> String {
        Self::DEFAULT_LEVEL.to_string()
    }

    /// The tracing level named by the config, if it parses as one.
    pub fn level(&self) -> Option<Level> {
        self.tracing_level.trim().parse().ok()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: Self::default_level(),
        }
    }
}

fn check_run_id(run_id: &str) -> Result<(), ValidationError> {
    if run_id.is_empty() {
        return Err(ValidationError::field("run_id", "a run id is required"));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-');
    if let Some(bad) = run_id.chars().find(|c| !allowed(*c)) {
        return Err(ValidationError::field(
            "run_id",
            format!("character '{bad}' is not allowed; use letters, digits, '.', '_' or '-'"),
        ));
    }
    Ok(())
}

fn expand_run_id(run_id: &str, template: &str) -> PathBuf {
    PathBuf::from(template.replace("{run_id}", run_id))
}

/// Output locations with every template placeholder expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub jsonl: PathBuf,
    pub data_dir: PathBuf,
    pub summary_md: PathBuf,
    pub plots_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config file {path:?} is not valid YAML: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("config file {path:?} failed validation: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}

impl ValidationError {
    fn field(field: &str, message: impl Into<String>) -> Self {
        ValidationError::InvalidField {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

//! Configuration and logging setup shared by codart tools.
//!
//! Configuration lives in a TOML file at the project root (see [`discover_config_path`]). Every
//! section is optional; a missing file yields [`CodartConfig::default`].

use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Top-level configuration file contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CodartConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub move_field: MoveFieldConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level for all codart crates, or a full `EnvFilter` directive string.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Emit logs in JSON format.
    #[serde(default)]
    pub json: bool,

    /// Write logs to stderr.
    #[serde(default = "LoggingConfig::default_stderr")]
    pub stderr: bool,

    /// Append logs to the given file path.
    ///
    /// If the file cannot be opened, file logging is disabled while stderr logging remains
    /// active.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_owned()
    }

    fn default_stderr() -> bool {
        true
    }

    pub(crate) fn normalize_level_directives(input: &str) -> String {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Self::default_level();
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "trace" => "trace".to_owned(),
            "debug" => "debug".to_owned(),
            "info" => "info".to_owned(),
            "warn" | "warning" => "warn".to_owned(),
            "error" => "error".to_owned(),
            // Anything else is treated as an `EnvFilter` directive string.
            _ => trimmed.to_owned(),
        }
    }

    fn config_env_filter(&self) -> tracing_subscriber::EnvFilter {
        let directives = Self::normalize_level_directives(&self.level);
        tracing_subscriber::EnvFilter::try_new(directives).unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::default()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
        })
    }

    /// Create the effective `EnvFilter`.
    ///
    /// If `RUST_LOG` is set, it is merged into the filter built from `level`.
    pub fn env_filter(&self) -> tracing_subscriber::EnvFilter {
        let env_directives = std::env::var("RUST_LOG")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());

        let config_directives = Self::normalize_level_directives(&self.level);

        match env_directives {
            Some(env_directives) => {
                let combined = format!("{config_directives},{env_directives}");
                tracing_subscriber::EnvFilter::try_new(combined)
                    .or_else(|_| tracing_subscriber::EnvFilter::try_new(env_directives))
                    .unwrap_or_else(|_| self.config_env_filter())
            }
            None => self.config_env_filter(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
            stderr: Self::default_stderr(),
            file: None,
        }
    }
}

/// Defaults for the move-field refactoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MoveFieldConfig {
    /// Replace files in place instead of writing rewritten copies beside them.
    #[serde(default)]
    pub overwrite: bool,

    /// Suffix appended to a file name when `overwrite` is off.
    #[serde(default = "MoveFieldConfig::default_output_suffix")]
    pub output_suffix: String,
}

impl MoveFieldConfig {
    pub const DEFAULT_OUTPUT_SUFFIX: &'static str = ".rewritten.java";

    fn default_output_suffix() -> String {
        Self::DEFAULT_OUTPUT_SUFFIX.to_owned()
    }
}

impl Default for MoveFieldConfig {
    fn default() -> Self {
        Self {
            overwrite: false,
            output_suffix: Self::default_output_suffix(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // Keep the message only; the default `Display` embeds a source snippet.
        ConfigError::Toml(err.message().to_owned())
    }
}

impl CodartConfig {
    /// Parse a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: CodartConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file from TOML.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let suffix = &self.move_field.output_suffix;
        if !self.move_field.overwrite && suffix.is_empty() {
            return Err(ConfigError::Invalid(
                "move_field.output_suffix must not be empty unless move_field.overwrite is set"
                    .to_owned(),
            ));
        }
        if suffix.contains('/') || suffix.contains('\\') {
            return Err(ConfigError::Invalid(
                "move_field.output_suffix must not contain path separators".to_owned(),
            ));
        }
        Ok(())
    }
}

pub const CODART_CONFIG_ENV_VAR: &str = "CODART_CONFIG";

/// Discover the configuration file for a project root.
///
/// Search order:
/// 1) `CODART_CONFIG` (absolute or relative to `project_root`)
/// 2) `codart.toml` in `project_root`
/// 3) `.codart.toml` in `project_root`
pub fn discover_config_path(project_root: &Path) -> Option<PathBuf> {
    if let Some(value) = std::env::var_os(CODART_CONFIG_ENV_VAR) {
        let candidate = PathBuf::from(value);
        let path = if candidate.is_absolute() {
            candidate
        } else {
            project_root.join(candidate)
        };
        return Some(path.canonicalize().unwrap_or(path));
    }

    ["codart.toml", ".codart.toml"]
        .into_iter()
        .map(|name| project_root.join(name))
        .find(|path| path.is_file())
        .map(|path| path.canonicalize().unwrap_or(path))
}

/// Load the configuration for a project root.
///
/// If no config is present, returns [`CodartConfig::default`] and `None`.
pub fn load_for_project(
    project_root: &Path,
) -> Result<(CodartConfig, Option<PathBuf>), ConfigError> {
    let Some(path) = discover_config_path(project_root) else {
        return Ok((CodartConfig::default(), None));
    };

    let config = CodartConfig::load_from_path(&path)?;
    tracing::debug!(target: "codart.config", path = %path.display(), "loaded config");
    Ok((config, Some(path)))
}

static TRACING_INIT: Once = Once::new();

/// Initializes structured `tracing` logging.
///
/// Safe to call multiple times; only the first call installs a global subscriber.
pub fn init_tracing(config: &LoggingConfig) {
    TRACING_INIT.call_once(|| {
        let filter = config.env_filter();

        let file = config.file.as_ref().and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });
        let file_open_failed = config.file.is_some() && file.is_none();

        let make_writer = match (config.stderr, file) {
            (true, Some(file)) => BoxMakeWriter::new(std::io::stderr.and(Arc::new(file))),
            (false, Some(file)) => BoxMakeWriter::new(Arc::new(file)),
            (true, None) => BoxMakeWriter::new(std::io::stderr),
            (false, None) => BoxMakeWriter::new(std::io::sink),
        };

        let layer: Box<dyn Layer<_> + Send + Sync> = if config.json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(make_writer)
                .with_ansi(false)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(make_writer)
                .with_ansi(false)
                .boxed()
        };

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .try_init();

        if file_open_failed {
            tracing::warn!(
                target: "codart.config",
                path = ?config.file,
                "failed to open log file; file logging disabled"
            );
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_config_uses_defaults() {
        let config = CodartConfig::from_toml_str("").unwrap();
        assert_eq!(config, CodartConfig::default());
        assert_eq!(config.move_field.output_suffix, ".rewritten.java");
        assert!(!config.move_field.overwrite);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn parses_all_sections() {
        let config = CodartConfig::from_toml_str(
            r#"
[logging]
level = "debug"
json = true
stderr = false

[move_field]
overwrite = true
output_suffix = ".moved.java"
"#,
        )
        .unwrap();
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert!(!config.logging.stderr);
        assert!(config.move_field.overwrite);
        assert_eq!(config.move_field.output_suffix, ".moved.java");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = CodartConfig::from_toml_str("[move_field]\nover_write = true\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)), "{err:?}");
    }

    #[test]
    fn empty_suffix_requires_overwrite() {
        let err =
            CodartConfig::from_toml_str("[move_field]\noutput_suffix = \"\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "{err:?}");

        CodartConfig::from_toml_str("[move_field]\noverwrite = true\noutput_suffix = \"\"\n")
            .unwrap();
    }

    #[test]
    fn level_directives_are_normalized() {
        assert_eq!(LoggingConfig::normalize_level_directives(" WARNING "), "warn");
        assert_eq!(LoggingConfig::normalize_level_directives(""), "info");
        assert_eq!(
            LoggingConfig::normalize_level_directives("codart.refactor=trace"),
            "codart.refactor=trace"
        );
    }

    #[test]
    fn discovers_dotfile_config() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(discover_config_path(dir.path()), None);

        std::fs::write(dir.path().join(".codart.toml"), "[logging]\nlevel = \"trace\"\n").unwrap();
        let (config, path) = load_for_project(dir.path()).unwrap();
        assert!(path.unwrap().ends_with(".codart.toml"));
        assert_eq!(config.logging.level, "trace");
    }
}

//! Layered build configuration
//!
//! Three layers are merged, later layers winning:
//! 1. Built-in defaults
//! 2. Config file (`lambda-pack.toml`, or the path given with `--config`)
//! 3. CLI flags

mod defaults;
mod merge;

pub use defaults::BuiltinDefaults;
pub use merge::{merge_into, merge_layers};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "lambda-pack.toml";

/// One source tree or file to add to the archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    /// File or directory on disk
    pub path: String,

    /// Root the archive names are computed against (empty: relative names)
    #[serde(default)]
    pub root: String,
}

impl SourceSpec {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            root: String::new(),
        }
    }

    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    /// Parse a command-line source argument: `PATH` or `PATH=ROOT`.
    pub fn parse_arg(arg: &str) -> Result<Self, ConfigError> {
        let (path, root) = match arg.split_once('=') {
            Some((path, root)) => (path, root),
            None => (arg, ""),
        };
        if path.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "source argument has an empty path: {:?}",
                arg
            )));
        }
        Ok(Self::new(path).with_root(root))
    }
}

/// Fully merged build configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackConfig {
    /// Archive to write
    pub output: PathBuf,

    /// Archive symlink targets instead of rejecting links
    pub follow_links: bool,

    /// Deflate single-file sources
    pub deflate_single_files: bool,

    /// Fallback log filter
    pub log_level: String,

    /// Sources, added in order
    pub sources: Vec<SourceSpec>,

    /// Config file that contributed to this config, if any
    #[serde(skip)]
    pub config_file: Option<PathBuf>,
}

impl PackConfig {
    /// Load configuration from defaults, an optional config file, and CLI
    /// overrides.
    ///
    /// An explicit `path` must exist. Without one, `lambda-pack.toml` in the
    /// working directory is used when present.
    pub fn load(path: Option<&Path>, overrides: Value) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                default.is_file().then_some(default)
            }
        };

        let mut layers = vec![BuiltinDefaults::default().to_value()];
        if let Some(file) = &file {
            debug!("loading config file {}", file.display());
            layers.push(load_toml_file(file)?);
        }
        layers.push(overrides);

        let mut config = Self::from_value(merge_layers(layers))?;
        config.config_file = file;
        Ok(config)
    }

    /// Build a config from an already merged value and validate it
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_value(value)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.output.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("output path is empty".to_string()));
        }
        if self.sources.is_empty() {
            return Err(ConfigError::Invalid(
                "no sources configured; pass --source or add [[sources]] to the config file"
                    .to_string(),
            ));
        }
        if let Some(index) = self.sources.iter().position(|s| s.path.is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "source #{} has an empty path",
                index + 1
            )));
        }
        Ok(())
    }
}

fn load_toml_file(path: &Path) -> Result<Value, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let table: toml::Table = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    serde_json::to_value(table).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_arg_path_only() {
        let spec = SourceSpec::parse_arg("build/handler").unwrap();
        assert_eq!(spec.path, "build/handler");
        assert_eq!(spec.root, "");
    }

    #[test]
    fn test_parse_arg_with_root() {
        let spec = SourceSpec::parse_arg("build/handler=build").unwrap();
        assert_eq!(spec.path, "build/handler");
        assert_eq!(spec.root, "build");
    }

    #[test]
    fn test_parse_arg_empty_path() {
        assert!(SourceSpec::parse_arg("=build").is_err());
        assert!(SourceSpec::parse_arg("").is_err());
    }

    #[test]
    fn test_defaults_with_cli_sources() {
        let file = config_file("");
        let config = PackConfig::load(
            Some(file.path()),
            json!({"sources": [{"path": "dist"}]}),
        )
        .unwrap();

        assert_eq!(config.output, PathBuf::from("lambda.zip"));
        assert!(!config.deflate_single_files);
        assert!(!config.follow_links);
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.sources, vec![SourceSpec::new("dist")]);
        assert_eq!(config.config_file.as_deref(), Some(file.path()));
    }

    #[test]
    fn test_file_layer() {
        let file = config_file(
            r#"
output = "out/function.zip"
deflate_single_files = true

[[sources]]
path = "build"
root = "build"

[[sources]]
path = "bootstrap"
"#,
        );
        let config = PackConfig::load(Some(file.path()), json!({})).unwrap();

        assert_eq!(config.output, PathBuf::from("out/function.zip"));
        assert!(config.deflate_single_files);
        assert_eq!(
            config.sources,
            vec![
                SourceSpec::new("build").with_root("build"),
                SourceSpec::new("bootstrap"),
            ]
        );
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = config_file(
            r#"
output = "from-file.zip"
log_level = "info"

[[sources]]
path = "build"
"#,
        );
        let config = PackConfig::load(
            Some(file.path()),
            json!({"output": "from-cli.zip", "sources": [{"path": "other"}]}),
        )
        .unwrap();

        assert_eq!(config.output, PathBuf::from("from-cli.zip"));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.sources, vec![SourceSpec::new("other")]);
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = PackConfig::load(
            Some(Path::new("/nonexistent/lambda-pack.toml")),
            json!({"sources": [{"path": "dist"}]}),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_malformed_file() {
        let file = config_file("output = [unterminated");
        let err = PackConfig::load(Some(file.path()), json!({})).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_no_sources_rejected() {
        let file = config_file("output = \"x.zip\"");
        let err = PackConfig::load(Some(file.path()), json!({})).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_empty_source_path_rejected() {
        let err = PackConfig::from_value(json!({
            "output": "x.zip",
            "follow_links": false,
            "deflate_single_files": false,
            "log_level": "warn",
            "sources": [{"path": ""}],
        }))
        .unwrap_err();
        assert!(err.to_string().contains("source #1"));
    }

    #[test]
    fn test_wrong_type_rejected() {
        let file = config_file("follow_links = \"yes\"\n[[sources]]\npath = \"a\"\n");
        let err = PackConfig::load(Some(file.path()), json!({})).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}

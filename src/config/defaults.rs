//! Built-in defaults (layer 1)

use serde::{Deserialize, Serialize};
use serde_json::json;

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Archive written by `build` (default: "lambda.zip")
    pub output: String,

    /// Deflate single-file sources instead of storing them (default: false)
    pub deflate_single_files: bool,

    /// Archive symlink targets instead of rejecting links (default: false)
    pub follow_links: bool,

    /// Log filter used when neither the CLI nor RUST_LOG sets one (default: "warn")
    pub log_level: String,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            output: "lambda.zip".to_string(),
            deflate_single_files: false,
            follow_links: false,
            log_level: "warn".to_string(),
        }
    }
}

impl BuiltinDefaults {
    /// Convert to a JSON layer for merging
    pub fn to_value(&self) -> serde_json::Value {
        json!({
            "output": self.output,
            "deflate_single_files": self.deflate_single_files,
            "follow_links": self.follow_links,
            "log_level": self.log_level,
            "sources": [],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let defaults = BuiltinDefaults::default();
        assert_eq!(defaults.output, "lambda.zip");
        assert!(!defaults.deflate_single_files);
        assert!(!defaults.follow_links);
        assert_eq!(defaults.log_level, "warn");
    }

    #[test]
    fn test_to_value() {
        let value = BuiltinDefaults::default().to_value();
        assert_eq!(value["output"], "lambda.zip");
        assert_eq!(value["log_level"], "warn");
        assert!(value["sources"].as_array().unwrap().is_empty());
    }
}

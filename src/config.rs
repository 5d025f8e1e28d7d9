//! Configuration for PDF composition.
//!
//! Two things must be known before any command can be built: where the
//! markup→PDF tool (wkhtmltopdf) lives and where the PDF tool (pdftk) lives.
//! Both are looked up through a [`ConfigSource`] that is handed to the
//! [`crate::Composer`] at construction, never read from ambient global state,
//! so tests can inject fixed or deliberately broken paths.
//!
//! Everything else (the temp root and the temp-name prefix) lives on
//! [`ComposerConfig`], built via its [`ComposerConfigBuilder`].

use crate::error::{PdfComposeError, Result};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Config key holding the wkhtmltopdf executable path.
pub const WKHTMLTOPDF_PATH_KEY: &str = "pdf.wkhtmltopdf.path";

/// Config key holding the pdftk executable path.
pub const PDFTK_PATH_KEY: &str = "pdf.pdftk.path";

/// A read-only key/value configuration provider.
///
/// # Example
/// ```rust
/// use edgequake_pdfcompose::config::{ConfigSource, PDFTK_PATH_KEY};
/// use std::collections::HashMap;
///
/// let mut map = HashMap::new();
/// map.insert(PDFTK_PATH_KEY.to_string(), "/usr/bin/pdftk".to_string());
/// assert_eq!(map.lookup(PDFTK_PATH_KEY).as_deref(), Some("/usr/bin/pdftk"));
/// ```
pub trait ConfigSource: Send + Sync {
    /// Return the value for `key`, or `None` when absent.
    fn lookup(&self, key: &str) -> Option<String>;
}

impl ConfigSource for HashMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Reads tool paths from `WKHTMLTOPDF_PATH` and `PDFTK_PATH`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvConfig;

impl EnvConfig {
    /// Environment variable backing a config key, if any.
    pub fn env_var_for(key: &str) -> Option<&'static str> {
        match key {
            WKHTMLTOPDF_PATH_KEY => Some("WKHTMLTOPDF_PATH"),
            PDFTK_PATH_KEY => Some("PDFTK_PATH"),
            _ => None,
        }
    }
}

impl ConfigSource for EnvConfig {
    fn lookup(&self, key: &str) -> Option<String> {
        Self::env_var_for(key).and_then(|var| std::env::var(var).ok())
    }
}

/// Resolve a tool path from `source`, treating empty values as unset.
pub fn tool_path(source: &dyn ConfigSource, key: &str) -> Result<PathBuf> {
    match source.lookup(key) {
        Some(v) if !v.trim().is_empty() => Ok(PathBuf::from(v.trim())),
        _ => Err(PdfComposeError::Configuration {
            key: key.to_string(),
            message: format!("Set config '{key}' for this environment."),
        }),
    }
}

/// Settings shared by every operation of a [`crate::Composer`].
///
/// # Example
/// ```rust
/// use edgequake_pdfcompose::ComposerConfig;
///
/// let config = ComposerConfig::builder()
///     .temp_prefix("invoice-")
///     .build()
///     .unwrap();
/// assert_eq!(config.temp_prefix, "invoice-");
/// ```
#[derive(Clone)]
pub struct ComposerConfig {
    /// Where the tool paths come from. Default: [`EnvConfig`].
    pub source: Arc<dyn ConfigSource>,

    /// Directory for intermediates and outputs. Default: `std::env::temp_dir()`.
    pub temp_root: PathBuf,

    /// Filename prefix for every temp artifact. Default: `pdfcompose-`.
    pub temp_prefix: String,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            source: Arc::new(EnvConfig),
            temp_root: std::env::temp_dir(),
            temp_prefix: "pdfcompose-".to_string(),
        }
    }
}

impl fmt::Debug for ComposerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComposerConfig")
            .field("source", &"<dyn ConfigSource>")
            .field("temp_root", &self.temp_root)
            .field("temp_prefix", &self.temp_prefix)
            .finish()
    }
}

impl ComposerConfig {
    /// Create a new builder for `ComposerConfig`.
    pub fn builder() -> ComposerConfigBuilder {
        ComposerConfigBuilder {
            config: Self::default(),
        }
    }

    /// Path to wkhtmltopdf.
    pub fn wkhtmltopdf(&self) -> Result<PathBuf> {
        tool_path(self.source.as_ref(), WKHTMLTOPDF_PATH_KEY)
    }

    /// Path to pdftk.
    pub fn pdftk(&self) -> Result<PathBuf> {
        tool_path(self.source.as_ref(), PDFTK_PATH_KEY)
    }
}

/// Builder for [`ComposerConfig`].
pub struct ComposerConfigBuilder {
    config: ComposerConfig,
}

impl ComposerConfigBuilder {
    pub fn source(mut self, source: Arc<dyn ConfigSource>) -> Self {
        self.config.source = source;
        self
    }

    /// Shorthand for a fixed pair of tool paths.
    pub fn tool_paths(self, wkhtmltopdf: impl AsRef<Path>, pdftk: impl AsRef<Path>) -> Self {
        let mut map = HashMap::new();
        map.insert(
            WKHTMLTOPDF_PATH_KEY.to_string(),
            wkhtmltopdf.as_ref().to_string_lossy().into_owned(),
        );
        map.insert(
            PDFTK_PATH_KEY.to_string(),
            pdftk.as_ref().to_string_lossy().into_owned(),
        );
        self.source(Arc::new(map))
    }

    pub fn temp_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_root = dir.into();
        self
    }

    pub fn temp_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.temp_prefix = prefix.into();
        self
    }

    /// Build the configuration, validating the temp root.
    pub fn build(self) -> Result<ComposerConfig> {
        let root = &self.config.temp_root;
        if !root.is_dir() {
            return Err(PdfComposeError::Configuration {
                key: "temp_root".into(),
                message: format!("'{}' is not an existing directory", root.display()),
            });
        }
        if self.config.temp_prefix.contains(std::path::MAIN_SEPARATOR) {
            return Err(PdfComposeError::Configuration {
                key: "temp_prefix".into(),
                message: "prefix must not contain a path separator".into(),
            });
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_configuration_error() {
        let map: HashMap<String, String> = HashMap::new();
        let err = tool_path(&map, PDFTK_PATH_KEY).unwrap_err();
        assert!(matches!(err, PdfComposeError::Configuration { ref key, .. } if key == PDFTK_PATH_KEY));
    }

    #[test]
    fn blank_value_counts_as_unset() {
        let mut map = HashMap::new();
        map.insert(WKHTMLTOPDF_PATH_KEY.to_string(), "   ".to_string());
        assert!(tool_path(&map, WKHTMLTOPDF_PATH_KEY).is_err());
    }

    #[test]
    fn tool_paths_shorthand() {
        let config = ComposerConfig::builder()
            .tool_paths("/opt/wk/bin/wkhtmltopdf", "/opt/pdftk")
            .build()
            .unwrap();
        assert_eq!(config.pdftk().unwrap(), PathBuf::from("/opt/pdftk"));
        assert_eq!(
            config.wkhtmltopdf().unwrap(),
            PathBuf::from("/opt/wk/bin/wkhtmltopdf")
        );
    }

    #[test]
    fn env_var_mapping() {
        assert_eq!(EnvConfig::env_var_for(PDFTK_PATH_KEY), Some("PDFTK_PATH"));
        assert_eq!(EnvConfig::env_var_for("pdf.other"), None);
        assert_eq!(EnvConfig.lookup("pdf.other"), None);
    }

    #[test]
    fn nonexistent_temp_root_rejected() {
        let err = ComposerConfig::builder()
            .temp_root("/definitely/not/a/real/dir")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("temp_root"));
    }
}

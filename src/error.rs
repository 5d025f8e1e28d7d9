//! Error types for the edgequake-pdfcompose library.
//!
//! A single error type, [`PdfComposeError`], covers every way a composition
//! can fail. Each variant is a distinct failure *kind* so callers can decide
//! what to do without string matching:
//!
//! * [`PdfComposeError::InvalidInput`]: the caller handed us something that is
//!   not a PDF or a renderable template.
//! * [`PdfComposeError::Configuration`]: a tool path or temp directory is
//!   missing or unusable.
//! * [`PdfComposeError::TemplateRender`]: a template failed to produce markup.
//! * [`PdfComposeError::Io`]: reading or writing an intermediate file failed.
//! * [`PdfComposeError::ExternalTool`]: wkhtmltopdf or pdftk exited non-zero.
//!
//! Lower-level faults (`std::io::Error`, template errors) are mapped into one
//! of these kinds where they occur; nothing else crosses the public API.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PdfComposeError>;

/// All errors returned by the edgequake-pdfcompose library.
#[derive(Debug, Error)]
pub enum PdfComposeError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Unrecognised input shape, missing file, or a file that is not a PDF.
    #[error("Invalid input: {description}")]
    InvalidInput { description: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// A required configuration value is unset or unusable.
    #[error("Unconfigured or incorrect '{key}': {message}")]
    Configuration { key: String, message: String },

    // ── Template errors ───────────────────────────────────────────────────
    /// Template `index` (0-based, in render order) failed to produce markup.
    #[error("Template {index} failed to render: {message}")]
    TemplateRender { index: usize, message: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create, write or read an intermediate file.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Tool errors ───────────────────────────────────────────────────────
    /// The external tool ran but exited unsuccessfully.
    ///
    /// `status` is `None` when the process was killed by a signal.
    #[error(
        "{tool} returned status {}. Command was: `{command}`. Output: {output}",
        status.map_or_else(|| "<signal>".to_string(), |c| c.to_string())
    )]
    ExternalTool {
        tool: String,
        status: Option<i32>,
        command: String,
        output: String,
    },
}

impl PdfComposeError {
    pub(crate) fn invalid_input(description: impl Into<String>) -> Self {
        Self::InvalidInput {
            description: description.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Exit status of the failed tool, if this is an [`ExternalTool`](Self::ExternalTool) error.
    pub fn exit_status(&self) -> Option<i32> {
        match self {
            Self::ExternalTool { status, .. } => *status,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_tool_display_carries_command_and_output() {
        let e = PdfComposeError::ExternalTool {
            tool: "pdftk".into(),
            status: Some(3),
            command: "'/usr/bin/pdftk' 'A=/tmp/a.pdf' 'cat' 'A'".into(),
            output: "Error: Unable to find file.".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("pdftk returned status 3"), "got: {msg}");
        assert!(msg.contains("'A=/tmp/a.pdf'"), "got: {msg}");
        assert!(msg.contains("Unable to find file"), "got: {msg}");
        assert_eq!(e.exit_status(), Some(3));
    }

    #[test]
    fn external_tool_display_without_status() {
        let e = PdfComposeError::ExternalTool {
            tool: "wkhtmltopdf".into(),
            status: None,
            command: "x".into(),
            output: String::new(),
        };
        assert!(e.to_string().contains("<signal>"));
    }

    #[test]
    fn configuration_display_names_key() {
        let e = PdfComposeError::Configuration {
            key: "pdf.pdftk.path".into(),
            message: "not set".into(),
        };
        assert!(e.to_string().contains("pdf.pdftk.path"));
        assert_eq!(e.exit_status(), None);
    }
}

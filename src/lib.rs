//! # edgequake-pdfcompose
//!
//! Compose PDF documents from existing PDF files and rendered HTML templates.
//!
//! ## Why this crate?
//!
//! Generating a contract, an invoice pack or a report usually means mixing
//! static PDFs (terms, cover sheets, letterheads) with pages rendered from
//! data. Two battle-tested tools already do the heavy lifting: wkhtmltopdf
//! turns HTML into PDF and pdftk concatenates and stamps PDFs. So this crate
//! owns no PDF byte-level logic. It orchestrates those tools: normalises
//! inputs, builds their command lines, manages the temporary files between
//! steps, and turns failures into typed errors.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PdfInput (file │ template │ templates │ pages)
//!  │
//!  ├─ 1. Resolve  validate PDFs, render templates via wkhtmltopdf
//!  ├─ 2. Build    pdftk argv (key=file … cat ORDER output OUT)
//!  ├─ 3. Run      blocking subprocess, merged stdout/stderr captured
//!  ├─ 4. Clean    delete pipeline-owned intermediates (always)
//!  └─ 5. Classify non-zero exit → PdfComposeError::ExternalTool
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdfcompose::{
//!     Composer, ComposerConfig, HtmlTemplate, PdfInput, StampOptions,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Tool paths from WKHTMLTOPDF_PATH / PDFTK_PATH
//!     let composer = Composer::new(ComposerConfig::default());
//!
//!     let watermark = PdfInput::template(HtmlTemplate::new("<h1>DRAFT</h1>"));
//!     let stamped = composer.stamp(
//!         &watermark,
//!         &PdfInput::file("report.pdf"),
//!         &StampOptions::default(),
//!     )?;
//!     stamped.persist_to("report-draft.pdf")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfcompose` binary (clap + anyhow + tracing-subscriber) |
//! | `async` | on      | [`nonblocking`] wrappers built on `tokio::task::spawn_blocking` |
//!
//! ## Temporary files
//!
//! Intermediates live under [`ComposerConfig::temp_root`] and are created
//! with an exclusive-create call, so concurrent operations never share a
//! path. Results are returned as pipeline-owned [`ResolvedDocument`]s: move
//! them with [`ResolvedDocument::persist_to`] or delete them with
//! [`ResolvedDocument::release`] once delivered.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod compose;
pub mod config;
pub mod error;
#[cfg(feature = "async")]
pub mod nonblocking;
pub mod options;
pub mod pipeline;
pub mod template;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use compose::{Composer, StampOptions};
pub use config::{ComposerConfig, ComposerConfigBuilder, ConfigSource, EnvConfig};
pub use error::{PdfComposeError, Result};
pub use options::{OptionValue, ToolOptions};
pub use pipeline::command::PageKey;
pub use pipeline::input::{Ownership, PageSet, PdfInput, ResolvedDocument};
pub use pipeline::invoke::ToolResult;
pub use template::{FileTemplate, HtmlTemplate, MustacheTemplate, Template, TemplateError};

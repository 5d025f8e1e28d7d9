//! Composition entry points: render, concatenate, stamp, burst.
//!
//! Every operation follows the same unconditional sequence:
//!
//! ```text
//! resolve inputs ─▶ build command ─▶ run tool ─▶ delete intermediates ─▶ classify
//! ```
//!
//! Resolution completes before any command is built. Intermediates are held
//! by guards, so they are deleted on every exit path: success, tool failure,
//! or an early error while a later input is still being resolved. There are
//! no retries; a failed tool run is terminal for the operation.

use crate::config::ComposerConfig;
use crate::error::{PdfComposeError, Result};
use crate::options::ToolOptions;
use crate::pipeline::command::{self, PageKey};
use crate::pipeline::input::{self, PageSet, PdfInput, ResolvedDocument};
use crate::pipeline::invoke;
use crate::pipeline::render::Renderer;
use crate::pipeline::temp::TempArtifact;
use crate::template::Template;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Tool name used in logs and errors.
pub const PDFTK: &str = "pdftk";

/// Filename pattern for pages written by [`Composer::burst`].
pub const BURST_PATTERN: &str = "page_%04d.pdf";

/// Report pdftk writes next to burst pages; removed after bursting.
const BURST_REPORT: &str = "doc_data.txt";

/// Per-side render options for [`Composer::stamp`].
#[derive(Debug, Clone, Default)]
pub struct StampOptions {
    pub foreground: ToolOptions,
    pub background: ToolOptions,
}

/// Composes PDFs from files and templates.
///
/// Cheap to clone; clones share nothing mutable.
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdfcompose::{Composer, ComposerConfig, HtmlTemplate, PageSet, PdfInput};
///
/// let config = ComposerConfig::builder()
///     .tool_paths("/usr/local/bin/wkhtmltopdf", "/usr/bin/pdftk")
///     .build()?;
/// let composer = Composer::new(config);
///
/// let pages = PageSet::new()
///     .with(PdfInput::template(HtmlTemplate::new("<h1>Cover</h1>")))
///     .with("terms.pdf");
/// let merged = composer.concatenate(&pages, None)?;
/// merged.persist_to("contract.pdf")?;
/// # Ok::<(), edgequake_pdfcompose::PdfComposeError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Composer {
    renderer: Renderer,
}

impl Composer {
    pub fn new(config: ComposerConfig) -> Self {
        Self {
            renderer: Renderer::new(config),
        }
    }

    pub fn config(&self) -> &ComposerConfig {
        self.renderer.config()
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Render templates, in order, into one pipeline-owned PDF.
    pub fn render(
        &self,
        templates: &[Arc<dyn Template>],
        options: &ToolOptions,
    ) -> Result<ResolvedDocument> {
        self.renderer
            .render(templates, options)
            .inspect_err(|e| error!("Problem generating PDF: {}", e))
    }

    /// Normalise one input to a PDF on disk.
    pub fn resolve(&self, input: &PdfInput, options: &ToolOptions) -> Result<ResolvedDocument> {
        input::resolve(&self.renderer, input, options)
    }

    /// Concatenate `pages` into one pipeline-owned PDF.
    ///
    /// Positional inputs are keyed `A`, `B`, `C`, …; named inputs keep their
    /// key. `order` is a pdftk page-range expression such as `"B A1-3"`;
    /// without it pages follow the order of `pages`.
    pub fn concatenate(&self, pages: &PageSet, order: Option<&str>) -> Result<ResolvedDocument> {
        concatenate_pages(&self.renderer, pages, order)
            .inspect_err(|e| error!("Problem generating PDF: {}", e))
    }

    /// Concatenate two inputs: `a` then `b`.
    pub fn cat(&self, a: impl Into<PdfInput>, b: impl Into<PdfInput>) -> Result<ResolvedDocument> {
        self.concatenate(&PageSet::new().with(a).with(b), None)
    }

    /// Stamp `foreground` on top of every page of `background`.
    pub fn stamp(
        &self,
        foreground: &PdfInput,
        background: &PdfInput,
        options: &StampOptions,
    ) -> Result<ResolvedDocument> {
        self.stamp_inner(foreground, background, options)
            .inspect_err(|e| error!("Problem generating PDF: {}", e))
    }

    fn stamp_inner(
        &self,
        foreground: &PdfInput,
        background: &PdfInput,
        options: &StampOptions,
    ) -> Result<ResolvedDocument> {
        info!(
            "Stamping {} onto {}",
            foreground.describe(),
            background.describe()
        );

        let fg = self.resolve(foreground, &options.foreground)?;
        let fg_guard = fg.cleanup_guard();
        let bg = self.resolve(background, &options.background)?;
        let bg_guard = bg.cleanup_guard();

        let tool = self.config().pdftk()?;
        let output = self.renderer.temps().new_temp_path("pdf")?;
        let args = command::pdftk_stamp_args(bg.path(), fg.path(), output.path());

        let result = invoke::run(&tool, &args);
        drop((fg_guard, bg_guard));
        result?.check(PDFTK)?;

        let path = output.keep();
        info!("Stamped → {}", path.display());
        Ok(ResolvedDocument::pipeline(path))
    }

    /// Split `input` into single-page PDFs.
    ///
    /// Returns a fresh pipeline-owned directory holding `page_0001.pdf`,
    /// `page_0002.pdf`, … in page order.
    pub fn burst(&self, input: &PdfInput) -> Result<PathBuf> {
        self.burst_inner(input)
            .inspect_err(|e| error!("Problem splitting PDF: {}", e))
    }

    fn burst_inner(&self, input: &PdfInput) -> Result<PathBuf> {
        let doc = self.resolve(input, &ToolOptions::default())?;
        let doc_guard = doc.cleanup_guard();

        let tool = self.config().pdftk()?;
        let dir = self.renderer.temps().new_temp_dir()?;
        let pattern = dir.path().join(BURST_PATTERN);
        let args = command::pdftk_burst_args(doc.path(), &pattern);

        let result = invoke::run(&tool, &args);
        drop(doc_guard);
        result?.check(PDFTK)?;

        crate::pipeline::temp::release(&dir.path().join(BURST_REPORT));
        let pages = std::fs::read_dir(dir.path())
            .map_err(|e| PdfComposeError::io(dir.path(), e))?
            .count();
        let path = dir.keep();
        info!("Burst {} → {} pages in {}", input.describe(), pages, path.display());
        Ok(path)
    }
}

/// Concatenation shared by [`Composer::concatenate`] and nested
/// [`PdfInput::Pages`] inputs.
pub(crate) fn concatenate_pages(
    renderer: &Renderer,
    pages: &PageSet,
    order: Option<&str>,
) -> Result<ResolvedDocument> {
    if pages.is_empty() {
        return Err(PdfComposeError::invalid_input("nothing to concatenate"));
    }
    let start = Instant::now();
    info!("Concatenating {} inputs", pages.len());

    let mut cleanup: Vec<TempArtifact> = Vec::new();
    let mut resolved: Vec<(PageKey, PathBuf)> = Vec::with_capacity(pages.len());
    for (key, page) in pages.iter() {
        let doc = input::resolve(renderer, page, &ToolOptions::default())?;
        debug!("{} → {}", key, doc.path().display());
        cleanup.extend(doc.cleanup_guard());
        resolved.push((key.clone(), doc.into_path()));
    }

    let tool = renderer.config().pdftk()?;
    let output = renderer.temps().new_temp_path("pdf")?;
    let args = command::pdftk_cat_args(&resolved, order, output.path())?;

    let result = invoke::run(&tool, &args);
    drop(cleanup);
    result?.check(PDFTK)?;

    let path = output.keep();
    info!(
        "Concatenated {} inputs → {} in {}ms",
        pages.len(),
        path.display(),
        start.elapsed().as_millis()
    );
    Ok(ResolvedDocument::pipeline(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn composer(root: &std::path::Path) -> Composer {
        let config = ComposerConfig::builder()
            .source(Arc::new(HashMap::<String, String>::new()))
            .temp_root(root)
            .build()
            .unwrap();
        Composer::new(config)
    }

    #[test]
    fn empty_page_set_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let err = composer(dir.path())
            .concatenate(&PageSet::new(), None)
            .unwrap_err();
        assert!(matches!(err, PdfComposeError::InvalidInput { .. }));
    }

    #[test]
    fn unconfigured_pdftk_fails_after_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("in.pdf");
        std::fs::write(&pdf, b"%PDF-1.4\n").unwrap();
        let err = composer(dir.path()).cat(pdf.as_path(), pdf.as_path()).unwrap_err();
        assert!(
            matches!(err, PdfComposeError::Configuration { ref key, .. } if key == "pdf.pdftk.path")
        );
        // Only the caller's file remains.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn non_pdf_input_is_rejected_before_anything_runs() {
        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("notes.txt");
        std::fs::write(&txt, b"hello").unwrap();
        let err = composer(dir.path())
            .stamp(
                &PdfInput::file(&txt),
                &PdfInput::file(&txt),
                &StampOptions::default(),
            )
            .unwrap_err();
        assert!(matches!(err, PdfComposeError::InvalidInput { .. }));
    }
}

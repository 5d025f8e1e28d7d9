//! Template rendering: markup → intermediate HTML files → wkhtmltopdf → PDF.
//!
//! ## Cleanup
//!
//! Each intermediate HTML file is held by a [`TempArtifact`] guard from the
//! moment it is created. The guards are dropped right after wkhtmltopdf
//! returns, whatever its exit status, and any early `?` return drops them
//! too, so no HTML file outlives the call. The output PDF has its own guard
//! that is only disarmed once the tool has succeeded.

use crate::config::ComposerConfig;
use crate::error::{PdfComposeError, Result};
use crate::options::ToolOptions;
use crate::pipeline::command::wkhtmltopdf_args;
use crate::pipeline::input::ResolvedDocument;
use crate::pipeline::invoke;
use crate::pipeline::temp::{TempArtifact, TempArtifacts};
use crate::template::Template;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Tool name used in logs and errors.
pub const WKHTMLTOPDF: &str = "wkhtmltopdf";

/// Renders templates to PDF with wkhtmltopdf.
#[derive(Debug, Clone)]
pub struct Renderer {
    config: ComposerConfig,
    temps: TempArtifacts,
}

impl Renderer {
    pub fn new(config: ComposerConfig) -> Self {
        let temps = TempArtifacts::new(&config.temp_root, config.temp_prefix.clone());
        Self { config, temps }
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    pub fn temps(&self) -> &TempArtifacts {
        &self.temps
    }

    /// Render `templates`, in order, into a single pipeline-owned PDF.
    pub fn render(
        &self,
        templates: &[Arc<dyn Template>],
        options: &ToolOptions,
    ) -> Result<ResolvedDocument> {
        if templates.is_empty() {
            return Err(PdfComposeError::invalid_input("no templates to render"));
        }
        let start = Instant::now();

        // ── Markup → intermediate files ──────────────────────────────────
        let mut html_files: Vec<TempArtifact> = Vec::with_capacity(templates.len());
        for (index, template) in templates.iter().enumerate() {
            let markup = template
                .render()
                .map_err(|e| PdfComposeError::TemplateRender {
                    index,
                    message: e.to_string(),
                })?;

            let html = self.temps.new_temp_path("html")?;
            std::fs::write(html.path(), markup.as_bytes())
                .map_err(|e| PdfComposeError::io(html.path(), e))?;
            debug!(
                "Template {} → {} ({} bytes)",
                index,
                html.path().display(),
                markup.len()
            );
            html_files.push(html);
        }

        // ── Command ──────────────────────────────────────────────────────
        let tool = self.config.wkhtmltopdf()?;
        let output = self.temps.new_temp_path("pdf")?;
        let inputs: Vec<PathBuf> = html_files.iter().map(|h| h.path().to_path_buf()).collect();
        let args = wkhtmltopdf_args(options, &inputs, output.path())?;

        // ── Run, clean up, classify ──────────────────────────────────────
        let result = invoke::run(&tool, &args);
        drop(html_files);
        result?.check(WKHTMLTOPDF)?;

        let path = output.keep();
        info!(
            "Rendered {} template(s) → {} in {}ms",
            templates.len(),
            path.display(),
            start.elapsed().as_millis()
        );
        Ok(ResolvedDocument::pipeline(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{HtmlTemplate, TemplateError};
    use std::collections::HashMap;

    struct Broken;

    impl Template for Broken {
        fn render(&self) -> std::result::Result<String, TemplateError> {
            Err("missing partial 'footer'".into())
        }
    }

    fn renderer(root: &std::path::Path, wkhtmltopdf: Option<&str>) -> Renderer {
        let mut map = HashMap::new();
        if let Some(p) = wkhtmltopdf {
            map.insert(
                crate::config::WKHTMLTOPDF_PATH_KEY.to_string(),
                p.to_string(),
            );
        }
        let config = ComposerConfig::builder()
            .source(Arc::new(map))
            .temp_root(root)
            .build()
            .unwrap();
        Renderer::new(config)
    }

    fn leftovers(root: &std::path::Path) -> usize {
        std::fs::read_dir(root).unwrap().count()
    }

    #[test]
    fn empty_template_list_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let r = renderer(dir.path(), Some("/bin/true"));
        assert!(matches!(
            r.render(&[], &ToolOptions::new()),
            Err(PdfComposeError::InvalidInput { .. })
        ));
    }

    #[test]
    fn failing_template_cleans_earlier_intermediates() {
        let dir = tempfile::tempdir().unwrap();
        let r = renderer(dir.path(), Some("/bin/true"));
        let templates: Vec<Arc<dyn Template>> =
            vec![Arc::new(HtmlTemplate::new("<p>ok</p>")), Arc::new(Broken)];
        let err = r.render(&templates, &ToolOptions::new()).unwrap_err();
        assert!(matches!(err, PdfComposeError::TemplateRender { index: 1, .. }));
        assert!(err.to_string().contains("footer"));
        assert_eq!(leftovers(dir.path()), 0);
    }

    #[test]
    fn missing_tool_path_cleans_intermediates() {
        let dir = tempfile::tempdir().unwrap();
        let r = renderer(dir.path(), None);
        let templates: Vec<Arc<dyn Template>> = vec![Arc::new(HtmlTemplate::new("<p/>"))];
        let err = r.render(&templates, &ToolOptions::new()).unwrap_err();
        assert!(matches!(err, PdfComposeError::Configuration { .. }));
        assert_eq!(leftovers(dir.path()), 0);
    }

    #[test]
    fn invalid_option_cleans_intermediates() {
        let dir = tempfile::tempdir().unwrap();
        let r = renderer(dir.path(), Some("/bin/true"));
        let templates: Vec<Arc<dyn Template>> = vec![Arc::new(HtmlTemplate::new("<p/>"))];
        let opts = ToolOptions::new().value("replace", "x");
        assert!(r.render(&templates, &opts).is_err());
        assert_eq!(leftovers(dir.path()), 0);
    }
}

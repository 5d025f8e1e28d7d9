//! Renderable templates: anything that can produce a page of markup.
//!
//! The pipeline treats a template as opaque: it calls [`Template::render`]
//! once, writes the returned HTML to an intermediate file, and hands that file
//! to wkhtmltopdf. Three implementations cover the common cases:
//!
//! * [`HtmlTemplate`]: markup already in memory.
//! * [`FileTemplate`]: markup read from disk at render time.
//! * [`MustacheTemplate`]: `{{name}}` placeholders filled from a JSON context.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;

/// Error type a template may return from [`Template::render`].
pub type TemplateError = Box<dyn std::error::Error + Send + Sync>;

/// An object capable of producing markup for one page or document.
pub trait Template: Send + Sync {
    fn render(&self) -> Result<String, TemplateError>;
}

impl fmt::Debug for dyn Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<dyn Template>")
    }
}

/// Markup held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlTemplate(pub String);

impl HtmlTemplate {
    pub fn new(html: impl Into<String>) -> Self {
        Self(html.into())
    }
}

impl Template for HtmlTemplate {
    fn render(&self) -> Result<String, TemplateError> {
        Ok(self.0.clone())
    }
}

/// Markup read from a file when rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTemplate {
    pub path: PathBuf,
}

impl FileTemplate {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Template for FileTemplate {
    fn render(&self) -> Result<String, TemplateError> {
        std::fs::read_to_string(&self.path)
            .map_err(|e| format!("cannot read '{}': {e}", self.path.display()).into())
    }
}

/// `{{{ name }}}` (raw) or `{{ name }}` (escaped); names are dotted JSON paths.
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\{\s*([A-Za-z0-9_.]+)\s*\}\}\}|\{\{\s*([A-Za-z0-9_.]+)\s*\}\}")
        .expect("placeholder regex is valid")
});

/// A logic-less template filled from a JSON context.
///
/// Only variable interpolation is supported: `{{ name }}` is HTML-escaped,
/// `{{{ name }}}` is inserted verbatim, and `a.b.c` walks nested objects (or
/// array indices). Missing values render as the empty string.
///
/// # Example
/// ```rust
/// use edgequake_pdfcompose::{MustacheTemplate, Template};
/// use serde_json::json;
///
/// let t = MustacheTemplate::new(
///     "<h1>{{ title }}</h1>{{{ body }}}",
///     json!({"title": "Q&A", "body": "<p>hi</p>"}),
/// );
/// assert_eq!(t.render().unwrap(), "<h1>Q&amp;A</h1><p>hi</p>");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MustacheTemplate {
    pub source: String,
    pub context: Value,
}

impl MustacheTemplate {
    pub fn new(source: impl Into<String>, context: Value) -> Self {
        Self {
            source: source.into(),
            context,
        }
    }

    fn lookup(&self, path: &str) -> Option<&Value> {
        path.split('.').try_fold(&self.context, |node, part| match node {
            Value::Object(map) => map.get(part),
            Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

impl Template for MustacheTemplate {
    fn render(&self) -> Result<String, TemplateError> {
        let rendered = PLACEHOLDER.replace_all(&self.source, |caps: &Captures<'_>| {
            if let Some(raw) = caps.get(1) {
                self.lookup(raw.as_str()).map(stringify).unwrap_or_default()
            } else {
                let name = caps.get(2).map_or("", |m| m.as_str());
                self.lookup(name)
                    .map(|v| escape_html(&stringify(v)))
                    .unwrap_or_default()
            }
        });
        Ok(rendered.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn html_template_returns_markup() {
        let t = HtmlTemplate::new("<p>x</p>");
        assert_eq!(t.render().unwrap(), "<p>x</p>");
    }

    #[test]
    fn file_template_missing_file_errors() {
        let t = FileTemplate::new("/definitely/not/here.html");
        let err = t.render().unwrap_err();
        assert!(err.to_string().contains("here.html"));
    }

    #[test]
    fn mustache_nested_and_missing() {
        let t = MustacheTemplate::new(
            "{{customer.name}} owes {{ total }} ({{missing}}) #{{items.1}}",
            json!({"customer": {"name": "Ann"}, "total": 12.5, "items": ["a", "b"]}),
        );
        assert_eq!(t.render().unwrap(), "Ann owes 12.5 () #b");
    }

    #[test]
    fn mustache_escapes_unless_triple() {
        let t = MustacheTemplate::new(
            "{{v}}|{{{v}}}",
            json!({"v": "<b>\"x\"</b>"}),
        );
        assert_eq!(
            t.render().unwrap(),
            "&lt;b&gt;&quot;x&quot;&lt;/b&gt;|<b>\"x\"</b>"
        );
    }
}

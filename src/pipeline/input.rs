//! Input resolution: normalise any accepted input shape to a PDF on disk.
//!
//! ## Why a closed enum?
//!
//! Every downstream operation (concatenate, stamp, burst) wants exactly one
//! thing: the path of a materialised PDF. [`PdfInput`] lists every shape a
//! caller may pass and [`resolve`] matches on it exhaustively, so adding a
//! shape is a compile error everywhere it must be handled.
//!
//! ## Ownership
//!
//! A [`ResolvedDocument`] remembers who owns the file. Caller-owned files are
//! never deleted by the pipeline; pipeline-owned files are intermediates that
//! the consuming operation deletes as soon as the tool has run.

use crate::error::{PdfComposeError, Result};
use crate::options::ToolOptions;
use crate::pipeline::command::PageKey;
use crate::pipeline::render::Renderer;
use crate::pipeline::temp::TempArtifact;
use crate::template::Template;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Leading bytes of every PDF file.
const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Something that can be turned into a PDF.
#[derive(Debug, Clone)]
pub enum PdfInput {
    /// An existing PDF on disk.
    File(PathBuf),
    /// One template, rendered to a PDF.
    Template(Arc<dyn Template>),
    /// Several templates rendered, in order, into one PDF.
    Templates(Vec<Arc<dyn Template>>),
    /// A keyed collection, concatenated into one PDF.
    Pages(PageSet),
}

impl PdfInput {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        PdfInput::File(path.into())
    }

    pub fn template(template: impl Template + 'static) -> Self {
        PdfInput::Template(Arc::new(template))
    }

    pub fn templates<T: Template + 'static>(templates: impl IntoIterator<Item = T>) -> Self {
        PdfInput::Templates(
            templates
                .into_iter()
                .map(|t| Arc::new(t) as Arc<dyn Template>)
                .collect(),
        )
    }

    /// Short human-readable description for error messages.
    pub fn describe(&self) -> String {
        match self {
            PdfInput::File(p) => format!("file '{}'", p.display()),
            PdfInput::Template(_) => "template".to_string(),
            PdfInput::Templates(ts) => format!("{} templates", ts.len()),
            PdfInput::Pages(ps) => format!("collection of {} inputs", ps.len()),
        }
    }
}

impl From<PathBuf> for PdfInput {
    fn from(path: PathBuf) -> Self {
        PdfInput::File(path)
    }
}

impl From<&Path> for PdfInput {
    fn from(path: &Path) -> Self {
        PdfInput::File(path.to_path_buf())
    }
}

impl From<&PathBuf> for PdfInput {
    fn from(path: &PathBuf) -> Self {
        PdfInput::File(path.clone())
    }
}

impl From<PageSet> for PdfInput {
    fn from(pages: PageSet) -> Self {
        PdfInput::Pages(pages)
    }
}

impl From<&str> for PdfInput {
    fn from(path: &str) -> Self {
        PdfInput::File(PathBuf::from(path))
    }
}

/// Who is responsible for deleting a resolved file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Supplied by the caller; never touched.
    Caller,
    /// Produced by the pipeline; deleted once consumed.
    Pipeline,
}

/// A path known to hold a materialised PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDocument {
    path: PathBuf,
    ownership: Ownership,
}

impl ResolvedDocument {
    pub(crate) fn caller(path: PathBuf) -> Self {
        Self {
            path,
            ownership: Ownership::Caller,
        }
    }

    pub(crate) fn pipeline(path: PathBuf) -> Self {
        Self {
            path,
            ownership: Ownership::Pipeline,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub fn is_pipeline_owned(&self) -> bool {
        self.ownership == Ownership::Pipeline
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }

    /// A guard that deletes the file on drop, or `None` for caller-owned files.
    pub(crate) fn cleanup_guard(&self) -> Option<TempArtifact> {
        self.is_pipeline_owned()
            .then(|| TempArtifact::file(self.path.clone()))
    }

    /// Delete the file if the pipeline owns it; a no-op otherwise.
    pub fn release(self) {
        drop(self.cleanup_guard());
    }

    /// Deliver the document to `dest`.
    ///
    /// Pipeline-owned files are moved (rename, or copy + delete across
    /// filesystems) and are deleted even when delivery fails. Caller-owned
    /// files are copied and left in place; persisting one onto itself is a
    /// no-op.
    pub fn persist_to(self, dest: impl AsRef<Path>) -> Result<PathBuf> {
        let dest = dest.as_ref();
        match self.ownership {
            Ownership::Caller => {
                if !same_file(&self.path, dest) {
                    std::fs::copy(&self.path, dest).map_err(|e| PdfComposeError::io(dest, e))?;
                }
            }
            Ownership::Pipeline => {
                let guard = TempArtifact::file(self.path.clone());
                if std::fs::rename(&self.path, dest).is_ok() {
                    guard.keep();
                } else {
                    std::fs::copy(&self.path, dest).map_err(|e| PdfComposeError::io(dest, e))?;
                }
            }
        }
        Ok(dest.to_path_buf())
    }
}

/// Whether `a` and `b` name the same existing file.
fn same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Check that `path` exists and starts with the PDF magic bytes.
pub fn check_pdf(path: &Path) -> Result<()> {
    let mut file = std::fs::File::open(path).map_err(|e| {
        let reason = match e.kind() {
            ErrorKind::NotFound => "does not exist".to_string(),
            ErrorKind::PermissionDenied => "is not readable".to_string(),
            _ => e.to_string(),
        };
        PdfComposeError::invalid_input(format!("'{}' {reason}", path.display()))
    })?;

    if !file.metadata().map(|m| m.is_file()).unwrap_or(false) {
        return Err(PdfComposeError::invalid_input(format!(
            "'{}' is not a regular file",
            path.display()
        )));
    }

    let mut magic = [0u8; 4];
    match file.read_exact(&mut magic) {
        Ok(()) if &magic == PDF_MAGIC => Ok(()),
        Ok(()) => Err(PdfComposeError::invalid_input(format!(
            "'{}' is not a PDF (first bytes: {magic:?})",
            path.display()
        ))),
        Err(_) => Err(PdfComposeError::invalid_input(format!(
            "'{}' is too short to be a PDF",
            path.display()
        ))),
    }
}

/// Resolve `input` to a PDF on disk.
///
/// * `File`: validated and returned as caller-owned.
/// * `Template` / `Templates`: rendered through `renderer` with `options`
///   and returned as pipeline-owned.
/// * `Pages`: concatenated in declaration order and returned as
///   pipeline-owned. Templates inside it use default options.
pub fn resolve(
    renderer: &Renderer,
    input: &PdfInput,
    options: &ToolOptions,
) -> Result<ResolvedDocument> {
    match input {
        PdfInput::File(path) => {
            check_pdf(path)?;
            debug!("Resolved caller-owned PDF: {}", path.display());
            Ok(ResolvedDocument::caller(path.clone()))
        }
        PdfInput::Template(t) => renderer.render(std::slice::from_ref(t), options),
        PdfInput::Templates(ts) if ts.is_empty() => Err(PdfComposeError::invalid_input(
            "empty template collection",
        )),
        PdfInput::Templates(ts) => renderer.render(ts, options),
        PdfInput::Pages(pages) => crate::compose::concatenate_pages(renderer, pages, None),
    }
}

/// Keyed inputs for a concatenation, in the order they were added.
///
/// # Example
/// ```rust
/// use edgequake_pdfcompose::{PageKey, PageSet, PdfInput};
///
/// let pages = PageSet::new()
///     .with("cover.pdf")
///     .with_key("BODY", "body.pdf");
/// let keys: Vec<String> = pages.keys().map(|k| k.handle()).collect();
/// assert_eq!(keys, vec!["A", "BODY"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PageSet {
    entries: Vec<(PageKey, PdfInput)>,
    positional: usize,
}

impl PageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional input; it receives the next letter.
    pub fn push(&mut self, input: impl Into<PdfInput>) {
        self.entries
            .push((PageKey::Index(self.positional), input.into()));
        self.positional += 1;
    }

    /// Append an input under an explicit key.
    pub fn insert(&mut self, key: impl Into<String>, input: impl Into<PdfInput>) {
        self.entries.push((PageKey::Named(key.into()), input.into()));
    }

    pub fn with(mut self, input: impl Into<PdfInput>) -> Self {
        self.push(input);
        self
    }

    pub fn with_key(mut self, key: impl Into<String>, input: impl Into<PdfInput>) -> Self {
        self.insert(key, input);
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = &PageKey> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PageKey, &PdfInput)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<I: Into<PdfInput>> FromIterator<I> for PageSet {
    fn from_iter<T: IntoIterator<Item = I>>(iter: T) -> Self {
        let mut set = PageSet::new();
        for input in iter {
            set.push(input);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(bytes).unwrap();
        f
    }

    #[test]
    fn accepts_pdf_magic() {
        let f = write_file(b"%PDF-1.4\n%%EOF\n");
        assert!(check_pdf(f.path()).is_ok());
    }

    #[test]
    fn rejects_non_pdf_and_missing() {
        let f = write_file(b"<html></html>");
        let err = check_pdf(f.path()).unwrap_err();
        assert!(err.to_string().contains("not a PDF"), "got: {err}");

        let short = write_file(b"%P");
        assert!(check_pdf(short.path()).is_err());

        let err = check_pdf(Path::new("/definitely/not/a/real/file.pdf")).unwrap_err();
        assert!(matches!(err, PdfComposeError::InvalidInput { .. }));
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_pdf(dir.path()).is_err());
    }

    #[test]
    fn release_leaves_caller_owned_files() {
        let f = write_file(b"%PDF-1.4");
        ResolvedDocument::caller(f.path().to_path_buf()).release();
        assert!(f.path().exists());
    }

    #[test]
    fn persist_moves_pipeline_owned() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.pdf");
        std::fs::write(&src, b"%PDF-1.4").unwrap();
        let dest = dir.path().join("dest.pdf");
        let out = ResolvedDocument::pipeline(src.clone())
            .persist_to(&dest)
            .unwrap();
        assert_eq!(out, dest);
        assert!(dest.exists());
        assert!(!src.exists());
    }

    #[test]
    fn persist_caller_owned_onto_itself_keeps_content() {
        let f = write_file(b"%PDF-1.4\n%%EOF\n");
        let out = ResolvedDocument::caller(f.path().to_path_buf())
            .persist_to(f.path())
            .unwrap();
        assert_eq!(out, f.path());
        assert_eq!(std::fs::read(f.path()).unwrap(), b"%PDF-1.4\n%%EOF\n");
    }

    #[test]
    fn persist_caller_owned_copies_and_leaves_source() {
        let f = write_file(b"%PDF-1.4\n");
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("copy.pdf");
        ResolvedDocument::caller(f.path().to_path_buf())
            .persist_to(&dest)
            .unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"%PDF-1.4\n");
        assert!(f.path().exists());
    }

    #[test]
    fn failed_persist_still_removes_pipeline_owned() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.pdf");
        std::fs::write(&src, b"%PDF-1.4").unwrap();
        let err = ResolvedDocument::pipeline(src.clone())
            .persist_to(dir.path().join("no/such/dir/out.pdf"))
            .unwrap_err();
        assert!(matches!(err, PdfComposeError::Io { .. }));
        assert!(!src.exists());
    }

    #[test]
    fn failed_persist_leaves_caller_owned() {
        let f = write_file(b"%PDF-1.4");
        let dir = tempfile::tempdir().unwrap();
        assert!(ResolvedDocument::caller(f.path().to_path_buf())
            .persist_to(dir.path().join("no/such/dir/out.pdf"))
            .is_err());
        assert_eq!(std::fs::read(f.path()).unwrap(), b"%PDF-1.4");
    }

    #[test]
    fn page_set_assigns_positional_letters_around_named_keys() {
        let pages: PageSet = vec!["a.pdf", "b.pdf"].into_iter().collect();
        let pages = pages.with_key("X", "x.pdf").with("c.pdf");
        let keys: Vec<String> = pages.keys().map(PageKey::handle).collect();
        assert_eq!(keys, vec!["A", "B", "X", "C"]);
        assert_eq!(pages.len(), 4);
    }
}

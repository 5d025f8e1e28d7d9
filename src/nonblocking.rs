//! Async wrappers for use inside a Tokio runtime.
//!
//! ## Why spawn_blocking?
//!
//! Every composition blocks until wkhtmltopdf or pdftk exits, which can take
//! seconds for a long document. Calling that directly from an async handler
//! would stall a Tokio worker thread. `tokio::task::spawn_blocking` moves the
//! work onto the pool meant for blocking operations.
//!
//! There is no cancellation: dropping the returned future does not kill the
//! external process, which runs to completion and cleans up after itself.

use crate::compose::{Composer, StampOptions};
use crate::error::{PdfComposeError, Result};
use crate::options::ToolOptions;
use crate::pipeline::input::{PageSet, PdfInput, ResolvedDocument};
use crate::template::Template;
use std::path::PathBuf;
use std::sync::Arc;

async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        PdfComposeError::io(
            PathBuf::new(),
            std::io::Error::other(format!("composition task failed: {e}")),
        )
    })?
}

/// Async [`Composer::render`].
pub async fn render(
    composer: &Composer,
    templates: Vec<Arc<dyn Template>>,
    options: ToolOptions,
) -> Result<ResolvedDocument> {
    let composer = composer.clone();
    blocking(move || composer.render(&templates, &options)).await
}

/// Async [`Composer::concatenate`].
pub async fn concatenate(
    composer: &Composer,
    pages: PageSet,
    order: Option<String>,
) -> Result<ResolvedDocument> {
    let composer = composer.clone();
    blocking(move || composer.concatenate(&pages, order.as_deref())).await
}

/// Async [`Composer::stamp`].
pub async fn stamp(
    composer: &Composer,
    foreground: PdfInput,
    background: PdfInput,
    options: StampOptions,
) -> Result<ResolvedDocument> {
    let composer = composer.clone();
    blocking(move || composer.stamp(&foreground, &background, &options)).await
}

/// Async [`Composer::burst`].
pub async fn burst(composer: &Composer, input: PdfInput) -> Result<PathBuf> {
    let composer = composer.clone();
    blocking(move || composer.burst(&input)).await
}

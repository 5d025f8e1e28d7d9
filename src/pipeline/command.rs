//! Argument vectors for wkhtmltopdf and pdftk.
//!
//! Pure functions: nothing here touches the filesystem or spawns anything,
//! which keeps argument ordering testable on machines without the tools.

use crate::error::{PdfComposeError, Result};
use crate::options::ToolOptions;
use std::collections::HashSet;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

/// Identifier for one input of a concatenation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PageKey {
    /// Positional input; 0 → `A`, 25 → `Z`, 26 → `AA`.
    Index(usize),
    /// Caller-supplied handle.
    Named(String),
}

impl PageKey {
    /// The pdftk handle for this key.
    pub fn handle(&self) -> String {
        match self {
            PageKey::Index(i) => index_to_letters(*i),
            PageKey::Named(name) => name.clone(),
        }
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.handle())
    }
}

fn index_to_letters(mut i: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (i % 26) as u8);
        if i < 26 {
            break;
        }
        i = i / 26 - 1;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// `<options…> <html…> <output>`
pub fn wkhtmltopdf_args(
    options: &ToolOptions,
    html_files: &[PathBuf],
    output: &Path,
) -> Result<Vec<OsString>> {
    let mut args: Vec<OsString> = options.to_args()?.into_iter().map(OsString::from).collect();
    args.extend(html_files.iter().map(|p| p.as_os_str().to_owned()));
    args.push(output.as_os_str().to_owned());
    Ok(args)
}

/// `<key>=<path>… cat <order> output <output>`
///
/// Without `order` the pages follow the sequence of `inputs`. With `order`
/// the expression is split on whitespace and passed through untouched, so
/// page ranges such as `A1-3 B A4-end` reach pdftk as written.
pub fn pdftk_cat_args(
    inputs: &[(PageKey, PathBuf)],
    order: Option<&str>,
    output: &Path,
) -> Result<Vec<OsString>> {
    let mut seen = HashSet::new();
    let mut args = Vec::with_capacity(inputs.len() * 2 + 3);
    let mut handles = Vec::with_capacity(inputs.len());

    for (key, path) in inputs {
        let handle = key.handle();
        if handle.is_empty() || handle.contains('=') || handle.chars().any(char::is_whitespace) {
            return Err(PdfComposeError::invalid_input(format!(
                "page key {handle:?} must be non-empty and contain no '=' or whitespace"
            )));
        }
        if !seen.insert(handle.clone()) {
            return Err(PdfComposeError::invalid_input(format!(
                "page key '{handle}' is used more than once"
            )));
        }
        let mut assignment = OsString::from(format!("{handle}="));
        assignment.push(path.as_os_str());
        args.push(assignment);
        handles.push(handle);
    }

    args.push("cat".into());
    match order {
        Some(expr) => {
            if expr.trim().is_empty() {
                return Err(PdfComposeError::invalid_input(
                    "page order expression is empty",
                ));
            }
            args.extend(expr.split_whitespace().map(OsString::from));
        }
        None => args.extend(handles.into_iter().map(OsString::from)),
    }
    args.push("output".into());
    args.push(output.as_os_str().to_owned());
    Ok(args)
}

/// `<background> stamp <foreground> output <output>`
pub fn pdftk_stamp_args(background: &Path, foreground: &Path, output: &Path) -> Vec<OsString> {
    vec![
        background.as_os_str().to_owned(),
        "stamp".into(),
        foreground.as_os_str().to_owned(),
        "output".into(),
        output.as_os_str().to_owned(),
    ]
}

/// `<input> burst output <pattern>`
pub fn pdftk_burst_args(input: &Path, pattern: &Path) -> Vec<OsString> {
    vec![
        input.as_os_str().to_owned(),
        "burst".into(),
        "output".into(),
        pattern.as_os_str().to_owned(),
    ]
}

//! Pipeline stages for PDF composition.
//!
//! Each submodule implements exactly one concern. Keeping stages separate
//! makes each independently testable; command construction in particular
//! can be checked on machines where neither tool is installed.
//!
//! ## Data Flow
//!
//! ```text
//! PdfInput ──▶ input ──▶ render ──▶ command ──▶ invoke ──▶ cleanup
//!              (resolve)  (wkhtmltopdf)  (argv)   (spawn)   (temp)
//! ```
//!
//! 1. [`input`]: validate existing PDFs, send templates to the renderer
//! 2. [`render`]: write markup to intermediates and run wkhtmltopdf
//! 3. [`command`]: build the argument vectors for both tools
//! 4. [`invoke`]: run a tool, capture merged output and exit status
//! 5. [`temp`]: collision-free temp names and scoped deletion

pub mod command;
pub mod input;
pub mod invoke;
pub mod render;
pub mod temp;

//! Subprocess invocation with merged output capture.
//!
//! The tool is executed directly from an argument vector. No shell is
//! involved, so arguments cannot be reinterpreted. The shell-escaped command
//! string is still assembled, argument by argument, because it is the most
//! useful thing to put in an error message: it can be pasted into a terminal
//! to reproduce the failure.
//!
//! stdout and stderr are pointed at the same anonymous temp file, so the
//! captured text keeps the interleaving a terminal would show (`2>&1`).

use crate::error::{PdfComposeError, Result};
use std::ffi::OsStr;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

/// What happened when a tool ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    /// Exit code; `None` if the process was killed by a signal.
    pub status: Option<i32>,
    /// Combined stdout and stderr.
    pub output: String,
    /// The escaped command line that was executed.
    pub command: String,
}

impl ToolResult {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Turn a failed run into an [`PdfComposeError::ExternalTool`] for `tool`.
    pub fn check(self, tool: &str) -> Result<Self> {
        if self.success() {
            return Ok(self);
        }
        Err(PdfComposeError::ExternalTool {
            tool: tool.to_string(),
            status: self.status,
            command: self.command,
            output: self.output,
        })
    }
}

/// Quote `arg` for a POSIX shell: `it's` becomes `'it'\''s'`.
pub fn shell_escape(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', r"'\''"))
}

/// Escape every element (executable included) and join with spaces.
pub fn command_line<S: AsRef<OsStr>>(executable: &Path, args: &[S]) -> String {
    std::iter::once(executable.as_os_str())
        .chain(args.iter().map(AsRef::as_ref))
        .map(|a| shell_escape(&a.to_string_lossy()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run `executable` with `args`, blocking until it exits.
///
/// A non-zero exit is *not* an error here; callers classify the
/// [`ToolResult`]. Errors are returned only when the process could not be
/// started (a missing executable is a configuration problem) or its output
/// could not be read back.
pub fn run<S: AsRef<OsStr>>(executable: &Path, args: &[S]) -> Result<ToolResult> {
    let command = command_line(executable, args);
    debug!("Running: {}", command);

    let mut capture = tempfile::tempfile().map_err(|e| PdfComposeError::io(executable, e))?;
    let stdout = capture
        .try_clone()
        .map_err(|e| PdfComposeError::io(executable, e))?;
    let stderr = capture
        .try_clone()
        .map_err(|e| PdfComposeError::io(executable, e))?;

    let status = Command::new(executable)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr))
        .status()
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => PdfComposeError::Configuration {
                key: executable.display().to_string(),
                message: format!("cannot execute tool: {e}"),
            },
            _ => PdfComposeError::io(executable, e),
        })?;

    let mut raw = Vec::new();
    capture
        .seek(SeekFrom::Start(0))
        .and_then(|_| capture.read_to_end(&mut raw))
        .map_err(|e| PdfComposeError::io(executable, e))?;
    let output = String::from_utf8_lossy(&raw).trim_end().to_string();

    debug!("Exit status {:?}, {} bytes of output", status.code(), raw.len());
    Ok(ToolResult {
        status: status.code(),
        output,
        command,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_single_quotes() {
        assert_eq!(shell_escape("plain"), "'plain'");
        assert_eq!(shell_escape("it's"), r"'it'\''s'");
        assert_eq!(shell_escape(""), "''");
    }

    #[test]
    fn command_line_escapes_executable_too() {
        let cmd = command_line(Path::new("/opt/my tools/pdftk"), &["A=/tmp/a b.pdf", "cat"]);
        assert_eq!(cmd, "'/opt/my tools/pdftk' 'A=/tmp/a b.pdf' 'cat'");
    }

    #[test]
    fn check_passes_success_through() {
        let r = ToolResult {
            status: Some(0),
            output: String::new(),
            command: "x".into(),
        };
        assert!(r.check("pdftk").is_ok());
    }

    #[test]
    fn check_classifies_failure() {
        let r = ToolResult {
            status: Some(1),
            output: "boom".into(),
            command: "'pdftk'".into(),
        };
        let err = r.check("pdftk").unwrap_err();
        assert!(matches!(
            err,
            PdfComposeError::ExternalTool { status: Some(1), ref output, .. } if output == "boom"
        ));
    }

    #[test]
    fn missing_executable_is_configuration_error() {
        let err = run(Path::new("/definitely/not/a/tool"), &["--version"]).unwrap_err();
        assert!(matches!(err, PdfComposeError::Configuration { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn captures_merged_output_and_status() {
        let r = run(
            Path::new("/bin/sh"),
            &["-c", "echo out; echo err 1>&2; exit 7"],
        )
        .unwrap();
        assert_eq!(r.status, Some(7));
        assert!(r.output.contains("out"));
        assert!(r.output.contains("err"));
        assert!(r.command.starts_with("'/bin/sh' '-c'"));
    }
}

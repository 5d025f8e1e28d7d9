//! CLI binary for edgequake-pdfcompose.
//!
//! A thin shim over the library crate that maps CLI flags to a
//! `ComposerConfig`, runs one operation and moves the result into place.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use edgequake_pdfcompose::config::{PDFTK_PATH_KEY, WKHTMLTOPDF_PATH_KEY};
use edgequake_pdfcompose::{
    Composer, ComposerConfig, FileTemplate, MustacheTemplate, OptionValue, PageSet, PdfInput,
    StampOptions, Template, ToolOptions,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Render two HTML pages into one PDF
  pdfcompose render cover.html body.html -o report.pdf

  # Pass wkhtmltopdf options
  pdfcompose render page.html -O toc -O copies=2 --replace DATE=2026-10-19 -o out.pdf

  # Fill a mustache template from JSON and append a static PDF
  pdfcompose cat invoice.mustache terms.pdf --data '{"total": "9,000.00"}' -o invoice.pdf

  # Reorder pages with a pdftk range expression
  pdfcompose cat a.pdf b.pdf --order "B A1-3" -o merged.pdf

  # Keyed inputs
  pdfcompose cat COVER=cover.pdf BODY=body.pdf --order "COVER BODY2-end" -o out.pdf

  # Watermark every page
  pdfcompose stamp draft.html report.pdf -o report-draft.pdf

  # One file per page
  pdfcompose burst report.pdf -o pages/

INPUTS:
  *.html, *.htm   rendered with wkhtmltopdf
  *.mustache      filled from --data, then rendered
  anything else   must be an existing PDF

ENVIRONMENT VARIABLES:
  WKHTMLTOPDF_PATH     Path to the wkhtmltopdf executable
  PDFTK_PATH           Path to the pdftk executable
  PDFCOMPOSE_TEMP_DIR  Directory for intermediate files
"#;

/// Compose PDFs from existing PDF files and HTML templates.
#[derive(Parser, Debug)]
#[command(
    name = "pdfcompose",
    version,
    about = "Compose PDFs from existing PDF files and HTML templates",
    long_about = "Render HTML templates with wkhtmltopdf, then concatenate, stamp or split \
PDFs with pdftk. Intermediate files are always cleaned up, even when a tool fails.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the wkhtmltopdf executable.
    #[arg(long, env = "WKHTMLTOPDF_PATH", global = true)]
    wkhtmltopdf: Option<PathBuf>,

    /// Path to the pdftk executable.
    #[arg(long, env = "PDFTK_PATH", global = true)]
    pdftk: Option<PathBuf>,

    /// Directory for intermediate files (default: system temp dir).
    #[arg(long, env = "PDFCOMPOSE_TEMP_DIR", global = true)]
    temp_dir: Option<PathBuf>,

    /// JSON context for *.mustache inputs.
    #[arg(long, global = true)]
    data: Option<String>,

    /// Print a JSON summary on stdout.
    #[arg(long, global = true)]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFCOMPOSE_VERBOSE", global = true)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFCOMPOSE_QUIET", global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render HTML/mustache templates into one PDF.
    Render {
        /// Template files, rendered in order.
        #[arg(required = true)]
        templates: Vec<PathBuf>,

        #[command(flatten)]
        render: RenderArgs,

        /// Output PDF.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Concatenate inputs (PDFs or templates) into one PDF.
    Cat {
        /// Inputs, optionally keyed as KEY=path.
        #[arg(required = true)]
        inputs: Vec<String>,

        /// pdftk page-order expression, e.g. "B A1-3".
        #[arg(long)]
        order: Option<String>,

        /// Output PDF.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Stamp FOREGROUND onto every page of BACKGROUND.
    Stamp {
        foreground: String,
        background: String,

        /// Options for both sides.
        #[command(flatten)]
        render: RenderArgs,

        /// wkhtmltopdf option for the foreground only, as KEY or KEY=VALUE.
        #[arg(long = "fg-option", value_name = "KEY[=VALUE]")]
        fg_options: Vec<String>,

        /// wkhtmltopdf option for the background only, as KEY or KEY=VALUE.
        #[arg(long = "bg-option", value_name = "KEY[=VALUE]")]
        bg_options: Vec<String>,

        /// Output PDF.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Split a PDF into one file per page.
    Burst {
        input: String,

        /// Output directory (created if missing).
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// wkhtmltopdf options shared by `render` and `stamp`.
#[derive(clap::Args, Debug, Default)]
struct RenderArgs {
    /// wkhtmltopdf option as KEY or KEY=VALUE (repeat KEY for several values).
    #[arg(short = 'O', long = "option", value_name = "KEY[=VALUE]")]
    options: Vec<String>,

    /// --replace pair as SEARCH=REPLACEMENT.
    #[arg(long, value_name = "SEARCH=REPLACEMENT")]
    replace: Vec<String>,

    /// JSON file with wkhtmltopdf options.
    #[arg(long)]
    options_json: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || cli.json {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let composer = Composer::new(build_config(&cli)?);
    let data = match cli.data.as_deref() {
        Some(raw) => serde_json::from_str(raw).context("--data is not valid JSON")?,
        None => Value::Object(Default::default()),
    };

    let start = Instant::now();
    let (operation, output) = match &cli.command {
        Commands::Render {
            templates,
            render,
            output,
        } => {
            let templates = templates
                .iter()
                .map(|p| {
                    template_for(p, &data)?
                        .with_context(|| format!("{} is not an HTML or mustache template", p.display()))
                })
                .collect::<Result<Vec<_>>>()?;
            let doc = composer
                .render(&templates, &render.to_options()?)
                .context("Rendering failed")?;
            ("render", doc.persist_to(output)?)
        }
        Commands::Cat {
            inputs,
            order,
            output,
        } => {
            let mut pages = PageSet::new();
            for raw in inputs {
                match split_key(raw) {
                    Some((key, path)) => pages.insert(key, parse_input(path, &data)?),
                    None => pages.push(parse_input(raw, &data)?),
                }
            }
            let doc = composer
                .concatenate(&pages, order.as_deref())
                .context("Concatenation failed")?;
            ("cat", doc.persist_to(output)?)
        }
        Commands::Stamp {
            foreground,
            background,
            render,
            fg_options,
            bg_options,
            output,
        } => {
            let options = stamp_options(render, fg_options, bg_options)?;
            let doc = composer
                .stamp(
                    &parse_input(foreground, &data)?,
                    &parse_input(background, &data)?,
                    &options,
                )
                .context("Stamping failed")?;
            ("stamp", doc.persist_to(output)?)
        }
        Commands::Burst { input, output } => {
            let dir = composer
                .burst(&parse_input(input, &data)?)
                .context("Splitting failed")?;
            move_dir(&dir, output)?;
            ("burst", output.clone())
        }
    };

    let duration_ms = start.elapsed().as_millis() as u64;
    if cli.json {
        let summary = json!({
            "operation": operation,
            "output": output,
            "duration_ms": duration_ms,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
        );
    } else {
        info!("{} → {} ({}ms)", operation, output.display(), duration_ms);
    }
    Ok(())
}

/// Map CLI args to `ComposerConfig`.
fn build_config(cli: &Cli) -> Result<ComposerConfig> {
    let mut paths = HashMap::new();
    if let Some(p) = &cli.wkhtmltopdf {
        paths.insert(WKHTMLTOPDF_PATH_KEY.to_string(), p.display().to_string());
    }
    if let Some(p) = &cli.pdftk {
        paths.insert(PDFTK_PATH_KEY.to_string(), p.display().to_string());
    }

    let mut builder = ComposerConfig::builder().source(Arc::new(paths));
    if let Some(dir) = &cli.temp_dir {
        builder = builder.temp_root(dir);
    }
    builder.build().context("Invalid configuration")
}

impl RenderArgs {
    fn to_options(&self) -> Result<ToolOptions> {
        let mut opts = match &self.options_json {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read options from {:?}", path))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("Invalid options JSON in {:?}", path))?
            }
            None => ToolOptions::new(),
        };

        add_options(&mut opts, &self.options);

        for raw in &self.replace {
            let Some((search, replacement)) = raw.split_once('=') else {
                bail!("--replace expects SEARCH=REPLACEMENT, got '{raw}'");
            };
            opts = opts.replace(search, replacement);
        }
        Ok(opts)
    }
}

/// Fold `KEY` / `KEY=VALUE` strings into `opts`; a repeated key becomes a list.
fn add_options(opts: &mut ToolOptions, raws: &[String]) {
    for raw in raws {
        let raw = raw.trim_start_matches("--");
        let Some((key, value)) = raw.split_once('=') else {
            opts.insert(raw, OptionValue::Flag(true));
            continue;
        };
        let value = value.to_string();
        let merged = match opts.get(key) {
            Some(OptionValue::Value(prev)) => OptionValue::List(vec![prev.clone(), value]),
            Some(OptionValue::List(prev)) => {
                let mut all = prev.clone();
                all.push(value);
                OptionValue::List(all)
            }
            _ => OptionValue::Value(value),
        };
        opts.insert(key, merged);
    }
}

/// Shared options first, then each side's own.
fn stamp_options(shared: &RenderArgs, fg: &[String], bg: &[String]) -> Result<StampOptions> {
    let mut foreground = shared.to_options()?;
    let mut background = foreground.clone();
    add_options(&mut foreground, fg);
    add_options(&mut background, bg);
    Ok(StampOptions {
        foreground,
        background,
    })
}

/// `KEY=path` where KEY is one or more ASCII uppercase letters.
fn split_key(raw: &str) -> Option<(&str, &str)> {
    let (key, path) = raw.split_once('=')?;
    (!key.is_empty() && key.chars().all(|c| c.is_ascii_uppercase())).then_some((key, path))
}

/// A template for `.html`, `.htm` and `.mustache` files; `None` otherwise.
fn template_for(path: &Path, data: &Value) -> Result<Option<Arc<dyn Template>>> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    Ok(match ext.as_str() {
        "html" | "htm" => Some(Arc::new(FileTemplate::new(path))),
        "mustache" => {
            let source = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read template {:?}", path))?;
            Some(Arc::new(MustacheTemplate::new(source, data.clone())))
        }
        _ => None,
    })
}

fn parse_input(raw: &str, data: &Value) -> Result<PdfInput> {
    let path = PathBuf::from(raw);
    Ok(match template_for(&path, data)? {
        Some(t) => PdfInput::Template(t),
        None => PdfInput::File(path),
    })
}

/// Move every file of `from` into `to`. `from` is removed whether or not
/// the move succeeds.
fn move_dir(from: &Path, to: &Path) -> Result<()> {
    let moved = move_entries(from, to);
    let removed =
        std::fs::remove_dir_all(from).with_context(|| format!("Failed to remove {:?}", from));
    moved.and(removed)
}

fn move_entries(from: &Path, to: &Path) -> Result<()> {
    std::fs::create_dir_all(to).with_context(|| format!("Failed to create {:?}", to))?;
    for entry in std::fs::read_dir(from).with_context(|| format!("Failed to read {:?}", from))? {
        let src = entry?.path();
        let Some(name) = src.file_name() else {
            continue;
        };
        let dest = to.join(name);
        if std::fs::rename(&src, &dest).is_err() {
            std::fs::copy(&src, &dest)
                .with_context(|| format!("Failed to copy {:?} to {:?}", src, dest))?;
        }
    }
    Ok(())
}

use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use contract_redline::config::{self, Config};
use contract_redline::diff::{self, ChangeRecord, ChangeStats};
use contract_redline::export;
use contract_redline::highlight::{self, HighlightSpan};
use contract_redline::markup;
use contract_redline::redline;
use contract_redline::session::{AiOutcome, AiResult, Session, SessionSettings};
use contract_redline::theme::Theme;
use contract_redline::ui::{highlights, text_view, Painter};

#[derive(Parser)]
#[command(name = "redline", about = "Diff, redline and highlight markdown contracts")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Theme name (e.g., paper, ink)
    #[arg(short, long, global = true)]
    theme: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable terminal colours
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Line-level comparison of two documents
    Diff {
        old: PathBuf,
        new: PathBuf,
        /// Only show changes with this many unchanged lines around them
        #[arg(long)]
        context: Option<usize>,
        /// Plain +/- output without colour
        #[arg(long)]
        unified: bool,
        /// Emit change records as JSON
        #[arg(long)]
        json: bool,
        /// Compare the rendered HTML blocks instead of markup lines
        #[arg(long)]
        rendered: bool,
    },
    /// Tracked-change HTML of NEW against OLD
    Redline {
        old: PathBuf,
        new: PathBuf,
        /// Wrap the fragment in a word-processor document
        #[arg(long = "export")]
        as_document: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Render a markdown document to HTML
    Render { file: PathBuf },
    /// Convert an HTML fragment back to markdown, dropping redline marks
    Markup { file: PathBuf },
    /// Re-emit a markdown document in canonical form
    Normalize { file: PathBuf },
    /// Mark analysis excerpts in a document
    Highlight {
        file: PathBuf,
        #[arg(short = 'e', long = "excerpt", required = true)]
        excerpts: Vec<String>,
        #[arg(long)]
        json: bool,
    },
    /// Apply an AI result (JSON) to a document and review the outcome
    Review {
        current: PathBuf,
        result: PathBuf,
        /// Accept a proposed modification
        #[arg(long)]
        accept: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Export a document as a .doc file
    Export {
        file: PathBuf,
        /// Original to redline against (defaults to the document itself)
        #[arg(long)]
        baseline: Option<PathBuf>,
        /// Export a redline instead of the clean document
        #[arg(long)]
        redline: bool,
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    /// List or select themes
    Theme {
        #[command(subcommand)]
        action: ThemeAction,
    },
}

#[derive(Subcommand)]
enum ThemeAction {
    List,
    Set { name: String },
}

#[derive(Serialize)]
struct DiffReport<'a> {
    stats: ChangeStats,
    records: Vec<&'a ChangeRecord<'a>>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    let theme_name = cli.theme.as_deref().unwrap_or(&config.theme);
    let theme = Theme::load(theme_name).unwrap_or_else(|e| {
        tracing::warn!(theme = theme_name, error = %e, "failed to load theme, using default");
        Theme::default_theme()
    });

    let color = !cli.no_color && io::stdout().is_terminal();
    let painter = Painter::new(&theme, color);
    let settings = SessionSettings::from_config(&config, &theme);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Diff {
            old,
            new,
            context,
            unified,
            json,
            rendered,
        } => {
            let old = read_document(&old)?;
            let new = read_document(&new)?;
            let old_blocks;
            let new_blocks;
            let records = if rendered {
                old_blocks = diff::split_rendered_blocks(&markup::to_rendered(&old));
                new_blocks = diff::split_rendered_blocks(&markup::to_rendered(&new));
                diff::align_rendered(&old_blocks, &new_blocks, settings.lookahead.blocks)
            } else {
                diff::align_lines(&old, &new, settings.lookahead.lines)
            };
            let stats = ChangeStats::from_records(&records);
            let visible: Vec<&ChangeRecord> = match context {
                Some(n) => diff::with_context(&records, n),
                None => records.iter().collect(),
            };

            if json {
                let report = DiffReport {
                    stats,
                    records: visible,
                };
                serde_json::to_writer_pretty(&mut out, &report)?;
                writeln!(out)?;
            } else if unified {
                let owned: Vec<ChangeRecord> = visible.into_iter().copied().collect();
                write!(out, "{}", diff::format_unified(&owned))?;
            } else {
                text_view::print_records(&mut out, &painter, &visible)?;
                text_view::print_summary(&mut out, &painter, stats.added, stats.removed)?;
            }
        }
        Command::Redline {
            old,
            new,
            as_document,
            output,
        } => {
            let old = read_document(&old)?;
            let new = read_document(&new)?;
            let fragment =
                redline::compose_document_view_with(&old, &new, &settings.lookahead, &settings.style);
            let html = if as_document {
                export::wrap_document(&export::document_title(&new), &fragment, &settings.style)
            } else {
                fragment
            };
            emit(&mut out, output.as_deref(), &html)?;
        }
        Command::Render { file } => {
            let doc = read_document(&file)?;
            write!(out, "{}", markup::to_rendered(&doc))?;
        }
        Command::Markup { file } => {
            let html = read_document(&file)?;
            writeln!(out, "{}", markup::to_markup(&html))?;
        }
        Command::Normalize { file } => {
            let doc = read_document(&file)?;
            writeln!(out, "{}", markup::normalize_markup(&doc))?;
        }
        Command::Highlight {
            file,
            excerpts,
            json,
        } => {
            let doc = read_document(&file)?;
            let spans =
                highlight::apply_highlights_with_limit(&doc, &excerpts, settings.excerpt_limit);
            print_spans(&mut out, &painter, &spans, json)?;
        }
        Command::Review {
            current,
            result: result_path,
            accept,
            output,
        } => {
            let doc = read_document(&current)?;
            let raw = read_document(&result_path)?;
            let result: AiResult = serde_json::from_str(&raw).with_context(|| {
                format!("Failed to parse AI result {}", result_path.display())
            })?;

            let mut session = Session::new(settings);
            session.import(doc);
            match session.apply_ai_result(result) {
                AiOutcome::Analysis => {
                    print_spans(&mut out, &painter, &session.highlight_spans(), false)?;
                }
                AiOutcome::NoChange => {
                    eprintln!("No change: the result matches the document.");
                }
                AiOutcome::Applied => {
                    emit(&mut out, output.as_deref(), session.current())?;
                }
                AiOutcome::Proposed if accept => {
                    session.accept();
                    emit(&mut out, output.as_deref(), session.current())?;
                }
                AiOutcome::Proposed => {
                    if let Some(records) = session.text_view() {
                        let stats = ChangeStats::from_records(&records);
                        let refs: Vec<&ChangeRecord> = records.iter().collect();
                        text_view::print_records(&mut out, &painter, &refs)?;
                        text_view::print_summary(&mut out, &painter, stats.added, stats.removed)?;
                    }
                }
            }
        }
        Command::Export {
            file,
            baseline,
            redline,
            dir,
        } => {
            let doc = read_document(&file)?;
            let artifact = if redline {
                let base = match baseline {
                    Some(path) => read_document(&path)?,
                    None => doc.clone(),
                };
                export::export_redline(&base, &doc, &settings.lookahead, &settings.style)
            } else {
                export::export_clean(&doc, &settings.style)
            };
            let path = artifact.write_to(&dir)?;
            writeln!(out, "{}", path.display())?;
        }
        Command::Theme { action } => match action {
            ThemeAction::List => {
                for name in Theme::list_available() {
                    let marker = if name == theme_name { "*" } else { " " };
                    writeln!(out, "{marker} {name}")?;
                }
            }
            ThemeAction::Set { name } => {
                Theme::load(&name)?;
                let path = cli.config.clone().unwrap_or_else(Config::default_path);
                config::save_theme(&name, &path)?;
                writeln!(out, "Theme set to {name} in {}", path.display())?;
            }
        },
    }

    out.flush()?;
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(io::stderr)
                .with_target(true),
        )
        .init();
}

fn read_document(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn emit<W: Write>(out: &mut W, path: Option<&Path>, content: &str) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => write!(out, "{content}")?,
    }
    Ok(())
}

fn print_spans<W: Write>(
    out: &mut W,
    painter: &Painter<'_>,
    spans: &[HighlightSpan],
    json: bool,
) -> Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, spans)?;
        writeln!(out)?;
    } else {
        highlights::print_spans(out, painter, spans)?;
    }
    Ok(())
}

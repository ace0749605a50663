use super::collect_inputs;
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use trellis_editor::{collect_diagnostics, load, DiagnosticLevel, EditorError, TypeRegistry};
use trellis_parser::format_error;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Markup file or directory (defaults to the configured source directory)
    pub path: Option<PathBuf>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

#[derive(Debug, Default)]
struct Totals {
    files: usize,
    errors: usize,
    warnings: usize,
}

pub fn check(args: CheckArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let registry = Arc::new(config.type_registry(cwd)?);
    let files = collect_inputs(args.path.as_deref(), &config, cwd)?;

    println!("🔍 {} {} files", "Checking".green().bold(), files.len());

    let mut totals = Totals::default();
    for file in &files {
        check_file(file, &registry, &args.format, &mut totals)?;
    }

    println!();
    println!("   Files checked: {}", totals.files);
    if totals.errors > 0 {
        println!("   {} {}", "Errors:".red(), totals.errors);
    }
    if totals.warnings > 0 {
        println!("   {} {}", "Warnings:".yellow(), totals.warnings);
    }
    if totals.errors == 0 && totals.warnings == 0 {
        println!("   {} No issues found!", "✓".green());
    }

    if totals.errors > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn check_file(file: &Path, registry: &Arc<TypeRegistry>, format: &str, totals: &mut Totals) -> Result<()> {
    let source = fs::read_to_string(file)?;
    let name = file.to_string_lossy();
    totals.files += 1;

    let doc = match load(&source, Some(file.to_path_buf()), Arc::clone(registry)) {
        Ok(doc) => doc,
        Err(EditorError::Parse(err)) => {
            eprintln!("{}", format_error(&source, &name, &err));
            totals.errors += 1;
            return Ok(());
        }
        Err(EditorError::Load { message, span }) => {
            eprintln!("{} {}:{} {}", "✗".red(), name, span.start, message);
            totals.errors += 1;
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    let diagnostics = collect_diagnostics(&doc);
    debug!(file = %name, diagnostics = diagnostics.len(), "Checked");
    if diagnostics.is_empty() {
        return Ok(());
    }

    for diagnostic in &diagnostics {
        match diagnostic.level {
            DiagnosticLevel::Error => totals.errors += 1,
            DiagnosticLevel::Warning => totals.warnings += 1,
        }
    }

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&diagnostics)?);
        return Ok(());
    }

    println!("{}", file.display());
    for diagnostic in &diagnostics {
        let level = match diagnostic.level {
            DiagnosticLevel::Error => "error".red().bold(),
            DiagnosticLevel::Warning => "warning".yellow().bold(),
        };
        let subject = diagnostic
            .node
            .map(|node| match doc.identifier(node) {
                Some(id) => format!("{} #{}", doc.node(node).label(), id),
                None => doc.node(node).label(),
            })
            .unwrap_or_default();
        println!("  {} [{}] {} {}", level, diagnostic.rule, diagnostic.message, subject.dimmed());
    }
    Ok(())
}

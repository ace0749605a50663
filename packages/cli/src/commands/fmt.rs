use super::collect_inputs;
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use trellis_editor::{load, save_with};

#[derive(Args, Debug)]
pub struct FmtArgs {
    /// Markup file or directory (defaults to the configured source directory)
    pub path: Option<PathBuf>,

    /// Report files that would change without writing them
    #[arg(long)]
    pub check: bool,
}

pub fn fmt(args: FmtArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let registry = Arc::new(config.type_registry(cwd)?);
    let editor_config = config.editor_config();
    let files = collect_inputs(args.path.as_deref(), &config, cwd)?;

    let mut changed = 0;
    let mut failed = 0;
    for file in &files {
        let source = fs::read_to_string(file)?;
        let doc = match load(&source, Some(file.clone()), Arc::clone(&registry)) {
            Ok(doc) => doc,
            Err(e) => {
                failed += 1;
                eprintln!("  {} {} - {}", "✗".red(), file.display(), e);
                continue;
            }
        };

        let formatted = save_with(&doc, &editor_config);
        if formatted == source {
            continue;
        }
        changed += 1;
        if args.check {
            println!("  {} {}", "~".yellow(), file.display());
        } else {
            fs::write(file, formatted)?;
            println!("  {} {}", "✓".green(), file.display());
        }
    }

    println!();
    let verb = if args.check { "would change" } else { "formatted" };
    println!("   {} of {} files {}", changed, files.len(), verb);
    if failed > 0 {
        println!("   {} {}", "Failed:".red(), failed);
    }

    if failed > 0 || (args.check && changed > 0) {
        std::process::exit(1);
    }
    Ok(())
}

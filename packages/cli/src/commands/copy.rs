use crate::config::Config;
use anyhow::{anyhow, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use trellis_editor::{encode, is_encodable, load_file};

#[derive(Args, Debug)]
pub struct CopyArgs {
    /// Markup file to copy from
    pub file: PathBuf,

    /// Identifiers of the nodes to copy
    #[arg(required = true)]
    pub ids: Vec<String>,
}

/// Print the clipboard archive of the named nodes
pub fn copy(args: CopyArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let registry = Arc::new(config.type_registry(cwd)?);
    let doc = load_file(&PathBuf::from(cwd).join(&args.file), registry)?;

    let nodes = args
        .ids
        .iter()
        .map(|id| doc.lookup(id).ok_or_else(|| anyhow!("No node with x:id \"{}\"", id)))
        .collect::<Result<Vec<_>>>()?;
    if !is_encodable(&doc, &nodes) {
        return Err(anyhow!("Selected nodes cannot be copied"));
    }

    let archive = encode(&doc, &nodes)?;
    println!("{}", archive.to_json()?);
    Ok(())
}

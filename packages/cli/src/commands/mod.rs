pub mod check;
pub mod copy;
pub mod fmt;
pub mod init;

pub use check::{check, CheckArgs};
pub use copy::{copy, CopyArgs};
pub use fmt::{fmt, FmtArgs};
pub use init::{init, InitArgs};

use crate::config::Config;
use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Markup files named by `input`, or under the configured source directory
pub(crate) fn collect_inputs(input: Option<&Path>, config: &Config, cwd: &str) -> Result<Vec<PathBuf>> {
    let root = match input {
        Some(path) => PathBuf::from(cwd).join(path),
        None => config.get_src_dir(cwd),
    };

    if root.is_file() {
        Ok(vec![root])
    } else if root.is_dir() {
        Ok(find_markup_files(&root, &config.extension))
    } else {
        Err(anyhow!("Input path does not exist: {}", root.display()))
    }
}

fn find_markup_files(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|e| e == extension))
        .collect();
    files.sort();
    files
}

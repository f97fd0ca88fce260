use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use tracing::debug;
use walkdir::WalkDir;

/// Filename suffixes, matched case-insensitively. `mov` carries no leading dot
/// and so also matches names like `clipmov`.
pub const SUFFIXES: [&str; 11] = [
    ".png", ".jpg", ".jpeg", ".gif", ".bmp", ".tiff", ".svg", ".mp4", ".mkv", ".avi", "mov",
];

pub fn has_media_suffix(file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    SUFFIXES.iter().any(|suffix| lower.ends_with(suffix))
}

/// Immediate regular files of `source` with a media suffix, in directory
/// listing order, minus `exclude`.
pub fn list_candidates(source: &Path, exclude: Option<&Path>) -> Result<Vec<PathBuf>> {
    let entries = WalkDir::new(source)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Cannot list {}", source.display()))?;

    let exclude = exclude.map(canonical);

    let candidates = entries
        .into_iter()
        .map(|entry| entry.into_path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .map(|name| has_media_suffix(&name.to_string_lossy()))
                .unwrap_or(false)
        })
        .filter(|path| match &exclude {
            Some(excluded) if canonical(path) == *excluded => {
                debug!("Skipping running program: {}", path.display());
                false
            }
            _ => true,
        })
        .collect();

    Ok(candidates)
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

use std::{
    io::{BufRead, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

/// Folder created under the chosen base to hold the day buckets.
pub const DEST_SUBFOLDER: &str = "FotoOrganizzate";

pub fn destination_root(base: &Path) -> PathBuf {
    base.join(DEST_SUBFOLDER)
}

/// Asks for the base folder on `output`, reads one line from `input`.
/// A blank answer (or end of input) selects `default_base`.
pub fn ask_destination_root<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    default_base: &Path,
) -> Result<PathBuf> {
    writeln!(
        output,
        "Enter the path where the '{DEST_SUBFOLDER}' folder should be created (press Enter to use the current folder):"
    )?;
    write!(output, "> ")?;
    output.flush()?;

    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("Cannot read destination path")?;

    let answer = line.trim();
    let base = if answer.is_empty() {
        default_base.to_path_buf()
    } else {
        PathBuf::from(answer)
    };

    Ok(destination_root(&base))
}

use std::{env, io, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use organizer::Organizer;
use tracing::{instrument, Level};

pub mod candidates;
pub mod counter;
pub mod date;
pub mod organizer;
pub mod prompt;

#[derive(Parser)]
#[command(name = "daybucket")]
#[command(version = "0.1.0")]
#[command(about = "Moves the photos and videos of the current folder into one folder per day", long_about = None)]
pub struct Cli {
    /// Base folder for the organized tree, skips the prompt. Defaults to the current folder.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print diagnostic logs.
    #[arg(short, long)]
    verbose: bool,
}

#[instrument(skip_all)]
fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(io::stderr)
        .init();

    let source = env::current_dir().context("Cannot determine the current folder")?;

    let output = match cli.output {
        Some(base) => prompt::destination_root(&base),
        None => prompt::ask_destination_root(&mut io::stdin().lock(), &mut io::stdout(), &source)?,
    };

    let mut o = Organizer::new(&source, &output);
    if let Ok(program) = env::current_exe() {
        o = o.exclude(program);
    }
    o.run()?;

    Ok(())
}

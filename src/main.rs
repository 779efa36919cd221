use anyhow::Context;
use clap::Parser;
use downsize::{render_summary, render_summary_kv, Cli, RunConfig, SummaryFormat, TreeWalker};
use log::LevelFilter;
use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;

const DEFAULT_SOURCE: &str = ".";

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .parse_default_env()
        .init();

    let source = match cli.source {
        Some(source) => source,
        None => prompt_for_source().context("Failed to read source directory")?,
    };

    let config = RunConfig {
        source,
        destination: cli.dest,
        max_size: cli.max_size,
        quality: cli.quality,
        algorithm: cli.filter.into(),
        show_progress: !cli.no_progress,
    };

    let summary = TreeWalker::new(config).run().context("Run aborted")?;

    match cli.summary_format {
        SummaryFormat::Text => println!("{}", render_summary(&summary)),
        SummaryFormat::Kv => println!("{}", render_summary_kv(&summary)),
    }

    Ok(())
}

/// Asks for the source directory on an interactive terminal; a blank answer
/// or a non-interactive stdin falls back to the default.
fn prompt_for_source() -> std::io::Result<PathBuf> {
    let stdin = std::io::stdin();
    if !stdin.is_terminal() {
        return Ok(PathBuf::from(DEFAULT_SOURCE));
    }

    print!("Enter source directory (default: {}): ", DEFAULT_SOURCE);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    stdin.lock().read_line(&mut answer)?;
    let answer = answer.trim();

    Ok(PathBuf::from(if answer.is_empty() {
        DEFAULT_SOURCE
    } else {
        answer
    }))
}

mod cli;
mod report;

use std::io::{self, BufWriter, Read, Write};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, OutputFormat};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    if verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_writer(io::stderr)
            .init();
    }
}

fn read_input(cli: &Cli) -> Result<Vec<u8>> {
    if cli.reads_stdin() {
        let mut data = Vec::new();
        io::stdin()
            .lock()
            .read_to_end(&mut data)
            .context("failed to read profile from stdin")?;
        Ok(data)
    } else {
        std::fs::read(&cli.path)
            .with_context(|| format!("failed to read {}", cli.path.display()))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let data = read_input(&cli)?;
    let profile = cpuprof_core::normalize(&data)
        .with_context(|| format!("failed to normalize {}", cli.path.display()))?;
    let result = cpuprof_core::analyze(&profile, &cli.options());

    let mut out = BufWriter::new(io::stdout().lock());
    match cli.format {
        OutputFormat::Json if cli.pretty => serde_json::to_writer_pretty(&mut out, &result)?,
        OutputFormat::Json => serde_json::to_writer(&mut out, &result)?,
        OutputFormat::Text => report::write_text(&mut out, &result)?,
    }
    if cli.format == OutputFormat::Json {
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

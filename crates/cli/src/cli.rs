use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use cpuprof_core::AnalyzeOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Full analysis result as JSON
    Json,
    /// Hotspot and critical path summary
    Text,
}

#[derive(Parser, Debug)]
#[command(name = "cpuprof")]
#[command(version)]
#[command(about = "Analyze a V8 CPU profile: hotspots, call tree, and critical paths", long_about = None)]
pub struct Cli {
    /// Profile to read (.cpuprofile, Chromium trace, or gzip of either); `-` reads stdin
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Minimum self percent for a function to be listed as a hotspot
    #[arg(short, long, default_value_t = 1.0)]
    pub threshold: f64,

    /// Maximum number of hotspots to report
    #[arg(long, default_value_t = 20)]
    pub max_hotspots: usize,

    /// Maximum number of critical paths to report
    #[arg(long, default_value_t = 5)]
    pub max_paths: usize,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Log normalization and analysis details to stderr (filter with RUST_LOG)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn options(&self) -> AnalyzeOptions {
        AnalyzeOptions {
            hotspot_threshold: self.threshold,
            max_hotspots: self.max_hotspots,
            max_paths: self.max_paths,
        }
    }

    pub fn reads_stdin(&self) -> bool {
        self.path.as_os_str() == "-"
    }
}

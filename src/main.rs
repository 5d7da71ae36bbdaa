mod config;
mod data;
mod error;
mod pipeline;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use config::{parse_delimiter, Config};

/// Extract NRM and fitted-component tables from Remasoft `.rs3` files and
/// average them per site.
#[derive(Parser, Debug)]
#[command(name = "rusty-nrm", version, about)]
struct Cli {
    /// JSON configuration file; flags below override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory searched for .rs3 files (default: current directory).
    #[arg(long, global = true)]
    base: Option<PathBuf>,

    /// Directory for the output tables (default: the base directory).
    #[arg(long, global = true)]
    out: Option<PathBuf>,

    /// Character separating site and specimen in sample names.
    #[arg(long, global = true, value_parser = parse_delimiter)]
    delimiter: Option<char>,

    /// Fail tables whose sites are not contiguous.
    #[arg(long, global = true)]
    strict: bool,

    /// Number of log-spaced histogram bin edges.
    #[arg(long, global = true)]
    bins: Option<usize>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Write NRM_<Folder>.txt and Summary_Components_<Folder>.txt.
    Extract,
    /// Write Mean_Int_<table>.txt for every NRM and components table.
    Summarize,
    /// Write Hist_<table>.txt intensity bins for every NRM table.
    Stats,
    /// Extract, summarize and compute stats (the default).
    All,
}

impl Cli {
    fn into_config(self) -> Result<(Config, Command)> {
        let mut config = match &self.config {
            Some(path) => Config::from_json_file(path)?,
            None => Config::default(),
        };
        if let Some(base) = self.base {
            config.base_dir = base;
        }
        if let Some(out) = self.out {
            config.output_dir = Some(out);
        }
        if let Some(delimiter) = self.delimiter {
            config.site_delimiter = delimiter;
        }
        if self.strict {
            config.strict_sites = true;
        }
        if let Some(bins) = self.bins {
            config.histogram_bins = bins;
        }
        config.validate()?;
        Ok((config, self.command.unwrap_or(Command::All)))
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let (config, command) = Cli::parse()
        .into_config()
        .context("loading configuration")?;
    info!(
        "Base {}, output {}, site delimiter {:?}",
        config.base_dir.display(),
        config.output_dir().display(),
        config.site_delimiter
    );

    run(&config, command)
}

/// Run the stages `command` selects. A summarize failure does not stop the
/// stats stage; it is reported once stats are written.
fn run(config: &Config, command: Command) -> Result<()> {
    if matches!(command, Command::Extract | Command::All) {
        pipeline::extract(config)?;
    }
    let summarized = if matches!(command, Command::Summarize | Command::All) {
        pipeline::summarize(config).map(drop)
    } else {
        Ok(())
    };
    if matches!(command, Command::Stats | Command::All) {
        pipeline::distribution(config)?;
    }
    summarized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from(["rusty-nrm", "summarize", "--delimiter", "_", "--strict"]);
        let (config, command) = cli.into_config().unwrap();
        assert_eq!(command, Command::Summarize);
        assert_eq!(config.site_delimiter, '_');
        assert!(config.strict_sites);
        assert_eq!(config.histogram_bins, 50);
    }

    #[test]
    fn no_command_runs_everything() {
        let cli = Cli::parse_from(["rusty-nrm", "--base", "data"]);
        let (config, command) = cli.into_config().unwrap();
        assert_eq!(command, Command::All);
        assert_eq!(config.output_dir(), std::path::Path::new("data"));
    }

    #[test]
    fn strict_failure_still_writes_histograms() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config {
            base_dir: dir.path().to_path_buf(),
            strict_sites: true,
            ..Config::default()
        };
        std::fs::write(
            dir.path().join("NRM_X.txt"),
            "Sample,Sdec,Idec,Bdec,BInc,NRM_(A/m)\nA-1,1,2,3,4,1.0\nB-1,1,2,3,4,2.0\nA-2,1,2,3,4,3.0\n",
        )
        .unwrap();

        assert!(run(&config, Command::Summarize).is_err());
        assert!(run(&config, Command::All).is_err());
        assert!(!dir.path().join("Mean_Int_NRM_X.txt").exists());
        assert!(dir.path().join("Hist_NRM_X.txt").exists());
    }

    #[test]
    fn multi_char_delimiter_is_rejected() {
        assert!(Cli::try_parse_from(["rusty-nrm", "--delimiter", "ab"]).is_err());
    }
}

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Design-storm hydrographs for a small basin, optionally routed through a
/// detention pond
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Scenario file (TOML)
    pub scenario: PathBuf,

    /// Directory the CSV outputs are written to
    #[arg(short, long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Worker threads for per-duration computation
    #[arg(long, default_value_t = num_cpus::get())]
    pub threads: usize,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Hide progress bars
    #[arg(long)]
    pub no_progress: bool,
}

pub fn get_args() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["storm-ponds", "basin.toml"]).unwrap();
        assert_eq!(args.scenario, PathBuf::from("basin.toml"));
        assert_eq!(args.output_dir, PathBuf::from("output"));
        assert_eq!(args.log_format, LogFormat::Text);
        assert!(args.threads >= 1);
        assert!(!args.no_progress);
    }

    #[test]
    fn test_flags() {
        let args = Args::try_parse_from([
            "storm-ponds",
            "basin.toml",
            "-o",
            "runs/a",
            "--threads",
            "2",
            "--log-format",
            "json",
            "--no-progress",
        ])
        .unwrap();
        assert_eq!(args.output_dir, PathBuf::from("runs/a"));
        assert_eq!(args.threads, 2);
        assert_eq!(args.log_format, LogFormat::Json);
        assert!(args.no_progress);
    }

    #[test]
    fn test_unknown_log_format_rejected() {
        assert!(Args::try_parse_from(["storm-ponds", "basin.toml", "--log-format", "xml"]).is_err());
    }
}

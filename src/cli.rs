//! CLI argument parsing for Norscope

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Output format for the generated report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pivoted CSV report (the stable schema downstream tooling reads)
    Csv,
    /// JSON mirror of the same data for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "norscope")]
#[command(version)]
#[command(
    about = "SPI NOR flash benchmark analyzer with datasheet-backed chip identification",
    long_about = None
)]
pub struct Cli {
    /// Benchmark results log (as written by the firmware to the SD card)
    #[arg(long = "results", value_name = "FILE", default_value = "RESULTS.CSV")]
    pub results: PathBuf,

    /// Vendor datasheet catalogue
    #[arg(long = "catalog", value_name = "FILE", default_value = "datasheet.csv")]
    pub catalog: PathBuf,

    /// Report destination ("-" for stdout)
    #[arg(
        short = 'o',
        long = "output",
        value_name = "FILE",
        default_value = "report.csv"
    )]
    pub output: PathBuf,

    /// JEDEC id observed on the device, in any punctuation (e.g. "0xBF 26 41")
    #[arg(long = "jedec", value_name = "HEX")]
    pub jedec: Option<String>,

    /// SPI clock the benchmarks ran at, in Hz (0 = unknown, disables read matching)
    #[arg(long = "sck-hz", value_name = "HZ", default_value = "0")]
    pub sck_hz: u64,

    /// Device capacity in bytes (0 = unknown; falls back to the catalogue row
    /// matching --jedec)
    #[arg(long = "capacity-bytes", value_name = "BYTES", default_value = "0")]
    pub capacity_bytes: u64,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "csv")]
    pub format: OutputFormat,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["norscope"]);
        assert_eq!(cli.results, PathBuf::from("RESULTS.CSV"));
        assert_eq!(cli.catalog, PathBuf::from("datasheet.csv"));
        assert_eq!(cli.output, PathBuf::from("report.csv"));
        assert!(cli.jedec.is_none());
        assert_eq!(cli.sck_hz, 0);
        assert_eq!(cli.capacity_bytes, 0);
        assert_eq!(cli.format, OutputFormat::Csv);
        assert!(!cli.debug);
    }

    #[test]
    fn test_cli_device_context_flags() {
        let cli = Cli::parse_from([
            "norscope",
            "--jedec",
            "0xBF2641",
            "--sck-hz",
            "10000000",
            "--capacity-bytes",
            "2097152",
        ]);
        assert_eq!(cli.jedec.as_deref(), Some("0xBF2641"));
        assert_eq!(cli.sck_hz, 10_000_000);
        assert_eq!(cli.capacity_bytes, 2_097_152);
    }

    #[test]
    fn test_cli_format_json() {
        let cli = Cli::parse_from(["norscope", "--format", "json"]);
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn test_cli_stdout_output() {
        let cli = Cli::parse_from(["norscope", "-o", "-"]);
        assert_eq!(cli.output, PathBuf::from("-"));
    }

    #[test]
    fn test_cli_custom_paths() {
        let cli = Cli::parse_from([
            "norscope",
            "--results",
            "/tmp/r.csv",
            "--catalog",
            "/tmp/d.csv",
            "--output",
            "/tmp/out.csv",
        ]);
        assert_eq!(cli.results, PathBuf::from("/tmp/r.csv"));
        assert_eq!(cli.catalog, PathBuf::from("/tmp/d.csv"));
        assert_eq!(cli.output, PathBuf::from("/tmp/out.csv"));
    }

    #[test]
    fn test_cli_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["norscope", "--format", "xml"]).is_err());
    }

    #[test]
    fn test_cli_debug_flag() {
        let cli = Cli::parse_from(["norscope", "--debug"]);
        assert!(cli.debug);
    }
}

// downsize/src/cli.rs
use crate::core::{ResizeAlgorithm, DEFAULT_JPEG_QUALITY, DEFAULT_MAX_SIZE};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "downsize")]
#[command(about = "Mirror a photo tree, downscaling images larger than a bound", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Source directory (prompted for when omitted)
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// Destination directory for the mirrored tree
    #[arg(short, long, default_value = "resized")]
    pub dest: PathBuf,

    /// Longest allowed side in pixels
    #[arg(short = 'm', long, default_value_t = DEFAULT_MAX_SIZE)]
    pub max_size: u32,

    /// JPEG quality used when re-encoding (1-100)
    #[arg(short, long, default_value_t = DEFAULT_JPEG_QUALITY)]
    pub quality: u8,

    /// Resampling filter
    #[arg(short, long, value_enum, default_value_t = Algorithm::Lanczos3)]
    pub filter: Algorithm,

    /// How the final summary is printed
    #[arg(long, value_enum, default_value_t = SummaryFormat::Text)]
    pub summary_format: SummaryFormat,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Algorithm {
    Nearest,
    Bilinear,
    Bicubic,
    Lanczos3,
}

impl From<Algorithm> for ResizeAlgorithm {
    fn from(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Nearest => ResizeAlgorithm::Nearest,
            Algorithm::Bilinear => ResizeAlgorithm::Bilinear,
            Algorithm::Bicubic => ResizeAlgorithm::Bicubic,
            Algorithm::Lanczos3 => ResizeAlgorithm::Lanczos3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SummaryFormat {
    /// Tabulated block for people
    Text,
    /// Single key=value line for scripts
    Kv,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cli = Cli::try_parse_from(["downsize"]).unwrap();
        assert_eq!(cli.source, None);
        assert_eq!(cli.dest, PathBuf::from("resized"));
        assert_eq!(cli.max_size, 1500);
        assert_eq!(cli.quality, 95);
        assert_eq!(cli.filter, Algorithm::Lanczos3);
        assert_eq!(cli.summary_format, SummaryFormat::Text);
    }

    #[test]
    fn parses_explicit_flags() {
        let cli = Cli::try_parse_from([
            "downsize",
            "--source",
            "photos",
            "--dest",
            "out",
            "--max-size",
            "800",
            "--filter",
            "bicubic",
            "--summary-format",
            "kv",
        ])
        .unwrap();
        assert_eq!(cli.source, Some(PathBuf::from("photos")));
        assert_eq!(cli.max_size, 800);
        assert_eq!(ResizeAlgorithm::from(cli.filter), ResizeAlgorithm::Bicubic);
        assert_eq!(cli.summary_format, SummaryFormat::Kv);
    }

    #[test]
    fn rejects_non_numeric_max_size() {
        assert!(Cli::try_parse_from(["downsize", "--max-size", "big"]).is_err());
    }
}

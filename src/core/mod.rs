// downsize/src/core/mod.rs
pub mod processor;

use image::ImageFormat;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_MAX_SIZE: u32 = 1500;
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeAlgorithm {
    Nearest,
    Bilinear,
    Bicubic,
    Lanczos3,
}

/// Container format of a source image, as detected from its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
    Bmp,
    Tiff,
    WebP,
    Other(ImageFormat),
}

impl ImageKind {
    pub fn from_format(format: ImageFormat) -> Self {
        match format {
            ImageFormat::Jpeg => ImageKind::Jpeg,
            ImageFormat::Png => ImageKind::Png,
            ImageFormat::Gif => ImageKind::Gif,
            ImageFormat::Bmp => ImageKind::Bmp,
            ImageFormat::Tiff => ImageKind::Tiff,
            ImageFormat::WebP => ImageKind::WebP,
            other => ImageKind::Other(other),
        }
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            ImageKind::Jpeg => ImageFormat::Jpeg,
            ImageKind::Png => ImageFormat::Png,
            ImageKind::Gif => ImageFormat::Gif,
            ImageKind::Bmp => ImageFormat::Bmp,
            ImageKind::Tiff => ImageFormat::Tiff,
            ImageKind::WebP => ImageFormat::WebP,
            ImageKind::Other(format) => format,
        }
    }
}

/// What a single header read tells us about a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDescriptor {
    pub width: u32,
    pub height: u32,
    pub format: ImageKind,
    /// TIFF-structured EXIF payload, when the format carries one.
    pub exif: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizePlan {
    pub target_width: u32,
    pub target_height: u32,
    pub needs_resize: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingOutcome {
    Copied,
    Resized,
    Failed(String),
}

/// Run-level totals, folded from one outcome per supported file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub processed: usize,
    pub resized: usize,
    pub copied: usize,
    pub failed: usize,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub failures: Vec<(PathBuf, String)>,
}

impl Summary {
    pub fn new(source: &Path, destination: &Path) -> Self {
        Self {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            ..Default::default()
        }
    }

    /// Folds one file's outcome into the totals. Byte counts only apply to
    /// successful files.
    pub fn record(
        mut self,
        path: &Path,
        outcome: &ProcessingOutcome,
        bytes_in: u64,
        bytes_out: u64,
    ) -> Self {
        match outcome {
            ProcessingOutcome::Copied => {
                self.processed += 1;
                self.copied += 1;
            }
            ProcessingOutcome::Resized => {
                self.processed += 1;
                self.resized += 1;
            }
            ProcessingOutcome::Failed(reason) => {
                self.failed += 1;
                self.failures.push((path.to_path_buf(), reason.clone()));
                return self;
            }
        }
        self.bytes_in += bytes_in;
        self.bytes_out += bytes_out;
        self
    }

    pub fn counts(&self) -> (usize, usize, usize, usize) {
        (self.processed, self.resized, self.copied, self.failed)
    }
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub max_size: u32,
    pub quality: u8,
    pub algorithm: ResizeAlgorithm,
    pub show_progress: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("."),
            destination: PathBuf::from("resized"),
            max_size: DEFAULT_MAX_SIZE,
            quality: DEFAULT_JPEG_QUALITY,
            algorithm: ResizeAlgorithm::Lanczos3,
            show_progress: true,
        }
    }
}

impl RunConfig {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>, max_size: u32) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            max_size,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_size == 0 || self.max_size > 100_000 {
            return Err(DownsizeError::InvalidParameter(
                "Max size must be between 1 and 100,000 pixels".to_string(),
            ));
        }

        if self.quality == 0 || self.quality > 100 {
            return Err(DownsizeError::InvalidParameter(
                "Quality must be between 1 and 100".to_string(),
            ));
        }

        if !self.source.exists() {
            return Err(DownsizeError::SourceMissing(self.source.clone()));
        }

        if !self.source.is_dir() {
            return Err(DownsizeError::InvalidParameter(format!(
                "Source path is not a directory: {}",
                self.source.display()
            )));
        }

        if self.destination.exists() && !self.destination.is_dir() {
            return Err(DownsizeError::InvalidParameter(format!(
                "Destination exists but is not a directory: {}",
                self.destination.display()
            )));
        }

        if self.source == self.destination {
            return Err(DownsizeError::InvalidParameter(
                "Source and destination directories cannot be the same".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum DownsizeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Source directory does not exist: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Metadata error: {0}")]
    Metadata(String),
}

impl DownsizeError {
    /// Errors that reject the whole run rather than a single file.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            DownsizeError::SourceMissing(_) | DownsizeError::InvalidParameter(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DownsizeError>;

mod cli;
mod core;
mod processors;
mod utils;

pub use cli::{Algorithm, Cli, SummaryFormat};
pub use crate::core::processor::FileProcessor;
pub use crate::core::{
    DownsizeError, ImageDescriptor, ImageKind, ProcessingOutcome, ResizeAlgorithm, ResizePlan,
    Result, RunConfig, Summary, DEFAULT_JPEG_QUALITY, DEFAULT_MAX_SIZE,
};
pub use processors::{
    collect_image_paths, compute_resize_plan, exif_support, render_summary, render_summary_kv,
    Compressor, ExifSupport, ForwardedTag, Loader, MetadataProcessor, Resizer, SourceMetadata,
    TreeWalker,
};
pub use utils::{
    calculate_savings, format_file_size, is_supported_format, mirror_path, SUPPORTED_EXTENSIONS,
};

pub mod prelude {
    pub use crate::{
        compute_resize_plan, FileProcessor, ProcessingOutcome, ResizePlan, RunConfig, Summary,
        TreeWalker,
    };
}

// downsize/src/processors/mod.rs
mod compressor;
mod loader;
mod metadata;
mod resizer;
mod walker;

pub use compressor::{Compressor, SourceMetadata};
pub use loader::Loader;
pub use metadata::{exif_support, ExifSupport, ForwardedTag, MetadataProcessor};
pub use resizer::{compute_resize_plan, Resizer};
pub use walker::{collect_image_paths, render_summary, render_summary_kv, TreeWalker};

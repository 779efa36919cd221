// downsize/src/core/processor.rs
use super::{ImageDescriptor, ProcessingOutcome, ResizePlan, Result, RunConfig};
use crate::processors::{Compressor, Loader, Resizer, SourceMetadata};
use std::fs::{File, FileTimes};
use std::path::Path;

/// Applies a resize plan to one file: a byte copy when the image already
/// fits, otherwise decode, resample and re-encode in the source format.
pub struct FileProcessor {
    loader: Loader,
    resizer: Resizer,
    compressor: Compressor,
}

impl FileProcessor {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            loader: Loader::new(),
            resizer: Resizer::new(config.algorithm),
            compressor: Compressor::new(config.quality),
        }
    }

    pub fn loader(&self) -> &Loader {
        &self.loader
    }

    /// Never fails: every error becomes `ProcessingOutcome::Failed`, left for
    /// the caller to report. `data` holds the source file's bytes, already read
    /// for the descriptor. Returns the outcome and the bytes written to `dest`.
    pub fn apply_plan(
        &self,
        data: &[u8],
        source: &Path,
        dest: &Path,
        plan: &ResizePlan,
        descriptor: &ImageDescriptor,
    ) -> (ProcessingOutcome, u64) {
        match self.try_apply(data, source, dest, plan, descriptor) {
            Ok(applied) => applied,
            Err(e) => (ProcessingOutcome::Failed(e.to_string()), 0),
        }
    }

    fn try_apply(
        &self,
        data: &[u8],
        source: &Path,
        dest: &Path,
        plan: &ResizePlan,
        descriptor: &ImageDescriptor,
    ) -> Result<(ProcessingOutcome, u64)> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }

        if !plan.needs_resize {
            let written = std::fs::copy(source, dest)?;
            copy_file_times(source, dest)?;
            return Ok((ProcessingOutcome::Copied, written));
        }

        let image = self.loader.decode(data, descriptor.format)?;
        let resized = self.resizer.apply(&image, plan);

        let metadata = SourceMetadata {
            exif: descriptor.exif.as_deref(),
            original: data,
        };
        let written = self
            .compressor
            .save(&resized, descriptor.format, &metadata, dest)?;

        Ok((ProcessingOutcome::Resized, written))
    }
}

/// Gives `dest` the access and modification times of `source`.
fn copy_file_times(source: &Path, dest: &Path) -> Result<()> {
    let metadata = std::fs::metadata(source)?;
    let times = FileTimes::new()
        .set_accessed(metadata.accessed()?)
        .set_modified(metadata.modified()?);
    File::options().write(true).open(dest)?.set_times(times)?;
    Ok(())
}

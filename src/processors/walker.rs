// downsize/src/processors/walker.rs
use crate::core::processor::FileProcessor;
use crate::core::{DownsizeError, ProcessingOutcome, Result, RunConfig, Summary};
use crate::processors::compute_resize_plan;
use crate::utils::{format_file_size, is_supported_format, mirror_path};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Mirrors a source tree into a destination, one file at a time.
pub struct TreeWalker {
    config: RunConfig,
    processor: FileProcessor,
}

impl TreeWalker {
    pub fn new(config: RunConfig) -> Self {
        let processor = FileProcessor::new(&config);
        Self { config, processor }
    }

    /// Walks the source tree and returns the folded summary. Only a rejected
    /// configuration is an error; per-file problems land in the summary.
    pub fn run(&self) -> Result<Summary> {
        self.config.validate()?;

        std::fs::create_dir_all(&self.config.destination)?;
        let source_root = self.config.source.canonicalize()?;
        let dest_root = self.config.destination.canonicalize()?;
        if source_root == dest_root {
            return Err(DownsizeError::InvalidParameter(
                "Source and destination directories cannot be the same".to_string(),
            ));
        }

        let image_paths = collect_image_paths(&source_root, &dest_root);

        log::info!("Source: {}", self.config.source.display());
        log::info!("Destination: {}", self.config.destination.display());
        log::info!("Max size: {}px", self.config.max_size);

        if image_paths.is_empty() {
            log::warn!("No image files found in {}", self.config.source.display());
        }

        let pb = self.create_progress_bar(image_paths.len());
        let mut current_dir: Option<PathBuf> = None;

        let summary = image_paths.iter().fold(
            Summary::new(&self.config.source, &self.config.destination),
            |summary, path| {
                if path.parent() != current_dir.as_deref() {
                    current_dir = path.parent().map(Path::to_path_buf);
                    pb.suspend(|| log::info!("Processing folder: {}", parent_display(path)));
                }

                let Some(dest) = mirror_path(path, &source_root, &dest_root) else {
                    pb.inc(1);
                    return summary;
                };

                let (outcome, bytes_in, bytes_out) = self.process_file(path, &dest, &pb);
                pb.inc(1);
                summary.record(path, &outcome, bytes_in, bytes_out)
            },
        );

        pb.finish_and_clear();
        Ok(summary)
    }

    fn process_file(
        &self,
        path: &Path,
        dest: &Path,
        pb: &ProgressBar,
    ) -> (ProcessingOutcome, u64, u64) {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        pb.set_message(name.clone());

        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                pb.suspend(|| log::warn!("Error reading {}: {}", path.display(), e));
                return (ProcessingOutcome::Failed(e.to_string()), 0, 0);
            }
        };
        let bytes_in = data.len() as u64;

        let descriptor = match self.processor.loader().describe(&data, path) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                pb.suspend(|| log::warn!("Error processing {}: {}", path.display(), e));
                return (ProcessingOutcome::Failed(e.to_string()), bytes_in, 0);
            }
        };

        pb.suspend(|| {
            log::info!(
                "Processing: {} ({}x{})",
                name,
                descriptor.width,
                descriptor.height
            );
            if let Some(orientation) = descriptor
                .exif
                .as_deref()
                .and_then(|block| self.processor.loader().metadata().orientation(block))
            {
                log::debug!("  Original EXIF orientation: {}", orientation);
            }
        });

        let plan = compute_resize_plan(descriptor.width, descriptor.height, self.config.max_size);
        let (outcome, bytes_out) =
            self.processor.apply_plan(&data, path, dest, &plan, &descriptor);

        pb.suspend(|| match &outcome {
            ProcessingOutcome::Copied => log::info!("  -> Copied (no resize needed)"),
            ProcessingOutcome::Resized => log::info!(
                "  -> Resized to {}x{} ({} -> {})",
                plan.target_width,
                plan.target_height,
                format_file_size(bytes_in),
                format_file_size(bytes_out)
            ),
            ProcessingOutcome::Failed(reason) => log::warn!("  -> Failed: {}", reason),
        });

        (outcome, bytes_in, bytes_out)
    }

    fn create_progress_bar(&self, total: usize) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(total as u64);
        match ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
        {
            Ok(style) => pb.set_style(style.progress_chars("#>-")),
            Err(e) => log::debug!("Falling back to default progress style: {}", e),
        }
        pb
    }
}

/// Supported files under `source_root`, sorted by name, skipping anything
/// inside `dest_root` when the destination is nested in the source.
pub fn collect_image_paths(source_root: &Path, dest_root: &Path) -> Vec<PathBuf> {
    WalkDir::new(source_root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.path() != dest_root)
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| is_supported_format(entry.path()))
        .map(|entry| entry.into_path())
        .collect()
}

fn parent_display(path: &Path) -> String {
    path.parent()
        .map(|parent| parent.display().to_string())
        .unwrap_or_default()
}

/// Renders the end-of-run block shown to the user.
pub fn render_summary(summary: &Summary) -> String {
    let rule = "=".repeat(50);
    let mut out = String::new();
    out.push_str(&format!("\n{}\nPROCESSING SUMMARY\n{}\n", rule, rule));
    out.push_str(&format!("{:<28}{}\n", "Total images processed:", summary.processed));
    out.push_str(&format!("{:<28}{}\n", "Images resized:", summary.resized));
    out.push_str(&format!("{:<28}{}\n", "Images copied (no resize):", summary.copied));
    out.push_str(&format!("{:<28}{}\n", "Images failed:", summary.failed));
    out.push_str(&format!(
        "{:<28}{} -> {} ({:.1}% saved)\n",
        "Size:",
        format_file_size(summary.bytes_in),
        format_file_size(summary.bytes_out),
        crate::utils::calculate_savings(summary.bytes_in, summary.bytes_out)
    ));
    out.push_str(&format!("{:<28}{}\n", "Source:", summary.source.display()));
    out.push_str(&format!("{:<28}{}\n", "Destination:", summary.destination.display()));
    for (path, reason) in &summary.failures {
        out.push_str(&format!("  failed: {}: {}\n", path.display(), reason));
    }
    out
}

/// One `key=value` line for scripts.
pub fn render_summary_kv(summary: &Summary) -> String {
    format!(
        "processed={} resized={} copied={} failed={} bytes_in={} bytes_out={} source={} destination={}",
        summary.processed,
        summary.resized,
        summary.copied,
        summary.failed,
        summary.bytes_in,
        summary.bytes_out,
        summary.source.display(),
        summary.destination.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn collect_skips_nested_destination_and_other_files() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("sub")).unwrap();
        std::fs::create_dir_all(root.join("out")).unwrap();
        for name in ["b.JPG", "a.png", "sub/c.webp", "out/d.jpg", "notes.txt"] {
            std::fs::write(root.join(name), b"x").unwrap();
        }

        let paths = collect_image_paths(root, &root.join("out"));
        let relative: Vec<_> = paths
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            relative,
            vec![
                PathBuf::from("a.png"),
                PathBuf::from("b.JPG"),
                PathBuf::from("sub/c.webp"),
            ]
        );
    }

    #[test]
    fn kv_summary_is_single_line() {
        let summary = Summary::new(Path::new("in"), Path::new("out")).record(
            Path::new("in/a.png"),
            &ProcessingOutcome::Copied,
            3,
            3,
        );
        let line = render_summary_kv(&summary);
        assert!(!line.contains('\n'));
        assert!(line.starts_with("processed=1 resized=0 copied=1 failed=0"));
        assert!(line.ends_with("source=in destination=out"));
    }

    #[test]
    fn text_summary_lists_failures() {
        let summary = Summary::new(Path::new("in"), Path::new("out")).record(
            Path::new("in/bad.jpg"),
            &ProcessingOutcome::Failed("Decode error: nope".to_string()),
            3,
            0,
        );
        let text = render_summary(&summary);
        assert!(text.contains("Images failed:              1"));
        assert!(text.contains("failed: in/bad.jpg: Decode error: nope"));
    }
}

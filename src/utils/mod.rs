// downsize/src/utils/mod.rs
use std::path::{Path, PathBuf};

pub const SUPPORTED_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "gif", "bmp", "tiff", "webp"];

pub fn is_supported_format(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Maps `path` under `source_root` to the same relative location under
/// `dest_root`. Returns `None` when `path` is not inside `source_root`.
pub fn mirror_path(path: &Path, source_root: &Path, dest_root: &Path) -> Option<PathBuf> {
    let relative = path.strip_prefix(source_root).ok()?;
    Some(dest_root.join(relative))
}

pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let base = 1024_f64;
    let bytes_f64 = bytes as f64;
    let exponent = ((bytes_f64.log10() / base.log10()).floor() as usize).min(UNITS.len() - 1);
    let size = bytes_f64 / base.powi(exponent as i32);

    format!("{:.2} {}", size, UNITS[exponent])
}

pub fn calculate_savings(before: u64, after: u64) -> f64 {
    if before == 0 {
        return 0.0;
    }

    let savings = (before as f64 - after as f64) / before as f64 * 100.0;
    savings.clamp(0.0, 100.0)
}

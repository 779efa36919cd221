// downsize/src/processors/loader.rs
use crate::core::{DownsizeError, ImageDescriptor, ImageKind, Result};
use crate::processors::MetadataProcessor;
use image::{DynamicImage, ImageReader};
use std::io::Cursor;
use std::path::Path;

pub struct Loader {
    metadata: MetadataProcessor,
}

impl Loader {
    pub fn new() -> Self {
        Self {
            metadata: MetadataProcessor::new(),
        }
    }

    /// Reads the header of an in-memory image: dimensions, detected format
    /// and any EXIF block. Pixel data is not decoded.
    pub fn describe(&self, data: &[u8], path: &Path) -> Result<ImageDescriptor> {
        let name = display_name(path);

        if data.is_empty() {
            return Err(DownsizeError::Decode(format!("File is empty: {}", name)));
        }

        let reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
        let format = reader.format().ok_or_else(|| {
            DownsizeError::Decode(format!("Unrecognised image format: {}", name))
        })?;
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| DownsizeError::Decode(format!("Failed to read header: {}", e)))?;

        if width == 0 || height == 0 {
            return Err(DownsizeError::Decode(format!(
                "Image has no pixels: {}x{}",
                width, height
            )));
        }

        let kind = ImageKind::from_format(format);
        let exif = self.metadata.extract(kind, data, &name);

        Ok(ImageDescriptor {
            width,
            height,
            format: kind,
            exif,
        })
    }

    pub fn metadata(&self) -> &MetadataProcessor {
        &self.metadata
    }

    pub fn decode(&self, data: &[u8], kind: ImageKind) -> Result<DynamicImage> {
        let mut reader = ImageReader::new(Cursor::new(data));
        reader.set_format(kind.image_format());

        let image = reader
            .decode()
            .map_err(|e| DownsizeError::Decode(format!("Failed to decode image: {}", e)))?;

        log::debug!(
            "Decoded image: {}x{} pixels, color: {:?}",
            image.width(),
            image.height(),
            image.color()
        );

        Ok(image)
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

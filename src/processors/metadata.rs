// downsize/src/processors/metadata.rs
use crate::core::{DownsizeError, ImageKind, Result};
use exif::{Exif, In, Reader, Tag, Value};
use img_parts::jpeg::Jpeg;
use img_parts::webp::WebP;
use img_parts::{Bytes, ImageEXIF};
use std::io::Cursor;

/// Per-format EXIF capability. Formats without an EXIF container report
/// `None` instead of failing.
pub trait ExifSupport {
    /// Returns the TIFF-structured EXIF payload found in `data`.
    fn try_extract_exif(&self, data: &[u8]) -> Result<Option<Vec<u8>>>;
}

struct JpegExif;
struct WebPExif;
struct TiffExif;
struct NoExif;

impl ExifSupport for JpegExif {
    fn try_extract_exif(&self, data: &[u8]) -> Result<Option<Vec<u8>>> {
        let jpeg = Jpeg::from_bytes(Bytes::copy_from_slice(data))
            .map_err(|e| DownsizeError::Metadata(format!("JPEG segments: {}", e)))?;
        Ok(jpeg.exif().map(|exif| exif.to_vec()))
    }
}

impl ExifSupport for WebPExif {
    fn try_extract_exif(&self, data: &[u8]) -> Result<Option<Vec<u8>>> {
        let webp = WebP::from_bytes(Bytes::copy_from_slice(data))
            .map_err(|e| DownsizeError::Metadata(format!("WebP chunks: {}", e)))?;
        Ok(webp.exif().map(|exif| exif.to_vec()))
    }
}

impl ExifSupport for TiffExif {
    // A TIFF file is its own EXIF container: the primary IFD holds the tags.
    fn try_extract_exif(&self, data: &[u8]) -> Result<Option<Vec<u8>>> {
        match Reader::new().read_from_container(&mut Cursor::new(data)) {
            Ok(exif) => Ok(Some(exif.buf().to_vec())),
            Err(exif::Error::NotFound(_)) => Ok(None),
            Err(e) => Err(DownsizeError::Metadata(format!("TIFF directory: {}", e))),
        }
    }
}

impl ExifSupport for NoExif {
    fn try_extract_exif(&self, _data: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }
}

pub fn exif_support(kind: ImageKind) -> &'static dyn ExifSupport {
    match kind {
        ImageKind::Jpeg => &JpegExif,
        ImageKind::WebP => &WebPExif,
        ImageKind::Tiff => &TiffExif,
        ImageKind::Png | ImageKind::Gif | ImageKind::Bmp | ImageKind::Other(_) => &NoExif,
    }
}

/// A primary-IFD value that can be written into a freshly encoded TIFF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardedTag {
    Orientation(u16),
    Text(tiff::tags::Tag, String),
}

const FORWARDED_TEXT_TAGS: [(Tag, tiff::tags::Tag); 7] = [
    (Tag::ImageDescription, tiff::tags::Tag::ImageDescription),
    (Tag::Make, tiff::tags::Tag::Make),
    (Tag::Model, tiff::tags::Tag::Model),
    (Tag::Software, tiff::tags::Tag::Software),
    (Tag::DateTime, tiff::tags::Tag::DateTime),
    (Tag::Artist, tiff::tags::Tag::Artist),
    (Tag::Copyright, tiff::tags::Tag::Copyright),
];

pub struct MetadataProcessor;

impl MetadataProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Extracts the EXIF block for `kind`. Extraction problems are logged and
    /// treated as "no EXIF" so the file can still be processed.
    pub fn extract(&self, kind: ImageKind, data: &[u8], name: &str) -> Option<Vec<u8>> {
        match exif_support(kind).try_extract_exif(data) {
            Ok(Some(block)) => {
                log::debug!("Found {} bytes of EXIF data in {}", block.len(), name);
                Some(block)
            }
            Ok(None) => None,
            Err(e) => {
                log::warn!("Could not read EXIF data from {}: {}", name, e);
                None
            }
        }
    }

    pub fn parse(&self, block: &[u8]) -> Result<Exif> {
        Reader::new()
            .read_raw(block.to_vec())
            .map_err(|e| DownsizeError::Metadata(format!("EXIF parse error: {}", e)))
    }

    pub fn orientation(&self, block: &[u8]) -> Option<u32> {
        let exif = self.parse(block).ok()?;
        exif.get_field(Tag::Orientation, In::PRIMARY)?
            .value
            .get_uint(0)
    }

    /// Orientation plus the descriptive ASCII tags of the primary IFD.
    pub fn tiff_tags(&self, block: &[u8]) -> Result<Vec<ForwardedTag>> {
        let exif = self.parse(block)?;
        let mut tags = Vec::new();

        if let Some(orientation) = exif
            .get_field(Tag::Orientation, In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .and_then(|value| u16::try_from(value).ok())
        {
            tags.push(ForwardedTag::Orientation(orientation));
        }

        for (exif_tag, tiff_tag) in FORWARDED_TEXT_TAGS {
            let Some(field) = exif.get_field(exif_tag, In::PRIMARY) else {
                continue;
            };
            if let Value::Ascii(ref parts) = field.value {
                if let Some(text) = parts.first() {
                    let text = String::from_utf8_lossy(text)
                        .trim_end_matches('\0')
                        .to_string();
                    if !text.is_empty() {
                        tags.push(ForwardedTag::Text(tiff_tag, text));
                    }
                }
            }
        }

        Ok(tags)
    }
}

impl Default for MetadataProcessor {
    fn default() -> Self {
        Self::new()
    }
}

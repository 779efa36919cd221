// downsize/src/processors/compressor.rs
use crate::core::{DownsizeError, ImageKind, Result, DEFAULT_JPEG_QUALITY};
use crate::processors::metadata::{ForwardedTag, MetadataProcessor};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::{ColorType, DynamicImage};
use img_parts::jpeg::Jpeg;
use img_parts::png::{Png, PngChunk};
use img_parts::webp::WebP;
use img_parts::{Bytes, ImageEXIF};
use oxipng::{optimize_from_memory, Options};
use std::io::Cursor;
use std::path::Path;
use tiff::encoder::{colortype, TiffEncoder, TiffValue};

/// Ancillary PNG chunks carried over from the source. Chunks that depend on
/// the pixel encoding (tRNS, bKGD, sBIT, PLTE) are regenerated instead.
const FORWARDED_PNG_CHUNKS: [&[u8; 4]; 10] = [
    b"tEXt", b"zTXt", b"iTXt", b"tIME", b"pHYs", b"iCCP", b"sRGB", b"gAMA", b"cHRM", b"eXIf",
];

/// Colour-space chunks must precede PLTE as well as IDAT.
const COLOR_SPACE_CHUNKS: [&[u8; 4]; 4] = [b"iCCP", b"sRGB", b"gAMA", b"cHRM"];

/// Metadata available to the encoder for one file.
pub struct SourceMetadata<'a> {
    pub exif: Option<&'a [u8]>,
    /// Raw bytes of the source file, used to harvest PNG chunks.
    pub original: &'a [u8],
}

pub struct Compressor {
    quality: u8,
    optimize_png: bool,
    metadata: MetadataProcessor,
}

impl Compressor {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
            optimize_png: true,
            metadata: MetadataProcessor::new(),
        }
    }

    pub fn with_png_optimization(mut self, optimize: bool) -> Self {
        self.optimize_png = optimize;
        self
    }

    /// Encodes `image` in `kind`, forwarding whatever metadata that format
    /// can hold.
    pub fn encode(
        &self,
        image: &DynamicImage,
        kind: ImageKind,
        source: &SourceMetadata<'_>,
    ) -> Result<Vec<u8>> {
        log::debug!(
            "Encoding {}x{} image as {:?}, quality: {}",
            image.width(),
            image.height(),
            kind,
            self.quality
        );

        match kind {
            ImageKind::Jpeg => self.encode_jpeg(image, source.exif),
            ImageKind::Png => self.encode_png(image, source.original),
            ImageKind::WebP => self.encode_webp(image, source.exif),
            ImageKind::Tiff => self.encode_tiff(image, source.exif),
            ImageKind::Gif | ImageKind::Bmp | ImageKind::Other(_) => {
                self.encode_generic(image, kind)
            }
        }
    }

    pub fn save(
        &self,
        image: &DynamicImage,
        kind: ImageKind,
        source: &SourceMetadata<'_>,
        path: &Path,
    ) -> Result<u64> {
        let data = self.encode(image, kind, source)?;
        std::fs::write(path, &data)?;
        log::debug!("Saved image: {} ({} bytes)", path.display(), data.len());
        Ok(data.len() as u64)
    }

    fn encode_jpeg(&self, image: &DynamicImage, exif: Option<&[u8]>) -> Result<Vec<u8>> {
        let image = match image.color() {
            ColorType::L8 | ColorType::Rgb8 => image.clone(),
            _ => DynamicImage::ImageRgb8(image.to_rgb8()),
        };

        let mut data = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut data, self.quality);
        image.write_with_encoder(encoder).map_err(encode_error)?;

        match exif {
            Some(block) => embed_jpeg_exif(data, block),
            None => Ok(data),
        }
    }

    fn encode_png(&self, image: &DynamicImage, original: &[u8]) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        let encoder =
            PngEncoder::new_with_quality(&mut data, CompressionType::Best, PngFilter::Adaptive);
        image.write_with_encoder(encoder).map_err(encode_error)?;

        if self.optimize_png {
            data = optimize_from_memory(&data, &Options::default())
                .map_err(|e| DownsizeError::Encode(format!("PNG optimization failed: {}", e)))?;
        }

        forward_png_chunks(data, original)
    }

    fn encode_webp(&self, image: &DynamicImage, exif: Option<&[u8]>) -> Result<Vec<u8>> {
        let image = into_8bit(image);

        let mut data = Vec::new();
        let encoder = WebPEncoder::new_lossless(&mut data);
        image.write_with_encoder(encoder).map_err(encode_error)?;

        let Some(block) = exif else {
            return Ok(data);
        };

        let mut webp = WebP::from_bytes(Bytes::from(data))
            .map_err(|e| DownsizeError::Encode(format!("WebP re-parse failed: {}", e)))?;
        webp.set_exif(Some(Bytes::copy_from_slice(block)));

        let mut output = Vec::new();
        webp.encoder().write_to(&mut output)?;
        Ok(output)
    }

    fn encode_tiff(&self, image: &DynamicImage, exif: Option<&[u8]>) -> Result<Vec<u8>> {
        let tags = match exif {
            Some(block) => self.metadata.tiff_tags(block).unwrap_or_else(|e| {
                log::warn!("Dropping TIFF metadata: {}", e);
                Vec::new()
            }),
            None => Vec::new(),
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut encoder = TiffEncoder::new(&mut cursor).map_err(tiff_error)?;
            let (width, height) = (image.width(), image.height());

            let written = match image {
                DynamicImage::ImageLuma8(buf) => {
                    write_tiff::<colortype::Gray8, _>(&mut encoder, width, height, buf, &tags)
                }
                DynamicImage::ImageLuma16(buf) => {
                    write_tiff::<colortype::Gray16, _>(&mut encoder, width, height, buf, &tags)
                }
                DynamicImage::ImageRgb16(buf) => {
                    write_tiff::<colortype::RGB16, _>(&mut encoder, width, height, buf, &tags)
                }
                DynamicImage::ImageRgba16(buf) => {
                    write_tiff::<colortype::RGBA16, _>(&mut encoder, width, height, buf, &tags)
                }
                other if other.color().has_alpha() => {
                    let buf = other.to_rgba8();
                    write_tiff::<colortype::RGBA8, _>(&mut encoder, width, height, &buf, &tags)
                }
                other => {
                    let buf = other.to_rgb8();
                    write_tiff::<colortype::RGB8, _>(&mut encoder, width, height, &buf, &tags)
                }
            };
            written.map_err(tiff_error)?;
        }

        Ok(cursor.into_inner())
    }

    fn encode_generic(&self, image: &DynamicImage, kind: ImageKind) -> Result<Vec<u8>> {
        let image = into_8bit(image);
        let mut cursor = Cursor::new(Vec::new());
        image
            .write_to(&mut cursor, kind.image_format())
            .map_err(encode_error)?;
        Ok(cursor.into_inner())
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

fn write_tiff<C, W>(
    encoder: &mut TiffEncoder<W>,
    width: u32,
    height: u32,
    data: &[C::Inner],
    tags: &[ForwardedTag],
) -> tiff::TiffResult<()>
where
    C: colortype::ColorType,
    W: std::io::Write + std::io::Seek,
    [C::Inner]: TiffValue,
{
    let mut image = encoder.new_image::<C>(width, height)?;
    for tag in tags {
        match tag {
            ForwardedTag::Orientation(value) => image
                .encoder()
                .write_tag(tiff::tags::Tag::Orientation, *value)?,
            ForwardedTag::Text(tiff_tag, text) => {
                image.encoder().write_tag(*tiff_tag, text.as_str())?
            }
        }
    }
    image.write_data(data)
}

fn embed_jpeg_exif(data: Vec<u8>, block: &[u8]) -> Result<Vec<u8>> {
    let mut jpeg = Jpeg::from_bytes(Bytes::from(data))
        .map_err(|e| DownsizeError::Encode(format!("JPEG re-parse failed: {}", e)))?;
    jpeg.set_exif(Some(Bytes::copy_from_slice(block)));

    let mut output = Vec::new();
    jpeg.encoder().write_to(&mut output)?;
    Ok(output)
}

fn forward_png_chunks(data: Vec<u8>, original: &[u8]) -> Result<Vec<u8>> {
    let forwarded: Vec<PngChunk> = match Png::from_bytes(Bytes::copy_from_slice(original)) {
        Ok(source) => source
            .chunks()
            .iter()
            .filter(|chunk| FORWARDED_PNG_CHUNKS.contains(&&chunk.kind()))
            .cloned()
            .collect(),
        Err(e) => {
            log::warn!("Could not read PNG chunks from source: {}", e);
            Vec::new()
        }
    };

    if forwarded.is_empty() {
        return Ok(data);
    }

    let mut png = Png::from_bytes(Bytes::from(data))
        .map_err(|e| DownsizeError::Encode(format!("PNG re-parse failed: {}", e)))?;

    let chunks = png.chunks_mut();
    chunks.retain(|chunk| !FORWARDED_PNG_CHUNKS.contains(&&chunk.kind()));
    log::debug!("Forwarding {} PNG metadata chunks", forwarded.len());

    let (color_space, trailing): (Vec<PngChunk>, Vec<PngChunk>) = forwarded
        .into_iter()
        .partition(|chunk| COLOR_SPACE_CHUNKS.contains(&&chunk.kind()));
    insert_before(chunks, color_space, |kind| kind == b"PLTE" || kind == b"IDAT")?;
    insert_before(chunks, trailing, |kind| kind == b"IDAT")?;

    let mut output = Vec::new();
    png.encoder().write_to(&mut output)?;
    Ok(output)
}

/// Inserts `forwarded` in order ahead of the first chunk matching `stop`.
fn insert_before(
    chunks: &mut Vec<PngChunk>,
    forwarded: Vec<PngChunk>,
    stop: impl Fn(&[u8; 4]) -> bool,
) -> Result<()> {
    let position = chunks
        .iter()
        .position(|chunk| stop(&chunk.kind()))
        .ok_or_else(|| DownsizeError::Encode("Encoded PNG has no IDAT chunk".to_string()))?;
    for (offset, chunk) in forwarded.into_iter().enumerate() {
        chunks.insert(position + offset, chunk);
    }
    Ok(())
}

/// WebP, GIF and BMP encoders only take 8-bit samples.
fn into_8bit(image: &DynamicImage) -> DynamicImage {
    match image.color() {
        ColorType::L8 | ColorType::La8 | ColorType::Rgb8 | ColorType::Rgba8 => image.clone(),
        ColorType::L16 => DynamicImage::ImageLuma8(image.to_luma8()),
        ColorType::La16 => DynamicImage::ImageLumaA8(image.to_luma_alpha8()),
        color if color.has_alpha() => DynamicImage::ImageRgba8(image.to_rgba8()),
        _ => DynamicImage::ImageRgb8(image.to_rgb8()),
    }
}

fn encode_error(e: image::ImageError) -> DownsizeError {
    DownsizeError::Encode(e.to_string())
}

fn tiff_error(e: tiff::TiffError) -> DownsizeError {
    DownsizeError::Encode(format!("TIFF: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::metadata::tests::exif_block;
    use exif::{In, Reader, Tag};
    use image::{ImageFormat, RgbImage, Rgba, RgbaImage};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x * 7) as u8, (y * 11) as u8, 90])
        }))
    }

    fn no_metadata() -> SourceMetadata<'static> {
        SourceMetadata {
            exif: None,
            original: &[],
        }
    }

    fn orientation_of(data: &[u8]) -> Option<u32> {
        let exif = Reader::new()
            .read_from_container(&mut Cursor::new(data))
            .ok()?;
        exif.get_field(Tag::Orientation, In::PRIMARY)?
            .value
            .get_uint(0)
    }

    #[test]
    fn jpeg_carries_exif_block() {
        let block = exif_block(6, "Nikon");
        let source = SourceMetadata {
            exif: Some(&block),
            original: &[],
        };
        let data = Compressor::default()
            .encode(&gradient(16, 8), ImageKind::Jpeg, &source)
            .unwrap();

        assert_eq!(image::guess_format(&data).unwrap(), ImageFormat::Jpeg);
        assert_eq!(orientation_of(&data), Some(6));
    }

    #[test]
    fn jpeg_without_exif_has_no_block() {
        let data = Compressor::default()
            .encode(&gradient(16, 8), ImageKind::Jpeg, &no_metadata())
            .unwrap();
        let jpeg = Jpeg::from_bytes(Bytes::from(data)).unwrap();
        assert!(jpeg.exif().is_none());
    }

    #[test]
    fn jpeg_accepts_alpha_input() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 4])));
        assert!(Compressor::default()
            .encode(&image, ImageKind::Jpeg, &no_metadata())
            .is_ok());
    }

    #[test]
    fn png_forwards_text_chunks() {
        let mut original = Png::from_bytes(Bytes::from(
            Compressor::new(90)
                .with_png_optimization(false)
                .encode(&gradient(4, 4), ImageKind::Png, &no_metadata())
                .unwrap(),
        ))
        .unwrap();
        let idat = original
            .chunks()
            .iter()
            .position(|chunk| &chunk.kind() == b"IDAT")
            .unwrap();
        original.chunks_mut().insert(
            idat,
            PngChunk::new(*b"tEXt", Bytes::from_static(b"Author\0Ansel")),
        );
        let mut original_bytes = Vec::new();
        original.encoder().write_to(&mut original_bytes).unwrap();

        let source = SourceMetadata {
            exif: None,
            original: &original_bytes,
        };
        let data = Compressor::default()
            .encode(&gradient(2, 2), ImageKind::Png, &source)
            .unwrap();

        let png = Png::from_bytes(Bytes::from(data)).unwrap();
        let text = png.chunk_by_type(*b"tEXt").unwrap();
        assert_eq!(text.contents().as_ref(), b"Author\0Ansel");
        let position = |kind: &[u8; 4]| {
            png.chunks()
                .iter()
                .position(|chunk| &chunk.kind() == kind)
                .unwrap()
        };
        assert!(position(b"tEXt") < position(b"IDAT"));
    }

    #[test]
    fn png_color_space_chunks_precede_palette() {
        let two_tone = DynamicImage::ImageRgb8(RgbImage::from_fn(64, 64, |x, _| {
            if x < 32 {
                image::Rgb([255, 0, 0])
            } else {
                image::Rgb([0, 0, 255])
            }
        }));
        let mut original = Png::from_bytes(Bytes::from(
            Compressor::new(90)
                .with_png_optimization(false)
                .encode(&two_tone, ImageKind::Png, &no_metadata())
                .unwrap(),
        ))
        .unwrap();
        let idat = original
            .chunks()
            .iter()
            .position(|chunk| &chunk.kind() == b"IDAT")
            .unwrap();
        let chunks = original.chunks_mut();
        chunks.insert(
            idat,
            PngChunk::new(*b"gAMA", Bytes::from_static(&[0, 0, 0xb1, 0x8f])),
        );
        chunks.insert(
            idat + 1,
            PngChunk::new(*b"tEXt", Bytes::from_static(b"Title\0Dunes")),
        );
        let mut original_bytes = Vec::new();
        original.encoder().write_to(&mut original_bytes).unwrap();

        let source = SourceMetadata {
            exif: None,
            original: &original_bytes,
        };
        let data = Compressor::default()
            .encode(&two_tone, ImageKind::Png, &source)
            .unwrap();

        let png = Png::from_bytes(Bytes::from(data)).unwrap();
        let kinds: Vec<[u8; 4]> = png.chunks().iter().map(|chunk| chunk.kind()).collect();
        let position = |kind: &[u8; 4]| kinds.iter().position(|k| k == kind);
        let gama = position(b"gAMA").unwrap();
        let idat = position(b"IDAT").unwrap();
        assert_eq!(position(b"IHDR"), Some(0));
        assert!(gama < idat);
        assert!(position(b"tEXt").unwrap() < idat);
        if let Some(plte) = position(b"PLTE") {
            assert!(gama < plte);
        }
    }

    #[test]
    fn webp_carries_exif_block() {
        let block = exif_block(8, "Fuji");
        let source = SourceMetadata {
            exif: Some(&block),
            original: &[],
        };
        let data = Compressor::default()
            .encode(&gradient(8, 8), ImageKind::WebP, &source)
            .unwrap();

        let webp = WebP::from_bytes(Bytes::from(data.clone())).unwrap();
        assert_eq!(webp.exif().unwrap().as_ref(), block.as_slice());
        let decoded = image::load_from_memory_with_format(&data, ImageFormat::WebP).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 8));
    }

    #[test]
    fn tiff_keeps_orientation_and_make() {
        let block = exif_block(6, "Leica");
        let source = SourceMetadata {
            exif: Some(&block),
            original: &[],
        };
        let data = Compressor::default()
            .encode(&gradient(6, 4), ImageKind::Tiff, &source)
            .unwrap();

        assert_eq!(orientation_of(&data), Some(6));
        let tags = MetadataProcessor::new().tiff_tags(&data).unwrap();
        assert!(tags.contains(&ForwardedTag::Text(
            tiff::tags::Tag::Make,
            "Leica".to_string()
        )));

        let decoded = image::load_from_memory_with_format(&data, ImageFormat::Tiff).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (6, 4));
    }

    #[test]
    fn gif_and_bmp_reencode_in_place() {
        for (kind, format) in [
            (ImageKind::Gif, ImageFormat::Gif),
            (ImageKind::Bmp, ImageFormat::Bmp),
        ] {
            let data = Compressor::default()
                .encode(&gradient(5, 5), kind, &no_metadata())
                .unwrap();
            assert_eq!(image::guess_format(&data).unwrap(), format);
        }
    }

    #[test]
    fn sixteen_bit_input_is_narrowed_for_webp() {
        let image = DynamicImage::ImageRgb16(image::ImageBuffer::new(3, 3));
        assert!(Compressor::default()
            .encode(&image, ImageKind::WebP, &no_metadata())
            .is_ok());
    }
}

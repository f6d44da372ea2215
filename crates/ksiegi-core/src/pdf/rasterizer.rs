//! Page images from scanned PDFs using lopdf.
//!
//! A scanned ledger PDF carries one image XObject per page. The rasterizer
//! decodes that image and rescales it to the requested resolution using
//! the page's MediaBox.

use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, trace};

use super::{RasterSource, Result, is_image_file};
use crate::error::RasterError;

/// PDF points per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// Rasterizer for scanned PDFs and plain image files.
#[derive(Debug, Clone, Default)]
pub struct PdfRasterizer {
    max_pages: usize,
}

impl PdfRasterizer {
    /// Create a rasterizer without a page limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only rasterize the first `max_pages` pages (0 = all).
    pub fn with_max_pages(max_pages: usize) -> Self {
        Self { max_pages }
    }

    /// Number of pages in a document.
    pub fn page_count(&self, path: &Path) -> Result<usize> {
        if is_image_file(path) {
            return Ok(1);
        }
        Ok(load_document(path)?.get_pages().len())
    }

    fn render(&self, doc: &Document, page: u32, page_id: ObjectId, dpi: u32) -> Result<DynamicImage> {
        let image = page_images(doc, page_id)
            .into_iter()
            .max_by_key(|img| img.width() as u64 * img.height() as u64)
            .ok_or(RasterError::NoImage(page))?;

        let Some((width_pt, height_pt)) = media_box(doc, page_id) else {
            trace!("Page {} has no MediaBox, keeping native resolution", page);
            return Ok(image);
        };

        let scale = dpi as f32 / POINTS_PER_INCH;
        let width = (width_pt * scale).round().max(1.0) as u32;
        let height = (height_pt * scale).round().max(1.0) as u32;

        if width == image.width() && height == image.height() {
            return Ok(image);
        }

        trace!(
            "Scaling page {} from {}x{} to {}x{} ({} dpi)",
            page,
            image.width(),
            image.height(),
            width,
            height,
            dpi
        );
        Ok(image.resize_exact(width, height, FilterType::Triangle))
    }
}

impl RasterSource for PdfRasterizer {
    fn rasterize(&self, path: &Path, dpi: u32) -> Result<Vec<DynamicImage>> {
        if is_image_file(path) {
            let image = image::open(path).map_err(|e| RasterError::Open(e.to_string()))?;
            debug!("Loaded {} as a single page", path.display());
            return Ok(vec![image]);
        }

        let doc = load_document(path)?;
        let pages = doc.get_pages();
        if pages.is_empty() {
            return Err(RasterError::NoPages);
        }

        let limit = if self.max_pages == 0 {
            pages.len()
        } else {
            self.max_pages.min(pages.len())
        };

        let images = pages
            .iter()
            .take(limit)
            .map(|(&number, &page_id)| self.render(&doc, number, page_id, dpi))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Rasterized {} of {} pages from {} at {} dpi",
            images.len(),
            pages.len(),
            path.display(),
            dpi
        );
        Ok(images)
    }

    fn rasterize_page(&self, path: &Path, page: u32, dpi: u32) -> Result<DynamicImage> {
        if is_image_file(path) {
            if page != 1 {
                return Err(RasterError::InvalidPage(page));
            }
            return image::open(path).map_err(|e| RasterError::Open(e.to_string()));
        }

        let doc = load_document(path)?;
        let pages = doc.get_pages();
        let page_id = *pages.get(&page).ok_or(RasterError::InvalidPage(page))?;
        self.render(&doc, page, page_id, dpi)
    }
}

/// Load a PDF, decrypting it with the empty password if needed.
fn load_document(path: &Path) -> Result<Document> {
    let mut doc = Document::load(path)
        .map_err(|e| RasterError::Open(format!("{}: {}", path.display(), e)))?;

    if doc.is_encrypted() {
        if doc.decrypt("").is_err() {
            return Err(RasterError::Encrypted);
        }
        debug!("Decrypted PDF with empty password");
    }

    debug!("Loaded PDF with {} pages", doc.get_pages().len());
    Ok(doc)
}

/// Decodable image XObjects referenced by a page.
fn page_images(doc: &Document, page_id: ObjectId) -> Vec<DynamicImage> {
    let Some(resources) = inherited(doc, page_id, b"Resources") else {
        return Vec::new();
    };
    let Ok(Object::Dictionary(resources)) = doc.dereference(resources).map(|(_, o)| o) else {
        return Vec::new();
    };
    let Ok(xobjects) = resources.get(b"XObject") else {
        return Vec::new();
    };
    let Ok((_, Object::Dictionary(xobjects))) = doc.dereference(xobjects) else {
        return Vec::new();
    };

    xobjects
        .iter()
        .filter_map(|(_, obj)| doc.dereference(obj).ok())
        .filter_map(|(_, obj)| decode_image(doc, obj))
        .collect()
}

/// Page width and height in points.
fn media_box(doc: &Document, page_id: ObjectId) -> Option<(f32, f32)> {
    let (_, obj) = doc.dereference(inherited(doc, page_id, b"MediaBox")?).ok()?;
    let values: Vec<f32> = obj.as_array().ok()?.iter().filter_map(number).collect();
    match values.as_slice() {
        [x0, y0, x1, y1] => Some(((x1 - x0).abs(), (y1 - y0).abs())),
        _ => None,
    }
}

/// Look up a page attribute, walking up the page tree for inherited ones.
fn inherited<'a>(doc: &'a Document, node_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let dict = doc.get_object(node_id).ok()?.as_dict().ok()?;
    if let Ok(value) = dict.get(key) {
        return Some(value);
    }
    match dict.get(b"Parent") {
        Ok(Object::Reference(parent_id)) => inherited(doc, *parent_id, key),
        _ => None,
    }
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn name_of<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a [u8]> {
    match obj {
        Object::Name(name) => Some(name.as_slice()),
        Object::Array(arr) => arr.first().and_then(|o| name_of(doc, o)),
        Object::Reference(r) => doc.get_object(*r).ok().and_then(|o| name_of(doc, o)),
        _ => None,
    }
}

fn decode_image(doc: &Document, obj: &Object) -> Option<DynamicImage> {
    let Object::Stream(stream) = obj else {
        return None;
    };
    let dict: &Dictionary = &stream.dict;

    if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
        return None;
    }

    let width = u32::try_from(dict.get(b"Width").ok()?.as_i64().ok()?).ok()?;
    let height = u32::try_from(dict.get(b"Height").ok()?.as_i64().ok()?).ok()?;
    if width == 0 || height == 0 {
        return None;
    }
    trace!("Found image object: {}x{}", width, height);

    match dict.get(b"Filter").ok().and_then(|f| name_of(doc, f)) {
        Some(b"DCTDecode") => {
            return image::load_from_memory_with_format(&stream.content, image::ImageFormat::Jpeg)
                .ok();
        }
        Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
            trace!("Skipping image with unsupported filter");
            return None;
        }
        _ => {}
    }

    let data = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

    let color_space = dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|o| name_of(doc, o))
        .unwrap_or(b"DeviceGray");

    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(8);

    from_raw(&data, width, height, color_space, bits)
}

fn from_raw(
    data: &[u8],
    width: u32,
    height: u32,
    color_space: &[u8],
    bits: i64,
) -> Option<DynamicImage> {
    let pixels = (width as usize).checked_mul(height as usize)?;

    match (color_space, bits) {
        (b"DeviceRGB" | b"RGB", 8) => {
            let len = pixels.checked_mul(3)?;
            if data.len() < len {
                return None;
            }
            RgbImage::from_raw(width, height, data[..len].to_vec()).map(DynamicImage::ImageRgb8)
        }
        (b"DeviceGray" | b"G", 8) if data.len() >= pixels => {
            GrayImage::from_raw(width, height, data[..pixels].to_vec()).map(DynamicImage::ImageLuma8)
        }
        (b"DeviceGray" | b"G", 1) => {
            // rows are padded to whole bytes; a set bit is white
            let stride = (width as usize).div_ceil(8);
            if data.len() < stride.checked_mul(height as usize)? {
                return None;
            }
            let image = GrayImage::from_fn(width, height, |x, y| {
                let byte = data[y as usize * stride + x as usize / 8];
                let bit = (byte >> (7 - (x % 8))) & 1;
                image::Luma([if bit == 1 { 255 } else { 0 }])
            });
            Some(DynamicImage::ImageLuma8(image))
        }
        _ => {
            trace!(
                "Could not decode image: colorspace={}, bits={}, data_len={}",
                String::from_utf8_lossy(color_space),
                bits,
                data.len()
            );
            None
        }
    }
}

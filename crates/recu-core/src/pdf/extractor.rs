//! PDF content extraction using lopdf and pdf-extract.

use image::{DynamicImage, ImageBuffer, Rgba};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::io::Cursor;
use tracing::{debug, trace};

use super::{PdfKind, Result};
use crate::error::PdfError;

/// A loaded PDF document ready for per-page inspection.
pub struct PdfScan {
    document: Document,
    raw_data: Vec<u8>,
}

impl PdfScan {
    /// Load a PDF from memory.
    ///
    /// Documents encrypted with the empty password are decrypted in place;
    /// any other encryption is rejected.
    pub fn load(data: &[u8]) -> Result<Self> {
        let mut document =
            Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        let raw_data = if document.is_encrypted() {
            if document.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("decrypted PDF with empty password");
            let mut decrypted = Vec::new();
            document
                .save_to(&mut decrypted)
                .map_err(|e| PdfError::Parse(e.to_string()))?;
            decrypted
        } else {
            data.to_vec()
        };

        if document.get_pages().is_empty() {
            return Err(PdfError::NoPages);
        }

        Ok(Self { document, raw_data })
    }

    pub fn page_count(&self) -> u32 {
        self.document.get_pages().len() as u32
    }

    /// Embedded text of the whole document.
    pub fn text(&self) -> Result<String> {
        pdf_extract::extract_text_from_mem(&self.raw_data)
            .map_err(|e| PdfError::Text(e.to_string()))
    }

    /// Embedded text of one page (1-indexed).
    ///
    /// pdf-extract works on the whole document, so pages are approximated by
    /// dividing the text lines evenly; the last page takes the remainder.
    pub fn page_text(&self, page: u32) -> Result<String> {
        let page_count = self.page_count() as usize;
        if page == 0 || page as usize > page_count {
            return Err(PdfError::InvalidPage(page));
        }

        let full_text = self.text()?;
        let lines: Vec<&str> = full_text.lines().collect();

        let lines_per_page = lines.len() / page_count;
        let start = (page - 1) as usize * lines_per_page;
        let end = if page as usize == page_count {
            lines.len()
        } else {
            page as usize * lines_per_page
        };

        Ok(lines[start.min(lines.len())..end.min(lines.len())].join("\n"))
    }

    /// Largest embedded image of one page (1-indexed), re-encoded as PNG.
    ///
    /// Falls back to a whole-document scan when the page resources name no
    /// decodable XObject.
    pub fn page_image(&self, page: u32) -> Result<Option<Vec<u8>>> {
        let pages = self.document.get_pages();
        let page_id = *pages.get(&page).ok_or(PdfError::InvalidPage(page))?;

        let mut images = Vec::new();
        if let Some(resources) = page_resources(&self.document, page_id) {
            if let Ok(xobjects) = resources.get(b"XObject") {
                if let Ok((_, Object::Dictionary(xobj_dict))) =
                    self.document.dereference(xobjects)
                {
                    for (_name, obj_ref) in xobj_dict.iter() {
                        if let Ok((_, obj)) = self.document.dereference(obj_ref) {
                            if let Some(img) = image_from_object(&self.document, obj) {
                                images.push(img);
                            }
                        }
                    }
                }
            }
        }

        if images.is_empty() {
            debug!(page, "no XObject images on page, scanning document");
            let mut all = self.document_images();
            let idx = (page - 1) as usize;
            if idx < all.len() {
                images.push(all.swap_remove(idx));
            }
        }

        let best = images
            .into_iter()
            .max_by_key(|img| u64::from(img.width()) * u64::from(img.height()));

        match best {
            Some(img) => {
                trace!(page, width = img.width(), height = img.height(), "selected page image");
                let mut data = Vec::new();
                img.write_to(&mut Cursor::new(&mut data), image::ImageFormat::Png)
                    .map_err(|e| PdfError::Image(e.to_string()))?;
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }

    /// Classify the document by its embedded content.
    pub fn kind(&self) -> PdfKind {
        let has_text = self.text().map(|t| t.len() > 50).unwrap_or(false);
        let has_images = !self.document_images().is_empty();

        match (has_text, has_images) {
            (true, false) => PdfKind::Text,
            (false, true) => PdfKind::Image,
            (true, true) => PdfKind::Hybrid,
            (false, false) => PdfKind::Empty,
        }
    }

    fn document_images(&self) -> Vec<DynamicImage> {
        let mut images = Vec::new();
        for (_id, object) in self.document.objects.iter() {
            if let Some(img) = image_from_object(&self.document, object) {
                images.push(img);
            }
        }
        images
    }
}

fn image_from_object(doc: &Document, obj: &Object) -> Option<DynamicImage> {
    let Object::Stream(stream) = obj else {
        return None;
    };
    let dict = &stream.dict;

    let subtype = dict.get(b"Subtype").ok()?;
    if subtype.as_name().ok()? != b"Image" {
        return None;
    }

    let width = dict.get(b"Width").ok()?.as_i64().ok()? as u32;
    let height = dict.get(b"Height").ok()?.as_i64().ok()? as u32;

    let data = match stream.decompressed_content() {
        Ok(d) => d,
        Err(_) => stream.content.clone(),
    };

    if let Ok(filter) = dict.get(b"Filter") {
        let filter_name = match filter {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) if !arr.is_empty() => arr.first().and_then(|o| o.as_name().ok()),
            _ => None,
        };

        match filter_name {
            Some(b"DCTDecode") => {
                // JPEG stream, decodable as-is
                return image::load_from_memory_with_format(
                    &stream.content,
                    image::ImageFormat::Jpeg,
                )
                .ok();
            }
            // JPEG2000 and fax encodings cannot be decoded here
            Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => return None,
            _ => {}
        }
    }

    let color_space = dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|o| match o {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
            Object::Reference(r) => doc.get_object(*r).ok().and_then(|o| o.as_name().ok()),
            _ => None,
        })
        .unwrap_or(b"DeviceRGB");

    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(8) as u8;

    rgba_from_raw(&data, width, height, color_space, bits)
}

fn rgba_from_raw(
    data: &[u8],
    width: u32,
    height: u32,
    color_space: &[u8],
    bits_per_component: u8,
) -> Option<DynamicImage> {
    if bits_per_component != 8 {
        trace!(bits = bits_per_component, "unsupported bits per component");
        return None;
    }

    let expected_rgb = (width * height * 3) as usize;
    let expected_gray = (width * height) as usize;

    if (color_space == b"DeviceRGB" || color_space == b"RGB") && data.len() >= expected_rgb {
        let mut rgba = Vec::with_capacity((width * height * 4) as usize);
        for chunk in data[..expected_rgb].chunks(3) {
            rgba.extend_from_slice(chunk);
            rgba.push(255);
        }
        return ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, rgba)
            .map(DynamicImage::ImageRgba8);
    }

    if (color_space == b"DeviceGray" || color_space == b"G") && data.len() >= expected_gray {
        let mut rgba = Vec::with_capacity((width * height * 4) as usize);
        for &gray in &data[..expected_gray] {
            rgba.extend_from_slice(&[gray, gray, gray, 255]);
        }
        return ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, rgba)
            .map(DynamicImage::ImageRgba8);
    }

    trace!(
        data_len = data.len(),
        expected_rgb,
        expected_gray,
        "could not decode raw image data"
    );
    None
}

/// Resources dictionary for a page, walking up the Pages tree when the page
/// itself carries none.
fn page_resources(doc: &Document, node_id: ObjectId) -> Option<Dictionary> {
    let node = doc.get_object(node_id).ok()?;
    let Object::Dictionary(dict) = node else {
        return None;
    };

    if let Ok(resources) = dict.get(b"Resources") {
        if let Ok((_, Object::Dictionary(res))) = doc.dereference(resources) {
            return Some(res.clone());
        }
    }

    if let Ok(Object::Reference(parent_id)) = dict.get(b"Parent") {
        return page_resources(doc, *parent_id);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_rejects_garbage() {
        assert!(PdfScan::load(b"not a pdf at all").is_err());
        assert!(PdfScan::load(&[]).is_err());
    }

    #[test]
    fn test_page_bounds_are_checked() {
        let doc = minimal_pdf();
        let scan = PdfScan::load(&doc).unwrap();
        assert_eq!(scan.page_count(), 1);
        assert!(matches!(scan.page_text(0), Err(PdfError::InvalidPage(0))));
        assert!(matches!(scan.page_text(2), Err(PdfError::InvalidPage(2))));
    }

    #[test]
    fn test_page_without_images_yields_none() {
        let doc = minimal_pdf();
        let scan = PdfScan::load(&doc).unwrap();
        assert_eq!(scan.page_image(1).unwrap(), None);
    }

    fn minimal_pdf() -> Vec<u8> {
        use lopdf::dictionary;

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }
}

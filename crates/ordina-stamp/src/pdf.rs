//! PDF stamping.
//!
//! The stamp is drawn on page 1 through a single Form XObject holding the
//! raster (RGB image with a DeviceGray soft mask) and an invisible text layer
//! so the protocol number stays extractable. The page's existing content
//! streams are bracketed in `q … Q` and left byte-identical; the overlay is
//! appended as a new stream. Resources are cloned onto the page before the
//! overlay is registered, so dictionaries shared with other pages never
//! change.

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use ordina_render::StampBuffer;
use ordina_types::{DocumentFormat, StampPosition};
use tracing::debug;

use crate::error::{StampError, StampResult};
use crate::traits::Stamper;

/// Distance in points between the stamp and the page box edges.
pub const PDF_MARGIN: f64 = 20.0;
/// Buffer pixels are laid out at 96 dpi.
const PT_PER_PX: f64 = 72.0 / 96.0;
/// Resource-name prefix of stamp overlays.
const OVERLAY_PREFIX: &str = "OrdinaStamp";

#[derive(Clone, Copy, Debug, Default)]
pub struct PdfStamper;

impl Stamper for PdfStamper {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Pdf
    }

    fn apply(
        &self,
        source: &[u8],
        stamp: &StampBuffer,
        position: StampPosition,
    ) -> StampResult<Vec<u8>> {
        let mut doc = Document::load_mem(source).map_err(malformed)?;
        let page_id = first_page(&doc)?;
        let page_box = page_box(&doc, page_id)?;

        let width = f64::from(stamp.width()) * PT_PER_PX;
        let height = f64::from(stamp.height()) * PT_PER_PX;
        let x = if position.is_left() {
            page_box.left + PDF_MARGIN
        } else {
            (page_box.right - PDF_MARGIN - width).max(page_box.left)
        };
        let y = if position.is_top() {
            (page_box.top - PDF_MARGIN - height).max(page_box.bottom)
        } else {
            page_box.bottom + PDF_MARGIN
        };

        let form_id = add_overlay_form(&mut doc, stamp);
        let name = register_overlay(&mut doc, page_id, form_id)?;
        wrap_contents(&mut doc, page_id, &name, x, y)?;

        let mut out = Vec::new();
        doc.save_to(&mut out)
            .map_err(|e| StampError::encode(DocumentFormat::Pdf, e))?;
        debug!(page_count = doc.get_pages().len(), x, y, "pdf stamped");
        Ok(out)
    }
}

/// Text of every stamp overlay on page 1, oldest first.
pub fn read_stamp_text(source: &[u8]) -> StampResult<Vec<String>> {
    let doc = Document::load_mem(source).map_err(malformed)?;
    let page_id = first_page(&doc)?;
    let Some(resources) = inherited(&doc, page_id, b"Resources") else {
        return Ok(Vec::new());
    };
    let resources = deref(&doc, &resources)?.as_dict().map_err(malformed)?;
    let Ok(xobjects) = resources.get(b"XObject") else {
        return Ok(Vec::new());
    };
    let xobjects = deref(&doc, xobjects)?.as_dict().map_err(malformed)?;

    let mut texts = Vec::new();
    for (name, object) in xobjects.iter() {
        if !name.starts_with(OVERLAY_PREFIX.as_bytes()) {
            continue;
        }
        let Object::Stream(form) = deref(&doc, object)? else {
            continue;
        };
        let content = Content::decode(&form.content).map_err(malformed)?;
        let lines: Vec<String> = content
            .operations
            .iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| match op.operands.first() {
                Some(Object::String(bytes, _)) => Some(bytes.iter().map(|&b| char::from(b)).collect()),
                _ => None,
            })
            .collect();
        texts.push(lines.join("\n"));
    }
    Ok(texts)
}

fn malformed(e: impl ToString) -> StampError {
    StampError::MalformedPdf(e.to_string())
}

fn first_page(doc: &Document) -> StampResult<ObjectId> {
    doc.get_pages()
        .into_values()
        .next()
        .ok_or_else(|| StampError::MalformedPdf("document has no pages".into()))
}

fn deref<'a>(doc: &'a Document, object: &'a Object) -> StampResult<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).map_err(malformed),
        other => Ok(other),
    }
}

/// Look `key` up on the page, then along its `/Parent` chain.
fn inherited(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut node = doc.get_object(page_id).ok()?.as_dict().ok()?;
    for _ in 0..64 {
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_object(parent).ok()?.as_dict().ok()?;
    }
    None
}

struct PageBox {
    left: f64,
    bottom: f64,
    right: f64,
    top: f64,
}

fn page_box(doc: &Document, page_id: ObjectId) -> StampResult<PageBox> {
    let media_box = inherited(doc, page_id, b"MediaBox")
        .ok_or_else(|| StampError::MalformedPdf("page 1 has no MediaBox".into()))?;
    let values = deref(doc, &media_box)?
        .as_array()
        .map_err(malformed)?
        .iter()
        .map(number)
        .collect::<Option<Vec<f64>>>()
        .filter(|values| values.len() == 4)
        .ok_or_else(|| StampError::MalformedPdf("page 1 MediaBox is not four numbers".into()))?;
    Ok(PageBox {
        left: values[0].min(values[2]),
        bottom: values[1].min(values[3]),
        right: values[0].max(values[2]),
        top: values[1].max(values[3]),
    })
}

fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

fn add_overlay_form(doc: &mut Document, stamp: &StampBuffer) -> ObjectId {
    let (px_w, px_h) = (stamp.width(), stamp.height());
    let mut rgb = Vec::with_capacity((px_w * px_h * 3) as usize);
    let mut alpha = Vec::with_capacity((px_w * px_h) as usize);
    for pixel in stamp.image.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel.0[3]);
    }

    let mut mask_dict = image_dict(px_w, px_h, "DeviceGray");
    mask_dict.set("Decode", Object::Array(vec![Object::Integer(0), Object::Integer(1)]));
    let mask_id = doc.add_object(Stream::new(mask_dict, alpha));

    let mut image = image_dict(px_w, px_h, "DeviceRGB");
    image.set("SMask", Object::Reference(mask_id));
    let image_id = doc.add_object(Stream::new(image, rgb));

    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set("BaseFont", Object::Name(base_font(&stamp.font.family).as_bytes().to_vec()));
    font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
    let font_id = doc.add_object(font);

    let width = f64::from(px_w) * PT_PER_PX;
    let height = f64::from(px_h) * PT_PER_PX;

    let mut xobjects = Dictionary::new();
    xobjects.set("Im0", Object::Reference(image_id));
    let mut fonts = Dictionary::new();
    fonts.set("F0", Object::Reference(font_id));
    let mut resources = Dictionary::new();
    resources.set("XObject", Object::Dictionary(xobjects));
    resources.set("Font", Object::Dictionary(fonts));

    let mut form = Dictionary::new();
    form.set("Type", Object::Name(b"XObject".to_vec()));
    form.set("Subtype", Object::Name(b"Form".to_vec()));
    form.set(
        "BBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(width.ceil() as i64),
            Object::Integer(height.ceil() as i64),
        ]),
    );
    form.set("Resources", Object::Dictionary(resources));
    doc.add_object(Stream::new(form, form_content(stamp, width, height)))
}

fn image_dict(width: u32, height: u32, color_space: &str) -> Dictionary {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(i64::from(width)));
    dict.set("Height", Object::Integer(i64::from(height)));
    dict.set("ColorSpace", Object::Name(color_space.as_bytes().to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict
}

/// Raster first, then the text in render mode 3 (invisible) over the
/// lines it was rasterized from.
fn form_content(stamp: &StampBuffer, width: f64, height: f64) -> Vec<u8> {
    let line_pitch = f64::from(ordina_render::font::LINE_ADVANCE * stamp.dot) * PT_PER_PX;
    let cap = f64::from(ordina_render::font::GLYPH_HEIGHT * stamp.dot) * PT_PER_PX;
    let size = cap / 0.72;
    let left = f64::from(stamp.text_rect.x) * PT_PER_PX;
    let top = height - f64::from(stamp.text_rect.y) * PT_PER_PX;

    let mut out = format!("q {width:.2} 0 0 {height:.2} 0 0 cm /Im0 Do Q\nBT /F0 {size:.2} Tf 3 Tr\n")
        .into_bytes();
    for (i, line) in stamp.lines.iter().enumerate() {
        let baseline = top - i as f64 * line_pitch - cap;
        out.extend_from_slice(format!("1 0 0 1 {left:.2} {baseline:.2} Tm (").as_bytes());
        out.extend(pdf_string(line));
        out.extend_from_slice(b") Tj\n");
    }
    out.extend_from_slice(b"ET\n");
    out
}

/// WinAnsi bytes of `text` with string delimiters escaped.
fn pdf_string(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        let byte = match u32::from(c) {
            code @ (0x20..=0x7E | 0xA0..=0xFF) => code as u8,
            _ => b'?',
        };
        if matches!(byte, b'(' | b')' | b'\\') {
            out.push(b'\\');
        }
        out.push(byte);
    }
    out
}

fn base_font(family: &str) -> &'static str {
    let family = family.to_ascii_lowercase();
    if family.contains("times") || (family.contains("serif") && !family.contains("sans")) {
        "Times-Roman"
    } else if family.contains("courier") || family.contains("mono") {
        "Courier"
    } else {
        "Helvetica"
    }
}

/// Copy the page's effective resources onto the page itself and add the
/// overlay under a fresh name. Returns that name.
fn register_overlay(doc: &mut Document, page_id: ObjectId, form_id: ObjectId) -> StampResult<String> {
    let mut resources = match inherited(doc, page_id, b"Resources") {
        Some(object) => deref(doc, &object)?.as_dict().map_err(malformed)?.clone(),
        None => Dictionary::new(),
    };
    let mut xobjects = match resources.get(b"XObject") {
        Ok(object) => deref(doc, object)?.as_dict().map_err(malformed)?.clone(),
        Err(_) => Dictionary::new(),
    };

    let name = (0..)
        .map(|n| format!("{OVERLAY_PREFIX}{n}"))
        .find(|candidate| !xobjects.has(candidate.as_bytes()))
        .unwrap_or_else(|| OVERLAY_PREFIX.to_string());
    xobjects.set(name.as_str(), Object::Reference(form_id));
    resources.set("XObject", Object::Dictionary(xobjects));

    page_dict_mut(doc, page_id)?.set("Resources", Object::Dictionary(resources));
    Ok(name)
}

fn wrap_contents(doc: &mut Document, page_id: ObjectId, name: &str, x: f64, y: f64) -> StampResult<()> {
    let existing = match doc.get_object(page_id).and_then(Object::as_dict).map_err(malformed)?.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    };

    let overlay = format!("q 1 0 0 1 {x:.2} {y:.2} cm /{name} Do Q\n");
    let mut contents = Vec::with_capacity(existing.len() + 2);
    if existing.is_empty() {
        contents.push(Object::Reference(
            doc.add_object(Stream::new(Dictionary::new(), overlay.into_bytes())),
        ));
    } else {
        let open = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let close = doc.add_object(Stream::new(
            Dictionary::new(),
            format!("\nQ\n{overlay}").into_bytes(),
        ));
        contents.push(Object::Reference(open));
        contents.extend(existing);
        contents.push(Object::Reference(close));
    }

    page_dict_mut(doc, page_id)?.set("Contents", Object::Array(contents));
    Ok(())
}

fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> StampResult<&mut Dictionary> {
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(malformed)
}

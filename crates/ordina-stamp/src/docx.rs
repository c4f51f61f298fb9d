use ordina_render::{Seal, StampBuffer};
use ordina_types::{DocumentFormat, StampPosition};
use tracing::debug;

use crate::error::StampResult;
use crate::ooxml::{
    self, content_end, element_end, elements, escape, find_tag, insert_before_close, part_dir,
    root_prefix, Package, Tag, EMU_PER_PX, NS_DRAWING, NS_PICTURE, NS_RELATIONSHIPS, REL_IMAGE,
};
use crate::traits::Stamper;

const NS_MAIN: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const NS_WP: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const REL_HEADER: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/header";
const REL_FOOTER: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/footer";
const CT_HEADER: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml";
const CT_FOOTER: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.footer+xml";
/// Seal width in the footer: one inch.
const SEAL_WIDTH_EMU: u64 = 914_400;

/// Stamps `.docx` packages through the first section's default header and
/// footer. The document body is never edited.
#[derive(Clone, Copy, Debug, Default)]
pub struct DocxStamper;

impl Stamper for DocxStamper {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::OfficeText
    }

    fn apply(
        &self,
        source: &[u8],
        stamp: &StampBuffer,
        position: StampPosition,
    ) -> StampResult<Vec<u8>> {
        let mut package = Package::read(DocumentFormat::OfficeText, source)?;
        let document = package.main_part("word/document.xml")?;
        let mut document_xml = package.xml(&document)?;
        if root_prefix(&document_xml, "document").as_deref() != Some("w:") {
            return Err(package.malformed(format!("{document} has no w:document root")));
        }
        ensure_section(&package, &mut document_xml)?;
        let mut document_rels = package.relationships(&document)?;

        let header = section_reference(&document_xml, "w:headerReference")
            .and_then(|id| document_rels.by_id(&id))
            .map(|rel| document_rels.resolve(&rel.target));
        let header_created = header.is_none();
        match header {
            Some(part) => {
                let mut xml = package.xml(&part)?;
                require_root(&package, &xml, &part, "hdr")?;
                append_to_first_paragraph(&mut xml, &stamp_run(stamp));
                package.put(&part, xml.into_bytes());
            }
            None => {
                let dir = part_dir(&document).to_string();
                let part = package.unused_name(|n| format!("{dir}/header{n}.xml"));
                let paragraph = format!(
                    r#"<w:p><w:pPr><w:jc w:val="{}"/></w:pPr>{}</w:p>"#,
                    if position.is_left() { "left" } else { "right" },
                    stamp_run(stamp)
                );
                package.put(&part, part_xml("hdr", &paragraph).into_bytes());
                package.add_override(&part, CT_HEADER)?;
                let id = document_rels.add(REL_HEADER, &part)?;
                add_section_reference(&mut document_xml, "w:headerReference", &id);
            }
        }

        if let Some(seal) = &stamp.seal {
            let footer = section_reference(&document_xml, "w:footerReference")
                .and_then(|id| document_rels.by_id(&id))
                .map(|rel| document_rels.resolve(&rel.target));
            match footer {
                Some(part) => {
                    let mut xml = package.xml(&part)?;
                    require_root(&package, &xml, &part, "ftr")?;
                    let paragraph = seal_paragraph(&mut package, &part, seal)?;
                    insert_before_close(&mut xml, "w:ftr", &paragraph)
                        .ok_or_else(|| package.malformed(format!("{part} has no w:ftr root")))?;
                    package.put(&part, xml.into_bytes());
                }
                None => {
                    let dir = part_dir(&document).to_string();
                    let part = package.unused_name(|n| format!("{dir}/footer{n}.xml"));
                    let paragraph = seal_paragraph(&mut package, &part, seal)?;
                    package.put(&part, part_xml("ftr", &paragraph).into_bytes());
                    package.add_override(&part, CT_FOOTER)?;
                    let id = document_rels.add(REL_FOOTER, &part)?;
                    add_section_reference(&mut document_xml, "w:footerReference", &id);
                }
            }
        }

        package.put(&document, document_xml.into_bytes());
        package.put_relationships(document_rels);
        debug!(header_created, seal = stamp.seal.is_some(), "docx stamped");
        package.write()
    }
}

fn require_root(package: &Package, xml: &str, part: &str, local: &str) -> StampResult<()> {
    if root_prefix(xml, local).as_deref() == Some("w:") {
        Ok(())
    } else {
        Err(package.malformed(format!("{part} has no w:{local} root")))
    }
}

/// Give the body a trailing `w:sectPr` when it has none.
fn ensure_section(package: &Package, xml: &mut String) -> StampResult<()> {
    if find_tag(xml, "w:sectPr", 0).is_some() {
        return Ok(());
    }
    insert_before_close(xml, "w:body", "<w:sectPr></w:sectPr>")
        .ok_or_else(|| package.malformed("document has no w:body"))
}

/// The first section's properties element.
fn first_section(xml: &str) -> Option<(Tag, usize)> {
    let tag = find_tag(xml, "w:sectPr", 0)?;
    Some((tag, element_end(xml, "w:sectPr", tag)?))
}

/// Relationship id of the first section's default `name` reference.
fn section_reference(xml: &str, name: &str) -> Option<String> {
    let (section, end) = first_section(xml)?;
    elements(&xml[..end], name)
        .into_iter()
        .filter(|tag| tag.start > section.start)
        .map(|tag| tag.text(xml))
        .find(|text| ooxml::attr(text, "w:type").map_or(true, |kind| kind == "default"))
        .and_then(|text| ooxml::attr(text, "r:id"))
}

/// Header and footer references lead the section properties.
fn add_section_reference(xml: &mut String, name: &str, id: &str) {
    let Some((section, _)) = first_section(xml) else {
        return;
    };
    let reference = format!(r#"<{name} w:type="default" r:id="{id}" xmlns:r="{NS_RELATIONSHIPS}"/>"#);
    let at = if section.self_closing {
        match content_end(xml, "w:sectPr", section) {
            Some(at) => at,
            None => return,
        }
    } else {
        section.end
    };
    xml.insert_str(at, &reference);
}

fn append_to_first_paragraph(xml: &mut String, run: &str) {
    let at = find_tag(xml, "w:p", 0).and_then(|tag| content_end(xml, "w:p", tag));
    match at {
        Some(at) => xml.insert_str(at, run),
        None => {
            insert_before_close(xml, "w:hdr", &format!("<w:p>{run}</w:p>"));
        }
    }
}

fn part_xml(local: &str, body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:{local} xmlns:w="{NS_MAIN}" xmlns:r="{NS_RELATIONSHIPS}">{body}</w:{local}>"#
    )
}

/// The stamp text as one run, lines separated by breaks.
fn stamp_run(stamp: &StampBuffer) -> String {
    let family = escape(&stamp.font.family);
    let half_points = (stamp.font.size * 2.0).round() as u32;
    let text = stamp
        .lines
        .iter()
        .map(|line| format!(r#"<w:t xml:space="preserve">{}</w:t>"#, escape(line)))
        .collect::<Vec<_>>()
        .join("<w:br/>");
    format!(
        concat!(
            r#"<w:r><w:rPr><w:rFonts w:ascii="{family}" w:hAnsi="{family}" w:cs="{family}"/>"#,
            r#"<w:color w:val="{color}"/><w:sz w:val="{size}"/><w:szCs w:val="{size}"/></w:rPr>"#,
            "{text}</w:r>"
        ),
        family = family,
        color = stamp.font.color.hex(),
        size = half_points,
        text = text,
    )
}

/// Store the seal as a media part related from `part` and return a
/// right-aligned paragraph showing it one inch wide.
fn seal_paragraph(package: &mut Package, part: &str, seal: &Seal) -> StampResult<String> {
    let dir = part_dir(part).to_string();
    let media = package.unused_name(|n| format!("{dir}/media/ordina_seal{n}.png"));
    package.put(&media, seal.png().to_vec());
    package.ensure_default("png", "image/png")?;

    let mut rels = package.relationships(part)?;
    let id = rels.add(REL_IMAGE, &media)?;
    package.put_relationships(rels);

    let drawing_id = next_drawing_id(package, &dir);
    let cx = SEAL_WIDTH_EMU;
    let cy = seal.scaled_height(cx).max(EMU_PER_PX);
    Ok(format!(
        concat!(
            r#"<w:p><w:pPr><w:jc w:val="right"/></w:pPr><w:r><w:drawing>"#,
            r#"<wp:inline distT="0" distB="0" distL="0" distR="0" xmlns:wp="{wp}">"#,
            r#"<wp:extent cx="{cx}" cy="{cy}"/><wp:docPr id="{doc_id}" name="Seal {doc_id}"/>"#,
            r#"<a:graphic xmlns:a="{a}"><a:graphicData uri="{pic}"><pic:pic xmlns:pic="{pic}">"#,
            r#"<pic:nvPicPr><pic:cNvPr id="0" name="seal.png"/><pic:cNvPicPr/></pic:nvPicPr>"#,
            r#"<pic:blipFill><a:blip r:embed="{id}" xmlns:r="{r}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>"#,
            r#"<pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm>"#,
            r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr>"#,
            r#"</pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#
        ),
        wp = NS_WP,
        a = NS_DRAWING,
        pic = NS_PICTURE,
        r = NS_RELATIONSHIPS,
        cx = cx,
        cy = cy,
        doc_id = drawing_id,
        id = id,
    ))
}

/// One past the highest `wp:docPr` id in the document's XML parts.
fn next_drawing_id(package: &Package, dir: &str) -> u64 {
    let prefix = format!("{dir}/");
    let names: Vec<String> = package
        .part_names()
        .filter(|name| name.starts_with(&prefix) && name.ends_with(".xml"))
        .map(str::to_string)
        .collect();
    let max = names
        .iter()
        .filter_map(|name| package.xml(name).ok())
        .flat_map(|xml| {
            elements(&xml, "wp:docPr")
                .into_iter()
                .filter_map(|tag| ooxml::attr(tag.text(&xml), "id")?.parse::<u64>().ok())
                .collect::<Vec<_>>()
        })
        .max()
        .unwrap_or(0);
    max + 1
}

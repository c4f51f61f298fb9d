use ordina_render::{FontSpec, Seal, StampBuffer};
use ordina_types::{DocumentFormat, StampPosition};
use tracing::debug;

use crate::error::StampResult;
use crate::ooxml::{
    attr, content_end, element_end, elements, escape, find_tag, insert_before_close, root_prefix,
    set_attr, Package, Relationships, Tag, EMU_PER_PX, NS_DRAWING, NS_RELATIONSHIPS, REL_IMAGE,
};
use crate::traits::Stamper;

const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_SHEET_DRAWING: &str =
    "http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing";
const REL_STYLES: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const REL_DRAWING: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/drawing";
const CT_STYLES: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml";
const CT_DRAWING: &str = "application/vnd.openxmlformats-officedocument.drawing+xml";
/// Seal width on the sheet, in pixels.
const SEAL_WIDTH_PX: u64 = 100;
/// Worksheet children that must follow `<drawing>`.
const AFTER_DRAWING: [&str; 9] = [
    "legacyDrawing",
    "legacyDrawingHF",
    "drawingHF",
    "picture",
    "oleObjects",
    "controls",
    "webPublishItems",
    "tableParts",
    "extLst",
];

/// Stamps `.xlsx` packages: the text goes into A1 of the active sheet, the
/// seal (if any) is anchored at the last used cell.
#[derive(Clone, Copy, Debug, Default)]
pub struct XlsxStamper;

impl Stamper for XlsxStamper {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::OfficeSheet
    }

    fn apply(
        &self,
        source: &[u8],
        stamp: &StampBuffer,
        _position: StampPosition,
    ) -> StampResult<Vec<u8>> {
        let mut package = Package::read(DocumentFormat::OfficeSheet, source)?;
        let workbook = package.main_part("xl/workbook.xml")?;
        let workbook_xml = package.xml(&workbook)?;
        require_root(&package, &workbook_xml, &workbook, "workbook")?;
        let mut workbook_rels = package.relationships(&workbook)?;

        let sheet = active_sheet(&package, &workbook_xml, &workbook_rels)?;
        let mut sheet_xml = package.xml(&sheet)?;
        require_root(&package, &sheet_xml, &sheet, "worksheet")?;
        let (last_col, last_row) = used_range(&sheet_xml);

        let style = add_cell_style(&mut package, &mut workbook_rels, &stamp.font)?;
        write_a1(&package, &mut sheet_xml, stamp, style, last_col, last_row)?;
        if let Some(seal) = &stamp.seal {
            anchor_seal(&mut package, &sheet, &mut sheet_xml, seal, last_col, last_row)?;
        }

        package.put(&sheet, sheet_xml.into_bytes());
        package.put_relationships(workbook_rels);
        debug!(sheet = %sheet, style, last_col, last_row, "xlsx stamped");
        package.write()
    }
}

fn require_root(package: &Package, xml: &str, part: &str, local: &str) -> StampResult<()> {
    match root_prefix(xml, local) {
        Some(prefix) if prefix.is_empty() => Ok(()),
        _ => Err(package.malformed(format!("{part} has no default-namespace <{local}> root"))),
    }
}

/// Part name of the sheet selected by the first workbook view, or the
/// first sheet.
fn active_sheet(package: &Package, workbook: &str, rels: &Relationships) -> StampResult<String> {
    let active = find_tag(workbook, "workbookView", 0)
        .and_then(|tag| attr(tag.text(workbook), "activeTab"))
        .and_then(|tab| tab.parse::<usize>().ok())
        .unwrap_or(0);
    let sheets = elements(workbook, "sheet");
    let tag = sheets
        .get(active)
        .or_else(|| sheets.first())
        .ok_or_else(|| package.malformed("workbook has no sheets"))?;
    let id = attr(tag.text(workbook), "r:id")
        .ok_or_else(|| package.malformed("sheet entry without r:id"))?;
    let rel = rels
        .by_id(&id)
        .ok_or_else(|| package.malformed(format!("sheet relationship {id} not found")))?;
    Ok(rels.resolve(&rel.target))
}

/// `"AB12"` → `(28, 12)`.
fn parse_cell_ref(reference: &str) -> Option<(u32, u32)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() {
        return None;
    }
    let mut col = 0u32;
    for c in letters.chars() {
        if !c.is_ascii_uppercase() {
            return None;
        }
        col = col.checked_mul(26)?.checked_add(c as u32 - 'A' as u32 + 1)?;
    }
    Some((col, digits.parse().ok()?))
}

fn column_name(mut col: u32) -> String {
    let mut name = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        name.push(b'A' + rem as u8);
        col = (col - 1) / 26;
    }
    name.reverse();
    String::from_utf8(name).unwrap_or_default()
}

/// Highest column and row holding a cell, 1-based; `(1, 1)` for an empty
/// sheet.
fn used_range(sheet: &str) -> (u32, u32) {
    elements(sheet, "c")
        .into_iter()
        .filter_map(|tag| parse_cell_ref(&attr(tag.text(sheet), "r")?))
        .fold((1, 1), |(col, row), (c, r)| (col.max(c), row.max(r)))
}

/// Append `child` to the counted list `container` and return the new
/// child's index.
fn append_counted(
    package: &Package,
    xml: &mut String,
    container: &str,
    child_name: &str,
    child: &str,
) -> StampResult<usize> {
    let tag = find_tag(xml, container, 0)
        .ok_or_else(|| package.malformed(format!("styles have no <{container}>")))?;
    let end = element_end(xml, container, tag)
        .ok_or_else(|| package.malformed(format!("unterminated <{container}>")))?;
    let index = elements(&xml[tag.end.min(end)..end], child_name).len();
    let at = content_end(xml, container, tag)
        .ok_or_else(|| package.malformed(format!("unterminated <{container}>")))?;
    xml.insert_str(at, child);
    if let Some(tag) = find_tag(xml, container, tag.start) {
        set_attr(xml, tag, "count", &(index + 1).to_string());
    }
    Ok(index)
}

/// Register a font and a wrapping cell format for the stamp; returns the
/// `cellXfs` index.
fn add_cell_style(
    package: &mut Package,
    workbook_rels: &mut Relationships,
    font: &FontSpec,
) -> StampResult<usize> {
    let styles = match workbook_rels.first_of_type(REL_STYLES) {
        Some(rel) => workbook_rels.resolve(&rel.target),
        None => {
            let part = "xl/styles.xml".to_string();
            package.put(&part, minimal_styles().into_bytes());
            package.add_override(&part, CT_STYLES)?;
            workbook_rels.add(REL_STYLES, &part)?;
            part
        }
    };
    let mut xml = package.xml(&styles)?;
    require_root(package, &xml, &styles, "styleSheet")?;

    let font_xml = format!(
        r#"<font><sz val="{}"/><color rgb="FF{}"/><name val="{}"/></font>"#,
        font.size,
        font.color.hex(),
        escape(&font.family)
    );
    let font_id = append_counted(package, &mut xml, "fonts", "font", &font_xml)?;
    let xf = format!(
        r#"<xf numFmtId="0" fontId="{font_id}" fillId="0" borderId="0" xfId="0" applyFont="1" applyAlignment="1"><alignment vertical="top" wrapText="1"/></xf>"#
    );
    let style = append_counted(package, &mut xml, "cellXfs", "xf", &xf)?;
    package.put(&styles, xml.into_bytes());
    Ok(style)
}

fn minimal_styles() -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            "\n",
            r#"<styleSheet xmlns="{ns}"><fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts>"#,
            r#"<fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>"#,
            r#"<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>"#,
            r#"<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>"#,
            r#"<cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs>"#,
            r#"<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#
        ),
        ns = NS_MAIN
    )
}

/// Row height in points that fits `lines` lines at `size` points.
fn row_height(lines: usize, size: f32) -> f64 {
    lines.max(1) as f64 * f64::from(size) * 1.25 + 10.0
}

fn write_a1(
    package: &Package,
    sheet: &mut String,
    stamp: &StampBuffer,
    style: usize,
    last_col: u32,
    last_row: u32,
) -> StampResult<()> {
    let cell = format!(
        r#"<c r="A1" s="{style}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
        escape(&stamp.text())
    );
    let height = row_height(stamp.lines.len(), stamp.font.size);

    let data = find_tag(sheet, "sheetData", 0)
        .ok_or_else(|| package.malformed("worksheet has no <sheetData>"))?;
    let data_end = element_end(sheet, "sheetData", data)
        .ok_or_else(|| package.malformed("unterminated <sheetData>"))?;

    let mut implicit = 0u32;
    let mut first_row = None;
    for tag in elements(&sheet[..data_end], "row").into_iter().filter(|t| t.start > data.start) {
        let number = attr(tag.text(sheet), "r")
            .and_then(|r| r.parse().ok())
            .unwrap_or(implicit + 1);
        implicit = number;
        if number == 1 {
            first_row = Some(tag);
            break;
        }
        if number > 1 {
            break;
        }
    }

    match first_row {
        Some(row) => {
            let current = attr(row.text(sheet), "ht")
                .and_then(|ht| ht.parse::<f64>().ok())
                .unwrap_or(0.0);
            let mut row = row;
            if current < height {
                row = set_attr(sheet, row, "ht", &format_points(height));
                row = set_attr(sheet, row, "customHeight", "1");
            }
            if let Some(spans) = attr(row.text(sheet), "spans") {
                if let Some((_, last)) = spans.split_once(':') {
                    row = set_attr(sheet, row, "spans", &format!("1:{last}"));
                }
            }
            replace_or_insert_a1(package, sheet, row, &cell)?;
        }
        None => {
            let row = format!(
                r#"<row r="1" ht="{}" customHeight="1">{cell}</row>"#,
                format_points(height)
            );
            let at = if data.self_closing {
                content_end(sheet, "sheetData", data)
                    .ok_or_else(|| package.malformed("unterminated <sheetData>"))?
            } else {
                data.end
            };
            sheet.insert_str(at, &row);
        }
    }

    if let Some(dimension) = find_tag(sheet, "dimension", 0) {
        let reference = if (last_col, last_row) == (1, 1) {
            "A1".to_string()
        } else {
            format!("A1:{}{last_row}", column_name(last_col))
        };
        set_attr(sheet, dimension, "ref", &reference);
    }
    Ok(())
}

fn replace_or_insert_a1(
    package: &Package,
    sheet: &mut String,
    row: Tag,
    cell: &str,
) -> StampResult<()> {
    let row_end = element_end(sheet, "row", row)
        .ok_or_else(|| package.malformed("unterminated <row>"))?;
    let existing = elements(&sheet[..row_end], "c")
        .into_iter()
        .filter(|tag| tag.start > row.start)
        .find(|tag| attr(tag.text(sheet), "r").as_deref() == Some("A1"));
    match existing {
        Some(tag) => {
            let end = element_end(sheet, "c", tag)
                .ok_or_else(|| package.malformed("unterminated <c>"))?;
            sheet.replace_range(tag.start..end, cell);
        }
        None => {
            let at = if row.self_closing {
                content_end(sheet, "row", row).ok_or_else(|| package.malformed("unterminated <row>"))?
            } else {
                row.end
            };
            sheet.insert_str(at, cell);
        }
    }
    Ok(())
}

fn format_points(value: f64) -> String {
    let text = format!("{value:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Anchor the seal's top-left corner to the last used cell, never above row 2
/// so it cannot cover the stamp in A1.
fn anchor_seal(
    package: &mut Package,
    sheet: &str,
    sheet_xml: &mut String,
    seal: &Seal,
    last_col: u32,
    last_row: u32,
) -> StampResult<()> {
    let mut sheet_rels = package.relationships(sheet)?;
    let existing = find_tag(sheet_xml, "drawing", 0)
        .and_then(|tag| attr(tag.text(sheet_xml), "r:id"))
        .and_then(|id| sheet_rels.by_id(&id))
        .map(|rel| sheet_rels.resolve(&rel.target));

    let (drawing, mut drawing_xml) = match existing {
        Some(part) => {
            let xml = package.xml(&part)?;
            if root_prefix(&xml, "wsDr").as_deref() != Some("xdr:") {
                return Err(package.malformed(format!("{part} has no xdr:wsDr root")));
            }
            (part, xml)
        }
        None => {
            let part = package.unused_name(|n| format!("xl/drawings/drawing{n}.xml"));
            let xml = format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<xdr:wsDr xmlns:xdr="{NS_SHEET_DRAWING}" xmlns:a="{NS_DRAWING}"></xdr:wsDr>"#
            );
            package.add_override(&part, CT_DRAWING)?;
            let id = sheet_rels.add(REL_DRAWING, &part)?;
            insert_drawing_element(sheet_xml, &id);
            package.put_relationships(sheet_rels);
            (part, xml)
        }
    };

    let media = package.unused_name(|n| format!("xl/media/ordina_seal{n}.png"));
    package.put(&media, seal.png().to_vec());
    package.ensure_default("png", "image/png")?;
    let mut drawing_rels = package.relationships(&drawing)?;
    let image_id = drawing_rels.add(REL_IMAGE, &media)?;
    package.put_relationships(drawing_rels);

    let shape_id = elements(&drawing_xml, "xdr:cNvPr")
        .into_iter()
        .filter_map(|tag| attr(tag.text(&drawing_xml), "id")?.parse::<u64>().ok())
        .max()
        .unwrap_or(0)
        + 1;
    let cx = SEAL_WIDTH_PX * EMU_PER_PX;
    let cy = seal.scaled_height(cx).max(EMU_PER_PX);
    let anchor = format!(
        concat!(
            "<xdr:oneCellAnchor><xdr:from><xdr:col>{col}</xdr:col><xdr:colOff>0</xdr:colOff>",
            "<xdr:row>{row}</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:from>",
            r#"<xdr:ext cx="{cx}" cy="{cy}"/><xdr:pic xmlns:a="{a}"><xdr:nvPicPr>"#,
            r#"<xdr:cNvPr id="{shape}" name="Seal {shape}"/><xdr:cNvPicPr><a:picLocks noChangeAspect="1"/></xdr:cNvPicPr></xdr:nvPicPr>"#,
            r#"<xdr:blipFill><a:blip r:embed="{id}" xmlns:r="{r}"/><a:stretch><a:fillRect/></a:stretch></xdr:blipFill>"#,
            r#"<xdr:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></xdr:spPr>"#,
            "</xdr:pic><xdr:clientData/></xdr:oneCellAnchor>"
        ),
        col = last_col.saturating_sub(1),
        row = last_row.saturating_sub(1).max(1),
        cx = cx,
        cy = cy,
        a = NS_DRAWING,
        shape = shape_id,
        id = image_id,
        r = NS_RELATIONSHIPS,
    );
    insert_before_close(&mut drawing_xml, "xdr:wsDr", &anchor)
        .ok_or_else(|| package.malformed(format!("{drawing} has no xdr:wsDr root")))?;
    package.put(&drawing, drawing_xml.into_bytes());
    Ok(())
}

/// `<drawing>` goes before the first worksheet child that follows it in
/// the schema, else at the end.
fn insert_drawing_element(sheet: &mut String, id: &str) {
    let element = format!(r#"<drawing r:id="{id}" xmlns:r="{NS_RELATIONSHIPS}"/>"#);
    let before = AFTER_DRAWING
        .iter()
        .filter_map(|name| find_tag(sheet, name, 0))
        .map(|tag| tag.start)
        .min();
    match before {
        Some(at) => sheet.insert_str(at, &element),
        None => {
            insert_before_close(sheet, "worksheet", &element);
        }
    }
}

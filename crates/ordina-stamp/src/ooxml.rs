//! Minimal OOXML package editing shared by the text and sheet stampers.
//!
//! A package is read fully into memory as an ordered list of zip entries,
//! edited in place, and written back with every entry deflated. XML parts
//! are edited textually: only the elements the stampers touch are located
//! and rewritten, everything else is carried through byte for byte.

use std::io::{Cursor, Read, Write};

use ordina_types::DocumentFormat;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{StampError, StampResult};

pub const CONTENT_TYPES: &str = "[Content_Types].xml";
pub const NS_RELATIONSHIPS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub const NS_DRAWING: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub const NS_PICTURE: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";
pub const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
pub const REL_IMAGE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
/// EMU per pixel at 96 dpi.
pub const EMU_PER_PX: u64 = 9525;

struct Entry {
    name: String,
    data: Vec<u8>,
    is_dir: bool,
}

/// An OOXML zip package held in memory.
pub struct Package {
    format: DocumentFormat,
    entries: Vec<Entry>,
}

impl Package {
    pub fn read(format: DocumentFormat, bytes: &[u8]) -> StampResult<Self> {
        let mut archive =
            ZipArchive::new(Cursor::new(bytes)).map_err(|e| StampError::malformed(format, e.to_string()))?;
        let mut entries = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let mut file = archive
                .by_index(index)
                .map_err(|e| StampError::malformed(format, e.to_string()))?;
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)
                .map_err(|e| StampError::malformed(format, format!("{}: {e}", file.name())))?;
            entries.push(Entry {
                name: file.name().to_string(),
                data,
                is_dir: file.is_dir(),
            });
        }
        let package = Self { format, entries };
        if !package.contains(CONTENT_TYPES) {
            return Err(package.malformed(format!("missing {CONTENT_TYPES}")));
        }
        Ok(package)
    }

    pub fn malformed(&self, reason: impl Into<String>) -> StampError {
        StampError::malformed(self.format, reason)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| !e.is_dir && e.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|e| !e.is_dir && e.name == name)
            .map(|e| e.data.as_slice())
    }

    /// A part decoded as UTF-8 text.
    pub fn xml(&self, name: &str) -> StampResult<String> {
        let data = self
            .get(name)
            .ok_or_else(|| self.malformed(format!("missing part {name}")))?;
        String::from_utf8(data.to_vec()).map_err(|_| self.malformed(format!("{name} is not UTF-8")))
    }

    /// Replace a part, or append it when new.
    pub fn put(&mut self, name: &str, data: impl Into<Vec<u8>>) {
        let data = data.into();
        match self.entries.iter_mut().find(|e| !e.is_dir && e.name == name) {
            Some(entry) => entry.data = data,
            None => self.entries.push(Entry {
                name: name.to_string(),
                data,
                is_dir: false,
            }),
        }
    }

    /// First `make(n)` for n = 1, 2, … that is not a part yet.
    pub fn unused_name(&self, make: impl Fn(u32) -> String) -> String {
        (1..)
            .map(&make)
            .find(|name| !self.contains(name))
            .unwrap_or_else(|| make(0))
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter(|e| !e.is_dir).map(|e| e.name.as_str())
    }

    /// Relationships of `part` (the package itself for `""`), empty when the
    /// `.rels` part does not exist yet.
    pub fn relationships(&self, part: &str) -> StampResult<Relationships> {
        let path = rels_path(part);
        let xml = if self.contains(&path) {
            self.xml(&path)?
        } else {
            Relationships::EMPTY.to_string()
        };
        Ok(Relationships {
            format: self.format,
            source: part.to_string(),
            path,
            xml,
        })
    }

    pub fn put_relationships(&mut self, rels: Relationships) {
        self.put(&rels.path, rels.xml.into_bytes());
    }

    /// The part the package-level `officeDocument` relationship points at.
    pub fn main_part(&self, fallback: &str) -> StampResult<String> {
        let rels = self.relationships("")?;
        Ok(rels
            .first_of_type(REL_OFFICE_DOCUMENT)
            .map(|rel| rels.resolve(&rel.target))
            .unwrap_or_else(|| fallback.to_string()))
    }

    /// Register an `Override` content type for `part`.
    pub fn add_override(&mut self, part: &str, content_type: &str) -> StampResult<()> {
        let mut types = self.xml(CONTENT_TYPES)?;
        let element = format!(r#"<Override PartName="/{part}" ContentType="{content_type}"/>"#);
        insert_before_close(&mut types, "Types", &element)
            .ok_or_else(|| self.malformed("content types has no <Types> root"))?;
        self.put(CONTENT_TYPES, types.into_bytes());
        Ok(())
    }

    /// Register a `Default` content type for `extension` unless one exists.
    pub fn ensure_default(&mut self, extension: &str, content_type: &str) -> StampResult<()> {
        let mut types = self.xml(CONTENT_TYPES)?;
        let present = elements(&types, "Default").into_iter().any(|tag| {
            attr(tag.text(&types), "Extension")
                .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
        });
        if present {
            return Ok(());
        }
        let element = format!(r#"<Default Extension="{extension}" ContentType="{content_type}"/>"#);
        insert_before_close(&mut types, "Types", &element)
            .ok_or_else(|| self.malformed("content types has no <Types> root"))?;
        self.put(CONTENT_TYPES, types.into_bytes());
        Ok(())
    }

    /// Serialize with every entry deflated, in original order.
    pub fn write(&self) -> StampResult<Vec<u8>> {
        let encode = |e: zip::result::ZipError| StampError::encode(self.format, e);
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        for entry in &self.entries {
            if entry.is_dir {
                writer.add_directory(entry.name.as_str(), options).map_err(encode)?;
            } else {
                writer.start_file(entry.name.as_str(), options).map_err(encode)?;
                writer
                    .write_all(&entry.data)
                    .map_err(|e| StampError::encode(self.format, e))?;
            }
        }
        Ok(writer.finish().map_err(encode)?.into_inner())
    }
}

/// `word/document.xml` → `word/_rels/document.xml.rels`; `""` → `_rels/.rels`.
pub fn rels_path(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Directory of a part name, without trailing slash.
pub fn part_dir(part: &str) -> &str {
    part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Resolve a relationship target against the directory of its source part.
pub fn resolve_target(source: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = part_dir(source).split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Relative path from the directory of `source` to `target` (both part names).
pub fn relative_target(source: &str, target: &str) -> String {
    let from: Vec<&str> = part_dir(source).split('/').filter(|s| !s.is_empty()).collect();
    let to: Vec<&str> = target.split('/').collect();
    let common = from
        .iter()
        .zip(&to)
        .take_while(|(a, b)| a == b)
        .count()
        .min(to.len().saturating_sub(1));
    let mut parts: Vec<&str> = vec![".."; from.len() - common];
    parts.extend(&to[common..]);
    parts.join("/")
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub kind: String,
    pub target: String,
}

/// A `.rels` part.
#[derive(Clone, Debug)]
pub struct Relationships {
    format: DocumentFormat,
    source: String,
    path: String,
    xml: String,
}

impl Relationships {
    const EMPTY: &'static str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        "\n",
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"></Relationships>"#
    );

    pub fn all(&self) -> Vec<Relationship> {
        elements(&self.xml, "Relationship")
            .into_iter()
            .filter_map(|tag| {
                let text = tag.text(&self.xml);
                Some(Relationship {
                    id: attr(text, "Id")?,
                    kind: attr(text, "Type")?,
                    target: attr(text, "Target")?,
                })
            })
            .collect()
    }

    pub fn by_id(&self, id: &str) -> Option<Relationship> {
        self.all().into_iter().find(|rel| rel.id == id)
    }

    pub fn first_of_type(&self, kind: &str) -> Option<Relationship> {
        self.all().into_iter().find(|rel| rel.kind == kind)
    }

    /// Part name a relationship target points at.
    pub fn resolve(&self, target: &str) -> String {
        resolve_target(&self.source, target)
    }

    /// `rIdN` with N one past the highest numeric `rId` in use.
    pub fn next_id(&self) -> String {
        let max = self
            .all()
            .iter()
            .filter_map(|rel| rel.id.strip_prefix("rId")?.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        format!("rId{}", max + 1)
    }

    /// Add a relationship to the part `target` and return its id.
    pub fn add(&mut self, kind: &str, target: &str) -> StampResult<String> {
        let id = self.next_id();
        let relative = relative_target(&self.source, target);
        let element = format!(
            r#"<Relationship Id="{id}" Type="{kind}" Target="{}"/>"#,
            escape(&relative)
        );
        insert_before_close(&mut self.xml, "Relationships", &element).ok_or_else(|| {
            StampError::malformed(self.format, format!("{} has no <Relationships> root", self.path))
        })?;
        Ok(id)
    }
}

/// Byte span of one start tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tag {
    pub start: usize,
    /// One past the closing `>`.
    pub end: usize,
    pub self_closing: bool,
}

impl Tag {
    pub fn text<'a>(&self, xml: &'a str) -> &'a str {
        &xml[self.start..self.end]
    }
}

fn is_name_end(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\r' | b'\n' | b'/' | b'>')
}

/// Next start tag of `name` (qualified, e.g. `w:p`) at or after `from`.
pub fn find_tag(xml: &str, name: &str, from: usize) -> Option<Tag> {
    let needle = format!("<{name}");
    let bytes = xml.as_bytes();
    let mut cursor = from;
    while let Some(offset) = xml.get(cursor..)?.find(&needle) {
        let start = cursor + offset;
        let after = start + needle.len();
        if after < bytes.len() && is_name_end(bytes[after]) {
            let close = start + xml[start..].find('>')?;
            return Some(Tag {
                start,
                end: close + 1,
                self_closing: bytes[close - 1] == b'/',
            });
        }
        cursor = after;
    }
    None
}

/// Every start tag of `name`, in document order.
pub fn elements(xml: &str, name: &str) -> Vec<Tag> {
    let mut found = Vec::new();
    let mut cursor = 0;
    while let Some(tag) = find_tag(xml, name, cursor) {
        cursor = tag.end;
        found.push(tag);
    }
    found
}

/// Byte offset one past the end of the element opened by `tag`, honouring
/// nested elements of the same name.
pub fn element_end(xml: &str, name: &str, tag: Tag) -> Option<usize> {
    if tag.self_closing {
        return Some(tag.end);
    }
    let close = format!("</{name}>");
    let mut depth = 1usize;
    let mut cursor = tag.end;
    loop {
        let next_close = cursor + xml[cursor..].find(&close)?;
        match find_tag(xml, name, cursor) {
            Some(open) if open.start < next_close => {
                if !open.self_closing {
                    depth += 1;
                }
                cursor = open.end;
            }
            _ => {
                depth -= 1;
                cursor = next_close + close.len();
                if depth == 0 {
                    return Some(cursor);
                }
            }
        }
    }
}

/// Offset of the closing tag of the element opened by `tag` (where new
/// children are appended). A self-closing tag is expanded first.
pub fn content_end(xml: &mut String, name: &str, tag: Tag) -> Option<usize> {
    if tag.self_closing {
        let open = xml[tag.start..tag.end - 2].trim_end().to_string();
        xml.replace_range(tag.start..tag.end, &format!("{open}></{name}>"));
        return Some(tag.start + open.len() + 1);
    }
    let end = element_end(xml, name, tag)?;
    Some(end - name.len() - 3)
}

/// Append `child` as the last child of the first `name` element.
pub fn insert_before_close(xml: &mut String, name: &str, child: &str) -> Option<()> {
    let tag = find_tag(xml, name, 0)?;
    let at = content_end(xml, name, tag)?;
    xml.insert_str(at, child);
    Some(())
}

/// Value of attribute `name` in a start tag, unescaped.
pub fn attr(tag: &str, name: &str) -> Option<String> {
    let bytes = tag.as_bytes();
    let mut cursor = 0;
    while let Some(offset) = tag[cursor..].find(name) {
        let start = cursor + offset;
        let before_ok = start > 0 && matches!(bytes[start - 1], b' ' | b'\t' | b'\r' | b'\n');
        let rest = tag[start + name.len()..].trim_start();
        if before_ok {
            if let Some(value) = rest.strip_prefix('=') {
                let value = value.trim_start();
                let quote = value.chars().next()?;
                if quote == '"' || quote == '\'' {
                    let inner = &value[1..];
                    let close = inner.find(quote)?;
                    return Some(unescape(&inner[..close]));
                }
            }
        }
        cursor = start + name.len();
    }
    None
}

/// Set (or add) attribute `name` on the start tag at `tag`.
pub fn set_attr(xml: &mut String, tag: Tag, name: &str, value: &str) -> Tag {
    let text = tag.text(xml).to_string();
    let rebuilt = match attr_span(&text, name) {
        Some((start, end)) => format!("{}{}{}", &text[..start], escape(value), &text[end..]),
        None => {
            let insert_at = if tag.self_closing { text.len() - 2 } else { text.len() - 1 };
            let head = text[..insert_at].trim_end();
            format!(r#"{head} {name}="{}"{}"#, escape(value), &text[insert_at..])
        }
    };
    xml.replace_range(tag.start..tag.end, &rebuilt);
    Tag {
        start: tag.start,
        end: tag.start + rebuilt.len(),
        self_closing: tag.self_closing,
    }
}

/// Byte range of the raw value of attribute `name` within a start tag.
fn attr_span(tag: &str, name: &str) -> Option<(usize, usize)> {
    let bytes = tag.as_bytes();
    let mut cursor = 0;
    while let Some(offset) = tag[cursor..].find(name) {
        let start = cursor + offset;
        let after = start + name.len();
        if start > 0 && matches!(bytes[start - 1], b' ' | b'\t' | b'\r' | b'\n') {
            let rest = &tag[after..];
            let trimmed = rest.trim_start();
            if let Some(value) = trimmed.strip_prefix('=') {
                let value_trimmed = value.trim_start();
                let quote = value_trimmed.chars().next()?;
                if quote == '"' || quote == '\'' {
                    let value_start = tag.len() - value_trimmed.len() + 1;
                    let close = tag[value_start..].find(quote)?;
                    return Some((value_start, value_start + close));
                }
            }
        }
        cursor = after;
    }
    None
}

/// Qualified-name prefix (`"w:"`, `""`) of the root element `local`.
pub fn root_prefix(xml: &str, local: &str) -> Option<String> {
    let bytes = xml.as_bytes();
    let mut cursor = 0;
    while let Some(offset) = xml[cursor..].find('<') {
        let start = cursor + offset + 1;
        cursor = start;
        if matches!(bytes.get(start), Some(b'?' | b'!')) {
            continue;
        }
        let name_len = xml[start..].bytes().position(is_name_end)?;
        let qualified = &xml[start..start + name_len];
        let (prefix, name) = match qualified.split_once(':') {
            Some((prefix, name)) => (format!("{prefix}:"), name),
            None => (String::new(), qualified),
        };
        return (name == local).then_some(prefix);
    }
    None
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
pub(crate) mod fixture {
    use super::*;

    /// Zip `parts` into a package.
    pub fn package(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in parts {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(data.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    pub fn part(bytes: &[u8], name: &str) -> Option<String> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).ok()?;
        let mut data = Vec::new();
        file.read_to_end(&mut data).unwrap();
        Some(String::from_utf8_lossy(&data).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rels_paths() {
        assert_eq!(rels_path(""), "_rels/.rels");
        assert_eq!(rels_path("word/document.xml"), "word/_rels/document.xml.rels");
        assert_eq!(
            rels_path("xl/worksheets/sheet1.xml"),
            "xl/worksheets/_rels/sheet1.xml.rels"
        );
    }

    #[test]
    fn targets_resolve_relative_to_source() {
        assert_eq!(resolve_target("", "word/document.xml"), "word/document.xml");
        assert_eq!(resolve_target("word/document.xml", "header1.xml"), "word/header1.xml");
        assert_eq!(
            resolve_target("xl/worksheets/sheet1.xml", "../drawings/drawing1.xml"),
            "xl/drawings/drawing1.xml"
        );
        assert_eq!(resolve_target("xl/workbook.xml", "/xl/styles.xml"), "xl/styles.xml");
    }

    #[test]
    fn relative_targets_invert_resolution() {
        let cases = [
            ("word/document.xml", "word/header2.xml"),
            ("word/footer1.xml", "word/media/seal.png"),
            ("xl/worksheets/sheet1.xml", "xl/drawings/drawing1.xml"),
            ("xl/drawings/drawing1.xml", "xl/media/seal1.png"),
            ("", "word/document.xml"),
        ];
        for (source, target) in cases {
            let relative = relative_target(source, target);
            assert_eq!(resolve_target(source, &relative), target, "{source} -> {target}");
        }
        assert_eq!(
            relative_target("xl/worksheets/sheet1.xml", "xl/drawings/drawing1.xml"),
            "../drawings/drawing1.xml"
        );
    }

    #[test]
    fn find_tag_respects_name_boundaries() {
        let xml = r#"<w:pPr/><w:p w:rsidR="1"><w:r/></w:p>"#;
        let tag = find_tag(xml, "w:p", 0).unwrap();
        assert_eq!(tag.text(xml), r#"<w:p w:rsidR="1">"#);
        assert!(!tag.self_closing);
        assert_eq!(element_end(xml, "w:p", tag), Some(xml.len()));
    }

    #[test]
    fn element_end_handles_nesting() {
        let xml = "<a><b><a>inner</a></b><a/></a><a>next</a>";
        let tag = find_tag(xml, "a", 0).unwrap();
        assert_eq!(&xml[..element_end(xml, "a", tag).unwrap()], "<a><b><a>inner</a></b><a/></a>");
    }

    #[test]
    fn insert_expands_self_closing() {
        let mut xml = r#"<root><list count="0"/></root>"#.to_string();
        insert_before_close(&mut xml, "list", "<item/>").unwrap();
        assert_eq!(xml, r#"<root><list count="0"><item/></list></root>"#);
    }

    #[test]
    fn attributes_read_and_write() {
        let mut xml = r#"<row r="1" spans="1:3"><c r="A1"/></row>"#.to_string();
        let tag = find_tag(&xml, "row", 0).unwrap();
        assert_eq!(attr(tag.text(&xml), "r").as_deref(), Some("1"));
        assert_eq!(attr(tag.text(&xml), "spans").as_deref(), Some("1:3"));
        assert_eq!(attr(tag.text(&xml), "ht"), None);

        let tag = set_attr(&mut xml, tag, "ht", "40");
        let tag = set_attr(&mut xml, tag, "r", "1");
        assert_eq!(tag.text(&xml), r#"<row r="1" spans="1:3" ht="40">"#);
        assert!(xml.ends_with(r#"<c r="A1"/></row>"#));
    }

    #[test]
    fn attr_ignores_prefixed_lookalikes() {
        let tag = r#"<sheet name="A" sheetId="1" r:id="rId3"/>"#;
        assert_eq!(attr(tag, "r:id").as_deref(), Some("rId3"));
        assert_eq!(attr(tag, "id"), None);
    }

    #[test]
    fn root_prefix_skips_declaration() {
        let xml = r#"<?xml version="1.0"?><w:document xmlns:w="x"></w:document>"#;
        assert_eq!(root_prefix(xml, "document").as_deref(), Some("w:"));
        assert_eq!(root_prefix("<worksheet/>", "worksheet").as_deref(), Some(""));
        assert_eq!(root_prefix("<x:worksheet/>", "workbook"), None);
    }

    #[test]
    fn relationships_allocate_ids() {
        let mut rels = Relationships {
            format: DocumentFormat::OfficeText,
            source: "word/document.xml".into(),
            path: rels_path("word/document.xml"),
            xml: Relationships::EMPTY.to_string(),
        };
        assert_eq!(rels.next_id(), "rId1");
        let id = rels.add(REL_IMAGE, "word/media/seal.png").unwrap();
        assert_eq!(id, "rId1");
        let rel = rels.by_id("rId1").unwrap();
        assert_eq!(rel.target, "media/seal.png");
        assert_eq!(rels.resolve(&rel.target), "word/media/seal.png");
        assert_eq!(rels.next_id(), "rId2");
    }

    #[test]
    fn package_roundtrip_preserves_parts() {
        let bytes = fixture::package(&[
            (CONTENT_TYPES, r#"<Types xmlns="t"><Default Extension="xml" ContentType="application/xml"/></Types>"#),
            ("docProps/app.xml", "<Properties/>"),
        ]);
        let mut package = Package::read(DocumentFormat::OfficeText, &bytes).unwrap();
        package.ensure_default("PNG", "image/png").unwrap();
        package.ensure_default("png", "image/png").unwrap();
        package.add_override("word/header1.xml", "application/x-header").unwrap();
        let out = package.write().unwrap();

        let types = fixture::part(&out, CONTENT_TYPES).unwrap();
        assert_eq!(types.matches("Extension=\"PNG\"").count(), 1);
        assert!(!types.contains("Extension=\"png\""));
        assert!(types.contains(r#"<Override PartName="/word/header1.xml" ContentType="application/x-header"/>"#));
        assert_eq!(fixture::part(&out, "docProps/app.xml").unwrap(), "<Properties/>");
    }

    #[test]
    fn non_zip_is_malformed() {
        let err = Package::read(DocumentFormat::OfficeSheet, b"PK but not really").err().unwrap();
        assert!(matches!(err, StampError::MalformedOfficeSheet(_)));
    }

    #[test]
    fn package_without_content_types_is_malformed() {
        let bytes = fixture::package(&[("word/document.xml", "<w:document/>")]);
        let err = Package::read(DocumentFormat::OfficeText, &bytes).err().unwrap();
        assert!(matches!(err, StampError::MalformedOfficeText(_)));
    }

    #[test]
    fn escape_covers_markup() {
        assert_eq!(escape(r#"<a & "b">"#), "&lt;a &amp; &quot;b&quot;&gt;");
        assert_eq!(unescape("&lt;a &amp;amp;&gt;"), "<a &amp;>");
    }
}

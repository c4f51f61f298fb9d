use std::path::Path;

use ordina_types::DocumentFormat;

use crate::docx::DocxStamper;
use crate::error::{StampError, StampResult};
use crate::raster::ImageStamper;
use crate::pdf::PdfStamper;
use crate::traits::Stamper;
use crate::xlsx::XlsxStamper;

/// Maps a file path to its [`DocumentFormat`] by extension alone.
#[derive(Clone, Copy, Debug, Default)]
pub struct FormatDispatcher;

impl FormatDispatcher {
    /// Case-insensitive extension lookup; no content sniffing.
    pub fn select(path: &Path) -> StampResult<DocumentFormat> {
        DocumentFormat::from_path(path).ok_or_else(|| StampError::UnsupportedFormat {
            path: path.display().to_string(),
            extension: path
                .extension()
                .map(|ext| ext.to_string_lossy().into_owned())
                .unwrap_or_default(),
        })
    }
}

/// One stamper per [`DocumentFormat`].
#[derive(Debug, Default)]
pub struct StamperSet {
    image: ImageStamper,
    pdf: PdfStamper,
    docx: DocxStamper,
    xlsx: XlsxStamper,
}

impl StamperSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_format(&self, format: DocumentFormat) -> &dyn Stamper {
        match format {
            DocumentFormat::Image => &self.image,
            DocumentFormat::Pdf => &self.pdf,
            DocumentFormat::OfficeText => &self.docx,
            DocumentFormat::OfficeSheet => &self.xlsx,
        }
    }

    /// [`FormatDispatcher::select`] followed by [`StamperSet::for_format`].
    pub fn for_path(&self, path: &Path) -> StampResult<&dyn Stamper> {
        Ok(self.for_format(FormatDispatcher::select(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_by_extension() {
        let cases = [
            ("scan.PNG", DocumentFormat::Image),
            ("photo.jpg", DocumentFormat::Image),
            ("photo.JPEG", DocumentFormat::Image),
            ("invoice.pdf", DocumentFormat::Pdf),
            ("letter.Docx", DocumentFormat::OfficeText),
            ("ledger.xlsx", DocumentFormat::OfficeSheet),
        ];
        for (name, format) in cases {
            assert_eq!(FormatDispatcher::select(Path::new(name)).unwrap(), format, "{name}");
        }
    }

    #[test]
    fn rejects_unknown_and_missing_extensions() {
        for name in ["notes.txt", "archive.tar.gz", "README", "legacy.doc", "old.xls"] {
            let err = FormatDispatcher::select(Path::new(name)).unwrap_err();
            assert!(matches!(err, StampError::UnsupportedFormat { .. }), "{name}");
        }
    }

    #[test]
    fn every_format_has_its_stamper() {
        let set = StamperSet::new();
        for format in DocumentFormat::ALL {
            assert_eq!(set.for_format(format).format(), format);
        }
    }

    #[test]
    fn for_path_reports_extension() {
        let set = StamperSet::new();
        match set.for_path(Path::new("/tmp/report.odt")) {
            Err(StampError::UnsupportedFormat { extension, .. }) => assert_eq!(extension, "odt"),
            other => panic!("unexpected: {:?}", other.map(|s| s.format())),
        }
    }
}

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Maps a source document and its protocol to the artifact location.
///
/// `<root>/<year>/<stem>__<number>.<ext>`: the stem and extension are kept
/// verbatim and the number is the raw counter, so two distinct numbers never
/// share a filename.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputPathResolver {
    root: PathBuf,
}

impl OutputPathResolver {
    pub const SEPARATOR: &'static str = "__";

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn year_dir(&self, year: i32) -> PathBuf {
        self.root.join(year.to_string())
    }

    /// The artifact path, without touching the filesystem.
    pub fn path_for(&self, source: &Path, year: i32, number: u64) -> PathBuf {
        let mut name = OsString::new();
        name.push(source.file_stem().unwrap_or(source.as_os_str()));
        name.push(Self::SEPARATOR);
        name.push(number.to_string());
        if let Some(extension) = source.extension() {
            name.push(".");
            name.push(extension);
        }
        self.year_dir(year).join(name)
    }

    /// [`path_for`](Self::path_for), creating the year directory if needed.
    pub fn resolve(&self, source: &Path, year: i32, number: u64) -> std::io::Result<PathBuf> {
        fs::create_dir_all(self.year_dir(year))?;
        Ok(self.path_for(source, year, number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn keeps_stem_and_extension() {
        let resolver = OutputPathResolver::new("/out");
        assert_eq!(
            resolver.path_for(Path::new("/in/invoice.pdf"), 2025, 42),
            PathBuf::from("/out/2025/invoice__42.pdf")
        );
        assert_eq!(
            resolver.path_for(Path::new("Scan.Final.JPG"), 2024, 7),
            PathBuf::from("/out/2024/Scan.Final__7.JPG")
        );
    }

    #[test]
    fn number_is_not_padded() {
        let resolver = OutputPathResolver::new("out");
        let path = resolver.path_for(Path::new("a.docx"), 2025, 5);
        assert_eq!(path.file_name().unwrap(), "a__5.docx");
    }

    #[test]
    fn resolve_creates_year_dir() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = OutputPathResolver::new(dir.path().join("Protocolli"));
        let path = resolver.resolve(Path::new("x.png"), 2026, 1).unwrap();
        assert!(path.parent().unwrap().is_dir());
        assert!(!path.exists());
        // Second call with the directory in place.
        assert_eq!(resolver.resolve(Path::new("x.png"), 2026, 1).unwrap(), path);
    }

    proptest! {
        #[test]
        fn resolution_is_idempotent(
            stem in "[A-Za-z0-9 _-]{1,16}",
            ext in "(pdf|png|jpg|docx|xlsx)",
            year in 1990i32..2100,
            number in 1u64..1_000_000,
        ) {
            let resolver = OutputPathResolver::new("/out");
            let source = PathBuf::from(format!("/docs/{stem}.{ext}"));
            let first = resolver.path_for(&source, year, number);
            prop_assert_eq!(&first, &resolver.path_for(&source, year, number));
            prop_assert!(first.starts_with(resolver.year_dir(year)));
        }

        #[test]
        fn distinct_numbers_never_collide(
            stem in "[a-z]{1,8}",
            a in 1u64..10_000,
            b in 1u64..10_000,
        ) {
            prop_assume!(a != b);
            let resolver = OutputPathResolver::new("out");
            let source = PathBuf::from(format!("{stem}.pdf"));
            prop_assert_ne!(
                resolver.path_for(&source, 2025, a),
                resolver.path_for(&source, 2025, b)
            );
        }
    }
}

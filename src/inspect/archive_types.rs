use std::collections::HashSet;
use std::fmt;

use crate::zip::ZipFileEntry;

/// Extensions treated as nested archives when none are configured
pub const DEFAULT_ARCHIVE_TYPES: &[&str] = &[".zip", ".esa", ".jar", ".ear", ".war"];

/// Set of file extensions whose entries are opened as nested archives.
///
/// Extensions are stored with their leading dot and matched case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveTypeSet {
    extensions: HashSet<String>,
}

impl ArchiveTypeSet {
    /// Build the set from user supplied extensions; `jar` and `.jar` are
    /// equivalent. Falls back to [`DEFAULT_ARCHIVE_TYPES`] when nothing
    /// usable is given.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions: HashSet<String> = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim().to_string())
            .filter(|ext| !ext.is_empty() && ext != ".")
            .map(|ext| {
                if ext.starts_with('.') {
                    ext
                } else {
                    format!(".{ext}")
                }
            })
            .collect();

        if extensions.is_empty() {
            Self::default()
        } else {
            Self { extensions }
        }
    }

    pub fn contains(&self, extension: &str) -> bool {
        self.extensions.contains(extension)
    }

    /// Whether `entry` should be opened as a nested archive.
    /// Directory markers carry no bytes and never qualify.
    pub fn is_archive(&self, entry: &ZipFileEntry) -> bool {
        !entry.is_directory && entry.extension().is_some_and(|ext| self.contains(ext))
    }
}

impl Default for ArchiveTypeSet {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_ARCHIVE_TYPES.iter().map(|ext| ext.to_string()).collect(),
        }
    }
}

impl fmt::Display for ArchiveTypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut extensions: Vec<_> = self.extensions.iter().map(String::as_str).collect();
        extensions.sort_unstable();
        write!(f, "{}", extensions.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zip::CompressionMethod;

    fn entry(name: &str) -> ZipFileEntry {
        ZipFileEntry {
            file_name: name.to_string(),
            compression_method: CompressionMethod::Stored,
            compressed_size: 0,
            uncompressed_size: 0,
            crc32: 0,
            lfh_offset: 0,
            is_directory: name.ends_with('/'),
        }
    }

    #[test]
    fn defaults_when_empty() {
        let set = ArchiveTypeSet::new([""]);
        assert_eq!(set, ArchiveTypeSet::default());
        for ext in DEFAULT_ARCHIVE_TYPES {
            assert!(set.contains(ext));
        }
        assert_eq!(ArchiveTypeSet::new(Vec::<String>::new()), ArchiveTypeSet::default());
    }

    #[test]
    fn normalizes_leading_dot() {
        let set = ArchiveTypeSet::new("apk, .aar ,,".split(','));
        assert!(set.contains(".apk"));
        assert!(set.contains(".aar"));
        assert!(!set.contains(".zip"));
        assert_eq!(set.to_string(), ".aar,.apk");
    }

    #[test]
    fn matching_is_case_sensitive() {
        let set = ArchiveTypeSet::default();
        assert!(set.is_archive(&entry("lib/app.jar")));
        assert!(!set.is_archive(&entry("lib/APP.JAR")));
        assert!(!set.is_archive(&entry("zip")));
    }

    #[test]
    fn directory_markers_are_never_archives() {
        let set = ArchiveTypeSet::default();
        assert!(!set.is_archive(&entry("bundle.zip/")));
        assert!(!set.is_archive(&entry("exploded.war/WEB-INF/")));
    }
}

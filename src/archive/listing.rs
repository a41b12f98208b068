//! Archive listing
//!
//! Reads a finished ZIP back into a list of entries, in archive order.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use zip::ZipArchive;

use super::header::EntryKind;

/// A single entry of an archive listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    /// Archive path
    pub path: String,

    /// Type of entry
    #[serde(rename = "type")]
    pub kind: EntryKind,

    /// Compression method, lowercase (`stored`, `deflated`, ...)
    pub method: String,

    /// Unix mode including file type bits, when the entry records one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unix_mode: Option<u32>,

    /// Uncompressed size in bytes
    pub size: u64,

    /// Modification time as `YYYY-MM-DD hh:mm:ss`
    pub modified: String,
}

impl ListingEntry {
    /// Permission bits without the file type
    pub fn permissions(&self) -> Option<u32> {
        self.unix_mode.map(|mode| mode & 0o7777)
    }
}

/// All entries of an archive
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchiveListing {
    pub entries: Vec<ListingEntry>,
}

impl ArchiveListing {
    /// Read a listing from any seekable ZIP stream
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self, zip::result::ZipError> {
        let mut archive = ZipArchive::new(reader)?;
        let mut entries = Vec::with_capacity(archive.len());

        for index in 0..archive.len() {
            let file = archive.by_index_raw(index)?;
            let modified = file.last_modified();
            entries.push(ListingEntry {
                path: file.name().to_string(),
                kind: if file.is_dir() {
                    EntryKind::Directory
                } else {
                    EntryKind::File
                },
                method: method_name(file.compression()),
                unix_mode: file.unix_mode(),
                size: file.size(),
                modified: format!(
                    "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                    modified.year(),
                    modified.month(),
                    modified.day(),
                    modified.hour(),
                    modified.minute(),
                    modified.second()
                ),
            });
        }

        Ok(Self { entries })
    }

    /// Read a listing from a ZIP file on disk
    pub fn from_file(path: &Path) -> Result<Self, zip::result::ZipError> {
        Self::from_reader(File::open(path)?)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable table, one entry per line
    pub fn to_human(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            let mode = entry
                .permissions()
                .map(|m| format!("{:04o}", m))
                .unwrap_or_else(|| "----".to_string());
            out.push_str(&format!(
                "{}  {:>10}  {:<8}  {}  {}\n",
                mode, entry.size, entry.method, entry.modified, entry.path
            ));
        }
        out
    }

    /// Total uncompressed size of all files
    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }

    /// Count of (files, directories)
    pub fn entry_counts(&self) -> (usize, usize) {
        let dirs = self
            .entries
            .iter()
            .filter(|e| e.kind == EntryKind::Directory)
            .count();
        (self.entries.len() - dirs, dirs)
    }

    /// Find an entry by path
    pub fn find_entry(&self, path: &str) -> Option<&ListingEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    /// Archive paths in order
    pub fn paths(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.path.as_str()).collect()
    }
}

fn method_name(method: zip::CompressionMethod) -> String {
    match method {
        zip::CompressionMethod::Stored => "stored".to_string(),
        zip::CompressionMethod::Deflated => "deflated".to_string(),
        other => format!("{:?}", other).to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{ArchiveSink, CompressionMethod, EntryHeader};
    use std::io::{Cursor, Write};
    use zip::ZipWriter;

    fn sample_archive() -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        writer
            .create_entry(&EntryHeader::new("bin", EntryKind::Directory))
            .unwrap();

        let mut app = EntryHeader::new("bin/app", EntryKind::File);
        app.mode = 0o755;
        app.method = CompressionMethod::Deflated;
        writer.create_entry(&app).unwrap().write_all(b"payload").unwrap();

        let readme = EntryHeader::new("README", EntryKind::File);
        writer.create_entry(&readme).unwrap().write_all(b"hi").unwrap();

        writer.finish().unwrap().into_inner()
    }

    fn sample_listing() -> ArchiveListing {
        ArchiveListing::from_reader(Cursor::new(sample_archive())).unwrap()
    }

    #[test]
    fn test_listing_order_and_kinds() {
        let listing = sample_listing();
        assert_eq!(listing.paths(), vec!["bin/", "bin/app", "README"]);
        assert_eq!(listing.entries[0].kind, EntryKind::Directory);
        assert_eq!(listing.entries[1].kind, EntryKind::File);
    }

    #[test]
    fn test_listing_methods_and_modes() {
        let listing = sample_listing();
        let app = listing.find_entry("bin/app").unwrap();
        assert_eq!(app.method, "deflated");
        assert_eq!(app.permissions(), Some(0o755));
        assert_eq!(app.size, 7);
        assert_eq!(app.modified, "1980-01-01 00:00:00");

        let readme = listing.find_entry("README").unwrap();
        assert_eq!(readme.method, "stored");
        assert_eq!(readme.permissions(), Some(0o644));
    }

    #[test]
    fn test_total_size_and_counts() {
        let listing = sample_listing();
        assert_eq!(listing.total_size(), 9);
        assert_eq!(listing.entry_counts(), (2, 1));
    }

    #[test]
    fn test_json_uses_type_key() {
        let json = sample_listing().to_json().unwrap();
        assert!(json.contains("\"type\": \"directory\""));
        assert!(json.contains("\"path\": \"bin/app\""));
    }

    #[test]
    fn test_human_output() {
        let human = sample_listing().to_human();
        assert!(human.contains("0755"));
        assert!(human.lines().any(|l| l.ends_with("bin/app")));
    }

    #[test]
    fn test_not_a_zip() {
        assert!(ArchiveListing::from_reader(Cursor::new(b"not a zip".to_vec())).is_err());
    }
}

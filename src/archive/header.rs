//! Archive entry headers
//!
//! A header is derived from the source's filesystem metadata and may be
//! rewritten by an annotator before the entry is opened in the sink.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::Metadata;
use std::path::Path;

use super::ArchiveError;

/// Kind of archive entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// Compression method of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionMethod {
    /// No compression (directories, and single files unless annotated)
    #[default]
    Stored,
    /// Deflate (files found while walking a directory)
    Deflated,
}

impl From<CompressionMethod> for zip::CompressionMethod {
    fn from(method: CompressionMethod) -> Self {
        match method {
            CompressionMethod::Stored => zip::CompressionMethod::Stored,
            CompressionMethod::Deflated => zip::CompressionMethod::Deflated,
        }
    }
}

/// Header of a single archive entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHeader {
    /// Archive path, `/` separated; directories end in `/`
    pub name: String,
    pub kind: EntryKind,
    /// Unix permission bits (`0o7777` mask)
    pub mode: u32,
    pub method: CompressionMethod,
    /// Modification time, UTC
    pub modified: NaiveDateTime,
    /// Body size in bytes as reported by the filesystem (0 for directories)
    pub size: u64,
}

impl EntryHeader {
    /// Header with default permissions and the ZIP epoch as timestamp.
    ///
    /// Directory names get a trailing `/` if they lack one.
    pub fn new(name: impl Into<String>, kind: EntryKind) -> Self {
        let mode = match kind {
            EntryKind::File => 0o644,
            EntryKind::Directory => 0o755,
        };
        Self {
            name: with_kind_suffix(name.into(), kind),
            kind,
            mode,
            method: CompressionMethod::Stored,
            modified: zip_epoch(),
            size: 0,
        }
    }

    /// Build a header from filesystem metadata.
    ///
    /// `source` is only used for error context and, on hosts without Unix
    /// permission bits, to infer executability from the file extension.
    pub fn from_metadata(
        name: impl Into<String>,
        metadata: &Metadata,
        source: &Path,
    ) -> Result<Self, ArchiveError> {
        let kind = if metadata.is_dir() {
            EntryKind::Directory
        } else if metadata.is_file() {
            EntryKind::File
        } else {
            return Err(ArchiveError::InvalidSourceType {
                path: source.to_path_buf(),
            });
        };

        let modified = metadata.modified().map_err(|e| ArchiveError::Header {
            path: source.to_path_buf(),
            reason: format!("modification time unavailable: {}", e),
        })?;

        Ok(Self {
            name: with_kind_suffix(name.into(), kind),
            kind,
            mode: mode_bits(metadata, source),
            method: CompressionMethod::Stored,
            modified: DateTime::<Utc>::from(modified).naive_utc(),
            size: if kind == EntryKind::File { metadata.len() } else { 0 },
        })
    }

    /// Returns true for directory entries
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Returns true if any execute bit is set
    pub fn is_executable(&self) -> bool {
        self.mode & 0o111 != 0
    }
}

fn with_kind_suffix(mut name: String, kind: EntryKind) -> String {
    if kind == EntryKind::Directory && !name.ends_with('/') {
        name.push('/');
    }
    name
}

/// Earliest timestamp a ZIP header can carry: 1980-01-01 00:00:00
pub fn zip_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1980, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

#[cfg(unix)]
fn mode_bits(metadata: &Metadata, _source: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn mode_bits(metadata: &Metadata, source: &Path) -> u32 {
    const EXECUTABLE_EXTENSIONS: &[&str] = &["exe", "bat", "cmd", "com"];

    let executable = metadata.is_dir()
        || source
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                EXECUTABLE_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            })
            .unwrap_or(false);

    let mut mode = if executable { 0o755 } else { 0o644 };
    if metadata.permissions().readonly() {
        mode &= !0o222;
    }
    mode
}

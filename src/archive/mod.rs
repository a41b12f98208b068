//! Deployment archive builder
//!
//! Adds a regular file or a directory tree to an open ZIP sink. Entries are
//! produced in deterministic pre-order (lexicographic by file name within each
//! directory), archive paths are normalized to `/`, and Unix modes travel with
//! every entry so executables stay executable once unpacked on Lambda.
//!
//! - Single files are stored under `root_source/<basename>` and are the only
//!   entries an [`Annotator`] sees.
//! - Directory trees yield `stored` directory entries and `deflate` file
//!   entries. A file symlink inside a tree is archived with its target's
//!   content.
//! - Anything else is rejected before an entry is written.
//!
//! The builder never finishes or closes the sink; on failure the entries
//! written so far stay in it.

mod annotate;
mod header;
mod listing;
mod path;
mod sink;

pub use annotate::{AnnotateError, Annotator, ForceMethod};
pub use header::{zip_epoch, CompressionMethod, EntryHeader, EntryKind};
pub use listing::{ArchiveListing, ListingEntry};
pub use path::{archive_name, normalize_prefix, NameError};
pub use sink::{zip_timestamp, ArchiveSink};

use std::fs::{self, File, Metadata};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::cancel::CancelFlag;

/// Copy buffer size; bounds memory use per entry
const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Errors for archive operations
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("failed to resolve source path {path}: {source}")]
    Resolve { path: PathBuf, source: io::Error },

    #[error("failed to stat {path}: {source}")]
    Stat { path: PathBuf, source: io::Error },

    #[error("invalid source type: {path}")]
    InvalidSourceType { path: PathBuf },

    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("cannot build entry header for {path}: {reason}")]
    Header { path: PathBuf, reason: String },

    #[error("annotator rejected entry {name}: {source}")]
    Annotate {
        name: String,
        #[source]
        source: AnnotateError,
    },

    #[error("failed to write archive entry {name}: {source}")]
    Sink { name: String, source: io::Error },

    #[error("failed to read {path}: {source}")]
    SourceRead { path: PathBuf, source: io::Error },

    #[error("cancelled after {entries_written} entries")]
    Cancelled { entries_written: usize },
}

/// What a single `add` call wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddSummary {
    /// Regular file entries
    pub files: usize,
    /// Directory entries
    pub directories: usize,
    /// Uncompressed body bytes
    pub bytes: u64,
}

impl AddSummary {
    /// Total entries written
    pub fn entries(&self) -> usize {
        self.files + self.directories
    }

    /// Fold another summary into this one
    pub fn merge(&mut self, other: AddSummary) {
        self.files += other.files;
        self.directories += other.directories;
        self.bytes += other.bytes;
    }
}

/// Add `source` to `sink` under `root_source`.
pub fn add_to_archive<S>(
    sink: &mut S,
    source: impl AsRef<Path>,
    root_source: &str,
) -> Result<AddSummary, ArchiveError>
where
    S: ArchiveSink + ?Sized,
{
    ArchiveBuilder::new(root_source).add(sink, source.as_ref())
}

/// Add `source` to `sink` under `root_source`, passing a single-file entry's
/// header through `annotator` first.
pub fn add_to_archive_with_annotator<S>(
    sink: &mut S,
    source: impl AsRef<Path>,
    root_source: &str,
    annotator: &dyn Annotator,
) -> Result<AddSummary, ArchiveError>
where
    S: ArchiveSink + ?Sized,
{
    ArchiveBuilder::new(root_source)
        .with_annotator(annotator)
        .add(sink, source.as_ref())
}

/// Archive builder.
///
/// Stateless between calls; one builder can add any number of sources.
pub struct ArchiveBuilder<'a> {
    /// Archive namespace, or an ancestor of directory sources to strip
    root_source: String,
    annotator: Option<&'a dyn Annotator>,
    cancel: Option<CancelFlag>,
    /// Descend into symlinked directories while walking
    follow_links: bool,
    /// Paths skipped while walking directory sources
    excludes: Vec<PathBuf>,
}

impl<'a> ArchiveBuilder<'a> {
    /// Create a builder for the given archive namespace (may be empty)
    pub fn new(root_source: impl Into<String>) -> Self {
        Self {
            root_source: root_source.into(),
            annotator: None,
            cancel: None,
            follow_links: false,
            excludes: Vec::new(),
        }
    }

    /// Set the annotator for single-file sources
    pub fn with_annotator(mut self, annotator: &'a dyn Annotator) -> Self {
        self.annotator = Some(annotator);
        self
    }

    /// Check `cancel` before each entry
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Set symlink following behavior
    pub fn with_follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Skip `path` (and anything below it) when walking directory sources.
    ///
    /// Relative paths are resolved against the current directory when a
    /// source is added.
    pub fn with_exclude(mut self, path: impl Into<PathBuf>) -> Self {
        self.excludes.push(path.into());
        self
    }

    /// Add a file or directory tree to the sink
    pub fn add<S>(&self, sink: &mut S, source: &Path) -> Result<AddSummary, ArchiveError>
    where
        S: ArchiveSink + ?Sized,
    {
        let source = path::resolve(source).map_err(|e| ArchiveError::Resolve {
            path: source.to_path_buf(),
            source: e,
        })?;

        let metadata = self.stat(&source)?;
        let mut buffer = vec![0u8; COPY_BUFFER_SIZE];

        if metadata.is_file() {
            self.add_file(sink, &source, &metadata, &mut buffer)
        } else if metadata.is_dir() {
            self.add_tree(sink, &source, &mut buffer)
        } else {
            Err(ArchiveError::InvalidSourceType { path: source })
        }
    }

    fn stat(&self, path: &Path) -> Result<Metadata, ArchiveError> {
        let result = if self.follow_links {
            fs::metadata(path)
        } else {
            fs::symlink_metadata(path)
        };
        result.map_err(|e| ArchiveError::Stat {
            path: path.to_path_buf(),
            source: e,
        })
    }

    fn add_file<S>(
        &self,
        sink: &mut S,
        source: &Path,
        metadata: &Metadata,
        buffer: &mut [u8],
    ) -> Result<AddSummary, ArchiveError>
    where
        S: ArchiveSink + ?Sized,
    {
        let basename = source
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| ArchiveError::Header {
                path: source.to_path_buf(),
                reason: NameError::NonUtf8.to_string(),
            })?;
        let name = path::join(&self.root_source, basename);

        let mut summary = AddSummary::default();
        self.check_cancel(&summary)?;

        let mut header = EntryHeader::from_metadata(name, metadata, source)?;
        if let Some(annotator) = self.annotator {
            let proposed = header.name.clone();
            header = annotator
                .annotate(header)
                .map_err(|e| ArchiveError::Annotate {
                    name: proposed,
                    source: e,
                })?;
        }

        debug!(
            "Archiving file {} as {} ({:?})",
            source.display(),
            header.name,
            header.method
        );
        summary.bytes = write_file_entry(sink, &header, source, buffer)?;
        summary.files = 1;
        Ok(summary)
    }

    fn add_tree<S>(
        &self,
        sink: &mut S,
        source: &Path,
        buffer: &mut [u8],
    ) -> Result<AddSummary, ArchiveError>
    where
        S: ArchiveSink + ?Sized,
    {
        let namespace = self.tree_namespace(source)?;
        let excludes = self.resolved_excludes()?;
        let mut summary = AddSummary::default();

        let mut walker = WalkDir::new(source)
            .follow_links(self.follow_links)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()))
            .into_iter();

        while let Some(entry) = walker.next() {
            let entry = entry?;
            let path = entry.path();

            if excludes.iter().any(|excluded| excluded == path) {
                debug!("Skipping excluded {}", path.display());
                if entry.file_type().is_dir() {
                    walker.skip_current_dir();
                }
                continue;
            }

            let relative = path
                .strip_prefix(source)
                .map_err(|_| ArchiveError::Header {
                    path: path.to_path_buf(),
                    reason: "path is not within the source root".to_string(),
                })?;
            let name = archive_name(&namespace, relative).map_err(|e| ArchiveError::Header {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

            // The source root maps to the namespace itself; with no namespace
            // there is nothing to name it.
            if name.is_empty() {
                continue;
            }

            let metadata = walked_metadata(&entry)?;
            self.check_cancel(&summary)?;
            let mut header = EntryHeader::from_metadata(name, &metadata, path)?;

            if header.is_dir() {
                debug!("Archiving directory {} as {}", path.display(), header.name);
                sink.create_entry(&header)
                    .map_err(|e| ArchiveError::Sink {
                        name: header.name.clone(),
                        source: e,
                    })?;
                summary.directories += 1;
            } else {
                header.method = CompressionMethod::Deflated;
                debug!("Archiving file {} as {}", path.display(), header.name);
                summary.bytes += write_file_entry(sink, &header, path, buffer)?;
                summary.files += 1;
            }
        }

        Ok(summary)
    }

    /// Prefix for entries of a directory source.
    ///
    /// A `root_source` naming the source or one of its ancestors is stripped
    /// from walk paths; any other value is an archive namespace.
    fn tree_namespace(&self, source: &Path) -> Result<String, ArchiveError> {
        if normalize_prefix(&self.root_source).is_empty() {
            return Ok(String::new());
        }

        let root = Path::new(&self.root_source);
        let resolved = path::resolve(root).map_err(|e| ArchiveError::Resolve {
            path: root.to_path_buf(),
            source: e,
        })?;

        match source.strip_prefix(&resolved) {
            Ok(remainder) => archive_name("", remainder).map_err(|e| ArchiveError::Header {
                path: source.to_path_buf(),
                reason: e.to_string(),
            }),
            Err(_) => Ok(normalize_prefix(&self.root_source)),
        }
    }

    fn resolved_excludes(&self) -> Result<Vec<PathBuf>, ArchiveError> {
        self.excludes
            .iter()
            .map(|excluded| {
                path::resolve(excluded).map_err(|e| ArchiveError::Resolve {
                    path: excluded.clone(),
                    source: e,
                })
            })
            .collect()
    }

    fn check_cancel(&self, summary: &AddSummary) -> Result<(), ArchiveError> {
        match &self.cancel {
            Some(flag) if flag.is_cancelled() => Err(ArchiveError::Cancelled {
                entries_written: summary.entries(),
            }),
            _ => Ok(()),
        }
    }
}

/// Metadata of a walked node.
///
/// A symlink found inside a tree is archived as the regular file it points
/// to; links to directories are not descended into and are rejected, as are
/// sockets, fifos and devices.
fn walked_metadata(entry: &walkdir::DirEntry) -> Result<Metadata, ArchiveError> {
    let path = entry.path();
    let file_type = entry.file_type();

    let metadata = if file_type.is_symlink() {
        fs::metadata(path).map_err(|e| ArchiveError::Stat {
            path: path.to_path_buf(),
            source: e,
        })?
    } else {
        entry.metadata()?
    };

    let accepted = if file_type.is_symlink() {
        metadata.is_file()
    } else {
        metadata.is_file() || metadata.is_dir()
    };
    if !accepted {
        return Err(ArchiveError::InvalidSourceType {
            path: path.to_path_buf(),
        });
    }
    Ok(metadata)
}

/// Open `source`, create its entry and stream the body into it.
///
/// The source is opened before the entry so an unreadable file leaves no
/// empty entry behind.
fn write_file_entry<S>(
    sink: &mut S,
    header: &EntryHeader,
    source: &Path,
    buffer: &mut [u8],
) -> Result<u64, ArchiveError>
where
    S: ArchiveSink + ?Sized,
{
    let mut reader = File::open(source).map_err(|e| ArchiveError::SourceRead {
        path: source.to_path_buf(),
        source: e,
    })?;
    let writer = sink.create_entry(header).map_err(|e| ArchiveError::Sink {
        name: header.name.clone(),
        source: e,
    })?;

    let copied = copy_body(&mut reader, writer, buffer, source, &header.name)?;
    if copied != header.size {
        warn!(
            "{} changed while archiving: expected {} bytes, copied {}",
            source.display(),
            header.size,
            copied
        );
    }
    Ok(copied)
}

fn copy_body(
    reader: &mut impl Read,
    writer: &mut dyn Write,
    buffer: &mut [u8],
    source: &Path,
    name: &str,
) -> Result<u64, ArchiveError> {
    let mut total = 0u64;
    loop {
        let read = match reader.read(buffer) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(ArchiveError::SourceRead {
                    path: source.to_path_buf(),
                    source: e,
                })
            }
        };
        writer
            .write_all(&buffer[..read])
            .map_err(|e| ArchiveError::Sink {
                name: name.to_string(),
                source: e,
            })?;
        total += read as u64;
    }
}

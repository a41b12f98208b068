//! Archive path normalization
//!
//! Archive paths always use `/`, never start with `/` and never contain `\`,
//! whatever the host separator is.

use std::env;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Reasons a filesystem path cannot become an archive path
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("path segment is not valid UTF-8")]
    NonUtf8,

    #[error("path contains a parent directory segment")]
    ParentSegment,
}

/// Normalize an archive namespace prefix.
///
/// Backslashes become separators; empty and `.` segments are dropped, which
/// also strips leading and trailing separators.
pub fn normalize_prefix(prefix: &str) -> String {
    split_segments(prefix).collect::<Vec<_>>().join("/")
}

/// Archive path of `relative` under `prefix`.
///
/// `prefix` must already be normalized. Root and drive components of
/// `relative` are dropped so the result is never absolute.
pub fn archive_name(prefix: &str, relative: &Path) -> Result<String, NameError> {
    let mut segments: Vec<&str> = split_segments(prefix).collect();

    for component in relative.components() {
        match component {
            Component::Normal(segment) => {
                let segment = segment.to_str().ok_or(NameError::NonUtf8)?;
                segments.extend(split_segments(segment));
            }
            Component::ParentDir => return Err(NameError::ParentSegment),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }

    Ok(segments.join("/"))
}

/// Join an archive prefix and a single file name.
pub fn join(prefix: &str, name: &str) -> String {
    let prefix = normalize_prefix(prefix);
    let name = normalize_prefix(name);
    match (prefix.is_empty(), name.is_empty()) {
        (true, _) => name,
        (_, true) => prefix,
        _ => format!("{}/{}", prefix, name),
    }
}

/// Make `path` absolute against the current directory, dropping `.` segments.
///
/// Symlinks are not resolved.
pub fn resolve(path: &Path) -> io::Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()?.join(path)
    };
    Ok(absolute
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect())
}

fn split_segments(value: &str) -> impl Iterator<Item = &str> {
    value
        .split(|c| c == '/' || c == '\\')
        .filter(|segment| !segment.is_empty() && *segment != ".")
}

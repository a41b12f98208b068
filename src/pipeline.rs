//! Build pipeline
//!
//! Turns a [`PackConfig`] into a finished archive:
//! - Create the output file (and its parent directory)
//! - Add every configured source in order
//! - Finish the ZIP central directory
//!
//! A failed or cancelled build removes the partial output.

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use zip::ZipWriter;

use crate::archive::{AddSummary, ArchiveBuilder, ArchiveError, CompressionMethod, ForceMethod};
use crate::cancel::CancelFlag;
use crate::config::PackConfig;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to create {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("source {source_path}: {error}")]
    Archive {
        source_path: String,
        #[source]
        error: ArchiveError,
    },

    #[error("failed to finish archive: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl PipelineError {
    /// Whether the build stopped because cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            PipelineError::Archive {
                error: ArchiveError::Cancelled { .. },
                ..
            }
        )
    }
}

/// Result of a successful build
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    /// Archive that was written
    pub output: PathBuf,

    /// Sources added, in order
    pub sources: usize,

    /// Regular file entries
    pub files: usize,

    /// Directory entries
    pub directories: usize,

    /// Uncompressed body bytes
    pub bytes: u64,
}

impl BuildReport {
    fn new(output: &Path, sources: usize, summary: AddSummary) -> Self {
        Self {
            output: output.to_path_buf(),
            sources,
            files: summary.files,
            directories: summary.directories,
            bytes: summary.bytes,
        }
    }

    /// One-line summary for the terminal
    pub fn to_human(&self) -> String {
        format!(
            "wrote {} ({} files, {} directories, {} bytes from {} sources)",
            self.output.display(),
            self.files,
            self.directories,
            self.bytes,
            self.sources
        )
    }
}

/// Build the archive described by `config`.
pub fn build(config: &PackConfig, cancel: &CancelFlag) -> Result<BuildReport, PipelineError> {
    let output = config.output.as_path();

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| PipelineError::Create {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let file = File::create(output).map_err(|source| PipelineError::Create {
        path: output.to_path_buf(),
        source,
    })?;
    info!("Building {}", output.display());

    let result = write_sources(ZipWriter::new(BufWriter::new(file)), config, cancel);
    match result {
        Ok(summary) => Ok(BuildReport::new(output, config.sources.len(), summary)),
        Err(e) => {
            if let Err(remove) = fs::remove_file(output) {
                warn!(
                    "failed to remove partial archive {}: {}",
                    output.display(),
                    remove
                );
            } else {
                debug!("Removed partial archive {}", output.display());
            }
            Err(e)
        }
    }
}

fn write_sources(
    mut writer: ZipWriter<BufWriter<File>>,
    config: &PackConfig,
    cancel: &CancelFlag,
) -> Result<AddSummary, PipelineError> {
    let deflate = ForceMethod(CompressionMethod::Deflated);
    let mut total = AddSummary::default();

    for source in &config.sources {
        let mut builder = ArchiveBuilder::new(source.root.as_str())
            .with_cancel(cancel.clone())
            .with_follow_links(config.follow_links)
            .with_exclude(config.output.clone());
        if config.deflate_single_files {
            builder = builder.with_annotator(&deflate);
        }

        debug!("Adding source {} (root {:?})", source.path, source.root);
        let summary = builder
            .add(&mut writer, Path::new(&source.path))
            .map_err(|error| PipelineError::Archive {
                source_path: source.path.clone(),
                error,
            })?;
        info!(
            "Added {}: {} files, {} directories",
            source.path, summary.files, summary.directories
        );
        total.merge(summary);
    }

    let mut inner = writer.finish()?;
    io::Write::flush(&mut inner).map_err(|source| PipelineError::Write {
        path: config.output.clone(),
        source,
    })?;
    Ok(total)
}

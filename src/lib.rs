//! lambda-pack - deployment archives for Lambda functions
//!
//! Builds the ZIP archives Lambda functions are deployed from, with
//! deterministic entry order and Unix modes preserved, and carries the IAM
//! policy document model used by the execution role templates.

pub mod archive;
pub mod cancel;
pub mod config;
pub mod pipeline;

pub use archive::{
    add_to_archive, add_to_archive_with_annotator, AddSummary, ArchiveBuilder, ArchiveError,
    ArchiveListing, ArchiveSink, Annotator, CompressionMethod, EntryHeader, EntryKind,
    ForceMethod,
};
pub use cancel::{CancelFlag, EXIT_CODE_CANCELLED};
pub use config::{ConfigError, PackConfig, SourceSpec};
pub use pipeline::{build, BuildReport, PipelineError};

pub use lambda_pack_iam as iam;

//! Header annotators
//!
//! An annotator sees the proposed header of a single-file entry and returns
//! the header to write. Returning an error aborts the whole archive call.

use super::header::{CompressionMethod, EntryHeader};

/// Error type annotators may return
pub type AnnotateError = Box<dyn std::error::Error + Send + Sync>;

/// Transformation applied to an entry header before the entry is opened
pub trait Annotator {
    fn annotate(&self, header: EntryHeader) -> Result<EntryHeader, AnnotateError>;
}

impl<F> Annotator for F
where
    F: Fn(EntryHeader) -> Result<EntryHeader, AnnotateError>,
{
    fn annotate(&self, header: EntryHeader) -> Result<EntryHeader, AnnotateError> {
        self(header)
    }
}

/// Annotator that forces a compression method.
///
/// Single-file entries are stored by default; `ForceMethod(Deflated)` opts
/// them into compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForceMethod(pub CompressionMethod);

impl Annotator for ForceMethod {
    fn annotate(&self, mut header: EntryHeader) -> Result<EntryHeader, AnnotateError> {
        header.method = self.0;
        Ok(header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::header::EntryKind;

    #[test]
    fn test_closure_annotator() {
        let rename = |mut header: EntryHeader| -> Result<EntryHeader, AnnotateError> {
            header.name = format!("bin/{}", header.name);
            Ok(header)
        };
        let header = rename
            .annotate(EntryHeader::new("app", EntryKind::File))
            .unwrap();
        assert_eq!(header.name, "bin/app");
    }

    #[test]
    fn test_closure_annotator_error() {
        let reject = |_: EntryHeader| -> Result<EntryHeader, AnnotateError> {
            Err("entry not allowed".into())
        };
        let err = reject
            .annotate(EntryHeader::new("app", EntryKind::File))
            .unwrap_err();
        assert_eq!(err.to_string(), "entry not allowed");
    }

    #[test]
    fn test_force_method() {
        let header = ForceMethod(CompressionMethod::Deflated)
            .annotate(EntryHeader::new("app", EntryKind::File))
            .unwrap();
        assert_eq!(header.method, CompressionMethod::Deflated);
    }
}

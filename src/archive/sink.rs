//! Archive sinks
//!
//! A sink accepts entries sequentially: a header opens an entry and the
//! returned writer receives its body. Only one entry is open at a time; the
//! next `create_entry` call closes the previous one.

use std::io::{self, Seek, Write};
use zip::write::FileOptions;
use zip::{DateTime, ZipWriter};

use super::header::{EntryHeader, EntryKind};
use chrono::{Datelike, NaiveDateTime, Timelike};

/// Largest entry size a ZIP32 header can describe
const ZIP32_LIMIT: u64 = u32::MAX as u64;

/// Append-only writer of archive entries
pub trait ArchiveSink {
    /// Open a new entry and return the writer for its body.
    ///
    /// Directory entries carry no body; their writer is never written to.
    fn create_entry(&mut self, header: &EntryHeader) -> io::Result<&mut dyn Write>;
}

impl<S: ArchiveSink + ?Sized> ArchiveSink for &mut S {
    fn create_entry(&mut self, header: &EntryHeader) -> io::Result<&mut dyn Write> {
        (**self).create_entry(header)
    }
}

impl<W: Write + Seek> ArchiveSink for ZipWriter<W> {
    fn create_entry(&mut self, header: &EntryHeader) -> io::Result<&mut dyn Write> {
        let options = FileOptions::default()
            .compression_method(header.method.into())
            .unix_permissions(header.mode)
            .last_modified_time(zip_timestamp(&header.modified))
            .large_file(header.size > ZIP32_LIMIT);

        let result = match header.kind {
            EntryKind::Directory => self.add_directory(header.name.as_str(), options),
            EntryKind::File => self.start_file(header.name.as_str(), options),
        };
        result.map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

        Ok(self)
    }
}

/// Convert a timestamp to the DOS format ZIP headers use.
///
/// Times outside 1980..=2107 cannot be represented and fall back to the ZIP
/// epoch.
pub fn zip_timestamp(modified: &NaiveDateTime) -> DateTime {
    let year = match u16::try_from(modified.year()) {
        Ok(year) => year,
        Err(_) => return DateTime::default(),
    };
    DateTime::from_date_and_time(
        year,
        modified.month() as u8,
        modified.day() as u8,
        modified.hour() as u8,
        modified.minute() as u8,
        modified.second() as u8,
    )
    .unwrap_or_default()
}

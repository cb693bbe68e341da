// Zip archive output

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::ExportError;

/// One file inside an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub contents: Vec<u8>,
}

impl ArchiveEntry {
    pub fn text(name: impl Into<String>, text: &str) -> Self {
        Self { name: name.into(), contents: text.as_bytes().to_vec() }
    }
}

/// Packs entries into the bytes of a single archive.
pub trait ArchiveWriter {
    fn write_archive(&self, entries: &[ArchiveEntry]) -> Result<Vec<u8>, ExportError>;
}

/// Deflate-compressed zip with UTF-8 entry names.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiveWriter;

impl ArchiveWriter for ZipArchiveWriter {
    fn write_archive(&self, entries: &[ArchiveEntry]) -> Result<Vec<u8>, ExportError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for entry in entries {
            zip.start_file(entry.name.as_str(), options)
                .map_err(|e| ExportError::Archive(format!("{}: {}", entry.name, e)))?;
            zip.write_all(&entry.contents)
                .map_err(|e| ExportError::Archive(format!("{}: {}", entry.name, e)))?;
        }

        let cursor = zip.finish().map_err(|e| ExportError::Archive(e.to_string()))?;
        Ok(cursor.into_inner())
    }
}

// Report export: spreadsheets and archives

pub mod archive;
pub mod export;
pub mod html_table;
pub mod naming;
pub mod sheet;

use std::fmt;

pub use archive::{ArchiveEntry, ArchiveWriter, ZipArchiveWriter};
pub use export::{ExportEngine, EMPTY_SECTION_TEXT};
pub use html_table::{parse_html_table, SheetData};
pub use naming::sanitize_timestamp;
pub use sheet::{TableToSheet, XlsxSheetWriter};

/// Errors from building or writing a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportError {
    /// Table markup could not be read
    Parse(String),
    /// Workbook could not be built
    Sheet(String),
    /// Archive could not be built
    Archive(String),
    /// Output file could not be written
    Io(String),
    /// A backend could not be resolved
    Unavailable(String),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::Parse(msg) => write!(f, "table parse error: {}", msg),
            ExportError::Sheet(msg) => write!(f, "spreadsheet error: {}", msg),
            ExportError::Archive(msg) => write!(f, "archive error: {}", msg),
            ExportError::Io(msg) => write!(f, "write failed: {}", msg),
            ExportError::Unavailable(msg) => write!(f, "export unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ExportError {}

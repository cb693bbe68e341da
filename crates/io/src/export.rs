//! Report downloads.
//!
//! The engine writes files into one output directory. Spreadsheet and archive
//! backends are resolved on first use and then reused for the life of the
//! engine; tests inject their own.

use std::cell::OnceCell;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use riskview_core::{SectionBundle, SectionKind};

use crate::archive::{ArchiveEntry, ArchiveWriter, ZipArchiveWriter};
use crate::html_table::{parse_html_table, SheetData};
use crate::naming::{archive_entry_name, archive_file_name, sanitize_timestamp, sheet_file_name};
use crate::sheet::{TableToSheet, XlsxSheetWriter};
use crate::ExportError;

/// Placeholder row when a free-text section is empty.
pub const EMPTY_SECTION_TEXT: &str = "내용이 없습니다.";

type SheetResolver = Box<dyn Fn() -> Result<Box<dyn TableToSheet>, ExportError>>;
type ArchiveResolver = Box<dyn Fn() -> Result<Box<dyn ArchiveWriter>, ExportError>>;

pub struct ExportEngine {
    output_dir: PathBuf,
    sheet: OnceCell<Box<dyn TableToSheet>>,
    archive: OnceCell<Box<dyn ArchiveWriter>>,
    resolve_sheet: SheetResolver,
    resolve_archive: ArchiveResolver,
}

impl ExportEngine {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            sheet: OnceCell::new(),
            archive: OnceCell::new(),
            resolve_sheet: Box::new(|| Ok(Box::new(XlsxSheetWriter))),
            resolve_archive: Box::new(|| Ok(Box::new(ZipArchiveWriter))),
        }
    }

    /// Use `writer` for spreadsheets instead of resolving the default.
    pub fn with_sheet_writer(mut self, writer: impl TableToSheet + 'static) -> Self {
        let writer: Box<dyn TableToSheet> = Box::new(writer);
        self.sheet = OnceCell::from(writer);
        self
    }

    /// Use `writer` for archives instead of resolving the default.
    pub fn with_archive_writer(mut self, writer: impl ArchiveWriter + 'static) -> Self {
        let writer: Box<dyn ArchiveWriter> = Box::new(writer);
        self.archive = OnceCell::from(writer);
        self
    }

    /// Resolve the spreadsheet backend with `f` on first use.
    pub fn with_sheet_resolver<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<Box<dyn TableToSheet>, ExportError> + 'static,
    {
        self.sheet = OnceCell::new();
        self.resolve_sheet = Box::new(f);
        self
    }

    /// Resolve the archive backend with `f` on first use.
    pub fn with_archive_resolver<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<Box<dyn ArchiveWriter>, ExportError> + 'static,
    {
        self.archive = OnceCell::new();
        self.resolve_archive = Box::new(f);
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Spreadsheet of a rendered section table.
    pub fn export_table(
        &self,
        kind: SectionKind,
        inner_html: &str,
        timestamp: Option<&str>,
    ) -> Result<PathBuf, ExportError> {
        let data = parse_html_table(inner_html)?;
        let name = sheet_file_name(kind, &sanitize_timestamp(timestamp));
        self.write_sheet(&name, &data)
    }

    /// Spreadsheet built from free text: `header` in the first row, then one
    /// row per non-blank line.
    pub fn export_lines(
        &self,
        kind: SectionKind,
        header: &str,
        text: &str,
        timestamp: Option<&str>,
    ) -> Result<PathBuf, ExportError> {
        let text = if text.trim().is_empty() { EMPTY_SECTION_TEXT } else { text };
        let lines = text
            .split('\n')
            .map(|l| l.trim_end_matches('\r'))
            .filter(|l| !l.trim().is_empty());
        let data = SheetData::from_lines(header, lines);
        let name = sheet_file_name(kind, &sanitize_timestamp(timestamp));
        self.write_sheet(&name, &data)
    }

    /// Zip of the non-empty sections as markdown files.
    ///
    /// Without a report timestamp the current time is used for the names.
    pub fn export_archive(
        &self,
        sections: &SectionBundle,
        timestamp: Option<&str>,
    ) -> Result<PathBuf, ExportError> {
        let now;
        let ts = match timestamp.filter(|t| !t.trim().is_empty()) {
            Some(t) => t,
            None => {
                now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
                now.as_str()
            }
        };
        let stamp = sanitize_timestamp(Some(ts));

        let entries: Vec<ArchiveEntry> = SectionKind::ALL
            .iter()
            .filter(|kind| !sections.get(**kind).is_empty())
            .map(|kind| ArchiveEntry::text(archive_entry_name(*kind, &stamp), sections.get(*kind)))
            .collect();

        let writer = self.archive_writer()?;
        let bytes = writer.write_archive(&entries)?;
        let path = self.output_dir.join(archive_file_name(&stamp));
        self.save(&path, &bytes)?;
        log::info!("Wrote {} ({} sections)", path.display(), entries.len());
        Ok(path)
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn write_sheet(&self, name: &str, data: &SheetData) -> Result<PathBuf, ExportError> {
        let writer = self.sheet_writer()?;
        let bytes = writer.write_sheet(data)?;
        let path = self.output_dir.join(name);
        self.save(&path, &bytes)?;
        log::info!("Wrote {} ({} rows)", path.display(), data.rows.len());
        Ok(path)
    }

    fn sheet_writer(&self) -> Result<&dyn TableToSheet, ExportError> {
        if self.sheet.get().is_none() {
            log::debug!("Resolving spreadsheet writer");
            let writer = (self.resolve_sheet)()?;
            let _ = self.sheet.set(writer);
        }
        self.sheet
            .get()
            .map(|w| w.as_ref())
            .ok_or_else(|| ExportError::Unavailable("spreadsheet writer".into()))
    }

    fn archive_writer(&self) -> Result<&dyn ArchiveWriter, ExportError> {
        if self.archive.get().is_none() {
            log::debug!("Resolving archive writer");
            let writer = (self.resolve_archive)()?;
            let _ = self.archive.set(writer);
        }
        self.archive
            .get()
            .map(|w| w.as_ref())
            .ok_or_else(|| ExportError::Unavailable("archive writer".into()))
    }

    fn save(&self, path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
        fs::create_dir_all(&self.output_dir)
            .map_err(|e| ExportError::Io(format!("{}: {}", self.output_dir.display(), e)))?;
        fs::write(path, bytes).map_err(|e| ExportError::Io(format!("{}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io::Cursor;
    use std::rc::Rc;
    use zip::ZipArchive;

    fn bundle(risk: &str, sgr: &str, rec: &str) -> SectionBundle {
        SectionBundle { risk_raw: risk.into(), sgr_raw: sgr.into(), rec_raw: rec.into() }
    }

    fn zip_names(path: &Path) -> Vec<String> {
        let bytes = fs::read(path).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut names: Vec<String> =
            (0..archive.len()).map(|i| archive.by_index(i).unwrap().name().to_string()).collect();
        names.sort();
        names
    }

    struct RecordingSheet(Rc<std::cell::RefCell<Vec<SheetData>>>);

    impl TableToSheet for RecordingSheet {
        fn write_sheet(&self, data: &SheetData) -> Result<Vec<u8>, ExportError> {
            self.0.borrow_mut().push(data.clone());
            Ok(b"sheet".to_vec())
        }
    }

    #[test]
    fn test_archive_skips_empty_sections() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ExportEngine::new(dir.path());

        let path = engine
            .export_archive(&bundle("위험요인\n", "", "권장사항\n"), Some("2024-05-01 12:30:00"))
            .unwrap();

        assert_eq!(path.file_name().unwrap().to_string_lossy(), "전체섹션_20240501123000.zip");
        assert_eq!(
            zip_names(&path),
            vec!["1.위험요인분석_20240501123000.md", "4.추가권장사항_20240501123000.md"]
        );
    }

    #[test]
    fn test_archive_without_timestamp_uses_current_time() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ExportEngine::new(dir.path());
        let path = engine.export_archive(&bundle("", "SGR\n", ""), None).unwrap();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        let stamp = name.trim_start_matches("전체섹션_").trim_end_matches(".zip");
        assert_eq!(stamp.chars().count(), 14);
        assert!(stamp.contains('T'));
        assert_eq!(zip_names(&path), vec![format!("2.체크리스트_{}.md", stamp)]);
    }

    #[test]
    fn test_export_table_names_and_parses() {
        let dir = tempfile::tempdir().unwrap();
        let seen = Rc::new(std::cell::RefCell::new(Vec::new()));
        let engine = ExportEngine::new(dir.path()).with_sheet_writer(RecordingSheet(seen.clone()));

        let path = engine
            .export_table(
                SectionKind::Checklist,
                "<thead><tr><th>항목</th></tr></thead><tbody><tr><td>발판</td></tr></tbody>",
                None,
            )
            .unwrap();

        assert_eq!(path, dir.path().join("SGR체크리스트_now.xls"));
        assert_eq!(fs::read(&path).unwrap(), b"sheet");
        let seen = seen.borrow();
        assert_eq!(seen[0].rows, vec![vec!["항목".to_string()], vec!["발판".to_string()]]);
    }

    #[test]
    fn test_export_lines_filters_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let seen = Rc::new(std::cell::RefCell::new(Vec::new()));
        let engine = ExportEngine::new(dir.path()).with_sheet_writer(RecordingSheet(seen.clone()));

        let path = engine
            .export_lines(
                SectionKind::Recommendations,
                "추가 권장사항",
                "## 4. 추가 권장사항\n\n- 교육\r\n   \n- 점검\n",
                Some("2024-05-01 12:30:00"),
            )
            .unwrap();
        assert_eq!(path.file_name().unwrap().to_string_lossy(), "추가권장사항_20240501123000.xls");

        let seen = seen.borrow();
        let cells: Vec<&str> = seen[0].rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(cells, vec!["추가 권장사항", "## 4. 추가 권장사항", "- 교육", "- 점검"]);
    }

    #[test]
    fn test_export_lines_empty_section_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let seen = Rc::new(std::cell::RefCell::new(Vec::new()));
        let engine = ExportEngine::new(dir.path()).with_sheet_writer(RecordingSheet(seen.clone()));
        engine.export_lines(SectionKind::Recommendations, "추가 권장사항", "", None).unwrap();
        assert_eq!(seen.borrow()[0].rows[1], vec![EMPTY_SECTION_TEXT.to_string()]);
    }

    #[test]
    fn test_resolver_runs_once() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let engine = ExportEngine::new(dir.path()).with_sheet_resolver(move || {
            counter.set(counter.get() + 1);
            Ok(Box::new(XlsxSheetWriter))
        });

        engine.export_lines(SectionKind::Recommendations, "h", "a", None).unwrap();
        engine.export_lines(SectionKind::Recommendations, "h", "b", None).unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_unavailable_backend_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ExportEngine::new(dir.path().join("out"))
            .with_archive_resolver(|| Err(ExportError::Unavailable("zip backend missing".into())));

        let err = engine.export_archive(&bundle("위험요인\n", "", ""), Some("x")).unwrap_err();
        assert!(matches!(err, ExportError::Unavailable(_)));
        // nothing written
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_malformed_table_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ExportEngine::new(dir.path());
        let err = engine.export_table(SectionKind::Risk, "<tr><td>x</td></tr><!-- cut", None).unwrap_err();
        assert!(matches!(err, ExportError::Parse(_)));
    }
}

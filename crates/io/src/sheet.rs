// Spreadsheet output

use rust_xlsxwriter::{Format, Workbook};

use crate::html_table::SheetData;
use crate::ExportError;

/// Name of the single worksheet in exported workbooks.
pub const SHEET_NAME: &str = "Sheet1";

/// Turns tabular data into the bytes of a one-sheet workbook.
pub trait TableToSheet {
    fn write_sheet(&self, data: &SheetData) -> Result<Vec<u8>, ExportError>;
}

/// Workbook writer backed by rust_xlsxwriter.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxSheetWriter;

impl TableToSheet for XlsxSheetWriter {
    fn write_sheet(&self, data: &SheetData) -> Result<Vec<u8>, ExportError> {
        let mut workbook = Workbook::new();
        let header_format = Format::new().set_bold();
        let wrap_format = Format::new().set_text_wrap();

        let worksheet = workbook
            .add_worksheet()
            .set_name(SHEET_NAME)
            .map_err(|e| ExportError::Sheet(format!("Failed to create sheet: {}", e)))?;

        for (row_idx, row) in data.rows.iter().enumerate() {
            // rust_xlsxwriter uses 0-based row/col as u32/u16
            let r = u32::try_from(row_idx)
                .map_err(|_| ExportError::Sheet("too many rows".into()))?;
            let format = if row_idx < data.header_rows { &header_format } else { &wrap_format };

            for (col_idx, value) in row.iter().enumerate() {
                let c = u16::try_from(col_idx)
                    .map_err(|_| ExportError::Sheet("too many columns".into()))?;
                worksheet
                    .write_string_with_format(r, c, value.as_str(), format)
                    .map_err(|e| ExportError::Sheet(format!("Failed to write cell ({}, {}): {}", r, c, e)))?;
            }
        }

        worksheet.autofit();

        workbook
            .save_to_buffer()
            .map_err(|e| ExportError::Sheet(format!("Failed to build workbook: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{Data, Reader, Xlsx};
    use std::io::Cursor;

    fn read_back(bytes: Vec<u8>) -> Vec<Vec<String>> {
        let mut wb: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).unwrap();
        assert_eq!(wb.sheet_names(), vec![SHEET_NAME.to_string()]);
        let range = wb.worksheet_range(SHEET_NAME).unwrap();
        range
            .rows()
            .map(|row| {
                row.iter()
                    .map(|c| match c {
                        Data::String(s) => s.clone(),
                        Data::Empty => String::new(),
                        other => other.to_string(),
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_write_table() {
        let data = SheetData {
            rows: vec![
                vec!["위험요인".into(), "등급".into()],
                vec!["추락".into(), "상".into()],
            ],
            header_rows: 1,
        };
        let bytes = XlsxSheetWriter.write_sheet(&data).unwrap();
        assert_eq!(read_back(bytes), data.rows);
    }

    #[test]
    fn test_write_lines() {
        let data = SheetData::from_lines("추가 권장사항", ["- 안전모 착용", "- TBM 실시"]);
        let rows = read_back(XlsxSheetWriter.write_sheet(&data).unwrap());
        assert_eq!(rows[0], vec!["추가 권장사항"]);
        assert_eq!(rows[2], vec!["- TBM 실시"]);
    }

    #[test]
    fn test_write_empty_table() {
        let bytes = XlsxSheetWriter.write_sheet(&SheetData::default()).unwrap();
        // still a valid workbook
        let wb: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).unwrap();
        assert_eq!(wb.sheet_names(), vec![SHEET_NAME.to_string()]);
    }
}

// Terminal rendering of reports, selections and profiles

use std::io::{self, Write};

use riskview_client::UploadFile;
use riskview_core::{Report, UserInfo};
use riskview_io::{parse_html_table, SheetData};

use crate::util::{display_width, format_size, pad_right};

/// Widest a single table column may get before cells are cut.
const MAX_COL_WIDTH: usize = 40;

/// Print the whole report: metadata, both tables and the recommendations.
pub fn render_report(out: &mut dyn Write, report: &Report) -> io::Result<()> {
    writeln!(out, "세션: {}", report.session_id)?;
    writeln!(out, "총 이미지 수: {}장", report.image_count)?;
    writeln!(out, "생성 시간: {}", report.timestamp)?;

    writeln!(out)?;
    writeln!(out, "[위험요인 분석]")?;
    render_html_section(out, &report.sections.risk_analysis)?;

    writeln!(out)?;
    writeln!(out, "[SGR 체크리스트]")?;
    render_html_section(out, &report.sections.sgr_checklist)?;

    writeln!(out)?;
    writeln!(out, "[추가 권장사항]")?;
    let rec = report.sections.recommendations.trim_end();
    if rec.is_empty() {
        writeln!(out, "(없음)")?;
    } else {
        writeln!(out, "{}", rec)?;
    }
    Ok(())
}

/// Tables that fail to parse are shown as raw markup.
fn render_html_section(out: &mut dyn Write, inner_html: &str) -> io::Result<()> {
    match parse_html_table(inner_html) {
        Ok(data) if data.is_empty() => writeln!(out, "(없음)"),
        Ok(data) => render_table(out, &data),
        Err(e) => {
            log::debug!("Showing raw section markup: {}", e);
            writeln!(out, "{}", inner_html)
        }
    }
}

/// Column-aligned table with a rule under the header rows.
pub fn render_table(out: &mut dyn Write, data: &SheetData) -> io::Result<()> {
    let cols = data.rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0usize; cols];
    for row in &data.rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(display_width(&single_line(cell)).min(MAX_COL_WIDTH));
        }
    }

    for (r, row) in data.rows.iter().enumerate() {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| pad_right(&single_line(cell), widths[i]))
            .collect();
        writeln!(out, "{}", line.join(" | ").trim_end())?;

        if data.header_rows > 0 && r + 1 == data.header_rows {
            let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
            writeln!(out, "{}", rule.join("-+-"))?;
        }
    }
    Ok(())
}

fn single_line(cell: &str) -> String {
    cell.split('\n').map(str::trim).collect::<Vec<_>>().join(" / ")
}

/// Listing of the files picked for upload.
pub fn render_selection(out: &mut dyn Write, files: &[UploadFile]) -> io::Result<()> {
    if files.is_empty() {
        return writeln!(out, "선택된 이미지가 없습니다.");
    }
    for (i, file) in files.iter().enumerate() {
        writeln!(out, "{:>3}. {} ({}, {})", i + 1, file.name, format_size(file.bytes.len()), file.mime)?;
    }
    Ok(())
}

pub fn render_user(out: &mut dyn Write, user: &UserInfo) -> io::Result<()> {
    writeln!(out, "{}", user.display_name())?;
    writeln!(out, "  username: {}", user.username)?;
    if let Some(id) = &user.id {
        writeln!(out, "  id:       {}", id)?;
    }
    Ok(())
}

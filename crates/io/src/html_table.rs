//! HTML table → rows.
//!
//! The service renders tables as the inner markup of a `<table>` element:
//! `<thead><tr><th>…</th></tr></thead><tbody><tr><td>…</td></tr></tbody>`.
//! Cells are plain text with `&amp;`, `&lt;` and `&gt;` escaped. The parser is
//! lenient: mismatched end tags are tolerated and unknown tags are ignored
//! except `<br>`, which becomes a newline inside the cell.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::ExportError;

/// Table content in row order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetData {
    pub rows: Vec<Vec<String>>,
    /// Leading rows that came from `<th>` cells
    pub header_rows: usize,
}

impl SheetData {
    /// A single header row followed by one single-cell row per line.
    pub fn from_lines<'a>(header: &str, lines: impl IntoIterator<Item = &'a str>) -> Self {
        let mut rows = vec![vec![header.to_string()]];
        rows.extend(lines.into_iter().map(|l| vec![l.to_string()]));
        Self { rows, header_rows: 1 }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Parse the inner HTML of a table. Empty input gives an empty table.
pub fn parse_html_table(inner_html: &str) -> Result<SheetData, ExportError> {
    let wrapped = format!("<table>{}</table>", inner_html);
    let mut reader = Reader::from_str(&wrapped);
    // cells are trimmed as a whole; entity refs split text events
    reader.config_mut().check_end_names = false;

    let mut data = SheetData::default();
    let mut row: Option<Vec<String>> = None;
    let mut row_is_header = true;
    let mut cell: Option<String> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"tr" => {
                    row = Some(Vec::new());
                    row_is_header = true;
                }
                b"th" | b"td" => {
                    if e.name().as_ref() == b"td" {
                        row_is_header = false;
                    }
                    cell = Some(String::new());
                }
                b"br" => push_text(&mut cell, "\n"),
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"br" => push_text(&mut cell, "\n"),
                b"th" | b"td" => {
                    if let Some(ref mut r) = row {
                        r.push(String::new());
                    }
                }
                _ => {}
            },
            Ok(Event::Text(ref e)) => {
                let raw = String::from_utf8_lossy(&e[..]);
                push_text(&mut cell, &unescape_html(&raw));
            }
            Ok(Event::GeneralRef(ref e)) => {
                let name = String::from_utf8_lossy(&e[..]);
                push_text(&mut cell, &resolve_entity(&name));
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"th" | b"td" => {
                    if let (Some(text), Some(ref mut r)) = (cell.take(), row.as_mut()) {
                        r.push(text.trim().to_string());
                    }
                }
                b"tr" => {
                    if let Some(r) = row.take() {
                        if row_is_header && data.header_rows == data.rows.len() && !r.is_empty() {
                            data.header_rows += 1;
                        }
                        if !r.is_empty() {
                            data.rows.push(r);
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ExportError::Parse(format!(
                    "malformed table markup at byte {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(data)
}

fn push_text(cell: &mut Option<String>, text: &str) {
    if let Some(c) = cell.as_mut() {
        c.push_str(text);
    }
}

/// Entity named by a reference (`amp`, `#38`, `#x26`).
fn resolve_entity(name: &str) -> String {
    let resolved = match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => name.strip_prefix('#').and_then(|num| {
            let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => num.parse::<u32>().ok(),
            };
            code.and_then(char::from_u32)
        }),
    };
    match resolved {
        Some(c) => c.to_string(),
        None => format!("&{};", name),
    }
}

/// Text events may still carry escaped entities.
fn unescape_html(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&apos;", "'")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

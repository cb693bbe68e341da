// Download file names

use riskview_core::SectionKind;

/// Fallback token when the report carries no generation time.
pub const NOW_TOKEN: &str = "now";

const STAMP_LEN: usize = 14;

/// Compact `YYYYMMDDHHMMSS`-like token: colons, whitespace and hyphens are
/// removed and the result is cut to 14 characters.
///
/// `"2024-05-01 12:30:00"` → `"20240501123000"`. Empty or missing → `"now"`.
pub fn sanitize_timestamp(ts: Option<&str>) -> String {
    let stamp: String = ts
        .unwrap_or("")
        .chars()
        .filter(|c| *c != ':' && *c != '-' && !c.is_whitespace())
        .take(STAMP_LEN)
        .collect();
    if stamp.is_empty() {
        NOW_TOKEN.to_string()
    } else {
        stamp
    }
}

/// Label used in spreadsheet file names.
pub fn sheet_label(kind: SectionKind) -> &'static str {
    match kind {
        SectionKind::Risk => "위험요인분석",
        SectionKind::Checklist => "SGR체크리스트",
        SectionKind::Recommendations => "추가권장사항",
    }
}

/// `<Label>_<stamp>.xls`
pub fn sheet_file_name(kind: SectionKind, stamp: &str) -> String {
    format!("{}_{}.xls", sheet_label(kind), stamp)
}

/// Numbering follows the service's report headings, which have no section 3
/// in the exported set.
pub fn archive_entry_prefix(kind: SectionKind) -> u8 {
    match kind {
        SectionKind::Risk => 1,
        SectionKind::Checklist => 2,
        SectionKind::Recommendations => 4,
    }
}

fn archive_entry_label(kind: SectionKind) -> &'static str {
    match kind {
        SectionKind::Risk => "위험요인분석",
        SectionKind::Checklist => "체크리스트",
        SectionKind::Recommendations => "추가권장사항",
    }
}

/// `<n>.<Label>_<stamp>.md`
pub fn archive_entry_name(kind: SectionKind, stamp: &str) -> String {
    format!("{}.{}_{}.md", archive_entry_prefix(kind), archive_entry_label(kind), stamp)
}

/// `전체섹션_<stamp>.zip`
pub fn archive_file_name(stamp: &str) -> String {
    format!("전체섹션_{}.zip", stamp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_service_timestamp() {
        assert_eq!(sanitize_timestamp(Some("2024-05-01 12:30:00")), "20240501123000");
    }

    #[test]
    fn test_sanitize_missing() {
        assert_eq!(sanitize_timestamp(None), "now");
        assert_eq!(sanitize_timestamp(Some("")), "now");
        assert_eq!(sanitize_timestamp(Some(" - : ")), "now");
    }

    #[test]
    fn test_sanitize_truncates_by_chars() {
        assert_eq!(sanitize_timestamp(Some("2024-05-01T12:30:00.000Z")), "20240501T12300");
        assert_eq!(sanitize_timestamp(Some("2024\t05 01")), "20240501");
        // multibyte input must not split a character
        assert_eq!(sanitize_timestamp(Some("생성시간 2024-05-01")).chars().count(), 12);
    }

    #[test]
    fn test_file_names() {
        assert_eq!(sheet_file_name(SectionKind::Risk, "20240501123000"), "위험요인분석_20240501123000.xls");
        assert_eq!(sheet_file_name(SectionKind::Checklist, "now"), "SGR체크리스트_now.xls");
        assert_eq!(archive_file_name("20240501123000"), "전체섹션_20240501123000.zip");
        assert_eq!(archive_entry_name(SectionKind::Checklist, "x"), "2.체크리스트_x.md");
        assert_eq!(archive_entry_name(SectionKind::Recommendations, "x"), "4.추가권장사항_x.md");
    }

    #[test]
    fn test_no_section_three() {
        let prefixes: Vec<u8> = SectionKind::ALL.iter().map(|k| archive_entry_prefix(*k)).collect();
        assert_eq!(prefixes, vec![1, 2, 4]);
    }
}

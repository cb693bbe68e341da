//! Section extraction from the raw report text.
//!
//! The service writes one long markdown report. Sections are located by
//! scanning for trigger phrases line by line; everything from a trigger line
//! up to the next trigger belongs to that section. Lines before the first
//! trigger are dropped.
//!
//! When a line carries triggers for several sections, risk wins over the
//! checklist, and the checklist wins over recommendations.

use serde::{Deserialize, Serialize};

const RISK_TRIGGERS: &[&str] = &["위험요인", "잠재 위험"];
const CHECKLIST_TRIGGERS: &[&str] = &["체크리스트", "SGR"];
const RECOMMENDATION_TRIGGERS: &[&str] = &["권장사항", "추가 권장"];

/// Named section of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Risk,
    Checklist,
    Recommendations,
}

impl SectionKind {
    pub const ALL: [SectionKind; 3] = [
        SectionKind::Risk,
        SectionKind::Checklist,
        SectionKind::Recommendations,
    ];

    /// Section whose trigger appears in `line`, honoring trigger priority.
    pub fn triggered_by(line: &str) -> Option<SectionKind> {
        if RISK_TRIGGERS.iter().any(|t| line.contains(t)) {
            Some(SectionKind::Risk)
        } else if CHECKLIST_TRIGGERS.iter().any(|t| line.contains(t)) {
            Some(SectionKind::Checklist)
        } else if RECOMMENDATION_TRIGGERS.iter().any(|t| line.contains(t)) {
            Some(SectionKind::Recommendations)
        } else {
            None
        }
    }
}

/// Raw markdown text of each section.
///
/// Empty text means the report had no such section; it is not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionBundle {
    pub risk_raw: String,
    pub sgr_raw: String,
    pub rec_raw: String,
}

impl SectionBundle {
    pub fn get(&self, kind: SectionKind) -> &str {
        match kind {
            SectionKind::Risk => &self.risk_raw,
            SectionKind::Checklist => &self.sgr_raw,
            SectionKind::Recommendations => &self.rec_raw,
        }
    }

    fn get_mut(&mut self, kind: SectionKind) -> &mut String {
        match kind {
            SectionKind::Risk => &mut self.risk_raw,
            SectionKind::Checklist => &mut self.sgr_raw,
            SectionKind::Recommendations => &mut self.rec_raw,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.risk_raw.is_empty() && self.sgr_raw.is_empty() && self.rec_raw.is_empty()
    }
}

/// Partition `text` into its three sections in a single pass.
pub fn split_sections(text: &str) -> SectionBundle {
    let mut out = SectionBundle::default();
    let mut current: Option<SectionKind> = None;

    for line in text.split('\n') {
        if let Some(kind) = SectionKind::triggered_by(line) {
            current = Some(kind);
        }
        if let Some(kind) = current {
            let acc = out.get_mut(kind);
            acc.push_str(line);
            acc.push('\n');
        }
    }

    out
}

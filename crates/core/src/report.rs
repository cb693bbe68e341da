use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::splitter::{split_sections, SectionBundle};

/// Rendered sections as returned by the analysis service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSections {
    /// Inner HTML (`<thead>`/`<tbody>`) of the risk factor table
    pub risk_analysis: String,
    /// Inner HTML of the SGR checklist table
    pub sgr_checklist: String,
    /// Free text recommendations
    pub recommendations: String,
}

/// Structured output of the analysis service for one set of uploaded images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    #[serde(deserialize_with = "string_or_number")]
    pub session_id: String,
    #[serde(default)]
    pub image_count: u32,
    /// Generation time as formatted by the service (`YYYY-MM-DD HH:MM:SS`)
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub sections: ReportSections,
    #[serde(default)]
    pub full_report: String,
}

impl Report {
    /// Generation time, or `None` when the service left it blank.
    pub fn timestamp(&self) -> Option<&str> {
        let ts = self.timestamp.trim();
        if ts.is_empty() { None } else { Some(ts) }
    }
}

/// One analyze-and-review cycle. Lives only as long as the controller that
/// created it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub image_count: u32,
    pub raw_report: String,
    pub sections: SectionBundle,
}

impl Session {
    /// Build a session from a freshly received report. Sections are always
    /// recomputed from the raw text.
    pub fn from_report(report: &Report) -> Self {
        Self {
            session_id: report.session_id.clone(),
            created_at: Utc::now(),
            image_count: report.image_count,
            raw_report: report.full_report.clone(),
            sections: split_sections(&report.full_report),
        }
    }
}

/// Accept `"abc"` or `42` for identifiers. The service hands out both
/// depending on the storage backend.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number for session_id, got {}",
            other
        ))),
    }
}

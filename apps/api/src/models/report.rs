use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    /// Fetched fresh, single-faced.
    Ok,
    /// Fetched fresh, double-faced layout.
    Flip,
    /// Reused from an earlier copy in the same request.
    Copied,
    Error,
}

/// Per-copy outcome, returned in the `X-Report` header and `_report.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub name: String,
    pub suffix: String,
    pub status: CardStatus,
    pub flip: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ReportEntry {
    pub fn error(name: &str, suffix: &str, reason: &str) -> Self {
        Self {
            name: name.to_string(),
            suffix: suffix.to_string(),
            status: CardStatus::Error,
            flip: false,
            reason: Some(reason.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status != CardStatus::Error
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub ok: usize,
    pub flips: usize,
    pub copied: usize,
    pub errors: usize,
}

impl Summary {
    pub fn from_report(report: &[ReportEntry]) -> Self {
        Self {
            total: report.len(),
            ok: report.iter().filter(|r| r.is_success()).count(),
            flips: report.iter().filter(|r| r.flip).count(),
            copied: report
                .iter()
                .filter(|r| r.status == CardStatus::Copied)
                .count(),
            errors: report
                .iter()
                .filter(|r| r.status == CardStatus::Error)
                .count(),
        }
    }
}

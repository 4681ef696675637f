use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Issue severity levels
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Sections of the configuration editor
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Basic,
    Components,
    Dimensions,
    Metrics,
    Notes,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Basic,
        Section::Components,
        Section::Dimensions,
        Section::Metrics,
        Section::Notes,
    ];
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Section::Basic => "basic",
            Section::Components => "components",
            Section::Dimensions => "dimensions",
            Section::Metrics => "metrics",
            Section::Notes => "notes",
        };
        write!(f, "{}", name)
    }
}

/// Completion state of a section
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    Complete,
    Partial,
    Missing,
}

impl SectionStatus {
    /// Threshold a 0-100 section score
    pub fn from_score(score: u32, complete_at: u32) -> Self {
        if score >= complete_at {
            SectionStatus::Complete
        } else if score > 0 {
            SectionStatus::Partial
        } else {
            SectionStatus::Missing
        }
    }
}

impl std::fmt::Display for SectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SectionStatus::Complete => write!(f, "complete"),
            SectionStatus::Partial => write!(f, "partial"),
            SectionStatus::Missing => write!(f, "missing"),
        }
    }
}

/// A single data quality finding
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub section: Section,
    pub message: String,
    /// Suggested fix
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ValidationIssue {
    pub fn error(section: Section, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            section,
            message: message.into(),
            hint: None,
        }
    }

    pub fn warning(section: Section, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            section,
            message: message.into(),
            hint: None,
        }
    }

    pub fn info(section: Section, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            section,
            message: message.into(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.section, self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, " ({})", hint)?;
        }
        Ok(())
    }
}

/// Validation report for one configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationResult {
    pub is_valid: bool,
    /// 0-100
    pub completeness: u32,
    pub issues: Vec<ValidationIssue>,
    pub section_status: BTreeMap<Section, SectionStatus>,
}

impl ValidationResult {
    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    pub fn issues_for(&self, section: Section) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.section == section)
    }

    pub fn status_of(&self, section: Section) -> SectionStatus {
        self.section_status
            .get(&section)
            .copied()
            .unwrap_or(SectionStatus::Missing)
    }
}

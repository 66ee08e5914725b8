//! Core data model: object records read from the host graph, source languages,
//! and the detection categories applied when flagging results.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Opaque identifier of an object in the host graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ObjectId {
    fn from(value: u64) -> Self {
        ObjectId(value)
    }
}

/// One object (class, program, module) extracted from the host graph.
///
/// Records are immutable once read. Which name attribute drives tree insertion
/// depends on the language profile (see [`NameField`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub id: ObjectId,
    /// Fully qualified name (e.g. `com.acme.billing.Invoice`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Short name; flat-namespace languages (COBOL programs) key on this one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Level/kind tag (e.g. `Java Class`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Host-specific internal type (e.g. `JV_CLASS`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_type: Option<String>,
    /// Whether the host graph marks this object as external to the application.
    #[serde(default)]
    pub external: bool,
}

impl ObjectRecord {
    /// Build an internal record with only a full name set.
    pub fn new(id: u64, full_name: impl Into<String>) -> Self {
        Self {
            id: ObjectId(id),
            full_name: Some(full_name.into()),
            name: None,
            level: None,
            internal_type: None,
            external: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    pub fn with_internal_type(mut self, internal_type: impl Into<String>) -> Self {
        self.internal_type = Some(internal_type.into());
        self
    }

    pub fn external(mut self) -> Self {
        self.external = true;
        self
    }

    /// Name attribute selected by `field`, if present and non-blank.
    pub fn name_for(&self, field: NameField) -> Option<&str> {
        let value = match field {
            NameField::FullName => self.full_name.as_deref(),
            NameField::Name => self.name.as_deref(),
        };
        value.filter(|v| !v.trim().is_empty())
    }
}

/// Which record attribute carries the name inserted into a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameField {
    FullName,
    Name,
}

impl NameField {
    /// Column name used by the SQLite store.
    pub fn column(self) -> &'static str {
        match self {
            NameField::FullName => "full_name",
            NameField::Name => "name",
        }
    }
}

/// Source languages with a known insertion strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Language {
    Java,
    Net,
    Cobol,
}

impl Language {
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Java => "JAVA",
            Language::Net => "NET",
            Language::Cobol => "COBOL",
        }
    }

    pub fn all() -> [Language; 3] {
        [Language::Java, Language::Net, Language::Cobol]
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "JAVA" => Ok(Language::Java),
            "NET" | ".NET" | "DOTNET" => Ok(Language::Net),
            "COBOL" => Ok(Language::Cobol),
            _ => Err(ConfigError::UnknownLanguage(s.to_string())),
        }
    }
}

/// Category written to flagged objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionCategory {
    KnownUtility,
    KnownNotUtility,
    UnknownUtility,
    UnknownNotUtility,
    Unknown,
    InOtherApplications,
    MissingCode,
}

impl DetectionCategory {
    /// Display label stored on the host graph.
    pub fn label(self) -> &'static str {
        match self {
            DetectionCategory::KnownUtility => "Known utility",
            DetectionCategory::KnownNotUtility => "Known not utility",
            DetectionCategory::UnknownUtility => "Unknown utility",
            DetectionCategory::UnknownNotUtility => "Unknown not utility",
            DetectionCategory::Unknown => "Unknown",
            DetectionCategory::InOtherApplications => "In others applications",
            DetectionCategory::MissingCode => "Potentially missing code",
        }
    }

    /// Decode a label written by [`DetectionCategory::label`].
    pub fn from_label(label: &str) -> Option<Self> {
        [
            DetectionCategory::KnownUtility,
            DetectionCategory::KnownNotUtility,
            DetectionCategory::UnknownUtility,
            DetectionCategory::UnknownNotUtility,
            DetectionCategory::Unknown,
            DetectionCategory::InOtherApplications,
            DetectionCategory::MissingCode,
        ]
        .into_iter()
        .find(|c| c.label() == label)
    }
}

impl fmt::Display for DetectionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

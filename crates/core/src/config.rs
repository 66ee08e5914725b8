//! Detection parameters and per-language profiles.
//!
//! Thresholds are plain values threaded into constructors; nothing here is
//! global. A `DetectionConfig` is usually embedded in the project config, and
//! can be overridden from a standalone JSON or YAML file.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Language, NameField};
use crate::tree::InsertStrategy;

pub const DEFAULT_VARIATION_LIMIT: f64 = 0.30;
pub const DEFAULT_MINIMUM_CORE_NAME_LENGTH: usize = 3;
pub const DEFAULT_SLICE_DEPTH: usize = 1;
pub const DEFAULT_TAXONOMY: &str = "Internal framework";

/// Configuration errors. These are programmer/config mistakes and are always
/// propagated to the caller.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No insertion strategy available for language '{0}'")]
    UnknownLanguage(String),

    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Failed to parse detection config: {0}")]
    Parse(String),

    #[error("Failed to read detection config: {0}")]
    Io(#[from] std::io::Error),
}

/// How the id -> module index treats an object id found under two leaves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Later modules overwrite earlier ones.
    #[default]
    LastWins,
    /// The first module to claim an id keeps it.
    FirstWins,
}

impl std::str::FromStr for DuplicatePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "last_wins" | "last" => Ok(DuplicatePolicy::LastWins),
            "first_wins" | "first" => Ok(DuplicatePolicy::FirstWins),
            other => Err(ConfigError::InvalidParameter {
                name: "duplicate_policy",
                reason: format!("'{other}' is not one of last_wins, first_wins"),
            }),
        }
    }
}

/// Which objects a language contributes to its tree, and how they are named.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageProfile {
    /// Record attribute inserted into the tree.
    pub name_field: NameField,
    /// Only records whose level matches exactly are inserted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level_filter: Option<String>,
    /// Internal types requested from the object source (empty = all).
    #[serde(default)]
    pub internal_types: Vec<String>,
    /// Segment delimiter; `None` selects prefix-merge insertion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<char>,
}

impl LanguageProfile {
    /// Built-in profile for a language.
    pub fn default_for(language: Language) -> Self {
        match language {
            Language::Java => Self {
                name_field: NameField::FullName,
                level_filter: Some("Java Class".to_string()),
                internal_types: vec![],
                delimiter: Some('.'),
            },
            Language::Net => Self {
                name_field: NameField::FullName,
                level_filter: None,
                internal_types: vec![],
                delimiter: Some('.'),
            },
            Language::Cobol => Self {
                name_field: NameField::Name,
                level_filter: None,
                internal_types: vec![],
                delimiter: None,
            },
        }
    }

    pub fn strategy(&self) -> InsertStrategy {
        match self.delimiter {
            Some(delimiter) => InsertStrategy::SegmentDelimited { delimiter },
            None => InsertStrategy::PrefixMerge,
        }
    }
}

fn default_variation_limit() -> f64 {
    DEFAULT_VARIATION_LIMIT
}

fn default_minimum_core_name_length() -> usize {
    DEFAULT_MINIMUM_CORE_NAME_LENGTH
}

fn default_slice_depth() -> usize {
    DEFAULT_SLICE_DEPTH
}

fn default_taxonomy() -> String {
    DEFAULT_TAXONOMY.to_string()
}

/// Tunable parameters for core detection and module slicing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Stop descending once a leaf's variation drops below this fraction.
    #[serde(default = "default_variation_limit")]
    pub variation_limit: f64,
    /// A core candidate's full name must be strictly longer than this.
    #[serde(default = "default_minimum_core_name_length")]
    pub minimum_core_name_length: usize,
    /// Depth at which the tree is sliced into modules.
    #[serde(default = "default_slice_depth")]
    pub slice_depth: usize,
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
    /// First segment of the taxonomy path written on flagged objects.
    #[serde(default = "default_taxonomy")]
    pub default_taxonomy: String,
    /// Per-language overrides of the built-in profiles.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub languages: BTreeMap<Language, LanguageProfile>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            variation_limit: DEFAULT_VARIATION_LIMIT,
            minimum_core_name_length: DEFAULT_MINIMUM_CORE_NAME_LENGTH,
            slice_depth: DEFAULT_SLICE_DEPTH,
            duplicate_policy: DuplicatePolicy::default(),
            default_taxonomy: DEFAULT_TAXONOMY.to_string(),
            languages: BTreeMap::new(),
        }
    }
}

impl DetectionConfig {
    /// Profile for `language`, honoring overrides.
    pub fn profile(&self, language: Language) -> LanguageProfile {
        self.languages
            .get(&language)
            .cloned()
            .unwrap_or_else(|| LanguageProfile::default_for(language))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.variation_limit.is_finite() || self.variation_limit < 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "variation_limit",
                reason: format!("expected a non-negative fraction, got {}", self.variation_limit),
            });
        }
        if self.default_taxonomy.trim().is_empty() {
            return Err(ConfigError::InvalidParameter {
                name: "default_taxonomy",
                reason: "must not be blank".to_string(),
            });
        }
        for (language, profile) in &self.languages {
            if profile.delimiter.is_some_and(char::is_whitespace) {
                return Err(ConfigError::InvalidParameter {
                    name: "delimiter",
                    reason: format!("whitespace delimiter configured for {language}"),
                });
            }
        }
        Ok(())
    }

    /// Parse a config from JSON or YAML text.
    pub fn from_str_with_format(body: &str, yaml: bool) -> Result<Self, ConfigError> {
        let config: DetectionConfig = if yaml {
            serde_yaml::from_str(body).map_err(|e| ConfigError::Parse(e.to_string()))?
        } else {
            serde_json::from_str(body).map_err(|e| ConfigError::Parse(e.to_string()))?
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse user-provided JSON, falling back to defaults when it is unreadable.
    pub fn deserialize_or_default(body: &str) -> Self {
        match Self::from_str_with_format(body, false) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(
                    "Failed to deserialize the detection config provided, using defaults: {err}"
                );
                Self::default()
            }
        }
    }
}

/// Load a detection config from disk; `.yaml`/`.yml` files are read as YAML,
/// everything else as JSON.
pub fn load_detection_config(path: &Path) -> Result<DetectionConfig, ConfigError> {
    let body = std::fs::read_to_string(path)?;
    let yaml = matches!(path.extension().and_then(|e| e.to_str()), Some("yaml" | "yml"));
    DetectionConfig::from_str_with_format(&body, yaml)
}

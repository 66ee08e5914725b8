use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::Tree;
use crate::config::{ConfigError, DetectionConfig, LanguageProfile};
use crate::model::{Language, ObjectRecord};

/// Outcome of a bulk build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertReport {
    pub inserted: usize,
    /// Records missing the required name attribute or filtered out by level.
    pub skipped: usize,
    /// Records rejected by the insertion strategy.
    pub failed: usize,
    pub last_error: Option<String>,
}

/// Builds a [`Tree`] for one source language.
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    language: Language,
    profile: LanguageProfile,
}

impl TreeBuilder {
    /// Builder using the built-in profile of `language`.
    pub fn for_language(language: Language) -> Self {
        Self { language, profile: LanguageProfile::default_for(language) }
    }

    /// Builder for a language given by name. Unknown languages are a
    /// configuration error.
    pub fn from_name(language: &str) -> Result<Self, ConfigError> {
        Ok(Self::for_language(language.parse()?))
    }

    /// Builder honoring the per-language overrides in `config`.
    pub fn from_config(language: Language, config: &DetectionConfig) -> Self {
        Self { language, profile: config.profile(language) }
    }

    pub fn with_profile(mut self, profile: LanguageProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn profile(&self) -> &LanguageProfile {
        &self.profile
    }

    /// Name to insert for `record`, or `None` if the record is not eligible.
    pub fn eligible_name<'r>(&self, record: &'r ObjectRecord) -> Option<&'r str> {
        if let Some(level) = &self.profile.level_filter {
            if record.level.as_deref() != Some(level.as_str()) {
                return None;
            }
        }
        record.name_for(self.profile.name_field)
    }

    /// Insert every eligible record into a fresh tree.
    ///
    /// Ineligible records and insertion failures are logged and counted,
    /// never propagated.
    pub fn build(&self, records: &[ObjectRecord]) -> (Tree, InsertReport) {
        let mut tree = Tree::new(self.profile.strategy());
        let mut report = InsertReport::default();

        for record in records {
            let Some(name) = self.eligible_name(record) else {
                debug!(
                    "Skipping object {} without an eligible {:?}",
                    record.id, self.profile.name_field
                );
                report.skipped += 1;
                continue;
            };
            match tree.insert_object(name, record) {
                Ok(()) => report.inserted += 1,
                Err(err) => {
                    warn!("Failed to insert object {} ('{}'): {}", record.id, name, err);
                    report.failed += 1;
                    report.last_error = Some(err.to_string());
                }
            }
        }

        info!(
            "Built {} tree: {} inserted, {} skipped, {} failed",
            self.language, report.inserted, report.skipped, report.failed
        );
        (tree, report)
    }
}

//! Display names for detected cores.

use crate::model::Language;
use crate::tree::Leaf;

const API_PREFIX: &str = "API";

/// Human-readable name for a package-style `full_name`.
///
/// Total: whenever the name cannot be split into usable segments the raw
/// full name is returned.
pub fn display_name(full_name: &str, language: Language) -> String {
    let segments: Vec<&str> = full_name.split('.').collect();
    let named = match language {
        Language::Java => java_name(&segments),
        Language::Net => net_name(&segments),
        Language::Cobol => None,
    };
    named.unwrap_or_else(|| full_name.to_string())
}

pub fn leaf_display_name(leaf: &Leaf, language: Language) -> String {
    display_name(leaf.full_name(), language)
}

// com.acme.billing -> "API Acme billing"
fn java_name(segments: &[&str]) -> Option<String> {
    match segments {
        [] | [_] => None,
        [_, company] => Some(format!("{API_PREFIX} {}", capitalize(non_empty(company)?))),
        [_, company, product, ..] => Some(format!(
            "{API_PREFIX} {} {}",
            capitalize(non_empty(company)?),
            non_empty(product)?
        )),
    }
}

// Acme.Billing.Core -> "API Acme Billing"
fn net_name(segments: &[&str]) -> Option<String> {
    match segments {
        [] | [_] => None,
        [vendor, product, ..] => {
            Some(format!("{API_PREFIX} {} {}", capitalize(non_empty(vendor)?), non_empty(product)?))
        }
    }
}

fn non_empty<'a>(segment: &'a str) -> Option<&'a str> {
    (!segment.trim().is_empty()).then_some(segment)
}

fn capitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitalize_handles_unicode_and_empty() {
        assert_eq!(capitalize("acme"), "Acme");
        assert_eq!(capitalize("élan"), "Élan");
        assert_eq!(capitalize(""), "");
    }
}

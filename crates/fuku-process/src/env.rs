//! Merges the daemon's environment with a service's configured overrides.

use std::collections::BTreeMap;

/// Starts from the current process's environment and layers `overrides` on
/// top, so a service only needs to declare the variables it adds or
/// changes rather than restate everything it inherits.
pub fn merged_environment(overrides: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    let mut merged: BTreeMap<String, String> = std::env::vars().collect();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_win_over_inherited_values() {
        std::env::set_var("FUKU_ENV_MERGE_TEST", "inherited");
        let mut overrides = BTreeMap::new();
        overrides.insert("FUKU_ENV_MERGE_TEST".to_string(), "overridden".to_string());
        let merged = merged_environment(&overrides);
        assert_eq!(merged.get("FUKU_ENV_MERGE_TEST").map(String::as_str), Some("overridden"));
        std::env::remove_var("FUKU_ENV_MERGE_TEST");
    }

    #[test]
    fn inherited_variables_survive_with_no_matching_override() {
        std::env::set_var("FUKU_ENV_MERGE_KEEP", "kept");
        let merged = merged_environment(&BTreeMap::new());
        assert_eq!(merged.get("FUKU_ENV_MERGE_KEEP").map(String::as_str), Some("kept"));
        std::env::remove_var("FUKU_ENV_MERGE_KEEP");
    }
}

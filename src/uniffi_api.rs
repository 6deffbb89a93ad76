//! UniFFI API module for Swift and Kotlin bindings.
//!
//! This module exposes the core filter and reconcile operations via UniFFI
//! for mobile platforms. All functions use JSON strings for input/output to
//! simplify cross-language marshalling.

use crate::error::CoreError;

/// Get the version of the pwdb-core library.
#[uniffi::export]
pub fn get_core_version() -> String {
    crate::get_core_version().to_string()
}

/// Filter entries with a filter expression.
///
/// # Arguments
/// * `input_json` - JSON string with format:
///   ```json
///   {
///     "filter": {"criteria": [{"logic": "and", "field": "title", "rule": "CO",
///                              "operand": {"kind": "text", "value": "vpn"}}]},
///     "entries": [{"uuid": "...", "group": "...", "title": "..."}],
///     "context": {"now": "2024-01-01T00:00:00Z"}
///   }
///   ```
///
/// # Returns
/// JSON string with format:
///   ```json
///   {
///     "matched_uuids": ["..."],
///     "total": 12
///   }
///   ```
#[uniffi::export]
pub fn filter_entries_json(input_json: String) -> Result<String, CoreError> {
    crate::filter::filter_entries_json(&input_json)
}

/// Validate a filter expression.
///
/// # Returns
/// JSON string with format `{"valid": false, "error": "..."}`.
#[uniffi::export]
pub fn validate_filter_json(filter_json: String) -> Result<String, CoreError> {
    crate::filter::validate_filter_json(&filter_json)
}

/// Compare two entry collections.
///
/// # Arguments
/// * `input_json` - JSON string with format:
///   ```json
///   {
///     "entries_a": [...],
///     "entries_b": [...],
///     "options": {"fields": ["password", "notes"], "whitespace_as_empty": true}
///   }
///   ```
///
/// # Returns
/// JSON string with format:
///   ```json
///   {
///     "only_in_a": [...],
///     "only_in_b": [...],
///     "conflicts": [{"group": "Bank", "title": "Visa", "user": "alice", "diffs": ["password"], ...}],
///     "identical": [...]
///   }
///   ```
#[uniffi::export]
pub fn compare_json(input_json: String) -> Result<String, CoreError> {
    crate::reconcile::compare_json(&input_json)
}

/// Synchronize a target database from a source database.
///
/// # Arguments
/// * `input_json` - JSON string with format:
///   ```json
///   {
///     "source": {"entries": [...], "policies": {...}},
///     "target": {"entries": [...], "policies": {...}},
///     "options": {"fields": ["password"]}
///   }
///   ```
///
/// # Returns
/// JSON string with format:
///   ```json
///   {
///     "target": {"entries": [...], "policies": {...}, "filters": [...]},
///     "report": {"modified_count": 1, "policy_rename_map": {}, "policies_added": [], "updated": [...]}
///   }
///   ```
#[uniffi::export]
pub fn synchronize_json(input_json: String) -> Result<String, CoreError> {
    crate::reconcile::synchronize_json(&input_json)
}

/// Merge a secondary database into a primary database.
///
/// # Arguments
/// * `input_json` - JSON string with format:
///   ```json
///   {
///     "primary": {"entries": [...]},
///     "secondary": {"entries": [...]},
///     "options": {"copy_db_filters": true}
///   }
///   ```
///
/// # Returns
/// JSON string with format:
///   ```json
///   {
///     "primary": {"entries": [...], "policies": {...}, "filters": [...]},
///     "report": {"added_count": 2, "skipped_count": 0, ...}
///   }
///   ```
#[uniffi::export]
pub fn merge_json(input_json: String) -> Result<String, CoreError> {
    crate::reconcile::merge_json(&input_json)
}

/// Default field mask for a context.
///
/// # Arguments
/// * `input_json` - JSON string with format `{"context": "compare"}`
///
/// # Returns
/// JSON array of field names.
#[uniffi::export]
pub fn default_field_mask_json(input_json: String) -> Result<String, CoreError> {
    crate::field_registry::default_field_mask_json(&input_json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_core_version() {
        assert_eq!(get_core_version(), env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_filter_entries_json() {
        let input = r#"{
            "filter": {"criteria": [{"field": "title", "rule": "CO",
                "operand": {"kind": "text", "value": "vpn"}}]},
            "entries": [
                {"uuid": "6f1c3f5e-2b1a-4c1e-9a57-3f0c8a2d4b11", "title": "My-VPN-Login"},
                {"uuid": "0b6f2f0e-7a43-4b0c-8f5e-1d2a3b4c5d6e", "title": "Mail"}
            ]
        }"#;

        let result = filter_entries_json(input.to_string());
        assert!(result.is_ok());

        let output: serde_json::Value = serde_json::from_str(&result.unwrap()).unwrap();
        assert_eq!(output["total"], 2);
        assert_eq!(
            output["matched_uuids"],
            serde_json::json!(["6f1c3f5e-2b1a-4c1e-9a57-3f0c8a2d4b11"])
        );
    }

    #[test]
    fn test_merge_json() {
        let input = r#"{
            "primary": {"entries": []},
            "secondary": {"entries": [
                {"uuid": "6f1c3f5e-2b1a-4c1e-9a57-3f0c8a2d4b11", "group": "Bank", "title": "Visa"}
            ]}
        }"#;

        let result = merge_json(input.to_string());
        assert!(result.is_ok());

        let output: serde_json::Value = serde_json::from_str(&result.unwrap()).unwrap();
        assert_eq!(output["report"]["added_count"], 1);
        assert_eq!(output["primary"]["entries"][0]["status"], "added");
    }

    #[test]
    fn test_invalid_json() {
        let result = compare_json("not json".to_string());
        assert!(matches!(result, Err(CoreError::JsonError(_))));
    }
}

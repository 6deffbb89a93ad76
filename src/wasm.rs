//! WASM bindings for the browser.

use wasm_bindgen::prelude::*;

use crate::entry::Entry;
use crate::field_registry::{default_field_mask, FieldType, MaskContext};
use crate::filter::{filter_entries, FilterInput, FilterOutput};
use crate::reconcile::{
    compare, merge, synchronize, CompareInput, CompareReport, MergeInput, MergeOutput, SyncInput,
    SyncOutput,
};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    pub fn log(s: &str);
}

/// Initialize panic hook for better error messages.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn parse_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("Failed to parse input: {}", e))
}

fn serialize_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("Failed to serialize output: {}", e))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Filter WASM Bindings
// ═══════════════════════════════════════════════════════════════════════════════

/// Filter entries.
///
/// Takes a JsValue (FilterInput) and returns a JsValue (FilterOutput).
#[wasm_bindgen(js_name = filterEntries)]
pub fn filter_entries_js(input: JsValue) -> Result<JsValue, JsValue> {
    let input: FilterInput = serde_wasm_bindgen::from_value(input).map_err(parse_error)?;

    let output: FilterOutput = filter_entries(input)
        .map_err(|e| JsValue::from_str(&format!("Filter failed: {}", e)))?;

    serde_wasm_bindgen::to_value(&output).map_err(serialize_error)
}

/// Filter entries using JSON strings (alternative API).
#[wasm_bindgen(js_name = filterEntriesJson)]
pub fn filter_entries_json_js(input_json: &str) -> Result<String, JsValue> {
    crate::filter::filter_entries_json(input_json)
        .map_err(|e| JsValue::from_str(&format!("Filter failed: {}", e)))
}

/// Validate a filter expression given as a JSON string.
///
/// Returns `{"valid": bool, "error": "..."}` as a JSON string.
#[wasm_bindgen(js_name = validateFilterJson)]
pub fn validate_filter_json_js(filter_json: &str) -> Result<String, JsValue> {
    crate::filter::validate_filter_json(filter_json)
        .map_err(|e| JsValue::from_str(&format!("Validation failed: {}", e)))
}

/// Default field mask for a context ("compare", "synchronize", "export", "filter").
#[wasm_bindgen(js_name = defaultFieldMask)]
pub fn default_field_mask_js(context: JsValue) -> Result<JsValue, JsValue> {
    let context: MaskContext = serde_wasm_bindgen::from_value(context).map_err(parse_error)?;
    let fields: Vec<FieldType> = default_field_mask(context).into();
    serde_wasm_bindgen::to_value(&fields).map_err(serialize_error)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Reconcile WASM Bindings
// ═══════════════════════════════════════════════════════════════════════════════

/// Compare two entry collections.
///
/// Takes a JsValue (CompareInput) and returns a JsValue (CompareReport).
#[wasm_bindgen(js_name = compareEntries)]
pub fn compare_js(input: JsValue) -> Result<JsValue, JsValue> {
    let input: CompareInput = serde_wasm_bindgen::from_value(input).map_err(parse_error)?;
    if let Some(subgroup) = &input.options.subgroup {
        subgroup
            .validate()
            .map_err(|e| JsValue::from_str(&format!("Compare failed: {}", e)))?;
    }

    let report: CompareReport = compare(&input.entries_a, &input.entries_b, &input.options);

    serde_wasm_bindgen::to_value(&report).map_err(serialize_error)
}

/// Compare using JSON strings (alternative API).
#[wasm_bindgen(js_name = compareEntriesJson)]
pub fn compare_json_js(input_json: &str) -> Result<String, JsValue> {
    crate::reconcile::compare_json(input_json)
        .map_err(|e| JsValue::from_str(&format!("Compare failed: {}", e)))
}

/// Synchronize a target database from a source database.
///
/// Takes a JsValue (SyncInput) and returns a JsValue (SyncOutput).
#[wasm_bindgen(js_name = synchronize)]
pub fn synchronize_js(input: JsValue) -> Result<JsValue, JsValue> {
    let SyncInput {
        source,
        mut target,
        options,
    } = serde_wasm_bindgen::from_value(input).map_err(parse_error)?;
    if let Some(subgroup) = &options.subgroup {
        subgroup
            .validate()
            .map_err(|e| JsValue::from_str(&format!("Synchronize failed: {}", e)))?;
    }

    let report = synchronize(&source, &mut target, &options);

    serde_wasm_bindgen::to_value(&SyncOutput { target, report }).map_err(serialize_error)
}

/// Synchronize using JSON strings (alternative API).
#[wasm_bindgen(js_name = synchronizeJson)]
pub fn synchronize_json_js(input_json: &str) -> Result<String, JsValue> {
    crate::reconcile::synchronize_json(input_json)
        .map_err(|e| JsValue::from_str(&format!("Synchronize failed: {}", e)))
}

/// Merge a secondary database into a primary database.
///
/// Takes a JsValue (MergeInput) and returns a JsValue (MergeOutput).
#[wasm_bindgen(js_name = mergeDatabases)]
pub fn merge_js(input: JsValue) -> Result<JsValue, JsValue> {
    let MergeInput {
        mut primary,
        secondary,
        options,
    } = serde_wasm_bindgen::from_value(input).map_err(parse_error)?;
    let merge_error =
        |e: crate::error::CoreError| JsValue::from_str(&format!("Merge failed: {}", e));
    if let Some(subgroup) = &options.subgroup {
        subgroup.validate().map_err(|e| merge_error(e.into()))?;
    }

    let report = merge(&mut primary, &secondary, &options).map_err(merge_error)?;

    serde_wasm_bindgen::to_value(&MergeOutput { primary, report }).map_err(serialize_error)
}

/// Merge using JSON strings (alternative API).
#[wasm_bindgen(js_name = mergeDatabasesJson)]
pub fn merge_json_js(input_json: &str) -> Result<String, JsValue> {
    crate::reconcile::merge_json(input_json)
        .map_err(|e| JsValue::from_str(&format!("Merge failed: {}", e)))
}

/// Create an empty entry with a fresh UUID, for front-ends building test data.
#[wasm_bindgen(js_name = newEntry)]
pub fn new_entry_js(group: &str, title: &str, user: &str) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(&Entry::new(group, title, user)).map_err(serialize_error)
}

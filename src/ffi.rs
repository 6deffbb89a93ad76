//! C FFI exports for desktop hosts.
//!
//! These functions provide a C-compatible interface to the JSON API.
//! All functions use JSON strings for input/output to simplify marshalling.

use std::ffi::{c_char, CStr, CString};
use std::ptr;

use crate::error::CoreResult;

/// Run a `*_json` function over a C string.
///
/// # Safety
///
/// `input_json` must be null or a valid null-terminated C string.
unsafe fn call_json(
    input_json: *const c_char,
    what: &str,
    f: fn(&str) -> CoreResult<String>,
) -> *mut c_char {
    if input_json.is_null() {
        return ptr::null_mut();
    }

    let c_str = match CStr::from_ptr(input_json).to_str() {
        Ok(s) => s,
        Err(_) => return ptr::null_mut(),
    };

    match f(c_str) {
        Ok(json) => string_to_c_char(json),
        Err(e) => create_error_response(&format!("{} failed: {}", what, e)),
    }
}

/// Filter entries.
///
/// # Safety
///
/// - `input_json` must be a valid null-terminated C string
/// - The returned pointer must be freed by calling `free_string`
///
/// # Returns
///
/// A null-terminated C string containing the JSON result (FilterOutput).
/// Returns null on invalid input pointers.
#[no_mangle]
pub unsafe extern "C" fn filter_entries_ffi(input_json: *const c_char) -> *mut c_char {
    call_json(input_json, "Filter", crate::filter::filter_entries_json)
}

/// Validate a filter expression.
///
/// # Safety
///
/// - `filter_json` must be a valid null-terminated C string
/// - The returned pointer must be freed by calling `free_string`
///
/// # Returns
///
/// A null-terminated C string containing `{"valid": bool, "error": "..."}`.
/// Returns null on invalid input pointers.
#[no_mangle]
pub unsafe extern "C" fn validate_filter_ffi(filter_json: *const c_char) -> *mut c_char {
    call_json(filter_json, "Validation", crate::filter::validate_filter_json)
}

/// Compare two entry collections.
///
/// # Safety
///
/// - `input_json` must be a valid null-terminated C string
/// - The returned pointer must be freed by calling `free_string`
///
/// # Returns
///
/// A null-terminated C string containing the JSON result (CompareReport).
/// Returns null on invalid input pointers.
#[no_mangle]
pub unsafe extern "C" fn compare_ffi(input_json: *const c_char) -> *mut c_char {
    call_json(input_json, "Compare", crate::reconcile::compare_json)
}

/// Synchronize a target database from a source database.
///
/// # Safety
///
/// - `input_json` must be a valid null-terminated C string
/// - The returned pointer must be freed by calling `free_string`
///
/// # Returns
///
/// A null-terminated C string containing the JSON result (SyncOutput).
/// Returns null on invalid input pointers.
#[no_mangle]
pub unsafe extern "C" fn synchronize_ffi(input_json: *const c_char) -> *mut c_char {
    call_json(input_json, "Synchronize", crate::reconcile::synchronize_json)
}

/// Merge a secondary database into a primary database.
///
/// # Safety
///
/// - `input_json` must be a valid null-terminated C string
/// - The returned pointer must be freed by calling `free_string`
///
/// # Returns
///
/// A null-terminated C string containing the JSON result (MergeOutput).
/// Returns null on invalid input pointers.
#[no_mangle]
pub unsafe extern "C" fn merge_ffi(input_json: *const c_char) -> *mut c_char {
    call_json(input_json, "Merge", crate::reconcile::merge_json)
}

/// Get the default field mask for a context as a JSON array of field names.
///
/// # Safety
///
/// - `input_json` must be a valid null-terminated C string
/// - The returned pointer must be freed by calling `free_string`
#[no_mangle]
pub unsafe extern "C" fn default_field_mask_ffi(input_json: *const c_char) -> *mut c_char {
    call_json(
        input_json,
        "Field mask",
        crate::field_registry::default_field_mask_json,
    )
}

/// Free a string that was allocated by Rust.
///
/// # Safety
///
/// - `s` must be a pointer that was returned by one of the FFI functions
/// - This function must only be called once per pointer
/// - After calling this function, the pointer is invalid
#[no_mangle]
pub unsafe extern "C" fn free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

/// Convert a Rust string to a C string pointer.
fn string_to_c_char(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(c_string) => c_string.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Create an error response JSON string.
fn create_error_response(message: &str) -> *mut c_char {
    let error_json = serde_json::json!({ "success": false, "error": message }).to_string();
    string_to_c_char(error_json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    unsafe fn take_string(result: *mut c_char) -> String {
        assert!(!result.is_null());
        let json = CStr::from_ptr(result).to_str().unwrap().to_string();
        free_string(result);
        json
    }

    #[test]
    fn test_null_input() {
        unsafe {
            assert!(filter_entries_ffi(ptr::null()).is_null());
            assert!(validate_filter_ffi(ptr::null()).is_null());
            assert!(compare_ffi(ptr::null()).is_null());
            assert!(synchronize_ffi(ptr::null()).is_null());
            assert!(merge_ffi(ptr::null()).is_null());
        }
    }

    #[test]
    fn test_invalid_json_input() {
        let invalid_json = CString::new("not valid json").unwrap();
        unsafe {
            let json = take_string(merge_ffi(invalid_json.as_ptr()));
            let value: serde_json::Value = serde_json::from_str(&json).unwrap();
            assert_eq!(value["success"], false);
            assert!(value["error"].as_str().unwrap().starts_with("Merge failed"));
        }
    }

    #[test]
    fn test_compare_ffi() {
        let input = CString::new(r#"{"entries_a": [], "entries_b": []}"#).unwrap();
        unsafe {
            let json = take_string(compare_ffi(input.as_ptr()));
            let value: serde_json::Value = serde_json::from_str(&json).unwrap();
            assert_eq!(value["conflicts"], serde_json::json!([]));
        }
    }

    #[test]
    fn test_default_field_mask_ffi() {
        let input = CString::new(r#"{"context": "compare"}"#).unwrap();
        unsafe {
            let json = take_string(default_field_mask_ffi(input.as_ptr()));
            let fields: Vec<String> = serde_json::from_str(&json).unwrap();
            assert!(fields.contains(&"password".to_string()));
        }
    }
}

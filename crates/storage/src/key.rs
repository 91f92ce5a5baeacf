//! Object key validation.
//!
//! S3 keys are flat strings, but we treat `/` as a separator so that keys can
//! never climb out of a configured prefix and never contain empty segments.

use crate::error::{ErrorKind, Result};

/// Validates and normalizes an object key.
///
/// `.` segments and empty segments (doubled or trailing slashes) are dropped,
/// `..` removes the previous segment. A key that would climb above the root,
/// contains a null byte or a backslash, or normalizes to nothing is rejected.
///
/// # Returns
/// Returns the normalized key if valid, or [`InvalidKey`](crate::error::ErrorKind::InvalidKey)
/// if invalid.
///
/// # Examples
///
/// ```
/// use coverup_storage::validate_key;
/// // Valid keys
/// assert!(validate_key("cw-cover/59/cover.jpg").is_ok());
/// assert!(validate_key("a/../cover.jpg").is_ok()); // (never leaves the root)
/// // Invalid keys
/// assert!(validate_key("../cover.jpg").is_err());
/// assert!(validate_key("a/../../b").is_err());
/// assert!(validate_key("a\0b").is_err());
/// // Keys get resolved
/// assert_eq!(validate_key("/cw-cover//59/./cover_sm.jpg/").unwrap(), "cw-cover/59/cover_sm.jpg");
/// ```
pub fn validate(key: impl AsRef<str>) -> Result<String> {
    let key = key.as_ref();
    if key.contains('\0') || key.contains('\\') {
        exn::bail!(ErrorKind::InvalidKey(key.to_string()));
    }
    let mut segments: Vec<&str> = Vec::new();
    for segment in key.split('/') {
        match segment {
            "" | "." => {},
            ".." => {
                if segments.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidKey(key.to_string()));
                }
            },
            s => segments.push(s),
        }
    }
    match segments.is_empty() {
        true => exn::bail!(ErrorKind::InvalidKey(key.to_string())),
        false => Ok(segments.join("/")),
    }
}

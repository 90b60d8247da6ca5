//! Naming rules for stores and collections.
//!
//! Both names end up as path components (`hives/<store>/<collection>.json`), so they
//! share one rule set:
//!
//! - not empty and not starting with a dot
//! - not ending with a dot or a space
//! - only ASCII letters, digits, `_`, `-` and `.`
//! - not a Windows device name (`CON`, `PRN`, `AUX`, `NUL`, `COM1`-`COM9`, `LPT1`-`LPT9`),
//!   compared case-insensitively on the whole name and on the part before the first dot

use tracing::{debug, trace};

use crate::{HiveError, NameKind, Result};

/// Device names Windows refuses as file or folder names.
pub const WINDOWS_RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8", "COM9", "LPT1", "LPT2",
    "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Validates a store name.
///
/// # Errors
///
/// Returns [`HiveError::InvalidName`] with [`NameKind::Database`] on failure.
pub fn validate_database_name(name: &str) -> Result<()> { validate_name(NameKind::Database, name) }

/// Validates a collection name.
///
/// # Errors
///
/// Returns [`HiveError::InvalidName`] with [`NameKind::Collection`] on failure.
pub fn validate_collection_name(name: &str) -> Result<()> { validate_name(NameKind::Collection, name) }

/// Applies the shared naming rules, reporting failures as `kind`.
fn validate_name(kind: NameKind, name: &str) -> Result<()> {
    trace!("Validating {} name: {}", kind, name);
    let invalid = |rule: &str| {
        debug!("{} name '{}' rejected: {}", kind, name, rule);
        Err(HiveError::InvalidName {
            kind,
            name: name.to_owned(),
        })
    };

    if name.is_empty() {
        return invalid("empty");
    }
    if name.starts_with('.') {
        return invalid("starts with a dot");
    }
    if name.ends_with('.') || name.ends_with(' ') {
        return invalid("ends with a dot or space");
    }
    if !is_valid_name_chars(name) {
        return invalid("contains invalid characters");
    }
    if is_reserved_name(name) {
        return invalid("reserved device name");
    }
    Ok(())
}

/// Returns true if every character is an ASCII letter, digit, `_`, `-` or `.`.
pub fn is_valid_name_chars(name: &str) -> bool {
    name.chars()
        .all(|ch| matches!(ch, 'a' ..= 'z' | 'A' ..= 'Z' | '0' ..= '9' | '_' | '-' | '.'))
}

/// Returns true for a Windows device name, with or without an extension.
pub fn is_reserved_name(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    let base = upper.split('.').next().unwrap_or(&upper);
    WINDOWS_RESERVED_NAMES.contains(&upper.as_str()) || WINDOWS_RESERVED_NAMES.contains(&base)
}

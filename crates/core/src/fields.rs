//! Sealing and opening selected string fields of a JSON document in place.
//!
//! Paths use dot notation. A `[]` suffix expands into every element of an
//! array, e.g. `"orders[].card_number"`. Missing paths and non-string leaves
//! are skipped.

use serde_json::Value;

use crate::envelope::is_envelope;
use crate::error::{FormatError, Result};
use crate::key::Key;

/// Segments of a dot-notation field path.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    /// Navigate into an object property by name.
    Key(String),
    /// Expand into every element of a JSON array.
    ArrayItem,
}

fn parse_path(path: &str) -> Vec<PathSegment> {
    let mut segments = Vec::new();
    for part in path.split('.') {
        if let Some(key) = part.strip_suffix("[]") {
            if !key.is_empty() {
                segments.push(PathSegment::Key(key.to_owned()));
            }
            segments.push(PathSegment::ArrayItem);
        } else {
            segments.push(PathSegment::Key(part.to_owned()));
        }
    }
    segments
}

/// Apply `leaf` to every string found at the end of `segments`.
fn visit_strings<F>(value: &mut Value, segments: &[PathSegment], leaf: &mut F) -> Result<()>
where
    F: FnMut(&mut String) -> Result<()>,
{
    let Some((head, rest)) = segments.split_first() else {
        if let Value::String(s) = value {
            leaf(s)?;
        }
        return Ok(());
    };

    match head {
        PathSegment::Key(key) => {
            if let Some(child) = value.as_object_mut().and_then(|map| map.get_mut(key)) {
                visit_strings(child, rest, leaf)?;
            }
        }
        PathSegment::ArrayItem => {
            if let Value::Array(items) = value {
                for item in items.iter_mut() {
                    visit_strings(item, rest, leaf)?;
                }
            }
        }
    }
    Ok(())
}

/// Encrypt every string field of `document` named by `paths`.
///
/// Fields that already hold an envelope are left as they are.
///
/// # Errors
///
/// Returns [`crate::Error::RandomSource`] if a nonce could not be generated.
/// The document may be partially sealed when an error is returned.
pub fn seal_fields<I, S>(document: &mut Value, paths: I, key: &Key) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for path in paths {
        let segments = parse_path(path.as_ref());
        visit_strings(document, &segments, &mut |s: &mut String| {
            let sealed = key.encrypt(s.as_bytes())?;
            // Envelope text is pure ASCII.
            *s = String::from_utf8_lossy(&sealed).into_owned();
            Ok(())
        })?;
    }
    Ok(())
}

/// Decrypt every envelope-valued string field of `document` named by `paths`.
///
/// Strings that are not envelopes are left as they are.
///
/// # Errors
///
/// Returns [`crate::Error::Decryption`] if a field fails authentication,
/// [`crate::Error::InvalidFormat`] if it is malformed or does not decrypt to
/// UTF-8 text.
pub fn open_fields<I, S>(document: &mut Value, paths: I, key: &Key) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for path in paths {
        let segments = parse_path(path.as_ref());
        visit_strings(document, &segments, &mut |s: &mut String| {
            if !is_envelope(s.as_bytes()) {
                return Ok(());
            }
            let plaintext = key.decrypt(s.as_bytes())?;
            *s = String::from_utf8(plaintext).map_err(|_| FormatError::NotUtf8)?;
            Ok(())
        })?;
    }
    Ok(())
}

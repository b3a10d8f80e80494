//! Boundary scanner: locates a key's value span in raw document bytes
//!
//! These are pure functions over `&[u8]`; no parse tree is ever built. All
//! offsets are byte offsets into the UTF-8 document, the same offsets the
//! index cache records and the splice-based write path consumes.
//!
//! The scanner matches key tokens textually. A key that occurs more than
//! once anywhere in the document (at any nesting depth) makes partial
//! operations undefined; guaranteeing uniqueness is the caller's
//! responsibility.

use spandb_core::{Error, Result};

/// Find the byte offset of the first `"<key>":` token outside any string
/// literal.
///
/// Returns the offset of the opening quote, or `None` if no such token
/// exists. Matches inside string literals are skipped via a quote- and
/// escape-aware scan; nesting depth is deliberately not considered (see the
/// module docs on key uniqueness).
pub fn find_key(data: &[u8], key: &str) -> Option<usize> {
    let token = key_token(key);
    let mut in_string = false;
    let mut i = 0;
    while i < data.len() {
        let b = data[i];
        if in_string {
            match b {
                b'\\' => i += 1,
                b'"' => in_string = false,
                _ => {}
            }
        } else if b == b'"' {
            if data[i..].starts_with(&token) {
                return Some(i);
            }
            in_string = true;
        }
        i += 1;
    }
    None
}

/// The byte form of the `"<key>":` token `find_key` scans for.
pub fn key_token(key: &str) -> Vec<u8> {
    let mut token = Vec::with_capacity(key.len() + 3);
    token.push(b'"');
    token.extend_from_slice(key.as_bytes());
    token.extend_from_slice(b"\":");
    token
}

/// Find the end offset of the value beginning at `value_start`.
///
/// Walks forward maintaining a bracket-depth counter, an inside-string flag
/// and escape state. The value ends at the first offset where depth has
/// returned to zero and the next significant byte is a delimiter (`,`, `}`,
/// `]`, or end of input) outside any string. This bounds objects, arrays,
/// strings, numbers, booleans and null alike.
pub fn seek_value_end(data: &[u8], value_start: usize) -> Result<usize> {
    let mut depth: usize = 0;
    let mut in_string = false;
    let mut i = value_start;
    while i < data.len() {
        let b = data[i];
        if in_string {
            match b {
                b'\\' => i += 1,
                b'"' => {
                    in_string = false;
                    if depth == 0 {
                        // A top-level string value ends at its closing quote.
                        return Ok(i + 1);
                    }
                }
                _ => {}
            }
        } else {
            match b {
                b'"' => in_string = true,
                b'{' | b'[' => depth += 1,
                b'}' | b']' => {
                    if depth == 0 {
                        // Closing bracket of the enclosing container: a bare
                        // scalar value ends just before it.
                        return Ok(i);
                    }
                    depth -= 1;
                    if depth == 0 {
                        return Ok(i + 1);
                    }
                }
                b',' if depth == 0 => return Ok(i),
                _ => {}
            }
        }
        i += 1;
    }
    if depth == 0 && !in_string {
        // A bare scalar may run to the end of the input.
        Ok(data.len())
    } else {
        Err(Error::Serialization(
            "unterminated value while scanning document".to_string(),
        ))
    }
}

/// Detect the indentation in effect at the key starting at `key_start`.
///
/// Walks backward over the run of spaces and tabs between the key and the
/// start of its line. A run containing tabs counts one level per character
/// with `"\t"` as the unit; a space run is divided by the configured unit's
/// width. Returns `(0, "")` when the key does not sit on its own indented
/// line (compact documents) or when no unit is configured.
pub fn detect_indentation(data: &[u8], key_start: usize, configured_unit: &str) -> (usize, String) {
    let mut run_start = key_start;
    let mut contains_tab = false;
    while run_start > 0 {
        match data[run_start - 1] {
            b' ' => run_start -= 1,
            b'\t' => {
                contains_tab = true;
                run_start -= 1;
            }
            _ => break,
        }
    }
    if run_start > 0 && data[run_start - 1] != b'\n' {
        return (0, String::new());
    }
    let run_len = key_start - run_start;
    if run_len == 0 {
        return (0, String::new());
    }
    if contains_tab {
        return (run_len, "\t".to_string());
    }
    if configured_unit.is_empty() {
        return (0, String::new());
    }
    (run_len / configured_unit.len(), configured_unit.to_string())
}

//! Reading and writing the JSON files the harness exchanges.
//!
//! Input files are often produced on Windows and may start with a UTF-8
//! byte-order mark; it is stripped before parsing. Output is always written
//! as pretty-printed UTF-8 without a BOM.

use crate::error::{EvalError, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

const UTF8_BOM: char = '\u{feff}';

/// Remove a leading byte-order mark, if any.
pub fn strip_bom(text: &str) -> &str {
    text.strip_prefix(UTF8_BOM).unwrap_or(text)
}

/// Read a text file, dropping a leading byte-order mark.
pub fn read_text(path: &Path) -> Result<String> {
    let data = fs::read(path).map_err(|e| EvalError::io(path, e))?;
    let text =
        String::from_utf8(data).map_err(|e| EvalError::Serialization(e.to_string()))?;
    Ok(strip_bom(&text).to_string())
}

/// Serialize a value and write it as pretty JSON.
pub fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| EvalError::io(parent, e))?;
        }
    }

    let json = serde_json::to_string_pretty(value)
        .map_err(|e| EvalError::Serialization(e.to_string()))?;

    fs::write(path, json).map_err(|e| EvalError::io(path, e))?;

    Ok(())
}

use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// `path` relative to `base` when it lies underneath it.
pub fn display_path(path: &Path, base: Option<&Path>) -> String {
    base.and_then(|base| path.strip_prefix(base).ok())
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Longest prefix of `text` within `max_bytes` that ends on a char boundary.
pub fn truncate_string(text: &str, max_bytes: usize) -> String {
    let end = text
        .char_indices()
        .map(|(idx, ch)| idx + ch.len_utf8())
        .take_while(|end| *end <= max_bytes)
        .last()
        .unwrap_or(0);
    text[..end].to_string()
}

/// Split text into pieces of at most `max_chars` characters.
pub fn chunk_chars(text: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() || max_chars == 0 {
        return vec![text.to_string()];
    }
    chars
        .chunks(max_chars)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Write a file, creating parent directories first.
pub fn write_with_parents(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| Error::io("create directory", parent, err))?;
    }
    fs::write(path, bytes).map_err(|err| Error::io("write", path, err))
}

//! Fixed-size sliding-window chunker.
//!
//! Splits page text into overlapping windows sized for the embedding
//! provider. Windows are measured in characters (not bytes) so multi-byte
//! input never splits a code point. Trimmed windows at or under the minimum
//! length are discarded; the cursor still advances so the walk terminates.

/// Default window size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 800;
/// Default overlap between adjacent windows in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;
/// Trimmed windows at or below this many characters are dropped.
const MIN_CHUNK_CHARS: usize = 50;

/// Split `text` into overlapping chunks.
///
/// Each iteration takes a `size`-character window starting at the cursor,
/// trims it, and keeps it only when the trimmed window exceeds 50 characters.
/// The cursor advances by `size - overlap` whether or not the window was
/// kept. Empty input yields an empty vector. `overlap` values that would
/// stall the cursor are clamped below `size`.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() || size == 0 {
        return Vec::new();
    }

    let step = size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut cursor = 0;

    while cursor < chars.len() {
        let end = (cursor + size).min(chars.len());
        let window: String = chars[cursor..end].iter().collect();
        let trimmed = window.trim();
        if trimmed.chars().count() > MIN_CHUNK_CHARS {
            chunks.push(trimmed.to_string());
        }
        cursor += step;
    }

    chunks
}

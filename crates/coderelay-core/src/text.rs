//! Transport-size text chunking.
//!
//! Chat transports cap message length, so long backend output is split
//! into ordered segments. Lengths are measured in Unicode scalar values,
//! not bytes.

/// Sent in place of backend output that trims down to nothing.
pub const EMPTY_RESPONSE_PLACEHOLDER: &str = "(empty response)";

/// Split `text` into segments of at most `max_len` code points.
///
/// Text that fits is returned as a single segment. Otherwise each
/// `max_len` window is cut at the last newline or space strictly above
/// the 75% mark of the window; with no such boundary the cut is hard and
/// may split a word. The boundary character starts the next segment, so
/// concatenating all segments reproduces `text` exactly. A final
/// remainder that fits is emitted whole.
pub fn chunk_text(text: &str, max_len: usize) -> Vec<String> {
    // A zero limit is meaningless; treat it as 1 rather than looping forever.
    let max_len = max_len.max(1);

    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut rest = chars.as_slice();
    while rest.len() > max_len {
        let mut cut = max_len;
        for i in (max_len * 3 / 4 + 1..max_len).rev() {
            if rest[i] == '\n' || rest[i] == ' ' {
                cut = i;
                break;
            }
        }
        chunks.push(rest[..cut].iter().collect());
        rest = &rest[cut..];
    }
    if !rest.is_empty() {
        chunks.push(rest.iter().collect());
    }
    chunks
}

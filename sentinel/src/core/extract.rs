//! Locate a JSON value inside free-form model output.

/// First balanced JSON array in `text`, e.g. a plan wrapped in prose or a code fence.
pub fn extract_json_array(text: &str) -> Option<&str> {
    extract_balanced(text, b'[', b']')
}

/// First balanced JSON object in `text`.
pub fn extract_json_object(text: &str) -> Option<&str> {
    extract_balanced(text, b'{', b'}')
}

/// Scan from the first `open` byte to its matching `close`, skipping brackets inside
/// string literals. Returns `None` when nothing balances.
fn extract_balanced(text: &str, open: u8, close: u8) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut search_from = 0;
    while let Some(offset) = bytes[search_from..].iter().position(|&b| b == open) {
        let start = search_from + offset;
        if let Some(end) = matching_close(bytes, start, open, close) {
            return text.get(start..=end);
        }
        search_from = start + 1;
    }
    None
}

fn matching_close(bytes: &[u8], start: usize, open: u8, close: u8) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (index, &byte) in bytes.iter().enumerate().skip(start) {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b if b == open => depth += 1,
            b if b == close => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

//! Regex scrubber for sensitive spans in drafts and retrieved snippets.

use std::sync::LazyLock;

use regex::Regex;

/// Category name and pattern, applied in this order.
static PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("PERSON_NAME", r"\b[A-Z][a-z]+ [A-Z][a-z]+\b"),
        ("PROJECT_ID", r"\b(?:PROJ|SEC)-\d{4}\b"),
        ("LOCATION_SPECIFIC", r"\bArea 51\b|\bLagos\b"),
    ]
    .into_iter()
    .filter_map(|(category, pattern)| Regex::new(pattern).ok().map(|re| (category, re)))
    .collect()
});

/// Mask token substituted for a match of `category`.
pub fn mask_for(category: &str) -> String {
    format!("[MASKED_{category}]")
}

/// Replace every sensitive span with its category mask.
///
/// Returns the scrubbed text and the number of masks applied. Mask tokens never
/// match any pattern, so scrubbing already-scrubbed text is a no-op.
pub fn scrub(text: &str) -> (String, usize) {
    let mut current = text.to_string();
    let mut applied = 0;
    for (category, re) in PATTERNS.iter() {
        let hits = re.find_iter(&current).count();
        if hits == 0 {
            continue;
        }
        applied += hits;
        current = re
            .replace_all(&current, mask_for(category).as_str())
            .into_owned();
    }
    (current, applied)
}

/// True if `scrub` would apply at least one mask.
pub fn contains_sensitive(text: &str) -> bool {
    PATTERNS.iter().any(|(_, re)| re.is_match(text))
}

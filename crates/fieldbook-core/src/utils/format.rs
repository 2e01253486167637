use std::cmp::Ordering;

/// Base letter of an accented lowercase letter. `ñ` sorts right after `n`.
fn collation_key(c: char) -> (char, bool) {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' => ('a', false),
        'é' | 'è' | 'ê' | 'ë' => ('e', false),
        'í' | 'ì' | 'î' | 'ï' => ('i', false),
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' => ('o', false),
        'ú' | 'ù' | 'û' | 'ü' => ('u', false),
        'ç' => ('c', false),
        'ñ' => ('n', true),
        other => (other, false),
    }
}

fn lowercase(s: &str) -> impl Iterator<Item = char> + '_ {
    s.chars().flat_map(char::to_lowercase)
}

/// Case- and accent-insensitive comparison without allocating.
/// Names equal after folding fall back to their lowercase code points.
pub fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    lowercase(a)
        .map(collation_key)
        .cmp(lowercase(b).map(collation_key))
        .then_with(|| lowercase(a).cmp(lowercase(b)))
}

/// Check whether `haystack` contains `needle`, ignoring case.
/// `needle` should already be lowercased.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// Hours for display: whole numbers without decimals, otherwise one decimal
pub fn format_hours(hours: f64) -> String {
    if hours.fract() == 0.0 {
        format!("{}", hours as i64)
    } else {
        format!("{:.1}", hours)
    }
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

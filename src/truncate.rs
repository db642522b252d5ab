/// Inserted where the middle of an over-long observation was cut.
pub const TRUNCATION_MARKER: &str = "\n[... Observation truncated due to length ...]\n";

/// Bound `content` to `max_chars` characters, keeping its head and tail
/// around [`TRUNCATION_MARKER`]. The result never exceeds the budget, so
/// truncating twice is the same as truncating once. Budgets too small for
/// the marker keep a plain prefix. `None` disables truncation.
pub fn truncate_content(content: &str, max_chars: Option<usize>) -> String {
    let Some(max_chars) = max_chars else {
        return content.to_string();
    };
    let total = content.chars().count();
    if total <= max_chars {
        return content.to_string();
    }

    let marker_len = TRUNCATION_MARKER.chars().count();
    if max_chars <= marker_len {
        return content.chars().take(max_chars).collect();
    }

    let budget = max_chars - marker_len;
    let head = budget - budget / 2;
    let tail = budget / 2;

    let mut out = String::with_capacity(content.len().min(max_chars * 4));
    out.extend(content.chars().take(head));
    out.push_str(TRUNCATION_MARKER);
    out.extend(content.chars().skip(total - tail));
    out
}

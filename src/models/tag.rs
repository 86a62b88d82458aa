//! Tag normalization shared by manifest loading and tag edits.

/// Normalize a raw tag: trim, lowercase, whitespace runs become `-`.
///
/// Returns `None` when nothing is left.
pub fn normalize_tag(raw: &str) -> Option<String> {
    let tag = raw
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-");

    if tag.is_empty() {
        None
    } else {
        Some(tag)
    }
}

/// Normalize every tag and collapse duplicates, keeping first occurrence order.
pub fn normalize_tags<'a, I>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.into_iter().filter_map(normalize_tag) {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

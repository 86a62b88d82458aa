//! Photo ids derived from upload file names.

/// Filesystem-safe id: lowercase ASCII alphanumerics, other runs become `-`.
pub fn slugify(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut pending_dash = false;

    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Sunset Pier #2"), "sunset-pier-2");
        assert_eq!(slugify("__IMG_0042__"), "img-0042");
        assert_eq!(slugify("already-a-slug"), "already-a-slug");
        assert_eq!(slugify("Café  Noir"), "caf-noir");
    }

    #[test]
    fn test_slugify_nothing_left() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("---"), "");
        assert_eq!(slugify("日本"), "");
    }
}

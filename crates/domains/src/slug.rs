//! URL slugs derived from display names.

/// Turns a display name into a lowercase, hyphen-separated, URL-safe slug.
///
/// Non-ASCII text is transliterated first (`"São Paulo"` becomes
/// `sao-paulo`), then ASCII letters and digits are kept (lowercased) and
/// every other run of characters, apostrophes included, collapses into one
/// `-`. The result never starts or ends with `-` and is empty only when the
/// name has nothing that transliterates to a letter or digit.
pub fn slugify(name: &str) -> String {
    let ascii = deunicode::deunicode(name);
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_separator = false;

    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }

    slug
}

//! Name normalization shared by threads and categories.

/// Slug used when a thread name folds down to nothing (e.g. only punctuation).
pub const EMPTY_SLUG: &str = "_";

/// Derives the URL slug of a thread name.
///
/// Lower-casing happens before transliteration so that upper-case diacritics
/// fold like their lower-case forms (`thrËad` becomes `thread`, not `thr-ead`).
pub fn slugify(name: &str) -> String {
    let slug = slug::slugify(name.to_lowercase());
    if slug.is_empty() {
        EMPTY_SLUG.to_string()
    } else {
        slug
    }
}

/// Normalized lookup key of a category: trimmed, upper-cased, whitespace runs
/// collapsed to `_`. Applied to both stored names and lookup input.
pub fn category_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_uppercase()
}

//! Slug derivation and validation.
//!
//! ASCII slugification (`slug` crate) is combined with Chinese transliteration
//! (`pinyin` crate) so titles like “基线对齐” become `ji-xian-dui-qi`. The store
//! itself never derives slugs; it only validates what callers supply.

use pinyin::{Pinyin, ToPinyin};
use slug::slugify;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
    #[error("slug `{slug}` must not contain whitespace or `/`")]
    Malformed { slug: String },
}

/// Check that a caller-supplied slug can be used as a lookup key.
///
/// Returns the trimmed slug.
pub fn validate_slug(input: &str) -> Result<&str, SlugError> {
    let slug = input.trim();
    if slug.is_empty() {
        return Err(SlugError::EmptyInput);
    }
    if slug.chars().any(|ch| ch.is_whitespace() || ch == '/') {
        return Err(SlugError::Malformed {
            slug: slug.to_string(),
        });
    }
    Ok(slug)
}

/// Derive a base slug from the provided human-readable text.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let transliterated = transliterate_to_ascii(input);
    let candidate = slugify(&transliterated);

    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

fn transliterate_to_ascii(input: &str) -> String {
    let mut output = String::with_capacity(input.len());

    for ch in input.chars() {
        if ch.is_ascii() {
            output.push(ch);
            continue;
        }

        match ch.to_pinyin() {
            Some(py) => append_pinyin(&mut output, py),
            None if ch.is_whitespace() => output.push(' '),
            // Left for slugify to filter.
            None => output.push(ch),
        }
    }

    output
}

fn append_pinyin(buffer: &mut String, pinyin: Pinyin) {
    if !buffer.is_empty() && !buffer.ends_with(' ') {
        buffer.push(' ');
    }
    buffer.push_str(pinyin.plain());
}

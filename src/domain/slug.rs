//! Heading anchor slugs.
//!
//! ASCII slugification comes from the `slug` crate; Chinese characters are
//! transliterated with `pinyin` first so “基线对齐” becomes `ji-xian-dui-qi`
//! rather than disappearing.

use std::collections::HashMap;

use pinyin::{Pinyin, ToPinyin};
use slug::slugify;

/// Derive a slug from heading text. Returns `None` when nothing
/// representable is left (empty text, punctuation only).
pub fn derive_slug(input: &str) -> Option<String> {
    if input.trim().is_empty() {
        return None;
    }

    let candidate = slugify(transliterate_to_ascii(input));
    (!candidate.is_empty()).then_some(candidate)
}

/// Hands out unique anchors within a single document, in heading order
/// (`usage`, `usage-2`, `usage-3`).
#[derive(Default, Debug)]
pub struct HeadingAnchors {
    occurrences: HashMap<String, usize>,
}

impl HeadingAnchors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn anchor_for(&mut self, heading: &str) -> Option<String> {
        let base = derive_slug(heading)?;
        let count = self.occurrences.entry(base.clone()).or_insert(0);
        *count += 1;

        if *count == 1 {
            Some(base)
        } else {
            Some(format!("{base}-{count}"))
        }
    }
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

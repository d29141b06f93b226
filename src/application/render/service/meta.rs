//! Grammar for the annotation string that follows a fence's language tag.
//!
//! ```text
//! meta      := shorthand | option*
//! shorthand := "[" spec "]"                  (the whole trimmed string)
//! option    := key | key "=" value            (whitespace separated)
//! value     := bare | '"' … '"' | "'" … "'"
//! spec      := item ("," item)*
//! item      := uint | uint "-" uint
//! ```
//!
//! Parsing never fails: malformed tokens and spec items are dropped and the
//! remaining options keep their defaults.

use std::collections::BTreeSet;

use tracing::debug;

use crate::domain::code::CodeBlockMeta;

/// Widest `a-b` range expanded from a line spec; longer ranges are cut short.
const MAX_RANGE_SPAN: u32 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
struct MetaToken {
    key: String,
    value: Option<String>,
}

/// Parse a fence meta string into code block options.
pub(crate) fn parse_meta(raw: Option<&str>) -> CodeBlockMeta {
    let mut meta = CodeBlockMeta::default();
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return meta;
    };

    if let Some(spec) = raw.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
        meta.highlight_lines = parse_line_spec(spec);
        return meta;
    }

    for token in tokenize(raw) {
        apply_token(&mut meta, token);
    }

    meta
}

fn apply_token(meta: &mut CodeBlockMeta, token: MetaToken) {
    let MetaToken { key, value } = token;
    match key.as_str() {
        "lines" => meta.highlight_lines = parse_line_spec(value.as_deref().unwrap_or_default()),
        "add" => meta.added_lines = parse_line_spec(value.as_deref().unwrap_or_default()),
        "remove" => meta.removed_lines = parse_line_spec(value.as_deref().unwrap_or_default()),
        "start" => meta.starting_line_number = parse_start(value.as_deref()),
        "nonumber" => meta.uses_line_numbers = false,
        _ => {
            meta.passthrough_attributes
                .insert(format!("data-{key}"), value.unwrap_or_default());
        }
    }
}

fn parse_start(value: Option<&str>) -> u32 {
    value
        .and_then(|raw| raw.trim().parse::<u32>().ok())
        .filter(|start| *start >= 1)
        .unwrap_or(1)
}

/// Parse a comma separated list of line numbers and inclusive ranges.
pub(crate) fn parse_line_spec(spec: &str) -> BTreeSet<u32> {
    let mut lines = BTreeSet::new();

    for item in spec.split(',').map(str::trim).filter(|item| !item.is_empty()) {
        match parse_spec_item(item) {
            Some((start, end)) => lines.extend(start..=end),
            None => debug!(
                target = "fenceline::render::meta",
                item, "Dropping malformed line spec item"
            ),
        }
    }

    lines
}

fn parse_spec_item(item: &str) -> Option<(u32, u32)> {
    match item.split_once('-') {
        Some((start, end)) => {
            let start = parse_uint(start)?;
            let end = parse_uint(end)?;
            (start <= end).then(|| (start, end.min(start.saturating_add(MAX_RANGE_SPAN))))
        }
        None => {
            let line = parse_uint(item)?;
            Some((line, line))
        }
    }
}

fn parse_uint(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

fn tokenize(raw: &str) -> Vec<MetaToken> {
    split_words(raw)
        .into_iter()
        .filter_map(|word| {
            let token = match word.split_once('=') {
                Some((key, value)) => MetaToken {
                    key: key.to_string(),
                    value: Some(unquote(value).to_string()),
                },
                None => MetaToken {
                    key: word.clone(),
                    value: None,
                },
            };

            if is_valid_key(&token.key) {
                Some(token)
            } else {
                debug!(
                    target = "fenceline::render::meta",
                    token = %word,
                    "Dropping meta token with invalid key"
                );
                None
            }
        })
        .collect()
}

/// Split on whitespace, keeping quoted runs (`title="two words"`) together.
fn split_words(raw: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in raw.chars() {
        match quote {
            Some(open) if ch == open => {
                quote = None;
                current.push(ch);
            }
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                current.push(ch);
            }
            None if ch.is_whitespace() => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            None => current.push(ch),
        }
    }

    if !current.is_empty() {
        words.push(current);
    }

    words
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

/// Keys become attribute names, so only a conservative character set passes.
fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
}

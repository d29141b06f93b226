use serde_yaml::Value;
use tracing::debug;

use crate::domain::document::Attributes;

const DELIMITER: &str = "---";

/// Result of splitting a raw document into metadata and markdown body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Frontmatter<'a> {
    pub(crate) attributes: Attributes,
    pub(crate) body: &'a str,
}

/// Split a leading `---` delimited metadata block off `input`.
///
/// The block is recognised only when the very first line is the delimiter and
/// a matching closing delimiter line follows. Without one, the input is
/// returned untouched with empty attributes. Unparseable YAML and nested
/// values are dropped; the body is still separated from the block.
pub(crate) fn split_frontmatter(input: &str) -> Frontmatter<'_> {
    let Some((block, body)) = locate_block(input) else {
        return Frontmatter {
            attributes: Attributes::new(),
            body: input,
        };
    };

    Frontmatter {
        attributes: parse_attributes(block),
        body,
    }
}

fn locate_block(input: &str) -> Option<(&str, &str)> {
    let (first_line, mut rest) = split_line(input)?;
    if first_line.trim_end() != DELIMITER {
        return None;
    }

    let block_start = input.len() - rest.len();
    loop {
        let line_start = input.len() - rest.len();
        let (line, remainder) = split_line(rest)?;
        if line.trim_end() == DELIMITER {
            return Some((&input[block_start..line_start], remainder));
        }
        rest = remainder;
    }
}

/// Split off one line, excluding its terminator. `None` once the input is
/// exhausted.
fn split_line(input: &str) -> Option<(&str, &str)> {
    if input.is_empty() {
        return None;
    }

    match input.find('\n') {
        Some(idx) => Some((input[..idx].trim_end_matches('\r'), &input[idx + 1..])),
        None => Some((input, "")),
    }
}

fn parse_attributes(block: &str) -> Attributes {
    let mut attributes = Attributes::new();

    let value: Value = match serde_yaml::from_str(block) {
        Ok(value) => value,
        Err(err) => {
            debug!(
                target = "fenceline::render::frontmatter",
                error = %err,
                "Frontmatter is not valid YAML; ignoring metadata"
            );
            return attributes;
        }
    };

    let Value::Mapping(mapping) = value else {
        return attributes;
    };

    for (key, value) in mapping {
        let (Some(key), Some(value)) = (scalar_to_string(&key), scalar_to_string(&value)) else {
            debug!(
                target = "fenceline::render::frontmatter",
                "Skipping non-scalar frontmatter entry"
            );
            continue;
        };
        attributes.insert(key, value);
    }

    attributes
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null => Some(String::new()),
        Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => None,
    }
}

//! Value types for highlighted code blocks: the supported language list,
//! parsed fence options, and tokenizer output.

use std::{collections::BTreeSet, fmt};

use indexmap::IndexMap;

/// Languages the code highlighter accepts. Fence tags outside this list are
/// rendered as escaped plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    JavaScript,
    TypeScript,
    Jsx,
    Tsx,
    Json,
    Markdown,
    Shell,
    Html,
    Css,
    Diff,
    Python,
    Yaml,
}

impl Language {
    pub const ALL: [Language; 12] = [
        Language::JavaScript,
        Language::TypeScript,
        Language::Jsx,
        Language::Tsx,
        Language::Json,
        Language::Markdown,
        Language::Shell,
        Language::Html,
        Language::Css,
        Language::Diff,
        Language::Python,
        Language::Yaml,
    ];

    /// Resolve a fence tag, applying aliases (`js` → `javascript`, `ts` →
    /// `typescript`, `sh` → `shell`, …). Matching is case-insensitive.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let language = match tag.trim().to_ascii_lowercase().as_str() {
            "javascript" | "js" | "mjs" | "cjs" => Language::JavaScript,
            "typescript" | "ts" | "mts" | "cts" => Language::TypeScript,
            "jsx" => Language::Jsx,
            "tsx" => Language::Tsx,
            "json" => Language::Json,
            "markdown" | "md" => Language::Markdown,
            "shell" | "sh" | "bash" | "zsh" => Language::Shell,
            "html" | "htm" => Language::Html,
            "css" => Language::Css,
            "diff" | "patch" => Language::Diff,
            "python" | "py" => Language::Python,
            "yaml" | "yml" => Language::Yaml,
            _ => return None,
        };
        Some(language)
    }

    /// Canonical name after alias resolution.
    pub fn as_str(self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Jsx => "jsx",
            Language::Tsx => "tsx",
            Language::Json => "json",
            Language::Markdown => "markdown",
            Language::Shell => "shell",
            Language::Html => "html",
            Language::Css => "css",
            Language::Diff => "diff",
            Language::Python => "python",
            Language::Yaml => "yaml",
        }
    }

    /// Syntax lookup tokens, tried in order against the syntax set.
    pub(crate) fn syntax_tokens(self) -> &'static [&'static str] {
        match self {
            Language::JavaScript => &["js", "javascript"],
            Language::TypeScript => &["ts", "typescript"],
            Language::Jsx => &["jsx", "js"],
            Language::Tsx => &["tsx", "ts"],
            Language::Json => &["json"],
            Language::Markdown => &["md", "markdown"],
            Language::Shell => &["bash", "sh"],
            Language::Html => &["html"],
            Language::Css => &["css"],
            Language::Diff => &["diff", "patch"],
            Language::Python => &["py", "python"],
            Language::Yaml => &["yaml", "yml"],
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options parsed from a fence's meta string.
///
/// `starting_line_number` is always at least 1, whatever the raw input was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlockMeta {
    pub highlight_lines: BTreeSet<u32>,
    pub added_lines: BTreeSet<u32>,
    pub removed_lines: BTreeSet<u32>,
    pub starting_line_number: u32,
    pub uses_line_numbers: bool,
    pub passthrough_attributes: IndexMap<String, String>,
}

impl Default for CodeBlockMeta {
    fn default() -> Self {
        Self {
            highlight_lines: BTreeSet::new(),
            added_lines: BTreeSet::new(),
            removed_lines: BTreeSet::new(),
            starting_line_number: 1,
            uses_line_numbers: true,
            passthrough_attributes: IndexMap::new(),
        }
    }
}

/// A run of code text sharing one literal color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub color: Option<String>,
}

impl Token {
    pub fn new(text: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: Some(color.into()),
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: None,
        }
    }
}

/// Tokens for one source line, without its line terminator.
pub type HighlightedLine = Vec<Token>;

//! Theme color virtualisation.
//!
//! The built-in highlighting theme paints every scope with a placeholder
//! literal (`#000004`, …). [`ThemeColorTable`] maps those literals to CSS
//! custom property references (`var(--code-token-keyword)`) so stored HTML can
//! be re-themed by swapping a stylesheet, and maps them back when literal
//! output is requested.

use std::{collections::HashMap, fmt::Write as _, str::FromStr};

use clap::ValueEnum;
use indexmap::IndexMap;

/// Placeholder literal → custom property name. The first entry is the
/// foreground.
const CSS_VARIABLE_COLORS: &[(&str, &str)] = &[
    ("#000000", "--code-foreground"),
    ("#000001", "--code-token-constant"),
    ("#000002", "--code-token-string"),
    ("#000003", "--code-token-comment"),
    ("#000004", "--code-token-keyword"),
    ("#000005", "--code-token-parameter"),
    ("#000006", "--code-token-function"),
    ("#000007", "--code-token-string-expression"),
    ("#000008", "--code-token-punctuation"),
    ("#000009", "--code-token-link"),
    ("#00000a", "--code-token-inserted"),
    ("#00000b", "--code-token-deleted"),
    ("#00000c", "--code-token-type"),
];

/// Light palette shipped by `fenceline theme-css`.
const DEFAULT_PALETTE: &[(&str, &str)] = &[
    ("--code-foreground", "#24292e"),
    ("--code-token-constant", "#005cc5"),
    ("--code-token-string", "#032f62"),
    ("--code-token-comment", "#6a737d"),
    ("--code-token-keyword", "#d73a49"),
    ("--code-token-parameter", "#e36209"),
    ("--code-token-function", "#6f42c1"),
    ("--code-token-string-expression", "#22863a"),
    ("--code-token-punctuation", "#24292e"),
    ("--code-token-link", "#032f62"),
    ("--code-token-inserted", "#22863a"),
    ("--code-token-deleted", "#b31d28"),
    ("--code-token-type", "#005cc5"),
];

pub(crate) const PLACEHOLDER_FOREGROUND: &str = "#000000";

/// How token colors are written into the HTML.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// `var(--code-token-*)` references, re-themable with CSS.
    #[default]
    Variables,
    /// The theme's literal colors, mapped back through the table.
    Literal,
    /// Colors from the default palette, for HTML shown without the stylesheet.
    Inline,
}

impl ColorMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ColorMode::Variables => "variables",
            ColorMode::Literal => "literal",
            ColorMode::Inline => "inline",
        }
    }
}

impl FromStr for ColorMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "variables" => Ok(ColorMode::Variables),
            "literal" => Ok(ColorMode::Literal),
            "inline" => Ok(ColorMode::Inline),
            other => Err(format!("unknown color mode `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ThemeColorTable {
    symbolic: IndexMap<String, String>,
    literal: HashMap<String, String>,
    palette: HashMap<String, String>,
    foreground: String,
}

impl ThemeColorTable {
    /// Table for the built-in placeholder theme.
    pub fn css_variables() -> Self {
        let mut table = Self::passthrough(PLACEHOLDER_FOREGROUND);
        for (literal, variable) in CSS_VARIABLE_COLORS {
            let reference = format!("var({variable})");
            table.literal.insert(reference.clone(), (*literal).to_string());
            table.symbolic.insert((*literal).to_string(), reference);
        }
        for (variable, color) in DEFAULT_PALETTE {
            table
                .palette
                .insert(format!("var({variable})"), (*color).to_string());
        }
        table
    }

    /// Empty table for themes with real colors: every color maps to itself.
    pub fn passthrough(foreground: impl Into<String>) -> Self {
        Self {
            symbolic: IndexMap::new(),
            literal: HashMap::new(),
            palette: HashMap::new(),
            foreground: foreground.into().to_ascii_lowercase(),
        }
    }

    /// Literal base text color of a code block.
    pub fn foreground(&self) -> &str {
        &self.foreground
    }

    /// Literal → symbolic reference; unknown values are returned unchanged.
    pub fn to_symbolic<'a>(&'a self, color: &'a str) -> &'a str {
        self.symbolic
            .get(&color.to_ascii_lowercase())
            .map_or(color, String::as_str)
    }

    /// Symbolic reference → literal; unknown values are returned unchanged.
    pub fn to_literal<'a>(&'a self, color: &'a str) -> &'a str {
        self.literal.get(color).map_or(color, String::as_str)
    }

    pub fn resolve<'a>(&'a self, color: &'a str, mode: ColorMode) -> &'a str {
        match mode {
            ColorMode::Variables => self.to_symbolic(color),
            ColorMode::Literal => self.to_literal(color),
            ColorMode::Inline => {
                let symbolic = self.to_symbolic(color);
                self.palette
                    .get(symbolic)
                    .map_or_else(|| self.to_literal(symbolic), String::as_str)
            }
        }
    }

    /// Rewrite the color values inside a `style` attribute for `mode`.
    pub(crate) fn resolve_style(&self, style: &str, mode: ColorMode) -> String {
        style
            .split(';')
            .map(str::trim)
            .filter(|declaration| !declaration.is_empty())
            .map(|declaration| match declaration.split_once(':') {
                Some((property, value)) if property.trim().eq_ignore_ascii_case("color") => {
                    format!("color: {}", self.resolve(value.trim(), mode))
                }
                _ => declaration.to_string(),
            })
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.symbolic
            .iter()
            .map(|(literal, symbolic)| (literal.as_str(), symbolic.as_str()))
    }
}

/// `:root` stylesheet assigning the default palette to every custom property.
pub fn default_palette_css() -> String {
    let mut css = String::from(":root {\n");
    for (variable, color) in DEFAULT_PALETTE {
        let _ = writeln!(css, "  {variable}: {color};");
    }
    css.push_str("}\n");
    css
}

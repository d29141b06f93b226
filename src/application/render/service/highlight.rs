use std::{path::PathBuf, str::FromStr, sync::Arc};

use once_cell::sync::Lazy;
use syntect::{
    dumps::from_uncompressed_data,
    easy::HighlightLines,
    highlighting::{Color, ScopeSelectors, StyleModifier, Theme, ThemeItem, ThemeSet},
    parsing::{SyntaxReference, SyntaxSet},
};
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::code::{HighlightedLine, Language, Token};

use super::colors::{PLACEHOLDER_FOREGROUND, ThemeColorTable};

/// Scope selectors of the built-in theme and the placeholder literal each one
/// is painted with. Later entries win over earlier ones on equal specificity.
const PLACEHOLDER_SCOPES: &[(&str, &str)] = &[
    ("punctuation, meta.brace", "#000008"),
    ("keyword, storage, storage.type, storage.modifier", "#000004"),
    ("keyword.operator", "#000008"),
    ("constant, support.constant, variable.other.constant, variable.language", "#000001"),
    ("string, punctuation.definition.string", "#000002"),
    (
        "punctuation.section.embedded, punctuation.definition.template-expression, meta.template.expression",
        "#000007",
    ),
    ("comment, punctuation.definition.comment", "#000003"),
    ("variable.parameter, meta.parameter", "#000005"),
    ("entity.name.function, support.function, meta.function-call.generic", "#000006"),
    (
        "entity.name.type, entity.name.class, support.type, support.class, entity.other.inherited-class",
        "#00000c",
    ),
    ("entity.name.tag", "#000004"),
    ("entity.other.attribute-name", "#000006"),
    ("markup.underline.link, string.other.link", "#000009"),
    ("markup.inserted, meta.diff.header.to-file", "#00000a"),
    ("markup.deleted, meta.diff.header.from-file", "#00000b"),
];

static SYNTAX_SET: Lazy<SyntaxSet> = Lazy::new(|| {
    let syntax_bytes = include_bytes!(env!("SYNTAX_PACK_FILE"));
    from_uncompressed_data(syntax_bytes).expect("syntax pack must be valid")
});

static SHARED_HIGHLIGHTER: Lazy<Arc<Highlighter>> = Lazy::new(|| {
    Arc::new(
        Highlighter::new(&ThemeSource::Placeholder)
            .expect("built-in placeholder theme must be valid"),
    )
});

/// Where the highlighting theme comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ThemeSource {
    /// Built-in theme painted with placeholder colors for CSS variable output.
    #[default]
    Placeholder,
    /// A `.tmTheme` file with real colors.
    File(PathBuf),
}

/// Failures constructing a highlighter. These are startup errors; nothing
/// per document can produce one.
#[derive(Debug, Error)]
pub enum HighlighterError {
    #[error("failed to load theme `{path}`: {message}")]
    ThemeLoad { path: PathBuf, message: String },
    #[error("invalid theme scope selector `{selector}`: {message}")]
    InvalidScope { selector: String, message: String },
    #[error("invalid theme color `{color}`")]
    InvalidColor { color: String },
}

/// Language-aware tokenizer bound to one theme.
///
/// Immutable once built, so a single instance is shared by every concurrent
/// render. [`Highlighter::shared`] holds the process-wide instance for the
/// built-in theme.
pub struct Highlighter {
    syntax_set: &'static SyntaxSet,
    theme: Theme,
    colors: ThemeColorTable,
}

impl Highlighter {
    pub fn new(source: &ThemeSource) -> Result<Self, HighlighterError> {
        let (theme, colors) = match source {
            ThemeSource::Placeholder => (placeholder_theme()?, ThemeColorTable::css_variables()),
            ThemeSource::File(path) => {
                let theme =
                    ThemeSet::get_theme(path).map_err(|err| HighlighterError::ThemeLoad {
                        path: path.clone(),
                        message: err.to_string(),
                    })?;
                let foreground = theme
                    .settings
                    .foreground
                    .map_or_else(|| PLACEHOLDER_FOREGROUND.to_string(), hex_color);
                info!(
                    target = "fenceline::render::highlight",
                    path = %path.display(),
                    "Loaded highlighting theme"
                );
                (theme, ThemeColorTable::passthrough(foreground))
            }
        };

        Ok(Self {
            syntax_set: &SYNTAX_SET,
            theme,
            colors,
        })
    }

    /// Process-wide highlighter for the built-in theme, built on first use.
    pub fn shared() -> Arc<Highlighter> {
        Arc::clone(&SHARED_HIGHLIGHTER)
    }

    pub fn colors(&self) -> &ThemeColorTable {
        &self.colors
    }

    /// Tokenize `code`, producing exactly one line per `\n`-delimited source
    /// line. Output depends only on the arguments.
    pub fn highlight(&self, code: &str, language: Language) -> Vec<HighlightedLine> {
        let Some(syntax) = self.find_syntax(language) else {
            warn!(
                target = "fenceline::render::highlight",
                language = %language,
                "No syntax definition found; emitting plain tokens"
            );
            return code.split('\n').map(plain_line).collect();
        };

        let mut highlighter = HighlightLines::new(syntax, &self.theme);
        code.split('\n')
            .map(|line| {
                let line = line.strip_suffix('\r').unwrap_or(line);
                let with_newline = format!("{line}\n");
                match highlighter.highlight_line(&with_newline, self.syntax_set) {
                    Ok(ranges) => ranges
                        .into_iter()
                        .filter_map(|(style, text)| {
                            let text = text.trim_end_matches('\n');
                            (!text.is_empty()).then(|| Token::new(text, hex_color(style.foreground)))
                        })
                        .collect(),
                    Err(err) => {
                        warn!(
                            target = "fenceline::render::highlight",
                            language = %language,
                            error = %err,
                            "Highlighting failed for line; emitting plain text"
                        );
                        plain_line(line)
                    }
                }
            })
            .collect()
    }

    fn find_syntax(&self, language: Language) -> Option<&'static SyntaxReference> {
        language
            .syntax_tokens()
            .iter()
            .find_map(|token| self.syntax_set.find_syntax_by_token(token))
    }
}

fn plain_line(line: &str) -> HighlightedLine {
    if line.is_empty() {
        Vec::new()
    } else {
        vec![Token::plain(line)]
    }
}

fn placeholder_theme() -> Result<Theme, HighlighterError> {
    let mut theme = Theme::default();
    theme.name = Some("fenceline-placeholder".to_string());
    theme.settings.foreground = Some(parse_hex_color(PLACEHOLDER_FOREGROUND)?);

    theme.scopes = PLACEHOLDER_SCOPES
        .iter()
        .map(|(selector, color)| {
            let scope =
                ScopeSelectors::from_str(selector).map_err(|err| HighlighterError::InvalidScope {
                    selector: (*selector).to_string(),
                    message: err.to_string(),
                })?;
            Ok(ThemeItem {
                scope,
                style: StyleModifier {
                    foreground: Some(parse_hex_color(color)?),
                    ..StyleModifier::default()
                },
            })
        })
        .collect::<Result<Vec<_>, HighlighterError>>()?;

    Ok(theme)
}

fn parse_hex_color(value: &str) -> Result<Color, HighlighterError> {
    let invalid = || HighlighterError::InvalidColor {
        color: value.to_string(),
    };
    let digits = value.strip_prefix('#').ok_or_else(invalid)?;
    if digits.len() != 6 {
        return Err(invalid());
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16).map_err(|_| invalid())
    };

    Ok(Color {
        r: channel(0..2)?,
        g: channel(2..4)?,
        b: channel(4..6)?,
        a: 0xff,
    })
}

fn hex_color(color: Color) -> String {
    if color.a == 0xff {
        format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
    } else {
        format!(
            "#{:02x}{:02x}{:02x}{:02x}",
            color.r, color.g, color.b, color.a
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joined(line: &HighlightedLine) -> String {
        line.iter().map(|token| token.text.as_str()).collect()
    }

    #[test]
    fn one_output_line_per_source_line() {
        let highlighter = Highlighter::shared();
        let code = "const a = 1;\n\nlet b = \"two\";";
        let lines = highlighter.highlight(code, Language::JavaScript);

        assert_eq!(lines.len(), 3);
        assert_eq!(joined(&lines[0]), "const a = 1;");
        assert!(lines[1].is_empty());
        assert_eq!(joined(&lines[2]), "let b = \"two\";");
    }

    #[test]
    fn tokens_carry_placeholder_colors() {
        let highlighter = Highlighter::shared();
        let lines = highlighter.highlight("// note\nreturn 1", Language::TypeScript);
        let table = highlighter.colors();

        for token in lines.iter().flatten() {
            let color = token.color.as_deref().expect("highlighted tokens are colored");
            assert!(
                table.to_symbolic(color).starts_with("var(--code-"),
                "{color} is not a placeholder"
            );
        }
        let comment = &lines[0][0];
        assert_eq!(comment.color.as_deref(), Some("#000003"));
    }

    #[test]
    fn highlighting_is_deterministic() {
        let highlighter = Highlighter::shared();
        let code = "def greet(name):\n    return f\"hi {name}\"\n";
        assert_eq!(
            highlighter.highlight(code, Language::Python),
            highlighter.highlight(code, Language::Python)
        );
    }

    #[test]
    fn every_supported_language_has_a_syntax() {
        let highlighter = Highlighter::shared();
        for language in Language::ALL {
            assert!(
                highlighter.find_syntax(language).is_some(),
                "missing syntax for {language}"
            );
        }
    }

    fn sample(language: Language) -> &'static str {
        match language {
            Language::JavaScript => {
                "import { readFile } from \"node:fs\";\n// load\nexport async function load(path) {\n  const text = await readFile(path, `utf8`);\n  return /^#/.test(text) ? null : JSON.parse(text);\n}"
            }
            Language::TypeScript => {
                "interface Options<T> { value?: T }\nexport const pick = <T,>(o: Options<T>): T | undefined => o.value;"
            }
            Language::Jsx => {
                "const App = ({ name }) => (\n  <div className=\"app\">{name && <b>{name}</b>}</div>\n);"
            }
            Language::Tsx => {
                "type Props = { label: string };\nexport function Button({ label }: Props) {\n  return <button onClick={() => alert(label)}>{label}</button>;\n}"
            }
            Language::Json => "{\"name\": \"fenceline\", \"tags\": [1, true, null]}",
            Language::Markdown => "# Title\n\n- item with `code`\n[link](https://example.com)",
            Language::Shell => "for f in *.md; do\n  echo \"${f%.md}\" | tr a-z A-Z\ndone",
            Language::Html => "<!doctype html>\n<p class=\"x\">hi<script>let a = 1;</script></p>",
            Language::Css => ":root { --x: #fff; }\n.a > b::before { content: \"\\201C\"; }",
            Language::Diff => "--- a/x\n+++ b/x\n@@ -1 +1 @@\n-old\n+new",
            Language::Python => "@dataclass\nclass A:\n    x: int = 0\n    def f(self):\n        return f\"{self.x!r}\"",
            Language::Yaml => "key: value\nlist:\n  - &anchor 1\n  - *anchor\n",
        }
    }

    #[test]
    fn every_language_highlights_realistic_code() {
        let highlighter = Highlighter::shared();
        for language in Language::ALL {
            let code = sample(language);
            let lines = highlighter.highlight(code, language);

            let rebuilt: Vec<String> = lines.iter().map(joined).collect();
            let expected: Vec<&str> = code.split('\n').collect();
            assert_eq!(rebuilt, expected, "text changed for {language}");
        }
    }

    #[test]
    fn shared_instance_survives_racing_first_use() {
        let instances: Vec<Arc<Highlighter>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        let highlighter = Highlighter::shared();
                        let lines = highlighter.highlight("let a = 1;", Language::JavaScript);
                        assert_eq!(joined(&lines[0]), "let a = 1;");
                        highlighter
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("thread finished"))
                .collect()
        });

        for instance in &instances[1..] {
            assert!(Arc::ptr_eq(&instances[0], instance));
        }
    }

    #[test]
    fn shared_instance_is_reused() {
        assert!(Arc::ptr_eq(&Highlighter::shared(), &Highlighter::shared()));
    }

    #[test]
    fn missing_theme_file_is_a_load_error() {
        let result = Highlighter::new(&ThemeSource::File(PathBuf::from(
            "/nonexistent/theme.tmTheme",
        )));
        assert!(matches!(result, Err(HighlighterError::ThemeLoad { .. })));
    }

    #[test]
    fn parses_and_formats_hex_colors() {
        let color = parse_hex_color("#0a0B0c").expect("valid color");
        assert_eq!(hex_color(color), "#0a0b0c");
        assert!(parse_hex_color("0a0b0c").is_err());
        assert!(parse_hex_color("#0a0b").is_err());
    }
}

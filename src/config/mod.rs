//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{num::NonZeroUsize, path::PathBuf, str::FromStr};

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::application::render::ColorMode;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "fenceline";
const ENV_PREFIX: &str = "FENCELINE";
const DEFAULT_STRIP_EXTENSIONS: &[&str] = &[".md", ".mdx"];
const DEFAULT_RENDERALL_CONCURRENCY: usize = 4;

/// Command-line arguments for the fenceline binary.
#[derive(Debug, Parser)]
#[command(
    name = "fenceline",
    version,
    about = "Render markdown with highlighted, diff-aware code blocks"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "FENCELINE_CONFIG_FILE",
        value_name = "PATH",
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Render one markdown document to stdout.
    Render(RenderArgs),
    /// Render every markdown file under a directory.
    #[command(name = "renderall")]
    RenderAll(RenderAllArgs),
    /// Print the default palette as a CSS custom property stylesheet.
    #[command(name = "theme-css")]
    ThemeCss,
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    /// Markdown file to render.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,

    /// Print `{attributes, html}` as JSON instead of bare HTML.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct RenderAllArgs {
    /// Directory searched recursively for `.md` files.
    #[arg(value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub input: PathBuf,

    /// Directory receiving the rendered `.html` and `.json` files.
    #[arg(long = "out", value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub out: PathBuf,

    /// Maximum number of concurrent render tasks.
    #[arg(
        long,
        default_value_t = DEFAULT_RENDERALL_CONCURRENCY,
        value_parser = clap::value_parser!(usize)
    )]
    pub concurrency: usize,
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Use a `.tmTheme` file instead of the built-in placeholder theme.
    #[arg(long = "theme-path", value_name = "PATH", global = true)]
    pub theme_path: Option<PathBuf>,

    /// How token colors are written (variables|literal|inline).
    #[arg(long = "color-mode", value_name = "MODE", value_enum, global = true)]
    pub color_mode: Option<ColorMode>,

    /// Skip HTML sanitisation.
    #[arg(long = "no-sanitize", action = clap::ArgAction::SetTrue, global = true)]
    pub no_sanitize: bool,

    /// Resolve relative links against this base URL or path.
    #[arg(long = "link-base", value_name = "URL", global = true)]
    pub link_base: Option<String>,
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub render: RenderSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSettings {
    pub theme_path: Option<PathBuf>,
    pub color_mode: ColorMode,
    pub sanitize: bool,
    pub link_base: Option<String>,
    pub strip_extensions: Vec<String>,
    pub max_document_bytes: Option<NonZeroUsize>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            theme_path: None,
            color_mode: ColorMode::default(),
            sanitize: true,
            link_base: None,
            strip_extensions: default_strip_extensions(),
            max_document_bytes: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

/// Parse process arguments and load settings in one step.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    render: RawRenderSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &GlobalOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }

        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }

        if let Some(path) = overrides.theme_path.as_ref() {
            self.render.theme_path = Some(path.clone());
        }

        if let Some(mode) = overrides.color_mode {
            self.render.color_mode = Some(mode.as_str().to_string());
        }

        if overrides.no_sanitize {
            self.render.sanitize = Some(false);
        }

        if let Some(base) = overrides.link_base.as_ref() {
            self.render.link_base = Some(base.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings { logging, render } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            render: build_render_settings(render)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::WARN,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_render_settings(render: RawRenderSettings) -> Result<RenderSettings, LoadError> {
    let theme_path = match render.theme_path {
        Some(path) if path.as_os_str().is_empty() => {
            return Err(LoadError::invalid(
                "render.theme_path",
                "path must not be empty",
            ));
        }
        other => other,
    };

    let color_mode = match render.color_mode {
        Some(mode) => ColorMode::from_str(&mode)
            .map_err(|reason| LoadError::invalid("render.color_mode", reason))?,
        None => ColorMode::default(),
    };

    let link_base = render.link_base.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let strip_extensions = match render.strip_extensions {
        Some(extensions) => {
            for extension in &extensions {
                if extension.len() < 2 || !extension.starts_with('.') {
                    return Err(LoadError::invalid(
                        "render.strip_extensions",
                        format!("`{extension}` must look like `.ext`"),
                    ));
                }
            }
            extensions
        }
        None => default_strip_extensions(),
    };

    let max_document_bytes = match render.max_document_bytes {
        Some(limit) => {
            let limit = usize::try_from(limit).map_err(|_| {
                LoadError::invalid(
                    "render.max_document_bytes",
                    "value exceeds supported range for usize",
                )
            })?;
            Some(NonZeroUsize::new(limit).ok_or_else(|| {
                LoadError::invalid("render.max_document_bytes", "must be greater than zero")
            })?)
        }
        None => None,
    };

    Ok(RenderSettings {
        theme_path,
        color_mode,
        sanitize: render.sanitize.unwrap_or(true),
        link_base,
        strip_extensions,
        max_document_bytes,
    })
}

fn default_strip_extensions() -> Vec<String> {
    DEFAULT_STRIP_EXTENSIONS
        .iter()
        .map(|extension| (*extension).to_string())
        .collect()
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    theme_path: Option<PathBuf>,
    color_mode: Option<String>,
    sanitize: Option<bool>,
    link_base: Option<String>,
    strip_extensions: Option<Vec<String>>,
    max_document_bytes: Option<u64>,
}

#[cfg(test)]
mod tests;

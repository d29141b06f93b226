use std::io::Write;

use clap::Parser;

use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("info".to_string());
    raw.render.color_mode = Some("literal".to_string());

    let overrides = GlobalOverrides {
        log_level: Some("debug".to_string()),
        color_mode: Some(ColorMode::Variables),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.render.color_mode, ColorMode::Variables);
}

#[test]
fn defaults_are_sane() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.render, RenderSettings::default());
    assert!(settings.render.sanitize);
    assert_eq!(settings.render.strip_extensions, vec![".md", ".mdx"]);
    assert_eq!(settings.logging.level, LevelFilter::WARN);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = GlobalOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn no_sanitize_flag_disables_sanitisation() {
    let mut raw = RawSettings::default();
    raw.render.sanitize = Some(true);
    raw.apply_overrides(&GlobalOverrides {
        no_sanitize: true,
        ..Default::default()
    });

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(!settings.render.sanitize);
}

#[test]
fn rejects_unknown_color_mode() {
    let mut raw = RawSettings::default();
    raw.render.color_mode = Some("sepia".to_string());

    let err = Settings::from_raw(raw).expect_err("invalid color mode");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "render.color_mode",
            ..
        }
    ));
}

#[test]
fn rejects_zero_document_limit() {
    let mut raw = RawSettings::default();
    raw.render.max_document_bytes = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero limit");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "render.max_document_bytes",
            ..
        }
    ));
}

#[test]
fn rejects_malformed_strip_extensions() {
    let mut raw = RawSettings::default();
    raw.render.strip_extensions = Some(vec!["md".to_string()]);

    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn blank_link_base_is_ignored() {
    let mut raw = RawSettings::default();
    raw.render.link_base = Some("   ".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.render.link_base, None);
}

#[test]
fn loads_render_section_from_config_file() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp file");
    writeln!(
        file,
        "[render]\ncolor_mode = \"inline\"\nlink_base = \"/docs\"\nmax_document_bytes = 4096\n\n[logging]\nlevel = \"debug\""
    )
    .expect("write config");

    let path = file.path().to_string_lossy().into_owned();
    let cli = CliArgs::parse_from(["fenceline", "--config-file", path.as_str(), "theme-css"]);
    let settings = load(&cli).expect("settings load");

    assert_eq!(settings.render.color_mode, ColorMode::Inline);
    assert_eq!(settings.render.link_base.as_deref(), Some("/docs"));
    assert_eq!(
        settings.render.max_document_bytes.map(NonZeroUsize::get),
        Some(4096)
    );
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn parse_render_arguments() {
    let args = CliArgs::parse_from([
        "fenceline",
        "render",
        "docs/intro.md",
        "--json",
        "--color-mode",
        "literal",
    ]);

    assert_eq!(args.overrides.color_mode, Some(ColorMode::Literal));
    match args.command {
        Command::Render(render) => {
            assert_eq!(render.file, PathBuf::from("docs/intro.md"));
            assert!(render.json);
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn unknown_color_mode_flag_is_rejected_by_the_parser() {
    let result = CliArgs::try_parse_from([
        "fenceline",
        "--color-mode",
        "sepia",
        "render",
        "docs/intro.md",
    ]);

    assert!(result.is_err());
}

#[test]
fn parse_renderall_arguments() {
    let args = CliArgs::parse_from([
        "fenceline",
        "--no-sanitize",
        "renderall",
        "content",
        "--out",
        "public",
        "--concurrency",
        "8",
    ]);

    assert!(args.overrides.no_sanitize);
    match args.command {
        Command::RenderAll(render) => {
            assert_eq!(render.input, PathBuf::from("content"));
            assert_eq!(render.out, PathBuf::from("public"));
            assert_eq!(render.concurrency, 8);
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn renderall_concurrency_has_a_default() {
    let args = CliArgs::parse_from(["fenceline", "renderall", "content", "--out", "public"]);

    match args.command {
        Command::RenderAll(render) => {
            assert_eq!(render.concurrency, DEFAULT_RENDERALL_CONCURRENCY);
        }
        _ => panic!("wrong command parsed"),
    }
}

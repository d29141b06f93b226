//! Markdown rendering with highlighted, diff-aware code blocks.
//!
//! ```no_run
//! let output = fenceline::application::render::render("# Hello\n")?;
//! assert!(output.attributes.is_empty());
//! # Ok::<(), fenceline::application::render::RenderError>(())
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;

//! Filesystem layout for batch rendering: source discovery and mirrored
//! `.html`/`.json` output files.

use std::path::{Path, PathBuf};

use tokio::fs;
use walkdir::WalkDir;

use crate::application::render::RenderOutput;

use super::error::InfraError;

const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

/// Markdown files under `root`, sorted by path. Hidden directories are skipped.
pub fn discover_markdown(root: &Path) -> Result<Vec<PathBuf>, InfraError> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root).follow_links(false).into_iter().filter_entry(|entry| {
        entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with('.')
    });

    for entry in walker {
        let entry = entry.map_err(|err| InfraError::walk(root, err.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_markdown = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                MARKDOWN_EXTENSIONS
                    .iter()
                    .any(|candidate| ext.eq_ignore_ascii_case(candidate))
            });
        if is_markdown {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

/// Maps source files under `input` to output files under `out`, keeping the
/// relative directory structure.
#[derive(Debug, Clone)]
pub struct OutputTree {
    input: PathBuf,
    out: PathBuf,
}

impl OutputTree {
    pub fn new(input: impl Into<PathBuf>, out: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            out: out.into(),
        }
    }

    /// `(html, json)` destinations for `source`.
    pub fn destinations(&self, source: &Path) -> (PathBuf, PathBuf) {
        let relative = source.strip_prefix(&self.input).unwrap_or(source);
        let base = self.out.join(relative);
        (base.with_extension("html"), base.with_extension("json"))
    }

    pub async fn write(&self, source: &Path, output: &RenderOutput) -> Result<(), InfraError> {
        let (html_path, json_path) = self.destinations(source);

        if let Some(parent) = html_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|err| InfraError::io(parent, err))?;
        }

        fs::write(&html_path, output.html.as_bytes())
            .await
            .map_err(|err| InfraError::io(&html_path, err))?;

        let attributes = serde_json::to_vec_pretty(&output.attributes)?;
        fs::write(&json_path, attributes)
            .await
            .map_err(|err| InfraError::io(&json_path, err))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destinations_mirror_the_input_tree() {
        let tree = OutputTree::new("content", "public");
        let (html, json) = tree.destinations(Path::new("content/guide/intro.md"));

        assert_eq!(html, PathBuf::from("public/guide/intro.html"));
        assert_eq!(json, PathBuf::from("public/guide/intro.json"));
    }

    #[test]
    fn discovers_markdown_files_in_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        std::fs::create_dir_all(root.join("b/nested")).expect("mkdir");
        std::fs::create_dir_all(root.join(".git")).expect("mkdir");
        std::fs::write(root.join("b/nested/two.md"), "# two").expect("write");
        std::fs::write(root.join("a.MD"), "# one").expect("write");
        std::fs::write(root.join("notes.txt"), "skip").expect("write");
        std::fs::write(root.join(".git/HEAD.md"), "skip").expect("write");

        let found = discover_markdown(root).expect("walk");
        let relative: Vec<_> = found
            .iter()
            .map(|path| path.strip_prefix(root).expect("under root").to_path_buf())
            .collect();

        assert_eq!(
            relative,
            vec![PathBuf::from("a.MD"), PathBuf::from("b/nested/two.md")]
        );
    }

    #[tokio::test]
    async fn write_creates_html_and_attribute_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tree = OutputTree::new("content", dir.path());
        let mut output = RenderOutput {
            attributes: Default::default(),
            html: "<p>hi</p>\n".to_string(),
        };
        output
            .attributes
            .insert("title".to_string(), "Hi".to_string());

        tree.write(Path::new("content/deep/page.md"), &output)
            .await
            .expect("write");

        let html = std::fs::read_to_string(dir.path().join("deep/page.html")).expect("html");
        let json = std::fs::read_to_string(dir.path().join("deep/page.json")).expect("json");
        assert_eq!(html, "<p>hi</p>\n");
        assert!(json.contains("\"title\": \"Hi\""));
    }
}

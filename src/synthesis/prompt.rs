//! Prompt templates and retrieved-context formatting
//!
//! Templates are plain text files named `<name>.txt` containing the
//! `{RESULTS}` and `{QUERY}` placeholders. `{{` and `}}` render as literal
//! braces. Files are read on every call.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use super::SynthesisError;
use crate::vector_store::QueryResult;

/// Template used when a request names none
pub const DEFAULT_TEMPLATE: &str = "basic_rag_prompt";

/// Metadata keys promoted to each entry's header line
const TITLE_KEY: &str = "title";
const DATE_KEY: &str = "date";

/// Directory of prompt template files
#[derive(Debug, Clone)]
pub struct PromptTemplates {
    dir: PathBuf,
}

impl PromptTemplates {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a named template; names are `[A-Za-z0-9_-]+`
    pub fn path_for(&self, name: &str) -> Result<PathBuf, SynthesisError> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(SynthesisError::InvalidTemplateName(name.to_string()));
        }
        Ok(self.dir.join(format!("{}.txt", name)))
    }

    /// Read a template's text
    pub async fn load(&self, name: &str) -> Result<String, SynthesisError> {
        let path = self.path_for(name)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(template = %name, path = %path.display(), "Prompt template missing");
                Err(SynthesisError::TemplateNotFound(name.to_string()))
            }
            Err(e) => Err(SynthesisError::Io(e)),
        }
    }
}

/// Substitute the placeholders in `template`
pub fn render(template: &str, results: &str, query: &str) -> String {
    let mut out = String::with_capacity(template.len() + results.len() + query.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        let (replacement, consumed) = if tail.starts_with("{{") {
            ("{", 2)
        } else if tail.starts_with("}}") {
            ("}", 2)
        } else if tail.starts_with("{RESULTS}") {
            (results, "{RESULTS}".len())
        } else if tail.starts_with("{QUERY}") {
            (query, "{QUERY}".len())
        } else {
            (&tail[..1], 1)
        };

        out.push_str(replacement);
        rest = &tail[consumed..];
    }
    out.push_str(rest);
    out
}

/// Human-readable context block for retrieved documents
///
/// ```text
/// [1] Title (2024-01-01)
/// author: someone
/// Document text...
/// ```
pub fn format_context(results: &QueryResult) -> String {
    let mut block = String::new();

    for (i, hit) in results.hits.iter().enumerate() {
        if i > 0 {
            block.push('\n');
        }

        let title = hit.metadata.get(TITLE_KEY).map(value_text);
        let date = hit.metadata.get(DATE_KEY).map(value_text);
        let _ = match (title, date) {
            (Some(title), Some(date)) => writeln!(block, "[{}] {} ({})", i + 1, title, date),
            (Some(title), None) => writeln!(block, "[{}] {}", i + 1, title),
            (None, Some(date)) => writeln!(block, "[{}] ({})", i + 1, date),
            (None, None) => writeln!(block, "[{}]", i + 1),
        };

        for (key, value) in &hit.metadata {
            if key != TITLE_KEY && key != DATE_KEY {
                let _ = writeln!(block, "{}: {}", key, value_text(value));
            }
        }
        let _ = writeln!(block, "{}", hit.document);
    }

    block
}

fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::{Metadata, QueryHit};
    use serde_json::json;
    use tempfile::TempDir;

    fn hit(document: &str, metadata: serde_json::Value) -> QueryHit {
        QueryHit {
            id: "id".to_string(),
            document: document.to_string(),
            metadata: metadata.as_object().cloned().unwrap_or_else(Metadata::new),
            distance: 0.1,
        }
    }

    #[test]
    fn test_render_placeholders() {
        let out = render("Context:\n{RESULTS}\nQuestion: {QUERY}", "docs", "why?");
        assert_eq!(out, "Context:\ndocs\nQuestion: why?");
    }

    #[test]
    fn test_render_escaped_braces_and_unknown_tokens() {
        let out = render("{{\"a\": 1}} {OTHER} {QUERY}", "", "q");
        assert_eq!(out, "{\"a\": 1} {OTHER} q");
    }

    #[test]
    fn test_render_does_not_expand_inside_values() {
        let out = render("{RESULTS} / {QUERY}", "{QUERY}", "x");
        assert_eq!(out, "{QUERY} / x");
    }

    #[test]
    fn test_format_context_with_title_and_date() {
        let results = QueryResult {
            hits: vec![
                hit(
                    "The sky is blue.",
                    json!({"title": "Sky", "date": "2024-01-01", "source": "wiki"}),
                ),
                hit("Grass is green.", json!({})),
            ],
        };

        let block = format_context(&results);
        assert_eq!(
            block,
            "[1] Sky (2024-01-01)\nsource: wiki\nThe sky is blue.\n\n[2]\nGrass is green.\n"
        );
    }

    #[test]
    fn test_format_context_non_string_values() {
        let results = QueryResult {
            hits: vec![hit("doc", json!({"page": 3, "draft": false}))],
        };
        let block = format_context(&results);
        assert!(block.contains("page: 3"));
        assert!(block.contains("draft: false"));
    }

    #[test]
    fn test_template_name_rejects_paths() {
        let templates = PromptTemplates::new("/tmp");
        for name in ["../secret", "a/b", "", "x.txt"] {
            assert!(matches!(
                templates.path_for(name),
                Err(SynthesisError::InvalidTemplateName(_))
            ));
        }
        assert!(templates.path_for("basic_rag_prompt").is_ok());
    }

    #[tokio::test]
    async fn test_load_template() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("basic_rag_prompt.txt"), "{QUERY}").unwrap();
        let templates = PromptTemplates::new(dir.path());

        assert_eq!(templates.load("basic_rag_prompt").await.unwrap(), "{QUERY}");
        assert!(matches!(
            templates.load("missing").await,
            Err(SynthesisError::TemplateNotFound(name)) if name == "missing"
        ));
    }
}

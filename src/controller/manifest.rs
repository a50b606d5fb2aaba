//! # Manifest Assembly
//!
//! Concatenates per-app YAML documents into one multi-document manifest.
//!
//! Every contributed document is preceded by exactly one `---` line and the
//! manifest always ends with a newline. Empty documents, and documents that
//! consist only of separators, contribute nothing.

use crate::constants::YAML_SEPARATOR;
use tracing::info;

/// Multi-document manifest built up app by app
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestBuffer {
    content: String,
}

impl ManifestBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the manifest `document` served for `app`
    ///
    /// Returns `false` when the document was empty and the buffer is unchanged.
    pub fn append(&mut self, app: &str, document: &str) -> bool {
        let Some(body) = document_body(document) else {
            info!(app = app, "No manifest found for app {}", app);
            return false;
        };

        self.content.push_str(YAML_SEPARATOR);
        self.content.push('\n');
        self.content.push_str(body);
        if !self.content.ends_with('\n') {
            self.content.push('\n');
        }
        true
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.content
    }

    /// Number of documents in the manifest
    #[must_use]
    pub fn document_count(&self) -> usize {
        self.content
            .lines()
            .filter(|line| is_separator(line))
            .count()
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.content
    }
}

/// Trimmed document without leading or trailing separator lines
fn document_body(document: &str) -> Option<&str> {
    let mut body = trim(document);
    loop {
        let before = body.len();
        if let Some((first, rest)) = body.split_once('\n') {
            if is_separator(first) {
                body = trim(rest);
            }
        } else if is_separator(body) {
            body = "";
        }
        if let Some((rest, last)) = body.rsplit_once('\n') {
            if is_separator(last) {
                body = trim(rest);
            }
        }
        if body.len() == before {
            break;
        }
    }
    (!body.is_empty()).then_some(body)
}

fn trim(text: &str) -> &str {
    text.trim_matches(|c| matches!(c, '\n' | '\r' | '\t' | ' '))
}

fn is_separator(line: &str) -> bool {
    line.trim_end() == YAML_SEPARATOR
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assembled(documents: &[&str]) -> String {
        let mut buffer = ManifestBuffer::new();
        for (i, document) in documents.iter().enumerate() {
            buffer.append(&format!("app-{i}"), document);
        }
        buffer.into_string()
    }

    #[test]
    fn test_empty_documents_are_no_ops() {
        let mut buffer = ManifestBuffer::new();
        buffer.append("first", "kind: ConfigMap");
        let before = buffer.clone();

        for document in ["", "   ", "\n\r\t ", "---", "\n---\n", "  ---  \n", "---\n---"] {
            assert!(!buffer.append("empty", document), "'{document:?}' should contribute nothing");
            assert_eq!(buffer, before, "'{document:?}' should leave the buffer unchanged");
        }
    }

    #[test]
    fn test_single_separator_before_each_document() {
        let manifest = assembled(&["kind: A", "kind: B"]);
        assert_eq!(manifest, "---\nkind: A\n---\nkind: B\n");
    }

    #[test]
    fn test_existing_separator_is_not_duplicated() {
        let manifest = assembled(&["---\nkind: A\n", "---\nkind: B"]);
        assert_eq!(manifest, "---\nkind: A\n---\nkind: B\n");
    }

    #[test]
    fn test_repeated_prefixed_document_never_triples_separators() {
        let manifest = assembled(&["---\nkind: A", "---\nkind: A", "---\n---\nkind: A\n---\n"]);
        assert!(!manifest.contains("---\n---"));
        assert_eq!(manifest, "---\nkind: A\n---\nkind: A\n---\nkind: A\n");
    }

    #[test]
    fn test_internal_separators_are_kept() {
        let manifest = assembled(&["kind: A\n---\nkind: B\n\n"]);
        assert_eq!(manifest, "---\nkind: A\n---\nkind: B\n");

        let mut buffer = ManifestBuffer::new();
        buffer.append("app", "kind: A\n---\nkind: B");
        assert_eq!(buffer.document_count(), 2);
    }

    #[test]
    fn test_always_ends_with_single_newline() {
        let manifest = assembled(&["kind: A\n\n\n"]);
        assert!(manifest.ends_with("kind: A\n"));
        assert!(!manifest.ends_with("\n\n"));
    }

    #[test]
    fn test_crlf_and_whitespace_trimmed() {
        let manifest = assembled(&["\r\n  kind: A\r\n"]);
        assert_eq!(manifest, "---\nkind: A\n");
    }

    #[test]
    fn test_new_buffer_is_empty() {
        let buffer = ManifestBuffer::new();
        assert!(buffer.is_empty());
        assert_eq!(buffer.document_count(), 0);
    }
}

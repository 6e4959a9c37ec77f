//! Running-header removal for extracted page text.
//!
//! Scanned business documents (invoices, statements) repeat a header block on
//! every page. Labels such as `Invoice #:` mark its lines; everything up to a
//! fixed slack past the last label line is dropped.

use serde::Deserialize;
use std::path::Path;

/// Lines skipped after the last label line, covering multi-line header values.
pub const DEFAULT_HEADER_SLACK: usize = 5;

/// A named set of header label prefixes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HeaderTemplate {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub header_labels: Vec<String>,
}

/// On-disk shape of the header templates file.
#[derive(Debug, Deserialize)]
struct HeaderTemplateFile {
    templates: Vec<HeaderTemplate>,
}

impl HeaderTemplate {
    /// Load the first template from a JSON templates file.
    ///
    /// Never fails: a missing file, malformed JSON, or an empty template list
    /// all yield an empty template (cleaning disabled) with a warning.
    pub fn load_first(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    path = %path.display(),
                    "header templates file not found, header cleaning disabled"
                );
                return Self::default();
            }
            Err(error) => {
                tracing::warn!(
                    path = %path.display(),
                    %error,
                    "failed to read header templates file, header cleaning disabled"
                );
                return Self::default();
            }
        };

        Self::parse_first(&content).unwrap_or_else(|reason| {
            tracing::warn!(
                path = %path.display(),
                %reason,
                "malformed header templates file, header cleaning disabled"
            );
            Self::default()
        })
    }

    fn parse_first(content: &str) -> Result<Self, String> {
        let file: HeaderTemplateFile =
            serde_json::from_str(content).map_err(|error| error.to_string())?;
        file.templates
            .into_iter()
            .next()
            .ok_or_else(|| "no templates defined".to_string())
    }
}

/// Strips running headers from every page but the first.
#[derive(Debug, Clone)]
pub struct HeaderCleaner {
    labels: Vec<String>,
    slack: usize,
}

impl HeaderCleaner {
    pub fn new(template: HeaderTemplate) -> Self {
        Self {
            labels: template.header_labels,
            slack: DEFAULT_HEADER_SLACK,
        }
    }

    pub fn with_slack(mut self, slack: usize) -> Self {
        self.slack = slack;
        self
    }

    pub fn is_enabled(&self) -> bool {
        !self.labels.is_empty()
    }

    pub fn clean_page(&self, page_text: &str, is_first_page: bool) -> String {
        clean_page_with_slack(page_text, &self.labels, is_first_page, self.slack)
    }
}

/// Remove the running header from one page using the default slack.
pub fn clean_page(page_text: &str, header_labels: &[String], is_first_page: bool) -> String {
    clean_page_with_slack(page_text, header_labels, is_first_page, DEFAULT_HEADER_SLACK)
}

/// Remove the running header from one page.
///
/// Finds the last line whose trimmed text starts with a label and keeps only
/// lines from `last + slack` onward. Returns the text untouched on the first
/// page, with no labels, or when no line matches.
pub fn clean_page_with_slack(
    page_text: &str,
    header_labels: &[String],
    is_first_page: bool,
    slack: usize,
) -> String {
    if is_first_page || header_labels.is_empty() {
        return page_text.to_string();
    }

    let lines: Vec<&str> = page_text.split('\n').collect();
    let last_label_line = lines.iter().rposition(|line| {
        let trimmed = line.trim();
        header_labels
            .iter()
            .any(|label| trimmed.starts_with(label.as_str()))
    });

    let Some(last_label_line) = last_label_line else {
        return page_text.to_string();
    };

    let content_start = last_label_line.saturating_add(slack);
    if content_start >= lines.len() {
        return String::new();
    }
    lines[content_start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn first_page_is_never_cleaned() {
        let text = "Invoice #: 1\nDate: x\nbody";
        assert_eq!(clean_page(text, &labels(&["Invoice #:"]), true), text);
        assert_eq!(clean_page(text, &[], true), text);
    }

    #[test]
    fn empty_labels_leave_text_untouched() {
        let text = "Invoice #: 1\nbody";
        assert_eq!(clean_page(text, &[], false), text);
    }

    #[test]
    fn content_starts_five_lines_after_label() {
        let text = "Invoice #: 123\nDate: x\nCustomer: y\n\n\nReal content line 1\nReal content line 2";
        let cleaned = clean_page(text, &labels(&["Invoice #:"]), false);
        assert_eq!(cleaned, "Real content line 1\nReal content line 2");
    }

    #[test]
    fn last_matching_label_wins() {
        let text = indoc::indoc! {"
            Invoice #: 1
            Date: x
            Customer: y
            a
            b
            c
            d
            e
            body"};
        let cleaned = clean_page(text, &labels(&["Invoice #:", "Customer:"]), false);
        // Last label at line 2, content from line 7.
        assert_eq!(cleaned, "e\nbody");
    }

    #[test]
    fn labels_match_after_trimming() {
        let text = "   Invoice #: 9\n1\n2\n3\n4\nkept";
        assert_eq!(clean_page(text, &labels(&["Invoice #:"]), false), "kept");
    }

    #[test]
    fn no_match_returns_original() {
        let text = "nothing here\nstill nothing";
        assert_eq!(clean_page(text, &labels(&["Invoice #:"]), false), text);
    }

    #[test]
    fn slack_past_end_yields_empty() {
        let text = "line\nInvoice #: 1\nx";
        assert_eq!(clean_page(text, &labels(&["Invoice #:"]), false), "");
    }

    #[test]
    fn custom_slack_is_honoured() {
        let cleaner = HeaderCleaner::new(HeaderTemplate {
            name: "invoice".into(),
            header_labels: labels(&["Invoice #:"]),
        })
        .with_slack(1);
        assert_eq!(cleaner.clean_page("Invoice #: 1\nbody", false), "body");
    }

    #[test]
    fn load_first_template() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("header_templates.json");
        std::fs::write(
            &path,
            r#"{"templates": [
                {"name": "invoice", "header_labels": ["Invoice #:", "Date:"]},
                {"name": "other", "header_labels": ["Ignored"]}
            ]}"#,
        )
        .unwrap();

        let template = HeaderTemplate::load_first(&path);
        assert_eq!(template.name, "invoice");
        assert_eq!(template.header_labels, labels(&["Invoice #:", "Date:"]));
    }

    #[test]
    fn missing_or_malformed_templates_degrade_to_empty() {
        let temp = tempfile::tempdir().expect("tempdir");
        let missing = HeaderTemplate::load_first(&temp.path().join("absent.json"));
        assert!(missing.header_labels.is_empty());

        let broken = temp.path().join("broken.json");
        std::fs::write(&broken, "{not json").unwrap();
        assert!(HeaderTemplate::load_first(&broken).header_labels.is_empty());

        let empty = temp.path().join("empty.json");
        std::fs::write(&empty, r#"{"templates": []}"#).unwrap();
        assert!(HeaderTemplate::load_first(&empty).header_labels.is_empty());

        let wrong_shape = temp.path().join("wrong.json");
        std::fs::write(&wrong_shape, r#"{"labels": ["x"]}"#).unwrap();
        assert!(HeaderTemplate::load_first(&wrong_shape).header_labels.is_empty());
    }
}

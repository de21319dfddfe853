//! Heuristic scan for suspicious PDF constructs. Substring triage over the
//! raw object graph plus link extraction from page text — advisory only.

use std::path::Path;
use std::sync::OnceLock;

use lopdf::Document;
use regex::Regex;
use tracing::info_span;

use crate::error::ServiceError;

use super::text::extract_text;
use super::ScanReport;

const SCRIPT_MARKERS: &[&str] = &["/JavaScript", "/JS"];
const ACTION_MARKERS: &[&str] = &["/OpenAction", "/AA", "/Launch", "/SubmitForm"];
const EMBEDDED_FILE_MARKERS: &[&str] = &["/EmbeddedFile", "/Filespec", "/RichMedia"];

pub fn scan_heuristics(input: &Path) -> Result<ScanReport, ServiceError> {
    let _span = info_span!("service.scan").entered();

    let bytes = std::fs::read(input).map_err(|e| ServiceError::Io {
        path: input.to_path_buf(),
        source: e,
    })?;
    let doc = Document::load_mem(&bytes)
        .map_err(|e| ServiceError::UnsupportedInput(format!("failed to parse PDF: {}", e)))?;

    let raw = String::from_utf8_lossy(&bytes);
    Ok(scan_content(&raw, &extract_text(&doc)))
}

/// Pure scan over the raw file text and the extracted page text.
pub(crate) fn scan_content(raw: &str, page_text: &str) -> ScanReport {
    let present = |markers: &[&str]| {
        markers
            .iter()
            .filter(|marker| contains_name(raw, marker))
            .map(|marker| marker.to_string())
            .collect::<Vec<_>>()
    };

    ScanReport {
        script_markers: present(SCRIPT_MARKERS),
        action_markers: present(ACTION_MARKERS),
        embedded_file_markers: present(EMBEDDED_FILE_MARKERS),
        links: extract_links(raw, page_text),
    }
}

/// Name-object match: the marker must not continue with another name
/// character, so `/JS` does not also fire on `/JavaScript`.
fn contains_name(haystack: &str, name: &str) -> bool {
    let mut start = 0;
    while let Some(pos) = haystack[start..].find(name) {
        let end = start + pos + name.len();
        match haystack[end..].chars().next() {
            Some(c) if c.is_ascii_alphanumeric() => start = start + pos + 1,
            _ => return true,
        }
    }
    false
}

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"https?://[^\s<>()\[\]"']+"#).expect("url pattern compiles")
    })
}

fn uri_action_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/URI\s*\(([^)]*)\)").expect("uri pattern compiles"))
}

fn extract_links(raw: &str, page_text: &str) -> Vec<String> {
    let mut links = Vec::new();
    let mut push = |link: String| {
        if !links.contains(&link) {
            links.push(link);
        }
    };

    for caps in uri_action_regex().captures_iter(raw) {
        let uri = caps[1].trim();
        if !uri.is_empty() {
            push(uri.to_string());
        }
    }
    for m in url_regex().find_iter(page_text) {
        push(m.as_str().trim_end_matches(['.', ',', ';']).to_string());
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    use crate::testpdf::{self, PageSpec};

    fn scan_bytes(pdf: &[u8]) -> ScanReport {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in.pdf");
        std::fs::write(&input, pdf).unwrap();
        scan_heuristics(&input).unwrap()
    }

    #[test]
    fn test_plain_document_is_clean() {
        let pdf = testpdf::pdf_with_pages(&["Just an ordinary report"]);
        let report = scan_bytes(&pdf);
        assert!(report.is_clean());
    }

    #[test]
    fn test_javascript_open_action_detected() {
        let pdf = testpdf::build_pdf(
            &[PageSpec::text_only("Page body")],
            None,
            Some("app.alert('hi')"),
        );

        let report = scan_bytes(&pdf);

        assert!(!report.is_clean());
        assert!(report.script_markers.contains(&"/JavaScript".to_string()));
        assert!(report.script_markers.contains(&"/JS".to_string()));
        assert!(report.action_markers.contains(&"/OpenAction".to_string()));
        assert!(report.embedded_file_markers.is_empty());
    }

    #[test]
    fn test_links_extracted_from_page_text() {
        let pdf = testpdf::pdf_with_pages(&[
            "Visit https://example.com/docs for details.",
            "Mirror at http://mirror.example.org.",
        ]);

        let report = scan_bytes(&pdf);

        assert_eq!(
            report.links,
            vec![
                "https://example.com/docs".to_string(),
                "http://mirror.example.org".to_string(),
            ]
        );
    }

    #[test]
    fn test_contains_name_requires_boundary() {
        assert!(contains_name("<< /JavaScript (x) >>", "/JavaScript"));
        assert!(!contains_name("<< /JavaScript (x) >>", "/JS"));
        assert!(contains_name("<< /JS (x) >>", "/JS"));
        assert!(!contains_name("no markers at all", "/JS"));
    }

    #[test]
    fn test_scan_content_uri_actions_and_dedup() {
        let raw = "<< /A << /S /URI /URI (https://evil.example/a) >> >> /URI (https://evil.example/a)";
        let report = scan_content(raw, "see https://evil.example/a and https://ok.example/b");

        assert_eq!(
            report.links,
            vec![
                "https://evil.example/a".to_string(),
                "https://ok.example/b".to_string(),
            ]
        );
    }
}

//! Advisory checks on the entry document
//!
//! Findings are reported, never enforced: the pipeline only guarantees
//! structural safety of the archive, not the behavior of its scripts.

use regex::Regex;
use std::sync::LazyLock;

static INLINE_HANDLER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<[^>]+\son[a-z]+\s*=\s*["']?"#).expect("Invalid inline handler pattern")
});

static EVAL_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\beval\s*\(").expect("Invalid eval pattern"));

/// Inspect HTML source and return one message per finding
#[must_use]
pub fn advisory_findings(source: &str) -> Vec<String> {
    let lower = source.to_ascii_lowercase();
    let mut findings = Vec::new();

    if !lower.contains("<html") && !lower.contains("<body") {
        findings.push("entry document has no <html> or <body> element".to_string());
    }
    if lower.contains("document.write") {
        findings.push("entry document uses document.write".to_string());
    }
    if EVAL_CALL.is_match(&lower) {
        findings.push("entry document calls eval()".to_string());
    }
    if lower.contains("javascript:") {
        findings.push("entry document contains javascript: URLs".to_string());
    }
    if INLINE_HANDLER.is_match(source) {
        findings.push("entry document uses inline event handlers (on*=)".to_string());
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patterns_compile() {
        assert!(INLINE_HANDLER.is_match("<button ONCLICK='go()'>"));
        assert!(!INLINE_HANDLER.is_match("<button class=\"online\">"));
        assert!(EVAL_CALL.is_match("eval(x)"));
    }

    #[test]
    fn clean_document_has_no_findings() {
        let html = "<!doctype html><html><body><h1>Hi</h1><script src=\"app.js\"></script></body></html>";
        assert!(advisory_findings(html).is_empty());
    }

    #[test]
    fn fragment_without_root_element() {
        let findings = advisory_findings("<div>just a fragment</div>");
        assert_eq!(findings.len(), 1);
        assert!(findings[0].contains("<html>"));
    }

    #[test]
    fn risky_constructs_are_reported() {
        let html = r#"<html><body onload="init()">
            <a href="javascript:void(0)">x</a>
            <script>document.write("hi"); eval ("1+1");</script>
        </body></html>"#;
        let findings = advisory_findings(html);
        assert_eq!(findings.len(), 4);
        assert!(findings.iter().any(|f| f.contains("document.write")));
        assert!(findings.iter().any(|f| f.contains("eval")));
        assert!(findings.iter().any(|f| f.contains("javascript:")));
        assert!(findings.iter().any(|f| f.contains("inline event handlers")));
    }

    #[test]
    fn words_containing_eval_are_not_flagged() {
        let html = "<html><body><script>retrieval(1); medieval ();</script></body></html>";
        assert!(advisory_findings(html).is_empty());
    }
}

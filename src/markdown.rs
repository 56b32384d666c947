//! Markdown rendering of a pipeline result for the terminal.

use std::fmt::Write;

use crate::answer::TranslationStatus;
use crate::pipeline::{PipelineRequest, PipelineResult};

const THIN_SOURCING_NOTICE: &str = "No official sources could be retrieved for this query. \
     The answer above is not backed by any fetched document; verify it with the relevant authority.";

/// Answer, sources (or a notice when there are none) and timing.
pub fn render_result(request: &PipelineRequest, result: &PipelineResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "# {} ({})\n",
        sanitize_heading(&request.query),
        sanitize_heading(&request.country)
    );
    let _ = writeln!(out, "{}\n", result.answer.trim());

    if result.translation == TranslationStatus::Failed {
        let _ = writeln!(
            out,
            "_Translation to {} failed; showing the English answer._\n",
            request.target_language
        );
    }

    if result.documents.is_empty() {
        let _ = writeln!(out, "> {THIN_SOURCING_NOTICE}\n");
    } else {
        out.push_str("## Sources\n\n");
        for (i, doc) in result.documents.iter().enumerate() {
            let _ = writeln!(
                out,
                "{}. [{}]({}) ({})",
                i + 1,
                escape_md_link(&doc.title),
                escape_md_link(&doc.url),
                doc.kind
            );
        }
        out.push('\n');
    }

    let _ = write!(out, "_Processed in {}._", result.elapsed_display());
    out
}

/// Escape characters that break Markdown link syntax: `[`, `]`, `(`, `)`.
pub(crate) fn escape_md_link(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '[' | ']' | '(' | ')' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Replaces newlines, which would end the heading early.
pub(crate) fn sanitize_heading(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer::AnswerSource;
    use crate::fetch::{DocumentKind, FetchedDocument};
    use crate::language::Language;
    use std::time::Duration;

    fn request() -> PipelineRequest {
        PipelineRequest {
            query: "renew\npassport".into(),
            country: "Pakistan".into(),
            target_language: Language::Urdu,
        }
    }

    fn result(documents: Vec<FetchedDocument>) -> PipelineResult {
        PipelineResult {
            answer: "Bring your CNIC.\n".into(),
            documents,
            elapsed: Duration::from_millis(4_260),
            answer_source: AnswerSource::Model,
            translation: TranslationStatus::Translated,
            stages: vec![],
        }
    }

    #[test]
    fn escapes_special_chars() {
        assert_eq!(escape_md_link("normal text"), "normal text");
        assert_eq!(escape_md_link("a[b]c(d)e"), r"a\[b\]c\(d\)e");
    }

    #[test]
    fn sanitize_heading_replaces_newlines() {
        assert_eq!(sanitize_heading("line1\nline2\rline3"), "line1 line2 line3");
        assert_eq!(sanitize_heading("no newlines"), "no newlines");
    }

    #[test]
    fn lists_sources_with_kind() {
        let doc = FetchedDocument {
            url: "https://dgip.gov.pk/form.pdf".into(),
            title: "Form [A]".into(),
            content: "text".into(),
            kind: DocumentKind::Pdf,
        };

        let out = render_result(&request(), &result(vec![doc]));

        assert!(out.starts_with("# renew passport (Pakistan)\n"));
        assert!(out.contains("Bring your CNIC.\n"));
        assert!(out.contains("## Sources"));
        assert!(out.contains(r"1. [Form \[A\]](https://dgip.gov.pk/form.pdf) (pdf)"));
        assert!(!out.contains(THIN_SOURCING_NOTICE));
        assert!(out.ends_with("_Processed in 4.3 seconds._"));
    }

    #[test]
    fn empty_documents_show_notice() {
        let out = render_result(&request(), &result(vec![]));
        assert!(out.contains(THIN_SOURCING_NOTICE));
        assert!(!out.contains("## Sources"));
    }

    #[test]
    fn failed_translation_is_flagged() {
        let mut failed = result(vec![]);
        failed.translation = TranslationStatus::Failed;
        let out = render_result(&request(), &failed);
        assert!(out.contains("Translation to Urdu failed"));
    }
}

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::docx::{self, DocParagraph, DocRun};
use crate::page::{meta, regions, Page};
use crate::settings::Settings;

static PARAGRAPH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)<p\b([^>]*)>(.*?)</p>"#).unwrap());
/// Inline pieces of a paragraph: emphasis, highlighted spans, any other tag.
static INLINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<em>(.*?)</em>|<span class="text_obisnuit2">(.*?)</span>|<[^>]+>"#).unwrap()
});
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

const TITLE_COLOR: &str = "FF0000";
const ID_COLOR: &str = "808080";
const ID_SIZE_HALF_POINTS: u32 = 16;

fn decoded(html: &str) -> String {
    let text = TAG_RE.replace_all(html, "");
    html_escape::decode_html_entities(&text).into_owned()
}

fn push_run(runs: &mut Vec<DocRun>, text: String, bold: bool, italic: bool) {
    if text.is_empty() {
        return;
    }
    runs.push(DocRun {
        text,
        bold,
        italic,
        ..Default::default()
    });
}

/// Runs of one article paragraph. A `text_obisnuit2` paragraph is bold throughout.
pub fn paragraph_runs(inner: &str, highlighted: bool) -> Vec<DocRun> {
    let mut runs = Vec::new();
    let mut last = 0;
    for caps in INLINE_RE.captures_iter(inner) {
        let Some(whole) = caps.get(0) else { continue };
        push_run(&mut runs, decoded(&inner[last..whole.start()]), highlighted, false);
        if let Some(em) = caps.get(1) {
            push_run(&mut runs, decoded(em.as_str()), highlighted, true);
        } else if let Some(span) = caps.get(2) {
            push_run(&mut runs, decoded(span.as_str()), true, false);
        }
        last = whole.end();
    }
    push_run(&mut runs, decoded(&inner[last..]), highlighted, false);
    runs
}

/// Title, ID line, article paragraphs and a trailing blank paragraph for one page.
pub fn page_paragraphs(page: &Page) -> Vec<DocParagraph> {
    let title = meta::title(&page.content).unwrap_or_else(|| page.stem().to_string());
    let id = page
        .item_id()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "N/A".to_string());

    let mut out = vec![
        DocParagraph::centered(vec![DocRun {
            text: title,
            bold: true,
            color: Some(TITLE_COLOR.to_string()),
            ..Default::default()
        }]),
        DocParagraph::centered(vec![DocRun {
            text: format!("ID: {}", id),
            color: Some(ID_COLOR.to_string()),
            size_half_points: Some(ID_SIZE_HALF_POINTS),
            ..Default::default()
        }]),
    ];

    match regions::article_body(&page.content) {
        Some(body) => {
            for caps in PARAGRAPH_RE.captures_iter(body) {
                let highlighted = caps[1].contains("text_obisnuit2");
                out.push(DocParagraph::new(paragraph_runs(&caps[2], highlighted)));
            }
        }
        None => {
            warn!("{}: article markers not found", page.file_name);
            out.push(DocParagraph::new(vec![DocRun::plain(format!(
                "ERROR: article markers not found in {}",
                page.file_name
            ))]));
        }
    }
    out.push(DocParagraph::default());
    out
}

#[derive(Debug, Default)]
pub struct ExportReport {
    pub exported: Vec<String>,
    pub missing: Vec<String>,
    pub paragraphs: usize,
    pub out: PathBuf,
}

impl ExportReport {
    pub fn print(&self) {
        println!("Exported:            {}", self.exported.len());
        println!("Missing:             {}", self.missing.len());
        for name in &self.missing {
            println!("  {}", name);
        }
        println!("Paragraphs written:  {}", self.paragraphs);
        println!("Document:            {}", self.out.display());
    }
}

/// Collect the listed RO articles into one Word document for translation.
pub fn run(settings: &Settings, files: &[String], out: &Path) -> Result<ExportReport> {
    let mut report = ExportReport {
        out: out.to_path_buf(),
        ..Default::default()
    };
    let mut paragraphs = Vec::new();
    for name in files {
        let path = settings.ro_dir.join(name);
        if !path.is_file() {
            warn!("{} not found in {}", name, settings.ro_dir.display());
            report.missing.push(name.clone());
            continue;
        }
        let page = Page::load(&path)?;
        let added = page_paragraphs(&page);
        debug!(file = %name, paragraphs = added.len(), "exported");
        paragraphs.extend(added);
        report.exported.push(name.clone());
    }

    report.paragraphs = paragraphs.len();
    docx::write_document(out, &paragraphs)
        .with_context(|| format!("Failed to write {}", out.display()))?;
    info!("Wrote {}", out.display());
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::fixtures;

    #[test]
    fn inline_formatting_becomes_runs() {
        let runs = paragraph_runs(
            r#"<span class="text_obisnuit2">Important:</span> al doilea, cu <em>accent</em> &amp; <a href="x">link</a>."#,
            false,
        );
        let texts: Vec<(&str, bool, bool)> = runs
            .iter()
            .map(|r| (r.text.as_str(), r.bold, r.italic))
            .collect();
        assert_eq!(
            texts,
            vec![
                ("Important:", true, false),
                (" al doilea, cu ", false, false),
                ("accent", false, true),
                (" & ", false, false),
                ("link", false, false),
                (".", false, false),
            ]
        );
    }

    #[test]
    fn page_becomes_title_id_and_body() {
        let dir = tempfile::tempdir().unwrap();
        fixtures::write(dir.path(), "memoria-timpului.html", fixtures::RO_ARTICLE);
        let page = Page::load(&dir.path().join("memoria-timpului.html")).unwrap();
        let paras = page_paragraphs(&page);

        assert!(paras[0].centered);
        assert_eq!(paras[0].text(), "Memoria timpului");
        assert_eq!(paras[0].runs[0].color.as_deref(), Some("FF0000"));
        assert_eq!(paras[1].text(), "ID: 346");
        assert_eq!(paras[1].runs[0].size_half_points, Some(16));

        // the quote paragraph is bold and italic
        let quote = &paras[2].runs[0];
        assert_eq!(quote.text, "Timpul nu iartă, dar memoria îl îmblânzește.");
        assert!(quote.bold && quote.italic);
        assert_eq!(paras.last(), Some(&DocParagraph::default()));
    }

    #[test]
    fn exports_and_reports_missing() {
        let ro = tempfile::tempdir().unwrap();
        fixtures::write(ro.path(), "memoria-timpului.html", fixtures::RO_ARTICLE);
        fixtures::write(ro.path(), "fara-markeri.html", "<h1 class=\"den_articol\">Fara</h1>");
        let settings = Settings {
            ro_dir: ro.path().to_path_buf(),
            ..Settings::default()
        };
        let out = ro.path().join("bebe.docx");
        let files = vec![
            "memoria-timpului.html".to_string(),
            "lipsa.html".to_string(),
            "fara-markeri.html".to_string(),
        ];
        let report = run(&settings, &files, &out).unwrap();
        assert_eq!(report.exported.len(), 2);
        assert_eq!(report.missing, vec!["lipsa.html"]);

        let back = docx::read_paragraphs(&out).unwrap();
        assert_eq!(back.len(), report.paragraphs);
        assert!(back
            .iter()
            .any(|p| p.text() == "ERROR: article markers not found in fara-markeri.html"));
        let articles = docx::split_articles(&back);
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].id.as_deref(), Some("346"));
    }
}

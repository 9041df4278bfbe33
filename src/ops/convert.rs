use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::dates;
use crate::docx::{self, DocArticle, DocParagraph, DocRun};
use crate::fsio;
use crate::page::meta;
use crate::page::regions::{self, ARTICLE_END, ARTICLE_START, BODY_END, BODY_START};
use crate::settings::Settings;
use crate::slug;

const ID_NOTE: &str = "ID-ul din fisierul limba romana";
const PLACEHOLDER_FILE: &str = "zzz.html";

static URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://[^\s<]+").unwrap());
static NUMBERED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^(\d+\.\s+)(.*)$").unwrap());
static EMPTY_PARAGRAPH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<p class="text_obisnuit"></p>\s*"#).unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static SPACES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Markup cleanups applied last, in order.
static CLEANUPS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (
            r#"<p class="text_obisnuit"><strong><em>(.*?)</em></strong></p>"#,
            r#"<p class="text_obisnuit2"><em>${1}</em></p>"#,
        ),
        (
            r#"<p class="text_obisnuit"><strong>(.*?)</strong></p>"#,
            r#"<p class="text_obisnuit2">${1}</p>"#,
        ),
        (
            r#"<p class="text_obisnuit"><strong>(.*?)</strong>(.*?)</p>"#,
            r#"<p class="text_obisnuit"><span class="text_obisnuit2">${1}</span>${2}</p>"#,
        ),
        (
            r#"(<p class="text_obisnuit"><span class="text_obisnuit2">\* Note:)"#,
            "<br><br>\n${1}",
        ),
        (r"<e</p>", "</p>"),
        (r"</span></p>", "</p>"),
        (r"<em></em>", ""),
        (r"</strong>\s*<strong>", ""),
        (r"</?strong>", ""),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).unwrap(), replacement))
    .collect()
});

fn run_html(run: &DocRun) -> String {
    let text = html_escape::encode_text(&run.text);
    match (run.bold, run.italic) {
        (true, true) => format!("<strong><em>{}</em></strong>", text),
        (true, false) => format!("<strong>{}</strong>", text),
        (false, true) => format!("<em>{}</em>", text),
        (false, false) => text.into_owned(),
    }
}

pub fn linkify(html: &str) -> String {
    URL_RE
        .replace_all(html, r#"<a href="${0}">${0}</a>"#)
        .into_owned()
}

/// Inline HTML of one document paragraph.
pub fn paragraph_html(para: &DocParagraph) -> String {
    let inline: String = para
        .runs
        .iter()
        .filter(|r| !r.text.is_empty())
        .map(run_html)
        .collect();
    linkify(&inline)
}

/// Body paragraphs as site paragraphs: italic-only ones are quotes, `N. ` ones get a
/// bold number.
pub fn format_body(paragraphs: &[String]) -> String {
    let mut out = String::new();
    for p in paragraphs.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
        if p.starts_with("<em>") && p.ends_with("</em>") {
            out.push_str(&format!("<p class=\"text_obisnuit2\">{}</p>\n", p));
        } else if let Some(caps) = NUMBERED_RE.captures(p) {
            out.push_str(&format!(
                "<p class=\"text_obisnuit\"><span class=\"text_obisnuit2\"><strong>{}</strong></span>{}</p>\n",
                &caps[1], &caps[2]
            ));
        } else {
            out.push_str(&format!("<p class=\"text_obisnuit\">{}</p>\n", p));
        }
    }
    out
}

/// Bold runs of the body, stripped of markup, quotes and asterisks.
fn bold_text(body: &[DocParagraph]) -> String {
    let joined = body
        .iter()
        .flat_map(|p| p.runs.iter())
        .filter(|r| r.bold)
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let stripped = TAG_RE.replace_all(&joined, "").replace(['"', '*', '<', '>'], "");
    SPACES_RE.replace_all(stripped.trim(), " ").into_owned()
}

fn without_empty_paragraphs(content: &str) -> String {
    match regions::inner_range(content, ARTICLE_START, ARTICLE_END) {
        Some(range) => {
            let cleaned = EMPTY_PARAGRAPH_RE.replace_all(&content[range.clone()], "");
            regions::replace_range(content, range, &cleaned)
        }
        None => content.to_string(),
    }
}

fn final_cleanups(content: &str) -> String {
    CLEANUPS
        .iter()
        .fold(content.to_string(), |acc, (re, replacement)| {
            re.replace_all(&acc, *replacement).into_owned()
        })
}

/// Fill `template` with one translated article.
pub fn render_article(
    template: &str,
    article: &DocArticle,
    date: NaiveDate,
    settings: &Settings,
) -> (String, String) {
    let file_name = slug::file_name_for(&article.title);
    let mut html = template.to_string();

    if let Some(id) = &article.id {
        html = regions::ensure_item_id(&html, id, ID_NOTE);
    }
    let heading = slug::title_case(&article.title);
    let head = format!(
        "{} | {} (en)",
        slug::title_case(&slug::transliterate(&article.title)),
        settings.author
    );
    html = meta::set_title(
        &html,
        &html_escape::encode_text(&head),
        &html_escape::encode_text(&heading),
    );
    html = html.replace(PLACEHOLDER_FILE, &file_name);

    let bold = bold_text(&article.body);
    if !bold.is_empty() {
        html = meta::set_meta_description(&html, &html_escape::encode_text(&bold));
    }

    let paragraphs: Vec<String> = article.body.iter().map(paragraph_html).collect();
    let body = format_body(&paragraphs);
    if let Some(range) = regions::inner_range(&html, BODY_START, BODY_END) {
        html = regions::replace_range(&html, range, &format!("\n{}\n", body.trim_end()));
    } else {
        warn!("Template has no {} region", BODY_START);
    }
    html = meta::set_byline_date(&html, &dates::byline_date(date));

    html = html.replace("NBSP", " ").replace('\u{a0}', " ").replace("&nbsp;", " ");

    if let Some(description) = meta::description_from_quotes(&html) {
        html = meta::set_meta_description(&html, &description);
    }
    html = without_empty_paragraphs(&html);
    (file_name, final_cleanups(&html))
}

#[derive(Debug, Default)]
pub struct ConvertReport {
    pub written: Vec<(String, Option<String>)>,
    pub empty: Vec<String>,
    pub out_dir: PathBuf,
}

impl ConvertReport {
    pub fn print(&self) {
        println!("Articles written:    {}", self.written.len());
        for (name, id) in &self.written {
            println!("  {} (ID {})", name, id.as_deref().unwrap_or("none"));
        }
        for title in &self.empty {
            println!("  skipped, empty body: {}", title);
        }
        println!("Output folder:       {}", self.out_dir.display());
    }
}

/// Turn every article of a translation document into an HTML page.
pub fn run(
    settings: &Settings,
    docx_path: &Path,
    template: &Path,
    out_dir: &Path,
    date: NaiveDate,
    dry_run: bool,
) -> Result<ConvertReport> {
    let paragraphs = docx::read_paragraphs(docx_path)
        .with_context(|| format!("Failed to read {}", docx_path.display()))?;
    let template = fsio::read_html(template)
        .with_context(|| format!("Failed to read template {}", template.display()))?
        .0;
    let articles = docx::split_articles(&paragraphs);
    info!("{} articles in {}", articles.len(), docx_path.display());

    if !dry_run {
        fs::create_dir_all(out_dir)
            .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    }

    let mut report = ConvertReport {
        out_dir: out_dir.to_path_buf(),
        ..Default::default()
    };
    for article in &articles {
        if article.body.is_empty() {
            warn!("Empty body for '{}', skipped", article.title);
            report.empty.push(article.title.clone());
            continue;
        }
        let (file_name, html) = render_article(&template, article, date, settings);
        debug!(file = %file_name, id = ?article.id, "article rendered");
        if !dry_run {
            fsio::write_html(&out_dir.join(&file_name), &html)?;
        }
        report.written.push((file_name, article.id.clone()));
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{fixtures, flags};

    fn run_of(text: &str, bold: bool, italic: bool) -> DocRun {
        DocRun {
            text: text.into(),
            bold,
            italic,
            ..Default::default()
        }
    }

    #[test]
    fn formats_runs_and_links() {
        let para = DocParagraph::new(vec![
            run_of("See ", false, false),
            run_of("this", true, true),
            run_of(" at https://example.com/a?b=1 now & ", false, false),
            run_of("", true, false),
        ]);
        assert_eq!(
            paragraph_html(&para),
            "See <strong><em>this</em></strong> at <a href=\"https://example.com/a?b=1\">https://example.com/a?b=1</a> now &amp; "
        );
    }

    #[test]
    fn body_paragraph_kinds() {
        let body = format_body(&[
            "<em>A quote.</em>".to_string(),
            "2. Second point".to_string(),
            "  ".to_string(),
            "Plain text.".to_string(),
        ]);
        assert_eq!(
            body,
            "<p class=\"text_obisnuit2\"><em>A quote.</em></p>\n\
<p class=\"text_obisnuit\"><span class=\"text_obisnuit2\"><strong>2. </strong></span>Second point</p>\n\
<p class=\"text_obisnuit\">Plain text.</p>\n"
        );
    }

    #[test]
    fn cleanups_promote_bold_paragraphs() {
        let html = "<p class=\"text_obisnuit\"><strong>Key idea.</strong></p>\n\
<p class=\"text_obisnuit\"><strong><em>Bold quote</em></strong></p>\n\
<p class=\"text_obisnuit\"><strong>Lead:</strong> rest</p>\n\
<p class=\"text_obisnuit\"><strong>* Note:</strong> see above</p>";
        assert_eq!(
            final_cleanups(html),
            "<p class=\"text_obisnuit2\">Key idea.</p>\n\
<p class=\"text_obisnuit2\"><em>Bold quote</em></p>\n\
<p class=\"text_obisnuit\"><span class=\"text_obisnuit2\">Lead:</span> rest</p>\n\
<br><br>\n<p class=\"text_obisnuit\"><span class=\"text_obisnuit2\">* Note:</span> see above</p>"
        );
    }

    fn article() -> DocArticle {
        DocArticle {
            title: "The memory of țime".into(),
            id: Some("346".into()),
            body: vec![
                DocParagraph::new(vec![run_of("Time does not forgive.", false, true)]),
                DocParagraph::new(vec![run_of("1. ", true, false), run_of("First\u{a0}point.", false, false)]),
                DocParagraph::new(vec![run_of("2. Second point", false, false)]),
                DocParagraph::new(vec![run_of("Key idea.", true, false)]),
            ],
        }
    }

    #[test]
    fn renders_a_full_page() {
        let date = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let (name, html) = render_article(fixtures::TEMPLATE, &article(), date, &Settings::default());

        assert_eq!(name, "the-memory-of-time.html");
        assert!(html.starts_with("<!-- $item_id = 346; // ID-ul din fisierul limba romana -->\n<!DOCTYPE html>"));
        assert!(html.contains("<title>The Memory Of Time | Neculai Fantanaru (en)</title>"));
        assert_eq!(meta::title(&html).as_deref(), Some("The Memory Of Țime"));
        assert_eq!(
            meta::canonical(&html).as_deref(),
            Some("https://neculaifantanaru.com/en/the-memory-of-time.html")
        );
        let links = flags::flag_links(&html, "https://neculaifantanaru.com").unwrap();
        assert_eq!(links.en.as_deref(), Some("the-memory-of-time.html"));
        assert_eq!(meta::byline_date(&html).as_deref(), Some("June 01, 2026"));
        assert_eq!(meta::meta_description(&html).as_deref(), Some("Time does not forgive."));

        assert!(html.contains("<!-- SASA-1 -->\n<p class=\"text_obisnuit2\"><em>Time does not forgive.</em></p>\n"));
        assert!(html.contains("<p class=\"text_obisnuit\"><span class=\"text_obisnuit2\">1. </span>First point.</p>"));
        assert!(html.contains("<p class=\"text_obisnuit\"><span class=\"text_obisnuit2\">2. </span>Second point</p>"));
        assert!(html.contains("<p class=\"text_obisnuit2\">Key idea.</p>\n<!-- SASA-2 -->"));
        assert!(!html.contains("Placeholder paragraph"));
        assert!(!html.contains("<p class=\"text_obisnuit\"></p>"));
        assert!(!html.contains("<strong>"));
        // the footer outside the article survives
        assert!(html.contains("Latest articles accessed by readers:"));
    }

    #[test]
    fn escapes_the_title() {
        let mut a = article();
        a.title = "Cats & dogs".into();
        let date = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let (name, html) = render_article(fixtures::TEMPLATE, &a, date, &Settings::default());

        assert_eq!(name, "cats-dogs.html");
        assert!(html.contains("<title>Cats &amp; Dogs | Neculai Fantanaru (en)</title>"));
        assert!(html.contains(">Cats &amp; Dogs</h1>"));
        assert_eq!(meta::title(&html).as_deref(), Some("Cats & Dogs"));
    }

    #[test]
    fn converts_a_document() {
        let dir = tempfile::tempdir().unwrap();
        let docx_path = dir.path().join("bebe.docx");
        let template = dir.path().join("index.html");
        fixtures::write(dir.path(), "index.html", fixtures::TEMPLATE);

        let a = article();
        let mut doc = vec![
            DocParagraph::centered(vec![DocRun::plain(a.title.clone())]),
            DocParagraph::centered(vec![DocRun::plain("ID: 346")]),
        ];
        doc.extend(a.body.clone());
        doc.push(DocParagraph::centered(vec![DocRun::plain("Empty one")]));
        docx::write_document(&docx_path, &doc).unwrap();

        let out = dir.path().join("output");
        let date = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let report = run(&Settings::default(), &docx_path, &template, &out, date, false).unwrap();
        assert_eq!(report.written, vec![("the-memory-of-time.html".to_string(), Some("346".to_string()))]);
        assert_eq!(report.empty, vec!["Empty one"]);
        assert!(out.join("the-memory-of-time.html").is_file());
    }
}

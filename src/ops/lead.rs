use std::path::Path;
use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use tracing::debug;

use crate::fsio;
use crate::page;

static H3_LEAD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)<div itemprop="articleBody">\s*<!--\s*SASA-1\s*-->\s*<h3 class="text_obisnuit2">(.*?)</h3>"#,
    )
    .unwrap()
});
static UNMARKED_H2_LEAD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<div itemprop="articleBody">\s*<h2 class="text_obisnuit2"><em>(.*?)</em></h2>"#)
        .unwrap()
});

const LEAD_REPLACEMENT: &str = "<div itemprop=\"articleBody\">\n\n<!-- SASA-1 -->\n        <h2 class=\"text_obisnuit2\"><em>${1}</em></h2>";

/// `h3` leads become emphasized `h2` leads, and an `h2` lead missing its
/// `SASA-1` marker gets one. Returns the text and both replacement counts.
pub fn normalize_lead(content: &str) -> (String, usize, usize) {
    let h3 = H3_LEAD_RE.find_iter(content).count();
    let content = H3_LEAD_RE.replace_all(content, LEAD_REPLACEMENT);
    let unmarked = UNMARKED_H2_LEAD_RE.find_iter(&content).count();
    let content = UNMARKED_H2_LEAD_RE.replace_all(&content, LEAD_REPLACEMENT);
    (content.into_owned(), h3, unmarked)
}

#[derive(Debug, Default)]
pub struct LeadReport {
    pub files: usize,
    pub changed: Vec<String>,
    pub h3_replaced: usize,
    pub markers_added: usize,
}

impl LeadReport {
    pub fn print(&self) {
        println!("Files scanned:       {}", self.files);
        println!("Files changed:       {}", self.changed.len());
        println!("h3 leads replaced:   {}", self.h3_replaced);
        println!("SASA-1 added:        {}", self.markers_added);
    }
}

/// Normalize the lead of every HTML file under `dir`, recursively.
pub fn run(dir: &Path, dry_run: bool) -> Result<LeadReport> {
    let paths = fsio::walk_html(dir)?;
    let mut pages = page::load_all(&paths, &fsio::file_name(dir))?;
    let mut report = LeadReport {
        files: pages.len(),
        ..Default::default()
    };
    for page in pages.iter_mut() {
        let (updated, h3, unmarked) = normalize_lead(&page.content);
        if h3 + unmarked == 0 {
            debug!(file = %page.file_name, "no lead to normalize");
            continue;
        }
        page.save(updated, dry_run)?;
        report.changed.push(page.file_name.clone());
        report.h3_replaced += h3;
        report.markers_added += unmarked;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::fixtures;

    const H3_LEAD: &str = "<div itemprop=\"articleBody\">\n<!-- SASA-1 -->\n<h3 class=\"text_obisnuit2\">Un gand.</h3>\n<p class=\"text_obisnuit\">Corp.</p>";
    const NORMALIZED: &str = "<div itemprop=\"articleBody\">\n\n<!-- SASA-1 -->\n        <h2 class=\"text_obisnuit2\"><em>Un gand.</em></h2>\n<p class=\"text_obisnuit\">Corp.</p>";

    #[test]
    fn h3_lead_becomes_h2() {
        let (out, h3, unmarked) = normalize_lead(H3_LEAD);
        assert_eq!((h3, unmarked), (1, 0));
        assert_eq!(out, NORMALIZED);
        // already normalized text is left alone
        assert_eq!(normalize_lead(&out), (NORMALIZED.to_string(), 0, 0));
    }

    #[test]
    fn missing_marker_is_added() {
        let input = "<div itemprop=\"articleBody\">\n   <h2 class=\"text_obisnuit2\"><em>Un gand.</em></h2>\n<p class=\"text_obisnuit\">Corp.</p>";
        let (out, h3, unmarked) = normalize_lead(input);
        assert_eq!((h3, unmarked), (0, 1));
        assert_eq!(out, NORMALIZED);
    }

    #[test]
    fn walks_subfolders() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("vechi");
        std::fs::create_dir(&nested).unwrap();
        fixtures::write(dir.path(), "a.html", H3_LEAD);
        fixtures::write(&nested, "b.html", H3_LEAD);
        fixtures::write(dir.path(), "c.html", fixtures::RO_ARTICLE);

        let report = run(dir.path(), false).unwrap();
        assert_eq!(report.files, 3);
        assert_eq!(report.changed.len(), 2);
        assert_eq!(fixtures::read(&nested, "b.html"), NORMALIZED);
        assert_eq!(fixtures::read(dir.path(), "c.html"), fixtures::RO_ARTICLE);
    }
}

use std::collections::HashMap;

use anyhow::Result;
use tracing::{debug, warn};

use crate::dates;
use crate::page::{self, flags, meta, Page};
use crate::settings::Settings;

#[derive(Debug, Default)]
pub struct PropagateReport {
    pub total: usize,
    pub updated: Vec<String>,
    pub unchanged: usize,
    pub no_match: Vec<String>,
    pub no_byline: Vec<String>,
    pub unknown_categories: Vec<String>,
}

impl PropagateReport {
    pub fn print(&self) {
        println!("EN files:            {}", self.total);
        println!("Updated:             {}", self.updated.len());
        println!("Already up to date:  {}", self.unchanged);
        println!("No RO counterpart:   {}", self.no_match.len());
        println!("No usable byline:    {}", self.no_byline.len());
        for name in &self.no_match {
            println!("  no RO file for {}", name);
        }
        for name in &self.no_byline {
            println!("  no byline in {}", name);
        }
        for slug in &self.unknown_categories {
            println!("  unmapped category {}", slug);
        }
    }
}

/// RO pages looked up the three ways an EN page can refer to them.
struct RoIndex {
    pages: Vec<Page>,
    by_stem: HashMap<String, usize>,
    by_id: HashMap<u32, usize>,
    by_name: HashMap<String, usize>,
}

impl RoIndex {
    fn new(pages: Vec<Page>) -> Self {
        let mut index = RoIndex {
            by_stem: HashMap::new(),
            by_id: HashMap::new(),
            by_name: HashMap::new(),
            pages: Vec::new(),
        };
        for (i, page) in pages.iter().enumerate() {
            index.by_stem.insert(page.stem().to_string(), i);
            index.by_name.insert(page.file_name.clone(), i);
            if let Some(id) = page.item_id() {
                index.by_id.insert(id, i);
            }
        }
        index.pages = pages;
        index
    }

    /// Same file stem, else same ID, else the file named by the EN page's RO flag.
    fn find(&self, en: &Page, base: &str) -> Option<&Page> {
        let hit = self
            .by_stem
            .get(en.stem())
            .or_else(|| en.item_id().and_then(|id| self.by_id.get(&id)))
            .or_else(|| {
                let target = flags::flag_links(&en.content, base)?.ro?;
                let name = target.rsplit('/').next()?.to_string();
                self.by_name.get(&name)
            })?;
        self.pages.get(*hit)
    }
}

/// The EN byline cell for a RO byline: translated date, mapped category.
/// The second value is the RO slug when it has no EN mapping.
pub fn english_byline(settings: &Settings, ro: &meta::Byline) -> (String, Option<String>) {
    let date = dates::translate_month(&ro.date);
    let slug = meta::category_slug(&ro.category_url);
    let (en_slug, title, unknown) = match settings.category_for_ro(slug) {
        Some(pair) => (pair.en.as_str(), pair.title.as_str(), None),
        None => (slug, ro.category_title.as_str(), Some(slug.to_string())),
    };
    let url = settings.en_url(&format!("{}.html", en_slug));
    (
        meta::render_byline(&date, &url, title, &settings.author),
        unknown,
    )
}

/// Copy publication date and category from each RO article into its EN translation.
pub fn run(settings: &Settings, dry_run: bool) -> Result<PropagateReport> {
    let ro = RoIndex::new(page::load_dir(&settings.ro_dir)?);
    let mut en_pages = page::load_dir(&settings.output_dir)?;
    let mut report = PropagateReport {
        total: en_pages.len(),
        ..Default::default()
    };

    for en in en_pages.iter_mut() {
        let Some(ro_page) = ro.find(en, &settings.base_url) else {
            warn!("No RO counterpart for {}", en.file_name);
            report.no_match.push(en.file_name.clone());
            continue;
        };
        let Some(ro_byline) = meta::byline(&ro_page.content) else {
            warn!("No byline in {}", ro_page.file_name);
            report.no_byline.push(ro_page.file_name.clone());
            continue;
        };

        let (inner, unknown) = english_byline(settings, &ro_byline);
        if let Some(slug) = unknown {
            warn!("Category {} has no English mapping, kept as is", slug);
            if !report.unknown_categories.contains(&slug) {
                report.unknown_categories.push(slug);
            }
        }

        let Some(updated) = meta::set_byline(&en.content, &inner) else {
            warn!("No byline cell in {}", en.file_name);
            report.no_byline.push(en.file_name.clone());
            continue;
        };
        if updated == en.content {
            report.unchanged += 1;
            continue;
        }
        debug!(en = %en.file_name, ro = %ro_page.file_name, "byline updated");
        en.save(updated, dry_run)?;
        report.updated.push(en.file_name.clone());
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::fixtures;

    #[test]
    fn maps_known_and_unknown_categories() {
        let settings = Settings::default();
        let ro = meta::byline(fixtures::RO_ARTICLE).unwrap();
        let (inner, unknown) = english_byline(&settings, &ro);
        assert!(unknown.is_none());
        assert_eq!(
            inner,
            "On March 14, 2025, in <a href=\"https://neculaifantanaru.com/en/leadership-principles.html\" \
title=\"View all articles from Leadership Principles\" class=\"external\" rel=\"category tag\">\
Leadership Principles</a>, by Neculai Fantanaru"
        );

        let odd = meta::Byline {
            date: "Mai 2, 2024".into(),
            category_url: "https://neculaifantanaru.com/ro/categorie-noua.html".into(),
            category_title: "Categorie noua".into(),
        };
        let (inner, unknown) = english_byline(&settings, &odd);
        assert_eq!(unknown.as_deref(), Some("categorie-noua"));
        assert!(inner.starts_with("On May 2, 2024, in <a href=\"https://neculaifantanaru.com/en/categorie-noua.html\""));
    }

    #[test]
    fn matches_by_id_then_flag_link() {
        let ro_dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let ro = fixtures::RO_ARTICLE.replace("Martie 14", "Aprilie 2");
        fixtures::write(ro_dir.path(), "memoria-timpului.html", &ro);
        // different stem, matching ID
        let by_id = fixtures::EN_ARTICLE.replace("$item_id = 5346;", "$item_id = 346;");
        fixtures::write(out_dir.path(), "memory-of-time.html", &by_id);
        // different stem and ID, found through its RO flag
        fixtures::write(out_dir.path(), "time-memory.html", fixtures::EN_ARTICLE);
        fixtures::write(out_dir.path(), "stray.html", "<p>nothing</p>");

        let settings = Settings {
            ro_dir: ro_dir.path().to_path_buf(),
            output_dir: out_dir.path().to_path_buf(),
            ..Settings::default()
        };
        let report = run(&settings, false).unwrap();
        assert_eq!(report.total, 3);
        assert_eq!(report.updated.len(), 2);
        assert_eq!(report.no_match, vec!["stray.html"]);

        for name in ["memory-of-time.html", "time-memory.html"] {
            let b = meta::byline(&fixtures::read(out_dir.path(), name)).unwrap();
            assert_eq!(b.date, "April 2, 2025");
        }
    }
}

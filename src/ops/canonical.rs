use std::path::Path;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::page::{self, flags, meta, Lang};
use crate::settings::Settings;

// the home page keeps the site root as its canonical
const HOME: &str = "index.html";

/// Counts for one language folder.
#[derive(Debug, Default)]
pub struct FolderRepair {
    pub files: usize,
    pub canonical_fixed: usize,
    pub own_flag_fixed: usize,
    pub no_canonical: Vec<String>,
}

#[derive(Debug, Default)]
pub struct CanonicalReport {
    pub ro: FolderRepair,
    pub en: FolderRepair,
}

impl CanonicalReport {
    pub fn print(&self) {
        for (label, folder) in [("RO", &self.ro), ("EN", &self.en)] {
            println!("{} files:            {}", label, folder.files);
            println!("  canonical fixed:   {}", folder.canonical_fixed);
            println!("  own flag fixed:    {}", folder.own_flag_fixed);
            for name in &folder.no_canonical {
                println!("  no canonical link in {}", name);
            }
        }
        let total: usize = [&self.ro, &self.en]
            .iter()
            .map(|f| f.canonical_fixed + f.own_flag_fixed)
            .sum();
        println!("Total fixed:         {}", total);
    }
}

/// What repairing one page changed.
#[derive(Debug, PartialEq, Eq)]
pub struct PageRepair {
    pub content: String,
    pub canonical: bool,
    pub own_flag: bool,
}

/// Point the canonical link of a `lang` page at its own file name, then point the
/// page's own flag anchor at the same URL. `None` when the page has no canonical link.
pub fn repair_page(
    content: &str,
    base: &str,
    lang: Lang,
    file_name: &str,
) -> Option<PageRepair> {
    let url = flags::page_url(base, lang, file_name);
    let (content, canonical) = meta::set_canonical(content, &url)?;
    let (content, own_flag) = flags::set_flag_href(&content, base, lang, file_name);
    Some(PageRepair {
        content,
        canonical,
        own_flag,
    })
}

fn repair_dir(dir: &Path, lang: Lang, base: &str, dry_run: bool) -> Result<FolderRepair> {
    let pages = page::load_dir(dir)?;
    let mut folder = FolderRepair::default();
    for mut page in pages {
        if page.file_name.eq_ignore_ascii_case(HOME) {
            continue;
        }
        folder.files += 1;
        let Some(repair) = repair_page(&page.content, base, lang, &page.file_name) else {
            warn!("{} has no canonical link", page.file_name);
            folder.no_canonical.push(page.file_name.clone());
            continue;
        };
        if !repair.canonical && !repair.own_flag {
            continue;
        }
        folder.canonical_fixed += usize::from(repair.canonical);
        folder.own_flag_fixed += usize::from(repair.own_flag);
        debug!(
            file = %page.file_name,
            canonical = repair.canonical,
            own_flag = repair.own_flag,
            "repaired"
        );
        page.save(repair.content, dry_run)?;
    }
    folder.no_canonical.sort();
    Ok(folder)
}

/// Make every RO and EN page name itself in its canonical link and its own flag.
pub fn run(settings: &Settings, dry_run: bool) -> Result<CanonicalReport> {
    let base = settings.base_url.as_str();
    let report = CanonicalReport {
        ro: repair_dir(&settings.ro_dir, Lang::Ro, base, dry_run)?,
        en: repair_dir(&settings.en_dir, Lang::En, base, dry_run)?,
    };
    info!(
        "Canonical links fixed: RO={}, EN={}",
        report.ro.canonical_fixed, report.en.canonical_fixed
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::fixtures;

    const BASE: &str = "https://neculaifantanaru.com";

    #[test]
    fn renamed_page_gets_its_own_name() {
        let repair =
            repair_page(fixtures::RO_ARTICLE, BASE, Lang::Ro, "memoria-timpului-II.html").unwrap();
        assert!(repair.canonical && repair.own_flag);
        assert_eq!(
            meta::canonical(&repair.content).as_deref(),
            Some("https://neculaifantanaru.com/memoria-timpului-II.html")
        );
        let links = flags::flag_links(&repair.content, BASE).unwrap();
        assert_eq!(links.ro.as_deref(), Some("memoria-timpului-II.html"));
        // the other language link is left alone
        assert_eq!(links.en.as_deref(), Some("memory-of-time.html"));
    }

    #[test]
    fn consistent_page_is_untouched() {
        let repair = repair_page(fixtures::EN_ARTICLE, BASE, Lang::En, "memory-of-time.html").unwrap();
        assert!(!repair.canonical && !repair.own_flag);
        assert_eq!(repair.content, fixtures::EN_ARTICLE);
        assert!(repair_page("<p>no head</p>", BASE, Lang::En, "x.html").is_none());
    }

    #[test]
    fn run_repairs_both_folders() {
        let ro = tempfile::tempdir().unwrap();
        let en = tempfile::tempdir().unwrap();
        fixtures::write(ro.path(), "memoria-timpului.html", fixtures::RO_ARTICLE);
        fixtures::write(ro.path(), "gol.html", "<p>no head</p>");
        fixtures::write(en.path(), "Memory-Of-Time.html", fixtures::EN_ARTICLE);
        fixtures::write(en.path(), "index.html", fixtures::INDEX_PAGE);

        let settings = Settings {
            ro_dir: ro.path().to_path_buf(),
            en_dir: en.path().to_path_buf(),
            ..Settings::default()
        };
        let report = run(&settings, false).unwrap();
        assert_eq!(report.ro.files, 2);
        assert_eq!(report.ro.canonical_fixed, 0);
        assert_eq!(report.ro.no_canonical, vec!["gol.html"]);
        assert_eq!(report.en.files, 1);
        assert_eq!(report.en.canonical_fixed, 1);
        assert_eq!(report.en.own_flag_fixed, 1);

        let en_out = fixtures::read(en.path(), "Memory-Of-Time.html");
        assert_eq!(
            meta::canonical(&en_out).as_deref(),
            Some("https://neculaifantanaru.com/en/Memory-Of-Time.html")
        );
        assert_eq!(fixtures::read(en.path(), "index.html"), fixtures::INDEX_PAGE);
        assert_eq!(fixtures::read(ro.path(), "memoria-timpului.html"), fixtures::RO_ARTICLE);
    }

    #[test]
    fn dry_run_counts_without_writing() {
        let en = tempfile::tempdir().unwrap();
        let ro = tempfile::tempdir().unwrap();
        fixtures::write(en.path(), "renamed.html", fixtures::EN_ARTICLE);

        let settings = Settings {
            ro_dir: ro.path().to_path_buf(),
            en_dir: en.path().to_path_buf(),
            ..Settings::default()
        };
        let report = run(&settings, true).unwrap();
        assert_eq!(report.en.canonical_fixed, 1);
        assert_eq!(fixtures::read(en.path(), "renamed.html"), fixtures::EN_ARTICLE);
    }
}

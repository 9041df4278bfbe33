use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::dates;
use crate::fsio;
use crate::page::{self, flags, meta, FlagLinks, Lang, Page};
use crate::settings::Settings;
use crate::slug::standardize_roman_suffix;

/// A RO page pointing at an EN page that links back to another RO page.
#[derive(Debug, Clone)]
pub struct Orphan {
    pub ro_file: String,
    pub en_target: String,
    pub owner: String,
}

#[derive(Debug, Clone)]
pub struct FlagIssue {
    pub ro_file: String,
    pub en_file: Option<String>,
    pub ro_links: FlagLinks,
    pub en_links: Option<FlagLinks>,
    pub expected_ro: String,
    pub expected_en: String,
    pub ro_error: bool,
    pub en_error: bool,
    pub fixed: bool,
}

/// Date or category that differ between the two sides of a pair.
#[derive(Debug, Clone)]
pub struct Drift {
    pub ro_file: String,
    pub en_file: String,
    pub ro_date: String,
    pub en_date: String,
    pub ro_category: String,
    pub en_category: String,
    pub date_differs: bool,
    pub category_differs: bool,
}

#[derive(Debug, Default)]
pub struct FlagAuditReport {
    pub checked: usize,
    pub problematic: Vec<(String, &'static str)>,
    pub orphans: Vec<Orphan>,
    pub missing_en: Vec<String>,
    pub issues: Vec<FlagIssue>,
    pub drifts: Vec<Drift>,
    pub renamed: Vec<(String, String)>,
    pub fixes: usize,
}

fn show(link: Option<&str>) -> &str {
    link.unwrap_or("-")
}

impl FlagAuditReport {
    pub fn print(&self) {
        println!("RO files checked:    {}", self.checked);
        println!("Problematic:         {}", self.problematic.len());
        println!("Orphans:             {}", self.orphans.len());
        println!("EN file missing:     {}", self.missing_en.len());
        println!("Link errors:         {}", self.issues.len());
        println!("Date/category drift: {}", self.drifts.len());
        println!("Renamed:             {}", self.renamed.len());
        println!("Files fixed:         {}", self.fixes);

        for (file, reason) in &self.problematic {
            println!("  problematic {}: {}", file, reason);
        }
        if !self.orphans.is_empty() {
            println!("\nOrphan RO files (their EN page belongs to another RO page):");
            for o in &self.orphans {
                println!("  {} -> en/{} (owned by {})", o.ro_file, o.en_target, o.owner);
            }
        }
        for name in &self.missing_en {
            println!("  EN file missing for {}", name);
        }
        for (i, issue) in self.issues.iter().enumerate() {
            println!(
                "\n{}. {} / {}{}",
                i + 1,
                issue.ro_file,
                issue.en_file.as_deref().unwrap_or("(no EN file)"),
                if issue.fixed { " [fixed]" } else { "" }
            );
            println!("   expected: RO={} EN={}", issue.expected_ro, issue.expected_en);
            if issue.ro_error {
                println!(
                    "   RO file links: RO={} EN={}",
                    show(issue.ro_links.ro.as_deref()),
                    show(issue.ro_links.en.as_deref())
                );
            }
            if let (true, Some(links)) = (issue.en_error, &issue.en_links) {
                println!(
                    "   EN file links: RO={} EN={}",
                    show(links.ro.as_deref()),
                    show(links.en.as_deref())
                );
            }
        }
        if !self.drifts.is_empty() {
            println!("\nDate/category drift:");
            for d in &self.drifts {
                println!("  {} / {}", d.ro_file, d.en_file);
                if d.date_differs {
                    println!("    date:     {} | {}", d.ro_date, d.en_date);
                }
                if d.category_differs {
                    println!("    category: {} | {}", d.ro_category, d.en_category);
                }
            }
        }
        for (old, new) in &self.renamed {
            println!("  renamed {} -> {}", old, new);
        }
    }
}

/// Rename `name` in `dir` to its roman-standardized form unless that file exists.
/// Returns the name the file has afterwards.
fn standardize_file(
    dir: &Path,
    name: &str,
    dry_run: bool,
    renamed: &mut Vec<(String, String)>,
) -> Result<String> {
    let target = standardize_roman_suffix(name);
    if target == name {
        return Ok(name.to_string());
    }
    if dir.join(&target).exists() {
        warn!("Not renaming {}: {} already exists", name, target);
        return Ok(name.to_string());
    }
    if !dry_run {
        fs::rename(dir.join(name), dir.join(&target))
            .with_context(|| format!("Failed to rename {} to {}", name, target))?;
    }
    info!("Renamed {} -> {}", name, target);
    renamed.push((name.to_string(), target.clone()));
    Ok(target)
}

/// The EN file a RO page refers to: roman-standardized name, exact name, then any case.
fn resolve_en(en_dir: &Path, referenced: &str) -> Option<String> {
    let standardized = standardize_roman_suffix(referenced);
    if en_dir.join(&standardized).is_file() {
        return Some(standardized);
    }
    fsio::find_case_insensitive(en_dir, referenced).map(|p| fsio::file_name(&p))
}

fn drift(settings: &Settings, ro: &Page, en: &Page) -> Option<Drift> {
    let ro_byline = meta::byline(&ro.content)?;
    let en_byline = meta::byline(&en.content)?;

    let ro_slug = meta::category_slug(&ro_byline.category_url);
    let mapped = settings
        .category_for_ro(ro_slug)
        .map(|c| c.en.as_str())
        .unwrap_or(ro_slug);
    let en_slug = meta::category_slug(&en_byline.category_url);

    let date_differs = dates::comparable(&ro_byline.date) != dates::comparable(&en_byline.date);
    let category_differs = mapped != en_slug;
    (date_differs || category_differs).then(|| Drift {
        ro_file: ro.file_name.clone(),
        en_file: en.file_name.clone(),
        ro_date: ro_byline.date.clone(),
        en_date: en_byline.date.clone(),
        ro_category: ro_slug.to_string(),
        en_category: en_slug.to_string(),
        date_differs,
        category_differs,
    })
}

/// Point both flag anchors of `content` at the expected pair.
fn fix_links(content: &str, base: &str, ro: &str, en: &str) -> String {
    let (content, _) = flags::set_flag_href(content, base, Lang::Ro, ro);
    let (content, _) = flags::set_flag_href(&content, base, Lang::En, en);
    content
}

/// Check the FLAGS of every RO page against its EN counterpart, optionally fixing them.
pub fn run(settings: &Settings, fix: bool, dry_run: bool) -> Result<FlagAuditReport> {
    let base = settings.base_url.as_str();
    let en_dir = settings.en_dir.as_path();
    let pages = page::load_dir(&settings.ro_dir)?;
    let mut report = FlagAuditReport {
        checked: pages.len(),
        ..Default::default()
    };

    let mut entries = Vec::new();
    for page in pages {
        match flags::flag_links(&page.content, base) {
            None => report.problematic.push((page.file_name, "FLAGS region missing")),
            Some(links) => match links.both() {
                Some((ro, en)) => {
                    let (ro, en) = (ro.to_string(), en.to_string());
                    entries.push((page, links, ro, en));
                }
                None => report.problematic.push((page.file_name, "RO/EN flag links missing")),
            },
        }
    }

    // the RO page an EN page links back to owns it
    let mut owners: HashMap<String, String> = HashMap::new();
    for (_, _, _, en_link) in &entries {
        let path = en_dir.join(en_link);
        if !path.is_file() {
            continue;
        }
        let owner = Page::load(&path)
            .ok()
            .and_then(|en| flags::flag_links(&en.content, base))
            .and_then(|links| links.ro);
        if let Some(owner) = owner {
            owners.insert(en_link.clone(), owner);
        }
    }

    for (mut ro_page, ro_links, _, en_link) in entries {
        if let Some(owner) = owners.get(&en_link) {
            if *owner != ro_page.file_name {
                report.orphans.push(Orphan {
                    ro_file: ro_page.file_name.clone(),
                    en_target: en_link.clone(),
                    owner: owner.clone(),
                });
                continue;
            }
        }

        if fix {
            let name = standardize_file(&settings.ro_dir, &ro_page.file_name, dry_run, &mut report.renamed)?;
            if name != ro_page.file_name {
                if !dry_run {
                    ro_page.path = settings.ro_dir.join(&name);
                }
                ro_page.file_name = name;
            }
        }

        let mut en_file = resolve_en(en_dir, &en_link);
        if fix {
            if let Some(name) = en_file.take() {
                en_file = Some(standardize_file(en_dir, &name, dry_run, &mut report.renamed)?);
            }
        }
        let mut en_page = match &en_file {
            // a dry-run rename leaves the old name on disk
            Some(name) => resolve_en(en_dir, name)
                .map(|found| Page::load(&en_dir.join(found)))
                .transpose()?,
            None => None,
        };
        if en_page.is_none() {
            debug!(file = %ro_page.file_name, en = %en_link, "EN file not found");
            report.missing_en.push(ro_page.file_name.clone());
        }

        let expected_ro = standardize_roman_suffix(&ro_page.file_name);
        let expected_en = standardize_roman_suffix(en_file.as_deref().unwrap_or(&en_link));
        let en_links = en_page.as_ref().and_then(|en| flags::flag_links(&en.content, base));

        let ro_error = ro_links.ro.as_deref() != Some(expected_ro.as_str())
            || ro_links.en.as_deref() != Some(expected_en.as_str());
        let en_error = en_links.as_ref().is_some_and(|links| {
            links.ro.as_deref() != Some(expected_ro.as_str())
                || links.en.as_deref() != Some(expected_en.as_str())
        });

        if let Some(en) = &en_page {
            report.drifts.extend(drift(settings, &ro_page, en));
        }
        if !ro_error && !en_error {
            continue;
        }

        let mut fixed = false;
        if let (true, Some(en)) = (fix, en_page.as_mut()) {
            if ro_error {
                let content = fix_links(&ro_page.content, base, &expected_ro, &expected_en);
                ro_page.save(content, dry_run)?;
                report.fixes += 1;
            }
            if en_error {
                let content = fix_links(&en.content, base, &expected_ro, &expected_en);
                en.save(content, dry_run)?;
                report.fixes += 1;
            }
            fixed = true;
        }

        report.issues.push(FlagIssue {
            ro_file: ro_page.file_name.clone(),
            en_file,
            ro_links,
            en_links,
            expected_ro,
            expected_en,
            ro_error,
            en_error,
            fixed,
        });
    }
    Ok(report)
}

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::fsio;
use crate::page::{self, regions, Lang, Page};
use crate::settings::Settings;

static TRACKING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"4-+am ajuns la \d+$").unwrap());
static TRAILING_DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+$").unwrap());

#[derive(Debug, Default)]
pub struct Audit {
    pub total: usize,
    pub without_id: Vec<String>,
    pub over_max: Vec<(String, u32)>,
    pub duplicate_ids: BTreeMap<u32, Vec<String>>,
    pub duplicate_names: BTreeMap<String, Vec<PathBuf>>,
}

impl Audit {
    pub fn needs_reset(&self) -> bool {
        !self.without_id.is_empty() || !self.over_max.is_empty() || !self.duplicate_ids.is_empty()
    }

    pub fn print(&self, max: u32) {
        println!("HTML files:          {}", self.total);
        println!("Without ID:          {}", self.without_id.len());
        println!("IDs above {}:        {}", max, self.over_max.len());
        println!("Duplicate IDs:       {}", self.duplicate_ids.len());

        if !self.without_id.is_empty() {
            println!("\nFiles without ID:");
            for (i, name) in self.without_id.iter().enumerate() {
                println!("{:>4}. {}", i + 1, name);
            }
        }
        if !self.over_max.is_empty() {
            println!("\nIDs above the limit:");
            for (name, id) in &self.over_max {
                println!("  {} ({})", name, id);
            }
        }
        if !self.duplicate_ids.is_empty() {
            println!("\nDuplicate IDs:");
            for (i, (id, files)) in self.duplicate_ids.iter().enumerate() {
                println!("{:>4}. ID {} is used by {} files:", i + 1, id, files.len());
                for file in files {
                    println!("        {}", file);
                }
            }
        }
        if !self.duplicate_names.is_empty() {
            println!("\nSame file name in several folders:");
            for (name, paths) in &self.duplicate_names {
                println!("  {}", name);
                for path in paths {
                    println!("    - {}", path.display());
                }
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct RenumberReport {
    pub audit: Audit,
    pub first_id: u32,
    pub last_id: u32,
    pub processed: usize,
    pub changed: usize,
    pub unprocessed: usize,
    pub tracking_file: Option<String>,
}

impl RenumberReport {
    pub fn print(&self, max: u32) {
        self.audit.print(max);
        if self.audit.needs_reset() {
            println!("\nID problems found, every ID is reassigned.");
        }
        println!(
            "\nProcessed {} files ({} changed), IDs {}..={}.",
            self.processed, self.changed, self.first_id, self.last_id
        );
        if self.unprocessed > 0 {
            println!(
                "Unprocessed: {} files (ID limit {} reached).",
                self.unprocessed, max
            );
        }
        if let Some(name) = &self.tracking_file {
            println!("Tracking file: {}", name);
        }
    }
}

pub fn audit(pages: &[Page], max: u32) -> Audit {
    let mut audit = Audit {
        total: pages.len(),
        ..Default::default()
    };
    let mut by_id: BTreeMap<u32, Vec<String>> = BTreeMap::new();
    let mut by_name: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();

    for page in pages {
        by_name
            .entry(page.file_name.clone())
            .or_default()
            .push(page.path.clone());
        match regions::item_id(&page.content) {
            Some(id) => {
                if id > max {
                    audit.over_max.push((page.file_name.clone(), id));
                }
                by_id.entry(id).or_default().push(page.file_name.clone());
            }
            None => audit.without_id.push(page.file_name.clone()),
        }
    }

    audit.without_id.sort();
    audit.duplicate_ids = by_id
        .into_iter()
        .filter(|(_, files)| files.len() > 1)
        .map(|(id, mut files)| {
            files.sort();
            (id, files)
        })
        .collect();
    audit.duplicate_names = by_name
        .into_iter()
        .filter(|(_, paths)| paths.len() > 1)
        .collect();
    audit
}

fn scan(dirs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for (i, dir) in dirs.iter().enumerate() {
        match fsio::list_html(dir) {
            Ok(found) => {
                info!("{}: {} HTML files", dir.display(), found.len());
                files.extend(found);
            }
            // the primary folder is required, the extra ones are optional
            Err(e) if i > 0 => warn!("{:#}", e),
            Err(e) => return Err(e),
        }
    }
    Ok(files)
}

/// Audit and reassign sequential IDs for every page of `lang`.
pub fn run(settings: &Settings, lang: Lang, dry_run: bool) -> Result<RenumberReport> {
    let dirs = settings.scan_dirs(lang);
    let (start, max) = settings.id_range(lang);

    let paths = scan(&dirs)?;
    let mut pages = page::load_all(&paths, lang.code())?;
    let audit = audit(&pages, max);

    pages.sort_by_key(|p| p.file_name.to_lowercase());

    let mut report = RenumberReport {
        first_id: start,
        ..Default::default()
    };
    let mut next_id = start;
    for page in pages.iter_mut() {
        if next_id > max {
            warn!("ID limit {} reached", max);
            break;
        }
        let old = page.item_id();
        let (updated, replaced) = regions::set_item_id(&page.content, next_id);
        if replaced == 0 {
            debug!(file = %page.file_name, id = next_id, "no id comment, left unchanged");
        } else if updated != page.content {
            debug!(file = %page.file_name, ?old, new = next_id, "id changed");
            page.save(updated, dry_run)?;
            report.changed += 1;
        }
        next_id += 1;
        report.processed += 1;
    }
    report.unprocessed = pages.len() - report.processed;
    report.last_id = next_id.saturating_sub(1);
    report.audit = audit;

    report.tracking_file = Some(update_tracking_file(&dirs[0], report.last_id, dry_run)?);
    Ok(report)
}

/// Rename the `4---…am ajuns la N` marker file to the new last ID, or create it.
pub fn update_tracking_file(dir: &Path, last_id: u32, dry_run: bool) -> Result<String> {
    let existing = fs::read_dir(dir)
        .with_context(|| format!("Failed to list {}", dir.display()))?
        .filter_map(|e| e.ok())
        .map(|e| fsio::file_name(&e.path()))
        .find(|name| TRACKING_RE.is_match(name));

    let id = last_id.to_string();
    match existing {
        Some(old) => {
            let new = TRAILING_DIGITS_RE.replace(&old, id.as_str()).into_owned();
            if !dry_run && new != old {
                fs::rename(dir.join(&old), dir.join(&new))
                    .with_context(|| format!("Failed to rename tracking file {}", old))?;
            }
            info!("Tracking file: {} -> {}", old, new);
            Ok(new)
        }
        None => {
            let name = format!("4---------------------------am ajuns la {}", last_id);
            if !dry_run {
                fs::write(dir.join(&name), format!("Ultimul ID folosit: {}", last_id))
                    .with_context(|| format!("Failed to create tracking file {}", name))?;
            }
            info!("Tracking file created: {}", name);
            Ok(name)
        }
    }
}

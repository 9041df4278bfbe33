use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use tracing::{debug, warn};

use crate::page::{self, Page};

static PARAGRAPH_SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(<p class="text_obisnuit2?"[^>]*>)\s+"#).unwrap());

/// Whitespace right after a `text_obisnuit` / `text_obisnuit2` opening tag is removed.
pub fn strip_paragraph_spacing(content: &str) -> (String, usize) {
    let count = PARAGRAPH_SPACE_RE.find_iter(content).count();
    if count == 0 {
        return (content.to_string(), 0);
    }
    (PARAGRAPH_SPACE_RE.replace_all(content, "$1").into_owned(), count)
}

#[derive(Debug)]
pub struct FolderReport {
    pub dir: PathBuf,
    pub files: usize,
    pub changed_files: usize,
    pub replacements: usize,
}

pub fn clean_folder(dir: &Path, dry_run: bool) -> Result<FolderReport> {
    let mut pages: Vec<Page> = page::load_dir(dir)?;
    let mut report = FolderReport {
        dir: dir.to_path_buf(),
        files: pages.len(),
        changed_files: 0,
        replacements: 0,
    };
    for page in pages.iter_mut() {
        let (updated, count) = strip_paragraph_spacing(&page.content);
        if count > 0 {
            debug!(file = %page.file_name, count, "paragraph spacing removed");
            page.save(updated, dry_run)?;
            report.changed_files += 1;
            report.replacements += count;
        }
    }
    Ok(report)
}

/// Clean every folder that exists; missing ones are skipped with a warning.
pub fn run(dirs: &[PathBuf], dry_run: bool) -> Result<Vec<FolderReport>> {
    let mut reports = Vec::new();
    for dir in dirs {
        if !dir.is_dir() {
            warn!("Folder does not exist: {}", dir.display());
            continue;
        }
        reports.push(clean_folder(dir, dry_run)?);
    }
    Ok(reports)
}

pub fn print(reports: &[FolderReport]) {
    for r in reports {
        println!(
            "{}: {} files, {} changed, {} replacements",
            r.dir.display(),
            r.files,
            r.changed_files,
            r.replacements
        );
    }
    let files: usize = reports.iter().map(|r| r.files).sum();
    let replacements: usize = reports.iter().map(|r| r.replacements).sum();
    println!("Total: {} files, {} replacements", files, replacements);
}

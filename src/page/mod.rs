pub mod flags;
pub mod meta;
pub mod regions;

use std::path::{Path, PathBuf};

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::fsio::{self, Encoding};

pub use flags::FlagLinks;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Lang {
    Ro,
    En,
}

impl Lang {
    pub fn code(self) -> &'static str {
        match self {
            Lang::Ro => "ro",
            Lang::En => "en",
        }
    }
}

/// One HTML file of the site, decoded.
#[derive(Debug, Clone)]
pub struct Page {
    pub path: PathBuf,
    pub file_name: String,
    pub content: String,
    pub encoding: Encoding,
}

impl Page {
    pub fn load(path: &Path) -> Result<Page> {
        let (content, encoding) = fsio::read_html(path)?;
        Ok(Page {
            path: path.to_path_buf(),
            file_name: fsio::file_name(path),
            content,
            encoding,
        })
    }

    pub fn stem(&self) -> &str {
        fsio::file_stem(&self.file_name)
    }

    pub fn item_id(&self) -> Option<u32> {
        regions::item_id(&self.content)
    }

    /// Write `content` back (UTF-8) unless `dry_run`, and keep it as the page's content.
    pub fn save(&mut self, content: String, dry_run: bool) -> Result<()> {
        if !dry_run {
            fsio::write_html(&self.path, &content)?;
        }
        if self.encoding == Encoding::Latin1 {
            debug!(file = %self.file_name, "Latin-1 page rewritten as UTF-8");
            self.encoding = Encoding::Utf8;
        }
        debug!(file = %self.file_name, dry_run, "saved");
        self.content = content;
        Ok(())
    }
}

/// Load every HTML file of `dir` in parallel. Unreadable files are logged and skipped.
pub fn load_dir(dir: &Path) -> Result<Vec<Page>> {
    let paths = fsio::list_html(dir)?;
    load_all(&paths, &fsio::file_name(dir))
}

/// Load `paths` in parallel, keeping their order. Unreadable files are logged and skipped.
pub fn load_all(paths: &[PathBuf], label: &str) -> Result<Vec<Page>> {
    let pb = ProgressBar::new(paths.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    pb.set_message(label.to_string());

    let pages: Vec<Page> = paths
        .par_iter()
        .filter_map(|path| {
            let page = Page::load(path);
            pb.inc(1);
            match page {
                Ok(p) => Some(p),
                Err(e) => {
                    warn!("Skipping {}: {:#}", path.display(), e);
                    None
                }
            }
        })
        .collect();

    pb.finish_and_clear();
    Ok(pages)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::fs;
    use std::path::Path;

    pub const RO_ARTICLE: &str = include_str!("../../tests/fixtures/ro_article.html");
    pub const EN_ARTICLE: &str = include_str!("../../tests/fixtures/en_article.html");
    pub const LEGACY_FLAGS: &str = include_str!("../../tests/fixtures/legacy_flags.html");
    pub const CATEGORY_PAGE: &str = include_str!("../../tests/fixtures/category_page.html");
    pub const INDEX_PAGE: &str = include_str!("../../tests/fixtures/index_page.html");
    pub const TEMPLATE: &str = include_str!("../../tests/fixtures/template.html");

    pub fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    pub fn read(dir: &Path, name: &str) -> String {
        fs::read_to_string(dir.join(name)).unwrap()
    }
}

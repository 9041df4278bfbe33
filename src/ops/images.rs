use std::path::Path;

use anyhow::{Context, Result};
use regex::{NoExpand, Regex};
use tracing::{debug, warn};

use crate::page::{self, flags, Page};
use crate::settings::Settings;

/// Matches `<img src="{base}/images/…_image.jpg"`, capturing the URL.
fn image_src_re(base: &str) -> Result<Regex> {
    let pattern = format!(
        r#"<img src="({}/images/[^"]*?_image\.jpg)""#,
        regex::escape(base)
    );
    Regex::new(&pattern).context("Invalid image pattern")
}

#[derive(Debug, Default)]
pub struct ImageReport {
    pub files: usize,
    pub updated: Vec<String>,
    pub unchanged: usize,
    pub no_ro_link: Vec<String>,
    pub no_ro_file: Vec<String>,
    pub no_image: Vec<String>,
}

impl ImageReport {
    pub fn print(&self) {
        println!("EN files:            {}", self.files);
        println!("Images updated:      {}", self.updated.len());
        println!("Already matching:    {}", self.unchanged);
        println!("No RO flag link:     {}", self.no_ro_link.len());
        println!("RO file missing:     {}", self.no_ro_file.len());
        println!("No RO image:         {}", self.no_image.len());
        for name in &self.no_ro_file {
            println!("  missing {}", name);
        }
    }
}

/// Give every EN page in `dir` the article image of its RO counterpart.
pub fn run(settings: &Settings, dir: &Path, dry_run: bool) -> Result<ImageReport> {
    let image_re = image_src_re(&settings.base_url)?;
    let mut pages = page::load_dir(dir)?;
    let mut report = ImageReport {
        files: pages.len(),
        ..Default::default()
    };

    for en in pages.iter_mut() {
        let Some(ro_target) = flags::flag_links(&en.content, &settings.base_url).and_then(|l| l.ro)
        else {
            warn!("No RO flag link in {}", en.file_name);
            report.no_ro_link.push(en.file_name.clone());
            continue;
        };
        let ro_path = settings.ro_dir.join(&ro_target);
        if !ro_path.is_file() {
            warn!("RO file does not exist: {}", ro_path.display());
            report.no_ro_file.push(ro_target);
            continue;
        }
        let ro = Page::load(&ro_path)?;
        let Some(image) = image_re.captures(&ro.content).map(|c| c[1].to_string()) else {
            warn!("No article image in {}", ro.file_name);
            report.no_image.push(ro.file_name);
            continue;
        };

        let tag = format!(r#"<img src="{}""#, image);
        let updated = image_re.replace_all(&en.content, NoExpand(&tag)).into_owned();
        if updated == en.content {
            report.unchanged += 1;
            continue;
        }
        debug!(en = %en.file_name, image = %image, "image replaced");
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
    fn copies_the_ro_image() {
        let ro = tempfile::tempdir().unwrap();
        let staged = tempfile::tempdir().unwrap();
        fixtures::write(ro.path(), "memoria-timpului.html", fixtures::RO_ARTICLE);
        fixtures::write(staged.path(), "memory-of-time.html", fixtures::EN_ARTICLE);
        fixtures::write(staged.path(), "no-flags.html", "<p>nothing</p>");
        let orphan = fixtures::EN_ARTICLE.replace(
            "neculaifantanaru.com/memoria-timpului.html",
            "neculaifantanaru.com/nu-exista.html",
        );
        fixtures::write(staged.path(), "orphan.html", &orphan);

        let settings = Settings {
            ro_dir: ro.path().to_path_buf(),
            ..Settings::default()
        };
        let report = run(&settings, staged.path(), false).unwrap();
        assert_eq!(report.files, 3);
        assert_eq!(report.updated, vec!["memory-of-time.html"]);
        assert_eq!(report.no_ro_link, vec!["no-flags.html"]);
        assert_eq!(report.no_ro_file, vec!["nu-exista.html"]);

        let written = fixtures::read(staged.path(), "memory-of-time.html");
        assert!(written.contains(
            r#"<img src="https://neculaifantanaru.com/images/memoria-timpului_image.jpg""#
        ));
        assert!(!written.contains("old-picture_image.jpg"));
    }
}

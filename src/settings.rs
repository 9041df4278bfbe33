use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::Config;
use serde::Deserialize;

use crate::page::Lang;

const DEFAULT_CONFIG_FILE: &str = "blogsync";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub base_url: String,
    pub author: String,
    pub ro_dir: PathBuf,
    pub en_dir: PathBuf,
    /// Secondary folders scanned by `renumber` in addition to the main ones.
    pub ro_extra_dirs: Vec<PathBuf>,
    pub en_extra_dirs: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub mirror_dir: Option<PathBuf>,
    pub template: PathBuf,
    pub ids: IdSettings,
    pub index_window_days: i64,
    pub default_quote: String,
    pub ftp: FtpSettings,
    pub categories: Vec<CategoryPair>,
    pub excluded_pages: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdSettings {
    pub ro_start: u32,
    pub ro_max: u32,
    pub en_start: u32,
    pub en_max: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FtpSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub remote_dir: String,
}

/// One Romanian category slug and its English counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryPair {
    pub ro: String,
    pub en: String,
    pub title: String,
}

impl Default for IdSettings {
    fn default() -> Self {
        IdSettings {
            ro_start: 1,
            ro_max: 5000,
            en_start: 5000,
            en_max: 10000,
        }
    }
}

impl Default for FtpSettings {
    fn default() -> Self {
        FtpSettings {
            host: String::new(),
            port: 21,
            user: String::new(),
            password: None,
            remote_dir: "/public_html/en/".to_string(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            base_url: "https://neculaifantanaru.com".to_string(),
            author: "Neculai Fantanaru".to_string(),
            ro_dir: PathBuf::from("ro"),
            en_dir: PathBuf::from("en"),
            ro_extra_dirs: Vec::new(),
            en_extra_dirs: Vec::new(),
            output_dir: PathBuf::from("output"),
            backup_dir: PathBuf::from("backup"),
            mirror_dir: None,
            template: PathBuf::from("index.html"),
            ids: IdSettings::default(),
            index_window_days: 120,
            default_quote: "True knowledge begins where you dare to transcend the limits imposed by the teachings of others.".to_string(),
            ftp: FtpSettings::default(),
            categories: default_categories(),
            excluded_pages: default_excluded_pages(),
        }
    }
}

impl Settings {
    /// Defaults, then `blogsync.toml` (or `path`), then `BLOG_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Settings> {
        let file = match path {
            Some(p) => config::File::from(p).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        let settings = Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("BLOG")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration")?
            .try_deserialize::<Settings>()
            .context("Invalid configuration")?;
        Ok(settings.normalized())
    }

    fn normalized(mut self) -> Self {
        while self.base_url.ends_with('/') {
            self.base_url.pop();
        }
        self
    }

    pub fn category_for_ro(&self, ro_slug: &str) -> Option<&CategoryPair> {
        self.categories.iter().find(|c| c.ro == ro_slug)
    }

    pub fn en_url(&self, file: &str) -> String {
        format!("{}/en/{}", self.base_url, file)
    }

    pub fn is_excluded(&self, file_name: &str) -> bool {
        self.excluded_pages.iter().any(|p| p == file_name)
    }

    pub fn id_range(&self, lang: Lang) -> (u32, u32) {
        match lang {
            Lang::Ro => (self.ids.ro_start, self.ids.ro_max),
            Lang::En => (self.ids.en_start, self.ids.en_max),
        }
    }

    pub fn scan_dirs(&self, lang: Lang) -> Vec<PathBuf> {
        let (main, extra) = match lang {
            Lang::Ro => (&self.ro_dir, &self.ro_extra_dirs),
            Lang::En => (&self.en_dir, &self.en_extra_dirs),
        };
        std::iter::once(main.clone()).chain(extra.iter().cloned()).collect()
    }
}

fn default_categories() -> Vec<CategoryPair> {
    [
        ("principiile-conducerii", "leadership-principles", "Leadership Principles"),
        ("leadership-real", "real-leadership", "Real Leadership"),
        ("legile-conducerii", "leadership-laws", "Leadership Laws"),
        ("dezvoltare-personala", "personal-development", "Personal Development"),
        ("leadership-de-succes", "successful-leadership", "Successful Leadership"),
        ("lideri-si-atitudine", "leadership-and-attitude", "Leadership and Attitude"),
        (
            "aptitudini-si-abilitati-de-leadership",
            "leadership-skills-and-abilities",
            "Leadership Skills And Abilities",
        ),
        ("hr-resurse-umane", "hr-human-resources", "Human Resources"),
        ("leadership-total", "total-leadership", "Total Leadership"),
        ("leadership-de-durata", "leadership-that-lasts", "Leadership That Lasts"),
        ("calitatile-unui-lider", "qualities-of-a-leader", "Qualities of A Leader"),
        ("leadership-de-varf", "top-leadership", "Top Leadership"),
        ("jurnal-de-leadership", "leadership-journal", "Leadership Journal"),
        ("leadership-magic", "leadership-magic", "Leadership Magic"),
    ]
    .into_iter()
    .map(|(ro, en, title)| CategoryPair {
        ro: ro.to_string(),
        en: en.to_string(),
        title: title.to_string(),
    })
    .collect()
}

fn default_excluded_pages() -> Vec<String> {
    [
        "index.html",
        "leadership-and-attitude.html",
        "leadership-magic.html",
        "successful-leadership.html",
        "hr-human-resources.html",
        "leadership-laws.html",
        "total-leadership.html",
        "leadership-that-lasts.html",
        "leadership-principles.html",
        "leadership-plus.html",
        "qualities-of-a-leader.html",
        "top-leadership.html",
        "leadership-impact.html",
        "personal-development.html",
        "leadership-skills-and-abilities.html",
        "real-leadership.html",
        "basic-leadership.html",
        "leadership-360.html",
        "leadership-pro.html",
        "leadership-expert.html",
        "leadership-know-how.html",
        "leadership-journal.html",
        "alpha-leadership.html",
        "leadership-on-off.html",
        "leadership-deluxe.html",
        "leadership-xxl.html",
        "leadership-50-extra.html",
        "leadership-fusion.html",
        "leadership-v8.html",
        "leadership-x3-silver.html",
        "leadership-q2-sensitive.html",
        "leadership-t7-hybrid.html",
        "leadership-n6-celsius.html",
        "leadership-s4-quartz.html",
        "leadership-gt-accent.html",
        "leadership-fx-intensive.html",
        "leadership-iq-light.html",
        "leadership-7th-edition.html",
        "leadership-xs-analytics.html",
        "leadership-z3-extended.html",
        "leadership-ex-elite.html",
        "leadership-w3-integra.html",
        "leadership-sx-experience.html",
        "leadership-y5-superzoom.html",
        "performance-ex-flash.html",
        "leadership-mindware.html",
        "leadership-r2-premiere.html",
        "leadership-y4-titanium.html",
        "leadership-quantum-xx.html",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_builtin_categories() {
        let s = Settings::default();
        assert_eq!(s.categories.len(), 14);
        let pair = s.category_for_ro("legile-conducerii").unwrap();
        assert_eq!(pair.en, "leadership-laws");
        assert_eq!(pair.title, "Leadership Laws");
        assert!(s.category_for_ro("nu-exista").is_none());
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.toml");
        std::fs::write(
            &path,
            "base_url = \"https://example.org/\"\nro_dir = \"/srv/ro\"\n\n[ftp]\nhost = \"ftp.example.org\"\nuser = \"me\"\n",
        )
        .unwrap();
        let s = Settings::load(Some(&path)).unwrap();
        assert_eq!(s.base_url, "https://example.org");
        assert_eq!(s.ro_dir, PathBuf::from("/srv/ro"));
        assert_eq!(s.ftp.host, "ftp.example.org");
        // untouched keys keep their defaults
        assert_eq!(s.ftp.remote_dir, "/public_html/en/");
        assert_eq!(s.ids.en_start, 5000);
        assert_eq!(s.en_url("x.html"), "https://example.org/en/x.html");
    }

    #[test]
    fn environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.toml");
        std::fs::write(&path, "index_window_days = 90\n\n[ftp]\nuser = \"me\"\n").unwrap();

        std::env::set_var("BLOG_FTP__PASSWORD", "secret");
        std::env::set_var("BLOG_INDEX_WINDOW_DAYS", "30");
        let loaded = Settings::load(Some(&path));
        std::env::remove_var("BLOG_FTP__PASSWORD");
        std::env::remove_var("BLOG_INDEX_WINDOW_DAYS");

        let s = loaded.unwrap();
        assert_eq!(s.ftp.password.as_deref(), Some("secret"));
        assert_eq!(s.ftp.user, "me");
        assert_eq!(s.index_window_days, 30);
    }
}

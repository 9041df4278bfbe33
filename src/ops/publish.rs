use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::sync::LazyLock;

use anyhow::{bail, Context, Result};
use chrono::{Datelike, Duration, NaiveDate};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::dates;
use crate::fsio;
use crate::page::regions::{self, LISTING_END, LISTING_START};
use crate::page::{self, flags, meta, Page};
use crate::settings::Settings;

static HREF_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"href="([^"]+)""#).unwrap());
static LISTING_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<!-- ARTICOL CATEGORIE START -->\s*").unwrap());

const JUSTIFY_DIV: &str = r#"<div align="justify">"#;
const INDEX: &str = "index.html";

/// What a listing entry needs to know about an article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleSummary {
    pub file_name: String,
    pub title: String,
    pub url: String,
    /// Byline text, always with a year.
    pub date: String,
    pub published: NaiveDate,
    pub category_url: String,
    pub category_name: String,
    pub ro_link: Option<String>,
    pub quote: String,
}

impl ArticleSummary {
    pub fn from_page(page: &Page, settings: &Settings, today: NaiveDate) -> Option<Self> {
        let title = meta::title(&page.content)?;
        let url = meta::canonical(&page.content)?;
        let byline = meta::byline(&page.content)?;
        let date = dates::ensure_year(&byline.date, today.year());
        let published = dates::parse_listing_date(&date).unwrap_or_else(|| {
            debug!(file = %page.file_name, date = %date, "unparsed date, using today");
            today
        });
        let quote = meta::quote(&page.content)
            .or_else(|| meta::lead(&page.content))
            .unwrap_or_else(|| settings.default_quote.clone());
        Some(ArticleSummary {
            file_name: page.file_name.clone(),
            title,
            url,
            date,
            published,
            category_url: byline.category_url,
            category_name: byline.category_title,
            ro_link: flags::flag_links(&page.content, &settings.base_url).and_then(|l| l.ro),
            quote,
        })
    }
}

/// The block that stands for one article in a category page or the index.
pub fn listing_entry(article: &ArticleSummary, settings: &Settings) -> String {
    let title = html_escape::encode_text(&article.title);
    let quote = html_escape::encode_text(&article.quote);
    let byline = meta::render_byline(
        &article.date,
        &article.category_url,
        &article.category_name,
        &settings.author,
    );
    format!(
        r#"<table width="638" border="0">
        <tr>
          <td><span class="den_articol"><a href="{url}" class="linkMare">{title}</a></span></td>
        </tr>
        <tr>
          <td class="text_dreapta">{byline}</td>
        </tr>
      </table>
      <p class="text_obisnuit2"><em>{quote}</em></p>
      <table width="552" border="0">
        <tr>
          <td width="552"><div align="right" id="external2"><a href="{url}">read more </a><a href="{base}/en/" title=""><img src="Arrow3_black_5x7.gif" alt="" width="5" height="7" class="arrow" /></a></div></td>
        </tr>
      </table>
      <p class="text_obisnuit"></p>
"#,
        url = article.url,
        base = settings.base_url,
    )
}

fn hrefs(html: &str) -> HashSet<&str> {
    HREF_RE
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect()
}

/// Add entries for articles not yet listed in a category page, right after the
/// justify div that opens its listing. `None` when the page has no such place.
pub fn insert_into_category(
    content: &str,
    articles: &[&ArticleSummary],
    settings: &Settings,
) -> Option<(String, usize)> {
    let range = regions::inner_range(content, LISTING_START, LISTING_END)?;
    let region = &content[range.clone()];
    let listed = hrefs(region);
    let new: Vec<&&ArticleSummary> = articles
        .iter()
        .filter(|a| !listed.contains(a.url.as_str()))
        .collect();
    if new.is_empty() {
        return Some((content.to_string(), 0));
    }

    let at = range.start + region.find(JUSTIFY_DIV)? + JUSTIFY_DIV.len();
    let mut out = String::with_capacity(content.len() + new.len() * 1200);
    out.push_str(&content[..at]);
    for article in &new {
        out.push('\n');
        out.push_str(&listing_entry(article, settings));
    }
    out.push_str(&content[at..]);
    Some((out, new.len()))
}

fn ro_file_linked(ro_index: &str, ro_link: &str) -> bool {
    let path = ro_link.split('?').next().unwrap_or(ro_link);
    let name = path.rsplit('/').next().unwrap_or(path);
    ro_index.contains(&format!("/{}\"", name)) || ro_index.contains(&format!("/{}?", name))
}

/// Add recent articles that the index does not link yet, oldest first, right after
/// the listing start marker. When the RO index is given, an article with a RO link
/// is only added once the RO index links its RO file.
pub fn insert_into_index(
    content: &str,
    articles: &[ArticleSummary],
    ro_index: Option<&str>,
    today: NaiveDate,
    settings: &Settings,
) -> Option<(String, usize)> {
    let linked = hrefs(content);
    let oldest = today - Duration::days(settings.index_window_days);
    let mut new: Vec<&ArticleSummary> = articles
        .iter()
        .filter(|a| !linked.contains(a.url.as_str()))
        .filter(|a| {
            let recent = a.published >= oldest;
            if !recent {
                debug!(file = %a.file_name, "older than the index window");
            }
            recent
        })
        .filter(|a| match (ro_index.filter(|s| !s.is_empty()), &a.ro_link) {
            (Some(ro), Some(link)) => {
                let linked = ro_file_linked(ro, link);
                if !linked {
                    debug!(file = %a.file_name, ro = %link, "RO version not in the RO index yet");
                }
                linked
            }
            _ => true,
        })
        .collect();
    if new.is_empty() {
        return Some((content.to_string(), 0));
    }
    new.sort_by_key(|a| a.published);

    let at = LISTING_START_RE.find(content)?.end();
    let mut out = String::with_capacity(content.len() + new.len() * 1200);
    out.push_str(&content[..at]);
    out.push('\n');
    for article in &new {
        out.push_str(&listing_entry(article, settings));
    }
    out.push_str(&content[at..]);
    Some((out, new.len()))
}

/// Replace the whole listing region with `articles`, newest first.
pub fn rebuild_listing(
    content: &str,
    articles: &mut [ArticleSummary],
    settings: &Settings,
) -> Option<String> {
    let range = regions::inner_range(content, LISTING_START, LISTING_END)?;
    articles.sort_by(|a, b| b.published.cmp(&a.published));
    let mut listing = String::from("\n");
    for article in articles.iter() {
        listing.push_str(&listing_entry(article, settings));
    }
    Some(regions::replace_range(content, range, &listing))
}

#[derive(Debug, Default)]
pub struct PublishReport {
    pub articles: Vec<String>,
    pub skipped: Vec<String>,
    pub categories: Vec<(String, usize)>,
    pub missing_categories: Vec<String>,
    pub index_added: usize,
    pub backed_up: usize,
    pub backup_listing: usize,
}

impl PublishReport {
    pub fn print(&self) {
        println!("Articles published:  {}", self.articles.len());
        for name in &self.articles {
            println!("  {}", name);
        }
        if !self.skipped.is_empty() {
            println!("Skipped (no title, canonical or byline):");
            for name in &self.skipped {
                println!("  {}", name);
            }
        }
        for (category, added) in &self.categories {
            println!("Category {}: {} new entries", category, added);
        }
        for category in &self.missing_categories {
            println!("Category page not found: {}", category);
        }
        println!("Index entries added: {}", self.index_added);
        println!("Files in backup:     {}", self.backed_up);
        println!("Backup index lists:  {}", self.backup_listing);
    }
}

/// Publish the converted articles: copy them into the EN folder, list them in their
/// category pages and the index, and stage every touched file in the backup folder.
pub fn run(settings: &Settings, today: NaiveDate, dry_run: bool) -> Result<PublishReport> {
    let en_index_path = settings.en_dir.join(INDEX);
    if !en_index_path.is_file() {
        bail!("{} not found", en_index_path.display());
    }
    let original_index = Page::load(&en_index_path)?.content;
    if !dry_run {
        fsio::clear_dir(&settings.backup_dir)?;
    }

    let mut report = PublishReport::default();
    let mut articles = Vec::new();
    // file name -> content of everything that ends up in the backup folder
    let mut staged: BTreeMap<String, String> = BTreeMap::new();
    staged.insert(INDEX.to_string(), original_index.clone());

    for page in page::load_dir(&settings.output_dir)? {
        match ArticleSummary::from_page(&page, settings, today) {
            Some(summary) => {
                if !dry_run {
                    fsio::write_html(&settings.en_dir.join(&page.file_name), &page.content)?;
                }
                report.articles.push(page.file_name.clone());
                staged.insert(page.file_name.clone(), page.content);
                articles.push(summary);
            }
            None => {
                warn!("Skipping {}: no title, canonical or byline", page.file_name);
                report.skipped.push(page.file_name);
            }
        }
    }
    info!("{} articles to publish", articles.len());

    let categories: BTreeSet<&str> = articles.iter().map(|a| a.category_url.as_str()).collect();
    for url in categories {
        let file = format!("{}.html", meta::category_slug(url));
        let path = settings.en_dir.join(&file);
        if !path.is_file() {
            warn!("Category page {} not found", path.display());
            report.missing_categories.push(file);
            continue;
        }
        let mut category = Page::load(&path)?;
        let members: Vec<&ArticleSummary> =
            articles.iter().filter(|a| a.category_url == url).collect();
        match insert_into_category(&category.content, &members, settings) {
            Some((_, 0)) => debug!(category = %file, "nothing new"),
            Some((updated, added)) => {
                category.save(updated, dry_run)?;
                staged.insert(file.clone(), category.content);
                report.categories.push((file, added));
            }
            None => warn!("{} has no listing to insert into", file),
        }
    }

    let ro_index = fs::read_to_string(settings.ro_dir.join(INDEX)).ok();
    match insert_into_index(&original_index, &articles, ro_index.as_deref(), today, settings) {
        Some((_, 0)) => {}
        Some((updated, added)) => {
            if !dry_run {
                fsio::write_html(&en_index_path, &updated)?;
            }
            staged.insert(INDEX.to_string(), updated);
            report.index_added = added;
        }
        None => warn!("{} has no listing start marker", en_index_path.display()),
    }

    let mut listed: Vec<ArticleSummary> = staged
        .iter()
        .filter(|(name, _)| !settings.is_excluded(name))
        .filter_map(|(name, content)| {
            let page = Page {
                path: settings.backup_dir.join(name),
                file_name: name.clone(),
                content: content.clone(),
                encoding: fsio::Encoding::Utf8,
            };
            ArticleSummary::from_page(&page, settings, today)
        })
        .collect();
    report.backup_listing = listed.len();
    if let Some(index) = staged.get(INDEX) {
        match rebuild_listing(index, &mut listed, settings) {
            Some(rebuilt) => {
                staged.insert(INDEX.to_string(), rebuilt);
            }
            None => warn!("Backup index has no listing region"),
        }
    }

    if !dry_run {
        for (name, content) in &staged {
            fsio::write_html(&settings.backup_dir.join(name), content)
                .with_context(|| format!("Failed to stage {}", name))?;
        }
    }
    report.backed_up = staged.len();
    Ok(report)
}

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::docx::{self, DocParagraph, DocRun};
use crate::page::{self, meta, Page};
use crate::settings::Settings;
use crate::slug;

const MIN_SHARED_WORDS: usize = 3;

#[derive(Debug, Clone)]
struct RoEntry {
    file_name: String,
    id: u32,
    words: HashSet<String>,
}

/// RO articles that carry both a title and an ID.
struct RoIndex {
    entries: Vec<RoEntry>,
    by_title: HashMap<String, usize>,
    by_stem: HashMap<String, usize>,
}

impl RoIndex {
    fn new(pages: &[Page]) -> Self {
        let mut index = RoIndex {
            entries: Vec::new(),
            by_title: HashMap::new(),
            by_stem: HashMap::new(),
        };
        for page in pages {
            let (Some(title), Some(id)) = (meta::title(&page.content), page.item_id()) else {
                debug!(file = %page.file_name, "skipped, no title or ID");
                continue;
            };
            let normalized = slug::normalize_title(&title);
            let i = index.entries.len();
            index.by_title.entry(normalized.clone()).or_insert(i);
            index.by_stem.entry(page.stem().to_string()).or_insert(i);
            index.entries.push(RoEntry {
                file_name: page.file_name.clone(),
                id,
                words: normalized.split(' ').map(str::to_string).collect(),
            });
        }
        index
    }

    /// Exact title, then slug file stem, then the largest word overlap.
    fn find(&self, title: &str) -> Option<&RoEntry> {
        let normalized = slug::normalize_title(title);
        if let Some(&i) = self.by_title.get(&normalized) {
            return self.entries.get(i);
        }
        if let Some(&i) = self.by_stem.get(&slug::slugify(title)) {
            return self.entries.get(i);
        }

        let words: HashSet<&str> = normalized.split(' ').collect();
        let mut best: Option<(usize, &RoEntry)> = None;
        for entry in &self.entries {
            let shared = entry
                .words
                .iter()
                .filter(|w| words.contains(w.as_str()))
                .count();
            if shared >= MIN_SHARED_WORDS && best.map_or(true, |(n, _)| shared > n) {
                best = Some((shared, entry));
            }
        }
        best.map(|(_, entry)| entry)
    }
}

/// A title paragraph followed directly by its `ID:` paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitledId {
    pub title: String,
    pub id: String,
    pub id_paragraph: usize,
}

pub fn titled_ids(paragraphs: &[DocParagraph]) -> Vec<TitledId> {
    let mut found = Vec::new();
    let mut title: Option<String> = None;
    for (i, para) in paragraphs.iter().enumerate() {
        let text = para.text();
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        match (title.take(), docx::id_line(text)) {
            (Some(t), Some(id)) => found.push(TitledId {
                title: t,
                id: id.to_string(),
                id_paragraph: i,
            }),
            (_, None) if para.centered => title = Some(text.to_string()),
            _ => {}
        }
    }
    found
}

/// The ID paragraph with a new number, in the formatting of its first run.
fn id_paragraph(old: &DocParagraph, id: u32) -> DocParagraph {
    let run = old.runs.first().cloned().unwrap_or_default();
    DocParagraph {
        centered: old.centered,
        runs: vec![DocRun {
            text: format!("ID: {}", id),
            ..run
        }],
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correction {
    pub title: String,
    pub ro_file: String,
    pub old_id: String,
    pub new_id: u32,
}

#[derive(Debug, Default)]
pub struct FixIdsReport {
    pub articles: usize,
    pub correct: usize,
    pub corrections: Vec<Correction>,
    pub unmatched: Vec<String>,
    pub written: Option<PathBuf>,
}

impl FixIdsReport {
    pub fn print(&self) {
        println!("Articles in document: {}", self.articles);
        println!("IDs already correct:  {}", self.correct);
        println!("IDs corrected:        {}", self.corrections.len());
        for c in &self.corrections {
            println!("  {}: {} -> {} ({})", c.title, c.old_id, c.new_id, c.ro_file);
        }
        println!("Unmatched titles:     {}", self.unmatched.len());
        for title in &self.unmatched {
            println!("  {}", title);
        }
        match &self.written {
            Some(path) => println!("Written:              {}", path.display()),
            None => println!("Document left unchanged"),
        }
    }
}

/// Check every title/ID pair of a translation document against the RO articles.
pub fn run(settings: &Settings, docx_path: &Path, out: Option<&Path>, dry_run: bool) -> Result<FixIdsReport> {
    let ro = RoIndex::new(&page::load_dir(&settings.ro_dir)?);
    info!("Indexed {} RO articles", ro.entries.len());

    let mut paragraphs = docx::read_paragraphs(docx_path)
        .with_context(|| format!("Failed to read {}", docx_path.display()))?;
    let pairs = titled_ids(&paragraphs);
    let mut report = FixIdsReport {
        articles: pairs.len(),
        ..Default::default()
    };

    for pair in pairs {
        let Some(entry) = ro.find(&pair.title) else {
            warn!("No RO article found for \"{}\"", pair.title);
            report.unmatched.push(pair.title);
            continue;
        };
        if pair.id == entry.id.to_string() {
            report.correct += 1;
            continue;
        }
        debug!(title = %pair.title, old = %pair.id, new = entry.id, "ID corrected");
        paragraphs[pair.id_paragraph] = id_paragraph(&paragraphs[pair.id_paragraph], entry.id);
        report.corrections.push(Correction {
            title: pair.title,
            ro_file: entry.file_name.clone(),
            old_id: pair.id,
            new_id: entry.id,
        });
    }

    // an explicit output document is always written, even without corrections
    if !dry_run && (out.is_some() || !report.corrections.is_empty()) {
        let target = out.unwrap_or(docx_path);
        docx::write_document(target, &paragraphs)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        report.written = Some(target.to_path_buf());
    }
    Ok(report)
}

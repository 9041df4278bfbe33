use std::collections::HashMap;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::page::{self, flags, Lang, Page};
use crate::settings::Settings;

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "if", "when", "while", "as", "in", "on", "at", "of",
    "to", "for", "with", "by", "about", "against", "before", "after", "during", "without",
    "through", "throughout", "within", "is", "are", "was", "were", "be", "been", "being", "am",
    "s", "d", "t", "ll", "ve", "re", "m", "si", "sau", "dar", "daca", "cand", "ca", "pe", "la",
    "de", "cu", "prin", "pentru", "fara", "despre", "inainte", "dupa", "din", "spre", "este",
    "sunt", "era", "fi", "fost", "fiind", "e",
];
const CONSONANT_GROUPS: [&str; 7] = ["kh", "hk", "mk", "km", "tz", "zk", "gh"];
const FOREIGN_ENDINGS: [&str; 5] = ["um", "us", "is", "ae", "os"];

fn is_stop_word(word: &str) -> bool {
    let lower = word.to_lowercase();
    STOP_WORDS.contains(&lower.as_str())
}

/// Link target without its extension, directories kept.
fn strip_extension(target: &str) -> &str {
    match target.rfind('.') {
        Some(i) if i > 0 && !target[i..].contains('/') => &target[..i],
        _ => target,
    }
}

fn char_len(word: &str) -> usize {
    word.chars().count()
}

fn content_words(parts: &[&str]) -> usize {
    parts
        .iter()
        .filter(|w| !is_stop_word(w) && char_len(w) > 2)
        .count()
}

/// First four letters of every long word.
fn roots(parts: &[&str]) -> Vec<String> {
    parts
        .iter()
        .filter(|w| char_len(w) >= 6 && !is_stop_word(w))
        .map(|w| w.chars().take(4).collect())
        .collect()
}

fn looks_foreign(word: &str) -> bool {
    let lower = word.to_lowercase();
    (lower.contains('k') && lower.contains('h'))
        || lower.contains('q')
        || lower.starts_with('x')
        || CONSONANT_GROUPS.iter().any(|g| lower.contains(g))
}

/// Whether a RO/EN pair of link targets names a foreign or Latin term that is kept
/// as is across languages (`hikmah` / `wisdom`, `initium-novum` / `the-initiation-…`).
pub fn is_special_term(ro_target: &str, en_target: &str) -> bool {
    let ro_base = strip_extension(ro_target);
    let en_base = strip_extension(en_target);
    if ro_base == en_base {
        return true;
    }

    let ro_parts: Vec<&str> = ro_base.split('-').collect();
    let en_parts: Vec<&str> = en_base.split('-').collect();
    let ro_content = content_words(&ro_parts);
    let en_content = content_words(&en_parts);

    for parts in [&ro_parts, &en_parts] {
        if parts.len() == 1 && char_len(parts[0]) < 10 && !is_stop_word(parts[0]) {
            return true;
        }
    }

    if ro_parts.len() <= 2
        && en_parts.len() <= 2
        && ro_parts.iter().chain(en_parts.iter()).any(|w| looks_foreign(w))
    {
        return true;
    }

    let en_roots = roots(&en_parts);
    let mut common: Vec<String> = roots(&ro_parts)
        .into_iter()
        .filter(|r| en_roots.contains(r))
        .collect();
    common.sort();
    common.dedup();
    if !common.is_empty() && ro_parts.len().abs_diff(en_parts.len()) > 3 {
        for stem in &common {
            let hit = ro_parts
                .iter()
                .chain(en_parts.iter())
                .filter(|w| w.starts_with(stem.as_str()))
                .any(|w| {
                    FOREIGN_ENDINGS.iter().any(|e| w.ends_with(e))
                        || (w.contains('k') && !w.contains('w'))
                });
            if hit {
                return true;
            }
        }
    }

    (ro_content == 1 && en_content >= 4) || (en_content == 1 && ro_content >= 4)
}

#[derive(Debug, Clone)]
pub struct SpecialTerm {
    pub id: u32,
    pub ro_file: String,
    pub en_file: String,
    pub ro_target: String,
    pub en_target: String,
}

#[derive(Debug, Default)]
pub struct FlagSyncReport {
    pub ro_indexed: usize,
    pub en_indexed: usize,
    pub pairs: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: Vec<(u32, String)>,
    pub special: Vec<SpecialTerm>,
}

impl FlagSyncReport {
    pub fn print(&self) {
        println!("RO files with ID:    {}", self.ro_indexed);
        println!("EN files with ID:    {}", self.en_indexed);
        println!("Pairs by ID:         {}", self.pairs);
        println!("Updated:             {}", self.updated);
        println!("Already in sync:     {}", self.unchanged);
        println!("Failed:              {}", self.failed.len());
        for (id, reason) in &self.failed {
            println!("  ID {}: {}", id, reason);
        }
        if !self.special.is_empty() {
            println!("\nSpecial terms (RO keeps its own EN link):");
            for s in &self.special {
                println!(
                    "  ID {}: {} -> {} ({} / {})",
                    s.id, s.ro_file, s.en_file, s.ro_target, s.en_target
                );
            }
        }
    }
}

/// What syncing one RO/EN pair produced, before anything is written.
#[derive(Debug)]
pub struct PairUpdate {
    pub ro: Option<String>,
    pub en: Option<String>,
    pub special: bool,
    pub ro_target: String,
    pub en_target: String,
}

/// The EN page always gets the RO page's RO link; the RO page gets the EN page's EN
/// link unless the pair is a special term.
pub fn sync_pair(ro: &str, en: &str, base: &str) -> Result<PairUpdate, String> {
    let ro_links = flags::flag_links(ro, base).ok_or("FLAGS region missing in RO file")?;
    let en_links = flags::flag_links(en, base).ok_or("FLAGS region missing in EN file")?;
    let ro_target = ro_links.ro.ok_or("RO file has no RO flag link")?;
    let en_target = en_links.en.ok_or("EN file has no EN flag link")?;

    let special = is_special_term(&ro_target, &en_target);
    let (en_updated, en_changed) = flags::set_flag_href(en, base, Lang::Ro, &ro_target);
    let ro_updated = if special {
        None
    } else {
        let (updated, changed) = flags::set_flag_href(ro, base, Lang::En, &en_target);
        changed.then_some(updated)
    };

    Ok(PairUpdate {
        ro: ro_updated,
        en: en_changed.then_some(en_updated),
        special,
        ro_target,
        en_target,
    })
}

fn index_by_id(pages: Vec<Page>) -> HashMap<u32, Page> {
    let mut by_id = HashMap::new();
    for page in pages {
        match page.item_id() {
            Some(id) => {
                if let Some(previous) = by_id.insert(id, page) {
                    debug!(id, file = %previous.file_name, "id seen twice, last file wins");
                }
            }
            None => debug!(file = %page.file_name, "no id"),
        }
    }
    by_id
}

/// Pair RO pages with converted EN pages by ID and cross-link their FLAGS.
pub fn run(settings: &Settings, dry_run: bool) -> Result<FlagSyncReport> {
    let mut ro = index_by_id(page::load_dir(&settings.ro_dir)?);
    let mut en = index_by_id(page::load_dir(&settings.output_dir)?);

    let mut report = FlagSyncReport {
        ro_indexed: ro.len(),
        en_indexed: en.len(),
        ..Default::default()
    };

    let mut ids: Vec<u32> = ro.keys().filter(|id| en.contains_key(id)).copied().collect();
    ids.sort_unstable();
    report.pairs = ids.len();
    info!("{} RO/EN pairs share an ID", ids.len());

    for id in ids {
        let (Some(ro_page), Some(en_page)) = (ro.get_mut(&id), en.get_mut(&id)) else {
            continue;
        };
        let update = match sync_pair(&ro_page.content, &en_page.content, &settings.base_url) {
            Ok(u) => u,
            Err(reason) => {
                warn!("ID {} ({} / {}): {}", id, ro_page.file_name, en_page.file_name, reason);
                report.failed.push((id, reason));
                continue;
            }
        };

        if update.special {
            report.special.push(SpecialTerm {
                id,
                ro_file: ro_page.file_name.clone(),
                en_file: en_page.file_name.clone(),
                ro_target: update.ro_target.clone(),
                en_target: update.en_target.clone(),
            });
        }

        if update.ro.is_none() && update.en.is_none() {
            report.unchanged += 1;
            continue;
        }
        if let Some(content) = update.ro {
            ro_page.save(content, dry_run)?;
        }
        if let Some(content) = update.en {
            en_page.save(content, dry_run)?;
        }
        debug!(id, ro = %ro_page.file_name, en = %en_page.file_name, "flags synced");
        report.updated += 1;
    }
    Ok(report)
}

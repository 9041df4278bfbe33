use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use super::regions::{self, FLAGS_END, FLAGS_START};
use super::Lang;

static ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)<a\s[^>]*?href="([^"]*)"[^>]*>.*?</a>"#).unwrap());

const RO_MARKERS: [&str; 5] = [
    r#"title="ro""#,
    r#"alt="ro""#,
    "flag_lang_ro",
    r#"cunt_code="+40""#,
    ">Romania<",
];
const EN_MARKERS: [&str; 5] = [
    r#"title="en""#,
    r#"alt="en""#,
    "flag_lang_en",
    r#"cunt_code="+1""#,
    ">United States<",
];

/// Link targets of the language anchors, relative to `{base}/` (RO) and `{base}/en/` (EN).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagLinks {
    pub ro: Option<String>,
    pub en: Option<String>,
}

impl FlagLinks {
    pub fn both(&self) -> Option<(&str, &str)> {
        Some((self.ro.as_deref()?, self.en.as_deref()?))
    }
}

#[derive(Debug, Clone)]
pub struct FlagAnchor {
    pub lang: Lang,
    /// Link target after the language prefix, not yet normalized.
    pub target: String,
    /// Byte range of the href value in the whole page.
    pub href: Range<usize>,
}

/// NBSP becomes a space, en/em dashes become `-`, surrounding whitespace goes.
pub fn normalize_link(value: &str) -> String {
    value
        .replace('\u{a0}', " ")
        .replace(['\u{2013}', '\u{2014}'], "-")
        .trim()
        .to_string()
}

fn marker_lang(anchor: &str) -> Option<Lang> {
    if RO_MARKERS.iter().any(|m| anchor.contains(m)) {
        Some(Lang::Ro)
    } else if EN_MARKERS.iter().any(|m| anchor.contains(m)) {
        Some(Lang::En)
    } else {
        None
    }
}

/// Path after `{base}/`, leading slashes dropped. `None` for foreign hosts.
fn site_path<'a>(href: &'a str, base: &str) -> Option<&'a str> {
    let rest = href.strip_prefix(base)?;
    if !rest.is_empty() && !rest.starts_with('/') {
        return None;
    }
    Some(rest.trim_start_matches('/'))
}

fn target_for(lang: Lang, path: &str) -> Option<&str> {
    match lang {
        Lang::Ro if !path.starts_with("en/") => Some(path),
        Lang::En => path.strip_prefix("en/"),
        _ => None,
    }
}

/// Language anchors of the FLAGS region, in document order.
pub fn flag_anchors(content: &str, base: &str) -> Vec<FlagAnchor> {
    let Some(region) = regions::inner_range(content, FLAGS_START, FLAGS_END) else {
        return Vec::new();
    };
    let offset = region.start;
    ANCHOR_RE
        .captures_iter(&content[region])
        .filter_map(|caps| {
            let anchor = caps.get(0)?.as_str();
            let href = caps.get(1)?;
            let lang = marker_lang(anchor)?;
            let target = target_for(lang, site_path(href.as_str(), base)?)?;
            Some(FlagAnchor {
                lang,
                target: target.to_string(),
                href: offset + href.start()..offset + href.end(),
            })
        })
        .collect()
}

/// Normalized RO/EN link targets, or `None` when the page has no FLAGS region.
pub fn flag_links(content: &str, base: &str) -> Option<FlagLinks> {
    regions::flags_inner(content)?;
    let anchors = flag_anchors(content, base);
    let first = |lang: Lang| {
        anchors
            .iter()
            .find(|a| a.lang == lang)
            .map(|a| normalize_link(&a.target))
    };
    Some(FlagLinks {
        ro: first(Lang::Ro),
        en: first(Lang::En),
    })
}

pub fn page_url(base: &str, lang: Lang, target: &str) -> String {
    match lang {
        Lang::Ro => format!("{}/{}", base, target),
        Lang::En => format!("{}/en/{}", base, target),
    }
}

/// Point the first `lang` anchor of the FLAGS region at `target`. Only the href value
/// changes, the rest of the anchor markup is kept. Returns the text and whether it changed.
pub fn set_flag_href(content: &str, base: &str, lang: Lang, target: &str) -> (String, bool) {
    let Some(anchor) = flag_anchors(content, base).into_iter().find(|a| a.lang == lang) else {
        return (content.to_string(), false);
    };
    let url = page_url(base, lang, target);
    if content[anchor.href.clone()] == url {
        return (content.to_string(), false);
    }
    (regions::replace_range(content, anchor.href, &url), true)
}

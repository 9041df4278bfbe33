use std::sync::LazyLock;

use regex::{NoExpand, Regex};

use super::regions::{self, BODY_START};

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)<h1\s+class="den_articol"[^>]*>(.*?)</h1>"#).unwrap());
static HEAD_TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<title>.*?</title>").unwrap());
static CANONICAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<link\s+rel="canonical"\s+href="([^"]*)""#).unwrap());
static BYLINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)<td class="text_dreapta">(.*?)</td>"#).unwrap());
static BYLINE_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)On\s+(.*?),\s+in\b").unwrap());
static BYLINE_DATE_LOOSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"On (.*?),").unwrap());
static BYLINE_DATE_SET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<td class="text_dreapta">On .*?, in"#).unwrap());
static ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)<a\s[^>]*?href="([^"]*)"[^>]*>(.*?)</a>"#).unwrap());
static QUOTE_AFTER_BODY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)^\s*<p class="text_obisnuit2"[^>]*>\s*<em>(.*?)</em>"#).unwrap()
});
static LEAD_P_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)<p class="text_obisnuit2"[^>]*>(.*?)</p>"#).unwrap());
static LEAD_ANY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<(p|h2) class="text_obisnuit2"[^>]*>(.*?)</(?:p|h2)>"#).unwrap()
});
static EM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<em>(.*?)</em>").unwrap());
static META_DESC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<meta name="description" content="(.*?)">"#).unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static SPACES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

const DESCRIPTION_STOP: &str = "Latest articles accessed by readers";
const DESCRIPTION_SENTENCES: usize = 8;

/// Date and category cell of an article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Byline {
    pub date: String,
    pub category_url: String,
    pub category_title: String,
}

/// Tags removed, entities decoded, whitespace collapsed.
pub fn plain_text(html: &str) -> String {
    let stripped = TAG_RE.replace_all(html, "");
    let decoded = html_escape::decode_html_entities(&stripped);
    SPACES_RE.replace_all(decoded.trim(), " ").into_owned()
}

pub fn title(content: &str) -> Option<String> {
    let caps = TITLE_RE.captures(content)?;
    Some(plain_text(&caps[1])).filter(|t| !t.is_empty())
}

/// Set both the `<title>` element and the article heading.
pub fn set_title(content: &str, head: &str, heading: &str) -> String {
    let with_head = HEAD_TITLE_RE.replace(content, NoExpand(&format!("<title>{}</title>", head)));
    TITLE_RE
        .replace(
            &with_head,
            NoExpand(&format!(
                r#"<h1 class="den_articol" itemprop="name">{}</h1>"#,
                heading
            )),
        )
        .into_owned()
}

pub fn canonical(content: &str) -> Option<String> {
    CANONICAL_RE
        .captures(content)
        .map(|caps| caps[1].trim().to_string())
        .filter(|url| !url.is_empty())
}

/// Point the canonical link at `url`, keeping the rest of the tag. `None` when the
/// page has no canonical link.
pub fn set_canonical(content: &str, url: &str) -> Option<(String, bool)> {
    let href = CANONICAL_RE.captures(content)?.get(1)?.range();
    if content[href.clone()] == *url {
        return Some((content.to_string(), false));
    }
    Some((regions::replace_range(content, href, url), true))
}

fn byline_cell(content: &str) -> Option<&str> {
    BYLINE_RE
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Raw date text of the byline, e.g. `March 14, 2025`.
pub fn byline_date(content: &str) -> Option<String> {
    let cell = byline_cell(content)?;
    let text = plain_text(cell);
    let caps = BYLINE_DATE_RE
        .captures(&text)
        .or_else(|| BYLINE_DATE_LOOSE_RE.captures(&text))?;
    Some(caps[1].trim().to_string())
}

pub fn byline(content: &str) -> Option<Byline> {
    let cell = byline_cell(content)?;
    let date = byline_date(content)?;
    let anchor = ANCHOR_RE.captures(cell)?;
    Some(Byline {
        date,
        category_url: anchor[1].trim().to_string(),
        category_title: plain_text(&anchor[2]),
    })
}

/// Last path segment of a category URL without `.html`:
/// `https://…/ro/leadership-magic.html` -> `leadership-magic`.
pub fn category_slug(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url).trim_end_matches('/');
    let last = path.rsplit('/').next().unwrap_or(path);
    last.strip_suffix(".html").unwrap_or(last)
}

pub fn render_byline(date: &str, category_url: &str, category_title: &str, author: &str) -> String {
    format!(
        r#"On {date}, in <a href="{category_url}" title="View all articles from {category_title}" class="external" rel="category tag">{category_title}</a>, by {author}"#
    )
}

/// Replace the inner HTML of the first byline cell. `None` when the page has none.
pub fn set_byline(content: &str, inner: &str) -> Option<String> {
    let range = BYLINE_RE.captures(content)?.get(1)?.range();
    Some(regions::replace_range(content, range, inner))
}

/// Replace only the date part of every `On …, in` byline.
pub fn set_byline_date(content: &str, date: &str) -> String {
    BYLINE_DATE_SET_RE
        .replace_all(
            content,
            NoExpand(&format!(r#"<td class="text_dreapta">On {}, in"#, date)),
        )
        .into_owned()
}

/// The emphasized lead quote: the `text_obisnuit2` paragraph right after the
/// generated-body marker, else the first such paragraph carrying `<em>`.
pub fn quote(content: &str) -> Option<String> {
    if let Some(pos) = content.find(BODY_START) {
        let after = &content[pos + BODY_START.len()..];
        if let Some(caps) = QUOTE_AFTER_BODY_RE.captures(after) {
            let text = plain_text(&caps[1]);
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    let first = LEAD_P_RE.captures(content)?;
    let em = EM_RE.captures(&first[1])?;
    Some(plain_text(&em[1])).filter(|t| !t.is_empty())
}

/// Text of the first `text_obisnuit2` paragraph or heading.
pub fn lead(content: &str) -> Option<String> {
    let caps = LEAD_ANY_RE.captures(content)?;
    Some(plain_text(&caps[2])).filter(|t| !t.is_empty())
}

pub fn meta_description(content: &str) -> Option<String> {
    META_DESC_RE.captures(content).map(|caps| caps[1].to_string())
}

/// Replace the first meta description. Double quotes are dropped from `description`.
pub fn set_meta_description(content: &str, description: &str) -> String {
    let tag = format!(
        r#"<meta name="description" content="{}">"#,
        description.replace('"', "")
    );
    META_DESC_RE.replace(content, NoExpand(&tag)).into_owned()
}

/// Split after `.`, `!` or `?` followed by whitespace.
fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut prev: Option<char> = None;
    let mut iter = text.char_indices().peekable();
    while let Some((i, c)) = iter.next() {
        if c.is_whitespace() && matches!(prev, Some('.' | '!' | '?')) {
            out.push(&text[start..i]);
            while let Some(&(_, next)) = iter.peek() {
                if !next.is_whitespace() {
                    break;
                }
                iter.next();
            }
            start = iter.peek().map(|&(j, _)| j).unwrap_or(text.len());
            prev = None;
            continue;
        }
        prev = Some(c);
    }
    if start < text.len() {
        out.push(&text[start..]);
    }
    out
}

/// Description built from the page's `text_obisnuit2` paragraphs: the first sentences,
/// without quotes, asterisks or markup.
pub fn description_from_quotes(content: &str) -> Option<String> {
    let joined = LEAD_P_RE
        .captures_iter(content)
        .map(|caps| caps[1].to_string())
        .collect::<Vec<_>>()
        .join(" ")
        .replace('"', "");
    let mut description = sentences(&joined)
        .into_iter()
        .take(DESCRIPTION_SENTENCES)
        .collect::<Vec<_>>()
        .join(" ");
    if let Some(pos) = description.find(DESCRIPTION_STOP) {
        description.truncate(pos);
    }
    let cleaned = TAG_RE.replace_all(&description.replace(['"', '*'], ""), "").into_owned();
    let cleaned = cleaned.replace("<e ", " ").replace(['<', '>'], "");
    let cleaned = SPACES_RE.replace_all(cleaned.trim(), " ").into_owned();
    Some(cleaned).filter(|d| !d.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::fixtures;

    #[test]
    fn canonical_href_is_replaced() {
        let url = "https://neculaifantanaru.com/en/other.html";
        let (out, changed) = set_canonical(fixtures::EN_ARTICLE, url).unwrap();
        assert!(changed);
        assert!(out.contains(r#"<link rel="canonical" href="https://neculaifantanaru.com/en/other.html" />"#));

        let (same, changed) = set_canonical(&out, url).unwrap();
        assert!(!changed);
        assert_eq!(same, out);
        assert!(set_canonical("<p>none</p>", url).is_none());
    }

    #[test]
    fn extracts_header_fields() {
        assert_eq!(title(fixtures::EN_ARTICLE).as_deref(), Some("Memory Of Time"));
        assert_eq!(
            canonical(fixtures::EN_ARTICLE).as_deref(),
            Some("https://neculaifantanaru.com/en/memory-of-time.html")
        );
        assert_eq!(
            meta_description(fixtures::EN_ARTICLE).as_deref(),
            Some("About the memory of time.")
        );
    }

    #[test]
    fn byline_keeps_the_year() {
        let b = byline(fixtures::RO_ARTICLE).unwrap();
        assert_eq!(b.date, "Martie 14, 2025");
        assert_eq!(b.category_url, "https://neculaifantanaru.com/principiile-conducerii.html");
        assert_eq!(b.category_title, "Principiile conducerii");
    }

    #[test]
    fn byline_without_in_falls_back() {
        let html = r#"<td class="text_dreapta">On May 2, by someone</td>"#;
        assert_eq!(byline_date(html).as_deref(), Some("May 2"));
        assert!(byline(html).is_none());
    }

    #[test]
    fn category_slugs() {
        assert_eq!(category_slug("https://neculaifantanaru.com/principiile-conducerii.html"), "principiile-conducerii");
        assert_eq!(category_slug("ro/leadership-magic.html"), "leadership-magic");
        assert_eq!(category_slug("leadership-magic"), "leadership-magic");
    }

    #[test]
    fn rewrites_byline() {
        let inner = render_byline(
            "March 14, 2025",
            "https://neculaifantanaru.com/en/top-leadership.html",
            "Top Leadership",
            "Neculai Fantanaru",
        );
        let out = set_byline(fixtures::EN_ARTICLE, &inner).unwrap();
        let b = byline(&out).unwrap();
        assert_eq!(b.category_title, "Top Leadership");
        assert!(out.contains(r#"title="View all articles from Top Leadership" class="external" rel="category tag">"#));

        let dated = set_byline_date(fixtures::EN_ARTICLE, "June 01, 2026");
        assert_eq!(byline_date(&dated).as_deref(), Some("June 01, 2026"));
    }

    #[test]
    fn quote_prefers_the_body_lead() {
        assert_eq!(
            quote(fixtures::EN_ARTICLE).as_deref(),
            Some("Time does not forgive, but memory tames it.")
        );
        assert_eq!(
            quote(fixtures::RO_ARTICLE).as_deref(),
            Some("Timpul nu iartă, dar memoria îl îmblânzește.")
        );
        let no_em = r#"<p class="text_obisnuit2">plain</p>"#;
        assert!(quote(no_em).is_none());
        assert_eq!(lead(no_em).as_deref(), Some("plain"));
        assert_eq!(lead(r#"<h2 class="text_obisnuit2"><em>Head</em></h2>"#).as_deref(), Some("Head"));
    }

    #[test]
    fn description_stops_at_the_footer() {
        let html = r#"<p class="text_obisnuit2"><em>One "two". Three*!</em></p>
<p class="text_obisnuit2">Latest articles accessed by readers:</p>"#;
        assert_eq!(description_from_quotes(html).as_deref(), Some("One two. Three!"));
    }

    #[test]
    fn description_keeps_eight_sentences() {
        let body: String = (1..=10).map(|i| format!("S{}. ", i)).collect();
        let html = format!(r#"<p class="text_obisnuit2">{}</p>"#, body);
        assert_eq!(
            description_from_quotes(&html).as_deref(),
            Some("S1. S2. S3. S4. S5. S6. S7. S8.")
        );
    }

    #[test]
    fn sets_title_and_description() {
        let out = set_title(fixtures::TEMPLATE, "Memory Of Time | Neculai Fantanaru (en)", "Memory Of Time");
        assert!(out.contains("<title>Memory Of Time | Neculai Fantanaru (en)</title>"));
        assert_eq!(title(&out).as_deref(), Some("Memory Of Time"));

        let out = set_meta_description(&out, r#"a "quoted" text"#);
        assert_eq!(meta_description(&out).as_deref(), Some("a quoted text"));
    }
}

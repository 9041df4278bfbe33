use std::ops::Range;
use std::sync::LazyLock;

use regex::{NoExpand, Regex};

pub const FLAGS_START: &str = "<!-- FLAGS_1 -->";
pub const FLAGS_END: &str = "<!-- FLAGS -->";
pub const ARTICLE_START: &str = "<!-- ARTICOL START -->";
pub const ARTICLE_END: &str = "<!-- ARTICOL FINAL -->";
pub const BODY_START: &str = "<!-- SASA-1 -->";
pub const BODY_END: &str = "<!-- SASA-2 -->";
pub const LISTING_START: &str = "<!-- ARTICOL CATEGORIE START -->";
pub const LISTING_END: &str = "<!-- ARTICOL CATEGORIE FINAL -->";

pub const ID_NOTE: &str = "Replace that with your rating id";

static ITEM_ID_RES: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"<!-- \s*\$item_id\s*=\s*(\d+);.*?-->").unwrap(),
        Regex::new(r"<!-- item_id = (\d+); -->").unwrap(),
        Regex::new(r"<!-- id: (\d+) -->").unwrap(),
    ]
});
static ITEM_ID_COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<!-- \s*\$item_id\s*=\s*\d+;.*?-->").unwrap());
static ITEM_ID_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<!-- \s*\$item_id\s*=[^\n]*?-->\n?").unwrap());

/// Article id from the first recognized id comment.
pub fn item_id(content: &str) -> Option<u32> {
    ITEM_ID_RES
        .iter()
        .find_map(|re| re.captures(content))
        .and_then(|caps| caps[1].parse().ok())
}

pub fn id_comment(id: impl std::fmt::Display, note: &str) -> String {
    format!("<!-- $item_id = {}; // {} -->", id, note)
}

/// Rewrite every `$item_id` comment to the canonical form. Returns the new text and
/// the number of comments replaced.
pub fn set_item_id(content: &str, id: u32) -> (String, usize) {
    let count = ITEM_ID_COMMENT_RE.find_iter(content).count();
    if count == 0 {
        return (content.to_string(), 0);
    }
    let replacement = id_comment(id, ID_NOTE);
    let updated = ITEM_ID_COMMENT_RE
        .replace_all(content, NoExpand(&replacement))
        .into_owned();
    (updated, count)
}

/// Replace the existing id comment line, or prepend one when the page has none.
pub fn ensure_item_id(content: &str, id: &str, note: &str) -> String {
    let line = format!("{}\n", id_comment(id, note));
    if ITEM_ID_LINE_RE.is_match(content) {
        ITEM_ID_LINE_RE
            .replace_all(content, NoExpand(&line))
            .into_owned()
    } else {
        format!("{}{}", line, content)
    }
}

/// Byte range strictly between the first `open` marker and the next `close` marker.
pub fn inner_range(content: &str, open: &str, close: &str) -> Option<Range<usize>> {
    let start = content.find(open)? + open.len();
    let end = start + content[start..].find(close)?;
    Some(start..end)
}

pub fn replace_range(content: &str, range: Range<usize>, with: &str) -> String {
    let mut out = String::with_capacity(content.len() + with.len());
    out.push_str(&content[..range.start]);
    out.push_str(with);
    out.push_str(&content[range.end..]);
    out
}

pub fn flags_inner(content: &str) -> Option<&str> {
    inner_range(content, FLAGS_START, FLAGS_END).map(|r| &content[r])
}

pub fn article_body(content: &str) -> Option<&str> {
    inner_range(content, ARTICLE_START, ARTICLE_END).map(|r| &content[r])
}

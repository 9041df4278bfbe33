use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::{Captures, Regex};

const MONTHS: [(&str, &str); 12] = [
    ("ianuarie", "January"),
    ("februarie", "February"),
    ("martie", "March"),
    ("aprilie", "April"),
    ("mai", "May"),
    ("iunie", "June"),
    ("iulie", "July"),
    ("august", "August"),
    ("septembrie", "September"),
    ("octombrie", "October"),
    ("noiembrie", "November"),
    ("decembrie", "December"),
];

static RO_MONTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    let names: Vec<&str> = MONTHS.iter().map(|(ro, _)| *ro).collect();
    Regex::new(&format!(r"(?i)\b({})\b", names.join("|"))).unwrap()
});
static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").unwrap());
static TRAILING_YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{4}$").unwrap());
static MONTH_DAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Za-z]+)\s+(\d+)").unwrap());

/// Romanian month names become English ones, any case.
pub fn translate_month(s: &str) -> String {
    RO_MONTH_RE
        .replace_all(s, |caps: &Captures| {
            let found = caps[1].to_lowercase();
            MONTHS
                .iter()
                .find(|(ro, _)| *ro == found)
                .map(|(_, en)| en.to_string())
                .unwrap_or_else(|| caps[1].to_string())
        })
        .into_owned()
}

/// Appends `, {year}` when `date` does not already end in a year.
pub fn ensure_year(date: &str, year: i32) -> String {
    let date = date.trim();
    if TRAILING_YEAR_RE.is_match(date) {
        date.to_string()
    } else {
        format!("{}, {}", date, year)
    }
}

/// Dates as written in bylines: `March 14, 2025` or `14 March 2025`. A date that
/// does not parse but still names a year falls back to its month and day, or to
/// January 1st of that year.
pub fn parse_listing_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    for fmt in ["%B %d, %Y", "%d %B %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }
    let year: i32 = YEAR_RE.find(s)?.as_str().parse().ok()?;
    let recovered = MONTH_DAY_RE.captures(s).and_then(|caps| {
        NaiveDate::parse_from_str(&format!("{} {}, {}", &caps[1], &caps[2], year), "%B %d, %Y").ok()
    });
    recovered.or_else(|| NaiveDate::from_ymd_opt(year, 1, 1))
}

/// Byline form of a date, e.g. `March 04, 2025`.
pub fn byline_date(date: NaiveDate) -> String {
    date.format("%B %d, %Y").to_string()
}

/// Comparable form of a byline date: month translated, lowercase, no commas.
pub fn comparable(date: &str) -> String {
    translate_month(date).to_lowercase().replace(',', "").trim().to_string()
}

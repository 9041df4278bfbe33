use std::sync::LazyLock;

use regex::Regex;

static NON_SLUG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9\-]+").unwrap());
static DASHES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-+").unwrap());
static NON_WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9\s]").unwrap());
static SPACES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static ROMAN_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(.*-)(xv|xiv|xiii|xii|xi|x|ix|viii|vii|vi|v|iv|iii|ii|i)(\.html)?$").unwrap()
});

pub fn transliterate(s: &str) -> String {
    deunicode::deunicode(s)
}

pub fn slugify(title: &str) -> String {
    let ascii = transliterate(title).to_lowercase();
    let dashed = NON_SLUG_RE.replace_all(&ascii, "-");
    DASHES_RE
        .replace_all(&dashed, "-")
        .trim_matches('-')
        .to_string()
}

pub fn file_name_for(title: &str) -> String {
    format!("{}.html", slugify(title))
}

/// Lowercase ASCII words separated by single spaces, for title comparison.
pub fn normalize_title(title: &str) -> String {
    let ascii = transliterate(title).to_lowercase();
    let words = NON_WORD_RE.replace_all(&ascii, "");
    SPACES_RE.replace_all(words.trim(), " ").into_owned()
}

/// First letter of every word upper case, the rest lower case.
pub fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Upper-cases a trailing roman numeral segment: `legea-ii.html` -> `legea-II.html`.
pub fn standardize_roman_suffix(name: &str) -> String {
    match ROMAN_SUFFIX_RE.captures(name) {
        Some(caps) => format!(
            "{}{}{}",
            &caps[1],
            caps[2].to_uppercase(),
            caps.get(3).map(|m| m.as_str()).unwrap_or("")
        ),
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_strip_diacritics_and_punctuation() {
        assert_eq!(slugify("Puterea Științei: O lecție!"), "puterea-stiintei-o-lectie");
        assert_eq!(slugify("  --Already--dashed-- "), "already-dashed");
        assert_eq!(file_name_for("Memory of Time"), "memory-of-time.html");
    }

    #[test]
    fn normalized_titles_compare_loosely() {
        assert_eq!(normalize_title("Memoria   Timpului!"), "memoria timpului");
        assert_eq!(normalize_title("Îmblânzirea, timpului"), normalize_title("imblanzirea timpului"));
    }

    #[test]
    fn title_case_each_word() {
        assert_eq!(title_case("the MEMORY of time"), "The Memory Of Time");
        assert_eq!(title_case("  "), "");
    }

    #[test]
    fn roman_suffixes() {
        assert_eq!(standardize_roman_suffix("legea-ii.html"), "legea-II.html");
        assert_eq!(standardize_roman_suffix("legea-xiv.html"), "legea-XIV.html");
        assert_eq!(standardize_roman_suffix("legea-II.html"), "legea-II.html");
        assert_eq!(standardize_roman_suffix("legea-mix.html"), "legea-mix.html");
        assert_eq!(standardize_roman_suffix("civil.html"), "civil.html");
    }
}

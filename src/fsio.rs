use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Latin1,
}

/// Read an HTML file as UTF-8, falling back to Latin-1 (which accepts any byte).
pub fn read_html(path: &Path) -> Result<(String, Encoding)> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok((text, Encoding::Utf8)),
        Err(err) => {
            debug!(file = %path.display(), "not valid UTF-8, decoding as Latin-1");
            let text = err.into_bytes().iter().map(|&b| b as char).collect();
            Ok((text, Encoding::Latin1))
        }
    }
}

pub fn write_html(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

fn is_html(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("html"))
}

/// HTML files directly inside `dir`, sorted by file name.
pub fn list_html(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("Directory does not exist: {}", dir.display());
    }
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to list {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && is_html(p))
        .collect();
    files.sort_by_key(|p| file_name(p));
    Ok(files)
}

/// HTML files anywhere below `dir`.
pub fn walk_html(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("Directory does not exist: {}", dir.display());
    }
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_html(e.path()))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    Ok(files)
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn file_stem(name: &str) -> &str {
    name.strip_suffix(".html").unwrap_or(name)
}

/// Copy `src` into `dir`, keeping its file name. Overwrites.
pub fn copy_into(src: &Path, dir: &Path) -> Result<PathBuf> {
    let dest = dir.join(file_name(src));
    fs::copy(src, &dest)
        .with_context(|| format!("Failed to copy {} to {}", src.display(), dest.display()))?;
    Ok(dest)
}

/// Empty `dir`, creating it when missing.
pub fn clear_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
        debug!(removed = %path.display());
    }
    Ok(())
}

/// Find `name` in `dir`, ignoring ASCII case. Exact matches win.
pub fn find_case_insensitive(dir: &Path, name: &str) -> Option<PathBuf> {
    let exact = dir.join(name);
    if exact.is_file() {
        return Some(exact);
    }
    fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .find(|p| file_name(p).eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin1_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.html");
        // 0xE2 followed by ASCII is not valid UTF-8
        fs::write(&path, [b'c', 0xE2, b'n', b'd']).unwrap();
        let (text, enc) = read_html(&path).unwrap();
        assert_eq!(enc, Encoding::Latin1);
        assert_eq!(text, "c\u{e2}nd");
    }

    #[test]
    fn lists_only_html_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.html", "a.HTML", "notes.txt"] {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/c.html"), "x").unwrap();

        let names: Vec<String> = list_html(dir.path()).unwrap().iter().map(|p| file_name(p)).collect();
        assert_eq!(names, vec!["a.HTML", "b.html"]);
        assert_eq!(walk_html(dir.path()).unwrap().len(), 3);
    }

    #[test]
    fn case_insensitive_lookup() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Memoria-II.html"), "x").unwrap();
        let found = find_case_insensitive(dir.path(), "memoria-ii.html").unwrap();
        assert_eq!(file_name(&found), "Memoria-II.html");
        assert!(find_case_insensitive(dir.path(), "missing.html").is_none());
    }

    #[test]
    fn missing_dir_is_an_error() {
        let err = list_html(Path::new("/definitely/not/here")).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}

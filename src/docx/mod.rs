//! The slice of WordprocessingML the blog workflow needs: paragraphs with
//! alignment, and runs with bold, italic, colour and size.

mod read;
mod write;

pub use read::{parse_document_xml, read_paragraphs};
pub use write::write_document;

use thiserror::Error;

pub const DOCUMENT_PART: &str = "word/document.xml";

#[derive(Debug, Error)]
pub enum DocxError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("document has no {0} part")]
    MissingPart(&'static str),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocRun {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    /// Hex RGB, e.g. `FF0000`.
    pub color: Option<String>,
    pub size_half_points: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocParagraph {
    pub centered: bool,
    pub runs: Vec<DocRun>,
}

impl DocRun {
    pub fn plain(text: impl Into<String>) -> Self {
        DocRun {
            text: text.into(),
            ..Default::default()
        }
    }
}

impl DocParagraph {
    pub fn new(runs: Vec<DocRun>) -> Self {
        DocParagraph {
            centered: false,
            runs,
        }
    }

    pub fn centered(runs: Vec<DocRun>) -> Self {
        DocParagraph {
            centered: true,
            runs,
        }
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// One article of a translation document: a centered title, an optional
/// `ID: N` line, then the body paragraphs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocArticle {
    pub title: String,
    pub id: Option<String>,
    pub body: Vec<DocParagraph>,
}

pub fn id_line(text: &str) -> Option<&str> {
    text.strip_prefix("ID:").map(str::trim)
}

pub fn split_articles(paragraphs: &[DocParagraph]) -> Vec<DocArticle> {
    let mut articles = Vec::new();
    let mut current: Option<DocArticle> = None;
    let mut expect_id = false;

    for para in paragraphs {
        let text = para.text();
        let text = text.trim();

        if para.centered && !text.is_empty() && id_line(text).is_none() {
            articles.extend(current.take());
            current = Some(DocArticle {
                title: text.to_string(),
                id: None,
                body: Vec::new(),
            });
            expect_id = true;
        } else if let (true, Some(id)) = (expect_id, id_line(text)) {
            if let Some(article) = current.as_mut() {
                article.id = Some(id.to_string());
            }
            expect_id = false;
        } else if let Some(article) = current.as_mut() {
            if !text.is_empty() {
                article.body.push(para.clone());
                expect_id = false;
            }
        }
    }
    articles.extend(current);
    articles
}

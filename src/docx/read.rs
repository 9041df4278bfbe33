use std::fs::File;
use std::io::Read;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{DocParagraph, DocRun, DocxError, DOCUMENT_PART};

pub fn read_paragraphs(path: &Path) -> Result<Vec<DocParagraph>, DocxError> {
    let mut archive = zip::ZipArchive::new(File::open(path)?)?;
    let mut part = match archive.by_name(DOCUMENT_PART) {
        Ok(part) => part,
        Err(zip::result::ZipError::FileNotFound) => {
            return Err(DocxError::MissingPart(DOCUMENT_PART))
        }
        Err(e) => return Err(e.into()),
    };
    let mut xml = String::new();
    part.read_to_string(&mut xml)?;
    parse_document_xml(&xml)
}

fn attr(e: &BytesStart, name: &str) -> Result<Option<String>, DocxError> {
    let found = e.try_get_attribute(name).map_err(quick_xml::Error::from)?;
    match found {
        Some(a) => Ok(Some(a.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

/// `<w:b/>` is on, `<w:b w:val="0"/>` / `"false"` is off.
fn toggle(e: &BytesStart) -> Result<bool, DocxError> {
    Ok(!matches!(
        attr(e, "w:val")?.as_deref(),
        Some("0") | Some("false") | Some("off")
    ))
}

#[derive(Default)]
struct State {
    paragraphs: Vec<DocParagraph>,
    para: Option<DocParagraph>,
    run: Option<DocRun>,
    in_text: bool,
}

impl State {
    fn element(&mut self, e: &BytesStart, empty: bool) -> Result<(), DocxError> {
        match e.name().as_ref() {
            b"w:p" => {
                self.para = Some(DocParagraph::default());
                if empty {
                    self.end_paragraph();
                }
            }
            b"w:jc" => {
                if let Some(p) = self.para.as_mut() {
                    p.centered = attr(e, "w:val")?.as_deref() == Some("center");
                }
            }
            b"w:r" => self.run = Some(DocRun::default()),
            b"w:b" => {
                let on = toggle(e)?;
                if let Some(r) = self.run.as_mut() {
                    r.bold = on;
                }
            }
            b"w:i" => {
                let on = toggle(e)?;
                if let Some(r) = self.run.as_mut() {
                    r.italic = on;
                }
            }
            b"w:color" => {
                let value = attr(e, "w:val")?;
                if let Some(r) = self.run.as_mut() {
                    r.color = value.filter(|v| v != "auto");
                }
            }
            b"w:sz" => {
                let value = attr(e, "w:val")?.and_then(|v| v.parse().ok());
                if let Some(r) = self.run.as_mut() {
                    r.size_half_points = value;
                }
            }
            b"w:t" => self.in_text = !empty,
            b"w:tab" => self.push_text("\t"),
            b"w:br" => self.push_text("\n"),
            _ => {}
        }
        Ok(())
    }

    fn push_text(&mut self, text: &str) {
        if let Some(r) = self.run.as_mut() {
            r.text.push_str(text);
        }
    }

    fn end_paragraph(&mut self) {
        if let Some(p) = self.para.take() {
            self.paragraphs.push(p);
        }
    }
}

/// Paragraphs of a `word/document.xml` body.
pub fn parse_document_xml(xml: &str) -> Result<Vec<DocParagraph>, DocxError> {
    let mut reader = Reader::from_str(xml);
    let mut state = State::default();

    loop {
        match reader.read_event()? {
            Event::Start(e) => state.element(&e, false)?,
            Event::Empty(e) => state.element(&e, true)?,
            Event::Text(e) if state.in_text => {
                let text = e.unescape()?;
                state.push_text(&text);
            }
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => state.in_text = false,
                b"w:r" => {
                    if let (Some(run), Some(p)) = (state.run.take(), state.para.as_mut()) {
                        p.runs.push(run);
                    }
                }
                b"w:p" => state.end_paragraph(),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(state.paragraphs)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>
<w:p><w:pPr><w:jc w:val="center"/><w:rPr><w:b/></w:rPr></w:pPr><w:r><w:rPr><w:b/><w:color w:val="FF0000"/></w:rPr><w:t>Memory &amp; Time</w:t></w:r></w:p>
<w:p><w:r><w:rPr><w:b w:val="0"/><w:i/><w:sz w:val="16"/></w:rPr><w:t xml:space="preserve">soft </w:t></w:r><w:r><w:t>words</w:t><w:tab/><w:t>end</w:t></w:r></w:p>
<w:p/>
<w:sectPr/></w:body></w:document>"#;

    #[test]
    fn parses_alignment_and_formatting() {
        let paras = parse_document_xml(BODY).unwrap();
        assert_eq!(paras.len(), 3);

        assert!(paras[0].centered);
        assert_eq!(paras[0].text(), "Memory & Time");
        assert!(paras[0].runs[0].bold);
        assert_eq!(paras[0].runs[0].color.as_deref(), Some("FF0000"));

        let soft = &paras[1].runs[0];
        assert!(!soft.bold);
        assert!(soft.italic);
        assert_eq!(soft.size_half_points, Some(16));
        assert_eq!(soft.text, "soft ");
        assert_eq!(paras[1].text(), "soft words\tend");

        assert!(paras[2].runs.is_empty());
    }

    #[test]
    fn missing_document_part() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.docx");
        let mut zip = zip::ZipWriter::new(File::create(&path).unwrap());
        zip.start_file("other.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.finish().unwrap();

        let err = read_paragraphs(&path).unwrap_err();
        assert!(matches!(err, DocxError::MissingPart(DOCUMENT_PART)));
    }
}

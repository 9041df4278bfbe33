use std::fs::File;
use std::io::Write;
use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;

use super::{DocParagraph, DocRun, DocxError, DOCUMENT_PART};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const WORD_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Write `paragraphs` as a minimal .docx package at `path`, replacing any existing file.
pub fn write_document(path: &Path, paragraphs: &[DocParagraph]) -> Result<(), DocxError> {
    let body = document_xml(paragraphs)?;

    let mut zip = zip::ZipWriter::new(File::create(path)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, data) in [
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("_rels/.rels", ROOT_RELS.as_bytes()),
        (DOCUMENT_PART, body.as_slice()),
    ] {
        zip.start_file(name, options)?;
        zip.write_all(data)?;
    }
    zip.finish()?;
    Ok(())
}

fn document_xml(paragraphs: &[DocParagraph]) -> Result<Vec<u8>, DocxError> {
    let mut w = Writer::new(Vec::new());
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    w.write_event(Event::Start(
        BytesStart::new("w:document").with_attributes([("xmlns:w", WORD_NS)]),
    ))?;
    w.write_event(Event::Start(BytesStart::new("w:body")))?;
    for para in paragraphs {
        write_paragraph(&mut w, para)?;
    }
    w.write_event(Event::Empty(BytesStart::new("w:sectPr")))?;
    w.write_event(Event::End(BytesEnd::new("w:body")))?;
    w.write_event(Event::End(BytesEnd::new("w:document")))?;
    Ok(w.into_inner())
}

fn write_paragraph(w: &mut Writer<Vec<u8>>, para: &DocParagraph) -> Result<(), DocxError> {
    w.write_event(Event::Start(BytesStart::new("w:p")))?;
    if para.centered {
        w.write_event(Event::Start(BytesStart::new("w:pPr")))?;
        w.write_event(Event::Empty(
            BytesStart::new("w:jc").with_attributes([("w:val", "center")]),
        ))?;
        w.write_event(Event::End(BytesEnd::new("w:pPr")))?;
    }
    for run in &para.runs {
        write_run(w, run)?;
    }
    w.write_event(Event::End(BytesEnd::new("w:p")))?;
    Ok(())
}

fn write_run(w: &mut Writer<Vec<u8>>, run: &DocRun) -> Result<(), DocxError> {
    w.write_event(Event::Start(BytesStart::new("w:r")))?;

    let has_props =
        run.bold || run.italic || run.color.is_some() || run.size_half_points.is_some();
    if has_props {
        w.write_event(Event::Start(BytesStart::new("w:rPr")))?;
        if run.bold {
            w.write_event(Event::Empty(BytesStart::new("w:b")))?;
        }
        if run.italic {
            w.write_event(Event::Empty(BytesStart::new("w:i")))?;
        }
        if let Some(color) = &run.color {
            w.write_event(Event::Empty(
                BytesStart::new("w:color").with_attributes([("w:val", color.as_str())]),
            ))?;
        }
        if let Some(size) = run.size_half_points {
            let size = size.to_string();
            w.write_event(Event::Empty(
                BytesStart::new("w:sz").with_attributes([("w:val", size.as_str())]),
            ))?;
        }
        w.write_event(Event::End(BytesEnd::new("w:rPr")))?;
    }

    // tabs and line breaks are elements of their own
    for (i, line) in run.text.split('\n').enumerate() {
        if i > 0 {
            w.write_event(Event::Empty(BytesStart::new("w:br")))?;
        }
        for (j, piece) in line.split('\t').enumerate() {
            if j > 0 {
                w.write_event(Event::Empty(BytesStart::new("w:tab")))?;
            }
            if !piece.is_empty() {
                w.write_event(Event::Start(
                    BytesStart::new("w:t").with_attributes([("xml:space", "preserve")]),
                ))?;
                w.write_event(Event::Text(BytesText::new(piece)))?;
                w.write_event(Event::End(BytesEnd::new("w:t")))?;
            }
        }
    }

    w.write_event(Event::End(BytesEnd::new("w:r")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::read_paragraphs;

    #[test]
    fn written_document_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.docx");
        let paragraphs = vec![
            DocParagraph::centered(vec![DocRun {
                text: "Memory <of> Time".into(),
                bold: true,
                color: Some("FF0000".into()),
                ..Default::default()
            }]),
            DocParagraph::centered(vec![DocRun {
                text: "ID: 346".into(),
                color: Some("808080".into()),
                size_half_points: Some(16),
                ..Default::default()
            }]),
            DocParagraph::new(vec![
                DocRun::plain("plain\tthen "),
                DocRun {
                    text: "leaning".into(),
                    italic: true,
                    ..Default::default()
                },
            ]),
            DocParagraph::default(),
        ];

        write_document(&path, &paragraphs).unwrap();
        let back = read_paragraphs(&path).unwrap();
        assert_eq!(back, paragraphs);
    }
}

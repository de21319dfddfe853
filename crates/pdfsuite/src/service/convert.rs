//! PDF to Word conversion. Extracted page text becomes one WordprocessingML
//! paragraph per line, with explicit page breaks between source pages.

use std::io::{Cursor, Write};
use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer as XmlWriter;
use tracing::{debug, info_span};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ServiceError;

use super::text::{extract_page_texts, load_document};

const WORDML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#;

const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

pub fn convert_to_docx(input: &Path, output: &Path) -> Result<(), ServiceError> {
    let _span = info_span!("service.convert").entered();

    let doc = load_document(input)?;
    let pages = extract_page_texts(&doc);
    debug!(pages = pages.len(), "converting to Word");

    let document_xml = build_document_xml(&pages)?;
    let archive = build_docx_archive(&document_xml)?;

    std::fs::write(output, archive).map_err(|e| ServiceError::Io {
        path: output.to_path_buf(),
        source: e,
    })
}

fn docx_err<E: std::fmt::Display>(e: E) -> ServiceError {
    ServiceError::Docx(format!("XML write failed: {}", e))
}

fn build_document_xml(pages: &[String]) -> Result<Vec<u8>, ServiceError> {
    let mut writer = XmlWriter::new(Cursor::new(Vec::new()));
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
        .map_err(docx_err)?;

    let mut root = BytesStart::new("w:document");
    root.push_attribute(("xmlns:w", WORDML_NS));
    writer.write_event(Event::Start(root)).map_err(docx_err)?;
    writer
        .write_event(Event::Start(BytesStart::new("w:body")))
        .map_err(docx_err)?;

    for (page_no, page) in pages.iter().enumerate() {
        if page_no > 0 {
            write_page_break(&mut writer)?;
        }
        let mut wrote_any = false;
        for line in page.lines() {
            write_paragraph(&mut writer, line)?;
            wrote_any = true;
        }
        // A blank page still occupies a paragraph so page breaks line up.
        if !wrote_any {
            write_paragraph(&mut writer, "")?;
        }
    }

    writer
        .write_event(Event::End(BytesEnd::new("w:body")))
        .map_err(docx_err)?;
    writer
        .write_event(Event::End(BytesEnd::new("w:document")))
        .map_err(docx_err)?;

    Ok(writer.into_inner().into_inner())
}

fn write_paragraph(
    writer: &mut XmlWriter<Cursor<Vec<u8>>>,
    text: &str,
) -> Result<(), ServiceError> {
    writer
        .write_event(Event::Start(BytesStart::new("w:p")))
        .map_err(docx_err)?;
    writer
        .write_event(Event::Start(BytesStart::new("w:r")))
        .map_err(docx_err)?;

    let mut t = BytesStart::new("w:t");
    t.push_attribute(("xml:space", "preserve"));
    writer.write_event(Event::Start(t)).map_err(docx_err)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(docx_err)?;
    writer
        .write_event(Event::End(BytesEnd::new("w:t")))
        .map_err(docx_err)?;

    writer
        .write_event(Event::End(BytesEnd::new("w:r")))
        .map_err(docx_err)?;
    writer
        .write_event(Event::End(BytesEnd::new("w:p")))
        .map_err(docx_err)
}

fn write_page_break(writer: &mut XmlWriter<Cursor<Vec<u8>>>) -> Result<(), ServiceError> {
    writer
        .write_event(Event::Start(BytesStart::new("w:p")))
        .map_err(docx_err)?;
    writer
        .write_event(Event::Start(BytesStart::new("w:r")))
        .map_err(docx_err)?;

    let mut br = BytesStart::new("w:br");
    br.push_attribute(("w:type", "page"));
    writer.write_event(Event::Empty(br)).map_err(docx_err)?;

    writer
        .write_event(Event::End(BytesEnd::new("w:r")))
        .map_err(docx_err)?;
    writer
        .write_event(Event::End(BytesEnd::new("w:p")))
        .map_err(docx_err)
}

fn build_docx_archive(document_xml: &[u8]) -> Result<Vec<u8>, ServiceError> {
    let zip_err = |e: zip::result::ZipError| ServiceError::Docx(format!("archive failed: {}", e));
    let io_err = |e: std::io::Error| ServiceError::Docx(format!("archive failed: {}", e));

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("[Content_Types].xml", options)
        .map_err(zip_err)?;
    zip.write_all(CONTENT_TYPES_XML.as_bytes()).map_err(io_err)?;

    zip.start_file("_rels/.rels", options).map_err(zip_err)?;
    zip.write_all(RELS_XML.as_bytes()).map_err(io_err)?;

    zip.start_file("word/document.xml", options).map_err(zip_err)?;
    zip.write_all(document_xml).map_err(io_err)?;

    Ok(zip.finish().map_err(zip_err)?.into_inner())
}

//! EPUB 3 export. Each source page becomes a chapter document; the table of
//! contents groups chapters under detected section headings, with everything
//! unmatched collected in an "Other" bucket.

use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::OnceLock;

use chrono::Utc;
use image::{ImageFormat, Rgb, RgbImage};
use regex::Regex;
use tracing::{debug, info_span};
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ServiceError;

use super::text::{extract_page_texts, load_document};

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

pub fn build_ebook(
    input: &Path,
    title: &str,
    author: &str,
    output: &Path,
) -> Result<(), ServiceError> {
    let _span = info_span!("service.ebook").entered();

    let doc = load_document(input)?;
    let pages = extract_page_texts(&doc);
    debug!(pages = pages.len(), "building EPUB");

    let book = assemble_epub(title, author, &pages)?;
    std::fs::write(output, book).map_err(|e| ServiceError::Io {
        path: output.to_path_buf(),
        source: e,
    })
}

struct Chapter {
    /// 1-based, used for file names and manifest ids.
    number: usize,
    section: Option<String>,
    body: String,
}

impl Chapter {
    fn file_name(&self) -> String {
        format!("chapter_{:03}.xhtml", self.number)
    }

    fn id(&self) -> String {
        format!("chapter-{:03}", self.number)
    }

    fn title(&self) -> String {
        self.section
            .clone()
            .unwrap_or_else(|| format!("Page {}", self.number))
    }
}

fn assemble_epub(title: &str, author: &str, pages: &[String]) -> Result<Vec<u8>, ServiceError> {
    let zip_err = |e: zip::result::ZipError| ServiceError::Epub(format!("archive failed: {}", e));
    let io_err = |e: std::io::Error| ServiceError::Epub(format!("archive failed: {}", e));

    let chapters: Vec<Chapter> = pages
        .iter()
        .enumerate()
        .map(|(i, text)| Chapter {
            number: i + 1,
            section: detect_section(text),
            body: text.clone(),
        })
        .collect();

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    // The mimetype entry must come first and be stored uncompressed so EPUB
    // readers can sniff it at a fixed offset.
    zip.start_file("mimetype", stored).map_err(zip_err)?;
    zip.write_all(b"application/epub+zip").map_err(io_err)?;

    zip.start_file("META-INF/container.xml", deflated)
        .map_err(zip_err)?;
    zip.write_all(CONTAINER_XML.as_bytes()).map_err(io_err)?;

    zip.start_file("OEBPS/cover.png", deflated).map_err(zip_err)?;
    zip.write_all(&cover_png()?).map_err(io_err)?;

    zip.start_file("OEBPS/titlepage.xhtml", deflated)
        .map_err(zip_err)?;
    zip.write_all(titlepage_xhtml(title, author).as_bytes())
        .map_err(io_err)?;

    for chapter in &chapters {
        zip.start_file(format!("OEBPS/{}", chapter.file_name()), deflated)
            .map_err(zip_err)?;
        zip.write_all(chapter_xhtml(chapter).as_bytes())
            .map_err(io_err)?;
    }

    zip.start_file("OEBPS/nav.xhtml", deflated).map_err(zip_err)?;
    zip.write_all(nav_xhtml(title, &chapters).as_bytes())
        .map_err(io_err)?;

    zip.start_file("OEBPS/content.opf", deflated).map_err(zip_err)?;
    zip.write_all(package_opf(title, author, &chapters).as_bytes())
        .map_err(io_err)?;

    Ok(zip.finish().map_err(zip_err)?.into_inner())
}

fn section_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?im)^\s*(chapter\s+\d+|prologue|epilogue)\b")
            .expect("section pattern compiles")
    })
}

/// First section heading on the page, normalized to title case
/// ("CHAPTER 3" becomes "Chapter 3").
fn detect_section(text: &str) -> Option<String> {
    let caps = section_regex().captures(text)?;
    let raw = caps[1].to_lowercase();
    let mut normalized = String::with_capacity(raw.len());
    let mut at_word_start = true;
    for c in raw.chars() {
        if at_word_start && c.is_alphabetic() {
            normalized.extend(c.to_uppercase());
        } else {
            normalized.push(c);
        }
        at_word_start = c.is_whitespace();
    }
    Some(normalized)
}

/// TOC groups in first-seen order; chapters without a detected section fall
/// into an "Other" group.
fn group_chapters(chapters: &[Chapter]) -> Vec<(String, Vec<&Chapter>)> {
    let mut groups: Vec<(String, Vec<&Chapter>)> = Vec::new();
    for chapter in chapters {
        let key = chapter
            .section
            .clone()
            .unwrap_or_else(|| "Other".to_string());
        match groups.iter_mut().find(|(name, _)| *name == key) {
            Some((_, members)) => members.push(chapter),
            None => groups.push((key, vec![chapter])),
        }
    }
    groups
}

fn cover_png() -> Result<Vec<u8>, ServiceError> {
    let (width, height) = (600u32, 800u32);
    let mut img = RgbImage::from_pixel(width, height, Rgb([38, 50, 56]));
    // Light frame inset from the edges.
    for x in 40..width - 40 {
        img.put_pixel(x, 40, Rgb([176, 190, 197]));
        img.put_pixel(x, height - 41, Rgb([176, 190, 197]));
    }
    for y in 40..height - 40 {
        img.put_pixel(40, y, Rgb([176, 190, 197]));
        img.put_pixel(width - 41, y, Rgb([176, 190, 197]));
    }

    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| ServiceError::Epub(format!("cover encode failed: {}", e)))?;
    Ok(buf)
}

fn titlepage_xhtml(title: &str, author: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml">
<head><title>{title}</title></head>
<body>
  <div style="text-align: center; margin-top: 20%">
    <img src="cover.png" alt="Cover"/>
    <h1>{title}</h1>
    <h2>{author}</h2>
  </div>
</body>
</html>"#,
        title = xml_escape(title),
        author = xml_escape(author),
    )
}

fn chapter_xhtml(chapter: &Chapter) -> String {
    let mut paragraphs = String::new();
    for line in chapter.body.lines() {
        if line.trim().is_empty() {
            continue;
        }
        paragraphs.push_str(&format!("  <p>{}</p>\n", xml_escape(line)));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml">
<head><title>{title}</title></head>
<body>
  <h2>{title}</h2>
{paragraphs}</body>
</html>"#,
        title = xml_escape(&chapter.title()),
        paragraphs = paragraphs,
    )
}

fn nav_xhtml(title: &str, chapters: &[Chapter]) -> String {
    let mut groups_html = String::new();
    for (section, members) in group_chapters(chapters) {
        let mut items = String::new();
        for chapter in members {
            items.push_str(&format!(
                "          <li><a href=\"{}\">{}</a></li>\n",
                chapter.file_name(),
                xml_escape(&chapter.title()),
            ));
        }
        groups_html.push_str(&format!(
            "      <li><span>{}</span>\n        <ol>\n{}        </ol>\n      </li>\n",
            xml_escape(&section),
            items,
        ));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head><title>{title}</title></head>
<body>
  <nav epub:type="toc">
    <h1>Contents</h1>
    <ol>
      <li><a href="titlepage.xhtml">Title Page</a></li>
{groups}    </ol>
  </nav>
</body>
</html>"#,
        title = xml_escape(title),
        groups = groups_html,
    )
}

fn package_opf(title: &str, author: &str, chapters: &[Chapter]) -> String {
    let mut manifest = String::new();
    let mut spine = String::new();
    for chapter in chapters {
        manifest.push_str(&format!(
            "    <item id=\"{id}\" href=\"{href}\" media-type=\"application/xhtml+xml\"/>\n",
            id = chapter.id(),
            href = chapter.file_name(),
        ));
        spine.push_str(&format!(
            "    <itemref idref=\"{}\"/>\n",
            chapter.id()
        ));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="book-id">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="book-id">urn:uuid:{uuid}</dc:identifier>
    <dc:title>{title}</dc:title>
    <dc:creator>{author}</dc:creator>
    <dc:language>en</dc:language>
    <meta property="dcterms:modified">{modified}</meta>
  </metadata>
  <manifest>
    <item id="cover" href="cover.png" media-type="image/png" properties="cover-image"/>
    <item id="titlepage" href="titlepage.xhtml" media-type="application/xhtml+xml"/>
    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
{manifest}  </manifest>
  <spine>
    <itemref idref="titlepage"/>
{spine}  </spine>
</package>"#,
        uuid = Uuid::new_v4(),
        title = xml_escape(title),
        author = xml_escape(author),
        modified = Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
        manifest = manifest,
        spine = spine,
    )
}

fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

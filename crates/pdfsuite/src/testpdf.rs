//! Test-only helpers for building small PDFs in memory.

use lopdf::{dictionary, Dictionary, Document, Object, Stream};

pub(crate) struct PageSpec {
    pub text: String,
    /// JPEG byte payloads embedded as DCTDecode image XObjects.
    pub images: Vec<Vec<u8>>,
}

impl PageSpec {
    pub fn text_only(text: &str) -> Self {
        Self {
            text: text.to_string(),
            images: Vec::new(),
        }
    }

    pub fn with_images(text: &str, images: Vec<Vec<u8>>) -> Self {
        Self {
            text: text.to_string(),
            images,
        }
    }
}

/// One text-only page per entry.
pub(crate) fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    let specs: Vec<PageSpec> = pages.iter().map(|t| PageSpec::text_only(t)).collect();
    build_pdf(&specs, None, None)
}

pub(crate) fn build_pdf(
    pages: &[PageSpec],
    info: Option<Dictionary>,
    javascript_action: Option<&str>,
) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });

    let mut page_ids = Vec::new();
    for page in pages {
        // One text-show operation per line so tests can target individual
        // operators (e.g. watermark removal keeping sibling lines intact).
        let mut content = String::new();
        for (line_no, line) in page.text.lines().enumerate() {
            content.push_str(&format!(
                "BT /F1 12 Tf 50 {} Td ({}) Tj ET\n",
                700 - (line_no as i32) * 20,
                escape_pdf_string(line)
            ));
        }

        let mut xobjects = Dictionary::new();
        for (i, image_data) in page.images.iter().enumerate() {
            let image_id = doc.add_object(Object::Stream(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => 8,
                    "Height" => 8,
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8,
                    "Filter" => "DCTDecode",
                },
                image_data.clone(),
            )));
            let name = format!("Im{}", i + 1);
            xobjects.set(name.as_bytes().to_vec(), Object::Reference(image_id));
            content.push_str(&format!(
                "q 64 0 0 64 {} 100 cm /{} Do Q\n",
                50 + i * 80,
                name
            ));
        }

        let mut resources = dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        };
        if !xobjects.is_empty() {
            resources.set("XObject", Object::Dictionary(xobjects));
        }
        let resources_id = doc.add_object(Object::Dictionary(resources));

        let content_id = doc.add_object(Object::Stream(Stream::new(
            dictionary! {},
            content.into_bytes(),
        )));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        page_ids.push(page_id);
    }

    let kids: Vec<Object> = page_ids.iter().map(|id| (*id).into()).collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_ids.len() as i64,
        }),
    );

    let mut catalog = dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    };
    if let Some(js) = javascript_action {
        let action_id = doc.add_object(dictionary! {
            "Type" => "Action",
            "S" => "JavaScript",
            "JS" => Object::string_literal(js),
        });
        catalog.set("OpenAction", Object::Reference(action_id));
    }
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", catalog_id);

    if let Some(info) = info {
        let info_id = doc.add_object(Object::Dictionary(info));
        doc.trailer.set("Info", info_id);
    }

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Encodes a solid-color JPEG for embedding as a DCTDecode image.
pub(crate) fn jpeg_image(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb(rgb));
    let mut buf = Vec::new();
    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, 90);
    encoder.encode_image(&img).unwrap();
    buf
}

pub(crate) fn image_object_count(bytes: &[u8]) -> usize {
    let doc = Document::load_mem(bytes).unwrap();
    doc.objects
        .values()
        .filter(|o| crate::service::is_image_stream(o))
        .count()
}

fn escape_pdf_string(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '(' => "\\(".to_string(),
            ')' => "\\)".to_string(),
            '\\' => "\\\\".to_string(),
            c if c.is_ascii() && !c.is_control() => c.to_string(),
            _ => " ".to_string(),
        })
        .collect()
}

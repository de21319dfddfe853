//! Shared helpers for pdfsuite integration tests: small in-memory PDFs
//! built with lopdf.

use lopdf::{dictionary, Dictionary, Document, Object, Stream};

/// Builds a PDF with one text page per entry. Newlines split into separate
/// text-show operations.
pub fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    build_pdf(pages, &[])
}

/// Builds a PDF whose first page additionally embeds the given JPEG payloads.
pub fn build_pdf(pages: &[&str], first_page_images: &[Vec<u8>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });

    let mut page_ids = Vec::new();
    for (page_no, text) in pages.iter().enumerate() {
        let mut content = String::new();
        for (line_no, line) in text.lines().enumerate() {
            content.push_str(&format!(
                "BT /F1 12 Tf 50 {} Td ({}) Tj ET\n",
                700 - (line_no as i32) * 20,
                escape(line)
            ));
        }

        let mut xobjects = Dictionary::new();
        if page_no == 0 {
            for (i, image_data) in first_page_images.iter().enumerate() {
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
                content.push_str(&format!("q 64 0 0 64 {} 100 cm /{} Do Q\n", 50 + i * 80, name));
            }
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

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// A solid-color JPEG payload.
pub fn jpeg_image(rgb: [u8; 3]) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(8, 8, image::Rgb(rgb));
    let mut buf = Vec::new();
    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, 90);
    encoder.encode_image(&img).unwrap();
    buf
}

fn escape(s: &str) -> String {
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

//! Image recompression: re-encodes every embedded raster image as JPEG at a
//! caller-chosen quality. Images the decoder cannot handle are left in place
//! and reported as warnings rather than failing the document.

use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info_span, warn};

use crate::error::ServiceError;

use super::text::load_document;

pub fn recompress_images(
    input: &Path,
    quality: u8,
    output: &Path,
) -> Result<Vec<String>, ServiceError> {
    let _span = info_span!("service.compress", quality).entered();

    let mut doc = load_document(input)?;

    let image_ids: Vec<ObjectId> = doc
        .objects
        .iter()
        .filter(|(_, obj)| super::is_image_stream(obj))
        .map(|(&id, _)| id)
        .collect();
    debug!(images = image_ids.len(), "recompressing embedded images");

    let mut warnings = Vec::new();
    for id in image_ids {
        match recompress_one(&doc, id, quality) {
            Ok(stream) => {
                doc.objects.insert(id, Object::Stream(stream));
            }
            Err(reason) => {
                warn!(object = id.0, "image left untouched: {}", reason);
                warnings.push(format!("image object {} left untouched: {}", id.0, reason));
            }
        }
    }

    doc.compress();
    doc.save(output)
        .map_err(|e| ServiceError::Pdf(format!("failed to save compressed PDF: {}", e)))?;

    Ok(warnings)
}

fn recompress_one(doc: &Document, id: ObjectId, quality: u8) -> Result<Stream, String> {
    let stream = match doc.get_object(id) {
        Ok(Object::Stream(stream)) => stream,
        _ => return Err("object is not a stream".to_string()),
    };

    // Filtered payloads (DCTDecode JPEG, FlateDecode PNG-ish data) are handed
    // to the decoder as-is when lopdf cannot unfilter them.
    let data = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

    let decoded = image::load_from_memory(&data).map_err(|e| format!("decode failed: {}", e))?;
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut jpeg = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, quality);
    encoder
        .encode_image(&rgb)
        .map_err(|e| format!("JPEG encode failed: {}", e))?;

    Ok(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(width),
            "Height" => i64::from(height),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        jpeg,
    ))
}

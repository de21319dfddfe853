//! Watermark removal: drops image XObjects and text-show operations whose
//! string operands contain the target literal.

use std::collections::HashSet;
use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, info_span};

use crate::error::ServiceError;

use super::text::load_document;

pub fn strip_watermark(input: &Path, text: &str, output: &Path) -> Result<(), ServiceError> {
    let _span = info_span!("service.watermark").entered();

    let mut doc = load_document(input)?;
    let page_ids: Vec<ObjectId> = doc.get_pages().values().copied().collect();

    let mut removed_streams: HashSet<ObjectId> = HashSet::new();
    for page_id in page_ids {
        let images = page_image_xobjects(&doc, page_id);
        let image_names: HashSet<Vec<u8>> = images.iter().map(|(name, _)| name.clone()).collect();
        removed_streams.extend(images.iter().map(|(_, id)| *id));

        rewrite_page_content(&mut doc, page_id, text, &image_names)?;
        remove_xobject_entries(&mut doc, page_id, &image_names);
    }

    debug!(images = removed_streams.len(), "removing image objects");
    for id in removed_streams {
        doc.objects.remove(&id);
    }

    doc.save(output)
        .map(|_| ())
        .map_err(|e| ServiceError::Pdf(format!("failed to save stripped PDF: {}", e)))
}

/// Image XObjects referenced from a page's resource dictionary, as
/// (resource name, stream id) pairs.
fn page_image_xobjects(doc: &Document, page_id: ObjectId) -> Vec<(Vec<u8>, ObjectId)> {
    let mut found = Vec::new();
    let Ok(page) = doc.get_dictionary(page_id) else {
        return found;
    };
    let Some(resources) = resolve_dict(doc, page.get(b"Resources").ok()) else {
        return found;
    };
    let Some(xobjects) = resolve_dict(doc, resources.get(b"XObject").ok()) else {
        return found;
    };

    for (name, value) in xobjects.iter() {
        if let Object::Reference(id) = value {
            if let Ok(obj) = doc.get_object(*id) {
                if super::is_image_stream(obj) {
                    found.push((name.clone(), *id));
                }
            }
        }
    }
    found
}

fn resolve_dict<'a>(doc: &'a Document, obj: Option<&'a Object>) -> Option<&'a Dictionary> {
    match obj? {
        Object::Dictionary(dict) => Some(dict),
        Object::Reference(id) => match doc.get_object(*id).ok()? {
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        },
        _ => None,
    }
}

fn rewrite_page_content(
    doc: &mut Document,
    page_id: ObjectId,
    needle: &str,
    image_names: &HashSet<Vec<u8>>,
) -> Result<(), ServiceError> {
    let data = doc
        .get_page_content(page_id)
        .map_err(|e| ServiceError::Pdf(format!("failed to read page content: {}", e)))?;
    let content = Content::decode(&data)
        .map_err(|e| ServiceError::Pdf(format!("failed to decode content stream: {}", e)))?;

    let operations: Vec<Operation> = content
        .operations
        .into_iter()
        .filter(|op| !is_watermark_op(op, needle, image_names))
        .collect();

    let encoded = Content { operations }
        .encode()
        .map_err(|e| ServiceError::Pdf(format!("failed to encode content stream: {}", e)))?;
    doc.change_page_content(page_id, encoded)
        .map_err(|e| ServiceError::Pdf(format!("failed to replace page content: {}", e)))
}

fn is_watermark_op(op: &Operation, needle: &str, image_names: &HashSet<Vec<u8>>) -> bool {
    match op.operator.as_str() {
        "Tj" | "'" | "\"" | "TJ" => shown_text(op).contains(needle),
        "Do" => matches!(op.operands.first(),
            Some(Object::Name(name)) if image_names.contains(name)),
        _ => false,
    }
}

/// Concatenated string operands of a text-show operation. TJ interleaves
/// strings with kerning numbers inside an array; the numbers are skipped.
fn shown_text(op: &Operation) -> String {
    let mut text = String::new();
    for operand in &op.operands {
        collect_strings(operand, &mut text);
    }
    text
}

fn collect_strings(obj: &Object, out: &mut String) {
    match obj {
        Object::String(bytes, _) => out.push_str(&String::from_utf8_lossy(bytes)),
        Object::Array(items) => {
            for item in items {
                collect_strings(item, out);
            }
        }
        _ => {}
    }
}

/// Drops the removed image names from the page's XObject dictionary. The
/// dictionary may sit inline in the page, behind a Resources reference, or
/// behind its own reference.
fn remove_xobject_entries(doc: &mut Document, page_id: ObjectId, names: &HashSet<Vec<u8>>) {
    if names.is_empty() {
        return;
    }

    let (resources_ref, xobject_ref) = {
        let Ok(page) = doc.get_dictionary(page_id) else {
            return;
        };
        let resources_ref = match page.get(b"Resources") {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        };
        let Some(resources) = resolve_dict(doc, page.get(b"Resources").ok()) else {
            return;
        };
        let xobject_ref = match resources.get(b"XObject") {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        };
        (resources_ref, xobject_ref)
    };

    let xobjects: &mut Dictionary = if let Some(xid) = xobject_ref {
        match doc.get_object_mut(xid) {
            Ok(Object::Dictionary(dict)) => dict,
            _ => return,
        }
    } else if let Some(rid) = resources_ref {
        match doc.get_object_mut(rid) {
            Ok(Object::Dictionary(resources)) => match resources.get_mut(b"XObject") {
                Ok(Object::Dictionary(dict)) => dict,
                _ => return,
            },
            _ => return,
        }
    } else {
        match doc.get_object_mut(page_id) {
            Ok(Object::Dictionary(page)) => match page.get_mut(b"Resources") {
                Ok(Object::Dictionary(resources)) => match resources.get_mut(b"XObject") {
                    Ok(Object::Dictionary(dict)) => dict,
                    _ => return,
                },
                _ => return,
            },
            _ => return,
        }
    };

    for name in names {
        xobjects.remove(name);
    }
}

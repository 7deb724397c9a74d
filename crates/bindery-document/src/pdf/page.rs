// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Vector page normalizer — turns one source PDF page into a Form XObject and
// composites it, uniformly scaled and centered, onto a fresh canvas-sized
// page in the output document.

use std::collections::HashMap;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, instrument, warn};

use bindery_core::CanvasSize;
use bindery_core::error::{BinderyError, Result};

/// Fallback box for pages that declare no MediaBox anywhere in their tree
/// (US Letter in points).
const DEFAULT_PAGE_DIMENSIONS: (f32, f32) = (612.0, 792.0);

/// How deep to follow /Parent links when resolving inherited attributes.
const MAX_PARENT_DEPTH: usize = 32;

/// Effective geometry of a source page, from its (possibly inherited)
/// MediaBox. The origin may be non-zero.
#[derive(Debug, Clone, Copy)]
pub struct PageGeometry {
    pub x0: f32,
    pub y0: f32,
    pub width: f32,
    pub height: f32,
}

/// Scale and translation that fit a source page onto the canvas.
#[derive(Debug, Clone, Copy)]
struct FitPlacement {
    scale: f32,
    tx: f32,
    ty: f32,
}

/// Read a page's effective MediaBox, following /Parent inheritance.
///
/// A page with no MediaBox in its whole chain gets the Letter default.
/// A box with non-positive extent is a geometry error for that page.
pub fn page_geometry(doc: &Document, page_id: ObjectId) -> Result<PageGeometry> {
    let media_box = inherited_media_box(doc, page_id)?;

    let (x0, y0, x1, y1) = match media_box {
        Some(values) => values,
        None => (
            0.0,
            0.0,
            DEFAULT_PAGE_DIMENSIONS.0,
            DEFAULT_PAGE_DIMENSIONS.1,
        ),
    };

    let width = x1 - x0;
    let height = y1 - y0;
    if width <= 0.0 || height <= 0.0 {
        return Err(BinderyError::Geometry { width, height });
    }

    Ok(PageGeometry {
        x0,
        y0,
        width,
        height,
    })
}

/// Composite one source page, normalized to the canvas, into `output`.
///
/// The source page becomes a Form XObject whose resources are deep-copied
/// into the output document (`cache` must be scoped to one source document —
/// object ids are not unique across documents). The new page is exactly
/// canvas-sized; its content stream draws the XObject under a uniform scale
/// `min(canvas.w / w, canvas.h / h)` — which may enlarge small pages — and a
/// translation that centers the scaled content. Returns the new page's
/// object id; the caller links it into the page tree.
#[instrument(skip_all, fields(page = ?page_id))]
pub fn compose_normalized_page(
    output: &mut Document,
    source: &Document,
    page_id: ObjectId,
    canvas: CanvasSize,
    parent_pages_id: ObjectId,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<ObjectId> {
    let geometry = page_geometry(source, page_id)?;
    let placement = fit_placement(&geometry, canvas);

    debug!(
        width = geometry.width,
        height = geometry.height,
        scale = placement.scale,
        tx = placement.tx,
        ty = placement.ty,
        "Page placement computed"
    );

    let xobject_id = form_xobject_from_page(output, source, page_id, &geometry, cache)?;

    // Scale is applied before translation: the offsets are computed for the
    // already-scaled content.
    let content = format!(
        "q {} 0 0 {} {} {} cm /P0 Do Q\n",
        placement.scale, placement.scale, placement.tx, placement.ty
    );
    let content_id = output.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

    let mut xobjects = Dictionary::new();
    xobjects.set("P0", Object::Reference(xobject_id));
    let mut resources = Dictionary::new();
    resources.set("XObject", Object::Dictionary(xobjects));

    let mut page_dict = Dictionary::new();
    page_dict.set("Type", Object::Name(b"Page".to_vec()));
    page_dict.set("Parent", Object::Reference(parent_pages_id));
    page_dict.set(
        "MediaBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(canvas.width_pt),
            Object::Real(canvas.height_pt),
        ]),
    );
    page_dict.set("Resources", Object::Dictionary(resources));
    page_dict.set("Contents", Object::Reference(content_id));

    Ok(output.add_object(page_dict))
}

/// Uniform fit of the page onto the canvas. Unlike the raster path this is
/// uncapped: pages smaller than the canvas are enlarged.
fn fit_placement(geometry: &PageGeometry, canvas: CanvasSize) -> FitPlacement {
    let scale = (canvas.width_pt / geometry.width).min(canvas.height_pt / geometry.height);
    let tx = (canvas.width_pt - geometry.width * scale) / 2.0 - geometry.x0 * scale;
    let ty = (canvas.height_pt - geometry.height * scale) / 2.0 - geometry.y0 * scale;
    FitPlacement { scale, tx, ty }
}

// -- Form XObject construction ------------------------------------------------

/// Wrap a source page as a Form XObject in the output document.
///
/// The XObject's BBox is the page's media box, so its content keeps the
/// source coordinate system; placement happens entirely in the consuming
/// content stream.
fn form_xobject_from_page(
    output: &mut Document,
    source: &Document,
    page_id: ObjectId,
    geometry: &PageGeometry,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<ObjectId> {
    let page_dict = source
        .get_dictionary(page_id)
        .map_err(|err| BinderyError::Decode(format!("cannot read page object: {}", err)))?;

    let content_data = collect_page_content(source, page_dict)?;

    let mut xobject_dict = Dictionary::new();
    xobject_dict.set("Type", Object::Name(b"XObject".to_vec()));
    xobject_dict.set("Subtype", Object::Name(b"Form".to_vec()));
    xobject_dict.set(
        "BBox",
        Object::Array(vec![
            Object::Real(geometry.x0),
            Object::Real(geometry.y0),
            Object::Real(geometry.x0 + geometry.width),
            Object::Real(geometry.y0 + geometry.height),
        ]),
    );
    xobject_dict.set("FormType", Object::Integer(1));

    if let Ok(resources) = page_dict.get(b"Resources") {
        xobject_dict.set(
            "Resources",
            copy_object_deep(output, source, resources, cache)?,
        );
    }

    Ok(output.add_object(Stream::new(xobject_dict, content_data)))
}

/// Gather a page's content stream bytes, concatenating split streams.
fn collect_page_content(doc: &Document, page_dict: &Dictionary) -> Result<Vec<u8>> {
    let contents = match page_dict.get(b"Contents") {
        Ok(c) => c,
        Err(_) => return Ok(Vec::new()), // No content = blank page
    };

    match contents {
        Object::Reference(id) => single_content_stream(doc, *id),
        Object::Array(refs) => {
            let mut result = Vec::new();
            for obj in refs {
                if let Object::Reference(id) = obj {
                    result.extend_from_slice(&single_content_stream(doc, *id)?);
                    result.push(b'\n');
                }
            }
            Ok(result)
        }
        _ => Ok(Vec::new()),
    }
}

fn single_content_stream(doc: &Document, id: ObjectId) -> Result<Vec<u8>> {
    let object = doc
        .get_object(id)
        .map_err(|err| BinderyError::Decode(format!("broken content reference: {}", err)))?;
    if let Ok(stream) = object.as_stream() {
        Ok(stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone()))
    } else {
        Ok(Vec::new())
    }
}

/// Deep copy an object from the source into the output document, following
/// references. The cache keeps each source object copied at most once per
/// source document.
fn copy_object_deep(
    output: &mut Document,
    source: &Document,
    obj: &Object,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<Object> {
    match obj {
        Object::Reference(id) => {
            if let Some(&new_id) = cache.get(id) {
                return Ok(Object::Reference(new_id));
            }

            match source.get_object(*id) {
                Ok(referenced) => {
                    // Reserve the id before recursing so self-referential
                    // graphs terminate.
                    let new_id = output.new_object_id();
                    cache.insert(*id, new_id);
                    let copied = copy_object_deep(output, source, referenced, cache)?;
                    output.objects.insert(new_id, copied);
                    Ok(Object::Reference(new_id))
                }
                Err(err) => {
                    warn!(?id, %err, "Cannot resolve reference, using Null");
                    Ok(Object::Null)
                }
            }
        }
        Object::Dictionary(dict) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in dict.iter() {
                // Skip /Parent to avoid dragging whole page trees along.
                if key == b"Parent" {
                    continue;
                }
                new_dict.set(key.clone(), copy_object_deep(output, source, value, cache)?);
            }
            Ok(Object::Dictionary(new_dict))
        }
        Object::Array(arr) => {
            let mut new_arr = Vec::with_capacity(arr.len());
            for item in arr {
                new_arr.push(copy_object_deep(output, source, item, cache)?);
            }
            Ok(Object::Array(new_arr))
        }
        Object::Stream(stream) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in stream.dict.iter() {
                if key == b"Parent" {
                    continue;
                }
                new_dict.set(key.clone(), copy_object_deep(output, source, value, cache)?);
            }
            Ok(Object::Stream(Stream::new(new_dict, stream.content.clone())))
        }
        // All other object types (Boolean, Integer, Real, String, Name, Null)
        // are trivially cloneable.
        other => Ok(other.clone()),
    }
}

/// Find a page's MediaBox, walking /Parent links for inherited boxes.
fn inherited_media_box(
    doc: &Document,
    page_id: ObjectId,
) -> Result<Option<(f32, f32, f32, f32)>> {
    let mut current = page_id;

    for _ in 0..MAX_PARENT_DEPTH {
        let dict = doc
            .get_dictionary(current)
            .map_err(|err| BinderyError::Decode(format!("cannot read page tree node: {}", err)))?;

        if let Ok(array) = dict.get(b"MediaBox").and_then(|obj| obj.as_array()) {
            if array.len() < 4 {
                return Err(BinderyError::Decode(format!(
                    "MediaBox has {} entries, expected 4",
                    array.len()
                )));
            }
            let values: Vec<f32> = array.iter().filter_map(extract_number).collect();
            if values.len() < 4 {
                return Err(BinderyError::Decode("MediaBox entry is not numeric".into()));
            }
            return Ok(Some((values[0], values[1], values[2], values[3])));
        }

        match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => current = *parent_id,
            _ => return Ok(None),
        }
    }

    Ok(None)
}

/// Extract a numeric value from a PDF object.
fn extract_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

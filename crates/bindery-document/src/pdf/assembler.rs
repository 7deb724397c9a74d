// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Merge-pipeline document assembler — owns a growing `lopdf` document,
// inserts normalized pages sequentially, and serialises once at the end.

use std::collections::HashMap;

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, info, instrument};

use bindery_core::CanvasSize;
use bindery_core::error::{BinderyError, Result};

use super::page::compose_normalized_page;

/// Accumulates normalized pages into one output PDF.
///
/// Every appended page is re-fit to the assembler's canvas before insertion;
/// output page order always equals append order. The page tree is linked up
/// and serialised exactly once, in `finish`.
pub struct PdfAssembler {
    document: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
    canvas: CanvasSize,
}

impl PdfAssembler {
    /// Start an empty output document targeting the given canvas.
    pub fn new(canvas: CanvasSize) -> Self {
        let mut document = Document::with_version("1.5");
        // Reserved up front so appended pages can point their /Parent at it;
        // the dictionary itself is written in `finish`.
        let pages_id = document.new_object_id();
        Self {
            document,
            pages_id,
            kids: Vec::new(),
            canvas,
        }
    }

    /// The canvas every appended page is normalized into.
    pub fn canvas(&self) -> CanvasSize {
        self.canvas
    }

    /// Normalize one source page onto the canvas and insert it.
    ///
    /// `cache` de-duplicates resource copies and must be scoped to one
    /// source document: object ids are only unique within a document.
    pub fn append_page(
        &mut self,
        source: &Document,
        page_id: ObjectId,
        cache: &mut HashMap<ObjectId, ObjectId>,
    ) -> Result<()> {
        let new_page = compose_normalized_page(
            &mut self.document,
            source,
            page_id,
            self.canvas,
            self.pages_id,
            cache,
        )?;
        self.kids.push(new_page);
        debug!(pages = self.kids.len(), "Page inserted");
        Ok(())
    }

    /// Pages inserted so far.
    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kids.is_empty()
    }

    /// Link the page tree, write the catalog, and serialise the document.
    ///
    /// With zero pages inserted, reports `EmptyResult` instead of emitting an
    /// invalid document. Serialisation failure is a run-level `Encode` error.
    #[instrument(skip(self), fields(pages = self.kids.len()))]
    pub fn finish(mut self) -> Result<(Vec<u8>, usize)> {
        if self.kids.is_empty() {
            return Err(BinderyError::EmptyResult);
        }
        let page_count = self.kids.len();

        let mut pages_dict = Dictionary::new();
        pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
        pages_dict.set(
            "Kids",
            Object::Array(self.kids.iter().map(|id| Object::Reference(*id)).collect()),
        );
        pages_dict.set("Count", Object::Integer(page_count as i64));
        self.document
            .objects
            .insert(self.pages_id, Object::Dictionary(pages_dict));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(self.pages_id));
        let catalog_id = self.document.add_object(catalog);
        self.document.trailer.set("Root", catalog_id);

        let mut output = Vec::new();
        self.document.save_to(&mut output).map_err(|err| {
            BinderyError::Encode(format!("failed to serialise merged document: {}", err))
        })?;

        info!(page_count, bytes = output.len(), "Merged document encoded");
        Ok((output, page_count))
    }
}

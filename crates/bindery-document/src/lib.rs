// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// bindery-document — Page normalization and composition for Bindery.
//
// Provides the raster normalizer (fit an image onto the target canvas and
// recompress it), the vector page normalizer (re-fit an existing PDF page
// onto the canvas via a Form XObject transform), the document assemblers
// that serialize the normalized pages, and the batch orchestrator that runs
// a whole input sequence with per-item failure isolation.

pub mod batch;
pub mod image;
pub mod pdf;

// Re-export the primary structs so callers can use `bindery_document::BatchRunner` etc.
pub use batch::BatchRunner;
pub use image::document::ImageDocument;
pub use image::normalizer::{ImageNormalizer, NormalizedRaster};
pub use pdf::assembler::PdfAssembler;

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster pipeline — image normalization and multi-page image-document
// encoding.

pub mod document;
pub mod normalizer;

pub use document::ImageDocument;
pub use normalizer::{ImageNormalizer, NormalizedRaster};

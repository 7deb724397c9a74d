// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image-pipeline document assembler — accumulates normalized raster pages
// and performs one multi-page PDF encode at the end using `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`.

use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use tracing::{debug, info, instrument};

use bindery_core::error::{BinderyError, Result};

use super::normalizer::NormalizedRaster;

const MM_PER_PT: f32 = 25.4 / 72.0;

/// Ordered sequence of normalized raster pages, encoded into one PDF in a
/// single call at `finish`.
///
/// All pages must already be normalized before the encode: there is no
/// incremental encoding, mirroring a save-all multi-page export. Output page
/// order always equals append order.
pub struct ImageDocument {
    title: String,
    pages: Vec<NormalizedRaster>,
}

impl ImageDocument {
    /// Start an empty document. `title` lands in the PDF metadata.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            pages: Vec::new(),
        }
    }

    /// Append one normalized page. Pages are encoded in append order.
    pub fn append(&mut self, page: NormalizedRaster) {
        debug!(
            index = self.pages.len(),
            width_px = page.width_px(),
            height_px = page.height_px(),
            "Raster page appended"
        );
        self.pages.push(page);
    }

    /// Pages appended so far.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Encode every appended page into one PDF.
    ///
    /// Each raster is embedded at its recorded density so it fills its page
    /// exactly. Returns the serialized bytes and the page count; with zero
    /// pages appended, reports `EmptyResult` instead of emitting a zero-page
    /// document.
    #[instrument(skip(self), fields(pages = self.pages.len()))]
    pub fn finish(self) -> Result<(Vec<u8>, usize)> {
        if self.pages.is_empty() {
            return Err(BinderyError::EmptyResult);
        }

        let mut doc = PdfDocument::new(&self.title);
        let mut pdf_pages: Vec<PdfPage> = Vec::with_capacity(self.pages.len());

        for raster in self.pages {
            let (page_w_pt, page_h_pt) = raster.page_size_pt();
            let density = raster.density();
            let width = raster.width_px() as usize;
            let height = raster.height_px() as usize;

            let raw = RawImage {
                pixels: RawImageData::U8(raster.into_rgb().into_raw()),
                width,
                height,
                data_format: RawImageFormat::RGB8,
                tag: Vec::new(),
            };
            let xobject_id = doc.add_image(&raw);

            // At `dpi = density` the image's native size is exactly the page
            // size, so an identity transform fills the page corner to corner.
            let ops = vec![Op::UseXobject {
                id: xobject_id,
                transform: XObjectTransform {
                    translate_x: None,
                    translate_y: None,
                    scale_x: None,
                    scale_y: None,
                    dpi: Some(density),
                    rotate: None,
                },
            }];

            pdf_pages.push(PdfPage::new(
                Mm(page_w_pt * MM_PER_PT),
                Mm(page_h_pt * MM_PER_PT),
                ops,
            ));
        }

        let page_count = pdf_pages.len();
        doc.with_pages(pdf_pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);

        info!(page_count, bytes = output.len(), "Image document encoded");
        Ok((output, page_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_core::{CanvasSize, CompressionSettings};
    use image::{Rgb, RgbImage};

    use crate::image::normalizer::ImageNormalizer;

    fn normalized_page(color: [u8; 3]) -> NormalizedRaster {
        let src = RgbImage::from_pixel(40, 40, Rgb(color));
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        image::DynamicImage::ImageRgb8(src)
            .write_to(&mut cursor, image::ImageFormat::Png)
            .unwrap();
        ImageNormalizer::new(
            CanvasSize::letter(),
            CompressionSettings {
                density: 72.0,
                quality: 80,
            },
            true,
        )
        .normalize(&buffer)
        .unwrap()
    }

    /// Finishing with zero pages must report the empty condition, never a
    /// zero-page document.
    #[test]
    fn finish_on_empty_reports_empty_result() {
        let doc = ImageDocument::new("empty");
        let err = doc.finish().unwrap_err();
        assert!(matches!(err, BinderyError::EmptyResult), "got {:?}", err);
    }

    /// Two appended pages produce a two-page PDF whose pages are sized to
    /// the Letter canvas.
    #[test]
    fn pages_encode_to_canvas_sized_pdf() {
        let mut doc = ImageDocument::new("two pages");
        doc.append(normalized_page([255, 0, 0]));
        doc.append(normalized_page([0, 255, 0]));
        assert_eq!(doc.page_count(), 2);

        let (bytes, page_count) = doc.finish().unwrap();
        assert_eq!(page_count, 2);

        let parsed = lopdf::Document::load_mem(&bytes).unwrap();
        let pages = parsed.get_pages();
        assert_eq!(pages.len(), 2);

        for (_, page_id) in pages {
            let geometry = crate::pdf::page_geometry(&parsed, page_id).unwrap();
            assert!((geometry.width - 612.0).abs() < 0.5, "width {}", geometry.width);
            assert!(
                (geometry.height - 792.0).abs() < 0.5,
                "height {}",
                geometry.height
            );
        }
    }
}

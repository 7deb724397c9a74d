// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster normalizer — decode an input image, flatten it to RGB, fit it onto
// the target canvas without cropping, and recompress it through the JPEG
// codec. Operates on in-memory images using the `image` crate.

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use tracing::{debug, info, instrument};

use bindery_core::error::{BinderyError, Result};
use bindery_core::{CanvasSize, CompressionSettings};

/// One canvas-sized raster page: centered, scaled source content on a solid
/// white background.
///
/// When produced with fitting enabled, the pixel dimensions equal the canvas
/// footprint at the configured density and the page size equals the canvas
/// exactly. With fitting disabled, the page takes the image's native size at
/// the configured density instead.
#[derive(Debug, Clone)]
pub struct NormalizedRaster {
    image: RgbImage,
    page_width_pt: f32,
    page_height_pt: f32,
    density: f32,
}

impl NormalizedRaster {
    /// Pixel width of the page raster.
    pub fn width_px(&self) -> u32 {
        self.image.width()
    }

    /// Pixel height of the page raster.
    pub fn height_px(&self) -> u32 {
        self.image.height()
    }

    /// Page size in PDF points (width, height).
    pub fn page_size_pt(&self) -> (f32, f32) {
        (self.page_width_pt, self.page_height_pt)
    }

    /// Sample density the raster is embedded at.
    pub fn density(&self) -> f32 {
        self.density
    }

    /// Borrow the page pixels.
    pub fn as_rgb(&self) -> &RgbImage {
        &self.image
    }

    /// Consume the page and return the underlying pixel buffer.
    pub fn into_rgb(self) -> RgbImage {
        self.image
    }
}

/// Normalizes one raster source onto the fixed target canvas.
///
/// The canvas is authored in points; the pixel footprint used for fitting is
/// `round(density / 72 * canvas_pt)` per axis (see `CompressionSettings`).
pub struct ImageNormalizer {
    canvas: CanvasSize,
    compression: CompressionSettings,
    fit_to_canvas: bool,
}

impl ImageNormalizer {
    /// Create a normalizer for the given canvas and compression settings.
    pub fn new(canvas: CanvasSize, compression: CompressionSettings, fit_to_canvas: bool) -> Self {
        Self {
            canvas,
            compression: compression.clamped(),
            fit_to_canvas,
        }
    }

    /// Normalize one encoded image (PNG, JPEG, BMP, TIFF) into a raster page.
    ///
    /// The source is decoded, flattened to RGB (alpha and palette data are
    /// discarded, never composited against the background), uniformly scaled
    /// down to fit inside the canvas footprint — never enlarged — pasted
    /// centered on a white canvas, and round-tripped through the JPEG codec
    /// at the configured quality. That round trip is the compression step,
    /// not an artifact to avoid.
    #[instrument(skip(self, data), fields(data_len = data.len()))]
    pub fn normalize(&self, data: &[u8]) -> Result<NormalizedRaster> {
        let decoded = image::load_from_memory(data)
            .map_err(|err| BinderyError::Decode(format!("failed to decode image: {}", err)))?;

        let (src_w, src_h) = (decoded.width(), decoded.height());
        if src_w == 0 || src_h == 0 {
            return Err(BinderyError::Geometry {
                width: src_w as f32,
                height: src_h as f32,
            });
        }
        debug!(width = src_w, height = src_h, "Image decoded");

        // Flatten transparency and palettes to a plain three-channel image.
        let rgb = decoded.to_rgb8();

        if !self.fit_to_canvas {
            // Fitting disabled: the image becomes its own page at the
            // configured density, with no recompression.
            let page_w = src_w as f32 * 72.0 / self.compression.density;
            let page_h = src_h as f32 * 72.0 / self.compression.density;
            info!(page_w, page_h, "Fitting disabled; image passed through");
            return Ok(NormalizedRaster {
                image: rgb,
                page_width_pt: page_w,
                page_height_pt: page_h,
                density: self.compression.density,
            });
        }

        let footprint = self.compression.pixel_footprint(self.canvas);
        let (scaled_w, scaled_h) = fit_dimensions((src_w, src_h), footprint);

        let scaled = if (scaled_w, scaled_h) == (src_w, src_h) {
            rgb
        } else {
            imageops::resize(&rgb, scaled_w, scaled_h, FilterType::Lanczos3)
        };

        let (offset_x, offset_y) = centering_offsets(footprint, (scaled_w, scaled_h));
        let mut page = RgbImage::from_pixel(footprint.0, footprint.1, Rgb([255u8, 255, 255]));
        imageops::replace(&mut page, &scaled, offset_x as i64, offset_y as i64);

        debug!(
            scaled_w,
            scaled_h,
            offset_x,
            offset_y,
            "Source placed on canvas"
        );

        let compressed = self.jpeg_round_trip(page)?;

        info!(
            width = compressed.width(),
            height = compressed.height(),
            quality = self.compression.quality,
            "Raster page normalized"
        );

        Ok(NormalizedRaster {
            image: compressed,
            page_width_pt: self.canvas.width_pt,
            page_height_pt: self.canvas.height_pt,
            density: self.compression.density,
        })
    }

    /// Encode through the JPEG codec at the configured quality, then decode
    /// back into the working representation.
    fn jpeg_round_trip(&self, page: RgbImage) -> Result<RgbImage> {
        let mut buffer = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
            &mut buffer,
            self.compression.quality,
        );
        page.write_with_encoder(encoder)
            .map_err(|err| BinderyError::Image(format!("JPEG recompression failed: {}", err)))?;

        let reloaded = image::load_from_memory(&buffer).map_err(|err| {
            BinderyError::Image(format!("recompressed image failed to reload: {}", err))
        })?;
        Ok(reloaded.to_rgb8())
    }
}

/// Uniform fit of `src` inside `bounds`: single scale factor
/// `min(bounds.w / src.w, bounds.h / src.h)`, capped at 1.0 so small images
/// are never enlarged. Returns the scaled dimensions, rounded.
fn fit_dimensions(src: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let scale = (bounds.0 as f32 / src.0 as f32)
        .min(bounds.1 as f32 / src.1 as f32)
        .min(1.0);
    let w = ((src.0 as f32 * scale).round() as u32).clamp(1, bounds.0);
    let h = ((src.1 as f32 * scale).round() as u32).clamp(1, bounds.1);
    (w, h)
}

/// Integer-floor centering offsets of `inner` within `outer`.
fn centering_offsets(outer: (u32, u32), inner: (u32, u32)) -> (u32, u32) {
    ((outer.0 - inner.0) / 2, (outer.1 - inner.1) / 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};

    fn png_bytes(img: &RgbImage) -> Vec<u8> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        DynamicImage::ImageRgb8(img.clone())
            .write_to(&mut cursor, image::ImageFormat::Png)
            .unwrap();
        buffer
    }

    fn letter_normalizer(density: f32) -> ImageNormalizer {
        ImageNormalizer::new(
            CanvasSize::letter(),
            CompressionSettings {
                density,
                quality: 90,
            },
            true,
        )
    }

    /// A small image must land on a full-footprint page without being
    /// enlarged, centered with integer-floor offsets.
    #[test]
    fn small_image_is_centered_not_enlarged() {
        let src = RgbImage::from_pixel(100, 100, Rgb([200, 0, 0]));
        let normalizer = letter_normalizer(72.0);

        let page = normalizer.normalize(&png_bytes(&src)).unwrap();

        // Footprint at 72 dpi equals the canvas point size.
        assert_eq!((page.width_px(), page.height_px()), (612, 792));
        assert_eq!(page.page_size_pt(), (612.0, 792.0));

        let rgb = page.as_rgb();
        // Center of the pasted region: (256..356, 346..446).
        let center = rgb.get_pixel(306, 396);
        assert!(center.0[0] > 150 && center.0[1] < 80, "center {:?}", center);
        // Far corner stays background white (JPEG tolerance).
        let corner = rgb.get_pixel(5, 5);
        assert!(corner.0.iter().all(|&c| c > 240), "corner {:?}", corner);
    }

    /// A 4000x3000 source at 150 dpi on Letter must downscale to
    /// 1275x956 and sit centered within one pixel (plus JPEG edge blur).
    #[test]
    fn large_image_downscales_to_footprint() {
        let src = RgbImage::from_pixel(4000, 3000, Rgb([0, 0, 128]));
        let normalizer = letter_normalizer(150.0);

        let page = normalizer.normalize(&png_bytes(&src)).unwrap();
        assert_eq!((page.width_px(), page.height_px()), (1275, 1650));

        // Locate the dark content's bounding box.
        let rgb = page.as_rgb();
        let dark = |x: u32, y: u32| rgb.get_pixel(x, y).0[2] < 200 || rgb.get_pixel(x, y).0[0] < 200;
        let mut min_y = u32::MAX;
        let mut max_y = 0;
        for y in 0..rgb.height() {
            if dark(637, y) {
                min_y = min_y.min(y);
                max_y = max_y.max(y);
            }
        }

        // Expected: 956 rows tall, starting at (1650 - 956) / 2 = 347.
        let height = max_y - min_y + 1;
        assert!((947..=965).contains(&height), "content height {}", height);
        assert!((344..=350).contains(&min_y), "content top {}", min_y);
    }

    /// With fitting disabled the image passes through untouched: no resize,
    /// no recompression, page sized to the image at the configured density.
    #[test]
    fn fit_disabled_passes_image_through() {
        let mut src = RgbImage::from_pixel(300, 150, Rgb([10, 20, 30]));
        src.put_pixel(0, 0, Rgb([250, 240, 230]));
        let normalizer = ImageNormalizer::new(
            CanvasSize::letter(),
            CompressionSettings {
                density: 150.0,
                quality: 90,
            },
            false,
        );

        let page = normalizer.normalize(&png_bytes(&src)).unwrap();

        assert_eq!((page.width_px(), page.height_px()), (300, 150));
        // 300 px at 150 dpi is 144 pt; 150 px is 72 pt.
        assert_eq!(page.page_size_pt(), (144.0, 72.0));
        // Bypassing the codec keeps pixels exact.
        assert_eq!(page.as_rgb().get_pixel(0, 0), &Rgb([250, 240, 230]));
        assert_eq!(page.as_rgb().get_pixel(10, 10), &Rgb([10, 20, 30]));
    }

    /// Alpha is dropped, not composited: a fully transparent pixel keeps its
    /// RGB channels.
    #[test]
    fn transparency_is_flattened_by_channel_drop() {
        let mut src = RgbaImage::from_pixel(20, 20, Rgba([10, 20, 30, 0]));
        src.put_pixel(5, 5, Rgba([200, 100, 50, 128]));
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        DynamicImage::ImageRgba8(src)
            .write_to(&mut cursor, image::ImageFormat::Png)
            .unwrap();

        // Disable fitting so no codec pass disturbs the channel values.
        let normalizer = ImageNormalizer::new(
            CanvasSize::letter(),
            CompressionSettings::default(),
            false,
        );
        let page = normalizer.normalize(&buffer).unwrap();

        assert_eq!(page.as_rgb().get_pixel(0, 0), &Rgb([10, 20, 30]));
        assert_eq!(page.as_rgb().get_pixel(5, 5), &Rgb([200, 100, 50]));
    }

    #[test]
    fn garbage_bytes_fail_with_decode_error() {
        let normalizer = letter_normalizer(150.0);
        let err = normalizer.normalize(b"not an image").unwrap_err();
        assert!(matches!(err, BinderyError::Decode(_)), "got {:?}", err);
    }

    #[test]
    fn fit_dimensions_caps_scale_at_one() {
        // Smaller than bounds on both axes: unchanged.
        assert_eq!(fit_dimensions((100, 50), (612, 792)), (100, 50));
        // Wider than tall: width binds.
        assert_eq!(fit_dimensions((4000, 3000), (1275, 1650)), (1275, 956));
        // Taller than wide: height binds.
        assert_eq!(fit_dimensions((300, 2000), (612, 792)), (119, 792));
    }

    #[test]
    fn centering_offsets_floor() {
        assert_eq!(centering_offsets((612, 792), (611, 791)), (0, 0));
        assert_eq!(centering_offsets((612, 792), (100, 50)), (256, 371));
        assert_eq!(centering_offsets((10, 10), (10, 10)), (0, 0));
    }
}

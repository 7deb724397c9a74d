// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Bindery composition engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BinderyError, Result};

/// Unique identifier for a composition run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Supported input source types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    Png,
    Jpeg,
    Bmp,
    Tiff,
    Pdf,
}

impl SourceKind {
    /// MIME type string for the shell's Content-Type handling.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Bmp => "image/bmp",
            Self::Tiff => "image/tiff",
            Self::Pdf => "application/pdf",
        }
    }

    /// Infer source type from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "bmp" => Some(Self::Bmp),
            "tif" | "tiff" => Some(Self::Tiff),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Whether this kind feeds the raster (image) pipeline.
    pub fn is_raster(&self) -> bool {
        !matches!(self, Self::Pdf)
    }
}

/// The fixed output page rectangle every input is normalized into.
///
/// Dimensions are in PDF points (1/72 inch) and fixed for the lifetime of a
/// run. Both dimensions must be strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

impl CanvasSize {
    /// Validate and construct a canvas.
    pub fn new(width_pt: f32, height_pt: f32) -> Result<Self> {
        if width_pt <= 0.0 || height_pt <= 0.0 {
            return Err(BinderyError::Geometry {
                width: width_pt,
                height: height_pt,
            });
        }
        Ok(Self {
            width_pt,
            height_pt,
        })
    }

    /// US Letter, 8.5 x 11 in.
    pub fn letter() -> Self {
        Self {
            width_pt: 612.0,
            height_pt: 792.0,
        }
    }

    /// ISO A4, 210 x 297 mm.
    pub fn a4() -> Self {
        Self {
            width_pt: 595.276,
            height_pt: 841.890,
        }
    }
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self::letter()
    }
}

/// Lossy recompression settings for the raster pipeline.
///
/// The canvas is authored in points; the raster pipeline derives its pixel
/// footprint as `round(density / 72 * canvas_pt)` per axis. `density` is the
/// DPI-equivalent sample density (72-300), `quality` the JPEG quality (10-95).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressionSettings {
    pub density: f32,
    pub quality: u8,
}

impl CompressionSettings {
    /// Return a copy with both fields clamped to their supported ranges.
    pub fn clamped(self) -> Self {
        Self {
            density: self.density.clamp(72.0, 300.0),
            quality: self.quality.clamp(10, 95),
        }
    }

    /// Pixel footprint of a canvas at this density (width, height).
    pub fn pixel_footprint(&self, canvas: CanvasSize) -> (u32, u32) {
        let w = (self.density / 72.0 * canvas.width_pt).round() as u32;
        let h = (self.density / 72.0 * canvas.height_pt).round() as u32;
        (w.max(1), h.max(1))
    }
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            density: 150.0,
            quality: 80,
        }
    }
}

/// One named input item, as supplied by the hosting shell.
#[derive(Debug, Clone)]
pub struct SourceBlob {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SourceBlob {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Infer the source kind from the blob's file extension.
    pub fn kind(&self) -> Option<SourceKind> {
        let ext = self.name.rsplit('.').next()?;
        SourceKind::from_extension(ext)
    }
}

/// One skipped item, recorded by the orchestrator without aborting the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    /// Item identifier: the blob name, suffixed with `#pageN` for a single
    /// failed page inside an otherwise readable document.
    pub item: String,
    pub message: String,
}

/// The finished artifact of a run, plus the summary the shell displays.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: RunId,
    /// Cosmetic file name the shell offers for download.
    pub output_name: String,
    /// The serialized output document.
    pub bytes: Vec<u8>,
    pub page_count: usize,
    /// SHA-256 of `bytes`, hex-encoded.
    pub sha256_hex: String,
    /// Items skipped during the run; empty when every input survived.
    pub failures: Vec<ItemFailure>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// Output size in bytes.
    pub fn byte_size(&self) -> usize {
        self.bytes.len()
    }

    /// Write the output document to a file.
    pub fn write_to_file(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        std::fs::write(path.as_ref(), &self.bytes)?;
        Ok(())
    }
}

/// Terminal shape of one run.
///
/// A run that produced at least one page completes as `Document` even when
/// some items were skipped; a run where nothing survived completes as
/// `Empty`, with no blob to offer. Run-level failures (final encode) are the
/// `Err` arm of the orchestrator's `Result` instead.
#[derive(Debug)]
pub enum RunOutcome {
    Document(RunReport),
    Empty { failures: Vec<ItemFailure> },
}

impl RunOutcome {
    /// Pages in the output, zero for `Empty`.
    pub fn page_count(&self) -> usize {
        match self {
            Self::Document(report) => report.page_count,
            Self::Empty { .. } => 0,
        }
    }

    /// Items skipped during the run.
    pub fn failures(&self) -> &[ItemFailure] {
        match self {
            Self::Document(report) => &report.failures,
            Self::Empty { failures } => failures,
        }
    }
}

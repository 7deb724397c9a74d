// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-run configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{CanvasSize, CompressionSettings};

/// Settings for one composition run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOptions {
    /// The fixed target page rectangle.
    pub canvas: CanvasSize,
    /// Fit raster sources onto the canvas (image pipeline only). When
    /// disabled, both fitting and recompression are bypassed and each image
    /// becomes a page of its own native size at the configured density.
    pub fit_to_canvas: bool,
    /// Density and quality for raster recompression.
    pub compression: CompressionSettings,
    /// Cosmetic file name the shell offers for download.
    pub output_name: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            canvas: CanvasSize::letter(),
            fit_to_canvas: true,
            compression: CompressionSettings::default(),
            output_name: "merged.pdf".to_string(),
        }
    }
}

impl RunOptions {
    /// Parse options from a JSON string (as persisted by a hosting shell).
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize options to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Bindery.

use thiserror::Error;

/// Top-level error type for all Bindery operations.
///
/// Per-item conditions (`Decode`, `Geometry`, `UnsupportedSource`, `Image`)
/// are recorded by the batch orchestrator and never abort a run. `Encode` is
/// a run-level failure: serialization happens once, at the end, so there is
/// nothing left to skip to. `EmptyResult` is returned by an assembler's
/// `finish` when no pages were appended; the orchestrator converts it into
/// the run's terminal `Empty` outcome rather than propagating it.
#[derive(Debug, Error)]
pub enum BinderyError {
    // -- Per-item input errors --
    #[error("input could not be decoded: {0}")]
    Decode(String),

    #[error("source reports non-positive dimensions: {width}x{height}")]
    Geometry { width: f32, height: f32 },

    #[error("unsupported source type: {0}")]
    UnsupportedSource(String),

    // -- Document errors --
    #[error("image processing failed: {0}")]
    Image(String),

    // -- Run-level conditions --
    #[error("no pages were produced")]
    EmptyResult,

    #[error("output encoding failed: {0}")]
    Encode(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BinderyError>;

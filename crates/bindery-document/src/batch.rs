// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch orchestrator — runs one ordered input sequence through the matching
// normalizer, isolating per-item failures, and seals the surviving pages
// into a single output document.

use std::collections::HashMap;

use chrono::Utc;
use lopdf::Document;
use sha2::{Digest, Sha256};
use tracing::{info, instrument, warn};

use bindery_core::config::RunOptions;
use bindery_core::error::{BinderyError, Result};
use bindery_core::{ItemFailure, RunId, RunOutcome, RunReport, SourceBlob, SourceKind};

use crate::image::document::ImageDocument;
use crate::image::normalizer::ImageNormalizer;
use crate::pdf::assembler::PdfAssembler;

/// Runs whole batches against a fixed set of options.
///
/// Processing is strictly sequential and deterministic, in input order.
/// Every run owns its own assembler and buffers; nothing is shared between
/// concurrent runs, so a hosting environment may invoke one runner from
/// independent requests as long as each call gets its own sources.
pub struct BatchRunner {
    options: RunOptions,
}

impl BatchRunner {
    pub fn new(mut options: RunOptions) -> Self {
        options.compression = options.compression.clamped();
        Self { options }
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Convert a sequence of raster images into one paginated document.
    ///
    /// Items that fail to decode (or are not raster sources at all) are
    /// skipped and recorded; they never abort the batch. The run terminates
    /// as `Empty` when nothing survived.
    #[instrument(skip_all, fields(items = sources.len()))]
    pub fn convert_images(&self, sources: &[SourceBlob]) -> Result<RunOutcome> {
        let run_id = RunId::new();
        info!(%run_id, items = sources.len(), "Image conversion run started");

        let normalizer = ImageNormalizer::new(
            self.options.canvas,
            self.options.compression,
            self.options.fit_to_canvas,
        );
        let mut document = ImageDocument::new(&self.options.output_name);
        let mut failures: Vec<ItemFailure> = Vec::new();

        for blob in sources {
            if blob.kind() == Some(SourceKind::Pdf) {
                record_failure(
                    &mut failures,
                    &blob.name,
                    &BinderyError::UnsupportedSource(
                        "PDF inputs belong to the merge pipeline".into(),
                    ),
                );
                continue;
            }
            match normalizer.normalize(&blob.bytes) {
                Ok(page) => document.append(page),
                Err(err) => record_failure(&mut failures, &blob.name, &err),
            }
        }

        self.seal(run_id, document.finish(), failures)
    }

    /// Merge a sequence of PDF documents into one, re-fitting every page to
    /// the canvas.
    ///
    /// The skip granularity is one page: a page that cannot be composited is
    /// recorded as `name.pdf#pageN` and the rest of its document still
    /// merges. A document that fails to load at all is one failure entry.
    #[instrument(skip_all, fields(items = sources.len()))]
    pub fn merge_documents(&self, sources: &[SourceBlob]) -> Result<RunOutcome> {
        let run_id = RunId::new();
        info!(%run_id, items = sources.len(), "Merge run started");

        let mut assembler = PdfAssembler::new(self.options.canvas);
        let mut failures: Vec<ItemFailure> = Vec::new();

        for blob in sources {
            if let Some(kind) = blob.kind()
                && kind.is_raster()
            {
                record_failure(
                    &mut failures,
                    &blob.name,
                    &BinderyError::UnsupportedSource(format!(
                        "{} inputs belong to the image pipeline",
                        kind.mime_type()
                    )),
                );
                continue;
            }

            let source = match Document::load_mem(&blob.bytes) {
                Ok(doc) => doc,
                Err(err) => {
                    record_failure(
                        &mut failures,
                        &blob.name,
                        &BinderyError::Decode(format!("failed to load PDF: {}", err)),
                    );
                    continue;
                }
            };

            // Resource copies are de-duplicated per source document; object
            // ids are not unique across documents.
            let mut cache = HashMap::new();
            for (page_number, page_id) in source.get_pages() {
                if let Err(err) = assembler.append_page(&source, page_id, &mut cache) {
                    record_failure(
                        &mut failures,
                        &format!("{}#page{}", blob.name, page_number),
                        &err,
                    );
                }
            }
        }

        self.seal(run_id, assembler.finish(), failures)
    }

    /// Map an assembler's finish result onto the run's terminal shape.
    fn seal(
        &self,
        run_id: RunId,
        finished: Result<(Vec<u8>, usize)>,
        failures: Vec<ItemFailure>,
    ) -> Result<RunOutcome> {
        let (bytes, page_count) = match finished {
            Ok(done) => done,
            Err(BinderyError::EmptyResult) => {
                warn!(%run_id, failures = failures.len(), "Run produced no pages");
                return Ok(RunOutcome::Empty { failures });
            }
            Err(err) => return Err(err),
        };

        let sha256_hex = hex::encode(Sha256::digest(&bytes));
        let report = RunReport {
            run_id,
            output_name: self.options.output_name.clone(),
            page_count,
            sha256_hex,
            failures,
            finished_at: Utc::now(),
            bytes,
        };

        info!(
            %run_id,
            pages = report.page_count,
            bytes = report.byte_size(),
            skipped = report.failures.len(),
            "Run completed"
        );
        Ok(RunOutcome::Document(report))
    }
}

impl Default for BatchRunner {
    fn default() -> Self {
        Self::new(RunOptions::default())
    }
}

fn record_failure(failures: &mut Vec<ItemFailure>, item: &str, err: &BinderyError) {
    warn!(item, %err, "Item skipped");
    failures.push(ItemFailure {
        item: item.to_string(),
        message: err.to_string(),
    });
}

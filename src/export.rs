//! Writing referenced assets to disk.
//!
//! Export never trusts the catalog's bytes: assets are re-derived from the
//! source document, and a candidate is only written when its own hash still
//! starts with the referenced prefix.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::extract::{AssetExtractor, ExtractOptions, Pass};
use crate::model::DocumentId;
use crate::pipeline::DocumentSource;
use crate::reference::AssetReference;

/// What an export run did.
#[derive(Debug, Default)]
pub struct ExportReport {
    /// Files written, in reference order per document
    pub written: Vec<PathBuf>,

    /// References that matched no re-derived asset
    pub missing: Vec<AssetReference>,

    /// Documents that could not be read
    pub failures: Vec<DocumentFailure>,
}

impl ExportReport {
    /// Whether every reference was written.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.failures.is_empty()
    }

    fn merge(&mut self, other: ExportReport) {
        self.written.extend(other.written);
        self.missing.extend(other.missing);
        self.failures.extend(other.failures);
    }
}

/// A document that failed during export.
#[derive(Debug)]
pub struct DocumentFailure {
    pub source: String,
    pub error: Error,
}

/// Re-derives and writes referenced assets.
#[derive(Debug, Clone)]
pub struct Exporter {
    extractor: AssetExtractor,
}

impl Exporter {
    pub fn new(extractor: AssetExtractor) -> Self {
        Self { extractor }
    }

    pub fn with_options(options: ExtractOptions) -> Self {
        Self::new(AssetExtractor::new(options))
    }

    /// Export `references` found in `sources` into `out_dir`.
    ///
    /// Only documents and pages named by a reference are read. Duplicate
    /// references are written once. Rerunning overwrites files with the
    /// same bytes.
    pub fn export(
        &self,
        references: &[AssetReference],
        sources: &[DocumentSource],
        out_dir: &Path,
    ) -> Result<ExportReport> {
        fs::create_dir_all(out_dir)?;

        let mut by_document: BTreeMap<&DocumentId, Vec<&AssetReference>> = BTreeMap::new();
        for reference in references {
            let refs = by_document.entry(&reference.document_id).or_default();
            if !refs.contains(&reference) {
                refs.push(reference);
            }
        }

        let mut report = ExportReport::default();
        let mut jobs = Vec::new();
        for (document_id, refs) in by_document {
            match sources.iter().find(|s| &s.document_id == document_id) {
                Some(source) => jobs.push((source, refs)),
                None => {
                    log::debug!("No source for document {}", document_id);
                    report.missing.extend(refs.into_iter().cloned());
                }
            }
        }

        let run = |(source, refs): &(&DocumentSource, Vec<&AssetReference>)| {
            self.export_document(source, refs, out_dir)
                .unwrap_or_else(|error| {
                    log::warn!("Export from {} failed: {}", source, error);
                    ExportReport {
                        failures: vec![DocumentFailure {
                            source: source.to_string(),
                            error,
                        }],
                        ..ExportReport::default()
                    }
                })
        };
        let parts: Vec<ExportReport> = if self.extractor.options().parallel {
            jobs.par_iter().map(run).collect()
        } else {
            jobs.iter().map(run).collect()
        };
        for part in parts {
            report.merge(part);
        }

        log::debug!(
            "Exported {} assets, {} missing, {} documents failed",
            report.written.len(),
            report.missing.len(),
            report.failures.len()
        );
        Ok(report)
    }

    fn export_document(
        &self,
        source: &DocumentSource,
        refs: &[&AssetReference],
        out_dir: &Path,
    ) -> Result<ExportReport> {
        let parser = source.open()?;
        let page_count = parser.page_count();
        let mut report = ExportReport::default();

        let (in_range, out_of_range): (Vec<&AssetReference>, Vec<&AssetReference>) =
            refs.iter().copied().partition(|r| r.page_index < page_count);
        report.missing.extend(out_of_range.into_iter().cloned());

        let page_indices: BTreeSet<u32> = in_range.iter().map(|r| r.page_index).collect();
        let pages = self.extractor.read_pages(&parser, page_indices)?;

        let unread = in_range
            .iter()
            .filter(|r| !pages.iter().any(|p| p.index == r.page_index));
        report.missing.extend(unread.map(|r| (*r).clone()));

        for page in &pages {
            let on_page: Vec<&AssetReference> = in_range
                .iter()
                .copied()
                .filter(|r| r.page_index == page.index)
                .collect();

            let candidates = self.extractor.extract_page_matching(
                page,
                &source.document_id,
                Pass::Export,
                |kind, index| on_page.iter().any(|r| r.kind == kind && r.local_index == index),
            )?;

            for reference in on_page {
                match candidates.iter().find(|c| reference.matches(&c.asset)) {
                    Some(found) => {
                        let path = out_dir.join(found.name().to_string());
                        fs::write(&path, &found.bytes)?;
                        report.written.push(path);
                    }
                    None => {
                        log::debug!("Reference {} was not re-derived", reference);
                        report.missing.push(reference.clone());
                    }
                }
            }
        }

        Ok(report)
    }
}

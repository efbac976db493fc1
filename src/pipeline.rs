//! Classifier, extractor and chunker wired together behind an optional
//! per-document cache.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, anyhow};
use tracing::{info, warn};

use crate::cache::ExtractionCache;
use crate::chunker::Chunker;
use crate::classifier::Classifier;
use crate::document::Document;
use crate::error::PipelineError;
use crate::extractor::{ExtractionInput, Extractor};
use crate::layout::LayoutAnalysis;
use crate::model::{
    ChunkingReport, Classification, DocumentStructure, ExtractionResult, LayoutHints, Script, TocMode,
};
use crate::util::sha256_bytes;

/// How the caller wants the sections turned into chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkRequest {
    Smart,
    Sections { split_large: bool },
    Pages { pages_per_chunk: usize },
}

pub struct Pipeline {
    classifier: Classifier,
    extractor: Extractor,
    chunker: Chunker,
    extractor_digest: String,
    cache: Option<Mutex<ExtractionCache>>,
}

impl Pipeline {
    pub fn new(classifier: Classifier) -> Result<Self, PipelineError> {
        let config = classifier.config().clone();
        let extractor_json =
            serde_json::to_vec(&config.extractor).context("failed to serialize extractor config")?;
        let mut extractor_digest = sha256_bytes(&extractor_json);
        extractor_digest.truncate(16);

        Ok(Self {
            extractor: Extractor::new(&config.extractor)?,
            chunker: Chunker::new(config.chunker),
            extractor_digest,
            classifier,
            cache: None,
        })
    }

    pub fn with_cache(mut self, cache: ExtractionCache) -> Self {
        self.cache = Some(Mutex::new(cache));
        self
    }

    pub fn classify(&self, bytes: &[u8]) -> Result<Classification, PipelineError> {
        let document = Document::from_bytes(bytes)?;
        self.classification_for(&document)
    }

    /// A cached extraction for the same document, hints and extractor
    /// thresholds is returned without classifying again.
    pub fn extract(&self, bytes: &[u8], hints: &LayoutHints) -> Result<DocumentStructure, PipelineError> {
        let document = Document::from_bytes(bytes)?;
        let hints_key = self.extraction_key(hints);

        if let Some(structure) = self.cached_structure(document.sha256(), &hints_key)? {
            info!(sha256 = %document.sha256(), hints = %hints_key, "extraction cache hit");
            return Ok(structure);
        }

        let classification = self.classification_for(&document)?;
        let result = self.extraction_for(&document, &classification, hints)?;
        Ok(DocumentStructure {
            doc_sha256: classification.doc_sha256,
            page_count: classification.page_count,
            script: classification.script,
            backend: classification.backend,
            result,
        })
    }

    pub fn chunk(
        &self,
        bytes: &[u8],
        hints: &LayoutHints,
        request: ChunkRequest,
    ) -> Result<ChunkingReport, PipelineError> {
        let document = Document::from_bytes(bytes)?;
        let classification = self.classification_for(&document)?;
        let result = self.extraction_for(&document, &classification, hints)?;

        let report = match request {
            ChunkRequest::Smart => self.chunker.smart_chunk(&result.sections, &classification),
            ChunkRequest::Sections { split_large } => {
                self.chunker
                    .by_sections(&result.sections, &classification.pages, split_large)
            }
            ChunkRequest::Pages { pages_per_chunk } => {
                self.chunker.by_pages(&classification.pages, pages_per_chunk)
            }
        };
        info!(
            sha256 = %classification.doc_sha256,
            chunks = report.total_chunks,
            "chunking complete"
        );
        Ok(report)
    }

    fn classification_for(&self, document: &Document) -> Result<Classification, PipelineError> {
        if let Some(cache) = self.lock_cache()? {
            if let Some(classification) = cache.load_classification(document.sha256())? {
                info!(sha256 = %document.sha256(), "classification cache hit");
                return Ok(classification);
            }
        }

        let classification = self.classifier.classify_document(document)?;
        if let Some(mut cache) = self.lock_cache()? {
            cache.store_classification(&classification)?;
        }
        Ok(classification)
    }

    fn extraction_for(
        &self,
        document: &Document,
        classification: &Classification,
        hints: &LayoutHints,
    ) -> Result<ExtractionResult, PipelineError> {
        let hints_key = self.extraction_key(hints);
        if let Some(cache) = self.lock_cache()? {
            if let Some(result) = cache.load_extraction(&classification.doc_sha256, &hints_key)? {
                return Ok(result);
            }
        }

        let load_layout = || self.layout_for_structured_hints(document, classification);
        let mut input = ExtractionInput::from_classification(classification, hints);
        if needs_requested_layout(classification, hints) {
            input = input.with_layout_loader(&load_layout);
        }
        let result = self.extractor.extract(&input);

        if let Some(mut cache) = self.lock_cache()? {
            cache.store_extraction(&classification.doc_sha256, &hints_key, &result)?;
        }
        Ok(result)
    }

    fn extraction_key(&self, hints: &LayoutHints) -> String {
        format!("{};extractor={}", hints.cache_key(), self.extractor_digest)
    }

    /// Structured contents reading needs tables even when classification
    /// settled on the local reader. Only runs once a strategy asks for them.
    fn layout_for_structured_hints(
        &self,
        document: &Document,
        classification: &Classification,
    ) -> Option<LayoutAnalysis> {
        info!(sha256 = %classification.doc_sha256, "requesting layout for structured contents");
        let layout = self.classifier.analyze_layout(
            document,
            classification.page_count,
            Some(classification.script.script),
        );
        if layout.is_none() {
            warn!("structured contents requested but no layout backend produced tables");
        }
        layout
    }

    fn cached_structure(
        &self,
        doc_sha256: &str,
        hints_key: &str,
    ) -> Result<Option<DocumentStructure>, PipelineError> {
        let Some(cache) = self.lock_cache()? else {
            return Ok(None);
        };
        let Some(result) = cache.load_extraction(doc_sha256, hints_key)? else {
            return Ok(None);
        };
        let Some(summary) = cache.load_summary(doc_sha256)? else {
            return Ok(None);
        };

        Ok(Some(DocumentStructure {
            doc_sha256: doc_sha256.to_string(),
            page_count: summary.page_count,
            script: summary.script,
            backend: summary.backend,
            result,
        }))
    }

    fn lock_cache(&self) -> Result<Option<MutexGuard<'_, ExtractionCache>>, PipelineError> {
        match &self.cache {
            Some(cache) => cache
                .lock()
                .map(Some)
                .map_err(|_| PipelineError::Other(anyhow!("extraction cache lock poisoned"))),
            None => Ok(None),
        }
    }
}

fn needs_requested_layout(classification: &Classification, hints: &LayoutHints) -> bool {
    hints.mode == TocMode::Structured
        && classification.script.script == Script::ArabicLike
        && classification.layout.is_none()
}

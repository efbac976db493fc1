use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::backend::{LocalReader, OcrBackend, QuickClassifier};
use crate::config::{PipelineConfig, ScanConfig, ScriptConfig};
use crate::document::Document;
use crate::error::PipelineError;
use crate::layout::LayoutAnalysis;
use crate::model::{
    Classification, DocumentKind, PageText, ScanClassification, ScanEvidence, Script,
    ScriptClassification, ScriptSource, TextBackend,
};
use crate::text::arabic_ratio;
use crate::util::{collapse_whitespace, word_count};

pub mod scan;
pub mod script;
#[cfg(test)]
mod tests;

pub use scan::{detect_scanned, is_garbage_text};
pub use script::{legacy_detect, quick_detect, quick_sample, script_for_code};

/// Outcome of backend selection: the script verdict, the backend whose
/// text was kept, and that text.
#[derive(Debug, Clone)]
pub struct BackendSelection {
    pub script: ScriptClassification,
    pub backend: TextBackend,
    pub pages: Vec<PageText>,
    pub layout: Option<LayoutAnalysis>,
}

pub struct Classifier {
    reader: Arc<dyn LocalReader>,
    ocr: Option<Arc<dyn OcrBackend>>,
    quick: Option<Arc<dyn QuickClassifier>>,
    config: PipelineConfig,
}

impl Classifier {
    pub fn new(reader: Arc<dyn LocalReader>, config: PipelineConfig) -> Self {
        Self {
            reader,
            ocr: None,
            quick: None,
            config,
        }
    }

    pub fn with_ocr(mut self, backend: Arc<dyn OcrBackend>) -> Self {
        self.ocr = Some(backend);
        self
    }

    pub fn with_quick_classifier(mut self, classifier: Arc<dyn QuickClassifier>) -> Self {
        self.quick = Some(classifier);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn classify(&self, bytes: &[u8]) -> Result<Classification, PipelineError> {
        let document = Document::from_bytes(bytes)?;
        self.classify_document(&document)
    }

    pub fn classify_document(&self, document: &Document) -> Result<Classification, PipelineError> {
        let page_count = self.reader.page_count(document).map_err(|err| {
            PipelineError::invalid(format!("unreadable document container: {err:#}"))
        })?;

        let sample = self.read_sample(document, page_count);
        let scan = detect_scanned(&sample, &self.config.scan);
        let document_kind = DocumentKind::from_pages(&sample);

        info!(
            sha256 = %document.sha256(),
            pages = page_count,
            scanned = scan.is_scanned,
            chars = scan.evidence.total_chars,
            words = scan.evidence.total_words,
            images = scan.evidence.total_images,
            text_page_ratio = scan.evidence.text_page_ratio,
            "scan detection complete"
        );

        let selection = self.select_backend_and_extract(document, page_count, &scan, &sample);

        let outline = if selection.script.script == Script::LatinLike {
            self.reader.outline(document).unwrap_or_else(|err| {
                warn!(error = %err, "outline unavailable");
                Vec::new()
            })
        } else {
            Vec::new()
        };

        info!(
            script = selection.script.script.as_str(),
            confidence = selection.script.confidence,
            source = selection.script.source.as_str(),
            backend = selection.backend.as_str(),
            outline_entries = outline.len(),
            "classification complete"
        );

        Ok(Classification {
            doc_sha256: document.sha256().to_string(),
            page_count,
            scan,
            script: selection.script,
            backend: selection.backend,
            document_kind,
            outline,
            layout: selection.layout,
            pages: selection.pages,
        })
    }

    fn read_sample(&self, document: &Document, page_count: u32) -> Vec<PageText> {
        if page_count == 0 {
            return Vec::new();
        }
        let last = page_count.min(self.config.scan.sample_pages.max(1));
        self.reader
            .read_pages(document, 1, Some(last))
            .unwrap_or_else(|err| {
                warn!(error = %err, "local sample read failed; treating sample as textless");
                Vec::new()
            })
    }

    /// Scanned documents go to OCR first. Otherwise a confident quick
    /// verdict routes Arabic to OCR and Latin to the local reader; without
    /// one, the legacy ratio test decides. OCR failure always degrades to
    /// the local reader.
    pub fn select_backend_and_extract(
        &self,
        document: &Document,
        page_count: u32,
        scan: &ScanClassification,
        sample: &[PageText],
    ) -> BackendSelection {
        if scan.is_scanned {
            return self
                .ocr_with_ratio(document, page_count)
                .unwrap_or_else(|| self.local_with_ratio(document, page_count));
        }

        if let Some(script) = self.confident_quick_detect(sample) {
            if script.script == Script::ArabicLike {
                if let Some(layout) = self.try_ocr(document, page_count, Some(Script::ArabicLike)) {
                    let pages = self.ocr_pages(&layout, page_count);
                    return BackendSelection {
                        script,
                        backend: TextBackend::Ocr,
                        pages,
                        layout: Some(layout),
                    };
                }
            }
            return BackendSelection {
                script,
                backend: TextBackend::LocalReader,
                pages: self.read_all_local(document, page_count),
                layout: None,
            };
        }

        self.ocr_with_ratio(document, page_count)
            .unwrap_or_else(|| self.local_with_ratio(document, page_count))
    }

    fn confident_quick_detect(&self, sample: &[PageText]) -> Option<ScriptClassification> {
        if !self.config.script.use_quick_detection {
            return None;
        }
        let classifier = self.quick.as_deref()?;
        let classification = quick_detect(sample, classifier, &self.config.script)?;

        if classification.confidence < self.config.script.confidence_threshold {
            warn!(
                confidence = classification.confidence,
                threshold = self.config.script.confidence_threshold,
                "quick detection below confidence bar; using text ratio"
            );
            return None;
        }
        Some(classification)
    }

    /// Runs the OCR backend outside classification, for callers that need
    /// layout structure the chosen text backend did not produce.
    pub fn analyze_layout(
        &self,
        document: &Document,
        page_count: u32,
        script_hint: Option<Script>,
    ) -> Option<LayoutAnalysis> {
        self.try_ocr(document, page_count, script_hint)
    }

    fn try_ocr(
        &self,
        document: &Document,
        page_count: u32,
        script_hint: Option<Script>,
    ) -> Option<LayoutAnalysis> {
        if !self.config.ocr.enabled {
            return None;
        }
        let Some(backend) = self.ocr.as_deref() else {
            debug!("no ocr backend configured");
            return None;
        };

        match backend.analyze(document, page_count, script_hint) {
            Ok(layout) => {
                info!(backend = backend.name(), pages = layout.pages.len(), "ocr analysis complete");
                Some(layout)
            }
            Err(err) => {
                warn!(backend = backend.name(), error = %err, "ocr backend failed; falling back to local reader");
                None
            }
        }
    }

    fn ocr_pages(&self, layout: &LayoutAnalysis, page_count: u32) -> Vec<PageText> {
        let mut pages = layout.to_pages(page_count);
        if page_count > 0 {
            pages.truncate(page_count as usize);
        }
        pages
    }

    fn ocr_with_ratio(&self, document: &Document, page_count: u32) -> Option<BackendSelection> {
        let layout = self.try_ocr(document, page_count, None)?;
        let pages = self.ocr_pages(&layout, page_count);
        let script = legacy_detect(
            &join_texts(&pages),
            ScriptSource::OcrTextRatio,
            self.config.script.arabic_ratio_threshold,
        );
        Some(BackendSelection {
            script,
            backend: TextBackend::Ocr,
            pages,
            layout: Some(layout),
        })
    }

    fn local_with_ratio(&self, document: &Document, page_count: u32) -> BackendSelection {
        let pages = self.read_all_local(document, page_count);
        let script = legacy_detect(
            &join_texts(&pages),
            ScriptSource::LocalTextRatio,
            self.config.script.arabic_ratio_threshold,
        );
        BackendSelection {
            script,
            backend: TextBackend::LocalReader,
            pages,
            layout: None,
        }
    }

    fn read_all_local(&self, document: &Document, page_count: u32) -> Vec<PageText> {
        if page_count == 0 {
            return Vec::new();
        }
        self.reader
            .read_pages(document, 1, Some(page_count))
            .unwrap_or_else(|err| {
                warn!(error = %err, "local full read failed; continuing without text");
                (1..=page_count).map(|page| PageText::new(page, "")).collect()
            })
    }
}

fn join_texts(pages: &[PageText]) -> String {
    pages
        .iter()
        .map(|page| page.text.as_str())
        .collect::<Vec<&str>>()
        .join("\n")
}

//! Capabilities the classifier depends on. Production implementations
//! shell out to poppler/tesseract or read a saved layout result; tests
//! substitute deterministic doubles.

use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use tracing::{debug, warn};
use whatlang::Detector;

use crate::config::OcrConfig;
use crate::document::Document;
use crate::layout::{LayoutAnalysis, LayoutLine, LayoutPage};
use crate::model::{OutlineEntry, PageText, Script};
use crate::tools;

/// Reads the embedded text layer without OCR.
pub trait LocalReader: Send + Sync {
    fn page_count(&self, document: &Document) -> Result<u32>;

    /// Pages `first..=last` (to the end when `last` is `None`), numbered
    /// from `first`.
    fn read_pages(&self, document: &Document, first: u32, last: Option<u32>) -> Result<Vec<PageText>>;

    fn outline(&self, document: &Document) -> Result<Vec<OutlineEntry>>;
}

/// A layout-capable text backend. Any error is treated as the backend
/// being unavailable for this document.
pub trait OcrBackend: Send + Sync {
    fn name(&self) -> &str;

    fn analyze(
        &self,
        document: &Document,
        page_count: u32,
        script_hint: Option<Script>,
    ) -> Result<LayoutAnalysis>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct LanguageGuess {
    /// ISO 639 code as reported by the model.
    pub code: String,
    pub confidence: f64,
}

pub trait QuickClassifier: Send + Sync {
    fn detect(&self, sample: &str) -> Option<LanguageGuess>;
}

#[derive(Debug, Clone, Default)]
pub struct PopplerReader {
    timeout: Option<Duration>,
}

impl PopplerReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

impl LocalReader for PopplerReader {
    fn page_count(&self, document: &Document) -> Result<u32> {
        tools::pdfinfo_page_count(document.path(), self.timeout)
    }

    fn read_pages(&self, document: &Document, first: u32, last: Option<u32>) -> Result<Vec<PageText>> {
        let first = first.max(1);
        let texts = tools::pdftotext_pages(document.path(), first, last, self.timeout)?;
        let image_counts = tools::pdfimages_counts(document.path(), first, last, self.timeout)
            .unwrap_or_else(|err| {
                warn!(error = %err, "pdfimages unavailable; image counts default to zero");
                Default::default()
            });

        let expected = last.map(|last| last.saturating_sub(first) as usize + 1);
        let mut pages: Vec<PageText> = texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| {
                let page = first + index as u32;
                PageText {
                    page,
                    text,
                    image_count: image_counts.get(&page).copied().unwrap_or(0),
                }
            })
            .collect();

        if let Some(expected) = expected {
            pages.truncate(expected);
            while pages.len() < expected {
                let page = first + pages.len() as u32;
                pages.push(PageText {
                    page,
                    text: String::new(),
                    image_count: image_counts.get(&page).copied().unwrap_or(0),
                });
            }
        }

        Ok(pages)
    }

    fn outline(&self, document: &Document) -> Result<Vec<OutlineEntry>> {
        tools::pdftohtml_outline(document.path(), self.timeout)
    }
}

/// Rasterizes every page and runs tesseract. The configured timeout bounds
/// the whole document, not each page.
#[derive(Debug, Clone)]
pub struct TesseractBackend {
    config: OcrConfig,
}

impl TesseractBackend {
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }

    /// `None` when pdftoppm or tesseract is missing from `PATH`.
    pub fn detect(config: OcrConfig) -> Option<Self> {
        if tools::command_available("pdftoppm") && tools::command_available("tesseract") {
            Some(Self::new(config))
        } else {
            None
        }
    }

    fn language_for(&self, script_hint: Option<Script>) -> String {
        match script_hint {
            Some(Script::ArabicLike) => self.config.arabic_lang.clone(),
            Some(Script::LatinLike) => self.config.latin_lang.clone(),
            None => format!("{}+{}", self.config.arabic_lang, self.config.latin_lang),
        }
    }
}

impl OcrBackend for TesseractBackend {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn analyze(
        &self,
        document: &Document,
        page_count: u32,
        script_hint: Option<Script>,
    ) -> Result<LayoutAnalysis> {
        let lang = self.language_for(script_hint);
        let deadline = Instant::now() + self.config.timeout();
        let mut pages = Vec::with_capacity(page_count as usize);

        for page_number in 1..=page_count {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                bail!(
                    "tesseract exceeded {}s after {} of {} pages",
                    self.config.timeout_secs,
                    page_number - 1,
                    page_count
                );
            }

            let text = tools::ocr_page(
                document.path(),
                page_number,
                &lang,
                self.config.resolution_dpi,
                Some(remaining),
            )?;
            debug!(page = page_number, chars = text.len(), "ocr page complete");

            pages.push(LayoutPage {
                page_number,
                lines: text
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(|line| LayoutLine {
                        content: line.to_string(),
                    })
                    .collect(),
            });
        }

        Ok(LayoutAnalysis {
            api_version: Some(format!("tesseract:{lang}")),
            pages,
            ..LayoutAnalysis::default()
        })
    }
}

/// Serves a layout result saved from an external analysis service.
#[derive(Debug, Clone)]
pub struct LayoutFileBackend {
    path: PathBuf,
}

impl LayoutFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl OcrBackend for LayoutFileBackend {
    fn name(&self) -> &str {
        "layout-file"
    }

    fn analyze(
        &self,
        _document: &Document,
        _page_count: u32,
        _script_hint: Option<Script>,
    ) -> Result<LayoutAnalysis> {
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        LayoutAnalysis::from_json(&raw)
            .with_context(|| format!("failed to load layout result {}", self.path.display()))
    }
}

fn shared_detector() -> &'static Detector {
    static DETECTOR: OnceLock<Detector> = OnceLock::new();
    DETECTOR.get_or_init(Detector::new)
}

/// Trigram language model; built once per process on first use.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhatlangClassifier;

impl QuickClassifier for WhatlangClassifier {
    fn detect(&self, sample: &str) -> Option<LanguageGuess> {
        let info = shared_detector().detect(sample)?;
        Some(LanguageGuess {
            code: info.lang().code().to_string(),
            confidence: info.confidence(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn layout_file_backend_reads_wrapped_result() {
        let mut file = NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"analyzeResult":{{"pages":[{{"pageNumber":1,"lines":[{{"content":"مقدمة"}}]}}]}}}}"#
        )
        .expect("write layout");

        let document = Document::from_bytes(b"%PDF-1.4\n%%EOF").expect("document");
        let backend = LayoutFileBackend::new(file.path());
        let analysis = backend.analyze(&document, 1, None).expect("analysis");

        assert_eq!(backend.name(), "layout-file");
        assert_eq!(analysis.pages.len(), 1);
        assert_eq!(analysis.pages[0].lines[0].content, "مقدمة");
    }

    #[test]
    fn layout_file_backend_missing_file_is_an_error() {
        let document = Document::from_bytes(b"%PDF-1.4\n%%EOF").expect("document");
        let backend = LayoutFileBackend::new("/nonexistent/layout.json");
        assert!(backend.analyze(&document, 1, None).is_err());
    }

    #[test]
    fn whatlang_classifier_recognizes_english_and_arabic() {
        let english = "The history of the printing press begins in the fifteenth century, \
                       when movable type changed how books were produced and shared across Europe.";
        let arabic = "بدأ تاريخ الطباعة في القرن الخامس عشر عندما غيرت الحروف المتحركة طريقة إنتاج الكتب ونشرها";

        let guess = WhatlangClassifier.detect(english).expect("english guess");
        assert_eq!(guess.code, "eng");

        let guess = WhatlangClassifier.detect(arabic).expect("arabic guess");
        assert_eq!(guess.code, "ara");
    }
}

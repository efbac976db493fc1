use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, anyhow};

use super::*;
use crate::backend::LanguageGuess;
use crate::layout::{LayoutLine, LayoutPage};
use crate::model::OutlineEntry;

const PDF_BYTES: &[u8] = b"%PDF-1.7\n%stub\n%%EOF";

const ENGLISH_PAGE: &str = "The printed book arranges its chapters across many pages, \
     and each chapter opens with a heading that readers use to find their way.";
const ARABIC_PAGE: &str = "يتناول هذا الكتاب تاريخ الطباعة في العالم العربي وأثرها في نشر المعرفة بين الناس";

struct StubReader {
    pages: Vec<PageText>,
    outline: Vec<OutlineEntry>,
    broken: bool,
}

impl StubReader {
    fn with_text(texts: Vec<String>) -> Self {
        Self {
            pages: texts
                .into_iter()
                .enumerate()
                .map(|(index, text)| PageText::new(index as u32 + 1, text))
                .collect(),
            outline: Vec::new(),
            broken: false,
        }
    }
}

impl LocalReader for StubReader {
    fn page_count(&self, _document: &Document) -> Result<u32> {
        if self.broken {
            return Err(anyhow!("xref table damaged"));
        }
        Ok(self.pages.len() as u32)
    }

    fn read_pages(&self, _document: &Document, first: u32, last: Option<u32>) -> Result<Vec<PageText>> {
        let last = last.unwrap_or(self.pages.len() as u32);
        Ok(self
            .pages
            .iter()
            .filter(|page| page.page >= first && page.page <= last)
            .cloned()
            .collect())
    }

    fn outline(&self, _document: &Document) -> Result<Vec<OutlineEntry>> {
        Ok(self.outline.clone())
    }
}

struct StubOcr {
    text: String,
    fail: bool,
    hints: Mutex<Vec<Option<Script>>>,
}

impl StubOcr {
    fn returning(text: &str) -> Self {
        Self {
            text: text.to_string(),
            fail: false,
            hints: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::returning("")
        }
    }

    fn calls(&self) -> Vec<Option<Script>> {
        self.hints.lock().expect("hints lock").clone()
    }
}

impl OcrBackend for StubOcr {
    fn name(&self) -> &str {
        "stub-ocr"
    }

    fn analyze(
        &self,
        _document: &Document,
        page_count: u32,
        script_hint: Option<Script>,
    ) -> Result<LayoutAnalysis> {
        self.hints.lock().expect("hints lock").push(script_hint);
        if self.fail {
            return Err(anyhow!("service timed out"));
        }
        Ok(LayoutAnalysis {
            pages: (1..=page_count)
                .map(|page_number| LayoutPage {
                    page_number,
                    lines: vec![LayoutLine {
                        content: self.text.clone(),
                    }],
                })
                .collect(),
            ..LayoutAnalysis::default()
        })
    }
}

struct StubQuick {
    guess: Option<LanguageGuess>,
    calls: AtomicUsize,
}

impl StubQuick {
    fn answering(code: &str, confidence: f64) -> Self {
        Self {
            guess: Some(LanguageGuess {
                code: code.to_string(),
                confidence,
            }),
            calls: AtomicUsize::new(0),
        }
    }
}

impl QuickClassifier for StubQuick {
    fn detect(&self, _sample: &str) -> Option<LanguageGuess> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.guess.clone()
    }
}

fn repeated(text: &str, pages: usize) -> Vec<String> {
    vec![text.to_string(); pages]
}

#[test]
fn near_empty_document_is_scanned_and_routed_to_ocr() {
    let reader = Arc::new(StubReader::with_text(repeated(" ", 50)));
    let ocr = Arc::new(StubOcr::returning(ARABIC_PAGE));
    let quick = Arc::new(StubQuick::answering("eng", 0.99));

    let classifier = Classifier::new(reader, PipelineConfig::default())
        .with_ocr(ocr.clone())
        .with_quick_classifier(quick.clone());
    let classification = classifier.classify(PDF_BYTES).expect("classification");

    assert!(classification.scan.is_scanned);
    assert_eq!(classification.scan.evidence.pages_sampled, 10);
    assert_eq!(classification.backend, TextBackend::Ocr);
    assert_eq!(classification.script.script, Script::ArabicLike);
    assert_eq!(classification.script.source, ScriptSource::OcrTextRatio);
    assert_eq!(classification.pages.len(), 50);
    assert_eq!(classification.document_kind, DocumentKind::ImageOnly);
    assert!(classification.layout.is_some());
    assert_eq!(quick.calls.load(Ordering::SeqCst), 0);
    assert_eq!(ocr.calls(), vec![None]);
}

#[test]
fn scanned_document_falls_back_to_local_reader_when_ocr_fails() {
    let reader = Arc::new(StubReader::with_text(repeated("", 12)));
    let ocr = Arc::new(StubOcr::failing());

    let classifier = Classifier::new(reader, PipelineConfig::default()).with_ocr(ocr.clone());
    let classification = classifier.classify(PDF_BYTES).expect("classification");

    assert!(classification.scan.is_scanned);
    assert_eq!(classification.backend, TextBackend::LocalReader);
    assert_eq!(classification.script.source, ScriptSource::LocalTextRatio);
    assert_eq!(classification.pages.len(), 12);
    assert!(classification.layout.is_none());
    assert_eq!(ocr.calls().len(), 1);
}

#[test]
fn confident_latin_verdict_uses_local_reader_and_reads_outline() {
    let mut reader = StubReader::with_text(repeated(ENGLISH_PAGE, 20));
    reader.outline = vec![OutlineEntry {
        level: 1,
        title: "Introduction".to_string(),
        page: 1,
    }];
    let ocr = Arc::new(StubOcr::returning(ENGLISH_PAGE));
    let quick = Arc::new(StubQuick::answering("eng", 0.93));

    let classifier = Classifier::new(Arc::new(reader), PipelineConfig::default())
        .with_ocr(ocr.clone())
        .with_quick_classifier(quick.clone());
    let classification = classifier.classify(PDF_BYTES).expect("classification");

    assert!(!classification.scan.is_scanned);
    assert_eq!(classification.script.script, Script::LatinLike);
    assert_eq!(classification.script.source, ScriptSource::QuickClassifier);
    assert_eq!(classification.backend, TextBackend::LocalReader);
    assert_eq!(classification.outline.len(), 1);
    assert_eq!(classification.pages.len(), 20);
    assert!(ocr.calls().is_empty());
    assert_eq!(quick.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn confident_arabic_verdict_re_extracts_with_ocr() {
    let reader = Arc::new(StubReader::with_text(repeated(ARABIC_PAGE, 8)));
    let ocr = Arc::new(StubOcr::returning(ARABIC_PAGE));
    let quick = Arc::new(StubQuick::answering("ara", 0.88));

    let classifier = Classifier::new(reader, PipelineConfig::default())
        .with_ocr(ocr.clone())
        .with_quick_classifier(quick);
    let classification = classifier.classify(PDF_BYTES).expect("classification");

    assert_eq!(classification.script.script, Script::ArabicLike);
    assert_eq!(classification.backend, TextBackend::Ocr);
    assert!(classification.outline.is_empty());
    assert_eq!(ocr.calls(), vec![Some(Script::ArabicLike)]);
}

#[test]
fn unexpected_language_code_forces_ratio_fallback() {
    let reader = Arc::new(StubReader::with_text(repeated(ENGLISH_PAGE, 8)));
    let quick = Arc::new(StubQuick::answering("fra", 0.97));

    let classifier = Classifier::new(reader, PipelineConfig::default()).with_quick_classifier(quick);
    let classification = classifier.classify(PDF_BYTES).expect("classification");

    assert_eq!(classification.script.source, ScriptSource::LocalTextRatio);
    assert_eq!(classification.script.script, Script::LatinLike);
    assert_eq!(classification.backend, TextBackend::LocalReader);
}

#[test]
fn low_confidence_arabic_verdict_defers_to_ocr_ratio() {
    let reader = Arc::new(StubReader::with_text(repeated(ARABIC_PAGE, 8)));
    let ocr = Arc::new(StubOcr::returning(ARABIC_PAGE));
    let quick = Arc::new(StubQuick::answering("ara", 0.2));

    let classifier = Classifier::new(reader, PipelineConfig::default())
        .with_ocr(ocr.clone())
        .with_quick_classifier(quick);
    let classification = classifier.classify(PDF_BYTES).expect("classification");

    assert_eq!(classification.script.source, ScriptSource::OcrTextRatio);
    assert_eq!(classification.script.script, Script::ArabicLike);
    assert_eq!(classification.backend, TextBackend::Ocr);
    assert_eq!(ocr.calls(), vec![None]);
}

#[test]
fn malformed_container_is_an_input_error() {
    let reader = Arc::new(StubReader::with_text(repeated(ENGLISH_PAGE, 3)));
    let classifier = Classifier::new(reader, PipelineConfig::default());
    let error = classifier.classify(b"<html>").err().expect("not a pdf");
    assert!(error.is_input_error());

    let mut broken = StubReader::with_text(Vec::new());
    broken.broken = true;
    let classifier = Classifier::new(Arc::new(broken), PipelineConfig::default());
    let error = classifier.classify(PDF_BYTES).err().expect("unreadable container");
    assert!(error.is_input_error());
}

#[test]
fn garbage_text_is_detected_by_alpha_ratio_and_token_length() {
    let config = ScanConfig::default();

    assert!(is_garbage_text("%$#@ !!?? 0x12 ## $$ %% ^^ && ** (( ))", &config));
    assert!(is_garbage_text(
        "abcdefghijklmnopqrstuvwxyzabcdefghijklmnopqrstuvwxyz",
        &config
    ));
    assert!(!is_garbage_text(ENGLISH_PAGE, &config));
    assert!(!is_garbage_text(ARABIC_PAGE, &config));
    assert!(!is_garbage_text("$$ ##", &config));
}

#[test]
fn garbage_pages_count_as_textless_in_scan_evidence() {
    let config = ScanConfig::default();
    let mut pages: Vec<PageText> = (1..=10)
        .map(|page| PageText::new(page, "\u{e001}\u{e002}\u{e003} ## %% $$ @@ !! ^^ && ** ((("))
        .collect();
    pages[0].image_count = 2;

    let scan = detect_scanned(&pages, &config);
    assert!(scan.is_scanned);
    assert_eq!(scan.evidence.garbage_pages, 10);
    assert_eq!(scan.evidence.total_chars, 0);
    assert_eq!(scan.evidence.total_images, 2);

    let digital: Vec<PageText> = (1..=10).map(|page| PageText::new(page, ENGLISH_PAGE)).collect();
    let scan = detect_scanned(&digital, &config);
    assert!(!scan.is_scanned);
    assert_eq!(scan.evidence.pages_with_text, 10);
    assert_eq!(scan.evidence.text_page_ratio, 1.0);
}

#[test]
fn legacy_ratio_uses_threshold_and_reports_confidence() {
    let arabic = legacy_detect(ARABIC_PAGE, ScriptSource::LocalTextRatio, 0.3);
    assert_eq!(arabic.script, Script::ArabicLike);
    assert!(arabic.confidence > 0.9);

    let latin = legacy_detect(ENGLISH_PAGE, ScriptSource::OcrTextRatio, 0.3);
    assert_eq!(latin.script, Script::LatinLike);
    assert_eq!(latin.confidence, 1.0);
    assert_eq!(latin.source, ScriptSource::OcrTextRatio);

    let empty = legacy_detect("", ScriptSource::LocalTextRatio, 0.3);
    assert_eq!(empty.script, Script::LatinLike);
}

#[test]
fn quick_sample_skips_front_matter_and_truncates() {
    let config = ScriptConfig {
        sample_chars: 12,
        ..ScriptConfig::default()
    };
    let pages: Vec<PageText> = ["cover", "copyright", "dedication", "body   text\nhere and more"]
        .iter()
        .enumerate()
        .map(|(index, text)| PageText::new(index as u32 + 1, *text))
        .collect();

    assert_eq!(quick_sample(&pages, &config), "body text he");
    assert_eq!(quick_sample(&pages[..2], &config), "cover copyri");
    assert_eq!(script_for_code("ara"), Some(Script::ArabicLike));
    assert_eq!(script_for_code("deu"), None);
}

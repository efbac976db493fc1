use serde::{Deserialize, Serialize};

use crate::layout::LayoutAnalysis;

/// Placeholder end page for strategies that cannot see the page count.
/// `extractor::fix_ranges` clamps it to the real document length.
pub const OPEN_PAGE_END: u32 = 9999;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    pub page: u32,
    pub text: String,
    #[serde(default)]
    pub image_count: u32,
}

impl PageText {
    pub fn new(page: u32, text: impl Into<String>) -> Self {
        Self {
            page,
            text: text.into(),
            image_count: 0,
        }
    }

    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ScanEvidence {
    pub total_chars: usize,
    pub total_words: usize,
    pub total_images: usize,
    pub pages_sampled: usize,
    pub pages_with_text: usize,
    pub garbage_pages: usize,
    pub text_page_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanClassification {
    pub is_scanned: bool,
    pub evidence: ScanEvidence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Script {
    LatinLike,
    ArabicLike,
}

impl Script {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LatinLike => "latin_like",
            Self::ArabicLike => "arabic_like",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptSource {
    QuickClassifier,
    OcrTextRatio,
    LocalTextRatio,
}

impl ScriptSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::QuickClassifier => "quick_classifier",
            Self::OcrTextRatio => "ocr_text_ratio",
            Self::LocalTextRatio => "local_text_ratio",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptClassification {
    pub script: Script,
    pub confidence: f64,
    pub source: ScriptSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextBackend {
    LocalReader,
    Ocr,
}

impl TextBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LocalReader => "local_reader",
            Self::Ocr => "ocr",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "local_reader" => Some(Self::LocalReader),
            "ocr" => Some(Self::Ocr),
            _ => None,
        }
    }
}

/// Text-layer shape of the document, judged from pages the local reader saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    ImageOnly,
    TextOnly,
    Mixed,
}

impl DocumentKind {
    pub fn from_pages(pages: &[PageText]) -> Self {
        let with_text = pages.iter().filter(|page| page.has_text()).count();
        if with_text == 0 {
            Self::ImageOnly
        } else if with_text == pages.len() {
            Self::TextOnly
        } else {
            Self::Mixed
        }
    }
}

/// One embedded bookmark as read from the document outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineEntry {
    pub level: u32,
    pub title: String,
    pub page: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub doc_sha256: String,
    pub page_count: u32,
    pub scan: ScanClassification,
    pub script: ScriptClassification,
    pub backend: TextBackend,
    pub document_kind: DocumentKind,
    pub outline: Vec<OutlineEntry>,
    pub layout: Option<LayoutAnalysis>,
    pub pages: Vec<PageText>,
}

impl Classification {
    pub fn image_dominant(&self) -> bool {
        self.scan.is_scanned || self.document_kind == DocumentKind::ImageOnly
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub title: String,
    pub level: u32,
    pub page_start: u32,
    pub page_end: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    NativeOutline,
    PatternHeading,
    KeywordScan,
    LayoutTable,
    HeadingRole,
    Fallback,
}

impl StrategyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NativeOutline => "native_outline",
            Self::PatternHeading => "pattern_heading",
            Self::KeywordScan => "keyword_scan",
            Self::LayoutTable => "layout_table",
            Self::HeadingRole => "heading_role",
            Self::Fallback => "fallback",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "native_outline" => Some(Self::NativeOutline),
            "pattern_heading" => Some(Self::PatternHeading),
            "keyword_scan" => Some(Self::KeywordScan),
            "layout_table" => Some(Self::LayoutTable),
            "heading_role" => Some(Self::HeadingRole),
            "fallback" => Some(Self::Fallback),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub found: bool,
    pub strategy: StrategyKind,
    pub sections: Vec<Section>,
}

/// How Arabic documents look for their table of contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TocMode {
    /// Scan the extracted text for a contents keyword.
    #[default]
    Text,
    /// Read the layout backend's tables starting at a caller-given page.
    Structured,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LayoutHints {
    pub toc_page: Option<u32>,
    pub page_offset: i32,
    pub mode: TocMode,
}

impl LayoutHints {
    pub fn structured(toc_page: u32, page_offset: i32) -> Self {
        Self {
            toc_page: Some(toc_page),
            page_offset,
            mode: TocMode::Structured,
        }
    }

    pub fn cache_key(&self) -> String {
        let mode = match self.mode {
            TocMode::Text => "text",
            TocMode::Structured => "structured",
        };
        format!(
            "mode={};toc={};offset={}",
            mode,
            self.toc_page.map(|page| page.to_string()).unwrap_or_default(),
            self.page_offset
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub section_id: String,
    pub section_title: String,
    pub index_within_section: u32,
    pub page_start: u32,
    pub page_end: u32,
    pub text: String,
    pub word_count: usize,
    pub char_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChunkStrategy {
    SectionBased,
    PageBased,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingReport {
    pub strategy: ChunkStrategy,
    pub total_chunks: usize,
    pub chunks: Vec<Chunk>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentStructure {
    pub doc_sha256: String,
    pub page_count: u32,
    pub script: ScriptClassification,
    pub backend: TextBackend,
    pub result: ExtractionResult,
}

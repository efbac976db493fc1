//! Section extraction. Strategies run in a fixed order and the first one
//! whose output clears its bar wins; when none does, a single section
//! spanning the document is returned.

use std::cell::OnceCell;
use std::collections::{BTreeMap, HashSet};

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{debug, info};

use crate::config::ExtractorConfig;
use crate::layout::{LayoutAnalysis, LayoutTable as LayoutTableData, table_page};
use crate::model::{
    Classification, ExtractionResult, LayoutHints, OPEN_PAGE_END, OutlineEntry, PageText, Script,
    Section, StrategyKind, TocMode,
};
use crate::text::{
    HeaderFooterFilter, is_digit_only, normalize_arabic, normalize_digits, parse_page_number,
};
use crate::util::char_boundary_at_fraction;

pub mod cleaning;
pub mod heading_role;
pub mod keyword;
pub mod layout_table;
pub mod outline;
pub mod pattern;

pub use cleaning::{TocEntry, clean_monotonic};
pub use heading_role::HeadingRole;
pub use keyword::KeywordAnchored;
pub use layout_table::LayoutTable;
pub use outline::NativeOutline;
pub use pattern::PatternHeading;

/// Produces a layout on first use. Layout analysis can mean an OCR pass over
/// the whole document, so it only runs once a strategy asks for it.
pub type LayoutLoader<'a> = &'a dyn Fn() -> Option<LayoutAnalysis>;

/// Everything a strategy may look at. Built once per document.
pub struct ExtractionInput<'a> {
    pub pages: &'a [PageText],
    pub full_text: String,
    pub script: Script,
    pub outline: &'a [OutlineEntry],
    pub hints: &'a LayoutHints,
    pub page_count: u32,
    layout: Option<&'a LayoutAnalysis>,
    layout_loader: Option<LayoutLoader<'a>>,
    loaded_layout: OnceCell<Option<LayoutAnalysis>>,
}

impl<'a> ExtractionInput<'a> {
    pub fn new(pages: &'a [PageText], script: Script, page_count: u32, hints: &'a LayoutHints) -> Self {
        Self {
            pages,
            full_text: pages
                .iter()
                .map(|page| page.text.as_str())
                .collect::<Vec<&str>>()
                .join("\n"),
            script,
            outline: &[],
            hints,
            page_count,
            layout: None,
            layout_loader: None,
            loaded_layout: OnceCell::new(),
        }
    }

    pub fn from_classification(classification: &'a Classification, hints: &'a LayoutHints) -> Self {
        let mut input = Self::new(
            &classification.pages,
            classification.script.script,
            classification.page_count,
            hints,
        );
        input.outline = &classification.outline;
        input.layout = classification.layout.as_ref();
        input
    }

    pub fn with_outline(mut self, outline: &'a [OutlineEntry]) -> Self {
        self.outline = outline;
        self
    }

    pub fn with_layout(mut self, layout: &'a LayoutAnalysis) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Used when no layout is at hand yet; `loader` runs at most once.
    pub fn with_layout_loader(mut self, loader: LayoutLoader<'a>) -> Self {
        self.layout_loader = Some(loader);
        self
    }

    pub fn layout(&self) -> Option<&LayoutAnalysis> {
        if let Some(layout) = self.layout {
            return Some(layout);
        }
        let loader = self.layout_loader?;
        self.loaded_layout.get_or_init(|| loader()).as_ref()
    }
}

pub trait Strategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Cheap precondition check; a strategy that does not apply is skipped
    /// without being attempted.
    fn applies_to(&self, input: &ExtractionInput<'_>) -> bool;

    /// `None` when the strategy found nothing that clears its bar.
    fn attempt(&self, input: &ExtractionInput<'_>) -> Option<Vec<Section>>;
}

pub struct Extractor {
    strategies: Vec<Box<dyn Strategy>>,
}

impl Extractor {
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        Ok(Self::with_strategies(vec![
            Box::new(NativeOutline::new(config)),
            Box::new(PatternHeading::new(config)?),
            Box::new(KeywordAnchored::new(config)?),
            Box::new(LayoutTable::new(config)?),
            Box::new(HeadingRole::new(config)?),
        ]))
    }

    pub fn with_strategies(strategies: Vec<Box<dyn Strategy>>) -> Self {
        Self { strategies }
    }

    pub fn strategy_kinds(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|strategy| strategy.kind()).collect()
    }

    pub fn extract(&self, input: &ExtractionInput<'_>) -> ExtractionResult {
        for strategy in &self.strategies {
            let kind = strategy.kind();
            if !strategy.applies_to(input) {
                debug!(strategy = kind.as_str(), "strategy not applicable");
                continue;
            }

            match strategy.attempt(input) {
                Some(sections) if !sections.is_empty() => {
                    info!(
                        strategy = kind.as_str(),
                        sections = sections.len(),
                        "strategy accepted"
                    );
                    let mut result = ExtractionResult {
                        found: true,
                        strategy: kind,
                        sections,
                    };
                    fix_ranges(&mut result, input.page_count);
                    return result;
                }
                _ => info!(strategy = kind.as_str(), "strategy rejected"),
            }
        }

        info!(pages = input.page_count, "no strategy accepted; using whole-document section");
        fallback_result(input.page_count)
    }
}

/// Clamps sentinel and overlong end pages to the document length and keeps
/// every range non-empty.
pub fn fix_ranges(result: &mut ExtractionResult, total_pages: u32) {
    let total = total_pages.max(1);
    for section in &mut result.sections {
        if section.page_end > total || section.page_end == OPEN_PAGE_END {
            section.page_end = total;
        }
        section.page_start = section.page_start.clamp(1, total);
        if section.page_end < section.page_start {
            section.page_end = section.page_start;
        }
    }
}

pub fn fallback_result(page_count: u32) -> ExtractionResult {
    ExtractionResult {
        found: false,
        strategy: StrategyKind::Fallback,
        sections: vec![Section {
            id: "1".to_string(),
            title: "Document".to_string(),
            level: 1,
            page_start: 1,
            page_end: page_count.max(1),
        }],
    }
}

/// Flat sections from a page-ordered contents list. The last entry's end is
/// left open for `fix_ranges` to close.
pub(crate) fn toc_sections(entries: &[TocEntry]) -> Vec<Section> {
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let page_end = match entries.get(index + 1) {
                Some(next) => next.page.saturating_sub(1).max(entry.page),
                None => OPEN_PAGE_END,
            };
            Section {
                id: (index + 1).to_string(),
                title: entry.title.clone(),
                level: 1,
                page_start: entry.page,
                page_end,
            }
        })
        .collect()
}

pub(crate) fn title_length_ok(title: &str, config: &ExtractorConfig) -> bool {
    let length = title.chars().count();
    length >= config.min_title_chars && length <= config.max_title_chars
}

use tracing::info;

use crate::config::ChunkerConfig;
use crate::model::{Chunk, ChunkStrategy, ChunkingReport, Classification, PageText, Section};
use crate::util::word_count;

pub const PAGE_SECTION_ID: &str = "pages";
const PARAGRAPH_BREAK: &str = "\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkPlan {
    Sections,
    Pages(usize),
}

#[derive(Debug, Clone, Copy)]
struct Paragraph<'a> {
    page: u32,
    text: &'a str,
    words: usize,
}

#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    /// Image-dominant documents are chunked by wide page windows, documents
    /// with real structure by section, everything else by narrow page windows.
    pub fn select_strategy(&self, sections: &[Section], classification: &Classification) -> ChunkPlan {
        if classification.image_dominant() {
            ChunkPlan::Pages(self.config.image_pages_per_chunk)
        } else if sections.len() > 1 {
            ChunkPlan::Sections
        } else {
            ChunkPlan::Pages(self.config.pages_per_chunk)
        }
    }

    pub fn smart_chunk(&self, sections: &[Section], classification: &Classification) -> ChunkingReport {
        let plan = self.select_strategy(sections, classification);
        info!(?plan, sections = sections.len(), "chunking plan selected");
        match plan {
            ChunkPlan::Sections => self.by_sections(sections, &classification.pages, true),
            ChunkPlan::Pages(pages_per_chunk) => self.by_pages(&classification.pages, pages_per_chunk),
        }
    }

    pub fn by_sections(&self, sections: &[Section], pages: &[PageText], split_large: bool) -> ChunkingReport {
        let mut chunks = Vec::new();

        for section in sections {
            let section_pages: Vec<&PageText> = pages
                .iter()
                .filter(|page| page.page >= section.page_start && page.page <= section.page_end)
                .collect();
            let text = join_page_text(&section_pages);
            let words = word_count(&text);

            if split_large && words > self.config.max_words {
                let parts = self.split_section(section, &section_pages);
                info!(
                    section = %section.id,
                    words,
                    chunks = parts.len(),
                    "split oversized section"
                );
                chunks.extend(parts);
            } else {
                chunks.push(build_chunk(section, 0, section.page_start, section.page_end, text));
            }
        }

        info!(chunks = chunks.len(), sections = sections.len(), "section-based chunking complete");
        ChunkingReport {
            strategy: ChunkStrategy::SectionBased,
            total_chunks: chunks.len(),
            chunks,
        }
    }

    pub fn by_pages(&self, pages: &[PageText], pages_per_chunk: usize) -> ChunkingReport {
        let window = pages_per_chunk.max(1);
        let chunks: Vec<Chunk> = pages
            .chunks(window)
            .enumerate()
            .filter_map(|(index, group)| {
                let first = group.first()?.page;
                let last = group.last()?.page;
                let text = join_page_text(&group.iter().collect::<Vec<&PageText>>());
                Some(Chunk {
                    id: format!("page-{index}"),
                    section_id: PAGE_SECTION_ID.to_string(),
                    section_title: format!("Pages {first}–{last}"),
                    index_within_section: index as u32,
                    page_start: first,
                    page_end: last,
                    word_count: word_count(&text),
                    char_count: text.chars().count(),
                    text,
                })
            })
            .collect();

        info!(chunks = chunks.len(), pages_per_chunk = window, "page-based chunking complete");
        ChunkingReport {
            strategy: ChunkStrategy::PageBased,
            total_chunks: chunks.len(),
            chunks,
        }
    }

    /// Greedy paragraph packing. A paragraph is never split, so one larger
    /// than the limit becomes a chunk of its own.
    fn split_section(&self, section: &Section, pages: &[&PageText]) -> Vec<Chunk> {
        let paragraphs: Vec<Paragraph<'_>> = pages
            .iter()
            .filter(|page| page.has_text())
            .flat_map(|page| {
                page.text
                    .split(PARAGRAPH_BREAK)
                    .filter(|text| !text.trim().is_empty())
                    .map(|text| Paragraph {
                        page: page.page,
                        text: text.trim(),
                        words: word_count(text),
                    })
            })
            .collect();

        let mut chunks = Vec::new();
        let mut current: Vec<Paragraph<'_>> = Vec::new();
        let mut current_words = 0usize;

        for paragraph in paragraphs {
            if !current.is_empty() && current_words + paragraph.words > self.config.max_words {
                chunks.push(paragraph_chunk(section, chunks.len() as u32, &current));
                current.clear();
                current_words = 0;
            }
            current_words += paragraph.words;
            current.push(paragraph);
        }
        if !current.is_empty() {
            chunks.push(paragraph_chunk(section, chunks.len() as u32, &current));
        }

        chunks
    }
}

fn join_page_text(pages: &[&PageText]) -> String {
    pages
        .iter()
        .filter(|page| page.has_text())
        .map(|page| page.text.as_str())
        .collect::<Vec<&str>>()
        .join(PARAGRAPH_BREAK)
        .trim()
        .to_string()
}

fn paragraph_chunk(section: &Section, index: u32, paragraphs: &[Paragraph<'_>]) -> Chunk {
    let page_start = paragraphs.first().map(|paragraph| paragraph.page).unwrap_or(section.page_start);
    let page_end = paragraphs.last().map(|paragraph| paragraph.page).unwrap_or(section.page_end);
    let text = paragraphs
        .iter()
        .map(|paragraph| paragraph.text)
        .collect::<Vec<&str>>()
        .join(PARAGRAPH_BREAK);
    build_chunk(section, index, page_start, page_end, text)
}

fn build_chunk(section: &Section, index: u32, page_start: u32, page_end: u32, text: String) -> Chunk {
    Chunk {
        id: format!("{}.{}", section.id, index),
        section_id: section.id.clone(),
        section_title: section.title.clone(),
        index_within_section: index,
        page_start,
        page_end,
        word_count: word_count(&text),
        char_count: text.chars().count(),
        text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        DocumentKind, ScanClassification, ScanEvidence, Script, ScriptClassification, ScriptSource,
        TextBackend,
    };
    use crate::util::collapse_whitespace;

    fn section(id: &str, page_start: u32, page_end: u32) -> Section {
        Section {
            id: id.to_string(),
            title: format!("Section {id}"),
            level: 1,
            page_start,
            page_end,
        }
    }

    fn words(count: usize, word: &str) -> String {
        vec![word; count].join(" ")
    }

    fn classification(pages: Vec<PageText>, is_scanned: bool) -> Classification {
        Classification {
            doc_sha256: "abc".to_string(),
            page_count: pages.len() as u32,
            scan: ScanClassification {
                is_scanned,
                evidence: ScanEvidence::default(),
            },
            script: ScriptClassification {
                script: Script::LatinLike,
                confidence: 1.0,
                source: ScriptSource::LocalTextRatio,
            },
            backend: TextBackend::LocalReader,
            document_kind: DocumentKind::from_pages(&pages),
            outline: Vec::new(),
            layout: None,
            pages,
        }
    }

    #[test]
    fn small_sections_become_single_chunks_and_skip_textless_pages() {
        let pages = vec![
            PageText::new(1, "alpha beta"),
            PageText::new(2, "   "),
            PageText::new(3, "gamma"),
            PageText::new(4, "delta"),
        ];
        let chunker = Chunker::new(ChunkerConfig::default());
        let report = chunker.by_sections(&[section("1", 1, 3), section("2", 4, 4)], &pages, true);

        assert_eq!(report.strategy, ChunkStrategy::SectionBased);
        assert_eq!(report.total_chunks, 2);
        assert_eq!(report.chunks[0].id, "1.0");
        assert_eq!(report.chunks[0].text, "alpha beta\n\ngamma");
        assert_eq!(report.chunks[0].word_count, 3);
        assert_eq!((report.chunks[0].page_start, report.chunks[0].page_end), (1, 3));
        assert_eq!(report.chunks[1].section_title, "Section 2");
    }

    #[test]
    fn oversized_sections_split_on_paragraphs_and_reconstruct() {
        let pages = vec![
            PageText::new(1, format!("{}\n\n{}", words(30, "one"), words(30, "two"))),
            PageText::new(2, words(30, "three")),
            PageText::new(3, format!("{}\n\n\n\n{}", words(120, "four"), words(10, "five"))),
        ];
        let config = ChunkerConfig {
            max_words: 70,
            ..ChunkerConfig::default()
        };
        let chunker = Chunker::new(config);
        let target = section("3", 1, 3);
        let report = chunker.by_sections(std::slice::from_ref(&target), &pages, true);

        let ids: Vec<&str> = report.chunks.iter().map(|chunk| chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["3.0", "3.1", "3.2", "3.3"]);
        let counts: Vec<usize> = report.chunks.iter().map(|chunk| chunk.word_count).collect();
        assert_eq!(counts, vec![60, 30, 120, 10]);
        let ranges: Vec<(u32, u32)> = report
            .chunks
            .iter()
            .map(|chunk| (chunk.page_start, chunk.page_end))
            .collect();
        assert_eq!(ranges, vec![(1, 1), (2, 2), (3, 3), (3, 3)]);
        assert!(report.chunks.iter().all(|chunk| chunk.section_id == "3"));
        assert!(
            report
                .chunks
                .iter()
                .enumerate()
                .all(|(index, chunk)| chunk.index_within_section == index as u32)
        );

        let rebuilt = report
            .chunks
            .iter()
            .map(|chunk| chunk.text.as_str())
            .collect::<Vec<&str>>()
            .join(" ");
        let original = join_page_text(&pages.iter().collect::<Vec<&PageText>>());
        assert_eq!(collapse_whitespace(&rebuilt), collapse_whitespace(&original));
    }

    #[test]
    fn split_can_be_disabled() {
        let pages = vec![PageText::new(1, words(50, "word"))];
        let chunker = Chunker::new(ChunkerConfig {
            max_words: 10,
            ..ChunkerConfig::default()
        });
        let report = chunker.by_sections(&[section("1", 1, 1)], &pages, false);
        assert_eq!(report.total_chunks, 1);
        assert_eq!(report.chunks[0].word_count, 50);
    }

    #[test]
    fn page_chunks_use_fixed_windows_and_page_labels() {
        let pages: Vec<PageText> = (1..=12).map(|page| PageText::new(page, format!("page {page}"))).collect();
        let chunker = Chunker::new(ChunkerConfig::default());
        let report = chunker.by_pages(&pages, 5);

        assert_eq!(report.strategy, ChunkStrategy::PageBased);
        assert_eq!(report.total_chunks, 3);
        let labels: Vec<(&str, &str, u32, u32)> = report
            .chunks
            .iter()
            .map(|chunk| {
                (
                    chunk.id.as_str(),
                    chunk.section_title.as_str(),
                    chunk.page_start,
                    chunk.page_end,
                )
            })
            .collect();
        assert_eq!(
            labels,
            vec![
                ("page-0", "Pages 1–5", 1, 5),
                ("page-1", "Pages 6–10", 6, 10),
                ("page-2", "Pages 11–12", 11, 12),
            ]
        );
        assert!(report.chunks.iter().all(|chunk| chunk.section_id == PAGE_SECTION_ID));
        assert_eq!(report.chunks[2].text, "page 11\n\npage 12");
        assert_eq!(chunker.by_pages(&[], 5).total_chunks, 0);
    }

    #[test]
    fn strategy_selection_follows_document_shape() {
        let chunker = Chunker::new(ChunkerConfig::default());
        let text_pages: Vec<PageText> = (1..=4).map(|page| PageText::new(page, "words here")).collect();
        let blank_pages: Vec<PageText> = (1..=4).map(|page| PageText::new(page, "")).collect();
        let two = [section("1", 1, 2), section("2", 3, 4)];
        let one = [section("1", 1, 4)];

        let digital = classification(text_pages.clone(), false);
        assert_eq!(chunker.select_strategy(&two, &digital), ChunkPlan::Sections);
        assert_eq!(chunker.select_strategy(&one, &digital), ChunkPlan::Pages(5));

        let scanned = classification(text_pages, true);
        assert_eq!(chunker.select_strategy(&two, &scanned), ChunkPlan::Pages(10));

        let image_only = classification(blank_pages, false);
        assert_eq!(chunker.select_strategy(&two, &image_only), ChunkPlan::Pages(10));

        let report = chunker.smart_chunk(&two, &digital);
        assert_eq!(report.strategy, ChunkStrategy::SectionBased);
        assert_eq!(report.total_chunks, 2);
    }
}

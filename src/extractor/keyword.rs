use super::*;

const CONTENTS_SYNONYMS: [&str; 4] = ["المحتويات", "فهرس", "فهرس المحتويات", "جدول المحتويات"];
const MAX_PAGE_REFERENCE: u32 = 9999;

/// Printed contents pages in Arabic books. The contents keyword is looked
/// for as a whole word at a line start in the first third of the text, then
/// in the last fifth, since Arabic publishers often put the contents at the
/// back. Each keyword hit in a region is tried in turn.
pub struct KeywordAnchored {
    keyword: Regex,
    filter: HeaderFooterFilter,
    config: ExtractorConfig,
}

impl KeywordAnchored {
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        let keyword = Regex::new(
            r"(?m)^[ \t]*(?:فهرس\s+المحتويات|جدول\s+المحتويات|فهرس\s+الموضوعات|جدول\s+الموضوعات|المحتويات|الفهرس|فهرس)(?:\s|$)",
        )
        .context("failed to compile contents keyword regex")?;

        Ok(Self {
            keyword,
            filter: HeaderFooterFilter::new()?,
            config: config.clone(),
        })
    }

    /// Lines following the keyword hit at `start`, minus repeated headers.
    /// At the front of the book the segment is capped; at the back it runs
    /// to the end.
    pub fn toc_segment<'t>(&self, text: &'t str, start: usize, max_lines: Option<usize>) -> Vec<&'t str> {
        let lines = text[start..]
            .split('\n')
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .skip(1)
            .filter(|line| !CONTENTS_SYNONYMS.iter().any(|synonym| line.contains(synonym)));

        match max_lines {
            Some(limit) => lines.take(limit).collect(),
            None => lines.collect(),
        }
    }

    fn entries_in(&self, text: &str, max_lines: Option<usize>, position: &str) -> Vec<TocEntry> {
        let mut best = Vec::new();

        for found in self.keyword.find_iter(text) {
            debug!(position, header = found.as_str().trim(), "contents keyword found");
            let lines = self.toc_segment(text, found.start(), max_lines);
            let parsed = parse_toc_lines(&lines, &self.filter);
            let cleaned = clean_monotonic(&parsed, &self.config);
            info!(
                position,
                lines = lines.len(),
                parsed = parsed.len(),
                kept = cleaned.len(),
                "parsed contents segment"
            );

            if cleaned.len() >= self.config.min_toc_entries {
                return cleaned;
            }
            if cleaned.len() > best.len() {
                best = cleaned;
            }
        }

        if best.is_empty() {
            debug!(position, "no usable contents keyword");
        }
        best
    }
}

impl Strategy for KeywordAnchored {
    fn kind(&self) -> StrategyKind {
        StrategyKind::KeywordScan
    }

    fn applies_to(&self, input: &ExtractionInput<'_>) -> bool {
        input.script == Script::ArabicLike
            && input.hints.mode == TocMode::Text
            && !input.full_text.trim().is_empty()
    }

    fn attempt(&self, input: &ExtractionInput<'_>) -> Option<Vec<Section>> {
        let text = input
            .full_text
            .lines()
            .map(normalize_arabic)
            .collect::<Vec<String>>()
            .join("\n");

        let head_end = char_boundary_at_fraction(&text, self.config.toc_head_fraction);
        let head = self.entries_in(&text[..head_end], Some(self.config.toc_max_lines), "start");
        if head.len() >= self.config.min_toc_entries {
            return Some(toc_sections(&head));
        }

        let tail_start = char_boundary_at_fraction(&text, 1.0 - self.config.toc_tail_fraction);
        let tail = self.entries_in(&text[tail_start..], None, "end");
        if tail.len() >= self.config.min_toc_entries {
            return Some(toc_sections(&tail));
        }

        None
    }
}

/// Pairs titles with page numbers. A line ending in a number is a complete
/// entry; otherwise a title line followed by a number-only line is.
pub fn parse_toc_lines(lines: &[&str], filter: &HeaderFooterFilter) -> Vec<TocEntry> {
    let lines: Vec<&str> = lines
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty() && !filter.is_header_footer(line, true))
        .collect();

    let mut entries = Vec::new();
    let mut index = 0;

    while index < lines.len() {
        let line = lines[index];

        if let Some((title, page)) = same_line_entry(line) {
            entries.push(TocEntry::new(title, page));
            index += 1;
            continue;
        }

        if let Some(next) = lines.get(index + 1) {
            let title = trim_leaders(line);
            if !title.is_empty() && !is_digit_only(title) {
                if let Some(page) = page_reference(next) {
                    entries.push(TocEntry::new(title, page));
                    index += 2;
                    continue;
                }
            }
        }

        index += 1;
    }

    entries
}

fn same_line_entry(line: &str) -> Option<(&str, u32)> {
    let (title, page) = line.rsplit_once(char::is_whitespace)?;
    let page = page_reference(page)?;
    let title = trim_leaders(title);
    if title.is_empty() {
        return None;
    }
    Some((title, page))
}

fn page_reference(token: &str) -> Option<u32> {
    parse_page_number(token).filter(|page| (1..=MAX_PAGE_REFERENCE).contains(page))
}

fn trim_leaders(title: &str) -> &str {
    title
        .trim()
        .trim_end_matches(|character: char| {
            matches!(character, '.' | '…' | '·' | '_') || character.is_whitespace()
        })
        .trim()
}

use super::*;

/// Embedded bookmarks. Ids are hierarchical (`2.1`) from per-level
/// counters; a section runs until the next entry at the same or a
/// shallower level.
pub struct NativeOutline {
    min_bookmarks: usize,
}

impl NativeOutline {
    pub fn new(config: &ExtractorConfig) -> Self {
        Self {
            min_bookmarks: config.min_bookmarks,
        }
    }
}

impl Strategy for NativeOutline {
    fn kind(&self) -> StrategyKind {
        StrategyKind::NativeOutline
    }

    fn applies_to(&self, input: &ExtractionInput<'_>) -> bool {
        input.script == Script::LatinLike && !input.outline.is_empty()
    }

    fn attempt(&self, input: &ExtractionInput<'_>) -> Option<Vec<Section>> {
        let entries: Vec<&OutlineEntry> = input
            .outline
            .iter()
            .filter(|entry| !entry.title.trim().is_empty())
            .collect();

        if entries.len() < self.min_bookmarks {
            debug!(
                bookmarks = entries.len(),
                required = self.min_bookmarks,
                "too few bookmarks"
            );
            return None;
        }

        Some(sections_from_outline(&entries, input.page_count))
    }
}

pub fn sections_from_outline(entries: &[&OutlineEntry], page_count: u32) -> Vec<Section> {
    let mut counters: Vec<u32> = Vec::new();
    let mut sections = Vec::with_capacity(entries.len());

    for (index, entry) in entries.iter().enumerate() {
        let level = entry.level.max(1);
        let page_start = entry.page.max(1);

        let page_end = entries[index + 1..]
            .iter()
            .find(|next| next.level.max(1) <= level)
            .map(|next| next.page.saturating_sub(1).max(page_start))
            .unwrap_or(page_count);

        counters.resize(level as usize, 0);
        counters[level as usize - 1] += 1;
        let id = counters
            .iter()
            .map(|counter| counter.to_string())
            .collect::<Vec<String>>()
            .join(".");

        sections.push(Section {
            id,
            title: entry.title.trim().to_string(),
            level,
            page_start,
            page_end,
        });
    }

    sections
}

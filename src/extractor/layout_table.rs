use super::*;

/// Contents laid out as a table, starting on a page the caller names.
/// Tables on that page and the pages right after it are read until a page
/// without any table is reached.
pub struct LayoutTable {
    page_cell: Regex,
    config: ExtractorConfig,
}

impl LayoutTable {
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        let page_cell = Regex::new(r"^\s*(\d{1,4})(?:\s*(?:و|and|,|،|-|–)\s*\d{1,4})*\s*$")
            .context("failed to compile page cell regex")?;
        Ok(Self {
            page_cell,
            config: config.clone(),
        })
    }

    /// First page number in a cell such as `12`, `١٢ و ١٥` or `12, 15`.
    pub fn page_in_cell(&self, content: &str) -> Option<u32> {
        let normalized = normalize_digits(content);
        let captures = self.page_cell.captures(&normalized)?;
        captures
            .get(1)
            .and_then(|value| value.as_str().parse::<u32>().ok())
            .filter(|page| *page >= 1)
    }

    fn read_table(&self, table: &LayoutTableData) -> Vec<TocEntry> {
        let mut rows: BTreeMap<u32, BTreeMap<u32, &str>> = BTreeMap::new();
        for cell in &table.cells {
            rows.entry(cell.row_index)
                .or_default()
                .insert(cell.column_index, cell.content.as_str());
        }

        let pairs: &[(u32, u32)] = match table.column_count {
            2 => &[(0, 1)],
            4 => &[(0, 1), (2, 3)],
            _ => &[],
        };

        let mut entries = Vec::new();
        for cells in rows.values() {
            for (left, right) in pairs {
                let left = cells.get(left).copied().unwrap_or("");
                let right = cells.get(right).copied().unwrap_or("");
                if let Some(entry) = self.pair_entry(left, right) {
                    entries.push(entry);
                }
            }
        }
        entries
    }

    fn pair_entry(&self, left: &str, right: &str) -> Option<TocEntry> {
        let (title, page) = match (self.page_in_cell(right), self.page_in_cell(left)) {
            (Some(page), _) => (left, page),
            (None, Some(page)) => (right, page),
            (None, None) => return None,
        };

        let title = normalize_arabic(title);
        if title.is_empty() || is_digit_only(&title) {
            return None;
        }
        Some(TocEntry::new(title, page))
    }
}

impl Strategy for LayoutTable {
    fn kind(&self) -> StrategyKind {
        StrategyKind::LayoutTable
    }

    fn applies_to(&self, input: &ExtractionInput<'_>) -> bool {
        input.script == Script::ArabicLike
            && input.hints.mode == TocMode::Structured
            && input.hints.toc_page.is_some()
            && input.layout().is_some_and(LayoutAnalysis::has_tables)
    }

    fn attempt(&self, input: &ExtractionInput<'_>) -> Option<Vec<Section>> {
        let layout = input.layout()?;
        let mut page = input.hints.toc_page?;
        let mut entries = Vec::new();

        loop {
            let tables: Vec<&LayoutTableData> = layout
                .tables
                .iter()
                .filter(|table| table_page(table) == Some(page))
                .collect();
            if tables.is_empty() {
                break;
            }

            for table in tables {
                let read = self.read_table(table);
                debug!(
                    page,
                    columns = table.column_count,
                    entries = read.len(),
                    "read contents table"
                );
                entries.extend(read);
            }
            page += 1;
        }

        entries.sort_by_key(|entry| entry.page);
        let cleaned = clean_monotonic(&entries, &self.config);
        info!(
            toc_page = input.hints.toc_page,
            last_table_page = page.saturating_sub(1),
            parsed = entries.len(),
            kept = cleaned.len(),
            "parsed contents tables"
        );

        if cleaned.len() < self.config.min_toc_entries {
            return None;
        }

        let offset = i64::from(input.hints.page_offset);
        let shifted: Vec<TocEntry> = cleaned
            .into_iter()
            .map(|entry| TocEntry {
                page: (i64::from(entry.page) + offset).clamp(1, i64::from(u32::MAX)) as u32,
                title: entry.title,
            })
            .collect();

        Some(toc_sections(&shifted))
    }
}

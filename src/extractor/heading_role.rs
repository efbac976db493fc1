use super::*;

const TITLE_ROLE: &str = "title";
const SECTION_HEADING_ROLE: &str = "sectionHeading";

#[derive(Debug, Clone)]
struct Heading {
    title: String,
    page: u32,
    offset: usize,
    level: u32,
}

/// Builds sections from paragraphs the layout backend tagged as titles or
/// section headings. Needs no contents page.
pub struct HeadingRole {
    numeric_only: Regex,
    filter: HeaderFooterFilter,
    config: ExtractorConfig,
}

impl HeadingRole {
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        let numeric_only = Regex::new(r"^[\d\x{0660}-\x{0669}\s.\-]+$")
            .context("failed to compile numeric heading regex")?;
        Ok(Self {
            numeric_only,
            filter: HeaderFooterFilter::new()?,
            config: config.clone(),
        })
    }

    fn collect_headings(&self, layout: &LayoutAnalysis) -> Vec<Heading> {
        let mut headings = Vec::new();

        for paragraph in &layout.paragraphs {
            let level = match paragraph.role.as_deref() {
                Some(TITLE_ROLE) => 1,
                Some(SECTION_HEADING_ROLE) => 2,
                _ => continue,
            };

            let content = paragraph.content.trim();
            if self.numeric_only.is_match(content) || self.filter.is_header_footer(content, false) {
                continue;
            }

            let region = paragraph.bounding_regions.first();
            if let Some(height) = region.and_then(|region| region.height()) {
                if height < self.config.heading_min_height {
                    debug!(height, title = content, "heading box too short");
                    continue;
                }
            }
            if paragraph
                .font_size
                .is_some_and(|size| size < self.config.heading_min_font_size)
            {
                continue;
            }
            if !title_length_ok(content, &self.config) {
                continue;
            }

            let Some(page) = region.map(|region| region.page_number).filter(|page| *page >= 1) else {
                debug!(title = content, "heading without page");
                continue;
            };

            headings.push(Heading {
                title: content.to_string(),
                page,
                offset: paragraph.spans.first().map(|span| span.offset).unwrap_or(0),
                level,
            });
        }

        headings.sort_by_key(|heading| (heading.page, heading.offset));
        headings
    }
}

impl Strategy for HeadingRole {
    fn kind(&self) -> StrategyKind {
        StrategyKind::HeadingRole
    }

    fn applies_to(&self, input: &ExtractionInput<'_>) -> bool {
        input
            .layout()
            .is_some_and(|layout| !layout.paragraphs.is_empty())
    }

    fn attempt(&self, input: &ExtractionInput<'_>) -> Option<Vec<Section>> {
        let headings = self.collect_headings(input.layout()?);
        if headings.is_empty() {
            return None;
        }

        let sections = headings
            .iter()
            .enumerate()
            .map(|(index, heading)| {
                let page_end = match headings.get(index + 1) {
                    Some(next) if next.page == heading.page => heading.page,
                    Some(next) => next.page.saturating_sub(1).max(heading.page),
                    None => input.page_count.max(heading.page),
                };
                Section {
                    id: (index + 1).to_string(),
                    title: heading.title.clone(),
                    level: heading.level,
                    page_start: heading.page,
                    page_end,
                }
            })
            .collect();

        Some(sections)
    }
}

use super::*;

struct HeadingPattern {
    regex: Regex,
    dotted_levels: bool,
}

#[derive(Debug, Clone)]
struct HeadingMatch {
    number: String,
    title: String,
    page: u32,
    dotted_levels: bool,
}

/// Numbered headings found in the running text. Pages are estimated from
/// the match's position in the text, so they drift on documents with
/// uneven page density.
pub struct PatternHeading {
    patterns: Vec<HeadingPattern>,
    config: ExtractorConfig,
}

impl PatternHeading {
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        let sources = [
            (r"(?mi)^[ \t]*Chapter\s+(\d+)[\s:.–-]+(.+?)[ \t]*$", false),
            (r"(?m)^[ \t]*(\d+(?:\.\d+)*)[ \t]*[ \t:.–-][ \t]*(.+?)[ \t]*$", true),
            (r"(?mi)^[ \t]*Section\s+(\d+(?:\.\d+)*)[ \t]*[\s:.–-][ \t]*(.+?)[ \t]*$", true),
            (r"(?mi)^[ \t]*Part\s+([IVXLCDM\d]+)[\s:.–-]+(.+?)[ \t]*$", false),
            (r"(?mi)^[ \t]*Appendix\s+([A-Z\d]+)[\s:.–-]+(.+?)[ \t]*$", false),
        ];

        let mut patterns = Vec::with_capacity(sources.len());
        for (source, dotted_levels) in sources {
            patterns.push(HeadingPattern {
                regex: Regex::new(source)
                    .with_context(|| format!("failed to compile heading pattern {source}"))?,
                dotted_levels,
            });
        }

        Ok(Self {
            patterns,
            config: config.clone(),
        })
    }

    fn collect_matches(&self, text: &str, page_count: u32) -> Vec<HeadingMatch> {
        let total = text.len().max(1) as f64;
        let pages = page_count.max(1);
        let mut matches = Vec::new();

        for pattern in &self.patterns {
            for captures in pattern.regex.captures_iter(text) {
                let (Some(whole), Some(number), Some(title)) =
                    (captures.get(0), captures.get(1), captures.get(2))
                else {
                    continue;
                };

                let title = title.as_str().trim();
                if !title_length_ok(title, &self.config) {
                    continue;
                }

                let fraction = whole.start() as f64 / total;
                let page = ((fraction * pages as f64) as u32 + 1).clamp(1, pages);

                matches.push(HeadingMatch {
                    number: number.as_str().trim().to_string(),
                    title: title.to_string(),
                    page,
                    dotted_levels: pattern.dotted_levels,
                });
            }
        }

        matches
    }
}

impl Strategy for PatternHeading {
    fn kind(&self) -> StrategyKind {
        StrategyKind::PatternHeading
    }

    fn applies_to(&self, input: &ExtractionInput<'_>) -> bool {
        input.script == Script::LatinLike && !input.full_text.trim().is_empty()
    }

    fn attempt(&self, input: &ExtractionInput<'_>) -> Option<Vec<Section>> {
        let matches = self.collect_matches(&input.full_text, input.page_count);

        let mut seen = HashSet::new();
        let mut unique: Vec<HeadingMatch> = matches
            .into_iter()
            .filter(|heading| {
                let key: String = heading.title.chars().take(50).collect();
                seen.insert((heading.number.clone(), key))
            })
            .collect();

        if unique.len() < self.config.min_pattern_sections {
            debug!(
                headings = unique.len(),
                required = self.config.min_pattern_sections,
                "too few pattern headings"
            );
            return None;
        }

        unique.sort_by(|left, right| {
            left.page
                .cmp(&right.page)
                .then_with(|| numeric_key(&left.number).cmp(&numeric_key(&right.number)))
        });

        let mut used_ids = HashSet::new();
        let sections = unique
            .iter()
            .enumerate()
            .map(|(index, heading)| {
                let page_end = match unique.get(index + 1) {
                    Some(next) => next.page.saturating_sub(1).max(heading.page),
                    None => input.page_count.max(heading.page),
                };
                Section {
                    id: unique_id(&heading.number, &mut used_ids),
                    title: heading.title.clone(),
                    level: heading_level(heading),
                    page_start: heading.page,
                    page_end,
                }
            })
            .collect();

        Some(sections)
    }
}

/// `1.10.3` sorts as `[1, 10, 3]`; anything non-numeric sorts as `[0]`.
pub fn numeric_key(number: &str) -> Vec<u32> {
    number
        .split('.')
        .map(|part| part.parse::<u32>().ok())
        .collect::<Option<Vec<u32>>>()
        .unwrap_or_else(|| vec![0])
}

fn heading_level(heading: &HeadingMatch) -> u32 {
    if heading.dotted_levels {
        heading.number.matches('.').count() as u32 + 1
    } else {
        1
    }
}

fn unique_id(number: &str, used: &mut HashSet<String>) -> String {
    if used.insert(number.to_string()) {
        return number.to_string();
    }
    let mut suffix = 2;
    loop {
        let candidate = format!("{number}-{suffix}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        suffix += 1;
    }
}

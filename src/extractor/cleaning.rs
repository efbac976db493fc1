use super::*;

/// A parsed contents line: title text and the page it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub title: String,
    pub page: u32,
}

impl TocEntry {
    pub fn new(title: impl Into<String>, page: u32) -> Self {
        Self {
            title: title.into(),
            page,
        }
    }
}

/// Keeps the leading run of entries whose pages never go backwards, never
/// drop more than `monotonic_slack` below the previous page, and never reset
/// from above `reset_high_page` to below `reset_low_page`. Everything from
/// the first violation on is body text picked up past the contents.
pub fn clean_monotonic(entries: &[TocEntry], config: &ExtractorConfig) -> Vec<TocEntry> {
    let mut clean = Vec::with_capacity(entries.len());
    let mut previous = 0u32;

    for entry in entries {
        let page = entry.page;
        if page < previous {
            debug!(previous, page, "contents page went backwards; truncating");
            break;
        }
        if previous > 0 && page < previous.saturating_sub(config.monotonic_slack) {
            debug!(previous, page, "contents page jumped back; truncating");
            break;
        }
        if previous > config.reset_high_page && page < config.reset_low_page {
            debug!(previous, page, "contents page reset; truncating");
            break;
        }

        clean.push(entry.clone());
        previous = page;
    }

    debug!(parsed = entries.len(), kept = clean.len(), "monotonic cleaning");
    clean
}

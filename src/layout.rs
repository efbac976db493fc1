//! Result of an OCR/layout analysis. Field names follow the camelCase JSON
//! that layout services emit; every collection defaults to empty so a
//! partial or older payload still deserializes and only the strategies that
//! need the missing part degrade.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::PageText;

pub const PAGE_SEPARATOR: char = '\u{000C}';

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LayoutAnalysis {
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub pages: Vec<LayoutPage>,
    #[serde(default)]
    pub tables: Vec<LayoutTable>,
    #[serde(default)]
    pub paragraphs: Vec<LayoutParagraph>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LayoutPage {
    pub page_number: u32,
    #[serde(default)]
    pub lines: Vec<LayoutLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LayoutLine {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LayoutTable {
    #[serde(default)]
    pub row_count: u32,
    #[serde(default)]
    pub column_count: u32,
    #[serde(default)]
    pub cells: Vec<TableCell>,
    #[serde(default)]
    pub bounding_regions: Vec<BoundingRegion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TableCell {
    pub row_index: u32,
    pub column_index: u32,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub bounding_regions: Vec<BoundingRegion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BoundingRegion {
    pub page_number: u32,
    #[serde(default)]
    pub polygon: Vec<f64>,
}

impl BoundingRegion {
    /// Vertical extent of the polygon (`[x1, y1, x2, y2, ...]`).
    pub fn height(&self) -> Option<f64> {
        let ys = self.polygon.iter().skip(1).step_by(2).copied();
        let (min, max) = ys.fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), y| {
            (min.min(y), max.max(y))
        });
        if min.is_finite() && max.is_finite() {
            Some(max - min)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LayoutParagraph {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub bounding_regions: Vec<BoundingRegion>,
    #[serde(default)]
    pub spans: Vec<TextSpan>,
    #[serde(default)]
    pub font_size: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TextSpan {
    pub offset: usize,
    #[serde(default)]
    pub length: usize,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LayoutEnvelope {
    Wrapped {
        #[serde(rename = "analyzeResult")]
        analyze_result: LayoutAnalysis,
    },
    Bare(LayoutAnalysis),
}

impl LayoutAnalysis {
    pub fn from_json(raw: &str) -> Result<Self> {
        let envelope: LayoutEnvelope =
            serde_json::from_str(raw).context("failed to parse layout analysis json")?;
        Ok(match envelope {
            LayoutEnvelope::Wrapped { analyze_result } => analyze_result,
            LayoutEnvelope::Bare(analysis) => analysis,
        })
    }

    pub fn has_tables(&self) -> bool {
        !self.tables.is_empty()
    }

    /// Full text with a page separator between consecutive pages. Pages the
    /// backend skipped are emitted empty so positions stay aligned.
    pub fn full_text(&self, page_count: u32) -> String {
        let last_page = self
            .pages
            .iter()
            .map(|page| page.page_number)
            .max()
            .unwrap_or(0)
            .max(page_count);

        let mut texts = vec![String::new(); last_page as usize];
        for page in &self.pages {
            if page.page_number == 0 {
                continue;
            }
            let slot = &mut texts[(page.page_number - 1) as usize];
            for line in &page.lines {
                slot.push_str(&line.content);
                slot.push('\n');
            }
        }

        join_page_texts(&texts)
    }

    pub fn to_pages(&self, page_count: u32) -> Vec<PageText> {
        split_page_texts(&self.full_text(page_count))
    }
}

pub fn table_page(table: &LayoutTable) -> Option<u32> {
    table
        .bounding_regions
        .first()
        .or_else(|| {
            table
                .cells
                .iter()
                .find_map(|cell| cell.bounding_regions.first())
        })
        .map(|region| region.page_number)
}

pub fn join_page_texts<S: AsRef<str>>(pages: &[S]) -> String {
    let mut out = String::new();
    for (index, page) in pages.iter().enumerate() {
        if index > 0 {
            out.push(PAGE_SEPARATOR);
        }
        out.push_str(page.as_ref());
    }
    out
}

pub fn split_page_texts(text: &str) -> Vec<PageText> {
    if text.is_empty() {
        return Vec::new();
    }

    text.split(PAGE_SEPARATOR)
        .enumerate()
        .map(|(index, chunk)| PageText::new((index + 1) as u32, chunk.replace('\u{0000}', "")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_json_accepts_wrapped_and_bare_payloads() {
        let bare = r#"{"pages":[{"pageNumber":1,"lines":[{"content":"hello"}]}]}"#;
        let wrapped = format!(r#"{{"status":"succeeded","analyzeResult":{}}}"#, bare);

        let left = LayoutAnalysis::from_json(bare).expect("bare payload");
        let right = LayoutAnalysis::from_json(&wrapped).expect("wrapped payload");
        assert_eq!(left, right);
        assert_eq!(left.pages[0].lines[0].content, "hello");
        assert!(left.tables.is_empty());
    }

    #[test]
    fn to_pages_keeps_missing_pages_as_empty_slots() {
        let analysis = LayoutAnalysis {
            pages: vec![
                LayoutPage {
                    page_number: 1,
                    lines: vec![LayoutLine {
                        content: "first".to_string(),
                    }],
                },
                LayoutPage {
                    page_number: 3,
                    lines: vec![LayoutLine {
                        content: "third".to_string(),
                    }],
                },
            ],
            ..LayoutAnalysis::default()
        };

        let pages = analysis.to_pages(4);
        assert_eq!(pages.len(), 4);
        assert_eq!(pages[0].text.trim(), "first");
        assert!(!pages[1].has_text());
        assert_eq!(pages[2].page, 3);
        assert_eq!(pages[2].text.trim(), "third");
        assert!(!pages[3].has_text());
    }

    #[test]
    fn region_height_uses_y_coordinates_only() {
        let region = BoundingRegion {
            page_number: 1,
            polygon: vec![0.0, 1.0, 5.0, 1.0, 5.0, 1.5, 0.0, 1.5],
        };
        assert_eq!(region.height(), Some(0.5));
        assert_eq!(BoundingRegion::default().height(), None);
    }
}

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Every threshold the pipeline consults. The defaults are fixed values
/// carried over from production use, not tuned optima.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub scan: ScanConfig,
    pub script: ScriptConfig,
    pub extractor: ExtractorConfig,
    pub chunker: ChunkerConfig,
    pub ocr: OcrConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub sample_pages: u32,
    pub min_chars: usize,
    pub min_words: usize,
    pub min_text_page_ratio: f64,
    pub min_page_chars: usize,
    pub garbage_min_len: usize,
    pub garbage_alpha_ratio: f64,
    pub garbage_min_token_len: f64,
    pub garbage_max_token_len: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    pub use_quick_detection: bool,
    pub skip_front_pages: u32,
    pub sample_chars: usize,
    pub confidence_threshold: f64,
    pub arabic_ratio_threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub min_bookmarks: usize,
    pub min_pattern_sections: usize,
    pub min_toc_entries: usize,
    pub min_title_chars: usize,
    pub max_title_chars: usize,
    pub monotonic_slack: u32,
    pub reset_high_page: u32,
    pub reset_low_page: u32,
    pub toc_head_fraction: f64,
    pub toc_tail_fraction: f64,
    pub toc_max_lines: usize,
    pub heading_min_font_size: f64,
    pub heading_min_height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    pub max_words: usize,
    pub pages_per_chunk: usize,
    pub image_pages_per_chunk: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub enabled: bool,
    pub latin_lang: String,
    pub arabic_lang: String,
    pub timeout_secs: u64,
    pub resolution_dpi: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            sample_pages: 10,
            min_chars: 50,
            min_words: 10,
            min_text_page_ratio: 0.2,
            min_page_chars: 10,
            garbage_min_len: 20,
            garbage_alpha_ratio: 0.5,
            garbage_min_token_len: 3.0,
            garbage_max_token_len: 15.0,
        }
    }
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            use_quick_detection: true,
            skip_front_pages: 3,
            sample_chars: 1000,
            confidence_threshold: 0.5,
            arabic_ratio_threshold: 0.3,
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            min_bookmarks: 4,
            min_pattern_sections: 3,
            min_toc_entries: 5,
            min_title_chars: 3,
            max_title_chars: 200,
            monotonic_slack: 5,
            reset_high_page: 100,
            reset_low_page: 50,
            toc_head_fraction: 1.0 / 3.0,
            toc_tail_fraction: 0.2,
            toc_max_lines: 200,
            heading_min_font_size: 16.0,
            heading_min_height: 0.025,
        }
    }
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_words: 2000,
            pages_per_chunk: 5,
            image_pages_per_chunk: 10,
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            latin_lang: "eng".to_string(),
            arabic_lang: "ara".to_string(),
            timeout_secs: 120,
            resolution_dpi: 300,
        }
    }
}

impl OcrConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_slice(&raw).with_context(|| format!("failed to parse {}", path.display()))
    }
}

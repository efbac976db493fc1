pub mod chunk;
pub mod classify;
pub mod extract;
pub mod status;

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use bookstruct::Pipeline;
use bookstruct::backend::{LayoutFileBackend, PopplerReader, TesseractBackend, WhatlangClassifier};
use bookstruct::cache::ExtractionCache;
use bookstruct::classifier::Classifier;
use bookstruct::config::PipelineConfig;
use bookstruct::model::LayoutHints;
use bookstruct::util::ensure_directory;

use crate::cli::{CacheArgs, DocumentArgs, HintArgs};

pub(crate) fn load_config(args: &DocumentArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if args.no_ocr {
        config.ocr.enabled = false;
    }
    if args.no_quick_detect {
        config.script.use_quick_detection = false;
    }
    Ok(config)
}

pub(crate) fn build_pipeline(
    args: &DocumentArgs,
    cache: Option<&CacheArgs>,
    config: PipelineConfig,
) -> Result<Pipeline> {
    let reader = match args.tool_timeout_secs {
        Some(secs) => PopplerReader::with_timeout(Duration::from_secs(secs.max(1))),
        None => PopplerReader::new(),
    };

    let mut classifier = Classifier::new(Arc::new(reader), config.clone())
        .with_quick_classifier(Arc::new(WhatlangClassifier));

    if let Some(path) = &args.layout_json {
        info!(path = %path.display(), "using saved layout result as ocr backend");
        classifier = classifier.with_ocr(Arc::new(LayoutFileBackend::new(path)));
    } else if config.ocr.enabled {
        match TesseractBackend::detect(config.ocr.clone()) {
            Some(backend) => classifier = classifier.with_ocr(Arc::new(backend)),
            None => warn!("pdftoppm/tesseract not found; ocr backend disabled"),
        }
    }

    let mut pipeline = Pipeline::new(classifier)?;
    if let Some(cache) = cache.filter(|cache| !cache.no_cache) {
        pipeline = pipeline.with_cache(open_cache(&cache.cache_db)?);
    }
    Ok(pipeline)
}

pub(crate) fn open_cache(path: &Path) -> Result<ExtractionCache> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        ensure_directory(parent)?;
    }
    let cache = ExtractionCache::open(path)
        .with_context(|| format!("failed to open cache {}", path.display()))?;
    Ok(cache)
}

pub(crate) fn read_document(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

pub(crate) fn layout_hints(args: &HintArgs) -> LayoutHints {
    match args.toc_page {
        Some(toc_page) => LayoutHints::structured(toc_page, args.page_offset),
        None => LayoutHints {
            page_offset: args.page_offset,
            ..LayoutHints::default()
        },
    }
}

pub(crate) fn write_json<T: Serialize>(value: &T, what: &str) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut output, value)
        .with_context(|| format!("failed to serialize {what} json output"))?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}

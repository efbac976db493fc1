use anyhow::Result;
use serde::Serialize;
use tracing::info;

use bookstruct::model::{DocumentKind, ScanClassification, ScriptClassification, TextBackend};

use super::{build_pipeline, load_config, read_document, write_json};
use crate::cli::ClassifyArgs;

#[derive(Debug, Serialize)]
struct ClassifyReport<'a> {
    doc_sha256: &'a str,
    page_count: u32,
    scan: &'a ScanClassification,
    script: &'a ScriptClassification,
    backend: TextBackend,
    document_kind: DocumentKind,
    outline_entries: usize,
}

pub fn run(args: ClassifyArgs) -> Result<()> {
    let config = load_config(&args.document)?;
    let pipeline = build_pipeline(&args.document, Some(&args.cache), config)?;
    let bytes = read_document(&args.document.pdf)?;

    info!(path = %args.document.pdf.display(), bytes = bytes.len(), "classifying document");
    let classification = pipeline.classify(&bytes)?;

    write_json(
        &ClassifyReport {
            doc_sha256: &classification.doc_sha256,
            page_count: classification.page_count,
            scan: &classification.scan,
            script: &classification.script,
            backend: classification.backend,
            document_kind: classification.document_kind,
            outline_entries: classification.outline.len(),
        },
        "classification",
    )
}

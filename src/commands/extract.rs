use anyhow::Result;
use tracing::info;

use super::{build_pipeline, layout_hints, load_config, read_document, write_json};
use crate::cli::ExtractArgs;

pub fn run(args: ExtractArgs) -> Result<()> {
    let config = load_config(&args.document)?;
    let pipeline = build_pipeline(&args.document, Some(&args.cache), config)?;
    let hints = layout_hints(&args.hints);
    let bytes = read_document(&args.document.pdf)?;

    info!(
        path = %args.document.pdf.display(),
        hints = %hints.cache_key(),
        "extracting sections"
    );
    let structure = pipeline.extract(&bytes, &hints)?;

    info!(
        found = structure.result.found,
        strategy = structure.result.strategy.as_str(),
        sections = structure.result.sections.len(),
        "extraction finished"
    );
    write_json(&structure.result, "extraction")
}

use anyhow::Result;
use tracing::info;

use bookstruct::ChunkRequest;

use super::{build_pipeline, layout_hints, load_config, read_document, write_json};
use crate::cli::{ChunkArgs, ChunkMode};

pub fn run(args: ChunkArgs) -> Result<()> {
    let mut config = load_config(&args.document)?;
    if let Some(max_words) = args.max_words {
        config.chunker.max_words = max_words.max(1);
    }
    if let Some(pages_per_chunk) = args.pages_per_chunk {
        config.chunker.pages_per_chunk = pages_per_chunk.max(1);
    }

    let request = match args.strategy {
        ChunkMode::Smart => ChunkRequest::Smart,
        ChunkMode::Sections => ChunkRequest::Sections {
            split_large: !args.no_split,
        },
        ChunkMode::Pages => ChunkRequest::Pages {
            pages_per_chunk: config.chunker.pages_per_chunk,
        },
    };

    let pipeline = build_pipeline(&args.document, Some(&args.cache), config)?;
    let hints = layout_hints(&args.hints);
    let bytes = read_document(&args.document.pdf)?;

    info!(path = %args.document.pdf.display(), ?request, "chunking document");
    let report = pipeline.chunk(&bytes, &hints, request)?;
    write_json(&report, "chunking")
}

use anyhow::Result;
use tracing::{info, warn};

use bookstruct::tools::command_version_optional;

use super::open_cache;
use crate::cli::StatusArgs;

const TOOLS: &[(&str, &[&str])] = &[
    ("pdfinfo", &["-v"]),
    ("pdftotext", &["-v"]),
    ("pdftohtml", &["-v"]),
    ("pdfimages", &["-v"]),
    ("pdftoppm", &["-v"]),
    ("tesseract", &["--version"]),
];

pub fn run(args: StatusArgs) -> Result<()> {
    info!(cache_db = %args.cache_db.display(), "status requested");

    for (program, version_args) in TOOLS {
        match command_version_optional(program, version_args) {
            Some(version) => info!(tool = *program, version = %version, "external tool available"),
            None => warn!(tool = *program, "external tool missing"),
        }
    }

    if args.cache_db.exists() {
        let cache = open_cache(&args.cache_db)?;
        let counts = cache.counts()?;
        info!(
            path = %args.cache_db.display(),
            schema_version = %cache.schema_version()?.unwrap_or_default(),
            documents = counts.documents,
            pages = counts.pages,
            extractions = counts.extractions,
            sections = counts.sections,
            "cache status"
        );
    } else {
        warn!(path = %args.cache_db.display(), "cache database missing");
    }

    Ok(())
}

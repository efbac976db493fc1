use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "bookstruct",
    version,
    about = "Document classification, section extraction and chunking for PDF books"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Classify(ClassifyArgs),
    Extract(ExtractArgs),
    Chunk(ChunkArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct DocumentArgs {
    pub pdf: PathBuf,

    /// JSON file overriding any subset of the pipeline thresholds.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Saved layout-analysis JSON used as the OCR backend instead of tesseract.
    #[arg(long)]
    pub layout_json: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub no_ocr: bool,

    #[arg(long, default_value_t = false)]
    pub no_quick_detect: bool,

    #[arg(long)]
    pub tool_timeout_secs: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct CacheArgs {
    #[arg(long, default_value = ".cache/bookstruct/cache.sqlite")]
    pub cache_db: PathBuf,

    #[arg(long, default_value_t = false)]
    pub no_cache: bool,
}

#[derive(Args, Debug, Clone)]
pub struct HintArgs {
    /// Page holding the contents table; switches Arabic documents to structured mode.
    #[arg(long)]
    pub toc_page: Option<u32>,

    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub page_offset: i32,
}

#[derive(Args, Debug, Clone)]
pub struct ClassifyArgs {
    #[command(flatten)]
    pub document: DocumentArgs,

    #[command(flatten)]
    pub cache: CacheArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    #[command(flatten)]
    pub document: DocumentArgs,

    #[command(flatten)]
    pub cache: CacheArgs,

    #[command(flatten)]
    pub hints: HintArgs,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ChunkMode {
    Smart,
    Sections,
    Pages,
}

#[derive(Args, Debug, Clone)]
pub struct ChunkArgs {
    #[command(flatten)]
    pub document: DocumentArgs,

    #[command(flatten)]
    pub cache: CacheArgs,

    #[command(flatten)]
    pub hints: HintArgs,

    #[arg(long, value_enum, default_value_t = ChunkMode::Smart)]
    pub strategy: ChunkMode,

    #[arg(long)]
    pub max_words: Option<usize>,

    #[arg(long)]
    pub pages_per_chunk: Option<usize>,

    #[arg(long, default_value_t = false)]
    pub no_split: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = ".cache/bookstruct/cache.sqlite")]
    pub cache_db: PathBuf,
}

pub mod backend;
pub mod cache;
pub mod chunker;
pub mod classifier;
pub mod config;
pub mod document;
pub mod error;
pub mod extractor;
pub mod layout;
pub mod model;
pub mod pipeline;
pub mod text;
pub mod tools;
pub mod util;

pub use error::PipelineError;
pub use pipeline::{ChunkRequest, Pipeline};

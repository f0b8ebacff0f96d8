pub mod engine;
pub mod extractor;

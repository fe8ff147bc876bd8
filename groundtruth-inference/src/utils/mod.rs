pub mod extractor;
pub mod graph;
pub mod letterbox;

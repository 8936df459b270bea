mod document;

pub use document::DocumentTextExtractor;

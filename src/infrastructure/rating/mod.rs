mod gemini;

pub use gemini::GeminiRelevanceRater;

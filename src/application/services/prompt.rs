pub const DEFAULT_INSTRUCTION: &str = "Answer the query using the context below. \
If the context does not contain the answer, say so and answer from general knowledge.";

/// Prompt for the answer generator. Without context the bare query is sent.
pub fn assemble_prompt(query: &str, context: Option<&str>) -> String {
    assemble_prompt_with(DEFAULT_INSTRUCTION, query, context)
}

pub fn assemble_prompt_with(instruction: &str, query: &str, context: Option<&str>) -> String {
    match context {
        Some(context) => {
            format!("{instruction}\n\nContext:\n{context}\n\nQuery: {query}\n\nAnswer:")
        }
        None => query.to_string(),
    }
}

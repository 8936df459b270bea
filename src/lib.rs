//! Retrieval-augmented retirement-planning assistant.
//!
//! Documents are chunked into a vector collection; each chat turn retrieves
//! the nearest chunks, passes them through a distance gate and an LLM
//! relevance judge, and only then hands them to the answer generator.

pub mod api;
pub mod application;
pub mod domain;
pub mod infrastructure;

#[cfg(test)]
mod testing;

// Evaluation pipeline: file extraction, prompt assembly and the report call.
// All DashScope calls go through llm_client — nothing here talks HTTP upstream.

pub mod extractor;
pub mod handlers;
pub mod pipeline;
pub mod prompt_builder;
pub mod prompts;

// Portfolio generation: resume text → model-written sections → rendered, materialized site.
// Runs on the bounded worker pool; progress is reported through the status store.

pub mod extractor;
pub mod handlers;
pub mod pipeline;
pub mod records;
pub mod sections;
pub mod status;
pub mod synthesizer;
pub mod worker;

// Refrain - validated LLM content generation
// Library exports

pub mod cli;
pub mod config;
pub mod errors;
pub mod history;
pub mod logging;
pub mod media;
pub mod pipelines;
pub mod postprocess;
pub mod providers;
pub mod research;
pub mod router;
pub mod workflow;

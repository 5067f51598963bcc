// Generate/validate workflow engine
//
// Generic over the artifact type; the song and news pipelines plug their own
// artifact, prompts and side effects into the same loop.

pub mod generator;
pub mod loop_runner;
pub mod parse;
pub mod template;
pub mod types;
pub mod validator;

pub use generator::{ArtifactGenerator, LlmArtifactGenerator};
pub use loop_runner::{LoopOutcome, RetryLoop, RetryState, Transition};
pub use parse::{parse_artifact, parse_json_object, strip_markdown_fences};
pub use template::render;
pub use types::{Artifact, Draft, GenerationContext, ValidationVerdict};
pub use validator::{parse_verdict, ArtifactValidator, LlmArtifactValidator};

//! `prooflint-core`: checks hand-written correctness proofs embedded in a codebase.
//!
//! Scope:
//! - find proposition+proof pairs in fenced `::: {.theorem #id}` / `::: {.proof}` blocks
//! - for each one, run a bounded-turn conversation with a reasoning model that may
//!   request additional files before rendering a verdict
//! - enforce approximate token budgets, both per property and across the whole run
//!
//! Output discipline:
//! - results are JSON-friendly (`serde` types); the CLI prints one JSON array to stdout
//! - prompts, replies, and token usage go to stderr via `tracing`
//!
//! Entrypoints:
//! - the CLI binary lives in `prooflint-core/src/bin/prooflint.rs`
//!
//! Environment:
//! - `OPENAI_API_KEY` (required by the bundled client)
//! - `OPENAI_BASE_URL` (optional, any OpenAI-compatible endpoint)
//! - `OPENAI_MODEL` (optional, overridden by `--model`)

pub mod budget;
pub mod checker;
pub mod deps;
pub mod disclosure;
pub mod files;
pub mod llm;
pub mod prompt;
pub mod properties;
pub mod response;
pub mod tokens;

pub use checker::{
    CheckCost, CheckOutcome, CheckerConfig, Failure, FatalError, ProofCheckResult, ProofChecker,
    PropertyLocation,
};
pub use disclosure::PromptShape;
pub use llm::{Completion, CompletionRequest, LlmError, Message, OpenAiClient, ReasoningService, Role};
pub use response::{Correctness, CorrectnessExplanation};

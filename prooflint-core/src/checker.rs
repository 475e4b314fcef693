//! The proof-verification conversation engine.
//!
//! One [`ProofChecker`] owns the run-wide inputs (file set, prompt shape,
//! dependency context); each property's conversation owns its own
//! [`ConversationState`], created in `check_proof` and discarded on
//! completion. Recoverable outcomes are values ([`Failure`] inside the
//! result); contract violations are [`FatalError`]s that abort the batch.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::budget::{self, MAX_CONTEXT_LENGTH};
use crate::deps;
use crate::disclosure::{self, PromptShape};
use crate::files;
use crate::llm::{CompletionRequest, LlmError, Message, ReasoningService};
use crate::prompt;
use crate::properties;
use crate::response::{self, Classified, Correctness, CorrectnessExplanation};
use crate::tokens::TokenEstimator;

/// One discovered proposition+proof occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyLocation {
    pub rel_path: PathBuf,
    pub line_num: usize,
}

/// Terminal non-verdict outcome for one property (budget exhaustion,
/// rejected or truncated request).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub msg: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CheckOutcome {
    Verdict(CorrectnessExplanation),
    Failure(Failure),
}

impl CheckOutcome {
    /// A result that should fail the process: any failure, or any verdict
    /// other than "correct".
    pub fn is_finding(&self) -> bool {
        match self {
            CheckOutcome::Failure(_) => true,
            CheckOutcome::Verdict(v) => v.correctness != Correctness::Correct,
        }
    }
}

/// The unit of output; exactly one per property per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofCheckResult {
    pub property_location: PropertyLocation,
    pub correctness_explanation: CheckOutcome,
}

/// Tokens charged to one property. `estimated` marks the rejection and
/// truncation paths, where true usage is unknown and the charge is the
/// configured ceiling (or the hard cap) rather than a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckCost {
    pub tokens: u64,
    pub estimated: bool,
}

/// Contract violations and misconfigurations that abort the whole run
/// instead of degrading into a misleading per-property failure.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("too many files in the codebase: {0}")]
    TooManyFiles(usize),
    #[error("reasoning service reported no token usage")]
    MissingUsage,
    #[error("reasoning service returned no content")]
    MissingContent,
    #[error("unusable response payload: {0}")]
    InvalidResponse(String),
    #[error("file request resolved to an empty disclosure set")]
    EmptyDisclosure,
    #[error("no verdict after {0} messages")]
    TurnLimitExceeded(usize),
    #[error("reasoning service: {0}")]
    Service(LlmError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct CheckerConfig {
    pub max_files: usize,
    /// Turn bound per conversation; exhausting it is fatal for the run.
    pub max_messages: usize,
    pub min_length_to_exclude_full_files: usize,
    pub filter_paths: Vec<String>,
    pub property_filter: Option<String>,
    pub max_tokens_total: Option<u64>,
    pub max_tokens_per_property: Option<u64>,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            max_files: 1_000,
            max_messages: 50,
            min_length_to_exclude_full_files: 100_000,
            filter_paths: Vec::new(),
            property_filter: None,
            max_tokens_total: None,
            max_tokens_per_property: None,
        }
    }
}

/// State owned by one property's conversation, discarded when it ends.
struct ConversationState {
    messages: Vec<Message>,
    files_shown: BTreeSet<PathBuf>,
    completion_tokens_used: u64,
    /// Input estimate of the last call actually issued; charged alongside
    /// completion tokens when the conversation terminates.
    input_tokens_sent: u64,
}

impl ConversationState {
    fn new(initial_message: String, files_shown: BTreeSet<PathBuf>) -> Self {
        Self {
            messages: vec![Message::user(initial_message)],
            files_shown,
            completion_tokens_used: 0,
            input_tokens_sent: 0,
        }
    }
}

pub struct ProofChecker<S> {
    service: S,
    config: CheckerConfig,
    rel_paths: Vec<PathBuf>,
    all_files: BTreeSet<PathBuf>,
    documents: BTreeMap<PathBuf, String>,
    property_locations: Vec<PropertyLocation>,
    shape: PromptShape,
    deps_text: String,
    estimator: TokenEstimator,
}

impl<S: ReasoningService> ProofChecker<S> {
    /// Enumerate the codebase, extract properties, and fix the run-wide
    /// disclosure shape. No model calls happen here.
    pub fn new(directory: &Path, config: CheckerConfig, service: S) -> Result<Self, FatalError> {
        let rel_paths = files::get_rel_paths(directory, &config.filter_paths)?;
        if rel_paths.len() > config.max_files {
            return Err(FatalError::TooManyFiles(rel_paths.len()));
        }

        let mut documents = BTreeMap::new();
        for rel_path in &rel_paths {
            debug!("found {}", rel_path.display());
            let content = std::fs::read_to_string(directory.join(rel_path))?;
            documents.insert(rel_path.clone(), content);
        }

        let mut property_locations = Vec::new();
        for rel_path in &rel_paths {
            let content = &documents[rel_path];
            for prop in
                properties::extract_propositions(content, config.property_filter.as_deref())
            {
                debug!(
                    "found property @ {}:{}: {}",
                    rel_path.display(),
                    prop.line_num,
                    prop.statement
                );
                property_locations.push(PropertyLocation {
                    rel_path: rel_path.clone(),
                    line_num: prop.line_num,
                });
            }
        }

        let total_source_len: usize = documents.values().map(|d| d.len()).sum();
        let shape = PromptShape::choose(total_source_len, config.min_length_to_exclude_full_files);
        debug!(
            "{} chars across {} files, prompt shape {:?}",
            total_source_len,
            rel_paths.len(),
            shape
        );
        let deps_text = deps::dep_graph_text(&documents);

        Ok(Self {
            service,
            config,
            all_files: rel_paths.iter().cloned().collect(),
            rel_paths,
            documents,
            property_locations,
            shape,
            deps_text,
            estimator: TokenEstimator::new(),
        })
    }

    pub fn property_locations(&self) -> &[PropertyLocation] {
        &self.property_locations
    }

    pub fn shape(&self) -> PromptShape {
        self.shape
    }

    /// Check every discovered property in extraction order, one at a time,
    /// threading each conversation's actual consumption into the next
    /// one's budget.
    pub async fn check_proofs(&self) -> Result<Vec<ProofCheckResult>, FatalError> {
        let mut results = Vec::with_capacity(self.property_locations.len());
        let mut tokens_used: u64 = 0;
        for location in &self.property_locations {
            let ceiling = budget::ceiling_for_next(
                self.config.max_tokens_total,
                self.config.max_tokens_per_property,
                tokens_used,
            );
            let (result, cost) = self.check_proof(location, ceiling).await?;
            debug!(
                "{}:{} cost {} tokens{}",
                location.rel_path.display(),
                location.line_num,
                cost.tokens,
                if cost.estimated { " (estimated)" } else { "" }
            );
            tokens_used += cost.tokens;
            results.push(result);
        }
        Ok(results)
    }

    /// Run one property's bounded-turn conversation.
    ///
    /// `ceiling` caps this conversation's total tokens and is not
    /// re-derived mid-conversation; only the remaining allowance shrinks
    /// as turns consume it.
    pub async fn check_proof(
        &self,
        location: &PropertyLocation,
        ceiling: Option<u64>,
    ) -> Result<(ProofCheckResult, CheckCost), FatalError> {
        let initial = prompt::initial_message(
            self.shape,
            &self.rel_paths,
            &self.documents,
            &self.deps_text,
            location,
        );
        debug!("initial message for {}:{}:\n{initial}", location.rel_path.display(), location.line_num);
        // The target file is inlined in the initial message in both
        // shapes, so it counts as shown from the start; under full
        // disclosure so does everything else (no requests exist there).
        let initially_shown = match self.shape {
            PromptShape::FullDisclosure => self.all_files.clone(),
            PromptShape::Incremental => BTreeSet::from([location.rel_path.clone()]),
        };
        let mut state = ConversationState::new(initial, initially_shown);

        for _ in 0..self.config.max_messages {
            let input_tokens = self.estimator.input_tokens_in_messages(&state.messages);
            let max_completion_tokens = match ceiling {
                None => None,
                Some(ceiling) => {
                    let committed = state.completion_tokens_used + input_tokens;
                    if committed >= ceiling {
                        warn!(
                            "{}:{}: token limit reached ({committed} >= {ceiling})",
                            location.rel_path.display(),
                            location.line_num
                        );
                        return Ok((
                            failure(location, "Token limit reached"),
                            CheckCost {
                                tokens: state.completion_tokens_used + state.input_tokens_sent,
                                estimated: false,
                            },
                        ));
                    }
                    Some(ceiling - committed)
                }
            };

            let completion = match self
                .service
                .complete(CompletionRequest {
                    messages: &state.messages,
                    max_completion_tokens,
                    shape: self.shape,
                })
                .await
            {
                Ok(completion) => completion,
                Err(e) if e.is_recoverable() => {
                    warn!(
                        "{}:{}: {e}",
                        location.rel_path.display(),
                        location.line_num
                    );
                    // True usage is unknown here; charge the most this
                    // call could have cost.
                    return Ok((
                        failure(location, e.to_string()),
                        CheckCost {
                            tokens: ceiling.unwrap_or(MAX_CONTEXT_LENGTH),
                            estimated: true,
                        },
                    ));
                }
                Err(e) => {
                    error!(
                        "{}:{}: aborting run: {e}",
                        location.rel_path.display(),
                        location.line_num
                    );
                    return Err(FatalError::Service(e));
                }
            };

            let completion_tokens = completion
                .completion_tokens
                .ok_or(FatalError::MissingUsage)?;
            debug!("completion used {completion_tokens} tokens");
            state.completion_tokens_used += completion_tokens;
            state.input_tokens_sent = input_tokens;

            let content = completion.content.ok_or(FatalError::MissingContent)?;
            debug!("assistant: {content}");
            state.messages.push(Message::assistant(content.clone()));

            match response::classify(self.shape, &content) {
                Classified::Verdict(verdict) => {
                    return Ok((
                        ProofCheckResult {
                            property_location: location.clone(),
                            correctness_explanation: CheckOutcome::Verdict(verdict),
                        },
                        CheckCost {
                            tokens: state.completion_tokens_used + state.input_tokens_sent,
                            estimated: false,
                        },
                    ));
                }
                Classified::FilesRequested(requested) => {
                    let resolved = disclosure::resolve_files_requested(
                        &requested,
                        &self.all_files,
                        &state.files_shown,
                    );
                    if resolved.is_empty() {
                        error!(
                            "file request {requested:?} resolved to nothing; aborting run"
                        );
                        return Err(FatalError::EmptyDisclosure);
                    }
                    state.files_shown.extend(resolved.iter().cloned());
                    let followup = prompt::followup_message(&resolved, &self.documents);
                    debug!("disclosing {resolved:?}, follow-up message:\n{followup}");
                    state.messages.push(Message::user(followup));
                }
                Classified::Invalid(err) => {
                    error!("unusable response payload ({err}); aborting run:\n{content}");
                    return Err(FatalError::InvalidResponse(err));
                }
            }
        }

        error!(
            "{}:{}: no verdict after {} messages",
            location.rel_path.display(),
            location.line_num,
            self.config.max_messages
        );
        Err(FatalError::TurnLimitExceeded(self.config.max_messages))
    }
}

fn failure(location: &PropertyLocation, msg: impl Into<String>) -> ProofCheckResult {
    ProofCheckResult {
        property_location: location.clone(),
        correctness_explanation: CheckOutcome::Failure(Failure { msg: msg.into() }),
    }
}

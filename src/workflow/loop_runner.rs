// Bounded generate/validate retry loop
//
// GENERATE → VALIDATE → ACCEPTED | RETRY → GENERATE | EXHAUSTED
//
// Each transition consumes the previous `RetryState` and returns a new one, so
// the state machine can be stepped and tested without any model behind it.

use std::sync::Arc;
use tracing::{error, info, warn};

use super::generator::ArtifactGenerator;
use super::types::{Artifact, GenerationContext, ValidationVerdict};
use super::validator::ArtifactValidator;
use crate::config::constants::MAX_VALIDATION_ATTEMPTS;
use crate::errors::{LoopError, WorkflowError};

/// Snapshot of one run between steps.
#[derive(Debug, Clone)]
pub struct RetryState<A> {
    attempt_count: usize,
    max_attempts: usize,
    last_candidate: Option<A>,
    last_verdict: Option<ValidationVerdict>,
    context: GenerationContext,
}

/// Result of feeding one attempt into a [`RetryState`].
#[derive(Debug)]
pub enum Transition<A> {
    /// Go back to GENERATE with this state
    Retry(RetryState<A>),
    /// Terminal
    Done(LoopOutcome<A>),
}

/// Terminal result of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopOutcome<A> {
    Accepted {
        candidate: A,
        attempts: usize,
    },
    /// Attempts ran out. Nothing may be persisted.
    Exhausted {
        attempts: usize,
        last_verdict: Option<ValidationVerdict>,
    },
}

impl<A> LoopOutcome<A> {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    pub fn attempts(&self) -> usize {
        match self {
            Self::Accepted { attempts, .. } | Self::Exhausted { attempts, .. } => *attempts,
        }
    }

    pub fn into_candidate(self) -> Option<A> {
        match self {
            Self::Accepted { candidate, .. } => Some(candidate),
            Self::Exhausted { .. } => None,
        }
    }
}

impl<A: Clone> RetryState<A> {
    /// Fresh state. `max_attempts` below 1 is raised to 1.
    pub fn new(context: GenerationContext, max_attempts: usize) -> Self {
        Self {
            attempt_count: 0,
            max_attempts: max_attempts.max(1),
            last_candidate: None,
            last_verdict: None,
            context,
        }
    }

    pub fn attempt_count(&self) -> usize {
        self.attempt_count
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn context(&self) -> &GenerationContext {
        &self.context
    }

    pub fn last_candidate(&self) -> Option<&A> {
        self.last_candidate.as_ref()
    }

    pub fn last_verdict(&self) -> Option<&ValidationVerdict> {
        self.last_verdict.as_ref()
    }

    /// Show the generator a rejected candidate on the next attempt.
    pub fn with_previous_draft(mut self, text: impl Into<String>, size: usize) -> Self {
        self.context = self.context.with_previous_draft(text, size);
        self
    }

    /// VALIDATE finished for `candidate`.
    pub fn after_validation(self, candidate: A, verdict: ValidationVerdict) -> Transition<A> {
        let attempts = self.attempt_count + 1;
        if verdict.validated {
            return Transition::Done(LoopOutcome::Accepted { candidate, attempts });
        }
        self.reject(Some(candidate), verdict, attempts)
    }

    /// GENERATE produced an unparseable response. Counts as a failed attempt.
    pub fn after_malformed(self, detail: &str) -> Transition<A> {
        let attempts = self.attempt_count + 1;
        let verdict =
            ValidationVerdict::rejected(format!("previous response could not be parsed: {}", detail));
        self.reject(None, verdict, attempts)
    }

    fn reject(self, candidate: Option<A>, verdict: ValidationVerdict, attempts: usize) -> Transition<A> {
        if attempts >= self.max_attempts {
            return Transition::Done(LoopOutcome::Exhausted {
                attempts,
                last_verdict: Some(verdict),
            });
        }

        Transition::Retry(Self {
            attempt_count: attempts,
            max_attempts: self.max_attempts,
            context: self.context.with_feedback(verdict.recommendations.clone()),
            last_candidate: candidate.or(self.last_candidate),
            last_verdict: Some(verdict),
        })
    }
}

/// Drives a generator and a validator through [`RetryState`] transitions.
pub struct RetryLoop<A: Artifact> {
    generator: Arc<dyn ArtifactGenerator<A>>,
    validator: Arc<dyn ArtifactValidator<A>>,
    max_attempts: usize,
}

impl<A: Artifact> RetryLoop<A> {
    pub fn new(
        generator: Arc<dyn ArtifactGenerator<A>>,
        validator: Arc<dyn ArtifactValidator<A>>,
    ) -> Self {
        Self {
            generator,
            validator,
            max_attempts: MAX_VALIDATION_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Run to ACCEPTED or EXHAUSTED.
    ///
    /// Malformed generations consume an attempt. A model that cannot be reached
    /// aborts the run with [`LoopError`].
    pub async fn run(&self, context: GenerationContext) -> Result<LoopOutcome<A>, LoopError> {
        let mut state = RetryState::new(context, self.max_attempts);

        loop {
            let attempt = state.attempt_count() + 1;
            info!(
                kind = A::KIND,
                attempt,
                max_attempts = state.max_attempts(),
                "Generating candidate"
            );

            let transition = match self.generator.generate(state.context()).await {
                Ok(candidate) => {
                    let verdict = self.validator.validate(&candidate, state.context()).await;
                    if verdict.validated {
                        info!(kind = A::KIND, attempt, "Candidate validated");
                    } else {
                        warn!(
                            kind = A::KIND,
                            attempt,
                            recommendations = %verdict.recommendations,
                            "Candidate rejected"
                        );
                    }
                    let draft = (!verdict.validated)
                        .then(|| (candidate.revision_text(), candidate.size_metric()));
                    match (state.after_validation(candidate, verdict), draft) {
                        (Transition::Retry(next), Some((text, size))) => {
                            Transition::Retry(next.with_previous_draft(text, size))
                        }
                        (transition, _) => transition,
                    }
                }
                Err(WorkflowError::MalformedResponse { detail, .. }) => {
                    warn!(kind = A::KIND, attempt, error = %detail, "Malformed generation response");
                    state.after_malformed(&detail)
                }
                Err(source) => {
                    error!(kind = A::KIND, attempt, error = %source, "Generation failed; aborting run");
                    return Err(LoopError { attempt, source });
                }
            };

            match transition {
                Transition::Retry(next) => state = next,
                Transition::Done(outcome) => {
                    if let LoopOutcome::Exhausted { attempts, .. } = &outcome {
                        error!(kind = A::KIND, attempts, "Validation attempts exhausted");
                    }
                    return Ok(outcome);
                }
            }
        }
    }
}

//! Per-attempt state machine.

use std::fmt;

use login_commit_sdk::{CommitError, SharedState, SharedStateKey};
use login_security::SecurityContext;
use tracing::debug;
use uuid::Uuid;

/// Lifecycle of a [`LoginAttempt`].
///
/// `Initial -> Resolving -> ScratchBuilt -> Aggregated -> Committed`, with
/// `Failed` reachable from every non-terminal state. `Aggregated` loops back
/// to `Resolving` when another step establishes an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Initial,
    Resolving,
    ScratchBuilt,
    Aggregated,
    Committed,
    Failed,
}

impl AttemptState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Resolving => "resolving",
            Self::ScratchBuilt => "scratch_built",
            Self::Aggregated => "aggregated",
            Self::Committed => "committed",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::Failed)
    }
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One login attempt: its shared state and the scratch context to commit.
///
/// Owned by a single caller and never shared across attempts.
#[derive(Debug)]
pub struct LoginAttempt {
    id: Uuid,
    state: AttemptState,
    shared: SharedState,
    scratch: Option<SecurityContext>,
    aggregations: usize,
}

impl Default for LoginAttempt {
    fn default() -> Self {
        Self::new()
    }
}

impl LoginAttempt {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: AttemptState::Initial,
            shared: SharedState::new(),
            scratch: None,
            aggregations: 0,
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn state(&self) -> AttemptState {
        self.state
    }

    #[must_use]
    pub fn shared_state(&self) -> &SharedState {
        &self.shared
    }

    /// Number of scratch contexts aggregated so far.
    #[must_use]
    pub fn aggregations(&self) -> usize {
        self.aggregations
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub(crate) fn begin_resolving(&mut self) {
        self.transition(AttemptState::Resolving);
    }

    pub(crate) fn scratch_built(&mut self) {
        self.transition(AttemptState::ScratchBuilt);
    }

    /// Record an aggregated scratch context. Only the first one is kept for
    /// the commit; its identity is the one the shared state holds.
    pub(crate) fn record_aggregation(&mut self, scratch: SecurityContext) {
        self.aggregations += 1;
        if self.scratch.is_none() {
            self.scratch = Some(scratch);
        } else {
            debug!(attempt_id = %self.id, "Discarding scratch context of a later step");
        }
        self.transition(AttemptState::Aggregated);
    }

    pub(crate) fn mark_already_processed(&mut self) {
        self.shared.mark_already_processed();
    }

    pub(crate) fn shared_state_mut(&mut self) -> &mut SharedState {
        &mut self.shared
    }

    /// Check the attempt can be committed and hand out the kept scratch context.
    pub(crate) fn begin_commit(&mut self) -> Result<SecurityContext, CommitError> {
        if self.state.is_terminal() {
            return Err(CommitError::AttemptTerminated(self.state.as_str()));
        }
        if !self.shared.contains(SharedStateKey::Principal) {
            return Err(CommitError::MissingSharedEntry(SharedStateKey::Principal));
        }
        Ok(self.scratch.take().unwrap_or_default())
    }

    pub(crate) fn committed(&mut self) {
        self.transition(AttemptState::Committed);
    }

    pub(crate) fn fail(&mut self) {
        self.scratch = None;
        self.transition(AttemptState::Failed);
    }

    fn transition(&mut self, next: AttemptState) {
        debug!(attempt_id = %self.id, from = %self.state, to = %next, "Login attempt state change");
        self.state = next;
    }
}

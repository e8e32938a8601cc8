//! Per-session conversation state

use crate::types::{Phase, SessionId, Turn};
use indexmap::IndexMap;
use macrogen_catalog::{BlockCandidate, Requirements};
use macrogen_schema::{BlockSchema, ParamValue};
use std::collections::VecDeque;
use std::sync::Arc;

/// State of one conversation
///
/// Mutated only by the phase machine, one message at a time.
#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) id: SessionId,
    pub(crate) phase: Phase,
    pub(crate) requirements: Requirements,
    pub(crate) candidates: Vec<BlockCandidate>,
    pub(crate) selected: Option<BlockCandidate>,
    pub(crate) schema: Option<Arc<BlockSchema>>,
    /// Resolved values, in resolution order
    pub(crate) values: IndexMap<String, ParamValue>,
    /// Name of the parameter being collected
    pub(crate) cursor: Option<String>,
    pub(crate) history: VecDeque<Turn>,
    history_limit: usize,
}

impl Session {
    /// Create an empty session
    #[must_use]
    pub fn new(id: SessionId, history_limit: usize) -> Self {
        Self {
            id,
            phase: Phase::Understanding,
            requirements: Requirements::new(),
            candidates: Vec::new(),
            selected: None,
            schema: None,
            values: IndexMap::new(),
            cursor: None,
            history: VecDeque::with_capacity(history_limit),
            history_limit: history_limit.max(1),
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    #[inline]
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[inline]
    #[must_use]
    pub fn requirements(&self) -> &Requirements {
        &self.requirements
    }

    /// Candidates offered in Selecting
    #[inline]
    #[must_use]
    pub fn candidates(&self) -> &[BlockCandidate] {
        &self.candidates
    }

    #[inline]
    #[must_use]
    pub fn selected(&self) -> Option<&BlockCandidate> {
        self.selected.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn schema(&self) -> Option<&BlockSchema> {
        self.schema.as_deref()
    }

    /// Values resolved so far
    #[inline]
    #[must_use]
    pub fn values(&self) -> &IndexMap<String, ParamValue> {
        &self.values
    }

    /// Parameter currently being collected
    #[inline]
    #[must_use]
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// Recent turns, oldest first
    #[inline]
    #[must_use]
    pub fn history(&self) -> &VecDeque<Turn> {
        &self.history
    }

    /// Append a turn, dropping the oldest beyond the history limit
    pub fn record(&mut self, turn: Turn) {
        while self.history.len() >= self.history_limit {
            self.history.pop_front();
        }
        self.history.push_back(turn);
    }

    /// Back to an empty Understanding state, history included
    pub fn reset(&mut self) {
        self.discard_block();
        self.requirements.clear();
        self.history.clear();
        self.phase = Phase::Understanding;
    }

    /// Drop candidates, selection, schema, values and cursor
    pub(crate) fn discard_block(&mut self) {
        self.candidates.clear();
        self.selected = None;
        self.schema = None;
        self.values.clear();
        self.cursor = None;
    }

    /// Start collecting for a selected block
    pub(crate) fn select(&mut self, candidate: BlockCandidate, schema: Arc<BlockSchema>) {
        self.selected = Some(candidate);
        self.schema = Some(schema);
        self.values.clear();
        self.cursor = None;
        self.phase = Phase::Collecting;
    }
}

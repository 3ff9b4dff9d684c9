use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::align::structs::{EdgeBounds, Trace};
use crate::align::{Bits, DpError, Nats, TracebackError};
use crate::structs::{Profile, Sequence};

/// The passes a task runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Passes {
    pub forward: bool,
    pub backward: bool,
    pub viterbi: bool,
    /// Recover the best path. This implies a Viterbi pass.
    pub traceback: bool,
}

impl Default for Passes {
    fn default() -> Self {
        Self {
            forward: true,
            backward: true,
            viterbi: true,
            traceback: false,
        }
    }
}

impl Passes {
    pub fn all() -> Self {
        Self {
            traceback: true,
            ..Default::default()
        }
    }

    pub fn forward_only() -> Self {
        Self {
            forward: true,
            backward: false,
            viterbi: false,
            traceback: false,
        }
    }
}

/// One unit of work: a profile against a sequence, inside a set of bounds.
#[derive(Clone)]
pub struct SearchTask {
    pub id: usize,
    pub sequence: Arc<Sequence>,
    pub profile: Arc<Profile>,
    pub bounds: EdgeBounds,
    pub passes: Passes,
}

impl SearchTask {
    pub fn new(
        id: usize,
        profile: Arc<Profile>,
        sequence: Arc<Sequence>,
        bounds: EdgeBounds,
    ) -> Self {
        Self {
            id,
            sequence,
            profile,
            bounds,
            passes: Passes::default(),
        }
    }

    pub fn with_passes(mut self, passes: Passes) -> Self {
        self.passes = passes;
        self
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct TaskScores {
    pub num_cells: usize,
    pub forward: Option<Nats>,
    pub backward: Option<Nats>,
    pub viterbi: Option<Nats>,
    /// The forward score against the null model
    pub bits: Option<Bits>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TaskError {
    #[error(transparent)]
    Dp(#[from] DpError),
    #[error("bounds hold {num_cells} cells, over the limit of {max_cells}")]
    TooLarge { num_cells: usize, max_cells: usize },
    #[error("task panicked: {message}")]
    Panicked { message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskResult {
    pub id: usize,
    pub outcome: Result<TaskScores, TaskError>,
    /// Present when a traceback was requested and the score passes succeeded.
    pub trace: Option<Result<Trace, TracebackError>>,
}

impl TaskResult {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok() && !matches!(self.trace, Some(Err(_)))
    }

    /// A short label for the result, used in tabular output.
    pub fn status(&self) -> String {
        match (&self.outcome, &self.trace) {
            (Err(TaskError::Dp(_)), _) => "dp-error".to_string(),
            (Err(TaskError::TooLarge { .. }), _) => "too-large".to_string(),
            (Err(TaskError::Panicked { .. }), _) => "panicked".to_string(),
            (Ok(_), Some(Err(_))) => "broken-trace".to_string(),
            (Ok(_), _) => "ok".to_string(),
        }
    }
}

use std::any::Any;
use std::borrow::Cow;
use std::panic::{self, AssertUnwindSafe};

use log::{debug, warn};

use crate::align::structs::{
    DpMatrix, DpMatrixLinear, DpMatrixSparse, EdgeBounds, Trace, TracePointers,
};
use crate::align::{
    backward, bit_score, forward, traceback, viterbi, DpError, TracebackError,
};
use crate::structs::{Profile, Sequence};

use super::{Passes, SearchConfig, SearchTask, StorageKind, TaskError, TaskResult, TaskScores};

type PassResults = (
    Result<TaskScores, TaskError>,
    Option<Result<Trace, TracebackError>>,
);

/// The scratch matrices a worker reuses from one task to the next.
#[derive(Default)]
pub struct Workspace {
    sparse: DpMatrixSparse,
    linear: DpMatrixLinear,
    pointers: TracePointers,
}

impl Workspace {
    /// Run every requested pass of a task. A panic inside a pass is caught
    /// and reported, and the workspace is rebuilt before the next task.
    pub fn run(&mut self, task: &SearchTask, config: &SearchConfig) -> TaskResult {
        let (outcome, trace) =
            match panic::catch_unwind(AssertUnwindSafe(|| self.run_passes(task, config))) {
                Ok(results) => results,
                Err(payload) => {
                    *self = Workspace::default();
                    (
                        Err(TaskError::Panicked {
                            message: panic_message(payload),
                        }),
                        None,
                    )
                }
            };

        match (&outcome, &trace) {
            (Err(err), _) => warn!("task {} failed: {err}", task.id),
            (Ok(_), Some(Err(err))) => warn!("task {} traceback failed: {err}", task.id),
            (Ok(scores), _) => debug!(
                "task {}: {} x {} in {} cells, forward: {:?}",
                task.id, task.profile.name, task.sequence.name, scores.num_cells, scores.forward
            ),
        }

        TaskResult {
            id: task.id,
            outcome,
            trace,
        }
    }

    fn run_passes(&mut self, task: &SearchTask, config: &SearchConfig) -> PassResults {
        let bounds = &task.bounds;
        let num_cells = bounds.num_cells();

        if let Some(max_cells) = config.max_cells {
            if num_cells > max_cells {
                return (
                    Err(TaskError::TooLarge {
                        num_cells,
                        max_cells,
                    }),
                    None,
                );
            }
        }

        let profile: Cow<Profile> = if config.configure_length {
            Cow::Owned(task.profile.configured_for(task.sequence.length))
        } else {
            Cow::Borrowed(task.profile.as_ref())
        };

        let passes = ScorePasses {
            profile: &profile,
            target: &task.sequence,
            bounds,
            passes: task.passes,
            num_cells,
        };

        match config.storage {
            StorageKind::Quadratic => match self.sparse.reuse(bounds) {
                Ok(()) => passes.run(&mut self.sparse, &mut self.pointers),
                Err(err) => (Err(DpError::from(err).into()), None),
            },
            StorageKind::Linear => match self.linear.reuse(bounds) {
                Ok(()) => passes.run(&mut self.linear, &mut self.pointers),
                Err(err) => (Err(DpError::from(err).into()), None),
            },
        }
    }
}

struct ScorePasses<'a> {
    profile: &'a Profile,
    target: &'a Sequence,
    bounds: &'a EdgeBounds,
    passes: Passes,
    num_cells: usize,
}

impl ScorePasses<'_> {
    fn run(&self, matrix: &mut impl DpMatrix, pointers: &mut TracePointers) -> PassResults {
        match self.scores(matrix, pointers) {
            Ok(scores) => {
                let trace = self
                    .passes
                    .traceback
                    .then(|| traceback(pointers, self.bounds));
                (Ok(scores), trace)
            }
            Err(err) => (Err(err.into()), None),
        }
    }

    fn scores(
        &self,
        matrix: &mut impl DpMatrix,
        pointers: &mut TracePointers,
    ) -> Result<TaskScores, DpError> {
        let (profile, target, bounds) = (self.profile, self.target, self.bounds);
        let mut scores = TaskScores {
            num_cells: self.num_cells,
            ..Default::default()
        };

        if self.passes.forward {
            let score = forward(profile, target, bounds, matrix)?;
            scores.bits = Some(bit_score(score, target.length));
            scores.forward = Some(score);
        }

        if self.passes.backward {
            scores.backward = Some(backward(profile, target, bounds, matrix)?);
        }

        if self.passes.traceback {
            pointers.reuse(bounds)?;
            scores.viterbi = Some(viterbi(profile, target, bounds, matrix, Some(pointers))?);
        } else if self.passes.viterbi {
            scores.viterbi = Some(viterbi(profile, target, bounds, matrix, None)?);
        }

        Ok(scores)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchConfigBuilder;
    use assert2::{check, let_assert};
    use std::sync::Arc;

    fn task(id: usize, passes: Passes) -> SearchTask {
        let profile = Arc::new(Profile::uniform(6));
        let_assert!(Ok(sequence) = Sequence::from_utf8(b"ACDEFGHI"));
        let bounds = EdgeBounds::diagonal_band(8, 6, 2);
        SearchTask::new(id, profile, Arc::new(sequence), bounds).with_passes(passes)
    }

    #[test]
    fn test_workspace_runs_all_passes() {
        let mut workspace = Workspace::default();
        let result = workspace.run(&task(3, Passes::all()), &SearchConfig::default());

        check!(result.id == 3);
        let_assert!(Ok(scores) = &result.outcome);
        let_assert!(Some(forward) = scores.forward);
        let_assert!(Some(backward) = scores.backward);
        let_assert!(Some(viterbi) = scores.viterbi);
        check!((forward.value() - backward.value()).abs() < 0.05);
        check!(viterbi.value() <= forward.value());
        check!(scores.num_cells == EdgeBounds::diagonal_band(8, 6, 2).num_cells());
        check!(scores.bits.is_some());

        let_assert!(Some(Ok(trace)) = &result.trace);
        check!(!trace.is_empty());
        check!(result.status() == "ok");
    }

    #[test]
    fn test_workspace_linear_traceback() {
        let mut workspace = Workspace::default();
        let quadratic = workspace.run(&task(0, Passes::all()), &SearchConfig::default());

        let_assert!(
            Ok(config) = SearchConfigBuilder::default()
                .storage(StorageKind::Linear)
                .build()
        );
        let linear = workspace.run(&task(0, Passes::all()), &config);

        // traceback pointers live outside the score matrix
        check!(linear == quadratic);
    }

    #[test]
    fn test_workspace_rejects_large_bounds() {
        let mut workspace = Workspace::default();
        let_assert!(Ok(config) = SearchConfigBuilder::default().max_cells(10).build());
        let result = workspace.run(&task(1, Passes::default()), &config);

        let_assert!(Err(TaskError::TooLarge { max_cells: 10, .. }) = &result.outcome);
        check!(result.trace.is_none());
        check!(result.status() == "too-large");
    }

    #[test]
    fn test_workspace_catches_panics() {
        let mut broken = Profile::uniform(6);
        broken.match_scores.truncate(2);
        let mut bad_task = task(2, Passes::forward_only());
        bad_task.profile = Arc::new(broken);

        let config = SearchConfig {
            configure_length: false,
            ..Default::default()
        };

        let mut workspace = Workspace::default();
        let result = workspace.run(&bad_task, &config);
        let_assert!(Err(TaskError::Panicked { .. }) = &result.outcome);

        // the workspace is still usable afterward
        let result = workspace.run(&task(4, Passes::default()), &config);
        check!(result.is_ok());
    }
}

use std::io::Write;

use serde::Serialize;
use thiserror::Error;

use crate::align::Nats;
use crate::structs::{Profile, Sequence};

/// The states a path through the model can visit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum State {
    M = 1,
    I = 2,
    D = 3,
    S = 4,
    N = 5,
    B = 6,
    E = 7,
    C = 8,
    T = 9,
    J = 10,
}

impl State {
    /// The byte that marks "no state" in packed pointer storage.
    pub const NONE: u8 = 0;

    #[inline(always)]
    pub fn code(self) -> u8 {
        self as u8
    }

    #[inline(always)]
    pub fn from_code(code: u8) -> Option<State> {
        match code {
            1 => Some(State::M),
            2 => Some(State::I),
            3 => Some(State::D),
            4 => Some(State::S),
            5 => Some(State::N),
            6 => Some(State::B),
            7 => Some(State::E),
            8 => Some(State::C),
            9 => Some(State::T),
            10 => Some(State::J),
            _ => None,
        }
    }

    pub fn is_normal(self) -> bool {
        matches!(self, State::M | State::I | State::D)
    }

    /// Whether arriving in this state from `previous` emits the residue at the step's row.
    fn emits_from(self, previous: State) -> bool {
        match self {
            State::M | State::I => true,
            State::N | State::C | State::J => previous == self,
            _ => false,
        }
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TraceStep {
    pub state: State,
    /// The sequence row of the step, 0..=Q
    pub row: usize,
    /// The profile column of the step; 0 for the special states
    pub col: usize,
}

impl TraceStep {
    pub fn new(state: State, row: usize, col: usize) -> Self {
        TraceStep { state, row, col }
    }
}

impl std::fmt::Debug for TraceStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}> r: {} c: {}", self.state, self.row, self.col)
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum TraceScoreError {
    #[error("no transition from {from:?} to {to:?}")]
    IllegalTransition { from: TraceStep, to: TraceStep },
    #[error("trace step {step:?} is outside the sequence or profile")]
    OutOfRange { step: TraceStep },
    #[error("trace is empty")]
    Empty,
}

/// A path through the model, in the order it was recovered:
/// the terminal state first and the start state last.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Trace {
    pub steps: Vec<TraceStep>,
}

impl Trace {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn push(&mut self, state: State, row: usize, col: usize) {
        self.steps.push(TraceStep::new(state, row, col));
    }

    pub fn first(&self) -> Option<&TraceStep> {
        self.steps.first()
    }

    pub fn last(&self) -> Option<&TraceStep> {
        self.steps.last()
    }

    /// The steps from the start state to the terminal state.
    pub fn iter_forward(&self) -> impl Iterator<Item = &TraceStep> {
        self.steps.iter().rev()
    }

    /// The number of residues aligned to match states.
    pub fn num_matches(&self) -> usize {
        self.steps.iter().filter(|s| s.state == State::M).count()
    }

    /// The number of B states, i.e. the number of domains the path passes through.
    pub fn num_domains(&self) -> usize {
        self.steps.iter().filter(|s| s.state == State::B).count()
    }

    fn emission_score(
        step: &TraceStep,
        previous: State,
        profile: &Profile,
        target: &Sequence,
    ) -> Result<f32, TraceScoreError> {
        if !step.state.emits_from(previous) {
            return Ok(0.0);
        }
        if step.row == 0 || step.row > target.length || step.col > profile.length {
            return Err(TraceScoreError::OutOfRange { step: *step });
        }

        let residue = target.residue(step.row);
        Ok(match step.state {
            State::M => profile.match_score(residue, step.col),
            State::I => profile.insert_score(residue, step.col),
            // N, C, and J emit with background probability
            _ => 0.0,
        })
    }

    /// Recompute the score of the path from the profile's transition and emission scores.
    pub fn score(&self, profile: &Profile, target: &Sequence) -> Result<Nats, TraceScoreError> {
        let mut steps = self.iter_forward();
        let mut previous = steps.next().ok_or(TraceScoreError::Empty)?;
        let mut score = 0.0;

        for step in steps {
            score += profile
                .generic_transition_score(previous.state, previous.col, step.state, step.col)
                .ok_or(TraceScoreError::IllegalTransition {
                    from: *previous,
                    to: *step,
                })?;
            score += Self::emission_score(step, previous.state, profile, target)?;
            previous = step;
        }

        Ok(Nats(score))
    }

    pub fn dump(
        &self,
        out: &mut impl Write,
        profile: &Profile,
        target: &Sequence,
    ) -> anyhow::Result<()> {
        let mut total: f32 = 0.0;

        writeln!(
            out,
            "st   row   col   transit emission - traceback len {}",
            self.len()
        )?;
        writeln!(out, "--  ----- -----  -------- --------")?;

        let forward_steps: Vec<&TraceStep> = self.iter_forward().collect();
        for (idx, step) in forward_steps.iter().enumerate() {
            let (transition, emission) = match idx.checked_sub(1).map(|i| forward_steps[i]) {
                Some(previous) => (
                    profile
                        .generic_transition_score(
                            previous.state,
                            previous.col,
                            step.state,
                            step.col,
                        )
                        .unwrap_or(f32::NAN),
                    Self::emission_score(step, previous.state, profile, target).unwrap_or(f32::NAN),
                ),
                None => (0.0, 0.0),
            };
            total += transition + emission;

            let residue = if step.row >= 1 && step.row <= target.length && emission != 0.0 {
                target.utf8_bytes[step.row] as char
            } else {
                ' '
            };

            writeln!(
                out,
                "{:1}  {:5} {:5}  {:8.4} {:8.4} {}",
                step.state, step.row, step.col, transition, emission, residue
            )?;
        }

        writeln!(out, "                -------- --------")?;
        writeln!(out, "                  total: {:8.4}\n", total)?;

        Ok(())
    }
}

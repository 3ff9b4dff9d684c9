use crate::align::error::TracebackError;
use crate::align::structs::{EdgeBounds, MatrixError, State, Trace, TracePointers};
use crate::structs::Profile;

/// Recover the best path recorded by a `viterbi` pass.
///
/// The walk starts at T and the C state of the last row and follows the
/// stored predecessors down to S. The trace is built terminal state first.
pub fn traceback(pointers: &TracePointers, bounds: &EdgeBounds) -> Result<Trace, TracebackError> {
    if !pointers.matches_bounds(bounds) {
        return Err(MatrixError::Shape {
            expected: (bounds.seq_length, bounds.profile_length),
            found: (pointers.seq_length(), pointers.profile_length()),
        }
        .into());
    }

    let mut trace = Trace::default();
    let mut target_idx = pointers.seq_length();
    let mut profile_idx = 0;
    let mut state = State::C;

    trace.push(State::T, target_idx, 0);

    loop {
        trace.push(state, target_idx, profile_idx);

        let broken = TracebackError::BrokenChain {
            state,
            row: target_idx,
            col: profile_idx,
        };
        let previous_row = target_idx.checked_sub(1);

        let (next_state, next_target_idx, next_profile_idx) = match state {
            State::S => break,
            State::N => match previous_row {
                Some(row) => (State::N, row, 0),
                None => (State::S, 0, 0),
            },
            State::C | State::J => {
                let special_idx = if state == State::C {
                    Profile::SPECIAL_C_IDX
                } else {
                    Profile::SPECIAL_J_IDX
                };

                match (pointers.get_special(target_idx, special_idx), previous_row) {
                    (Some(State::E), _) => (State::E, target_idx, 0),
                    (Some(from), Some(row)) if from == state => (state, row, 0),
                    _ => return Err(broken),
                }
            }
            State::B => match pointers.get_special(target_idx, Profile::SPECIAL_B_IDX) {
                Some(from @ (State::N | State::J)) => (from, target_idx, 0),
                _ => return Err(broken),
            },
            State::E => match pointers.end_source(target_idx) {
                Some((from, col)) if pointers.in_bounds(target_idx, col) => (from, target_idx, col),
                _ => return Err(broken),
            },
            State::M => match (pointers.get(State::M, target_idx, profile_idx), previous_row) {
                (Some(State::B), Some(row)) => (State::B, row, 0),
                (Some(from @ (State::M | State::I | State::D)), Some(row)) if profile_idx > 1 => {
                    (from, row, profile_idx - 1)
                }
                _ => return Err(broken),
            },
            State::I => match (pointers.get(State::I, target_idx, profile_idx), previous_row) {
                (Some(from @ (State::M | State::I)), Some(row)) => (from, row, profile_idx),
                _ => return Err(broken),
            },
            State::D => match pointers.get(State::D, target_idx, profile_idx) {
                Some(from @ (State::M | State::D)) if profile_idx > 1 => {
                    (from, target_idx, profile_idx - 1)
                }
                _ => return Err(broken),
            },
            State::T => return Err(broken),
        };

        state = next_state;
        target_idx = next_target_idx;
        profile_idx = next_profile_idx;
    }

    Ok(trace)
}

use crate::align::error::{check_inputs, DpError};
use crate::align::structs::{DpMatrix, EdgeBounds, MatrixError, State, TracePointers};
use crate::structs::{Profile, Sequence};

use super::Nats;

/// The highest scoring candidate, keeping the first one on ties.
#[inline(always)]
pub(crate) fn first_max<const N: usize>(candidates: [(f32, State); N]) -> (f32, State) {
    let mut best = candidates[0];
    for &candidate in &candidates[1..] {
        if candidate.0 > best.0 {
            best = candidate;
        }
    }
    best
}

/// Score the single best path through the cells inside `bounds`.
///
/// When `pointers` are supplied, every cell records the predecessor it
/// was maximized over so that the path can be recovered with `traceback`.
pub fn viterbi(
    profile: &Profile,
    target: &Sequence,
    bounds: &EdgeBounds,
    dp_matrix: &mut impl DpMatrix,
    mut pointers: Option<&mut TracePointers>,
) -> Result<Nats, DpError> {
    check_inputs(profile, target, bounds, dp_matrix)?;

    if let Some(pointers) = pointers.as_deref_mut() {
        if !pointers.matches_bounds(bounds) {
            return Err(MatrixError::Shape {
                expected: (bounds.seq_length, bounds.profile_length),
                found: (pointers.seq_length(), pointers.profile_length()),
            }
            .into());
        }
        pointers.start_pass();
        pointers.set_special(0, Profile::SPECIAL_B_IDX, State::N);
    }

    dp_matrix.start_pass();
    dp_matrix.prepare_row(0);
    dp_matrix.set_special(0, Profile::SPECIAL_N_IDX, 0.0);
    dp_matrix.set_special(
        0,
        Profile::SPECIAL_B_IDX,
        profile.special_transition_score(Profile::SPECIAL_N_IDX, Profile::SPECIAL_MOVE_IDX),
    );
    dp_matrix.set_special(0, Profile::SPECIAL_E_IDX, -f32::INFINITY);
    dp_matrix.set_special(0, Profile::SPECIAL_C_IDX, -f32::INFINITY);
    dp_matrix.set_special(0, Profile::SPECIAL_J_IDX, -f32::INFINITY);
    dp_matrix.finish_row(0);

    for target_idx in 1..=target.length {
        dp_matrix.prepare_row(target_idx);

        let residue = target.residue(target_idx);
        let mut end = (-f32::INFINITY, State::M, 0);

        for interval in bounds.row(target_idx - 1) {
            for profile_idx in interval.dp_columns() {
                let (match_score, match_from) = first_max([
                    (
                        dp_matrix.get_match(target_idx - 1, profile_idx - 1)
                            + profile.transition_score(
                                Profile::MATCH_TO_MATCH_IDX,
                                profile_idx - 1,
                            ),
                        State::M,
                    ),
                    (
                        dp_matrix.get_insert(target_idx - 1, profile_idx - 1)
                            + profile
                                .transition_score(Profile::INSERT_TO_MATCH_IDX, profile_idx - 1),
                        State::I,
                    ),
                    (
                        dp_matrix.get_delete(target_idx - 1, profile_idx - 1)
                            + profile
                                .transition_score(Profile::DELETE_TO_MATCH_IDX, profile_idx - 1),
                        State::D,
                    ),
                    (
                        dp_matrix.get_special(target_idx - 1, Profile::SPECIAL_B_IDX)
                            + profile.transition_score(
                                Profile::BEGIN_TO_MATCH_IDX,
                                profile_idx - 1,
                            ),
                        State::B,
                    ),
                ]);
                let match_score = match_score + profile.match_score(residue, profile_idx);

                let (insert_score, insert_from) = first_max([
                    (
                        dp_matrix.get_match(target_idx - 1, profile_idx)
                            + profile.transition_score(Profile::MATCH_TO_INSERT_IDX, profile_idx),
                        State::M,
                    ),
                    (
                        dp_matrix.get_insert(target_idx - 1, profile_idx)
                            + profile.transition_score(Profile::INSERT_TO_INSERT_IDX, profile_idx),
                        State::I,
                    ),
                ]);
                let insert_score = insert_score + profile.insert_score(residue, profile_idx);

                let (delete_score, delete_from) = first_max([
                    (
                        dp_matrix.get_match(target_idx, profile_idx - 1)
                            + profile.transition_score(
                                Profile::MATCH_TO_DELETE_IDX,
                                profile_idx - 1,
                            ),
                        State::M,
                    ),
                    (
                        dp_matrix.get_delete(target_idx, profile_idx - 1)
                            + profile
                                .transition_score(Profile::DELETE_TO_DELETE_IDX, profile_idx - 1),
                        State::D,
                    ),
                ]);

                dp_matrix.set_match(target_idx, profile_idx, match_score);
                dp_matrix.set_insert(target_idx, profile_idx, insert_score);
                dp_matrix.set_delete(target_idx, profile_idx, delete_score);

                if let Some(pointers) = pointers.as_deref_mut() {
                    pointers.set(State::M, target_idx, profile_idx, match_from);
                    pointers.set(State::I, target_idx, profile_idx, insert_from);
                    pointers.set(State::D, target_idx, profile_idx, delete_from);
                }

                if match_score > end.0 {
                    end = (match_score, State::M, profile_idx);
                }
                if delete_score > end.0 {
                    end = (delete_score, State::D, profile_idx);
                }
            }
        }

        let (end_score, end_state, end_col) = end;
        dp_matrix.set_special(target_idx, Profile::SPECIAL_E_IDX, end_score);

        let (j_score, j_from) = first_max([
            (
                dp_matrix.get_special(target_idx - 1, Profile::SPECIAL_J_IDX)
                    + profile
                        .special_transition_score(
                            Profile::SPECIAL_J_IDX,
                            Profile::SPECIAL_LOOP_IDX,
                        ),
                State::J,
            ),
            (
                end_score
                    + profile
                        .special_transition_score(
                            Profile::SPECIAL_E_IDX,
                            Profile::SPECIAL_LOOP_IDX,
                        ),
                State::E,
            ),
        ]);
        dp_matrix.set_special(target_idx, Profile::SPECIAL_J_IDX, j_score);

        let (c_score, c_from) = first_max([
            (
                dp_matrix.get_special(target_idx - 1, Profile::SPECIAL_C_IDX)
                    + profile
                        .special_transition_score(
                            Profile::SPECIAL_C_IDX,
                            Profile::SPECIAL_LOOP_IDX,
                        ),
                State::C,
            ),
            (
                end_score
                    + profile
                        .special_transition_score(
                            Profile::SPECIAL_E_IDX,
                            Profile::SPECIAL_MOVE_IDX,
                        ),
                State::E,
            ),
        ]);
        dp_matrix.set_special(target_idx, Profile::SPECIAL_C_IDX, c_score);

        let n_score = dp_matrix.get_special(target_idx - 1, Profile::SPECIAL_N_IDX)
            + profile.special_transition_score(Profile::SPECIAL_N_IDX, Profile::SPECIAL_LOOP_IDX);
        dp_matrix.set_special(target_idx, Profile::SPECIAL_N_IDX, n_score);

        let (b_score, b_from) = first_max([
            (
                n_score
                    + profile
                        .special_transition_score(
                            Profile::SPECIAL_N_IDX,
                            Profile::SPECIAL_MOVE_IDX,
                        ),
                State::N,
            ),
            (
                j_score
                    + profile
                        .special_transition_score(
                            Profile::SPECIAL_J_IDX,
                            Profile::SPECIAL_MOVE_IDX,
                        ),
                State::J,
            ),
        ]);
        dp_matrix.set_special(target_idx, Profile::SPECIAL_B_IDX, b_score);

        if let Some(pointers) = pointers.as_deref_mut() {
            if end_score > -f32::INFINITY {
                pointers.set_end_source(target_idx, end_state, end_col);
            }
            pointers.set_special(target_idx, Profile::SPECIAL_J_IDX, j_from);
            pointers.set_special(target_idx, Profile::SPECIAL_C_IDX, c_from);
            pointers.set_special(target_idx, Profile::SPECIAL_B_IDX, b_from);
        }

        dp_matrix.finish_row(target_idx);
    }

    Ok(Nats(
        dp_matrix.get_special(target.length, Profile::SPECIAL_C_IDX)
            + profile.special_transition_score(Profile::SPECIAL_C_IDX, Profile::SPECIAL_MOVE_IDX),
    ))
}

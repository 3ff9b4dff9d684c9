use crate::align::error::{check_inputs, DpError};
use crate::align::structs::{DpMatrix, EdgeBounds};
use crate::log_sum;
use crate::structs::{Profile, Sequence};

use super::Nats;

/// Sum the probability of every path suffix through the cells inside `bounds`.
///
/// The returned score is the N state of row 0, which matches the forward
/// score of the same bounds.
pub fn backward(
    profile: &Profile,
    target: &Sequence,
    bounds: &EdgeBounds,
    dp_matrix: &mut impl DpMatrix,
) -> Result<Nats, DpError> {
    check_inputs(profile, target, bounds, dp_matrix)?;

    let last_row = target.length;
    dp_matrix.start_pass();

    // the last row: nothing is emitted after it, so only C can move on to T
    dp_matrix.prepare_row(last_row);
    dp_matrix.set_special(last_row, Profile::SPECIAL_B_IDX, -f32::INFINITY);
    dp_matrix.set_special(last_row, Profile::SPECIAL_J_IDX, -f32::INFINITY);
    dp_matrix.set_special(last_row, Profile::SPECIAL_N_IDX, -f32::INFINITY);
    dp_matrix.set_special(
        last_row,
        Profile::SPECIAL_C_IDX,
        profile.special_transition_score(Profile::SPECIAL_C_IDX, Profile::SPECIAL_MOVE_IDX),
    );
    let end_score = dp_matrix.get_special(last_row, Profile::SPECIAL_C_IDX)
        + profile.special_transition_score(Profile::SPECIAL_E_IDX, Profile::SPECIAL_MOVE_IDX);
    dp_matrix.set_special(last_row, Profile::SPECIAL_E_IDX, end_score);

    for interval in bounds.row(last_row - 1).iter().rev() {
        for profile_idx in interval.dp_columns().rev() {
            let match_score = log_sum!(
                dp_matrix.get_delete(last_row, profile_idx + 1)
                    + profile.transition_score(Profile::MATCH_TO_DELETE_IDX, profile_idx),
                end_score
            );
            let delete_score = log_sum!(
                dp_matrix.get_delete(last_row, profile_idx + 1)
                    + profile.transition_score(Profile::DELETE_TO_DELETE_IDX, profile_idx),
                end_score
            );

            dp_matrix.set_match(last_row, profile_idx, match_score);
            dp_matrix.set_insert(last_row, profile_idx, -f32::INFINITY);
            dp_matrix.set_delete(last_row, profile_idx, delete_score);
        }
    }
    dp_matrix.finish_row(last_row);

    for target_idx in (0..last_row).rev() {
        dp_matrix.prepare_row(target_idx);

        let next_residue = target.residue(target_idx + 1);

        // B moves into any bounded match state of the next row
        let mut begin_score = -f32::INFINITY;
        for interval in bounds.row(target_idx) {
            for profile_idx in interval.dp_columns() {
                begin_score = log_sum!(
                    begin_score,
                    dp_matrix.get_match(target_idx + 1, profile_idx)
                        + profile.transition_score(Profile::BEGIN_TO_MATCH_IDX, profile_idx - 1)
                        + profile.match_score(next_residue, profile_idx)
                );
            }
        }
        dp_matrix.set_special(target_idx, Profile::SPECIAL_B_IDX, begin_score);

        dp_matrix.set_special(
            target_idx,
            Profile::SPECIAL_J_IDX,
            log_sum!(
                dp_matrix.get_special(target_idx + 1, Profile::SPECIAL_J_IDX)
                    + profile
                        .special_transition_score(
                            Profile::SPECIAL_J_IDX,
                            Profile::SPECIAL_LOOP_IDX,
                        ),
                begin_score
                    + profile
                        .special_transition_score(Profile::SPECIAL_J_IDX, Profile::SPECIAL_MOVE_IDX)
            ),
        );

        dp_matrix.set_special(
            target_idx,
            Profile::SPECIAL_C_IDX,
            dp_matrix.get_special(target_idx + 1, Profile::SPECIAL_C_IDX)
                + profile.special_transition_score(
                    Profile::SPECIAL_C_IDX,
                    Profile::SPECIAL_LOOP_IDX,
                ),
        );

        let end_score = log_sum!(
            dp_matrix.get_special(target_idx, Profile::SPECIAL_C_IDX)
                + profile.special_transition_score(
                    Profile::SPECIAL_E_IDX,
                    Profile::SPECIAL_MOVE_IDX,
                ),
            dp_matrix.get_special(target_idx, Profile::SPECIAL_J_IDX)
                + profile.special_transition_score(
                    Profile::SPECIAL_E_IDX,
                    Profile::SPECIAL_LOOP_IDX,
                )
        );
        dp_matrix.set_special(target_idx, Profile::SPECIAL_E_IDX, end_score);

        dp_matrix.set_special(
            target_idx,
            Profile::SPECIAL_N_IDX,
            log_sum!(
                dp_matrix.get_special(target_idx + 1, Profile::SPECIAL_N_IDX)
                    + profile
                        .special_transition_score(
                            Profile::SPECIAL_N_IDX,
                            Profile::SPECIAL_LOOP_IDX,
                        ),
                begin_score
                    + profile
                        .special_transition_score(Profile::SPECIAL_N_IDX, Profile::SPECIAL_MOVE_IDX)
            ),
        );

        // row 0 has no normal states
        if target_idx > 0 {
            for interval in bounds.row(target_idx - 1).iter().rev() {
                for profile_idx in interval.dp_columns().rev() {
                    let next_match = dp_matrix.get_match(target_idx + 1, profile_idx + 1)
                        + profile.match_score(next_residue, profile_idx + 1);
                    let next_insert = dp_matrix.get_insert(target_idx + 1, profile_idx)
                        + profile.insert_score(next_residue, profile_idx);
                    let next_delete = dp_matrix.get_delete(target_idx, profile_idx + 1);

                    let match_score = log_sum!(
                        next_match
                            + profile.transition_score(Profile::MATCH_TO_MATCH_IDX, profile_idx),
                        next_insert
                            + profile.transition_score(Profile::MATCH_TO_INSERT_IDX, profile_idx),
                        next_delete
                            + profile.transition_score(Profile::MATCH_TO_DELETE_IDX, profile_idx),
                        end_score
                    );

                    let insert_score = log_sum!(
                        next_match
                            + profile.transition_score(Profile::INSERT_TO_MATCH_IDX, profile_idx),
                        next_insert
                            + profile.transition_score(Profile::INSERT_TO_INSERT_IDX, profile_idx)
                    );

                    let delete_score = log_sum!(
                        next_match
                            + profile.transition_score(Profile::DELETE_TO_MATCH_IDX, profile_idx),
                        next_delete
                            + profile.transition_score(Profile::DELETE_TO_DELETE_IDX, profile_idx),
                        end_score
                    );

                    dp_matrix.set_match(target_idx, profile_idx, match_score);
                    dp_matrix.set_insert(target_idx, profile_idx, insert_score);
                    dp_matrix.set_delete(target_idx, profile_idx, delete_score);
                }
            }
        }

        dp_matrix.finish_row(target_idx);
    }

    Ok(Nats(dp_matrix.get_special(0, Profile::SPECIAL_N_IDX)))
}

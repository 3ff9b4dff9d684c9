use crate::align::error::{check_inputs, DpError};
use crate::align::structs::{DpMatrix, EdgeBounds};
use crate::log_sum;
use crate::structs::{Profile, Sequence};

use super::Nats;

/// Sum the probability of every path through the cells inside `bounds`.
pub fn forward(
    profile: &Profile,
    target: &Sequence,
    bounds: &EdgeBounds,
    dp_matrix: &mut impl DpMatrix,
) -> Result<Nats, DpError> {
    check_inputs(profile, target, bounds, dp_matrix)?;

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
        let mut end_score = -f32::INFINITY;

        for interval in bounds.row(target_idx - 1) {
            for profile_idx in interval.dp_columns() {
                let match_score = log_sum!(
                    dp_matrix.get_match(target_idx - 1, profile_idx - 1)
                        + profile.transition_score(Profile::MATCH_TO_MATCH_IDX, profile_idx - 1),
                    dp_matrix.get_insert(target_idx - 1, profile_idx - 1)
                        + profile.transition_score(Profile::INSERT_TO_MATCH_IDX, profile_idx - 1),
                    dp_matrix.get_delete(target_idx - 1, profile_idx - 1)
                        + profile.transition_score(Profile::DELETE_TO_MATCH_IDX, profile_idx - 1),
                    dp_matrix.get_special(target_idx - 1, Profile::SPECIAL_B_IDX)
                        + profile.transition_score(Profile::BEGIN_TO_MATCH_IDX, profile_idx - 1)
                ) + profile.match_score(residue, profile_idx);

                let insert_score = log_sum!(
                    dp_matrix.get_match(target_idx - 1, profile_idx)
                        + profile.transition_score(Profile::MATCH_TO_INSERT_IDX, profile_idx),
                    dp_matrix.get_insert(target_idx - 1, profile_idx)
                        + profile.transition_score(Profile::INSERT_TO_INSERT_IDX, profile_idx)
                ) + profile.insert_score(residue, profile_idx);

                let delete_score = log_sum!(
                    dp_matrix.get_match(target_idx, profile_idx - 1)
                        + profile.transition_score(Profile::MATCH_TO_DELETE_IDX, profile_idx - 1),
                    dp_matrix.get_delete(target_idx, profile_idx - 1)
                        + profile.transition_score(Profile::DELETE_TO_DELETE_IDX, profile_idx - 1)
                );

                dp_matrix.set_match(target_idx, profile_idx, match_score);
                dp_matrix.set_insert(target_idx, profile_idx, insert_score);
                dp_matrix.set_delete(target_idx, profile_idx, delete_score);

                // M -> E and D -> E both score 0
                end_score = log_sum!(end_score, match_score, delete_score);
            }
        }

        set_forward_specials(profile, dp_matrix, target_idx, end_score);
        dp_matrix.finish_row(target_idx);
    }

    Ok(Nats(
        dp_matrix.get_special(target.length, Profile::SPECIAL_C_IDX)
            + profile.special_transition_score(Profile::SPECIAL_C_IDX, Profile::SPECIAL_MOVE_IDX),
    ))
}

/// Fill in E, J, C, N, and B for a row once its normal states are done.
#[inline]
pub(crate) fn set_forward_specials(
    profile: &Profile,
    dp_matrix: &mut impl DpMatrix,
    target_idx: usize,
    end_score: f32,
) {
    dp_matrix.set_special(target_idx, Profile::SPECIAL_E_IDX, end_score);

    dp_matrix.set_special(
        target_idx,
        Profile::SPECIAL_J_IDX,
        log_sum!(
            dp_matrix.get_special(target_idx - 1, Profile::SPECIAL_J_IDX)
                + profile.special_transition_score(
                    Profile::SPECIAL_J_IDX,
                    Profile::SPECIAL_LOOP_IDX,
                ),
            end_score
                + profile.special_transition_score(
                    Profile::SPECIAL_E_IDX,
                    Profile::SPECIAL_LOOP_IDX,
                )
        ),
    );

    dp_matrix.set_special(
        target_idx,
        Profile::SPECIAL_C_IDX,
        log_sum!(
            dp_matrix.get_special(target_idx - 1, Profile::SPECIAL_C_IDX)
                + profile.special_transition_score(
                    Profile::SPECIAL_C_IDX,
                    Profile::SPECIAL_LOOP_IDX,
                ),
            end_score
                + profile.special_transition_score(
                    Profile::SPECIAL_E_IDX,
                    Profile::SPECIAL_MOVE_IDX,
                )
        ),
    );

    dp_matrix.set_special(
        target_idx,
        Profile::SPECIAL_N_IDX,
        dp_matrix.get_special(target_idx - 1, Profile::SPECIAL_N_IDX)
            + profile.special_transition_score(Profile::SPECIAL_N_IDX, Profile::SPECIAL_LOOP_IDX),
    );

    dp_matrix.set_special(
        target_idx,
        Profile::SPECIAL_B_IDX,
        log_sum!(
            dp_matrix.get_special(target_idx, Profile::SPECIAL_N_IDX)
                + profile.special_transition_score(
                    Profile::SPECIAL_N_IDX,
                    Profile::SPECIAL_MOVE_IDX,
                ),
            dp_matrix.get_special(target_idx, Profile::SPECIAL_J_IDX)
                + profile.special_transition_score(
                    Profile::SPECIAL_J_IDX,
                    Profile::SPECIAL_MOVE_IDX,
                )
        ),
    );
}

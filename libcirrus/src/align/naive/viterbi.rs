use crate::align::error::DpError;
use crate::align::structs::{DpMatrix, DpMatrixFlat};
use crate::align::Nats;
use crate::max_f32;
use crate::structs::{Profile, Sequence};

pub fn viterbi(
    profile: &Profile,
    target: &Sequence,
    dp_matrix: &mut DpMatrixFlat,
) -> Result<Nats, DpError> {
    super::check_inputs(profile, target, dp_matrix)?;

    let special = |state_idx, transition_idx| {
        profile.special_transition_score(state_idx, transition_idx)
    };

    dp_matrix.start_pass();
    dp_matrix.set_special(0, Profile::SPECIAL_N_IDX, 0.0);
    dp_matrix.set_special(
        0,
        Profile::SPECIAL_B_IDX,
        special(Profile::SPECIAL_N_IDX, Profile::SPECIAL_MOVE_IDX),
    );

    for target_idx in 1..=target.length {
        let residue = target.residue(target_idx);
        let mut end_score = -f32::INFINITY;

        for profile_idx in 1..=profile.length {
            // match state
            dp_matrix.set_match(
                target_idx,
                profile_idx,
                max_f32!(
                    dp_matrix.get_match(target_idx - 1, profile_idx - 1)
                        + profile.transition_score(Profile::MATCH_TO_MATCH_IDX, profile_idx - 1),
                    dp_matrix.get_insert(target_idx - 1, profile_idx - 1)
                        + profile.transition_score(Profile::INSERT_TO_MATCH_IDX, profile_idx - 1),
                    dp_matrix.get_delete(target_idx - 1, profile_idx - 1)
                        + profile.transition_score(Profile::DELETE_TO_MATCH_IDX, profile_idx - 1),
                    dp_matrix.get_special(target_idx - 1, Profile::SPECIAL_B_IDX)
                        + profile.transition_score(Profile::BEGIN_TO_MATCH_IDX, profile_idx - 1)
                ) + profile.match_score(residue, profile_idx),
            );

            // insert state
            dp_matrix.set_insert(
                target_idx,
                profile_idx,
                max_f32!(
                    dp_matrix.get_match(target_idx - 1, profile_idx)
                        + profile.transition_score(Profile::MATCH_TO_INSERT_IDX, profile_idx),
                    dp_matrix.get_insert(target_idx - 1, profile_idx)
                        + profile.transition_score(Profile::INSERT_TO_INSERT_IDX, profile_idx)
                ) + profile.insert_score(residue, profile_idx),
            );

            // delete state
            dp_matrix.set_delete(
                target_idx,
                profile_idx,
                max_f32!(
                    dp_matrix.get_match(target_idx, profile_idx - 1)
                        + profile.transition_score(Profile::MATCH_TO_DELETE_IDX, profile_idx - 1),
                    dp_matrix.get_delete(target_idx, profile_idx - 1)
                        + profile.transition_score(Profile::DELETE_TO_DELETE_IDX, profile_idx - 1)
                ),
            );

            end_score = max_f32!(
                end_score,
                dp_matrix.get_match(target_idx, profile_idx),
                dp_matrix.get_delete(target_idx, profile_idx)
            );
        }

        dp_matrix.set_special(target_idx, Profile::SPECIAL_E_IDX, end_score);

        let j_score = max_f32!(
            dp_matrix.get_special(target_idx - 1, Profile::SPECIAL_J_IDX)
                + special(Profile::SPECIAL_J_IDX, Profile::SPECIAL_LOOP_IDX),
            end_score + special(Profile::SPECIAL_E_IDX, Profile::SPECIAL_LOOP_IDX)
        );
        dp_matrix.set_special(target_idx, Profile::SPECIAL_J_IDX, j_score);

        dp_matrix.set_special(
            target_idx,
            Profile::SPECIAL_C_IDX,
            max_f32!(
                dp_matrix.get_special(target_idx - 1, Profile::SPECIAL_C_IDX)
                    + special(Profile::SPECIAL_C_IDX, Profile::SPECIAL_LOOP_IDX),
                end_score + special(Profile::SPECIAL_E_IDX, Profile::SPECIAL_MOVE_IDX)
            ),
        );

        let n_score = dp_matrix.get_special(target_idx - 1, Profile::SPECIAL_N_IDX)
            + special(Profile::SPECIAL_N_IDX, Profile::SPECIAL_LOOP_IDX);
        dp_matrix.set_special(target_idx, Profile::SPECIAL_N_IDX, n_score);

        dp_matrix.set_special(
            target_idx,
            Profile::SPECIAL_B_IDX,
            max_f32!(
                n_score + special(Profile::SPECIAL_N_IDX, Profile::SPECIAL_MOVE_IDX),
                j_score + special(Profile::SPECIAL_J_IDX, Profile::SPECIAL_MOVE_IDX)
            ),
        );
    }

    Ok(Nats(
        dp_matrix.get_special(target.length, Profile::SPECIAL_C_IDX)
            + special(Profile::SPECIAL_C_IDX, Profile::SPECIAL_MOVE_IDX),
    ))
}

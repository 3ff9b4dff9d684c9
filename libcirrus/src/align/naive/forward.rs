use crate::align::error::DpError;
use crate::align::forward::set_forward_specials;
use crate::align::structs::{DpMatrix, DpMatrixFlat};
use crate::align::Nats;
use crate::log_sum;
use crate::structs::{Profile, Sequence};

pub fn forward(
    profile: &Profile,
    target: &Sequence,
    dp_matrix: &mut DpMatrixFlat,
) -> Result<Nats, DpError> {
    super::check_inputs(profile, target, dp_matrix)?;

    dp_matrix.start_pass();
    dp_matrix.set_special(0, Profile::SPECIAL_N_IDX, 0.0);
    dp_matrix.set_special(
        0,
        Profile::SPECIAL_B_IDX,
        profile.special_transition_score(Profile::SPECIAL_N_IDX, Profile::SPECIAL_MOVE_IDX),
    );

    for target_idx in 1..=target.length {
        let residue = target.residue(target_idx);
        let mut end_score = -f32::INFINITY;

        for profile_idx in 1..=profile.length {
            // match state
            dp_matrix.set_match(
                target_idx,
                profile_idx,
                log_sum!(
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
                log_sum!(
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
                log_sum!(
                    dp_matrix.get_match(target_idx, profile_idx - 1)
                        + profile.transition_score(Profile::MATCH_TO_DELETE_IDX, profile_idx - 1),
                    dp_matrix.get_delete(target_idx, profile_idx - 1)
                        + profile.transition_score(Profile::DELETE_TO_DELETE_IDX, profile_idx - 1)
                ),
            );

            end_score = log_sum!(
                end_score,
                dp_matrix.get_match(target_idx, profile_idx),
                dp_matrix.get_delete(target_idx, profile_idx)
            );
        }

        set_forward_specials(profile, dp_matrix, target_idx, end_score);
    }

    Ok(Nats(
        dp_matrix.get_special(target.length, Profile::SPECIAL_C_IDX)
            + profile.special_transition_score(Profile::SPECIAL_C_IDX, Profile::SPECIAL_MOVE_IDX),
    ))
}

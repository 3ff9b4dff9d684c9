use crate::align::error::{check_inputs, DpError};
use crate::align::structs::{DpMatrix, EdgeBounds, MatrixError};
use crate::structs::{Profile, Sequence};

fn check_retained(dp_matrix: &impl DpMatrix, seq_length: usize) -> Result<(), MatrixError> {
    match (0..=seq_length).find(|&row| !dp_matrix.is_retained(row)) {
        Some(row) => Err(MatrixError::RowDiscarded { row }),
        None => Ok(()),
    }
}

/// Decode the posterior probability that each bounded M and I cell, and the N, J,
/// and C loops, emitted the residue of its row.
///
/// Both input matrices must hold every row of a finished pass over the same `bounds`.
/// Each row of `posterior_matrix` is scaled to sum to 1 over its emitting states.
/// The returned vector holds the unscaled mass of row q at index q - 1. Every path
/// emits each residue exactly once, so the mass is 1 up to the log-sum rounding that
/// the scaling removes.
pub fn posterior(
    profile: &Profile,
    target: &Sequence,
    bounds: &EdgeBounds,
    forward_matrix: &impl DpMatrix,
    backward_matrix: &impl DpMatrix,
    posterior_matrix: &mut impl DpMatrix,
) -> Result<Vec<f32>, DpError> {
    check_inputs(profile, target, bounds, forward_matrix)?;
    check_inputs(profile, target, bounds, backward_matrix)?;
    check_inputs(profile, target, bounds, posterior_matrix)?;
    check_retained(forward_matrix, target.length)?;
    check_retained(backward_matrix, target.length)?;

    let overall_score = forward_matrix.get_special(target.length, Profile::SPECIAL_C_IDX)
        + profile.special_transition_score(Profile::SPECIAL_C_IDX, Profile::SPECIAL_MOVE_IDX);

    let decode = |score: f32| (score - overall_score).exp();

    posterior_matrix.start_pass();
    posterior_matrix.prepare_row(0);
    for special_idx in 0..Profile::NUM_SPECIAL_STATES {
        posterior_matrix.set_special(0, special_idx, 0.0);
    }
    posterior_matrix.finish_row(0);

    let mut row_mass = Vec::with_capacity(target.length);

    for target_idx in 1..=target.length {
        posterior_matrix.prepare_row(target_idx);
        let mut denominator = 0.0;

        for interval in bounds.row(target_idx - 1) {
            for profile_idx in interval.dp_columns() {
                let match_posterior = decode(
                    forward_matrix.get_match(target_idx, profile_idx)
                        + backward_matrix.get_match(target_idx, profile_idx),
                );
                let insert_posterior = decode(
                    forward_matrix.get_insert(target_idx, profile_idx)
                        + backward_matrix.get_insert(target_idx, profile_idx),
                );

                posterior_matrix.set_match(target_idx, profile_idx, match_posterior);
                posterior_matrix.set_insert(target_idx, profile_idx, insert_posterior);
                // D emits nothing
                posterior_matrix.set_delete(target_idx, profile_idx, 0.0);

                denominator += match_posterior + insert_posterior;
            }
        }

        posterior_matrix.set_special(target_idx, Profile::SPECIAL_E_IDX, 0.0);
        posterior_matrix.set_special(target_idx, Profile::SPECIAL_B_IDX, 0.0);

        for special_idx in [
            Profile::SPECIAL_N_IDX,
            Profile::SPECIAL_J_IDX,
            Profile::SPECIAL_C_IDX,
        ] {
            let loop_posterior = decode(
                forward_matrix.get_special(target_idx - 1, special_idx)
                    + profile.special_transition_score(special_idx, Profile::SPECIAL_LOOP_IDX)
                    + backward_matrix.get_special(target_idx, special_idx),
            );
            posterior_matrix.set_special(target_idx, special_idx, loop_posterior);
            denominator += loop_posterior;
        }

        row_mass.push(denominator);

        if denominator > 0.0 {
            let scale = 1.0 / denominator;

            for interval in bounds.row(target_idx - 1) {
                for profile_idx in interval.dp_columns() {
                    posterior_matrix.set_match(
                        target_idx,
                        profile_idx,
                        posterior_matrix.get_match(target_idx, profile_idx) * scale,
                    );
                    posterior_matrix.set_insert(
                        target_idx,
                        profile_idx,
                        posterior_matrix.get_insert(target_idx, profile_idx) * scale,
                    );
                }
            }

            for special_idx in [
                Profile::SPECIAL_N_IDX,
                Profile::SPECIAL_J_IDX,
                Profile::SPECIAL_C_IDX,
            ] {
                posterior_matrix.set_special(
                    target_idx,
                    special_idx,
                    posterior_matrix.get_special(target_idx, special_idx) * scale,
                );
            }
        }

        posterior_matrix.finish_row(target_idx);
    }

    Ok(row_mass)
}

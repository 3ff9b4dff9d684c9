use assert2::{check, let_assert};
use rand::SeedableRng;
use rand_pcg::Pcg64;

use super::structs::{
    BoundsError, DpMatrix, DpMatrixFlat, DpMatrixLinear, DpMatrixSparse, EdgeBounds, Interval,
    MatrixError, State, Trace, TracePointers,
};
use super::{
    backward, forward, naive, posterior, traceback, viterbi, DpError, Nats, TracebackError,
};
use crate::structs::{Profile, ProfileProbabilities, Sequence};

fn random_case(seed: u64, profile_length: usize, seq_length: usize) -> (Profile, Sequence) {
    let mut rng = Pcg64::seed_from_u64(seed);
    let profile = Profile::random(profile_length, &mut rng);
    let_assert!(Ok(target) = Sequence::random_amino(seq_length, &mut rng));
    (profile.configured_for(seq_length), target)
}

fn sparse_for(bounds: &EdgeBounds) -> DpMatrixSparse {
    let_assert!(Ok(matrix) = DpMatrixSparse::new(bounds));
    matrix
}

fn viterbi_trace(profile: &Profile, target: &Sequence, bounds: &EdgeBounds) -> (Nats, Trace) {
    let mut matrix = sparse_for(bounds);
    let_assert!(Ok(mut pointers) = TracePointers::new(bounds));
    let_assert!(Ok(score) = viterbi(profile, target, bounds, &mut matrix, Some(&mut pointers)));
    let_assert!(Ok(trace) = traceback(&pointers, bounds));
    (score, trace)
}

/// One-cell-wide bounds around every normal state the trace visits.
fn bounds_around(trace: &Trace, seq_length: usize, profile_length: usize) -> EdgeBounds {
    let mut bounds = EdgeBounds::new(seq_length, profile_length);
    let mut steps: Vec<_> = trace.steps.iter().filter(|s| s.state.is_normal()).collect();
    steps.sort_by_key(|s| (s.row, s.col));

    for step in steps {
        let_assert!(Ok(()) = bounds.push(step.row - 1, Interval::new(step.col - 1, step.col)));
    }
    bounds.normalize();
    bounds
}

#[test]
fn test_full_bounds_match_naive() {
    for seed in 0..4 {
        let (profile, target) = random_case(seed, 12, 15);
        let bounds = EdgeBounds::full(target.length, profile.length);

        let mut sparse = sparse_for(&bounds);
        let_assert!(Ok(mut flat) = DpMatrixFlat::new(target.length, profile.length));

        let_assert!(Ok(bounded) = forward(&profile, &target, &bounds, &mut sparse));
        let_assert!(Ok(reference) = naive::forward(&profile, &target, &mut flat));
        check!((bounded.value() - reference.value()).abs() < 1e-4);

        let_assert!(Ok(bounded) = viterbi(&profile, &target, &bounds, &mut sparse, None));
        let_assert!(Ok(reference) = naive::viterbi(&profile, &target, &mut flat));
        check!((bounded.value() - reference.value()).abs() < 1e-4);
    }
}

#[test]
fn test_flat_storage_runs_bounded_passes() {
    let (profile, target) = random_case(7, 9, 11);
    let bounds = EdgeBounds::full(target.length, profile.length);

    let_assert!(Ok(mut flat) = DpMatrixFlat::new(target.length, profile.length));
    let mut sparse = sparse_for(&bounds);

    let_assert!(Ok(flat_score) = forward(&profile, &target, &bounds, &mut flat));
    let_assert!(Ok(sparse_score) = forward(&profile, &target, &bounds, &mut sparse));
    check!((flat_score.value() - sparse_score.value()).abs() < 1e-5);
}

#[test]
fn test_viterbi_is_monotone_in_bounds() {
    for seed in 10..14 {
        let (profile, target) = random_case(seed, 14, 14);
        let full = EdgeBounds::full(target.length, profile.length);
        let band = EdgeBounds::diagonal_band(target.length, profile.length, 1);

        let_assert!(
            Ok(full_viterbi) = viterbi(&profile, &target, &full, &mut sparse_for(&full), None)
        );
        let_assert!(
            Ok(band_viterbi) = viterbi(&profile, &target, &band, &mut sparse_for(&band), None)
        );
        let_assert!(Ok(full_forward) = forward(&profile, &target, &full, &mut sparse_for(&full)));

        check!(band_viterbi.value() <= full_viterbi.value());
        check!(full_viterbi.value() <= full_forward.value());
    }
}

#[test]
fn test_traceback_rescores_to_viterbi() {
    for seed in 20..24 {
        let (profile, target) = random_case(seed, 10, 16);
        let bounds = EdgeBounds::diagonal_band(target.length, profile.length, 4);
        let (score, trace) = viterbi_trace(&profile, &target, &bounds);

        let_assert!(Some(first) = trace.first());
        let_assert!(Some(second) = trace.steps.get(1));
        let_assert!(Some(last) = trace.last());
        check!((first.state, first.row) == (State::T, target.length));
        check!((second.state, second.row) == (State::C, target.length));
        check!((last.state, last.row) == (State::S, 0));

        // every normal state on the path is inside the bounds
        for step in trace.steps.iter().filter(|s| s.state.is_normal()) {
            check!(bounds.contains(step.row - 1, step.col - 1));
        }

        let_assert!(Ok(rescored) = trace.score(&profile, &target));
        check!((rescored.value() - score.value()).abs() < 1e-3);
    }
}

#[test]
fn test_multi_hit_traceback() {
    let (mut profile, target) = random_case(31, 6, 20);
    profile.configure_multi_hit(true);
    let bounds = EdgeBounds::full(target.length, profile.length);

    let (score, trace) = viterbi_trace(&profile, &target, &bounds);
    let_assert!(Ok(rescored) = trace.score(&profile, &target));
    check!((rescored.value() - score.value()).abs() < 1e-3);
    check!(trace.num_domains() >= 1);

    let_assert!(Ok(forward_score) = forward(&profile, &target, &bounds, &mut sparse_for(&bounds)));
    let_assert!(
        Ok(backward_score) = backward(&profile, &target, &bounds, &mut sparse_for(&bounds))
    );
    check!((forward_score.value() - backward_score.value()).abs() < 0.1);
}

/// A profile whose match states strongly prefer the residues of `motif`.
fn motif_profile(motif: &[u8], seq_length: usize) -> Profile {
    let_assert!(Ok(digital) = Sequence::from_utf8(motif));
    let match_emissions = (1..=digital.length)
        .map(|idx| {
            let mut emissions = vec![0.01; 20];
            emissions[digital.residue(idx)] = 0.81;
            emissions
        })
        .collect();
    let probabilities = ProfileProbabilities {
        match_emissions,
        transitions: vec![[0.90, 0.05, 0.05, 0.50, 0.50, 0.50, 0.50]; digital.length + 1],
    };
    let_assert!(Ok(profile) = Profile::from_probabilities("motif", &probabilities));
    profile.configured_for(seq_length)
}

fn path_in(trace: &Trace, bounds: &EdgeBounds) -> bool {
    trace
        .steps
        .iter()
        .filter(|s| s.state.is_normal())
        .all(|s| bounds.contains(s.row - 1, s.col - 1))
}

#[test]
fn test_band_on_the_diagonal_path() {
    let profile = motif_profile(b"WCHY", 4);
    let_assert!(Ok(target) = Sequence::from_utf8(b"WCHY"));

    let full = EdgeBounds::full(4, 4);
    let band = EdgeBounds::diagonal_band(4, 4, 0);
    check!(band.num_cells() == 4);

    let (full_score, full_trace) = viterbi_trace(&profile, &target, &full);
    let (band_score, band_trace) = viterbi_trace(&profile, &target, &band);

    check!(path_in(&full_trace, &band));
    check!((band_score.value() - full_score.value()).abs() < 1e-5);
    check!(band_trace.steps == full_trace.steps);
}

#[test]
fn test_band_off_the_motif_path() {
    // the motif sits in rows 5..=8 but a radius 1 band only reaches column 4 at row 5
    let profile = motif_profile(b"WCHY", 8);
    let_assert!(Ok(target) = Sequence::from_utf8(b"AAAAWCHY"));

    let full = EdgeBounds::full(8, 4);
    let band = EdgeBounds::diagonal_band(8, 4, 1);

    let (full_score, full_trace) = viterbi_trace(&profile, &target, &full);
    let (band_score, _) = viterbi_trace(&profile, &target, &band);

    let matched: Vec<_> = full_trace
        .steps
        .iter()
        .filter(|s| s.state == State::M)
        .map(|s| (s.row, s.col))
        .collect();
    check!(matched == [(8, 4), (7, 3), (6, 2), (5, 1)]);
    check!(!path_in(&full_trace, &band));
    check!(band_score.value() < full_score.value() - 5.0);

    // bounds hugging the optimal path lose nothing
    let path_bounds = bounds_around(&full_trace, 8, 4);
    check!(path_bounds.num_cells() == 4);
    let (path_score, _) = viterbi_trace(&profile, &target, &path_bounds);
    check!((path_score.value() - full_score.value()).abs() < 1e-5);
}

#[test]
fn test_empty_middle_row() {
    let (profile, target) = random_case(41, 8, 9);
    let full = EdgeBounds::full(target.length, profile.length);

    let rows = (0..target.length)
        .map(|row| {
            if row == 4 {
                vec![]
            } else {
                vec![Interval::new(0, profile.length)]
            }
        })
        .collect();
    let_assert!(Ok(gapped) = EdgeBounds::from_rows(target.length, profile.length, rows));

    let_assert!(Ok(full_forward) = forward(&profile, &target, &full, &mut sparse_for(&full)));
    let_assert!(Ok(gapped_forward) = forward(&profile, &target, &gapped, &mut sparse_for(&gapped)));
    let_assert!(
        Ok(gapped_backward) = backward(&profile, &target, &gapped, &mut sparse_for(&gapped))
    );

    check!(gapped_forward.is_finite());
    check!(gapped_backward.is_finite());
    check!(gapped_forward.value() < full_forward.value());
    check!((gapped_forward.value() - gapped_backward.value()).abs() < 0.05);

    // the best path cannot use the empty row
    let (_, trace) = viterbi_trace(&profile, &target, &gapped);
    check!(trace.steps.iter().filter(|s| s.state.is_normal()).all(|s| s.row != 5));
}

#[test]
fn test_forward_matches_backward() {
    for (seed, radius) in [(50, 2), (51, 3), (52, 20)] {
        let (profile, target) = random_case(seed, 10, 12);
        let bounds = EdgeBounds::diagonal_band(target.length, profile.length, radius);

        let_assert!(
            Ok(forward_score) = forward(&profile, &target, &bounds, &mut sparse_for(&bounds))
        );
        let_assert!(
            Ok(backward_score) = backward(&profile, &target, &bounds, &mut sparse_for(&bounds))
        );
        check!((forward_score.value() - backward_score.value()).abs() < 0.05);
    }
}

#[test]
fn test_linear_matches_quadratic() {
    let (profile, target) = random_case(60, 11, 13);

    let mut bounds = EdgeBounds::diagonal_band(target.length, profile.length, 2);
    let mut extra = EdgeBounds::new(target.length, profile.length);
    let_assert!(Ok(()) = extra.push(6, Interval::new(10, 11)));
    let_assert!(Ok(()) = bounds.extend_from(&extra));
    bounds.normalize();

    let mut sparse = sparse_for(&bounds);
    let_assert!(Ok(mut linear) = DpMatrixLinear::with_retained_rows(&bounds, &[3, 7]));

    let_assert!(Ok(quadratic) = forward(&profile, &target, &bounds, &mut sparse));
    let_assert!(Ok(rolling) = forward(&profile, &target, &bounds, &mut linear));
    check!((quadratic.value() - rolling.value()).abs() < 1e-5);

    // checkpoint rows hold the same values as the full matrix
    for col in 1..=profile.length {
        check!(linear.get_match(7, col) == sparse.get_match(7, col));
    }
    check!(linear.try_get(State::M, 2, 2) == Err(MatrixError::RowDiscarded { row: 2 }));

    let_assert!(Ok(quadratic) = backward(&profile, &target, &bounds, &mut sparse));
    let_assert!(Ok(rolling) = backward(&profile, &target, &bounds, &mut linear));
    check!((quadratic.value() - rolling.value()).abs() < 1e-5);

    let_assert!(Ok(quadratic) = viterbi(&profile, &target, &bounds, &mut sparse, None));
    let_assert!(Ok(rolling) = viterbi(&profile, &target, &bounds, &mut linear, None));
    check!((quadratic.value() - rolling.value()).abs() < 1e-5);
}

#[test]
fn test_entry_checks() {
    let (profile, target) = random_case(70, 6, 6);
    let bounds = EdgeBounds::full(6, 6);

    let_assert!(Ok(empty) = Sequence::from_utf8(b""));
    let empty_bounds = EdgeBounds::full(0, 6);
    let mut empty_matrix = sparse_for(&empty_bounds);
    check!(
        forward(&profile, &empty, &empty_bounds, &mut empty_matrix)
            == Err(DpError::Degenerate {
                seq_length: 0,
                profile_length: 6
            })
    );

    let longer = EdgeBounds::full(7, 6);
    check!(
        forward(&profile, &target, &longer, &mut sparse_for(&longer))
            == Err(DpError::DimensionMismatch {
                what: "sequence",
                expected: 7,
                found: 6
            })
    );

    let mut touching = EdgeBounds::new(6, 6);
    let_assert!(Ok(()) = touching.push(2, Interval::new(0, 2)));
    let_assert!(Ok(()) = touching.push(2, Interval::new(2, 4)));
    let_assert!(
        Err(DpError::Bounds(BoundsError::Overlap { row: 2, .. }))
            = backward(&profile, &target, &touching, &mut sparse_for(&touching))
    );

    let band = EdgeBounds::diagonal_band(6, 6, 1);
    let_assert!(
        Err(DpError::Matrix(MatrixError::Shape { .. }))
            = viterbi(&profile, &target, &bounds, &mut sparse_for(&band), None)
    );

    let_assert!(Ok(mut pointers) = TracePointers::new(&band));
    let_assert!(
        Err(DpError::Matrix(MatrixError::Shape { .. }))
            = viterbi(&profile, &target, &bounds, &mut sparse_for(&bounds), Some(&mut pointers))
    );
}

#[test]
fn test_traceback_without_pass_is_broken() {
    let bounds = EdgeBounds::full(4, 4);
    let_assert!(Ok(pointers) = TracePointers::new(&bounds));

    check!(
        traceback(&pointers, &bounds)
            == Err(TracebackError::BrokenChain {
                state: State::C,
                row: 4,
                col: 0
            })
    );
    let_assert!(
        Err(TracebackError::Matrix(MatrixError::Shape { .. }))
            = traceback(&pointers, &EdgeBounds::full(5, 4))
    );
}

#[test]
fn test_matrix_reuse_across_tasks() {
    let mut matrix = DpMatrixSparse::default();

    for seed in 80..83 {
        let (profile, target) = random_case(seed, 7 + seed as usize % 3, 9);
        let bounds = EdgeBounds::diagonal_band(target.length, profile.length, 2);
        let_assert!(Ok(()) = matrix.reuse(&bounds));

        let_assert!(Ok(reused) = forward(&profile, &target, &bounds, &mut matrix));
        let_assert!(Ok(fresh) = forward(&profile, &target, &bounds, &mut sparse_for(&bounds)));
        check!(reused == fresh);
        check!(matrix.core_data().len() == 3 * bounds.num_cells());
    }
}

/// Forward, backward, and posterior over the same bounds, in sparse storage.
fn decode(
    profile: &Profile,
    target: &Sequence,
    bounds: &EdgeBounds,
) -> (DpMatrixSparse, Vec<f32>) {
    let mut forward_matrix = sparse_for(bounds);
    let mut backward_matrix = sparse_for(bounds);
    let mut posterior_matrix = sparse_for(bounds);

    let_assert!(Ok(_) = forward(profile, target, bounds, &mut forward_matrix));
    let_assert!(Ok(_) = backward(profile, target, bounds, &mut backward_matrix));
    let_assert!(
        Ok(row_mass) = posterior(
            profile,
            target,
            bounds,
            &forward_matrix,
            &backward_matrix,
            &mut posterior_matrix,
        )
    );
    (posterior_matrix, row_mass)
}

fn decoded_row_sum(posterior_matrix: &DpMatrixSparse, bounds: &EdgeBounds, row: usize) -> f32 {
    let normal: f32 = bounds
        .row(row - 1)
        .iter()
        .flat_map(|interval| interval.dp_columns())
        .map(|col| posterior_matrix.get_match(row, col) + posterior_matrix.get_insert(row, col))
        .sum();
    normal
        + posterior_matrix.get_special(row, Profile::SPECIAL_N_IDX)
        + posterior_matrix.get_special(row, Profile::SPECIAL_J_IDX)
        + posterior_matrix.get_special(row, Profile::SPECIAL_C_IDX)
}

#[test]
fn test_posterior_rows_sum_to_one() {
    for seed in 80..83 {
        let (profile, target) = random_case(seed, 9, 12);
        let bounds = EdgeBounds::full(target.length, profile.length);
        let (posterior_matrix, row_mass) = decode(&profile, &target, &bounds);

        check!(row_mass.len() == target.length);
        for (row_idx, mass) in row_mass.iter().enumerate() {
            // every residue is emitted by exactly one state
            check!(mass.ln().abs() < 0.05);
            check!((decoded_row_sum(&posterior_matrix, &bounds, row_idx + 1) - 1.0).abs() < 1e-4);
        }

        for row in 1..=target.length {
            for col in 1..=profile.length {
                check!(posterior_matrix.get_delete(row, col) == 0.0);
                check!((0.0..=1.0 + 1e-4).contains(&posterior_matrix.get_match(row, col)));
            }
        }
    }
}

#[test]
fn test_posterior_follows_the_motif() {
    let profile = motif_profile(b"WCHY", 8);
    let_assert!(Ok(target) = Sequence::from_utf8(b"AAAAWCHY"));
    let bounds = EdgeBounds::full(8, 4);
    let (posterior_matrix, _) = decode(&profile, &target, &bounds);

    for (row, col) in [(5, 1), (6, 2), (7, 3), (8, 4)] {
        check!(posterior_matrix.get_match(row, col) > 0.5);
    }
    check!(posterior_matrix.get_special(2, Profile::SPECIAL_N_IDX) > 0.5);
}

#[test]
fn test_posterior_under_pruned_bounds() {
    let profile = motif_profile(b"WCHY", 8);
    let_assert!(Ok(target) = Sequence::from_utf8(b"AAAAWCHY"));
    let band = EdgeBounds::diagonal_band(8, 4, 1);
    let (posterior_matrix, row_mass) = decode(&profile, &target, &band);

    // posteriors are relative to the paths the bounds keep
    check!(row_mass.iter().all(|mass| mass.ln().abs() < 0.05));
    for row in 1..=8 {
        check!((decoded_row_sum(&posterior_matrix, &band, row) - 1.0).abs() < 1e-4);
    }

    // rows 6..=8 have no bounded cells, so only the loops can emit them
    check!(band.row(7).is_empty());
    let loops = posterior_matrix.get_special(8, Profile::SPECIAL_N_IDX)
        + posterior_matrix.get_special(8, Profile::SPECIAL_J_IDX)
        + posterior_matrix.get_special(8, Profile::SPECIAL_C_IDX);
    check!((loops - 1.0).abs() < 1e-4);
}

#[test]
fn test_posterior_needs_every_row() {
    let (profile, target) = random_case(90, 6, 8);
    let bounds = EdgeBounds::full(target.length, profile.length);

    let_assert!(Ok(mut linear) = DpMatrixLinear::new(&bounds));
    let mut backward_matrix = sparse_for(&bounds);
    let mut posterior_matrix = sparse_for(&bounds);
    let_assert!(Ok(_) = forward(&profile, &target, &bounds, &mut linear));
    let_assert!(Ok(_) = backward(&profile, &target, &bounds, &mut backward_matrix));

    let_assert!(
        Err(DpError::Matrix(MatrixError::RowDiscarded { .. })) = posterior(
            &profile,
            &target,
            &bounds,
            &linear,
            &backward_matrix,
            &mut posterior_matrix,
        )
    );
}

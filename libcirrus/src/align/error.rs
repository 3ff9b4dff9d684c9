use thiserror::Error;

use crate::align::structs::{BoundsError, DpMatrix, EdgeBounds, MatrixError, State};
use crate::structs::{Profile, Sequence};
use crate::util::logsum_initialized;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DpError {
    #[error("the log-sum table is not initialized, call init_logsum() first")]
    LogsumUninitialized,
    #[error("nothing to align: sequence length {seq_length}, profile length {profile_length}")]
    Degenerate {
        seq_length: usize,
        profile_length: usize,
    },
    #[error("{what} length is {found}, but the bounds were built for {expected}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("malformed bounds: {0}")]
    Bounds(#[from] BoundsError),
    #[error(transparent)]
    Matrix(#[from] MatrixError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TracebackError {
    #[error("traceback chain is broken at {state} ({row}, {col})")]
    BrokenChain { state: State, row: usize, col: usize },
    #[error(transparent)]
    Matrix(#[from] MatrixError),
}

/// The checks every bounded pass runs before touching the matrix.
pub(crate) fn check_inputs(
    profile: &Profile,
    target: &Sequence,
    bounds: &EdgeBounds,
    dp_matrix: &impl DpMatrix,
) -> Result<(), DpError> {
    check_dimensions(profile, target, bounds)?;

    if !dp_matrix.matches_bounds(bounds) {
        return Err(MatrixError::Shape {
            expected: (bounds.seq_length, bounds.profile_length),
            found: (dp_matrix.seq_length(), dp_matrix.profile_length()),
        }
        .into());
    }

    Ok(())
}

pub(crate) fn check_dimensions(
    profile: &Profile,
    target: &Sequence,
    bounds: &EdgeBounds,
) -> Result<(), DpError> {
    if !logsum_initialized() {
        return Err(DpError::LogsumUninitialized);
    }

    if target.length == 0 || profile.length == 0 {
        return Err(DpError::Degenerate {
            seq_length: target.length,
            profile_length: profile.length,
        });
    }

    if target.length != bounds.seq_length {
        return Err(DpError::DimensionMismatch {
            what: "sequence",
            expected: bounds.seq_length,
            found: target.length,
        });
    }

    if profile.length != bounds.profile_length {
        return Err(DpError::DimensionMismatch {
            what: "profile",
            expected: bounds.profile_length,
            found: profile.length,
        });
    }

    bounds.validate()?;
    Ok(())
}

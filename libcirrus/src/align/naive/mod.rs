//! Dense reference recurrences that visit every cell of the matrix.
//!
//! These ignore bounds entirely and exist to check the bounded passes.

mod forward;
pub use forward::forward;

mod viterbi;
pub use viterbi::viterbi;

use crate::align::error::DpError;
use crate::align::structs::{DpMatrix, DpMatrixFlat, MatrixError};
use crate::structs::{Profile, Sequence};
use crate::util::logsum_initialized;

fn check_inputs(
    profile: &Profile,
    target: &Sequence,
    dp_matrix: &DpMatrixFlat,
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

    if (dp_matrix.seq_length(), dp_matrix.profile_length()) != (target.length, profile.length) {
        return Err(MatrixError::Shape {
            expected: (target.length, profile.length),
            found: (dp_matrix.seq_length(), dp_matrix.profile_length()),
        }
        .into());
    }

    Ok(())
}

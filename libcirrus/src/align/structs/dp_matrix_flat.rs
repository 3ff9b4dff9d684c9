use super::dp_matrix::{allocate, MatrixError, CELL_WIDTH};
use super::{DpMatrix, EdgeBounds};
use crate::structs::Profile;

/// A dense matrix over every (row, column) pair, used for unbounded passes.
#[derive(Default, Clone)]
pub struct DpMatrixFlat {
    pub seq_length: usize,
    pub profile_length: usize,
    /// The DP matrix core model data cells as a flat vector.
    //
    // the data is stored in the following pattern:
    //     [
    //         m_(0, 0), i_(0, 0), d_(0, 0),
    //         ...
    //         m_(0, T+1), i_(0, T+1), d_(0, T+1),
    //         ...
    //         m_(Q, T+1), i_(Q, T+1), d_(Q, T+1)
    //     ]
    //
    // column T + 1 is a pad column that is never written
    pub core_data: Vec<f32>,
    /// The special state cells, 5 per row, in the order E, N, J, B, C.
    pub special_data: Vec<f32>,
}

impl DpMatrixFlat {
    pub fn new(seq_length: usize, profile_length: usize) -> Result<Self, MatrixError> {
        let mut matrix = DpMatrixFlat::default();
        matrix.reuse(seq_length, profile_length)?;
        Ok(matrix)
    }

    pub fn reuse(&mut self, seq_length: usize, profile_length: usize) -> Result<(), MatrixError> {
        self.seq_length = seq_length;
        self.profile_length = profile_length;
        allocate(
            &mut self.core_data,
            CELL_WIDTH * (seq_length + 1) * (profile_length + 2),
        )?;
        allocate(
            &mut self.special_data,
            Profile::NUM_SPECIAL_STATES * (seq_length + 1),
        )
    }

    #[inline(always)]
    fn row_width(&self) -> usize {
        CELL_WIDTH * (self.profile_length + 2)
    }
}

impl DpMatrix for DpMatrixFlat {
    fn seq_length(&self) -> usize {
        self.seq_length
    }

    fn profile_length(&self) -> usize {
        self.profile_length
    }

    fn start_pass(&mut self) {
        self.core_data.fill(-f32::INFINITY);
        self.special_data.fill(-f32::INFINITY);
    }

    #[inline]
    fn cell_offset(&self, row: usize, col: usize) -> Option<usize> {
        (row <= self.seq_length && col <= self.profile_length + 1)
            .then(|| row * self.row_width() + CELL_WIDTH * col)
    }

    fn in_bounds(&self, row: usize, col: usize) -> bool {
        row <= self.seq_length && col <= self.profile_length
    }

    fn matches_bounds(&self, bounds: &EdgeBounds) -> bool {
        self.seq_length == bounds.seq_length && self.profile_length == bounds.profile_length
    }

    fn core_data(&self) -> &[f32] {
        &self.core_data
    }

    fn core_data_mut(&mut self) -> &mut [f32] {
        &mut self.core_data
    }

    #[inline]
    fn get_special(&self, row: usize, special_idx: usize) -> f32 {
        debug_assert!(row <= self.seq_length);
        debug_assert!(special_idx < Profile::NUM_SPECIAL_STATES);
        self.special_data[row * Profile::NUM_SPECIAL_STATES + special_idx]
    }

    #[inline]
    fn set_special(&mut self, row: usize, special_idx: usize, value: f32) {
        debug_assert!(row <= self.seq_length);
        debug_assert!(special_idx < Profile::NUM_SPECIAL_STATES);
        self.special_data[row * Profile::NUM_SPECIAL_STATES + special_idx] = value;
    }
}

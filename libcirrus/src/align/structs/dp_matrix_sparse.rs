use super::dp_matrix::{allocate, MatrixError, CELL_WIDTH};
use super::{DpMatrix, EdgeBounds, SparseLayout};
use crate::structs::Profile;

/// Quadratic-space storage: every bounded cell of every row is kept, so any
/// previously computed cell can be read back (e.g. during traceback).
#[derive(Default, Clone)]
pub struct DpMatrixSparse {
    /// Maps (row, column) to a cell in `core_data`.
    pub layout: SparseLayout,
    /// The bounded cells, as (match, insert, delete) triples in row-major order.
    pub core_data: Vec<f32>,
    /// The special state cells, 5 per row, in the order E, N, J, B, C.
    pub special_data: Vec<f32>,
}

impl DpMatrixSparse {
    pub fn new(bounds: &EdgeBounds) -> Result<Self, MatrixError> {
        let mut matrix = DpMatrixSparse::default();
        matrix.reuse(bounds)?;
        Ok(matrix)
    }

    /// Reshape the matrix for a new set of bounds, reusing its allocation when it is large enough.
    pub fn reuse(&mut self, bounds: &EdgeBounds) -> Result<(), MatrixError> {
        self.layout.reuse(bounds);
        allocate(&mut self.core_data, CELL_WIDTH * self.layout.num_cells())?;
        allocate(
            &mut self.special_data,
            Profile::NUM_SPECIAL_STATES * (bounds.seq_length + 1),
        )
    }

    pub fn num_cells(&self) -> usize {
        self.layout.num_cells()
    }
}

impl DpMatrix for DpMatrixSparse {
    fn seq_length(&self) -> usize {
        self.layout.seq_length
    }

    fn profile_length(&self) -> usize {
        self.layout.profile_length
    }

    fn start_pass(&mut self) {
        self.core_data.fill(-f32::INFINITY);
        self.special_data.fill(-f32::INFINITY);
    }

    #[inline]
    fn cell_offset(&self, row: usize, col: usize) -> Option<usize> {
        self.layout
            .cell_idx(row, col)
            .map(|cell_idx| cell_idx * CELL_WIDTH)
    }

    fn in_bounds(&self, row: usize, col: usize) -> bool {
        self.layout.cell_idx(row, col).is_some()
    }

    fn matches_bounds(&self, bounds: &EdgeBounds) -> bool {
        self.layout.matches(bounds)
    }

    fn core_data(&self) -> &[f32] {
        &self.core_data
    }

    fn core_data_mut(&mut self) -> &mut [f32] {
        &mut self.core_data
    }

    #[inline]
    fn get_special(&self, row: usize, special_idx: usize) -> f32 {
        debug_assert!(special_idx < Profile::NUM_SPECIAL_STATES);
        self.special_data[row * Profile::NUM_SPECIAL_STATES + special_idx]
    }

    #[inline]
    fn set_special(&mut self, row: usize, special_idx: usize, value: f32) {
        debug_assert!(special_idx < Profile::NUM_SPECIAL_STATES);
        self.special_data[row * Profile::NUM_SPECIAL_STATES + special_idx] = value;
    }
}

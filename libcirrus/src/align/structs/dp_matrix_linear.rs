use super::dp_matrix::{allocate, MatrixError, CELL_WIDTH};
use super::{DpMatrix, EdgeBounds, SparseLayout};
use crate::structs::Profile;

/// Linear-space storage: only the row being computed and the row before it
/// (in the direction of the pass) are kept, plus any requested checkpoint rows.
///
/// Row slots are dense over the profile, so a slot is cleared only over the
/// span of columns its previous row wrote.
#[derive(Default, Clone)]
pub struct DpMatrixLinear {
    layout: SparseLayout,
    /// The row each rolling slot currently holds.
    slot_rows: [Option<usize>; 2],
    /// The DP column span each slot has written since it was last cleared.
    slot_spans: [Option<(usize, usize)>; 2],
    /// The checkpoint index of every row, if the row is retained.
    checkpoints: Vec<Option<usize>>,
    retained_rows: Vec<usize>,
    /// Two rolling row slots followed by the checkpoint rows.
    core_data: Vec<f32>,
    /// The special state cells, 5 per row, in the order E, N, J, B, C.
    special_data: Vec<f32>,
}

impl DpMatrixLinear {
    pub fn new(bounds: &EdgeBounds) -> Result<Self, MatrixError> {
        let mut matrix = DpMatrixLinear::default();
        matrix.reuse(bounds)?;
        Ok(matrix)
    }

    /// Keep the given rows after the pass moves past them.
    pub fn with_retained_rows(
        bounds: &EdgeBounds,
        rows: &[usize],
    ) -> Result<Self, MatrixError> {
        let mut matrix = DpMatrixLinear {
            retained_rows: rows.to_vec(),
            ..Default::default()
        };
        matrix.reuse(bounds)?;
        Ok(matrix)
    }

    pub fn reuse(&mut self, bounds: &EdgeBounds) -> Result<(), MatrixError> {
        self.layout.reuse(bounds);

        self.checkpoints.clear();
        self.checkpoints.resize(bounds.seq_length + 1, None);

        self.retained_rows.sort_unstable();
        self.retained_rows.dedup();
        self.retained_rows.retain(|&row| row <= bounds.seq_length);

        for (checkpoint_idx, &row) in self.retained_rows.iter().enumerate() {
            self.checkpoints[row] = Some(checkpoint_idx);
        }

        let core_len = (2 + self.retained_rows.len())
            .checked_mul(self.row_width())
            .ok_or(MatrixError::Allocation { bytes: usize::MAX })?;
        allocate(&mut self.core_data, core_len)?;
        allocate(
            &mut self.special_data,
            Profile::NUM_SPECIAL_STATES * (bounds.seq_length + 1),
        )?;

        self.slot_rows = [None; 2];
        self.slot_spans = [None; 2];
        Ok(())
    }

    pub fn retained_rows(&self) -> &[usize] {
        &self.retained_rows
    }

    /// The number of values stored per row, including a pad column.
    #[inline(always)]
    fn row_width(&self) -> usize {
        CELL_WIDTH * (self.layout.profile_length + 2)
    }

    #[inline(always)]
    fn slot_base(&self, row: usize) -> Option<usize> {
        let slot = row % 2;
        if self.slot_rows[slot] == Some(row) {
            return Some(slot * self.row_width());
        }

        self.checkpoints
            .get(row)
            .copied()
            .flatten()
            .map(|checkpoint_idx| (2 + checkpoint_idx) * self.row_width())
    }
}

impl DpMatrix for DpMatrixLinear {
    fn seq_length(&self) -> usize {
        self.layout.seq_length
    }

    fn profile_length(&self) -> usize {
        self.layout.profile_length
    }

    fn start_pass(&mut self) {
        self.core_data.fill(-f32::INFINITY);
        self.special_data.fill(-f32::INFINITY);
        self.slot_rows = [None; 2];
        self.slot_spans = [None; 2];
    }

    fn prepare_row(&mut self, row: usize) {
        let slot = row % 2;
        let base = slot * self.row_width();

        if let Some((start, end)) = self.slot_spans[slot].take() {
            self.core_data[base + CELL_WIDTH * start..base + CELL_WIDTH * end]
                .fill(-f32::INFINITY);
        }

        let segments = self.layout.row_segments(row);
        self.slot_spans[slot] = segments
            .first()
            .zip(segments.last())
            .map(|(first, last)| (first.start, last.end));
        self.slot_rows[slot] = Some(row);
    }

    fn finish_row(&mut self, row: usize) {
        if let Some(checkpoint_idx) = self.checkpoints.get(row).copied().flatten() {
            let width = self.row_width();
            let source = (row % 2) * width;
            let target = (2 + checkpoint_idx) * width;
            self.core_data.copy_within(source..source + width, target);
        }
    }

    #[inline]
    fn cell_offset(&self, row: usize, col: usize) -> Option<usize> {
        if col > self.layout.profile_length + 1 {
            return None;
        }
        self.slot_base(row).map(|base| base + CELL_WIDTH * col)
    }

    fn in_bounds(&self, row: usize, col: usize) -> bool {
        self.layout.cell_idx(row, col).is_some()
    }

    fn is_retained(&self, row: usize) -> bool {
        self.slot_base(row).is_some()
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::structs::State;
    use assert2::{check, let_assert};

    fn fill_row(matrix: &mut DpMatrixLinear, bounds: &EdgeBounds, row: usize) {
        matrix.prepare_row(row);
        for interval in bounds.row(row - 1) {
            for col in interval.dp_columns() {
                matrix.set_match(row, col, (row * 100 + col) as f32);
            }
        }
        matrix.finish_row(row);
    }

    #[test]
    fn test_linear_rolls_rows() {
        let bounds = EdgeBounds::diagonal_band(6, 6, 1);
        let_assert!(Ok(mut matrix) = DpMatrixLinear::new(&bounds));
        matrix.start_pass();

        for row in 1..=4 {
            fill_row(&mut matrix, &bounds, row);
        }

        check!(matrix.try_get(State::M, 4, 4) == Ok(404.0));
        check!(matrix.try_get(State::M, 3, 2) == Ok(302.0));
        check!(matrix.try_get(State::M, 2, 2) == Err(MatrixError::RowDiscarded { row: 2 }));
        check!(matrix.get_match(2, 2) == -f32::INFINITY);
        // columns outside the band are -inf, and a checked read of them fails
        check!(matrix.get_match(4, 1) == -f32::INFINITY);
        check!(matrix.try_get(State::M, 4, 1).is_err());
    }

    #[test]
    fn test_linear_clears_stale_cells() {
        let mut bounds = EdgeBounds::new(3, 6);
        let_assert!(Ok(()) = bounds.push(0, super::super::Interval::new(0, 6)));
        let_assert!(Ok(()) = bounds.push(2, super::super::Interval::new(4, 6)));
        let_assert!(Ok(mut matrix) = DpMatrixLinear::new(&bounds));
        matrix.start_pass();

        fill_row(&mut matrix, &bounds, 1);
        fill_row(&mut matrix, &bounds, 2);
        fill_row(&mut matrix, &bounds, 3);

        // row 3 reuses row 1's slot, and only columns 5 and 6 were rewritten
        check!(matrix.get_match(3, 2) == -f32::INFINITY);
        check!(matrix.get_match(3, 5) == 305.0);
    }

    #[test]
    fn test_linear_checkpoints() {
        let bounds = EdgeBounds::full(5, 3);
        let_assert!(Ok(mut matrix) = DpMatrixLinear::with_retained_rows(&bounds, &[2, 9]));
        check!(matrix.retained_rows() == [2]);
        matrix.start_pass();

        for row in 1..=5 {
            fill_row(&mut matrix, &bounds, row);
        }

        check!(matrix.try_get(State::M, 2, 3) == Ok(203.0));
        check!(matrix.try_get(State::M, 1, 3) == Err(MatrixError::RowDiscarded { row: 1 }));
        check!(matrix.try_get(State::M, 5, 1) == Ok(501.0));
    }
}

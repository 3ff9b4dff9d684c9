use super::dp_matrix::{state_offset, MatrixError, CELL_WIDTH};
use super::{EdgeBounds, SparseLayout, State};
use crate::structs::Profile;

/// Viterbi backpointers over the bounded cells of a pass.
///
/// Each normal cell stores the state it was reached from, packed as a
/// `State` code. Special states store their own predecessors per row, and
/// the E state remembers which (state, column) it was maximized over.
#[derive(Default, Clone)]
pub struct TracePointers {
    layout: SparseLayout,
    core_data: Vec<u8>,
    special_data: Vec<u8>,
    end_sources: Vec<Option<(State, usize)>>,
}

impl TracePointers {
    pub fn new(bounds: &EdgeBounds) -> Result<Self, MatrixError> {
        let mut pointers = TracePointers::default();
        pointers.reuse(bounds)?;
        Ok(pointers)
    }

    pub fn reuse(&mut self, bounds: &EdgeBounds) -> Result<(), MatrixError> {
        self.layout.reuse(bounds);

        let core_len = CELL_WIDTH * self.layout.num_cells();
        let special_len = Profile::NUM_SPECIAL_STATES * (bounds.seq_length + 1);

        self.core_data.clear();
        self.core_data
            .try_reserve_exact(core_len)
            .map_err(|_| MatrixError::Allocation { bytes: core_len })?;
        self.core_data.resize(core_len, State::NONE);

        self.special_data.clear();
        self.special_data.resize(special_len, State::NONE);

        self.end_sources.clear();
        self.end_sources.resize(bounds.seq_length + 1, None);
        Ok(())
    }

    pub fn seq_length(&self) -> usize {
        self.layout.seq_length
    }

    pub fn profile_length(&self) -> usize {
        self.layout.profile_length
    }

    pub fn start_pass(&mut self) {
        self.core_data.fill(State::NONE);
        self.special_data.fill(State::NONE);
        self.end_sources.fill(None);
    }

    pub fn matches_bounds(&self, bounds: &EdgeBounds) -> bool {
        self.layout.matches(bounds)
    }

    pub fn in_bounds(&self, row: usize, col: usize) -> bool {
        self.layout.cell_idx(row, col).is_some()
    }

    /// The state that `state` at (row, col) was reached from.
    #[inline]
    pub fn get(&self, state: State, row: usize, col: usize) -> Option<State> {
        let offset = state_offset(state).ok()?;
        let cell_idx = self.layout.cell_idx(row, col)?;
        State::from_code(self.core_data[cell_idx * CELL_WIDTH + offset])
    }

    #[inline]
    pub fn set(&mut self, state: State, row: usize, col: usize, from: State) {
        match (state_offset(state), self.layout.cell_idx(row, col)) {
            (Ok(offset), Some(cell_idx)) => {
                self.core_data[cell_idx * CELL_WIDTH + offset] = from.code()
            }
            _ => debug_assert!(false, "pointer write to unstored cell {state} ({row}, {col})"),
        }
    }

    #[inline]
    pub fn get_special(&self, row: usize, special_idx: usize) -> Option<State> {
        self.special_data
            .get(row * Profile::NUM_SPECIAL_STATES + special_idx)
            .copied()
            .and_then(State::from_code)
    }

    #[inline]
    pub fn set_special(&mut self, row: usize, special_idx: usize, from: State) {
        debug_assert!(special_idx < Profile::NUM_SPECIAL_STATES);
        self.special_data[row * Profile::NUM_SPECIAL_STATES + special_idx] = from.code();
    }

    /// The normal state and column the E state at `row` was entered from.
    pub fn end_source(&self, row: usize) -> Option<(State, usize)> {
        self.end_sources.get(row).copied().flatten()
    }

    pub fn set_end_source(&mut self, row: usize, state: State, col: usize) {
        self.end_sources[row] = Some((state, col));
    }
}

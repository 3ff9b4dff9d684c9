use std::io::Write;

use anyhow::Result;
use thiserror::Error;

use crate::structs::Profile;

use super::{EdgeBounds, State};

pub const MATCH_OFFSET: usize = 0;
pub const INSERT_OFFSET: usize = 1;
pub const DELETE_OFFSET: usize = 2;
/// The number of normal state values stored per cell.
pub const CELL_WIDTH: usize = 3;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatrixError {
    #[error("read of {state:?} at ({row}, {col}) is outside the bounded storage")]
    OutOfBounds { state: State, row: usize, col: usize },
    #[error("row {row} is no longer retained by the matrix")]
    RowDiscarded { row: usize },
    #[error("{state:?} is not a normal state")]
    NotNormal { state: State },
    #[error("failed to allocate {bytes} bytes of matrix storage")]
    Allocation { bytes: usize },
    #[error("matrix is shaped for {found:?} (seq x profile) but the bounds are {expected:?}")]
    Shape {
        expected: (usize, usize),
        found: (usize, usize),
    },
}

#[inline]
pub fn state_offset(state: State) -> Result<usize, MatrixError> {
    match state {
        State::M => Ok(MATCH_OFFSET),
        State::I => Ok(INSERT_OFFSET),
        State::D => Ok(DELETE_OFFSET),
        _ => Err(MatrixError::NotNormal { state }),
    }
}

/// Storage for the normal (M, I, D) and special (E, N, J, B, C) state scores of a DP pass.
///
/// Rows are sequence positions 0..=Q and columns are profile positions 0..=T. Normal
/// state cells that the matrix does not store read as -inf.
pub trait DpMatrix {
    fn seq_length(&self) -> usize;
    fn profile_length(&self) -> usize;

    /// Reset every stored value to -inf.
    fn start_pass(&mut self);

    /// Called before any cell of `row` is written.
    fn prepare_row(&mut self, _row: usize) {}

    /// Called after every cell of `row` has been written.
    fn finish_row(&mut self, _row: usize) {}

    /// The index into `core_data()` of the match value at (row, col).
    fn cell_offset(&self, row: usize, col: usize) -> Option<usize>;

    /// Whether (row, col) lies inside the region the matrix was built for.
    fn in_bounds(&self, row: usize, col: usize) -> bool;

    /// Whether the normal state values of `row` are still held.
    fn is_retained(&self, _row: usize) -> bool {
        true
    }

    fn matches_bounds(&self, bounds: &EdgeBounds) -> bool;

    fn core_data(&self) -> &[f32];
    fn core_data_mut(&mut self) -> &mut [f32];

    fn get_special(&self, row: usize, special_idx: usize) -> f32;
    fn set_special(&mut self, row: usize, special_idx: usize, value: f32);

    #[inline]
    fn get_match(&self, row: usize, col: usize) -> f32 {
        self.get_state(row, col, MATCH_OFFSET)
    }

    #[inline]
    fn set_match(&mut self, row: usize, col: usize, value: f32) {
        self.set_state(row, col, MATCH_OFFSET, value)
    }

    #[inline]
    fn get_insert(&self, row: usize, col: usize) -> f32 {
        self.get_state(row, col, INSERT_OFFSET)
    }

    #[inline]
    fn set_insert(&mut self, row: usize, col: usize, value: f32) {
        self.set_state(row, col, INSERT_OFFSET, value)
    }

    #[inline]
    fn get_delete(&self, row: usize, col: usize) -> f32 {
        self.get_state(row, col, DELETE_OFFSET)
    }

    #[inline]
    fn set_delete(&mut self, row: usize, col: usize, value: f32) {
        self.set_state(row, col, DELETE_OFFSET, value)
    }

    #[inline(always)]
    fn get_state(&self, row: usize, col: usize, offset: usize) -> f32 {
        match self.cell_offset(row, col) {
            Some(idx) => self.core_data()[idx + offset],
            None => -f32::INFINITY,
        }
    }

    #[inline(always)]
    fn set_state(&mut self, row: usize, col: usize, offset: usize, value: f32) {
        match self.cell_offset(row, col) {
            Some(idx) => self.core_data_mut()[idx + offset] = value,
            None => debug_assert!(false, "write to unstored cell ({row}, {col})"),
        }
    }

    /// A checked read that fails for any cell outside the bounds or in a discarded row.
    fn try_get(&self, state: State, row: usize, col: usize) -> Result<f32, MatrixError> {
        let offset = state_offset(state)?;

        if row > self.seq_length() || col > self.profile_length() {
            return Err(MatrixError::OutOfBounds { state, row, col });
        }

        if !self.is_retained(row) {
            return Err(MatrixError::RowDiscarded { row });
        }

        if !self.in_bounds(row, col) {
            return Err(MatrixError::OutOfBounds { state, row, col });
        }

        self.cell_offset(row, col)
            .map(|idx| self.core_data()[idx + offset])
            .ok_or(MatrixError::OutOfBounds { state, row, col })
    }

    fn dump(&self, out: &mut impl Write) -> Result<()>
    where
        Self: Sized,
    {
        let row_idx_width = self.seq_length().to_string().len();
        let first_column_width = row_idx_width + 3;
        let column_width = 13;
        let precision = 3;

        // write the profile indices
        write!(out, "{}", " ".repeat(first_column_width - 1))?;
        for col in 0..=self.profile_length() {
            write!(out, "{:w$} ", col, w = column_width)?;
        }

        for name in Profile::SPECIAL_STATE_IDX_TO_NAME {
            write!(out, "{:>w$} ", name, w = column_width)?;
        }
        writeln!(out)?;

        write!(out, "{}", " ".repeat(first_column_width))?;
        for _ in 0..=self.profile_length() + Profile::NUM_SPECIAL_STATES {
            write!(out, "   {} ", "-".repeat(column_width - 3))?;
        }
        writeln!(out)?;

        for row in 0..=self.seq_length() {
            for (label, offset) in [("M", MATCH_OFFSET), ("I", INSERT_OFFSET), ("D", DELETE_OFFSET)]
            {
                write!(out, "{:w$} {} ", row, label, w = row_idx_width)?;
                for col in 0..=self.profile_length() {
                    write!(
                        out,
                        "{:w$.p$} ",
                        self.get_state(row, col, offset),
                        w = column_width,
                        p = precision
                    )?;
                }

                // the special states go on the match line
                if offset == MATCH_OFFSET {
                    for special_idx in 0..Profile::NUM_SPECIAL_STATES {
                        write!(
                            out,
                            "{:w$.p$} ",
                            self.get_special(row, special_idx),
                            w = column_width,
                            p = precision
                        )?;
                    }
                }
                writeln!(out)?;
            }
            writeln!(out)?;
        }

        Ok(())
    }
}

/// Reserve exactly `len` values in `data` and fill them with -inf, reporting allocation failure.
pub(crate) fn allocate(data: &mut Vec<f32>, len: usize) -> Result<(), MatrixError> {
    data.clear();
    data.try_reserve_exact(len)
        .map_err(|_| MatrixError::Allocation {
            bytes: len.saturating_mul(std::mem::size_of::<f32>()),
        })?;
    data.resize(len, -f32::INFINITY);
    Ok(())
}

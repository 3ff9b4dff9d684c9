use std::fmt::{Debug, Display, Formatter};
use std::io::Write;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A half-open interval of profile positions, `[left, right)`.
///
/// Profile position `p` is DP column `p + 1`, so the interval covers
/// the DP columns `left + 1..=right`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "(usize, usize)", into = "(usize, usize)")]
pub struct Interval {
    pub left: usize,
    pub right: usize,
}

impl Interval {
    pub fn new(left: usize, right: usize) -> Self {
        Interval { left, right }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.right.saturating_sub(self.left)
    }

    #[inline]
    pub fn contains(&self, col: usize) -> bool {
        self.left <= col && col < self.right
    }

    /// The DP columns the interval covers.
    #[inline]
    pub fn dp_columns(&self) -> std::ops::RangeInclusive<usize> {
        self.left + 1..=self.right
    }
}

impl From<(usize, usize)> for Interval {
    fn from((left, right): (usize, usize)) -> Self {
        Interval { left, right }
    }
}

impl From<Interval> for (usize, usize) {
    fn from(interval: Interval) -> Self {
        (interval.left, interval.right)
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.left, self.right)
    }
}

impl Debug for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BoundsError {
    #[error("row {row}: interval {interval} starts before the previous interval {previous}")]
    Unsorted {
        row: usize,
        previous: Interval,
        interval: Interval,
    },
    #[error("row {row}: interval {interval} overlaps or touches {previous}")]
    Overlap {
        row: usize,
        previous: Interval,
        interval: Interval,
    },
    #[error("row {row}: interval {interval} is empty")]
    Empty { row: usize, interval: Interval },
    #[error("row {row}: interval {interval} extends past the profile length {profile_length}")]
    OutOfRange {
        row: usize,
        interval: Interval,
        profile_length: usize,
    },
    #[error("row {row} is outside the sequence length {seq_length}")]
    RowOutOfRange { row: usize, seq_length: usize },
    #[error("bounds are {found:?} (seq x profile), expected {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },
}

/// The region of the DP matrix that is computed: for every sequence
/// position (row), an ascending list of disjoint profile intervals.
#[derive(Clone, Default, PartialEq, Eq, Serialize)]
pub struct EdgeBounds {
    pub seq_length: usize,
    pub profile_length: usize,
    rows: Vec<Vec<Interval>>,
}

impl EdgeBounds {
    pub fn new(seq_length: usize, profile_length: usize) -> Self {
        EdgeBounds {
            seq_length,
            profile_length,
            rows: vec![vec![]; seq_length],
        }
    }

    /// Bounds that cover every cell of the matrix.
    pub fn full(seq_length: usize, profile_length: usize) -> Self {
        let mut bounds = Self::new(seq_length, profile_length);
        if profile_length > 0 {
            bounds
                .rows
                .iter_mut()
                .for_each(|row| row.push(Interval::new(0, profile_length)));
        }
        bounds
    }

    /// A band of `radius` columns on either side of the main diagonal.
    pub fn diagonal_band(seq_length: usize, profile_length: usize, radius: usize) -> Self {
        let mut bounds = Self::new(seq_length, profile_length);
        for (row_idx, row) in bounds.rows.iter_mut().enumerate() {
            let left = row_idx.saturating_sub(radius);
            let right = (row_idx + radius + 1).min(profile_length);
            if left < right {
                row.push(Interval::new(left, right));
            }
        }
        bounds
    }

    /// Build bounds from explicit rows, checking that they are well formed.
    pub fn from_rows(
        seq_length: usize,
        profile_length: usize,
        rows: Vec<Vec<Interval>>,
    ) -> Result<Self, BoundsError> {
        if rows.len() != seq_length {
            return Err(BoundsError::ShapeMismatch {
                expected: (seq_length, profile_length),
                found: (rows.len(), profile_length),
            });
        }

        let mut bounds = Self::new(seq_length, profile_length);
        for (row_idx, row) in rows.into_iter().enumerate() {
            for interval in row {
                bounds.push(row_idx, interval)?;
            }
        }
        Ok(bounds)
    }

    /// Append an interval to a row. Intervals must arrive in non-decreasing `left` order.
    pub fn push(&mut self, row: usize, interval: Interval) -> Result<(), BoundsError> {
        let profile_length = self.profile_length;
        let seq_length = self.seq_length;

        let intervals = self
            .rows
            .get_mut(row)
            .ok_or(BoundsError::RowOutOfRange { row, seq_length })?;

        if interval.left >= interval.right {
            return Err(BoundsError::Empty { row, interval });
        }

        if interval.right > profile_length {
            return Err(BoundsError::OutOfRange {
                row,
                interval,
                profile_length,
            });
        }

        if let Some(&previous) = intervals.last() {
            if interval.left < previous.left {
                return Err(BoundsError::Unsorted {
                    row,
                    previous,
                    interval,
                });
            }
        }

        intervals.push(interval);
        Ok(())
    }

    #[inline]
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn row(&self, row: usize) -> &[Interval] {
        &self.rows[row]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Interval]> {
        self.rows.iter().map(|row| row.as_slice())
    }

    /// The total number of active cells, summed over every row.
    pub fn num_cells(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|row| row.iter())
            .map(Interval::width)
            .sum()
    }

    pub fn num_intervals(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    /// The index of the interval in `row` that holds `col`.
    pub fn search(&self, row: usize, col: usize) -> Option<usize> {
        let intervals = self.rows.get(row)?;
        let idx = intervals.partition_point(|interval| interval.right <= col);

        match intervals.get(idx) {
            Some(interval) if interval.contains(col) => Some(idx),
            _ => None,
        }
    }

    /// Whether the cell at (row, profile position) is inside the bounds.
    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.search(row, col).is_some()
    }

    /// Fold the intervals of another bound set over the same matrix into this one.
    ///
    /// The rows are left unsorted; call `normalize()` afterward.
    pub fn extend_from(&mut self, other: &EdgeBounds) -> Result<(), BoundsError> {
        if (self.seq_length, self.profile_length) != (other.seq_length, other.profile_length) {
            return Err(BoundsError::ShapeMismatch {
                expected: (self.seq_length, self.profile_length),
                found: (other.seq_length, other.profile_length),
            });
        }

        self.rows
            .iter_mut()
            .zip(other.rows.iter())
            .for_each(|(row, other_row)| row.extend_from_slice(other_row));

        Ok(())
    }

    /// Sort every row and coalesce intervals that overlap or touch.
    pub fn normalize(&mut self) {
        for row in self.rows.iter_mut() {
            row.retain(|interval| interval.left < interval.right);
            row.sort_unstable();

            let mut merged: Vec<Interval> = Vec::with_capacity(row.len());
            for &interval in row.iter() {
                match merged.last_mut() {
                    Some(previous) if previous.right >= interval.left => {
                        previous.right = previous.right.max(interval.right);
                    }
                    _ => merged.push(interval),
                }
            }
            *row = merged;
        }
    }

    pub fn is_normalized(&self) -> bool {
        self.validate().is_ok()
    }

    /// Check every row for the first out-of-order, empty, out-of-range, or overlapping interval.
    pub fn validate(&self) -> Result<(), BoundsError> {
        if self.rows.len() != self.seq_length {
            return Err(BoundsError::ShapeMismatch {
                expected: (self.seq_length, self.profile_length),
                found: (self.rows.len(), self.profile_length),
            });
        }

        for (row, intervals) in self.rows.iter().enumerate() {
            let mut previous: Option<Interval> = None;

            for &interval in intervals {
                if interval.left >= interval.right {
                    return Err(BoundsError::Empty { row, interval });
                }

                if interval.right > self.profile_length {
                    return Err(BoundsError::OutOfRange {
                        row,
                        interval,
                        profile_length: self.profile_length,
                    });
                }

                if let Some(previous) = previous {
                    if interval.left < previous.left {
                        return Err(BoundsError::Unsorted {
                            row,
                            previous,
                            interval,
                        });
                    }
                    if previous.right >= interval.left {
                        return Err(BoundsError::Overlap {
                            row,
                            previous,
                            interval,
                        });
                    }
                }
                previous = Some(interval);
            }
        }

        Ok(())
    }

    pub fn dump(&self, out: &mut impl Write) -> Result<()> {
        let row_idx_width = self.seq_length.to_string().len();

        writeln!(
            out,
            "{} x {}: {} cells",
            self.seq_length,
            self.profile_length,
            self.num_cells()
        )?;

        for (row_idx, row) in self.rows.iter().enumerate() {
            write!(out, "{:w$}:", row_idx, w = row_idx_width)?;
            for interval in row {
                write!(out, " {interval}")?;
            }
            writeln!(out)?;
        }

        Ok(())
    }
}

impl Debug for EdgeBounds {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut out: Vec<u8> = vec![];
        self.dump(&mut out).map_err(|_| std::fmt::Error)?;
        write!(f, "{}", String::from_utf8_lossy(&out))
    }
}

use super::EdgeBounds;

/// A run of stored cells in one DP row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Segment {
    /// The first DP column of the run
    pub start: usize,
    /// One past the last DP column of the run
    pub end: usize,
    /// The index of the run's first cell in the arena
    pub offset: usize,
}

/// Maps (DP row, DP column) to a cell index in a sparse arena.
///
/// Row 0 and any row with an empty bound hold no cells.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SparseLayout {
    pub seq_length: usize,
    pub profile_length: usize,
    /// `segments[row_starts[row]..row_starts[row + 1]]` are the segments of DP row `row`
    row_starts: Vec<usize>,
    segments: Vec<Segment>,
    num_cells: usize,
}

impl SparseLayout {
    pub fn new(bounds: &EdgeBounds) -> Self {
        let mut layout = SparseLayout::default();
        layout.reuse(bounds);
        layout
    }

    pub fn reuse(&mut self, bounds: &EdgeBounds) {
        self.seq_length = bounds.seq_length;
        self.profile_length = bounds.profile_length;

        self.row_starts.clear();
        self.segments.clear();

        // DP row 0 holds nothing
        self.row_starts.push(0);
        self.row_starts.push(0);

        let mut num_cells = 0;
        for intervals in bounds.rows() {
            for interval in intervals {
                self.segments.push(Segment {
                    start: interval.left + 1,
                    end: interval.right + 1,
                    offset: num_cells,
                });
                num_cells += interval.width();
            }
            self.row_starts.push(self.segments.len());
        }

        self.num_cells = num_cells;
    }

    #[inline]
    pub fn num_cells(&self) -> usize {
        self.num_cells
    }

    #[inline]
    pub fn row_segments(&self, row: usize) -> &[Segment] {
        match (self.row_starts.get(row), self.row_starts.get(row + 1)) {
            (Some(&start), Some(&end)) => &self.segments[start..end],
            _ => &[],
        }
    }

    /// The arena cell index of (row, col), if that cell is stored.
    #[inline]
    pub fn cell_idx(&self, row: usize, col: usize) -> Option<usize> {
        let segments = self.row_segments(row);
        let idx = segments.partition_point(|segment| segment.end <= col);

        match segments.get(idx) {
            Some(segment) if segment.start <= col => Some(segment.offset + (col - segment.start)),
            _ => None,
        }
    }

    /// Whether this layout was built from bounds with the same rows.
    pub fn matches(&self, bounds: &EdgeBounds) -> bool {
        if self.seq_length != bounds.seq_length || self.profile_length != bounds.profile_length {
            return false;
        }

        bounds.rows().enumerate().all(|(row_idx, intervals)| {
            let segments = self.row_segments(row_idx + 1);
            segments.len() == intervals.len()
                && segments
                    .iter()
                    .zip(intervals)
                    .all(|(s, i)| s.start == i.left + 1 && s.end == i.right + 1)
        })
    }
}

mod dp_matrix;
pub use dp_matrix::{DpMatrix, MatrixError, CELL_WIDTH};

mod dp_matrix_flat;
pub use dp_matrix_flat::DpMatrixFlat;

mod dp_matrix_linear;
pub use dp_matrix_linear::DpMatrixLinear;

mod dp_matrix_sparse;
pub use dp_matrix_sparse::DpMatrixSparse;

mod edge_bounds;
pub use edge_bounds::{BoundsError, EdgeBounds, Interval};

mod layout;
pub use layout::{Segment, SparseLayout};

mod trace;
pub use trace::{State, Trace, TraceScoreError, TraceStep};

mod trace_pointers;
pub use trace_pointers::TracePointers;

pub mod structs;

mod error;
pub use error::{DpError, TracebackError};

mod forward;
pub use forward::forward;

mod backward;
pub use backward::backward;

mod viterbi;
pub use viterbi::viterbi;

mod traceback;
pub use traceback::traceback;

mod posterior;
pub use posterior::posterior;

pub mod naive;

mod scoring;
pub use scoring::{bit_score, null_one_score, Bits, Nats};

#[cfg(test)]
mod tests;

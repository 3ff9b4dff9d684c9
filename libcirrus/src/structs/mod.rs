pub mod profile;
pub use profile::{Profile, ProfileProbabilities, ProfileShapeError};

pub mod sequence;
pub use sequence::Sequence;

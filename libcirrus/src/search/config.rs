use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Which matrix the score passes run in.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Every bounded cell of every row is kept.
    #[default]
    Quadratic,
    /// Only two rolling rows are kept.
    Linear,
}

#[derive(Builder, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[builder(setter(strip_option), default)]
pub struct SearchConfig {
    /// The number of worker threads; 0 lets rayon decide.
    pub num_threads: usize,
    pub storage: StorageKind,
    /// Configure each profile's special transitions for its target's length.
    pub configure_length: bool,
    /// Reject tasks whose bounds hold more cells than this.
    pub max_cells: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            num_threads: 1,
            storage: StorageKind::Quadratic,
            configure_length: true,
            max_cells: None,
        }
    }
}
